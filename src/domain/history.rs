use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named, user-owned saved analysis
#[derive(Debug, Clone)]
pub struct History {
  pub id: i64,
  pub user_id: i64,
  pub history_name: String,
  pub created_at: DateTime<Utc>,
}

/// Analysis payloads attached to a history.
///
/// Produced by the sequence-analysis pipeline; stored and copied verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
  pub reference_id: Option<String>,
  /// Alignment result JSON
  pub alignment: Option<String>,
  /// LinearDesign mRNA result JSON
  pub linear_design: Option<String>,
  /// Predicted structure in PDB format
  pub pdb: Option<String>,
}
