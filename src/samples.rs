//! Template account seeding.
//!
//! The `Guest` template account owns the sample histories that every new
//! account receives a copy of. It is created on startup when missing and,
//! while it owns no histories, filled from the sample JSON file.

use rusqlite::Connection;
use serde::Deserialize;
use std::path::Path;

use crate::analysis;
use crate::auth::{db as auth_db, password};
use crate::config::TEMPLATE_LOGIN_ID;
use crate::domain::{Analysis, Role, SignUp};
use crate::error::{AppError, AppResult};
use crate::history;
use crate::session;

/// One entry of the sample file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleHistory {
  pub history_name: String,
  #[serde(flatten)]
  pub analysis: Analysis,
}

/// Read the sample file. Missing or malformed files yield `None`.
pub fn load_sample_file(path: &Path) -> Option<Vec<SampleHistory>> {
  let contents = match std::fs::read_to_string(path) {
    Ok(c) => c,
    Err(e) => {
      tracing::info!("No sample file at {}: {}", path.display(), e);
      return None;
    }
  };
  match serde_json::from_str(&contents) {
    Ok(samples) => Some(samples),
    Err(e) => {
      tracing::warn!("Invalid sample file {}: {}", path.display(), e);
      None
    }
  }
}

/// Create the template account if it does not exist, returns its ID
pub fn ensure_template_user(conn: &Connection) -> AppResult<i64> {
  if let Some(id) = auth_db::get_user_id_by_login_id(conn, TEMPLATE_LOGIN_ID)? {
    return Ok(id);
  }

  // Nobody is meant to log in as the template
  let secret = session::generate_session_id();
  let hash = password::hash_password(&secret).map_err(|e| {
    tracing::error!("Password hashing failed: {}", e);
    AppError::Password
  })?;
  let signup = SignUp {
    first_name: TEMPLATE_LOGIN_ID.to_string(),
    last_name: TEMPLATE_LOGIN_ID.to_string(),
    login_id: TEMPLATE_LOGIN_ID.to_string(),
    password: secret,
  };
  let id = auth_db::create_user(conn, &signup, &hash, Role::User)?;
  tracing::info!("Created template account '{}'", TEMPLATE_LOGIN_ID);
  Ok(id)
}

/// Import samples as the template's histories if it has none yet.
/// Returns the number of histories imported.
pub fn seed_template_histories(
  conn: &Connection,
  template_id: i64,
  samples: &[SampleHistory],
) -> AppResult<usize> {
  if !history::db::get_history_names_by_user_id(conn, template_id)?.is_empty() {
    return Ok(0);
  }

  let tx = conn.unchecked_transaction()?;
  let mut imported = 0;
  for sample in samples {
    if history::db::get_history(&tx, &sample.history_name, template_id)?.is_some() {
      tracing::warn!("Duplicate sample history '{}' skipped", sample.history_name);
      continue;
    }
    let history_id = history::db::create_history(&tx, template_id, &sample.history_name)?;
    analysis::db::save_analysis(&tx, history_id, &sample.analysis)?;
    imported += 1;
  }
  tx.commit()?;

  tracing::info!("Imported {} sample histories", imported);
  Ok(imported)
}

/// Startup entry point: template account plus samples from `sample_file`
pub fn seed(conn: &Connection, sample_file: &Path) -> AppResult<()> {
  let template_id = ensure_template_user(conn)?;
  if let Some(samples) = load_sample_file(sample_file) {
    seed_template_histories(conn, template_id, &samples)?;
  }
  Ok(())
}
