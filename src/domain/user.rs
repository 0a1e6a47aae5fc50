use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
  User,
  /// Ephemeral per-session account, removed by the cleanup job
  Guest,
}

impl Role {
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "USER" => Some(Self::User),
      "GUEST" => Some(Self::Guest),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::User => "USER",
      Self::Guest => "GUEST",
    }
  }
}

#[derive(Debug, Clone)]
pub struct User {
  pub id: i64,
  pub login_id: String,
  pub first_name: String,
  pub last_name: String,
  pub password_hash: String,
  pub role: Role,
  pub created_at: DateTime<Utc>,
  pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
  pub fn is_guest(&self) -> bool {
    self.role == Role::Guest
  }

  /// Public view returned to the web client
  pub fn info(&self) -> UserInfo {
    UserInfo {
      login_id: self.login_id.clone(),
      user_name: self.first_name.clone(),
    }
  }
}

/// What the client sees about the logged-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
  pub login_id: String,
  /// First name, shown in the navigation bar
  pub user_name: String,
}

/// Sign-up payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUp {
  pub first_name: String,
  pub last_name: String,
  pub login_id: String,
  pub password: String,
}
