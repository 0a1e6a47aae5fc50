//! Test utilities for database setup.
//!
//! Reuses the real schema initialization so tests never carry their own
//! copy of the table definitions.

use rusqlite::Connection;
use std::path::Path;
use tempfile::TempDir;

use crate::auth::{db as auth_db, password};
use crate::config::TEMPLATE_LOGIN_ID;
use crate::domain::{Analysis, Role, SignUp};
use crate::{analysis, db, history};

/// Test environment with a file-backed database using the real schema.
pub struct TestEnv {
    /// Temporary directory (kept alive for database file persistence)
    pub temp: TempDir,
    pub conn: Connection,
}

impl TestEnv {
    pub fn new() -> rusqlite::Result<Self> {
        let temp =
            TempDir::new().map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        let conn = db::open(&temp.path().join("virusdecode.db"))?;
        db::init_schema(&conn)?;
        Ok(Self { temp, conn })
    }

    /// Environment whose template account owns the given sample histories
    pub fn with_template(samples: &[(&str, Analysis)]) -> rusqlite::Result<Self> {
        let env = Self::new()?;
        let template_id = env.add_user(TEMPLATE_LOGIN_ID, "unused", Role::User)?;
        for (name, analysis) in samples {
            let history_id = history::db::create_history(&env.conn, template_id, name)?;
            analysis::db::save_analysis(&env.conn, history_id, analysis)?;
        }
        Ok(env)
    }

    /// Insert a user directly, bypassing the service layer
    pub fn add_user(&self, login_id: &str, password: &str, role: Role) -> rusqlite::Result<i64> {
        let hash = password::hash_password(password)
            .map_err(|_| rusqlite::Error::InvalidQuery)?;
        let signup = SignUp {
            first_name: login_id.to_string(),
            last_name: "Test".to_string(),
            login_id: login_id.to_string(),
            password: password.to_string(),
        };
        auth_db::create_user(&self.conn, &signup, &hash, role)
    }

    /// Backdate a user's creation time
    pub fn set_created_at(&self, user_id: i64, created_at: &str) -> rusqlite::Result<()> {
        self.conn.execute(
            "UPDATE users SET created_at = ?1 WHERE id = ?2",
            rusqlite::params![created_at, user_id],
        )?;
        Ok(())
    }

    pub fn count(&self, table: &str) -> i64 {
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .unwrap_or(-1)
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }
}

/// Sample analysis with recognizable payloads
pub fn sample_analysis(tag: &str) -> Analysis {
    Analysis {
        reference_id: Some(format!("NC_{}", tag)),
        alignment: Some(format!("{{\"alignment\":\"{}\"}}", tag)),
        linear_design: Some(format!("{{\"mrna\":\"{}\"}}", tag)),
        pdb: Some(format!("HEADER {}", tag)),
    }
}
