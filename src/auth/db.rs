//! User and session persistence (users, sessions tables).

use chrono::{DateTime, Duration, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use crate::domain::{Role, SignUp, User};

const USER_COLUMNS: &str =
    "id, login_id, first_name, last_name, password_hash, role, created_at, last_login_at";

/// Parse an RFC 3339 column into UTC
pub(crate) fn timestamp_column(row: &Row, idx: usize) -> Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_user(row: &Row) -> Result<User> {
    let raw_role: String = row.get(5)?;
    let role = Role::from_str(&raw_role).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            Type::Text,
            format!("unknown role {:?}", raw_role).into(),
        )
    })?;
    let last_login_at = match row.get::<_, Option<String>>(7)? {
        Some(_) => Some(timestamp_column(row, 7)?),
        None => None,
    };
    Ok(User {
        id: row.get(0)?,
        login_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        password_hash: row.get(4)?,
        role,
        created_at: timestamp_column(row, 6)?,
        last_login_at,
    })
}

// ==================== Users ====================

/// Create a new user, returns the user ID
pub fn create_user(
    conn: &Connection,
    signup: &SignUp,
    password_hash: &str,
    role: Role,
) -> Result<i64> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        r#"INSERT INTO users (login_id, first_name, last_name, password_hash, role, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
        params![
            signup.login_id,
            signup.first_name,
            signup.last_name,
            password_hash,
            role.as_str(),
            now
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get user by login ID (case-insensitive)
pub fn get_user_by_login_id(conn: &Connection, login_id: &str) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE login_id = ?1", USER_COLUMNS),
        params![login_id],
        row_to_user,
    )
    .optional()
}

/// Get user by ID
pub fn get_user_by_id(conn: &Connection, user_id: i64) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        params![user_id],
        row_to_user,
    )
    .optional()
}

/// Resolve a login ID to a user ID
pub fn get_user_id_by_login_id(conn: &Connection, login_id: &str) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM users WHERE login_id = ?1",
        params![login_id],
        |row| row.get(0),
    )
    .optional()
}

/// Check if a login ID is already taken
pub fn login_id_exists(conn: &Connection, login_id: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE login_id = ?1",
        params![login_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// All users with the given role, oldest first
pub fn list_users_by_role(conn: &Connection, role: Role) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM users WHERE role = ?1 ORDER BY created_at, id",
        USER_COLUMNS
    ))?;
    let users = stmt
        .query_map(params![role.as_str()], row_to_user)?
        .collect::<Result<Vec<_>>>()?;
    Ok(users)
}

/// Delete a user row. Sessions cascade; histories must already be gone
/// or are removed by the cascade as well.
pub fn delete_user(conn: &Connection, user_id: i64) -> Result<bool> {
    let count = conn.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
    Ok(count > 0)
}

/// Update user's last login timestamp
pub fn update_last_login(conn: &Connection, user_id: i64) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE users SET last_login_at = ?1 WHERE id = ?2",
        params![now, user_id],
    )?;
    Ok(())
}

// ==================== Sessions ====================

/// Create (or rebind) a session. Expires after `idle_timeout` without use.
pub fn create_session(
    conn: &Connection,
    session_id: &str,
    user_id: i64,
    idle_timeout: Duration,
) -> Result<()> {
    let now = Utc::now();
    let expires = now + idle_timeout;
    conn.execute(
        r#"INSERT OR REPLACE INTO sessions (id, user_id, created_at, expires_at, last_access_at)
           VALUES (?1, ?2, ?3, ?4, ?5)"#,
        params![
            session_id,
            user_id,
            now.to_rfc3339(),
            expires.to_rfc3339(),
            now.to_rfc3339()
        ],
    )?;
    Ok(())
}

/// Validate session and get user info, returns (user_id, login_id).
/// A hit pushes the expiry forward by `idle_timeout`.
pub fn get_session_user(
    conn: &Connection,
    session_id: &str,
    idle_timeout: Duration,
) -> Result<Option<(i64, String)>> {
    let now = Utc::now();
    let result = conn
        .query_row(
            r#"
            SELECT u.id, u.login_id
            FROM sessions s
            JOIN users u ON s.user_id = u.id
            WHERE s.id = ?1 AND s.expires_at > ?2
            "#,
            params![session_id, now.to_rfc3339()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    if result.is_some() {
        let expires = now + idle_timeout;
        if let Err(e) = conn.execute(
            "UPDATE sessions SET last_access_at = ?1, expires_at = ?2 WHERE id = ?3",
            params![now.to_rfc3339(), expires.to_rfc3339(), session_id],
        ) {
            tracing::warn!("Failed to touch session: {}", e);
        }
    }
    Ok(result)
}

/// Delete a session (logout)
pub fn delete_session(conn: &Connection, session_id: &str) -> Result<()> {
    conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])?;
    Ok(())
}

/// Cleanup expired sessions, returns count of deleted sessions
pub fn cleanup_expired_sessions(conn: &Connection) -> Result<usize> {
    let now = Utc::now().to_rfc3339();
    let count = conn.execute("DELETE FROM sessions WHERE expires_at < ?1", params![now])?;
    Ok(count)
}
