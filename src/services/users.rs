//! Account operations: login, sign-up, user lookup and account removal.
//!
//! New accounts (regular and guest) start with a copy of every sample history
//! owned by the template account (`Guest`).

use rusqlite::Connection;

use crate::analysis;
use crate::auth::{db as auth_db, password};
use crate::config::TEMPLATE_LOGIN_ID;
use crate::domain::{Role, SignUp, User, UserInfo};
use crate::error::{AppError, AppResult};
use crate::history;

/// Check credentials. Unknown login IDs and wrong passwords fail the same way.
pub fn login(conn: &Connection, login_id: &str, password: &str) -> AppResult<User> {
    let user = auth_db::get_user_by_login_id(conn, login_id)?;
    match user {
        Some(user) if password::verify_password(password, &user.password_hash) => Ok(user),
        _ => Err(AppError::InvalidLogin),
    }
}

pub fn fetch_user_info(conn: &Connection, user_id: i64) -> AppResult<UserInfo> {
    auth_db::get_user_by_id(conn, user_id)?
        .map(|user| user.info())
        .ok_or(AppError::UserNotFound)
}

/// Create an account and seed it with the sample histories, atomically
pub fn create_user(conn: &Connection, signup: &SignUp, role: Role) -> AppResult<User> {
    if auth_db::login_id_exists(conn, &signup.login_id)? {
        return Err(AppError::DuplicateLoginId);
    }

    let password_hash = password::hash_password(&signup.password).map_err(|e| {
        tracing::error!("Password hashing failed: {}", e);
        AppError::Password
    })?;

    let tx = conn.unchecked_transaction()?;
    let user_id = auth_db::create_user(&tx, signup, &password_hash, role)?;
    let copied = copy_sample_histories_to_user(&tx, user_id)?;
    let user = auth_db::get_user_by_id(&tx, user_id)?.ok_or(AppError::UserNotFound)?;
    tx.commit()?;

    tracing::info!(
        "Created {} account {} with {} sample histories",
        role.as_str(),
        user.login_id,
        copied
    );
    Ok(user)
}

/// Copy every template history that has an analysis to `user_id`.
/// Returns the number of histories copied; a missing template copies nothing.
pub fn copy_sample_histories_to_user(conn: &Connection, user_id: i64) -> rusqlite::Result<usize> {
    let Some(template_id) = auth_db::get_user_id_by_login_id(conn, TEMPLATE_LOGIN_ID)? else {
        tracing::debug!("No template account '{}', nothing to copy", TEMPLATE_LOGIN_ID);
        return Ok(0);
    };
    if template_id == user_id {
        return Ok(0);
    }

    let mut copied = 0;
    for name in history::db::get_history_names_by_user_id(conn, template_id)? {
        let Some(original) = history::db::get_history(conn, &name, template_id)? else {
            continue;
        };
        let Some(analysis) = analysis::db::get_analysis(conn, original.id)? else {
            continue;
        };
        let history_id = history::db::create_history(conn, user_id, &name)?;
        analysis::db::save_analysis(conn, history_id, &analysis)?;
        copied += 1;
    }
    Ok(copied)
}

/// Remove a user with every history, analysis and session they own
pub fn delete_user_with_data(conn: &Connection, user_id: i64) -> rusqlite::Result<bool> {
    let tx = conn.unchecked_transaction()?;
    let deleted = delete_user_data(&tx, user_id)?;
    tx.commit()?;
    Ok(deleted)
}

/// Same as [`delete_user_with_data`] for callers that already hold a transaction
pub(crate) fn delete_user_data(conn: &Connection, user_id: i64) -> rusqlite::Result<bool> {
    for name in history::db::get_history_names_by_user_id(conn, user_id)? {
        if let Some(h) = history::db::get_history(conn, &name, user_id)? {
            analysis::db::delete_analysis(conn, h.id)?;
            history::db::delete_history(conn, &name, user_id)?;
        }
    }
    auth_db::delete_user(conn, user_id)
}
