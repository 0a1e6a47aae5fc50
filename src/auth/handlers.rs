//! Authentication handlers for login, sign-up, guest login and logout.

use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::db as auth_db;
use super::middleware::AuthContext;
use crate::config::{GUEST_LOGIN_PREFIX, TEMPLATE_LOGIN_ID};
use crate::db::{self, LogOnError};
use crate::domain::{Role, SignUp, UserInfo};
use crate::error::{AppError, AppResult};
use crate::services::{guest, users};
use crate::session::{self, generate_session_id, SESSION_COOKIE_NAME};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub login_id: String,
    pub password: String,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<UserInfo>)> {
    let conn = db::try_lock(&state.db)?;
    let user = users::login(&conn, &req.login_id, &req.password).inspect_err(|_| {
        tracing::info!("Failed login attempt for '{}'", req.login_id);
    })?;

    auth_db::update_last_login(&conn, user.id)
        .log_warn(&format!("Failed to update last login for user {}", user.id));

    // A fresh id on every login; the old session dies with it
    if let Some(old) = jar.get(SESSION_COOKIE_NAME) {
        auth_db::delete_session(&conn, old.value()).log_warn("Failed to drop previous session");
    }
    let session_id = generate_session_id();
    auth_db::create_session(&conn, &session_id, user.id, state.session_idle())?;
    drop(conn);

    tracing::info!("User {} logged in", user.login_id);
    let cookie = session::session_cookie(session_id, state.config.cookie_secure);
    Ok((jar.add(cookie), Json(user.info())))
}

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(form): Json<SignUp>,
) -> AppResult<String> {
    validate_signup(&form)?;

    let conn = db::try_lock(&state.db)?;
    let user = users::create_user(&conn, &form, Role::User)?;
    Ok(format!("User created successfully with ID: {}", user.id))
}

/// POST /api/auth/userinfo
pub async fn user_info(State(state): State<AppState>, auth: AuthContext) -> AppResult<Json<UserInfo>> {
    let conn = db::try_lock(&state.db)?;
    let info = users::fetch_user_info(&conn, auth.user_id)?;
    Ok(Json(info))
}

/// POST /api/auth/logout
///
/// Always succeeds. A guest account is removed together with its histories
/// only when the cookie names that guest's own live session.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> AppResult<(CookieJar, String)> {
    if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
        let session_id = cookie.value();
        let conn = db::try_lock(&state.db)?;

        if let Some(user) = guest::session_guest(&conn, session_id, state.session_idle())? {
            users::delete_user_with_data(&conn, user.id)?;
            tracing::info!("Removed guest {} on logout", user.login_id);
        }
        auth_db::delete_session(&conn, session_id)
            .log_warn("Failed to delete session during logout");
    }

    Ok((
        jar.remove(session::removal_cookie()),
        "User logged out successfully.".to_string(),
    ))
}

/// POST /api/auth/guest-login
///
/// Binds the browser session to a guest account. A live guest session is
/// resumed; any other cookie is replaced by a server-issued id.
pub async fn guest_login(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, String)> {
    let cookie_id = jar.get(SESSION_COOKIE_NAME).map(|c| c.value().to_string());

    let conn = db::try_lock(&state.db)?;
    let session_id = guest::guest_session_id(&conn, cookie_id.as_deref(), state.session_idle())?;
    if let Some(old) = cookie_id.filter(|old| *old != session_id) {
        auth_db::delete_session(&conn, &old).log_warn("Failed to drop previous session");
    }

    let outcome = guest::login_as_guest(&conn, &session_id)?;
    let user = outcome.user();
    auth_db::create_session(&conn, &session_id, user.id, state.session_idle())?;
    auth_db::update_last_login(&conn, user.id)
        .log_warn(&format!("Failed to update last login for guest {}", user.id));
    drop(conn);

    let message = outcome.message();
    tracing::info!("{}", message);
    let cookie = session::session_cookie(session_id, state.config.cookie_secure);
    Ok((jar.add(cookie), message))
}

/// Field checks for a sign-up request
fn validate_signup(form: &SignUp) -> AppResult<()> {
    if form.first_name.trim().is_empty()
        || form.last_name.trim().is_empty()
        || form.login_id.is_empty()
        || form.password.is_empty()
    {
        return Err(AppError::Validation("All fields are required.".to_string()));
    }
    if !is_valid_login_id(&form.login_id) {
        return Err(AppError::Validation(
            "ID must be 3-32 characters (letters, numbers, underscore).".to_string(),
        ));
    }
    if is_reserved_login_id(&form.login_id) {
        return Err(AppError::Validation("This ID is reserved.".to_string()));
    }
    Ok(())
}

fn is_valid_login_id(login_id: &str) -> bool {
    login_id.len() >= 3
        && login_id.len() <= 32
        && login_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The template account and the guest namespace cannot be registered
fn is_reserved_login_id(login_id: &str) -> bool {
    let lower = login_id.to_ascii_lowercase();
    lower == TEMPLATE_LOGIN_ID.to_ascii_lowercase()
        || lower.starts_with(&GUEST_LOGIN_PREFIX.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(login_id: &str) -> SignUp {
        SignUp {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            login_id: login_id.to_string(),
            password: "secret".to_string(),
        }
    }

    #[test]
    fn test_valid_login_ids() {
        assert!(is_valid_login_id("abc"));
        assert!(is_valid_login_id("user123"));
        assert!(is_valid_login_id("test_user"));
        assert!(is_valid_login_id("ABC_123_xyz"));
    }

    #[test]
    fn test_invalid_login_ids() {
        assert!(!is_valid_login_id("ab")); // too short
        assert!(!is_valid_login_id(&"a".repeat(33))); // too long
        assert!(!is_valid_login_id("user name")); // space
        assert!(!is_valid_login_id("user@name")); // special char
        assert!(!is_valid_login_id("user-name")); // hyphen
        assert!(!is_valid_login_id("")); // empty
    }

    #[test]
    fn test_reserved_login_ids() {
        assert!(is_reserved_login_id("Guest"));
        assert!(is_reserved_login_id("guest"));
        assert!(is_reserved_login_id("Guest_abc123"));
        assert!(is_reserved_login_id("GUEST_x"));
        assert!(!is_reserved_login_id("Guesthouse"));
        assert!(!is_reserved_login_id("ada"));
    }

    #[test]
    fn test_validate_signup() {
        assert!(validate_signup(&form("ada_l")).is_ok());
        assert!(matches!(
            validate_signup(&form("Guest_123456")),
            Err(AppError::Validation(_))
        ));

        let mut missing = form("ada_l");
        missing.first_name = "  ".to_string();
        assert!(matches!(validate_signup(&missing), Err(AppError::Validation(_))));

        let mut no_password = form("ada_l");
        no_password.password.clear();
        assert!(validate_signup(&no_password).is_err());
    }
}
