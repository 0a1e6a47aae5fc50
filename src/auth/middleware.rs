//! Authentication extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::CookieJar;

use super::db as auth_db;
use crate::db;
use crate::error::AppError;
use crate::session::SESSION_COOKIE_NAME;
use crate::state::AppState;

/// Authenticated request context.
/// Add this as a handler parameter to require authentication.
/// Rejects with 401 if there is no live session.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i64,
    pub login_id: String,
    pub session_id: String,
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::Unauthorized)?;

        let session_id = jar
            .get(SESSION_COOKIE_NAME)
            .map(|c| c.value().to_string())
            .ok_or(AppError::Unauthorized)?;

        let conn = db::try_lock(&state.db)?;
        let (user_id, login_id) =
            auth_db::get_session_user(&conn, &session_id, state.session_idle())?
                .ok_or(AppError::Unauthorized)?;

        Ok(AuthContext {
            user_id,
            login_id,
            session_id,
        })
    }
}
