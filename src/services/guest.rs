//! Guest provisioning: one temporary account per browser session.

use chrono::Duration;
use rusqlite::Connection;

use crate::auth::db as auth_db;
use crate::config::{
    GUEST_DEFAULT_PASSWORD, GUEST_DISPLAY_NAME, GUEST_LOGIN_PREFIX, GUEST_SESSION_PREFIX_LEN,
};
use crate::domain::{Role, SignUp, User};
use crate::error::{AppError, AppResult};
use crate::session;

use super::users;

/// Fresh ids tried before giving up on finding a free guest login id
const MAX_SESSION_ID_ATTEMPTS: usize = 16;

/// Outcome of a guest login
#[derive(Debug)]
pub enum GuestLogin {
    /// A guest for this session already existed
    Existing(User),
    /// A new guest was created and seeded with sample histories
    Created(User),
}

impl GuestLogin {
    pub fn user(&self) -> &User {
        match self {
            Self::Existing(user) | Self::Created(user) => user,
        }
    }

    /// Message shown to the client
    pub fn message(&self) -> String {
        match self {
            Self::Existing(user) => format!("Existing user logged in with ID: {}", user.login_id),
            Self::Created(user) => format!(
                "New temporary user created and logged in with ID: {}",
                user.login_id
            ),
        }
    }
}

/// Guest login ID for a session: `Guest_` + the first six session id characters
pub fn guest_login_id(session_id: &str) -> String {
    let prefix: String = session_id.chars().take(GUEST_SESSION_PREFIX_LEN).collect();
    format!("{}{}", GUEST_LOGIN_PREFIX, prefix)
}

/// The guest account a live session is bound to.
///
/// `None` unless the session exists, has not expired, and belongs to the
/// GUEST account derived from its own id.
pub fn session_guest(
    conn: &Connection,
    session_id: &str,
    idle_timeout: Duration,
) -> AppResult<Option<User>> {
    let Some((user_id, _)) = auth_db::get_session_user(conn, session_id, idle_timeout)? else {
        return Ok(None);
    };
    let guest = auth_db::get_user_by_login_id(conn, &guest_login_id(session_id))?;
    Ok(guest.filter(|user| user.id == user_id && user.is_guest()))
}

/// Session id to bind a guest login to.
///
/// The cookie id is kept only while it names a live session of its own guest.
/// Anything else gets a server-issued id whose guest login id is still free.
pub fn guest_session_id(
    conn: &Connection,
    cookie_session_id: Option<&str>,
    idle_timeout: Duration,
) -> AppResult<String> {
    if let Some(sid) = cookie_session_id.filter(|sid| session::is_well_formed(sid)) {
        if session_guest(conn, sid, idle_timeout)?.is_some() {
            return Ok(sid.to_string());
        }
    }

    for _ in 0..MAX_SESSION_ID_ATTEMPTS {
        let sid = session::generate_session_id();
        if !auth_db::login_id_exists(conn, &guest_login_id(&sid))? {
            return Ok(sid);
        }
    }
    Err(AppError::GuestIdExhausted)
}

/// Log in as the guest bound to `session_id`, creating it on first use
pub fn login_as_guest(conn: &Connection, session_id: &str) -> AppResult<GuestLogin> {
    let login_id = guest_login_id(session_id);
    if let Some(existing) = auth_db::get_user_by_login_id(conn, &login_id)? {
        return Ok(GuestLogin::Existing(existing));
    }

    let signup = SignUp {
        first_name: GUEST_DISPLAY_NAME.to_string(),
        last_name: GUEST_DISPLAY_NAME.to_string(),
        login_id,
        password: GUEST_DEFAULT_PASSWORD.to_string(),
    };
    // create_user already copies the sample histories
    let user = users::create_user(conn, &signup, Role::Guest)?;
    Ok(GuestLogin::Created(user))
}
