//! Session identifiers and the session cookie.
//!
//! Session state itself lives in the `sessions` table (see `auth::db`); this
//! module only deals with the opaque id carried by the browser.

use axum_extra::extract::cookie::{Cookie, SameSite};

/// HttpOnly cookie carrying the session id
pub const SESSION_COOKIE_NAME: &str = "vd_session";

const SESSION_ID_LEN: usize = 32;

/// Generate a new session ID
pub fn generate_session_id() -> String {
  use rand::Rng;
  let mut rng = rand::rng();
  (0..SESSION_ID_LEN)
    .map(|_| {
      let idx = rng.random_range(0..36);
      if idx < 10 {
        (b'0' + idx) as char
      } else {
        (b'a' + idx - 10) as char
      }
    })
    .collect()
}

/// Whether `id` looks like something [`generate_session_id`] produced
pub fn is_well_formed(id: &str) -> bool {
  id.len() == SESSION_ID_LEN && id.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
}

/// Session cookie. No max-age: it lives as long as the browser session,
/// the server-side row enforces the idle timeout.
pub fn session_cookie(session_id: String, secure: bool) -> Cookie<'static> {
  Cookie::build((SESSION_COOKIE_NAME, session_id))
    .path("/")
    .http_only(true)
    .secure(secure)
    .same_site(SameSite::Lax)
    .build()
}

/// Expired cookie used to clear the session on the client
pub fn removal_cookie() -> Cookie<'static> {
  Cookie::build((SESSION_COOKIE_NAME, ""))
    .path("/")
    .max_age(time::Duration::seconds(0))
    .build()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_generated_ids_are_well_formed_and_distinct() {
    let a = generate_session_id();
    let b = generate_session_id();
    assert!(is_well_formed(&a));
    assert!(is_well_formed(&b));
    assert_ne!(a, b);
  }

  #[test]
  fn test_rejects_malformed_ids() {
    assert!(!is_well_formed(""));
    assert!(!is_well_formed("short"));
    assert!(!is_well_formed(&"A".repeat(32)));
    assert!(!is_well_formed(&"a".repeat(33)));
    assert!(!is_well_formed("abc-def-abc-def-abc-def-abc-def-"));
  }

  #[test]
  fn test_cookie_attributes() {
    let cookie = session_cookie("abc".to_string(), true);
    assert_eq!(cookie.name(), SESSION_COOKIE_NAME);
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.secure(), Some(true));
    assert!(cookie.max_age().is_none());

    assert_eq!(removal_cookie().max_age(), Some(time::Duration::seconds(0)));
  }
}
