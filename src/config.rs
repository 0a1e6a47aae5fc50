//! Application configuration.
//!
//! Values are resolved with priority `config.toml` > environment (`.env` is
//! loaded first) > built-in defaults. Constants that are part of the public
//! contract (template account, guest login id shape) live here as well.

use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;

use crate::paths;

// ==================== Accounts ====================

/// Login id of the canonical account whose histories are copied to new users
pub const TEMPLATE_LOGIN_ID: &str = "Guest";

/// Prefix of per-session guest login ids (`Guest_` + session id prefix)
pub const GUEST_LOGIN_PREFIX: &str = "Guest_";

/// Number of session id characters appended to the guest prefix
pub const GUEST_SESSION_PREFIX_LEN: usize = 6;

/// Password given to guest accounts (never used to log in)
pub const GUEST_DEFAULT_PASSWORD: &str = "default_password";

/// Display name for guest accounts
pub const GUEST_DISPLAY_NAME: &str = "Guest";

// ==================== Defaults ====================

pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0";

pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Idle timeout of a server-side session in seconds
pub const DEFAULT_SESSION_IDLE_SECS: i64 = 3600;

/// Guests older than this are removed by the cleanup job
pub const DEFAULT_GUEST_MAX_AGE_HOURS: i64 = 24;

/// Upper bound for the session idle timeout (one year)
pub const MAX_SESSION_IDLE_SECS: i64 = 365 * 24 * 3600;

/// Upper bound for the guest max age (ten years)
pub const MAX_GUEST_MAX_AGE_HOURS: i64 = 10 * 365 * 24;

/// Daily at 03:00 (sec min hour day month weekday)
pub const DEFAULT_GUEST_CLEANUP_SCHEDULE: &str = "0 0 3 * * *";

const CONFIG_FILE: &str = "config.toml";

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub database: Option<DatabaseSection>,
    pub server: Option<ServerSection>,
    pub session: Option<SessionSection>,
    pub guests: Option<GuestSection>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DatabaseSection {
    pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerSection {
    pub addr: Option<String>,
    pub port: Option<u16>,
    pub cookie_secure: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionSection {
    pub idle_timeout_secs: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GuestSection {
    pub max_age_hours: Option<i64>,
    pub cleanup_schedule: Option<String>,
    pub sample_file: Option<String>,
}

/// Resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub server_addr: String,
    pub server_port: u16,
    /// Mark the session cookie `Secure` (enable behind HTTPS)
    pub cookie_secure: bool,
    pub session_idle_secs: i64,
    pub guest_max_age_hours: i64,
    /// Cron expression for the guest cleanup job
    pub guest_cleanup_schedule: String,
    pub sample_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(paths::db_path()),
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            cookie_secure: false,
            session_idle_secs: DEFAULT_SESSION_IDLE_SECS,
            guest_max_age_hours: DEFAULT_GUEST_MAX_AGE_HOURS,
            guest_cleanup_schedule: DEFAULT_GUEST_CLEANUP_SCHEDULE.to_string(),
            sample_file: PathBuf::from(paths::sample_file()),
        }
    }
}

impl Config {
    /// Load configuration from config.toml, the environment and defaults
    pub fn load() -> Self {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let file = match std::fs::read_to_string(CONFIG_FILE) {
            Ok(contents) => match toml::from_str::<FileConfig>(&contents) {
                Ok(parsed) => {
                    tracing::info!("Loaded configuration from {}", CONFIG_FILE);
                    Some(parsed)
                }
                Err(e) => {
                    tracing::warn!("Ignoring malformed {}: {}", CONFIG_FILE, e);
                    None
                }
            },
            Err(_) => None,
        };

        Self::from_sources(file.unwrap_or_default(), |key| std::env::var(key).ok())
    }

    /// Merge a parsed config file with environment lookups over the defaults
    pub fn from_sources(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let database = file.database.unwrap_or_default();
        let server = file.server.unwrap_or_default();
        let session = file.session.unwrap_or_default();
        let guests = file.guests.unwrap_or_default();

        Self {
            database_path: database
                .path
                .or_else(|| env("DATABASE_PATH"))
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            server_addr: server
                .addr
                .or_else(|| env("SERVER_ADDR"))
                .unwrap_or(defaults.server_addr),
            server_port: server
                .port
                .or_else(|| parse_env(&env, "PORT"))
                .unwrap_or(defaults.server_port),
            cookie_secure: server
                .cookie_secure
                .or_else(|| env("COOKIE_SECURE").map(|v| v == "true" || v == "1"))
                .unwrap_or(defaults.cookie_secure),
            session_idle_secs: bounded(
                "session idle timeout (secs)",
                session
                    .idle_timeout_secs
                    .or_else(|| parse_env(&env, "SESSION_IDLE_SECS")),
                MAX_SESSION_IDLE_SECS,
                defaults.session_idle_secs,
            ),
            guest_max_age_hours: bounded(
                "guest max age (hours)",
                guests
                    .max_age_hours
                    .or_else(|| parse_env(&env, "GUEST_MAX_AGE_HOURS")),
                MAX_GUEST_MAX_AGE_HOURS,
                defaults.guest_max_age_hours,
            ),
            guest_cleanup_schedule: guests
                .cleanup_schedule
                .or_else(|| env("GUEST_CLEANUP_SCHEDULE"))
                .unwrap_or(defaults.guest_cleanup_schedule),
            sample_file: guests
                .sample_file
                .or_else(|| env("SAMPLE_FILE"))
                .map(PathBuf::from)
                .unwrap_or(defaults.sample_file),
        }
    }

    /// Get the full server bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_addr, self.server_port)
    }

    pub fn session_idle_timeout(&self) -> chrono::Duration {
        let secs = bounded(
            "session idle timeout (secs)",
            Some(self.session_idle_secs),
            MAX_SESSION_IDLE_SECS,
            DEFAULT_SESSION_IDLE_SECS,
        );
        chrono::Duration::seconds(secs)
    }

    pub fn guest_max_age(&self) -> chrono::Duration {
        let hours = bounded(
            "guest max age (hours)",
            Some(self.guest_max_age_hours),
            MAX_GUEST_MAX_AGE_HOURS,
            DEFAULT_GUEST_MAX_AGE_HOURS,
        );
        chrono::Duration::hours(hours)
    }
}

fn parse_env<T: FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = env(key)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring unparseable {}={:?}", key, raw);
            None
        }
    }
}

/// Accept `value` only within `1..=max`, otherwise fall back to `default`
fn bounded(name: &str, value: Option<i64>, max: i64, default: i64) -> i64 {
    match value {
        Some(v) if (1..=max).contains(&v) => v,
        Some(v) => {
            tracing::warn!("{} = {} is outside 1..={}, using {}", name, v, max, default);
            default
        }
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_sources(FileConfig::default(), no_env);
        assert_eq!(config.session_idle_secs, 3600);
        assert_eq!(config.guest_max_age_hours, 24);
        assert_eq!(config.guest_cleanup_schedule, "0 0 3 * * *");
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert!(!config.cookie_secure);
    }

    #[test]
    fn test_file_overrides_env() {
        let file: FileConfig = toml::from_str(
            r#"
            [database]
            path = "/tmp/from-file.db"

            [guests]
            max_age_hours = 12
            "#,
        )
        .unwrap();
        let env: HashMap<&str, &str> = [
            ("DATABASE_PATH", "/tmp/from-env.db"),
            ("GUEST_MAX_AGE_HOURS", "48"),
            ("PORT", "9000"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_sources(file, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.database_path, PathBuf::from("/tmp/from-file.db"));
        assert_eq!(config.guest_max_age_hours, 12);
        // Not in the file, so the environment wins
        assert_eq!(config.server_port, 9000);
    }

    #[test]
    fn test_unparseable_env_falls_back_to_default() {
        let config = Config::from_sources(FileConfig::default(), |k| {
            (k == "SESSION_IDLE_SECS").then(|| "soon".to_string())
        });
        assert_eq!(config.session_idle_secs, DEFAULT_SESSION_IDLE_SECS);
    }

    #[test]
    fn test_non_positive_durations_fall_back() {
        let config = Config::from_sources(FileConfig::default(), |k| match k {
            "GUEST_MAX_AGE_HOURS" => Some("-1".to_string()),
            "SESSION_IDLE_SECS" => Some("0".to_string()),
            _ => None,
        });
        assert_eq!(config.guest_max_age_hours, DEFAULT_GUEST_MAX_AGE_HOURS);
        assert_eq!(config.session_idle_secs, DEFAULT_SESSION_IDLE_SECS);
        assert!(config.guest_max_age() > chrono::Duration::zero());
    }

    #[test]
    fn test_huge_durations_fall_back() {
        let file: FileConfig = toml::from_str(
            r#"
            [session]
            idle_timeout_secs = 9000000000000000000

            [guests]
            max_age_hours = 9000000000000
            "#,
        )
        .unwrap();
        let config = Config::from_sources(file, no_env);
        assert_eq!(config.session_idle_secs, DEFAULT_SESSION_IDLE_SECS);
        assert_eq!(config.guest_max_age_hours, DEFAULT_GUEST_MAX_AGE_HOURS);
    }

    #[test]
    fn test_out_of_range_fields_never_panic() {
        let config = Config {
            session_idle_secs: i64::MAX,
            guest_max_age_hours: -5,
            ..Config::default()
        };
        assert_eq!(
            config.session_idle_timeout(),
            chrono::Duration::seconds(DEFAULT_SESSION_IDLE_SECS)
        );
        assert_eq!(
            config.guest_max_age(),
            chrono::Duration::hours(DEFAULT_GUEST_MAX_AGE_HOURS)
        );
    }

    #[test]
    fn test_values_in_range_are_kept() {
        let config = Config::from_sources(FileConfig::default(), |k| {
            (k == "GUEST_MAX_AGE_HOURS").then(|| "1".to_string())
        });
        assert_eq!(config.guest_max_age(), chrono::Duration::hours(1));
    }
}
