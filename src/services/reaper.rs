//! Scheduled removal of stale guest accounts.
//!
//! Runs on a cron schedule (daily at 03:00 local time by default) and deletes
//! every GUEST account older than the configured age, together with its
//! histories and analyses. Expired sessions are swept in the same pass.

use chrono::{DateTime, Duration, Local, Utc};
use cron::Schedule;
use rusqlite::Connection;
use std::str::FromStr;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::auth::db as auth_db;
use crate::config::DEFAULT_GUEST_CLEANUP_SCHEDULE;
use crate::db::{self, DbPool, LogOnError};
use crate::domain::Role;
use crate::error::AppResult;

use super::users;

/// Parse a cron expression. Five-field Unix expressions get a leading
/// seconds field of `0`.
pub fn parse_schedule(expression: &str) -> Result<Schedule, cron::error::Error> {
    let expression = if expression.split_whitespace().count() == 5 {
        format!("0 {}", expression)
    } else {
        expression.to_string()
    };
    Schedule::from_str(&expression)
}

/// Parse the configured expression, falling back to the daily default
pub fn schedule_or_default(expression: &str) -> Schedule {
    match parse_schedule(expression) {
        Ok(schedule) => schedule,
        Err(e) => {
            tracing::warn!(
                "Invalid guest cleanup schedule '{}' ({}), using '{}'",
                expression,
                e,
                DEFAULT_GUEST_CLEANUP_SCHEDULE
            );
            default_schedule()
        }
    }
}

fn default_schedule() -> Schedule {
    // Six-field literal, always parses
    Schedule::from_str(DEFAULT_GUEST_CLEANUP_SCHEDULE)
        .unwrap_or_else(|e| unreachable!("default cleanup schedule is invalid: {}", e))
}

/// Next firing strictly after `after`
pub fn next_run(schedule: &Schedule, after: DateTime<Local>) -> Option<DateTime<Local>> {
    schedule.after(&after).next()
}

/// Delete every guest created before `now - max_age`. Returns how many were removed.
pub fn purge_expired_guests(
    conn: &Connection,
    max_age: Duration,
    now: DateTime<Utc>,
) -> AppResult<usize> {
    let cutoff = now - max_age;

    let tx = conn.unchecked_transaction()?;
    let expired: Vec<_> = auth_db::list_users_by_role(&tx, Role::Guest)?
        .into_iter()
        .filter(|user| user.created_at < cutoff)
        .collect();

    for user in &expired {
        tracing::debug!("Removing guest {} created at {}", user.login_id, user.created_at);
        users::delete_user_data(&tx, user.id)?;
    }
    tx.commit()?;

    if !expired.is_empty() {
        tracing::info!(
            "Deleted {} GUEST users who were created more than {} hours ago.",
            expired.len(),
            max_age.num_hours()
        );
    }
    Ok(expired.len())
}

/// One cleanup pass against the shared pool
fn run_once(pool: &DbPool, max_age: Duration) {
    let Some(conn) = db::try_lock(pool).log_warn("Guest cleanup skipped") else {
        return;
    };
    purge_expired_guests(&conn, max_age, Utc::now()).log_warn("Guest cleanup failed");
    if let Some(n) = auth_db::cleanup_expired_sessions(&conn).log_warn("Session cleanup failed") {
        if n > 0 {
            tracing::debug!("Removed {} expired sessions", n);
        }
    }
}

/// Spawn the cleanup loop. It stops when `shutdown` fires or its sender is dropped.
pub fn spawn(
    pool: DbPool,
    schedule: Schedule,
    max_age: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Local::now();
            let Some(next) = next_run(&schedule, now) else {
                tracing::warn!("Guest cleanup schedule has no upcoming runs, stopping");
                break;
            };
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::debug!("Next guest cleanup at {}", next);

            tokio::select! {
                _ = tokio::time::sleep(wait) => run_once(&pool, max_age),
                _ = shutdown.recv() => {
                    tracing::info!("Shutting down guest cleanup");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use crate::history;
    use crate::testing::{sample_analysis, TestEnv};

    #[test]
    fn test_parse_schedule_formats() {
        assert!(parse_schedule("0 0 3 * * *").is_ok());
        assert!(parse_schedule("0 3 * * *").is_ok());
        assert!(parse_schedule("not a schedule").is_err());
    }

    #[test]
    fn test_invalid_schedule_falls_back_to_default() {
        let after = Local.with_ymd_and_hms(2026, 3, 10, 12, 30, 0).unwrap();
        let fallback = schedule_or_default("every day at three");
        let default = parse_schedule(DEFAULT_GUEST_CLEANUP_SCHEDULE).unwrap();
        assert_eq!(next_run(&fallback, after), next_run(&default, after));

        let hourly = schedule_or_default("0 * * * *");
        assert_eq!(next_run(&hourly, after).unwrap().minute(), 0);
        assert_ne!(next_run(&hourly, after), next_run(&default, after));
    }

    #[test]
    fn test_next_run_is_three_am() {
        let schedule = parse_schedule("0 0 3 * * *").unwrap();
        let after = Local.with_ymd_and_hms(2026, 3, 10, 12, 30, 0).unwrap();
        let next = next_run(&schedule, after).unwrap();
        assert_eq!(next.hour(), 3);
        assert_eq!(next.minute(), 0);
        assert!(next > after);
        assert!(next - after <= Duration::hours(24));
    }

    #[test]
    fn test_purges_only_old_guests() {
        let env = TestEnv::with_template(&[("demo", sample_analysis("d"))]).unwrap();
        let now = Utc::now();

        let old_guest = env.add_user("Guest_old000", "pw", Role::Guest).unwrap();
        let new_guest = env.add_user("Guest_new000", "pw", Role::Guest).unwrap();
        let old_user = env.add_user("veteran", "pw", Role::User).unwrap();
        env.set_created_at(old_guest, &(now - Duration::hours(25)).to_rfc3339())
            .unwrap();
        env.set_created_at(old_user, &(now - Duration::days(30)).to_rfc3339())
            .unwrap();

        for id in [old_guest, new_guest] {
            users::copy_sample_histories_to_user(&env.conn, id).unwrap();
        }
        assert_eq!(env.count("analyses"), 3);

        let removed = purge_expired_guests(&env.conn, Duration::hours(24), now).unwrap();
        assert_eq!(removed, 1);

        assert!(auth_db::get_user_by_id(&env.conn, old_guest).unwrap().is_none());
        assert!(auth_db::get_user_by_id(&env.conn, new_guest).unwrap().is_some());
        assert!(auth_db::get_user_by_id(&env.conn, old_user).unwrap().is_some());
        assert!(history::db::get_history_names_by_user_id(&env.conn, old_guest)
            .unwrap()
            .is_empty());
        assert_eq!(env.count("analyses"), 2);
    }

    #[test]
    fn test_purge_with_nothing_to_do() {
        let env = TestEnv::new().unwrap();
        env.add_user("Guest_fresh0", "pw", Role::Guest).unwrap();
        assert_eq!(
            purge_expired_guests(&env.conn, Duration::hours(24), Utc::now()).unwrap(),
            0
        );
    }

    #[test]
    fn test_run_once_sweeps_expired_sessions_and_guests() {
        let env = TestEnv::new().unwrap();
        let pool = db::init_db(&env.path().join("sweep.db")).unwrap();
        {
            let conn = db::try_lock(&pool).unwrap();
            let signup = crate::domain::SignUp {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                login_id: "ada".to_string(),
                password: String::new(),
            };
            let user = auth_db::create_user(&conn, &signup, "hash", Role::User).unwrap();
            auth_db::create_session(&conn, "stale", user, Duration::seconds(-30)).unwrap();
            auth_db::create_session(&conn, "live", user, Duration::hours(1)).unwrap();

            let guest = crate::domain::SignUp {
                login_id: "Guest_old000".to_string(),
                ..signup
            };
            let guest = auth_db::create_user(&conn, &guest, "hash", Role::Guest).unwrap();
            conn.execute(
                "UPDATE users SET created_at = ?1 WHERE id = ?2",
                rusqlite::params![(Utc::now() - Duration::hours(48)).to_rfc3339(), guest],
            )
            .unwrap();
        }

        run_once(&pool, Duration::hours(24));

        let conn = db::try_lock(&pool).unwrap();
        let sessions: Vec<String> = conn
            .prepare("SELECT id FROM sessions")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(sessions, vec!["live"]);
        assert!(auth_db::get_user_by_login_id(&conn, "Guest_old000").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_spawned_loop_stops_on_shutdown() {
        let env = TestEnv::new().unwrap();
        let pool = db::init_db(&env.path().join("reaper.db")).unwrap();
        let (tx, rx) = broadcast::channel(1);

        let handle = spawn(
            pool,
            parse_schedule("0 0 3 * * *").unwrap(),
            Duration::hours(24),
            rx,
        );
        tx.send(()).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
