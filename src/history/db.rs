//! History persistence (histories table).

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use crate::auth::db::timestamp_column;
use crate::domain::History;

fn row_to_history(row: &Row) -> Result<History> {
    Ok(History {
        id: row.get(0)?,
        user_id: row.get(1)?,
        history_name: row.get(2)?,
        created_at: timestamp_column(row, 3)?,
    })
}

/// Create a history for a user, returns the history ID
pub fn create_history(conn: &Connection, user_id: i64, history_name: &str) -> Result<i64> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO histories (user_id, history_name, created_at) VALUES (?1, ?2, ?3)",
        params![user_id, history_name, now],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Look up a history by name within one user's histories
pub fn get_history(conn: &Connection, history_name: &str, user_id: i64) -> Result<Option<History>> {
    conn.query_row(
        r#"SELECT id, user_id, history_name, created_at FROM histories
           WHERE history_name = ?1 AND user_id = ?2"#,
        params![history_name, user_id],
        row_to_history,
    )
    .optional()
}

/// History names of a user in creation order
pub fn get_history_names_by_user_id(conn: &Connection, user_id: i64) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT history_name FROM histories WHERE user_id = ?1 ORDER BY id")?;
    let names = stmt
        .query_map(params![user_id], |row| row.get(0))?
        .collect::<Result<Vec<String>>>()?;
    Ok(names)
}

/// Rename a history, returns false if it does not exist
pub fn rename_history(
    conn: &Connection,
    user_id: i64,
    history_name: &str,
    new_name: &str,
) -> Result<bool> {
    let count = conn.execute(
        "UPDATE histories SET history_name = ?1 WHERE history_name = ?2 AND user_id = ?3",
        params![new_name, history_name, user_id],
    )?;
    Ok(count > 0)
}

/// Delete a history row, returns false if it does not exist
pub fn delete_history(conn: &Connection, history_name: &str, user_id: i64) -> Result<bool> {
    let count = conn.execute(
        "DELETE FROM histories WHERE history_name = ?1 AND user_id = ?2",
        params![history_name, user_id],
    )?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::testing::TestEnv;

    #[test]
    fn test_names_in_creation_order() {
        let env = TestEnv::new().unwrap();
        let user = env.add_user("ada", "pw", Role::User).unwrap();
        create_history(&env.conn, user, "sars-cov-2").unwrap();
        create_history(&env.conn, user, "influenza").unwrap();
        create_history(&env.conn, user, "ebola").unwrap();

        assert_eq!(
            get_history_names_by_user_id(&env.conn, user).unwrap(),
            vec!["sars-cov-2", "influenza", "ebola"]
        );
    }

    #[test]
    fn test_histories_are_scoped_per_user() {
        let env = TestEnv::new().unwrap();
        let ada = env.add_user("ada", "pw", Role::User).unwrap();
        let bob = env.add_user("bob", "pw", Role::User).unwrap();
        create_history(&env.conn, ada, "shared-name").unwrap();
        create_history(&env.conn, bob, "shared-name").unwrap();

        let h = get_history(&env.conn, "shared-name", bob).unwrap().unwrap();
        assert_eq!(h.user_id, bob);
        assert!(get_history(&env.conn, "missing", ada).unwrap().is_none());

        // Same name twice for one user violates the unique constraint
        assert!(create_history(&env.conn, ada, "shared-name").is_err());
    }

    #[test]
    fn test_rename_and_delete() {
        let env = TestEnv::new().unwrap();
        let user = env.add_user("ada", "pw", Role::User).unwrap();
        create_history(&env.conn, user, "draft").unwrap();

        assert!(rename_history(&env.conn, user, "draft", "final").unwrap());
        assert!(!rename_history(&env.conn, user, "draft", "again").unwrap());
        assert!(get_history(&env.conn, "final", user).unwrap().is_some());

        assert!(delete_history(&env.conn, "final", user).unwrap());
        assert!(!delete_history(&env.conn, "final", user).unwrap());
        assert!(get_history_names_by_user_id(&env.conn, user).unwrap().is_empty());
    }
}
