//! Analysis persistence (analyses table, one row per history).

use rusqlite::{params, Connection, OptionalExtension, Result};

use crate::domain::Analysis;

/// Get the analysis attached to a history
pub fn get_analysis(conn: &Connection, history_id: i64) -> Result<Option<Analysis>> {
    conn.query_row(
        r#"SELECT reference_id, alignment, linear_design, pdb
           FROM analyses WHERE history_id = ?1"#,
        params![history_id],
        |row| {
            Ok(Analysis {
                reference_id: row.get(0)?,
                alignment: row.get(1)?,
                linear_design: row.get(2)?,
                pdb: row.get(3)?,
            })
        },
    )
    .optional()
}

/// Store the analysis for a history, replacing any previous one
pub fn save_analysis(conn: &Connection, history_id: i64, analysis: &Analysis) -> Result<()> {
    conn.execute(
        r#"INSERT INTO analyses (history_id, reference_id, alignment, linear_design, pdb)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT(history_id) DO UPDATE SET
               reference_id = excluded.reference_id,
               alignment = excluded.alignment,
               linear_design = excluded.linear_design,
               pdb = excluded.pdb"#,
        params![
            history_id,
            analysis.reference_id,
            analysis.alignment,
            analysis.linear_design,
            analysis.pdb
        ],
    )?;
    Ok(())
}

/// Delete the analysis of a history, returns false if there was none
pub fn delete_analysis(conn: &Connection, history_id: i64) -> Result<bool> {
    let count = conn.execute("DELETE FROM analyses WHERE history_id = ?1", params![history_id])?;
    Ok(count > 0)
}
