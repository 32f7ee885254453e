use rusqlite::{params, Connection};
use serde::Serialize;

use crate::sync::SyncReport;

/// Rows kept by [`prune_runs`] when the daemon trims the journal.
pub const JOURNAL_RETENTION: usize = 1000;

// ── Sync Runs ──────────────────────────────────────────────────────

/// One journal row as read back for `status`.
#[derive(Debug, Clone, Serialize)]
pub struct SyncRunRow {
    pub id: i64,
    pub cycle: u64,
    pub phase: String,
    pub status: String,
    pub started_at: String,
    pub finished_at: String,
    pub items_created: u64,
    pub items_updated: u64,
    pub items_completed: u64,
    pub items_reopened: u64,
    pub items_failed: u64,
    pub cursor: Option<i64>,
    pub error_message: Option<String>,
}

pub fn insert_sync_run(
    conn: &Connection,
    cycle: u64,
    report: &SyncReport,
) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO sync_runs (
            cycle, phase, status, started_at, finished_at,
            items_created, items_updated, items_completed, items_reopened, items_failed,
            cursor, error_message
         ) VALUES (?1, ?2, ?3, ?4, datetime('now'), ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            cycle as i64,
            report.phase.as_str(),
            report.status.as_str(),
            report.started_at.to_rfc3339(),
            report.items_created as i64,
            report.items_updated as i64,
            report.items_completed as i64,
            report.items_reopened as i64,
            report.items_failed as i64,
            report.cursor.and_then(|c| c.as_i64()),
            report.error,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Most recent rows first.
pub fn list_recent_runs(conn: &Connection, limit: usize) -> Result<Vec<SyncRunRow>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT id, cycle, phase, status, started_at, finished_at,
                items_created, items_updated, items_completed, items_reopened, items_failed,
                cursor, error_message
         FROM sync_runs ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit as i64], |row| {
        Ok(SyncRunRow {
            id: row.get(0)?,
            cycle: row.get::<_, i64>(1)? as u64,
            phase: row.get(2)?,
            status: row.get(3)?,
            started_at: row.get(4)?,
            finished_at: row.get(5)?,
            items_created: row.get::<_, i64>(6)? as u64,
            items_updated: row.get::<_, i64>(7)? as u64,
            items_completed: row.get::<_, i64>(8)? as u64,
            items_reopened: row.get::<_, i64>(9)? as u64,
            items_failed: row.get::<_, i64>(10)? as u64,
            cursor: row.get(11)?,
            error_message: row.get(12)?,
        })
    })?;
    rows.collect()
}

/// Delete all but the newest `keep` rows. Returns the number deleted.
pub fn prune_runs(conn: &Connection, keep: usize) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "DELETE FROM sync_runs WHERE id NOT IN (
            SELECT id FROM sync_runs ORDER BY id DESC LIMIT ?1
         )",
        params![keep as i64],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use crate::sync::{Cursor, SyncPhase, SyncStatus};

    fn report(phase: SyncPhase) -> SyncReport {
        let mut r = SyncReport::new(phase);
        r.items_created = 2;
        r.cursor = Some(Cursor::At(4));
        r.finish()
    }

    #[tokio::test]
    async fn test_sync_run_round_trip() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                let id = insert_sync_run(conn, 7, &report(SyncPhase::TowardNotion))?;
                assert!(id > 0);

                let mut failed = SyncReport::new(SyncPhase::NotionFlags);
                failed.items_failed = 1;
                insert_sync_run(conn, 7, &failed.finish())?;

                let rows = list_recent_runs(conn, 10)?;
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0].phase, "notion_flags");
                assert_eq!(rows[0].status, SyncStatus::Failed.as_str());
                assert_eq!(rows[0].error_message.as_deref(), Some("1 items failed"));
                assert_eq!(rows[0].cursor, None);
                assert_eq!(rows[1].cycle, 7);
                assert_eq!(rows[1].items_created, 2);
                assert_eq!(rows[1].cursor, Some(4));
                assert_eq!(rows[1].status, "completed");
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_cursor_stored_as_minus_one() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                let mut r = SyncReport::new(SyncPhase::TowardTodoist);
                r.cursor = Some(Cursor::Empty);
                insert_sync_run(conn, 1, &r.finish())?;
                assert_eq!(list_recent_runs(conn, 1)?[0].cursor, Some(-1));
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_prune_keeps_newest() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                for cycle in 1..=5 {
                    insert_sync_run(conn, cycle, &report(SyncPhase::TowardNotion))?;
                }
                assert_eq!(prune_runs(conn, 2)?, 3);
                let rows = list_recent_runs(conn, 10)?;
                let cycles: Vec<u64> = rows.iter().map(|r| r.cycle).collect();
                assert_eq!(cycles, vec![5, 4]);
                assert_eq!(prune_runs(conn, 2)?, 0);
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }
}
