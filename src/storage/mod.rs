pub mod repository;

use rusqlite_migration::{Migrations, M};

use crate::error::{Error, Result};

/// Run journal database. Two `tokio_rusqlite::Connection` instances
/// (writer + reader) in WAL mode so `status` can read while the daemon writes.
#[derive(Clone)]
pub struct Database {
    writer: tokio_rusqlite::Connection,
    reader: tokio_rusqlite::Connection,
}

impl Database {
    /// Open the journal at the default path (`~/.todoist-notion-sync/journal.db`).
    pub async fn open() -> Result<Self> {
        let dir = dirs::home_dir()
            .ok_or_else(|| Error::Config("cannot determine home directory".into()))?
            .join(".todoist-notion-sync");
        std::fs::create_dir_all(&dir).map_err(|e| Error::Config(e.to_string()))?;
        Self::open_at(dir.join("journal.db")).await
    }

    pub async fn open_at(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let writer = tokio_rusqlite::Connection::open(&path).await?;
        Self::init_writer(&writer).await?;

        let reader = tokio_rusqlite::Connection::open(&path).await?;
        Self::init_reader(&reader).await?;

        Ok(Self { writer, reader })
    }

    /// Open an in-memory journal (for testing).
    pub async fn open_memory() -> Result<Self> {
        let writer = tokio_rusqlite::Connection::open_in_memory().await?;
        Self::init_writer(&writer).await?;

        // In-memory databases are per-connection, so share one.
        Ok(Self {
            reader: writer.clone(),
            writer,
        })
    }

    async fn init_writer(conn: &tokio_rusqlite::Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;\
                 PRAGMA busy_timeout=5000;",
            )
            .map_err(|e| e.to_string())?;
            let migrations = Migrations::new(vec![M::up(include_str!(
                "migrations/001_initial.sql"
            ))]);
            migrations.to_latest(conn).map_err(|e| e.to_string())?;
            Ok::<(), String>(())
        })
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn init_reader(conn: &tokio_rusqlite::Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;\
                 PRAGMA busy_timeout=5000;",
            )?;
            Ok::<(), rusqlite::Error>(())
        })
        .await?;
        Ok(())
    }

    pub fn writer(&self) -> &tokio_rusqlite::Connection {
        &self.writer
    }

    pub fn reader(&self) -> &tokio_rusqlite::Connection {
        &self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory() {
        let db = Database::open_memory().await.unwrap();

        let tables: Vec<String> = db
            .reader()
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                Ok::<Vec<String>, rusqlite::Error>(rows.filter_map(|r| r.ok()).collect())
            })
            .await
            .unwrap();

        assert!(tables.contains(&"sync_runs".to_string()));
    }

    #[tokio::test]
    async fn test_open_at_reopens_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.db");

        let db = Database::open_at(&path).await.unwrap();
        db.writer()
            .call(|conn| {
                conn.execute(
                    "INSERT INTO sync_runs (cycle, phase, status, started_at) VALUES (1, 'toward_notion', 'completed', '2025-01-01T00:00:00Z')",
                    [],
                )?;
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
        drop(db);

        // Migrations must be a no-op the second time round.
        let db = Database::open_at(&path).await.unwrap();
        let count: i64 = db
            .reader()
            .call(|conn| {
                Ok::<i64, rusqlite::Error>(
                    conn.query_row("SELECT COUNT(*) FROM sync_runs", [], |row| row.get(0))?,
                )
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
