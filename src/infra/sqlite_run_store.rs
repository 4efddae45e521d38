use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::app::ports::RunRepositoryPort;
use crate::error::{DqError, Result};
use crate::types::RunRecord;

/// Run records persisted as JSON documents in a local SQLite file
pub struct SqliteRunStore {
    conn: Mutex<Connection>,
}

impl SqliteRunStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            CREATE TABLE IF NOT EXISTS runs (
                id          TEXT PRIMARY KEY,
                project     TEXT NOT NULL,
                run_number  INTEGER NOT NULL,
                created_at  TEXT NOT NULL,
                document    TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS runs_by_project ON runs (project, run_number);
            "#,
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| DqError::Task("run store lock poisoned".to_string()))
    }
}

#[async_trait]
impl RunRepositoryPort for SqliteRunStore {
    async fn save(&self, run: &RunRecord) -> Result<()> {
        let document = serde_json::to_string(run)?;
        self.conn()?.execute(
            "INSERT INTO runs (id, project, run_number, created_at, document) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET document=excluded.document",
            params![
                run.id.to_string(),
                run.project,
                run.run_number as i64,
                run.created_at.to_rfc3339(),
                document
            ],
        )?;
        Ok(())
    }

    async fn get(&self, run_id: Uuid) -> Result<Option<RunRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT document FROM runs WHERE id = ?1")?;
        let mut rows = stmt.query(params![run_id.to_string()])?;
        if let Some(row) = rows.next()? {
            let document: String = row.get(0)?;
            Ok(Some(serde_json::from_str(&document)?))
        } else {
            Ok(None)
        }
    }

    async fn next_run_number(&self, project: &str) -> Result<u32> {
        let conn = self.conn()?;
        let max: Option<i64> = conn.query_row(
            "SELECT MAX(run_number) FROM runs WHERE project = ?1",
            params![project],
            |row| row.get(0),
        )?;
        Ok(max.unwrap_or(0) as u32 + 1)
    }

    async fn list_by_project(&self, project: &str) -> Result<Vec<RunRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT document FROM runs WHERE project = ?1 ORDER BY run_number")?;
        let documents = stmt
            .query_map(params![project], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        documents
            .iter()
            .map(|d| serde_json::from_str(d).map_err(DqError::from))
            .collect()
    }
}
