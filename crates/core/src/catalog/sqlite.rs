//! SQLite-backed catalog store.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{CatalogEntry, CatalogError, CatalogStore, UpsertOutcome};

/// SQLite-backed catalog store, one row per title folder.
pub struct SqliteCatalogStore {
    conn: Mutex<Connection>,
}

impl SqliteCatalogStore {
    /// Opens (or creates) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open(path).map_err(|e| CatalogError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, CatalogError> {
        let conn =
            Connection::open_in_memory().map_err(|e| CatalogError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CatalogError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS catalog_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                folder_name TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                summary TEXT NOT NULL DEFAULT '',
                cover_ref TEXT NOT NULL,
                primary_video_ref TEXT NOT NULL,
                episode_count INTEGER NOT NULL DEFAULT 0,
                physical_root_path TEXT NOT NULL,
                hosting_volume TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_catalog_entries_title ON catalog_entries(title);
            "#,
        )
        .map_err(|e| CatalogError::Database(e.to_string()))?;

        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<CatalogEntry> {
        let episode_count: i64 = row.get(5)?;
        let physical_root_path: String = row.get(6)?;
        Ok(CatalogEntry {
            folder_name: row.get(0)?,
            title: row.get(1)?,
            summary: row.get(2)?,
            cover_ref: row.get(3)?,
            primary_video_ref: row.get(4)?,
            episode_count: episode_count.max(0) as usize,
            physical_root_path: PathBuf::from(physical_root_path),
            hosting_volume: row.get(7)?,
        })
    }

    fn query_entries(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params, Self::row_to_entry)
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(|e| CatalogError::Database(e.to_string()))?);
        }
        Ok(entries)
    }
}

const SELECT_COLUMNS: &str = "SELECT folder_name, title, summary, cover_ref, primary_video_ref, \
     episode_count, physical_root_path, hosting_volume FROM catalog_entries";

impl CatalogStore for SqliteCatalogStore {
    fn find_by_folder(&self, folder_name: &str) -> Result<Option<CatalogEntry>, CatalogError> {
        let conn = self.lock();
        conn.query_row(
            &format!("{} WHERE folder_name = ?", SELECT_COLUMNS),
            params![folder_name],
            Self::row_to_entry,
        )
        .optional()
        .map_err(|e| CatalogError::Database(e.to_string()))
    }

    fn upsert(&self, entry: &CatalogEntry) -> Result<UpsertOutcome, CatalogError> {
        let conn = self.lock();
        let now = Utc::now().to_rfc3339();
        let root = entry.physical_root_path.to_string_lossy().to_string();

        let updated = conn
            .execute(
                "UPDATE catalog_entries SET title = ?, summary = ?, cover_ref = ?,
                    primary_video_ref = ?, episode_count = ?, physical_root_path = ?,
                    hosting_volume = ?, updated_at = ?
                 WHERE folder_name = ?",
                params![
                    entry.title,
                    entry.summary,
                    entry.cover_ref,
                    entry.primary_video_ref,
                    entry.episode_count as i64,
                    root,
                    entry.hosting_volume,
                    now,
                    entry.folder_name,
                ],
            )
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        if updated > 0 {
            return Ok(UpsertOutcome::Updated);
        }

        conn.execute(
            "INSERT INTO catalog_entries (folder_name, title, summary, cover_ref,
                primary_video_ref, episode_count, physical_root_path, hosting_volume,
                created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                entry.folder_name,
                entry.title,
                entry.summary,
                entry.cover_ref,
                entry.primary_video_ref,
                entry.episode_count as i64,
                root,
                entry.hosting_volume,
                now,
                now,
            ],
        )
        .map_err(|e| CatalogError::Database(e.to_string()))?;

        Ok(UpsertOutcome::Inserted)
    }

    fn list(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let conn = self.lock();
        Self::query_entries(
            &conn,
            &format!("{} ORDER BY title, folder_name", SELECT_COLUMNS),
            [],
        )
    }

    fn search(&self, keyword: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
        let conn = self.lock();
        let pattern = format!("%{}%", keyword);
        Self::query_entries(
            &conn,
            &format!(
                "{} WHERE title LIKE ?1 OR folder_name LIKE ?1 ORDER BY title, folder_name",
                SELECT_COLUMNS
            ),
            params![pattern],
        )
    }

    fn update_cover(&self, folder_name: &str, cover_ref: &str) -> Result<(), CatalogError> {
        let conn = self.lock();
        let updated = conn
            .execute(
                "UPDATE catalog_entries SET cover_ref = ?, updated_at = ? WHERE folder_name = ?",
                params![cover_ref, Utc::now().to_rfc3339(), folder_name],
            )
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        if updated == 0 {
            return Err(CatalogError::NotFound(folder_name.to_string()));
        }
        Ok(())
    }

    fn delete(&self, folder_name: &str) -> Result<bool, CatalogError> {
        let conn = self.lock();
        let deleted = conn
            .execute(
                "DELETE FROM catalog_entries WHERE folder_name = ?",
                params![folder_name],
            )
            .map_err(|e| CatalogError::Database(e.to_string()))?;
        Ok(deleted > 0)
    }
}
