use super::models::*;
use super::sqlite::Database;
use super::CatalogStore;
use crate::error::Error;
use rusqlite::types::{Type, ValueRef};
use rusqlite::{params, OptionalExtension, Result, Row};
use tracing::{debug, warn};

impl Database {
    // ── Servers ──────────────────────────────────────────────────

    /// Look up a server by name, registering it on first sight.
    pub fn get_or_create_server(&self, name: &str) -> Result<i64> {
        let existing: Option<i64> = self
            .connection()
            .query_row(
                "SELECT id FROM server WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(id) => Ok(id),
            None => {
                let now = chrono::Utc::now().to_rfc3339();
                self.connection().execute(
                    "INSERT INTO server (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                let id = self.connection().last_insert_rowid();
                debug!("Registered server '{}' as {}", name, id);
                Ok(id)
            }
        }
    }

    pub fn list_servers(&self) -> Result<Vec<Server>> {
        let mut stmt = self
            .connection()
            .prepare("SELECT id, name, created_at FROM server ORDER BY id")?;
        let servers = stmt
            .query_map([], |row| {
                Ok(Server {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;
        Ok(servers)
    }

    // ── Catalog ──────────────────────────────────────────────────

    pub fn upsert_files(&self, files: &[CollectedFile]) -> Result<usize> {
        let tx = self.connection().unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO file \
                 (path, filename, extension, size_bytes, created, last_modified, \
                  last_accessed, last_scan, is_system_file, kind, embedding, server_id) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) \
                 ON CONFLICT(path) DO UPDATE SET \
                     filename = excluded.filename, \
                     extension = excluded.extension, \
                     size_bytes = excluded.size_bytes, \
                     created = excluded.created, \
                     last_modified = excluded.last_modified, \
                     last_accessed = excluded.last_accessed, \
                     last_scan = excluded.last_scan, \
                     is_system_file = excluded.is_system_file, \
                     kind = excluded.kind, \
                     embedding = excluded.embedding, \
                     server_id = excluded.server_id",
            )?;
            for file in files {
                count += stmt.execute(params![
                    file.path,
                    file.filename,
                    file.extension,
                    file.size_bytes,
                    file.created,
                    file.last_modified,
                    file.last_accessed,
                    file.last_scan,
                    file.is_system_file,
                    file.kind,
                    file.embedding.as_deref().map(encode_embedding),
                    file.server_id,
                ])?;
            }
        }
        tx.commit()?;
        debug!("Upserted {} catalog files", count);
        Ok(count)
    }

    pub fn count_files(&self) -> Result<i64> {
        self.connection()
            .query_row("SELECT COUNT(*) FROM file", [], |row| row.get(0))
    }

    /// Snapshot of the catalog in insertion order. A column holding the wrong
    /// storage type is dropped from its entry with a warning; only a failing
    /// statement fails the load.
    pub fn load_catalog(&self) -> Result<Vec<CatalogEntry>> {
        let mut stmt = self.connection().prepare(
            "SELECT id, path, filename, last_accessed, last_scan, embedding, server_id \
             FROM file ORDER BY id",
        )?;
        let entries = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                Ok(CatalogEntry {
                    path: text_column(row, 1, "path", id)?,
                    filename: text_column(row, 2, "filename", id)?,
                    last_accessed: text_column(row, 3, "last_accessed", id)?,
                    last_scan: text_column(row, 4, "last_scan", id)?,
                    embedding: embedding_column(row, 5, id)?,
                    server_id: integer_column(row, 6, "server_id", id)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;
        Ok(entries)
    }

    // ── File Status ──────────────────────────────────────────────

    pub fn find_status(&self, path: &str) -> Result<Option<FileStatus>> {
        self.connection()
            .query_row(
                "SELECT path, server_id, deletion_score, duplicate_score, duplicates, last_updated \
                 FROM file_status WHERE path = ?1",
                params![path],
                status_from_row,
            )
            .optional()
    }

    /// Statuses ordered by descending deletion score, then path.
    pub fn list_statuses(&self, offset: i64, limit: i64) -> Result<Vec<FileStatus>> {
        let mut stmt = self.connection().prepare(
            "SELECT path, server_id, deletion_score, duplicate_score, duplicates, last_updated \
             FROM file_status \
             ORDER BY deletion_score DESC, path \
             LIMIT ?1 OFFSET ?2",
        )?;
        let statuses = stmt
            .query_map(params![limit, offset], status_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(statuses)
    }

    pub fn has_status(&self, path: &str) -> Result<bool> {
        let found: Option<i64> = self
            .connection()
            .query_row(
                "SELECT 1 FROM file_status WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn count_statuses(&self) -> Result<i64> {
        self.connection()
            .query_row("SELECT COUNT(*) FROM file_status", [], |row| row.get(0))
    }
}

impl CatalogStore for Database {
    fn list_files(&self) -> Result<Vec<CatalogEntry>, Error> {
        Ok(self.load_catalog()?)
    }

    fn get_status(&self, path: &str) -> Result<Option<FileStatus>, Error> {
        Ok(self.find_status(path)?)
    }

    fn status_exists(&self, path: &str) -> Result<bool, Error> {
        Ok(self.has_status(path)?)
    }

    fn insert_status(&self, status: &FileStatus) -> Result<(), Error> {
        let duplicates = serde_json::to_string(&status.duplicates)?;
        self.connection().execute(
            "INSERT INTO file_status \
             (path, server_id, deletion_score, duplicate_score, duplicates, last_updated) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                status.path,
                status.server_id,
                status.deletion_score,
                status.duplicate_score,
                duplicates,
                status.last_updated,
            ],
        )?;
        Ok(())
    }

    fn update_status(&self, status: &FileStatus) -> Result<(), Error> {
        let duplicates = serde_json::to_string(&status.duplicates)?;
        let changed = self.connection().execute(
            "UPDATE file_status SET deletion_score = ?1, duplicate_score = ?2, \
             duplicates = ?3, last_updated = ?4 WHERE path = ?5",
            params![
                status.deletion_score,
                status.duplicate_score,
                duplicates,
                status.last_updated,
                status.path,
            ],
        )?;
        if changed == 0 {
            return Err(Error::Other(format!(
                "no status row to update for {}",
                status.path
            )));
        }
        Ok(())
    }
}

fn status_from_row(row: &Row<'_>) -> Result<FileStatus> {
    let duplicates_json: String = row.get(4)?;
    let duplicates: Vec<DuplicatePeer> = serde_json::from_str(&duplicates_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
    Ok(FileStatus {
        path: row.get(0)?,
        server_id: row.get(1)?,
        deletion_score: row.get(2)?,
        duplicate_score: row.get(3)?,
        duplicates,
        last_updated: row.get(5)?,
    })
}

fn text_column(row: &Row<'_>, idx: usize, name: &str, id: i64) -> Result<Option<String>> {
    match row.get_ref(idx)? {
        ValueRef::Null => Ok(None),
        ValueRef::Text(bytes) => Ok(Some(String::from_utf8_lossy(bytes).into_owned())),
        other => {
            warn!(
                "Ignoring {} of file row {}: expected text, found {}",
                name,
                id,
                other.data_type()
            );
            Ok(None)
        }
    }
}

fn integer_column(row: &Row<'_>, idx: usize, name: &str, id: i64) -> Result<Option<i64>> {
    match row.get_ref(idx)? {
        ValueRef::Null => Ok(None),
        ValueRef::Integer(value) => Ok(Some(value)),
        other => {
            warn!(
                "Ignoring {} of file row {}: expected integer, found {}",
                name,
                id,
                other.data_type()
            );
            Ok(None)
        }
    }
}

fn embedding_column(row: &Row<'_>, idx: usize, id: i64) -> Result<Option<Vec<f32>>> {
    match row.get_ref(idx)? {
        ValueRef::Null => Ok(None),
        ValueRef::Blob(bytes) => {
            let decoded = decode_embedding(bytes);
            if decoded.is_none() {
                warn!(
                    "Ignoring embedding of file row {}: {} bytes is not a whole number of f32s",
                    id,
                    bytes.len()
                );
            }
            Ok(decoded)
        }
        other => {
            warn!(
                "Ignoring embedding of file row {}: expected blob, found {}",
                id,
                other.data_type()
            );
            Ok(None)
        }
    }
}

/// Embeddings are stored as packed little-endian `f32`s.
pub(crate) fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub(crate) fn decode_embedding(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}
