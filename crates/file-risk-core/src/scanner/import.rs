use crate::error::Error;
use crate::storage::models::{file_name_of, CollectedFile};
use crate::storage::Database;
use ahash::AHashMap;
use serde::Deserialize;
use std::io::BufRead;
use tracing::{debug, warn};

/// One line of a catalog import file.
#[derive(Debug, Deserialize)]
pub struct ImportRecord {
    pub path: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub last_accessed: Option<String>,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    /// Owning host name; the importing host when absent.
    #[serde(default)]
    pub server: Option<String>,
}

#[derive(Debug, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
}

/// Load catalog records from JSON Lines, upserting them by path. Lines that
/// fail to parse or carry a blank path are logged and skipped.
pub fn import_catalog<R: BufRead>(
    db: &Database,
    reader: R,
    default_server: &str,
) -> Result<ImportResult, Error> {
    let mut result = ImportResult::default();
    let mut server_ids: AHashMap<String, i64> = AHashMap::new();
    let mut files: Vec<CollectedFile> = Vec::new();
    let scan_time = chrono::Utc::now().to_rfc3339();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record: ImportRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping import line {}: {}", line_no + 1, e);
                result.skipped += 1;
                continue;
            }
        };
        if record.path.trim().is_empty() {
            warn!("Skipping import line {}: missing path", line_no + 1);
            result.skipped += 1;
            continue;
        }

        let server_name = record.server.as_deref().unwrap_or(default_server);
        let server_id = match server_ids.get(server_name) {
            Some(id) => *id,
            None => {
                let id = db.get_or_create_server(server_name)?;
                server_ids.insert(server_name.to_string(), id);
                id
            }
        };

        let filename = record
            .filename
            .unwrap_or_else(|| file_name_of(&record.path).to_string());
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| format!(".{}", ext.to_lowercase()));

        files.push(CollectedFile {
            is_system_file: filename.starts_with('.'),
            path: record.path,
            filename,
            extension,
            last_accessed: record.last_accessed,
            last_scan: scan_time.clone(),
            kind: "file".to_string(),
            embedding: record.embedding.filter(|e| !e.is_empty()),
            server_id,
            ..CollectedFile::default()
        });
    }

    result.imported = db.upsert_files(&files)?;
    debug!(
        "Imported {} catalog records, skipped {}",
        result.imported, result.skipped
    );
    Ok(result)
}
