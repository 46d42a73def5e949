use serde::{Deserialize, Serialize};

/// A host that owns catalogued files.
#[derive(Debug, Clone)]
pub struct Server {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

/// A catalog row exactly as stored. Every field may be missing; the engine
/// validates it into a [`FileRecord`] before scoring.
#[derive(Debug, Clone, Default)]
pub struct CatalogEntry {
    pub path: Option<String>,
    pub filename: Option<String>,
    pub last_accessed: Option<String>,
    pub last_scan: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub server_id: Option<i64>,
}

/// A validated, read-only file record for one engine run.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub path: String,
    pub filename: String,
    pub last_accessed: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub server_id: Option<i64>,
}

impl TryFrom<CatalogEntry> for FileRecord {
    type Error = crate::Error;

    fn try_from(entry: CatalogEntry) -> Result<Self, Self::Error> {
        let path = match entry.path {
            Some(p) if !p.trim().is_empty() => p,
            _ => {
                return Err(crate::Error::MalformedRecord(format!(
                    "missing path (filename: {:?}, server: {:?})",
                    entry.filename, entry.server_id
                )))
            }
        };

        let filename = entry
            .filename
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| file_name_of(&path).to_string());

        let embedding = entry.embedding.filter(|e| !e.is_empty());

        Ok(FileRecord {
            path,
            filename,
            last_accessed: entry.last_accessed,
            embedding,
            server_id: entry.server_id,
        })
    }
}

/// Last component of a path, accepting both `/` and `\` separators so that
/// Windows paths catalogued from another host still resolve.
pub fn file_name_of(path: &str) -> &str {
    path.trim_end_matches(&['/', '\\'][..])
        .rsplit(&['/', '\\'][..])
        .next()
        .unwrap_or(path)
}

/// A file collected from disk, ready to be upserted into the catalog.
#[derive(Debug, Clone, Default)]
pub struct CollectedFile {
    pub path: String,
    pub filename: String,
    pub extension: Option<String>,
    pub size_bytes: i64,
    pub created: Option<String>,
    pub last_modified: Option<String>,
    pub last_accessed: Option<String>,
    pub last_scan: String,
    pub is_system_file: bool,
    pub kind: String,
    pub embedding: Option<Vec<f32>>,
    pub server_id: i64,
}

/// One near-duplicate peer of a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicatePeer {
    pub path: String,
    pub similarity: f64,
}

/// Derived risk status of one file. Each run replaces it wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct FileStatus {
    pub path: String,
    pub server_id: Option<i64>,
    pub deletion_score: f64,
    pub duplicate_score: f64,
    pub duplicates: Vec<DuplicatePeer>,
    pub last_updated: String,
}
