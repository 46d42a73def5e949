use crate::embedding::Embedder;
use crate::progress::ProgressReporter;
use crate::storage::models::CollectedFile;
use chrono::{DateTime, Utc};
use glob::Pattern;
use std::fs::{self, Metadata};
use std::io;
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, error};

/// Image types handed to the embedder.
const EMBEDDABLE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
/// Smaller images are usually placeholders or thumbnails.
const MIN_EMBEDDABLE_BYTES: u64 = 1024;

pub fn compile_ignore_patterns(ignore_globs: &[String]) -> Vec<Pattern> {
    ignore_globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect()
}

struct Walk<'a> {
    ignore_patterns: &'a [Pattern],
    server_id: i64,
    scan_time: String,
    embedder: &'a dyn Embedder,
    reporter: &'a dyn ProgressReporter,
    files: Vec<CollectedFile>,
}

/// Walk the root directories and describe every regular file found,
/// skipping symlinks and anything matching an ignore pattern.
pub fn collect_files(
    root_paths: &[String],
    ignore_patterns: &[Pattern],
    server_id: i64,
    embedder: &dyn Embedder,
    reporter: &dyn ProgressReporter,
) -> io::Result<Vec<CollectedFile>> {
    let mut walk = Walk {
        ignore_patterns,
        server_id,
        scan_time: Utc::now().to_rfc3339(),
        embedder,
        reporter,
        files: Vec::new(),
    };

    for root in root_paths {
        walk.visit_dir(Path::new(root))?;
    }

    Ok(walk.files)
}

impl Walk<'_> {
    fn is_ignored(&self, path: &Path) -> bool {
        self.ignore_patterns
            .iter()
            .any(|pattern| pattern.matches_path(path))
    }

    fn visit_dir(&mut self, dir: &Path) -> io::Result<()> {
        if !dir.is_dir() || self.is_ignored(dir) {
            return Ok(());
        }

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                error!("Access denied reading directory {}: {}", dir.display(), err);
                return Ok(());
            }
            Err(err) => {
                return Err(io::Error::new(
                    err.kind(),
                    format!("Error reading directory {}: {}", dir.display(), err),
                ));
            }
        };

        for entry_result in entries {
            let entry = entry_result.map_err(|err| {
                io::Error::new(
                    err.kind(),
                    format!("Error reading entry in directory {}: {}", dir.display(), err),
                )
            })?;

            let path = entry.path();
            let metadata = match fs::symlink_metadata(&path) {
                Ok(metadata) => metadata,
                Err(err) => {
                    error!("Error getting metadata for {}: {}", path.display(), err);
                    continue;
                }
            };

            if metadata.file_type().is_symlink() {
                continue;
            }
            if metadata.is_dir() {
                self.visit_dir(&path)?;
            } else if metadata.is_file() && !self.is_ignored(&path) {
                self.record_file(&path, &metadata);
            }
        }

        Ok(())
    }

    fn record_file(&mut self, path: &Path, metadata: &Metadata) {
        let canonical = match fs::canonicalize(path) {
            Ok(p) => p,
            Err(e) => {
                error!("Error canonicalizing {}: {}", path.display(), e);
                return;
            }
        };

        let filename = canonical
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = canonical
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());
        let is_system_file = filename.starts_with('.')
            || (cfg!(windows)
                && matches!(extension.as_deref(), Some("sys") | Some("dll")));

        let embedding = match extension.as_deref() {
            Some(ext) if EMBEDDABLE_EXTENSIONS.contains(&ext) => {
                if metadata.len() < MIN_EMBEDDABLE_BYTES {
                    debug!("Skipping small or placeholder image: {}", canonical.display());
                    None
                } else {
                    self.embedder.embed(&canonical)
                }
            }
            _ => None,
        };

        let path_str = canonical.to_string_lossy().into_owned();
        self.reporter
            .on_collect_progress(self.files.len() + 1, &path_str);

        self.files.push(CollectedFile {
            path: path_str,
            filename,
            extension: extension.map(|e| format!(".{}", e)),
            size_bytes: metadata.len() as i64,
            created: rfc3339(metadata.created()),
            last_modified: rfc3339(metadata.modified()),
            last_accessed: rfc3339(metadata.accessed()),
            last_scan: self.scan_time.clone(),
            is_system_file,
            kind: "file".to_string(),
            embedding,
            server_id: self.server_id,
        });
    }
}

fn rfc3339(time: io::Result<SystemTime>) -> Option<String> {
    time.ok().map(|t| DateTime::<Utc>::from(t).to_rfc3339())
}
