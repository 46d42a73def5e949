pub mod import;
pub mod walk;

use crate::config::{self, AppConfig};
use crate::embedding::Embedder;
use crate::error::Error;
use crate::progress::ProgressReporter;
use crate::storage::Database;
use std::time::Instant;
use tracing::{debug, info};

/// Walk the configured roots and upsert what was found into the catalog,
/// owned by the configured host. Returns the number of files written.
pub fn collect_into(
    db: &Database,
    config: &AppConfig,
    embedder: &dyn Embedder,
    reporter: &dyn ProgressReporter,
) -> Result<usize, Error> {
    let roots = config::non_overlapping_directories(config.root_paths.clone());
    info!("Collecting files under {:?}", roots);

    let server_id = db.get_or_create_server(&config.server_name)?;
    let ignore_patterns = walk::compile_ignore_patterns(&config.ignore_patterns);

    reporter.on_collect_start();
    let start = Instant::now();
    let files = walk::collect_files(&roots, &ignore_patterns, server_id, embedder, reporter)?;
    let embedded = files.iter().filter(|f| f.embedding.is_some()).count();
    let written = db.upsert_files(&files)?;
    reporter.on_collect_complete(files.len(), start.elapsed().as_secs_f64());

    debug!(
        "Collected {} files ({} embedded) in {:.2}s",
        files.len(),
        embedded,
        start.elapsed().as_secs_f64()
    );
    Ok(written)
}
