use crate::config::EngineSettings;
use crate::error::Error;
use crate::progress::ProgressReporter;
use crate::risk::{
    DuplicateDetector, DuplicateIndex, HeuristicScorer, ReconcileOutcome, Reconciler,
    ScoreFuser,
};
use crate::storage::models::{FileRecord, FileStatus};
use crate::storage::CatalogStore;
use ahash::AHashSet;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub struct RiskEngine {
    settings: EngineSettings,
    scorer: HeuristicScorer,
    detector: DuplicateDetector,
    fuser: ScoreFuser,
}

/// A path whose status could not be written during a run.
#[derive(Debug, Clone)]
pub struct FailedPath {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct RunResult {
    pub detect_duration: Duration,
    pub score_duration: Duration,
    pub catalog_entries: usize,
    pub malformed_skipped: usize,
    pub repeated_skipped: usize,
    pub embedded_files: usize,
    pub duplicate_pairs: usize,
    pub inserted: usize,
    pub updated: usize,
    pub failures: Vec<FailedPath>,
}

impl RunResult {
    pub fn written(&self) -> usize {
        self.inserted + self.updated
    }
}

impl RiskEngine {
    pub fn new(settings: EngineSettings) -> Result<Self, Error> {
        let settings = settings.validate()?;
        Ok(Self {
            scorer: HeuristicScorer::new(&settings),
            detector: DuplicateDetector::new(settings.similarity_threshold),
            fuser: ScoreFuser::new(settings.floor_buckets.clone()),
            settings,
        })
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn run<S: CatalogStore + ?Sized>(
        &self,
        store: &S,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunResult, Error> {
        self.run_at(store, Utc::now(), reporter)
    }

    /// Run the full pipeline against one catalog snapshot:
    /// 1. Read every catalog entry once and validate it
    /// 2. Detect near-duplicates across all embedded files
    /// 3. Score, fuse and reconcile each file in turn
    ///
    /// Only a failed catalog read aborts the run. A failed status write is
    /// recorded in the result and the remaining files are still processed.
    pub fn run_at<S: CatalogStore + ?Sized>(
        &self,
        store: &S,
        now: DateTime<Utc>,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunResult, Error> {
        let mut result = RunResult::default();

        info!("Loading catalog...");
        let entries = store.list_files()?;
        result.catalog_entries = entries.len();

        let mut seen: AHashSet<String> = AHashSet::new();
        let mut records: Vec<FileRecord> = Vec::with_capacity(entries.len());
        for entry in entries {
            match FileRecord::try_from(entry) {
                Ok(record) => {
                    if !seen.insert(record.path.clone()) {
                        warn!("Skipping repeated catalog path {}", record.path);
                        result.repeated_skipped += 1;
                        continue;
                    }
                    records.push(record);
                }
                Err(err) => {
                    warn!("Skipping catalog record: {}", err);
                    result.malformed_skipped += 1;
                }
            }
        }
        debug!(
            "{} catalog entries, {} usable, {} malformed, {} repeated",
            result.catalog_entries,
            records.len(),
            result.malformed_skipped,
            result.repeated_skipped,
        );

        info!("Detecting near-duplicates...");
        let detect_start = Instant::now();
        let index = self.detector.detect(&records);
        result.detect_duration = detect_start.elapsed();
        result.embedded_files = index.embedded_files();
        result.duplicate_pairs = index.edge_count();
        reporter.on_detect_complete(
            result.embedded_files,
            result.duplicate_pairs,
            result.detect_duration.as_secs_f64(),
        );

        let score_start = Instant::now();
        let statuses = self.assess(&records, &index, now);
        info!("Writing {} file statuses...", statuses.len());
        let total = statuses.len();
        reporter.on_score_start(total);
        let reconciler = Reconciler::new(store);

        for (done, status) in statuses.into_iter().enumerate() {
            let path = status.path.clone();
            match reconciler.reconcile(status) {
                Ok(ReconcileOutcome::Inserted) => result.inserted += 1,
                Ok(ReconcileOutcome::Updated) => result.updated += 1,
                Err(err) => {
                    error!("Failed to store status for {}: {}", path, err);
                    result.failures.push(FailedPath {
                        path,
                        error: err.to_string(),
                    });
                }
            }
            reporter.on_score_progress(done + 1, total);
        }

        result.score_duration = score_start.elapsed();
        reporter.on_score_complete(
            result.written(),
            result.failures.len(),
            result.score_duration.as_secs_f64(),
        );
        debug!(
            "Run completed in {:.2}s: {} inserted, {} updated, {} failed",
            (result.detect_duration + result.score_duration).as_secs_f64(),
            result.inserted,
            result.updated,
            result.failures.len(),
        );

        Ok(result)
    }

    /// Compute the status of every record without touching a store.
    pub fn evaluate(&self, records: &[FileRecord], now: DateTime<Utc>) -> Vec<FileStatus> {
        let index = self.detector.detect(records);
        self.assess(records, &index, now)
    }

    /// Heuristic score plus duplicate fusion for every record.
    fn assess(
        &self,
        records: &[FileRecord],
        index: &DuplicateIndex,
        now: DateTime<Utc>,
    ) -> Vec<FileStatus> {
        let last_updated = now.to_rfc3339();
        records
            .iter()
            .map(|record| {
                let heuristic = self.scorer.score(
                    &record.path,
                    &record.filename,
                    record.last_accessed.as_deref(),
                    now,
                );
                let peers = index.peers_for(&record.path);
                let fused = self.fuser.fuse(heuristic, peers);
                FileStatus {
                    path: record.path.clone(),
                    server_id: record.server_id,
                    deletion_score: fused.final_score,
                    duplicate_score: fused.duplicate_percent,
                    duplicates: peers.to_vec(),
                    last_updated: last_updated.clone(),
                }
            })
            .collect()
    }
}
