use crate::error::Error;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Peers must be strictly more similar than this to count as duplicates.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.9;
/// Floor buckets applied by the fuser, highest first.
pub const DEFAULT_FLOOR_BUCKETS: [f64; 9] = [90.0, 80.0, 70.0, 60.0, 50.0, 40.0, 30.0, 20.0, 10.0];
/// Lowest reachable raw heuristic score (system-location executable alone).
pub const DEFAULT_RAW_SCORE_MIN: f64 = -40.0;
/// Highest reachable raw heuristic score (every positive rule firing).
pub const DEFAULT_RAW_SCORE_MAX: f64 = 70.0;
pub const DEFAULT_STALE_AFTER_DAYS: i64 = 180;
/// Age assumed for a file whose last access time is missing or unparseable.
pub const DEFAULT_UNKNOWN_ACCESS_AGE_DAYS: i64 = 3650;
pub const DEFAULT_DATABASE_PATH: &str = "file_risk.db";
/// Upper bound for both day counts, about a thousand years.
pub const MAX_DAY_COUNT: i64 = 365 * 1000;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: String,
    /// Host name recorded as the owner of collected files.
    pub server_name: String,
    pub root_paths: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub engine: EngineSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            server_name: default_server_name(),
            root_paths: Vec::new(),
            ignore_patterns: Vec::new(),
            engine: EngineSettings::default(),
        }
    }
}

impl AppConfig {
    pub fn to_toml(&self) -> Result<String, Error> {
        toml::to_string_pretty(self).map_err(|e| Error::Other(e.to_string()))
    }
}

/// Tunables of the risk-fusion engine.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineSettings {
    pub similarity_threshold: f64,
    pub floor_buckets: Vec<f64>,
    pub raw_score_min: f64,
    pub raw_score_max: f64,
    pub stale_after_days: i64,
    pub unknown_access_age_days: i64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            floor_buckets: DEFAULT_FLOOR_BUCKETS.to_vec(),
            raw_score_min: DEFAULT_RAW_SCORE_MIN,
            raw_score_max: DEFAULT_RAW_SCORE_MAX,
            stale_after_days: DEFAULT_STALE_AFTER_DAYS,
            unknown_access_age_days: DEFAULT_UNKNOWN_ACCESS_AGE_DAYS,
        }
    }
}

impl EngineSettings {
    /// Reject settings the engine cannot honor and put the floor buckets
    /// into strictly descending order.
    pub fn validate(mut self) -> Result<Self, Error> {
        if !(0.0..1.0).contains(&self.similarity_threshold) {
            return Err(Error::InvalidSettings(format!(
                "similarity_threshold must be in [0, 1), got {}",
                self.similarity_threshold
            )));
        }
        if !(self.raw_score_min < self.raw_score_max) {
            return Err(Error::InvalidSettings(format!(
                "raw_score_min ({}) must be below raw_score_max ({})",
                self.raw_score_min, self.raw_score_max
            )));
        }
        if self.floor_buckets.is_empty() {
            return Err(Error::InvalidSettings(
                "floor_buckets must not be empty".to_string(),
            ));
        }
        if let Some(bad) = self
            .floor_buckets
            .iter()
            .find(|b| !(**b > 0.0 && **b <= 100.0))
        {
            return Err(Error::InvalidSettings(format!(
                "floor bucket {} is outside (0, 100]",
                bad
            )));
        }
        for (name, days) in [
            ("stale_after_days", self.stale_after_days),
            ("unknown_access_age_days", self.unknown_access_age_days),
        ] {
            if !(0..=MAX_DAY_COUNT).contains(&days) {
                return Err(Error::InvalidSettings(format!(
                    "{} must be in [0, {}], got {}",
                    name, MAX_DAY_COUNT, days
                )));
            }
        }

        self.floor_buckets.sort_by(|a, b| b.total_cmp(a));
        self.floor_buckets.dedup();
        Ok(self)
    }
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(Environment::with_prefix("FILE_RISK").separator("__"))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

fn default_server_name() -> String {
    env::var("HOSTNAME")
        .or_else(|_| env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "localhost".to_string())
}

/// Remove directories that are subdirectories of other directories in the list.
pub fn non_overlapping_directories(dirs: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();

    for dir in dirs {
        let dir_path = Path::new(&dir);
        if result.iter().any(|res| dir_path.starts_with(Path::new(res))) {
            continue;
        }
        result.retain(|res| !Path::new(res).starts_with(dir_path));
        result.push(dir);
    }

    result
}
