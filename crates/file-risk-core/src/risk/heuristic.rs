use crate::config::EngineSettings;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

lazy_static::lazy_static! {
    /// Five letters, two digits: the naming style of dropped or obfuscated executables.
    static ref OBFUSCATED_EXE: Regex =
        Regex::new(r"^[a-z]{5}[0-9]{2}\.exe$").expect("valid obfuscated-name pattern");
}

const EXECUTABLE_SUFFIX: &str = ".exe";
const SYSTEM_LOCATIONS: [&str; 3] = ["program files", r"windows\system32", "windows"];
const USER_LOCATIONS: [&str; 3] = ["downloads", "temp", "users"];
const INSTALLER_KEYWORDS: [&str; 2] = ["setup", "install"];

const SYSTEM_EXE_DELTA: f64 = -40.0;
const USER_EXE_DELTA: f64 = 30.0;
const STALE_EXE_DELTA: f64 = 20.0;
const OBFUSCATED_NAME_DELTA: f64 = 20.0;
const INSTALLER_NAME_DELTA: f64 = 10.0;

/// Metadata-only risk scoring.
#[derive(Debug, Clone)]
pub struct HeuristicScorer {
    raw_min: f64,
    raw_max: f64,
    stale_after_days: i64,
    /// `None` when the configured age is too large to represent.
    unknown_access_age: Option<Duration>,
}

impl HeuristicScorer {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            raw_min: settings.raw_score_min,
            raw_max: settings.raw_score_max,
            stale_after_days: settings.stale_after_days,
            unknown_access_age: Duration::try_days(settings.unknown_access_age_days),
        }
    }

    /// Sum of the rule deltas matched by one file.
    pub fn raw_score(
        &self,
        path: &str,
        filename: &str,
        last_accessed: Option<&str>,
        now: DateTime<Utc>,
    ) -> f64 {
        let name = filename.to_lowercase();
        let path = path.to_lowercase();
        let is_exe = name.ends_with(EXECUTABLE_SUFFIX);
        let mut score = 0.0;

        if is_exe && SYSTEM_LOCATIONS.iter().any(|loc| path.contains(loc)) {
            score += SYSTEM_EXE_DELTA;
        }

        if is_exe && USER_LOCATIONS.iter().any(|loc| path.contains(loc)) {
            score += USER_EXE_DELTA;
        }

        let accessed = last_accessed.and_then(parse_timestamp).or_else(|| {
            self.unknown_access_age
                .and_then(|age| now.checked_sub_signed(age))
        });
        let stale = match accessed {
            Some(accessed) => (now - accessed).num_days() > self.stale_after_days,
            None => true,
        };
        if is_exe && stale {
            score += STALE_EXE_DELTA;
        }

        if OBFUSCATED_EXE.is_match(&name) {
            score += OBFUSCATED_NAME_DELTA;
        }

        if INSTALLER_KEYWORDS.iter().any(|kw| name.contains(kw)) {
            score += INSTALLER_NAME_DELTA;
        }

        score
    }

    /// Map a raw score onto `[0, 100]` using the fixed configured bounds.
    pub fn normalize(&self, raw: f64) -> f64 {
        let normalized = (raw - self.raw_min) / (self.raw_max - self.raw_min) * 100.0;
        normalized.clamp(0.0, 100.0)
    }

    pub fn score(
        &self,
        path: &str,
        filename: &str,
        last_accessed: Option<&str>,
        now: DateTime<Utc>,
    ) -> f64 {
        self.normalize(self.raw_score(path, filename, last_accessed, now))
    }
}

/// Parse an ISO-8601 timestamp. Values without an offset are taken as UTC.
/// Returns `None` for anything unparseable; callers substitute their default.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = value.trim_end_matches(&['Z', 'z'][..]);
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(dt.and_utc());
        }
    }

    NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
