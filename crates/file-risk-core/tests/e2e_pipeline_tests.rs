use chrono::{DateTime, Duration, TimeZone, Utc};
use file_risk_core::storage::models::*;
use file_risk_core::storage::{CatalogStore, Database};
use file_risk_core::{EngineSettings, Error, ProgressReporter, RiskEngine, SilentReporter};
use std::sync::Mutex;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn catalog_file(
    path: &str,
    last_accessed: Option<String>,
    embedding: Option<Vec<f32>>,
    server_id: i64,
) -> CollectedFile {
    CollectedFile {
        path: path.to_string(),
        filename: file_name_of(path).to_string(),
        last_accessed,
        last_scan: now().to_rfc3339(),
        kind: "file".to_string(),
        embedding,
        server_id,
        ..CollectedFile::default()
    }
}

/// Unit vector at the given cosine to `[1, 0]`.
fn at_cosine(cos: f32) -> Vec<f32> {
    vec![cos, (1.0 - cos * cos).sqrt()]
}

fn setup_db(files: &[(&str, Option<String>, Option<Vec<f32>>)]) -> Database {
    let db = Database::open_in_memory().unwrap();
    let server = db.get_or_create_server("host-a").unwrap();
    let collected: Vec<CollectedFile> = files
        .iter()
        .map(|(path, accessed, embedding)| {
            catalog_file(path, accessed.clone(), embedding.clone(), server)
        })
        .collect();
    db.upsert_files(&collected).unwrap();
    db
}

fn engine() -> RiskEngine {
    RiskEngine::new(EngineSettings::default()).unwrap()
}

/// Delegates to a real database but refuses status writes for one path.
struct FlakyStore<'a> {
    inner: &'a Database,
    fail_path: &'a str,
}

impl CatalogStore for FlakyStore<'_> {
    fn list_files(&self) -> Result<Vec<CatalogEntry>, Error> {
        self.inner.list_files()
    }

    fn get_status(&self, path: &str) -> Result<Option<FileStatus>, Error> {
        self.inner.get_status(path)
    }

    fn insert_status(&self, status: &FileStatus) -> Result<(), Error> {
        if status.path == self.fail_path {
            return Err(Error::Other("disk full".to_string()));
        }
        self.inner.insert_status(status)
    }

    fn update_status(&self, status: &FileStatus) -> Result<(), Error> {
        if status.path == self.fail_path {
            return Err(Error::Other("disk full".to_string()));
        }
        self.inner.update_status(status)
    }
}

struct UnreadableStore;

impl CatalogStore for UnreadableStore {
    fn list_files(&self) -> Result<Vec<CatalogEntry>, Error> {
        Err(Error::Other("connection refused".to_string()))
    }

    fn get_status(&self, _path: &str) -> Result<Option<FileStatus>, Error> {
        Ok(None)
    }

    fn insert_status(&self, _status: &FileStatus) -> Result<(), Error> {
        Ok(())
    }

    fn update_status(&self, _status: &FileStatus) -> Result<(), Error> {
        Ok(())
    }
}

#[test]
fn test_obfuscated_download_and_system_binary() {
    let db = setup_db(&[
        (r"C:\Users\bob\Downloads\abcde12.exe", None, None),
        (
            r"C:\Windows\System32\notepad.exe",
            Some(now().to_rfc3339()),
            None,
        ),
    ]);

    let result = engine().run_at(&db, now(), &SilentReporter).unwrap();
    assert_eq!(result.inserted, 2);
    assert_eq!(result.updated, 0);
    assert!(result.failures.is_empty());

    let suspicious = db
        .get_status(r"C:\Users\bob\Downloads\abcde12.exe")
        .unwrap()
        .unwrap();
    assert_eq!(suspicious.deletion_score, 100.0);
    assert_eq!(suspicious.duplicate_score, 0.0);

    let system = db
        .get_status(r"C:\Windows\System32\notepad.exe")
        .unwrap()
        .unwrap();
    assert_eq!(system.deletion_score, 0.0);
    assert_eq!(system.last_updated, now().to_rfc3339());
}

/// Records the phase callbacks in order.
#[derive(Default)]
struct RecordingReporter {
    events: Mutex<Vec<String>>,
    detect_secs: Mutex<Option<f64>>,
}

impl ProgressReporter for RecordingReporter {
    fn on_detect_complete(&self, embedded_files: usize, duplicate_pairs: usize, duration_secs: f64) {
        self.events
            .lock()
            .unwrap()
            .push(format!("detect {} {}", embedded_files, duplicate_pairs));
        *self.detect_secs.lock().unwrap() = Some(duration_secs);
    }

    fn on_score_start(&self, total_files: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("score {}", total_files));
    }
}

#[test]
fn test_detection_is_reported_before_scoring() {
    let db = setup_db(&[
        ("/photos/a.png", None, Some(vec![1.0, 0.0])),
        ("/photos/b.png", None, Some(vec![1.0, 0.0])),
        ("/docs/readme.txt", None, None),
    ]);
    let reporter = RecordingReporter::default();

    let result = engine().run_at(&db, now(), &reporter).unwrap();
    assert_eq!(
        *reporter.events.lock().unwrap(),
        vec!["detect 2 1".to_string(), "score 3".to_string()]
    );
    assert_eq!(
        *reporter.detect_secs.lock().unwrap(),
        Some(result.detect_duration.as_secs_f64())
    );
}

#[test]
fn test_near_duplicates_lift_both_files() {
    let db = setup_db(&[
        ("/photos/a.png", Some(now().to_rfc3339()), Some(vec![1.0, 0.0])),
        ("/photos/b.png", Some(now().to_rfc3339()), Some(at_cosine(0.95))),
        ("/photos/c.png", Some(now().to_rfc3339()), Some(vec![0.0, 1.0])),
    ]);

    let result = engine().run_at(&db, now(), &SilentReporter).unwrap();
    assert_eq!(result.embedded_files, 3);
    assert_eq!(result.duplicate_pairs, 1);

    let a = db.get_status("/photos/a.png").unwrap().unwrap();
    let b = db.get_status("/photos/b.png").unwrap().unwrap();
    let c = db.get_status("/photos/c.png").unwrap().unwrap();

    assert!((a.duplicate_score - 95.0).abs() < 1e-4);
    assert_eq!(a.duplicate_score, b.duplicate_score);
    assert_eq!(a.deletion_score, 90.0);
    assert_eq!(b.deletion_score, 90.0);

    assert_eq!(a.duplicates.len(), 1);
    assert_eq!(a.duplicates[0].path, "/photos/b.png");
    assert_eq!(b.duplicates[0].path, "/photos/a.png");
    assert_eq!(a.duplicates[0].similarity, b.duplicates[0].similarity);

    assert!(c.duplicates.is_empty());
    assert_eq!(c.duplicate_score, 0.0);
    assert!(c.deletion_score < 90.0);
}

#[test]
fn test_duplicate_floor_never_lowers_a_high_heuristic() {
    let db = setup_db(&[
        (r"C:\Users\bob\Downloads\abcde12.exe", None, Some(vec![1.0, 0.0])),
        (r"C:\Users\bob\Downloads\copy.png", Some(now().to_rfc3339()), Some(at_cosine(0.95))),
    ]);

    engine().run_at(&db, now(), &SilentReporter).unwrap();
    let exe = db
        .get_status(r"C:\Users\bob\Downloads\abcde12.exe")
        .unwrap()
        .unwrap();
    assert_eq!(exe.deletion_score, 100.0);
    assert!((exe.duplicate_score - 95.0).abs() < 1e-4);
}

#[test]
fn test_single_embedded_file_has_no_duplicates() {
    let db = setup_db(&[
        ("/photos/only.png", None, Some(vec![1.0, 0.0])),
        ("/docs/readme.txt", None, None),
    ]);

    let result = engine().run_at(&db, now(), &SilentReporter).unwrap();
    assert_eq!(result.embedded_files, 1);
    assert_eq!(result.duplicate_pairs, 0);

    for path in ["/photos/only.png", "/docs/readme.txt"] {
        let status = db.get_status(path).unwrap().unwrap();
        assert!(status.duplicates.is_empty());
        assert_eq!(status.duplicate_score, 0.0);
    }
}

#[test]
fn test_second_run_updates_and_is_idempotent() {
    let db = setup_db(&[
        ("/photos/a.png", None, Some(vec![1.0, 0.0])),
        ("/photos/b.png", None, Some(at_cosine(0.97))),
        (r"C:\Temp\setup.exe", None, None),
    ]);
    let engine = engine();

    let first = engine.run_at(&db, now(), &SilentReporter).unwrap();
    assert_eq!(first.inserted, 3);
    let before = db.list_statuses(0, 100).unwrap();

    let later = now() + Duration::hours(1);
    let second = engine.run_at(&db, later, &SilentReporter).unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.updated, 3);
    assert_eq!(db.count_statuses().unwrap(), 3);

    let after = db.list_statuses(0, 100).unwrap();
    assert_eq!(before.len(), after.len());
    for (x, y) in before.iter().zip(after.iter()) {
        assert_eq!(x.path, y.path);
        assert_eq!(x.server_id, y.server_id);
        assert_eq!(x.deletion_score, y.deletion_score);
        assert_eq!(x.duplicate_score, y.duplicate_score);
        assert_eq!(x.duplicates, y.duplicates);
        assert_eq!(y.last_updated, later.to_rfc3339());
    }
}

#[test]
fn test_new_catalog_path_is_inserted_alongside_updates() {
    let db = setup_db(&[("/a.txt", None, None)]);
    let engine = engine();
    engine.run_at(&db, now(), &SilentReporter).unwrap();

    let server = db.get_or_create_server("host-a").unwrap();
    db.upsert_files(&[catalog_file("/b.txt", None, None, server)])
        .unwrap();

    let result = engine.run_at(&db, now(), &SilentReporter).unwrap();
    assert_eq!(result.inserted, 1);
    assert_eq!(result.updated, 1);
    assert_eq!(db.count_statuses().unwrap(), 2);
}

#[test]
fn test_malformed_records_are_skipped() {
    let db = setup_db(&[("/good.exe", None, None)]);
    db.connection()
        .execute("INSERT INTO file (filename) VALUES ('nameless.exe')", [])
        .unwrap();
    db.connection()
        .execute("INSERT INTO file (path, filename) VALUES ('', 'blank.exe')", [])
        .unwrap();

    let result = engine().run_at(&db, now(), &SilentReporter).unwrap();
    assert_eq!(result.catalog_entries, 3);
    assert_eq!(result.malformed_skipped, 2);
    assert_eq!(result.inserted, 1);
    assert!(db.get_status("/good.exe").unwrap().is_some());
}

#[test]
fn test_wrongly_typed_columns_do_not_abort_the_run() {
    let db = setup_db(&[("/a.exe", None, None), ("/b.exe", None, None)]);
    // An embedding written as a JSON array instead of packed floats.
    db.connection()
        .execute(
            "INSERT INTO file (path, filename, embedding) VALUES ('/c.exe', 'c.exe', '[0.1,0.2]')",
            [],
        )
        .unwrap();
    // A path written as raw bytes.
    db.connection()
        .execute("INSERT INTO file (path, filename) VALUES (X'2F64', 'd.exe')", [])
        .unwrap();

    let result = engine().run_at(&db, now(), &SilentReporter).unwrap();
    assert_eq!(result.catalog_entries, 4);
    assert_eq!(result.malformed_skipped, 1);
    assert_eq!(result.inserted, 3);
    assert_eq!(result.embedded_files, 0);
    assert!(result.failures.is_empty());

    let c = db.get_status("/c.exe").unwrap().unwrap();
    assert!(c.duplicates.is_empty());
    assert_eq!(db.count_statuses().unwrap(), 3);
}

#[test]
fn test_rerun_repairs_an_undecodable_status() {
    let db = setup_db(&[("/a.exe", None, None)]);
    db.connection()
        .execute(
            "INSERT INTO file_status \
             (path, server_id, deletion_score, duplicate_score, duplicates, last_updated) \
             VALUES ('/a.exe', NULL, 0.0, 0.0, 'not json', 'earlier')",
            [],
        )
        .unwrap();
    assert!(db.get_status("/a.exe").is_err());

    let result = engine().run_at(&db, now(), &SilentReporter).unwrap();
    assert!(result.failures.is_empty());
    assert_eq!(result.updated, 1);

    let repaired = db.get_status("/a.exe").unwrap().unwrap();
    assert!(repaired.duplicates.is_empty());
    assert_eq!(repaired.last_updated, now().to_rfc3339());
}

#[test]
fn test_write_failure_does_not_abort_the_run() {
    let db = setup_db(&[
        ("/a.exe", None, None),
        ("/b.exe", None, None),
        ("/c.exe", None, None),
    ]);
    let store = FlakyStore {
        inner: &db,
        fail_path: "/b.exe",
    };

    let result = engine().run_at(&store, now(), &SilentReporter).unwrap();
    assert_eq!(result.inserted, 2);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].path, "/b.exe");
    assert!(result.failures[0].error.contains("disk full"));

    assert!(db.get_status("/a.exe").unwrap().is_some());
    assert!(db.get_status("/b.exe").unwrap().is_none());
    assert!(db.get_status("/c.exe").unwrap().is_some());
}

#[test]
fn test_catalog_read_failure_aborts_the_run() {
    let result = engine().run_at(&UnreadableStore, now(), &SilentReporter);
    assert!(result.is_err());
}

#[test]
fn test_scores_stay_in_bounds() {
    let db = setup_db(&[
        (r"C:\Users\x\Downloads\setup_installer.exe", Some("garbage".to_string()), Some(vec![1.0, 0.0])),
        (r"C:\Program Files\app\app.exe", Some(now().to_rfc3339()), Some(vec![1.0, 0.0])),
        ("/tmp/zzzzz99.exe", None, Some(vec![-1.0, 0.0])),
        ("/var/log/syslog", Some("2001-01-01".to_string()), None),
    ]);

    engine().run_at(&db, now(), &SilentReporter).unwrap();
    for status in db.list_statuses(0, 100).unwrap() {
        assert!((0.0..=100.0).contains(&status.deletion_score), "{:?}", status);
        assert!((0.0..=100.0).contains(&status.duplicate_score), "{:?}", status);
    }
}

#[test]
fn test_settings_override_threshold() {
    let files = [
        ("/a.png", None, Some(vec![1.0, 0.0])),
        ("/b.png", None, Some(at_cosine(0.85))),
    ];

    let strict = setup_db(&files);
    engine().run_at(&strict, now(), &SilentReporter).unwrap();
    assert!(strict.get_status("/a.png").unwrap().unwrap().duplicates.is_empty());

    let loose = setup_db(&files);
    let settings = EngineSettings {
        similarity_threshold: 0.75,
        ..EngineSettings::default()
    };
    RiskEngine::new(settings)
        .unwrap()
        .run_at(&loose, now(), &SilentReporter)
        .unwrap();
    let a = loose.get_status("/a.png").unwrap().unwrap();
    assert_eq!(a.duplicates.len(), 1);
    // 85% similarity exceeds the 80 bucket but not the 90 one.
    assert_eq!(a.deletion_score, 80.0);
}

#[test]
fn test_invalid_settings_are_rejected() {
    let settings = EngineSettings {
        floor_buckets: vec![],
        ..EngineSettings::default()
    };
    assert!(RiskEngine::new(settings).is_err());

    let ancient = EngineSettings {
        unknown_access_age_days: i64::MAX / 1000,
        ..EngineSettings::default()
    };
    assert!(matches!(
        RiskEngine::new(ancient),
        Err(Error::InvalidSettings(_))
    ));
}

#[test]
fn test_evaluate_without_store() {
    let records = vec![
        FileRecord {
            path: "/x/a.png".to_string(),
            filename: "a.png".to_string(),
            last_accessed: None,
            embedding: Some(vec![0.0, 1.0]),
            server_id: Some(3),
        },
        FileRecord {
            path: "/x/b.png".to_string(),
            filename: "b.png".to_string(),
            last_accessed: None,
            embedding: Some(vec![0.0, 1.0]),
            server_id: Some(3),
        },
    ];
    let statuses = engine().evaluate(&records, now());
    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[0].duplicate_score, 100.0);
    assert_eq!(statuses[0].deletion_score, 90.0);
    assert_eq!(statuses[1].server_id, Some(3));
}
