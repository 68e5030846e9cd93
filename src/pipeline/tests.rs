#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    use crate::pipeline::record::{CanonicalRecord, PersistedRecord, RawRecord};
    use crate::pipeline::{
        normalize, DedupStrategy, ImportConfig, PipelineError, PipelineRunner, ProcessOutcome,
        RunListener, RunReport, RunStatus, RunSummary, Source, WriteFailurePolicy,
    };
    use crate::store::{MemoryStore, RecordStore, StoreError};

    /// Fails the `fail_on`-th save (1-based) and every save after it when
    /// `sticky`, otherwise only that one.
    struct FlakyStore {
        inner: MemoryStore,
        saves: AtomicUsize,
        fail_on: usize,
        sticky: bool,
    }

    impl FlakyStore {
        fn new(fail_on: usize, sticky: bool) -> Self {
            Self {
                inner: MemoryStore::new(),
                saves: AtomicUsize::new(0),
                fail_on,
                sticky,
            }
        }
    }

    impl RecordStore for FlakyStore {
        fn save(&self, record: &CanonicalRecord) -> Result<PersistedRecord, StoreError> {
            let attempt = self.saves.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt == self.fail_on || (self.sticky && attempt > self.fail_on) {
                return Err(StoreError::Unavailable { message: "disk full".to_string() });
            }
            self.inner.save(record)
        }

        fn find_all(&self) -> Result<Vec<PersistedRecord>, StoreError> {
            self.inner.find_all()
        }

        fn find_by_id(&self, id: u64) -> Result<Option<PersistedRecord>, StoreError> {
            self.inner.find_by_id(id)
        }

        fn update(&self, id: u64, record: &CanonicalRecord) -> Result<Option<PersistedRecord>, StoreError> {
            self.inner.update(id, record)
        }

        fn delete_by_id(&self, id: u64) -> Result<(), StoreError> {
            self.inner.delete_by_id(id)
        }

        fn count(&self) -> Result<usize, StoreError> {
            self.inner.count()
        }

        fn delete_all(&self) -> Result<(), StoreError> {
            self.inner.delete_all()
        }
    }

    /// A store whose reads always fail, so every duplicate lookup errors.
    struct UnreadableStore;

    impl RecordStore for UnreadableStore {
        fn save(&self, record: &CanonicalRecord) -> Result<PersistedRecord, StoreError> {
            Ok(PersistedRecord { id: 1, name: record.name.clone() })
        }

        fn find_all(&self) -> Result<Vec<PersistedRecord>, StoreError> {
            Err(StoreError::Unavailable { message: "read timeout".to_string() })
        }

        fn find_by_id(&self, _id: u64) -> Result<Option<PersistedRecord>, StoreError> {
            Ok(None)
        }

        fn update(&self, _id: u64, _record: &CanonicalRecord) -> Result<Option<PersistedRecord>, StoreError> {
            Ok(None)
        }

        fn delete_by_id(&self, _id: u64) -> Result<(), StoreError> {
            Ok(())
        }

        fn count(&self) -> Result<usize, StoreError> {
            Ok(0)
        }

        fn delete_all(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct HookCounts {
        before_run: usize,
        before_record: usize,
        after_record: usize,
        after_chunk: Vec<usize>,
        after_run: Vec<RunStatus>,
    }

    struct CountingListener(Arc<Mutex<HookCounts>>);

    impl RunListener for CountingListener {
        fn before_run(&mut self, _report: &RunReport) {
            self.0.lock().unwrap().before_run += 1;
        }

        fn before_record(&mut self, _record: &RawRecord, _report: &RunReport) {
            self.0.lock().unwrap().before_record += 1;
        }

        fn after_record(&mut self, _record: &RawRecord, _outcome: &ProcessOutcome, _report: &RunReport) {
            self.0.lock().unwrap().after_record += 1;
        }

        fn after_chunk(&mut self, _chunk_index: usize, report: &RunReport) {
            self.0.lock().unwrap().after_chunk.push(report.read_count);
        }

        fn after_run(&mut self, report: &RunReport) {
            self.0.lock().unwrap().after_run.push(report.status);
        }
    }

    fn config_with_chunk(chunk_size: usize) -> ImportConfig {
        ImportConfig {
            chunk_size,
            ..ImportConfig::default()
        }
    }

    fn upload(lines: &[&str]) -> Source {
        Source::upload("people.csv", lines.join("\n"))
    }

    fn run(store: Arc<dyn RecordStore>, config: ImportConfig, source: &Source) -> RunReport {
        let mut runner = PipelineRunner::new(config, store).unwrap();
        runner.run(source).unwrap()
    }

    fn stored_names(store: &dyn RecordStore) -> Vec<String> {
        store.find_all().unwrap().into_iter().map(|r| r.name).collect()
    }

    #[test]
    fn test_normalize_examples() {
        assert_eq!(normalize("john doe"), "John Doe");
        assert_eq!(normalize("  JANE   smith  "), "Jane Smith");
        assert_eq!(normalize("mARIA da silva"), "Maria Da Silva");
        assert_eq!(normalize("joão ÇALIŞKAN"), "João Çalişkan");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("ßa"), "ßa");
        assert_eq!(normalize("ﬁona ﬁ"), "ﬁona ﬁ");
        assert_eq!(normalize("ssa"), "Ssa");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "john doe",
            "  McDONALD  o'brien ",
            "ß straße",
            "ŉ test",
            "élan\tvital",
            "ΟΔΥΣΣΕΥΣ",
            "a  b   c",
            "",
        ];

        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "Failed for input: {:?}", input);
        }
    }

    #[test]
    fn test_reference_scenario() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let source = upload(&["name", "john doe", "  ", "JANE smith", "john doe"]);

        let report = run(store.clone(), ImportConfig::default(), &source);

        assert_eq!(report.read_count, 3);
        assert_eq!(report.write_count, 2);
        assert_eq!(report.duplicate_count, 1);
        assert_eq!(report.duplicates, vec!["John Doe"]);
        assert_eq!(report.skip_count, 1);
        assert_eq!(report.status, RunStatus::Completed);
        assert!(report.is_balanced());
        assert_eq!(stored_names(store.as_ref()), vec!["John Doe", "Jane Smith"]);
    }

    #[test]
    fn test_second_run_only_finds_duplicates() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let source = upload(&["name", "ana", "bruno", "CARLA", "Ana"]);

        let first = run(store.clone(), ImportConfig::default(), &source);
        assert_eq!(first.write_count, 3);
        assert_eq!(first.duplicate_count, 1);

        let second = run(store.clone(), ImportConfig::default(), &source);
        assert_eq!(second.write_count, 0);
        assert_eq!(second.duplicate_count, 4);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_case_variants_in_one_chunk() {
        for strategy in [DedupStrategy::Memory, DedupStrategy::Scan] {
            let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
            let config = ImportConfig {
                dedup_strategy: strategy,
                ..ImportConfig::default()
            };

            let report = run(store.clone(), config, &upload(&["name", "maria", "MARIA"]));

            assert_eq!(report.write_count, 1, "strategy {:?}", strategy);
            assert_eq!(report.duplicate_count, 1, "strategy {:?}", strategy);
            assert_eq!(report.duplicates, vec!["Maria"]);
            assert_eq!(store.count().unwrap(), 1);
        }
    }

    #[test]
    fn test_duplicate_across_chunk_boundary() {
        for strategy in [DedupStrategy::Memory, DedupStrategy::Scan] {
            let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
            let config = ImportConfig {
                chunk_size: 2,
                dedup_strategy: strategy,
                ..ImportConfig::default()
            };

            let report = run(store.clone(), config, &upload(&["name", "a", "b", "A", "c"]));

            assert_eq!(report.read_count, 4);
            assert_eq!(report.write_count, 3);
            assert_eq!(report.duplicates, vec!["A"]);
            assert_eq!(report.commit_count, 2);
        }

        for chunk_size in [1, 2] {
            let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
            let report = run(store.clone(), config_with_chunk(chunk_size), &upload(&["name", "a", "a"]));
            assert_eq!(report.write_count, 1);
            assert_eq!(report.duplicate_count, 1);
            assert_eq!(store.count().unwrap(), 1);
        }
    }

    #[test]
    fn test_existing_records_are_duplicates() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::with_names(["John Doe"]));
        let report = run(store, ImportConfig::default(), &upload(&["name", "JOHN DOE", "jane"]));

        assert_eq!(report.duplicates, vec!["John Doe"]);
        assert_eq!(report.write_count, 1);
    }

    #[test]
    fn test_header_only_source() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());

        let report = run(store.clone(), ImportConfig::default(), &upload(&["name"]));
        assert_eq!(report.read_count, 0);
        assert_eq!(report.status, RunStatus::Completed);

        let report = run(store, ImportConfig::default(), &Source::upload("empty.csv", Vec::new()));
        assert_eq!(report.read_count, 0);
        assert_eq!(report.status, RunStatus::Completed);
    }

    #[test]
    fn test_header_is_dropped_whatever_it_contains() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let report = run(store.clone(), ImportConfig::default(), &upload(&["john doe", "jane doe"]));

        assert_eq!(report.read_count, 1);
        assert_eq!(stored_names(store.as_ref()), vec!["Jane Doe"]);
    }

    #[test]
    fn test_missing_source_fails_before_reading() {
        let temp_dir = tempdir().unwrap();
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let mut runner = PipelineRunner::new(ImportConfig::default(), store).unwrap();

        let failure = runner
            .run(&Source::path(temp_dir.path().join("missing.csv")))
            .unwrap_err();

        assert!(matches!(failure.error, PipelineError::SourceNotFound { .. }));
        assert_eq!(failure.report.read_count, 0);
        assert_eq!(failure.report.status, RunStatus::Failed);
    }

    #[test]
    fn test_directory_source_is_unreadable() {
        let temp_dir = tempdir().unwrap();
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let mut runner = PipelineRunner::new(ImportConfig::default(), store).unwrap();

        let failure = runner.run(&Source::path(temp_dir.path())).unwrap_err();
        assert!(matches!(failure.error, PipelineError::SourceUnreadable { .. }));
    }

    #[test]
    fn test_file_source_with_crlf_and_extra_columns() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("data.csv");
        fs::write(&path, "name,age\r\nana lima,31\r\n\r\n , 40\r\nBRUNO,22\r\n").unwrap();

        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let report = run(store.clone(), ImportConfig::default(), &Source::path(&path));

        assert_eq!(report.read_count, 3);
        assert_eq!(report.write_count, 2);
        assert_eq!(report.skip_count, 1);
        assert_eq!(report.duplicate_count, 0);
        assert_eq!(stored_names(store.as_ref()), vec!["Ana Lima", "Bruno"]);
    }

    #[test]
    fn test_invalid_utf8_line_is_a_record_error() {
        let mut content = b"name\nana\n".to_vec();
        content.extend_from_slice(&[0x62, 0xff, 0x6f, b'\n']);
        content.extend_from_slice(b"carla\n");

        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let report = run(store, ImportConfig::default(), &Source::upload("bad.csv", content));

        assert_eq!(report.read_count, 3);
        assert_eq!(report.write_count, 2);
        assert_eq!(report.error_count, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.status, RunStatus::CompletedWithErrors);
        assert!(report.is_balanced());
    }

    #[test]
    fn test_run_fails_when_every_lookup_fails() {
        let store: Arc<dyn RecordStore> = Arc::new(UnreadableStore);
        let config = ImportConfig {
            dedup_strategy: DedupStrategy::Scan,
            ..ImportConfig::default()
        };
        let mut runner = PipelineRunner::new(config, store).unwrap();

        let failure = runner.run(&upload(&["name", "ana", "bruno"])).unwrap_err();

        // every record was still processed before the run was judged
        assert!(matches!(failure.error, PipelineError::AllRecordsFailed { records_read: 2 }));
        let report = failure.report;
        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.read_count, 2);
        assert_eq!(report.write_count, 0);
        assert_eq!(report.error_count, 2);
        assert!(report.errors[0].contains("read timeout"));
        assert!(report.is_balanced());
    }

    #[test]
    fn test_single_invalid_record_fails_the_run() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let mut runner = PipelineRunner::new(ImportConfig::default(), store).unwrap();

        let failure = runner
            .run(&Source::upload("bad.csv", b"name\n\x62\xff\n".to_vec()))
            .unwrap_err();
        assert!(matches!(failure.error, PipelineError::AllRecordsFailed { records_read: 1 }));
        assert_eq!(failure.report.error_count, 1);

        let summary = RunSummary::from_report(&failure.report, Some(&failure.error.to_string()));
        assert_eq!(summary.exit_status, "FAILED");
        assert_eq!(summary.errors.len(), 1);
    }

    #[test]
    fn test_errors_with_a_skip_still_complete() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let report = run(
            store,
            ImportConfig::default(),
            &Source::upload("mixed.csv", b"name\n ,x\n\x62\xff\n".to_vec()),
        );

        assert_eq!(report.skip_count, 1);
        assert_eq!(report.error_count, 1);
        assert_eq!(report.status, RunStatus::CompletedWithErrors);
    }

    #[test]
    fn test_names_differing_only_by_sharp_s_are_distinct() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let report = run(store.clone(), ImportConfig::default(), &upload(&["name", "ßa", "ssa", "SSA"]));

        assert_eq!(report.write_count, 2);
        assert_eq!(report.duplicates, vec!["Ssa"]);
        assert_eq!(stored_names(store.as_ref()), vec!["ßa", "Ssa"]);
    }

    #[test]
    fn test_write_failure_aborts_by_default() {
        let store = Arc::new(FlakyStore::new(2, false));
        let mut runner = PipelineRunner::new(ImportConfig::default(), store.clone()).unwrap();
        let source = upload(&["name", "a", "b", "c", "d", "e", "f", "g"]);

        let failure = runner.run(&source).unwrap_err();

        assert!(matches!(failure.error, PipelineError::WriteFailed { index: 1, .. }));
        let report = failure.report;
        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.read_count, 5);
        assert_eq!(report.write_count, 1);
        assert_eq!(report.error_count, 4);
        assert!(report.is_balanced());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_write_failure_can_continue() {
        let store = Arc::new(FlakyStore::new(2, false));
        let config = ImportConfig {
            write_failure_policy: WriteFailurePolicy::Continue,
            ..ImportConfig::default()
        };
        let mut runner = PipelineRunner::new(config, store.clone()).unwrap();
        let source = upload(&["name", "a", "b", "c", "d", "e", "f", "g", "B"]);

        let report = runner.run(&source).unwrap();

        assert_eq!(report.status, RunStatus::CompletedWithErrors);
        assert_eq!(report.read_count, 8);
        assert_eq!(report.write_count, 4);
        assert_eq!(report.error_count, 4);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("'B'"));
        // "b" never reached the store, so its second spelling is not a duplicate
        assert_eq!(report.duplicate_count, 0);
        assert!(report.is_balanced());
        assert_eq!(stored_names(store.as_ref()), vec!["A", "F", "G", "B"]);
    }

    #[test]
    fn test_shutdown_is_honored_between_chunks() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let flag = Arc::new(AtomicBool::new(true));
        let mut runner = PipelineRunner::new(ImportConfig::default(), store)
            .unwrap()
            .with_shutdown_signal(flag);

        let failure = runner.run(&upload(&["name", "a", "b"])).unwrap_err();
        assert!(matches!(failure.error, PipelineError::Interrupted { records_read: 0 }));
        assert_eq!(failure.report.status, RunStatus::Failed);
    }

    #[test]
    fn test_hooks_are_called_in_order() {
        let counts = Arc::new(Mutex::new(HookCounts::default()));
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let mut runner = PipelineRunner::new(config_with_chunk(2), store)
            .unwrap()
            .with_listener(CountingListener(counts.clone()));

        runner.run(&upload(&["name", "a", "b", "c", "d", "e"])).unwrap();

        let counts = counts.lock().unwrap();
        assert_eq!(counts.before_run, 1);
        assert_eq!(counts.before_record, 5);
        assert_eq!(counts.after_record, 5);
        assert_eq!(counts.after_chunk, vec![2, 4, 5]);
        assert_eq!(counts.after_run, vec![RunStatus::Completed]);
    }

    #[test]
    fn test_summary_omits_empty_collections() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let report = run(store.clone(), ImportConfig::default(), &upload(&["name", "ana"]));

        let summary = RunSummary::from_report(&report, None);
        assert_eq!(summary.message, "File processed successfully");
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["status"], "COMPLETED");
        assert_eq!(json["readCount"], 1);
        assert_eq!(json["filename"], "people.csv");
        assert!(json.get("duplicates").is_none());
        assert!(json.get("errors").is_none());

        let report = run(store, ImportConfig::default(), &upload(&["name", "ANA"]));
        let summary = RunSummary::from_report(&report, None);
        assert_eq!(summary.message, "Processed: 0 saved, 1 duplicates skipped");
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["duplicates"][0], "Ana");
    }

    #[test]
    fn test_config_validation() {
        let mut config = ImportConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 5);

        config.chunk_size = 0;
        assert!(config.validate().is_err());

        config.chunk_size = 5;
        config.max_concurrent_runs = 0;
        assert!(config.validate().is_err());

        config.max_concurrent_runs = 2;
        config.io_buffer_size_kb = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_round_trip_and_partial_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.json");

        fs::write(&path, r#"{ "chunk_size": 3, "write_failure_policy": "continue" }"#).unwrap();
        let config = ImportConfig::from_file(&path).unwrap();
        assert_eq!(config.chunk_size, 3);
        assert_eq!(config.write_failure_policy, WriteFailurePolicy::Continue);
        assert_eq!(config.dedup_strategy, DedupStrategy::Memory);

        fs::write(&path, r#"{ "chunk_size": 0 }"#).unwrap();
        assert!(ImportConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_resolve_source() {
        let config = ImportConfig::default();
        assert_eq!(config.resolve_source(None), std::path::Path::new("data").join("data.csv"));
        assert_eq!(config.resolve_source(Some("people")), std::path::Path::new("data").join("people.csv"));
        assert_eq!(config.resolve_source(Some("people.CSV")), std::path::Path::new("data").join("people.CSV"));

        let absolute = std::env::temp_dir().join("upload.csv");
        assert_eq!(config.resolve_source(absolute.to_str()), absolute);
    }
}
