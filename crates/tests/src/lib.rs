//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约与配置测试
//! - 端到端管道场景（内存 source + 记录型 sink）
//! - 真实 file sink 的字节守恒

#[cfg(test)]
mod support {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use bulkload_cli::PipelineConfig;
    use contracts::{BatchSink, ContractError, LoadConfig};
    use ingestion::LineSource;

    /// Observations shared by every sink of one run
    #[derive(Clone, Default)]
    pub struct Recorded {
        pub calls: Arc<AtomicUsize>,
        pub bytes: Arc<AtomicU64>,
        pub payloads: Arc<Mutex<Vec<(String, bool, Vec<u8>)>>>,
        /// Set once any sink has failed; deliveries after it are counted here
        pub failed: Arc<Mutex<bool>>,
        pub after_failure: Arc<AtomicUsize>,
    }

    /// Sink that records every payload it accepts
    pub struct RecordingSink {
        name: String,
        destination: String,
        recorded: Recorded,
        calls: usize,
        fail_on_call: Option<usize>,
        delay: Duration,
    }

    impl RecordingSink {
        pub fn new(destination: impl Into<String>, recorded: &Recorded) -> Self {
            let destination = destination.into();
            Self {
                name: format!("recording({destination})"),
                destination,
                recorded: recorded.clone(),
                calls: 0,
                fail_on_call: None,
                delay: Duration::ZERO,
            }
        }

        pub fn failing_on(mut self, call: usize) -> Self {
            self.fail_on_call = Some(call);
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    impl BatchSink for RecordingSink {
        fn name(&self) -> &str {
            &self.name
        }

        fn destination(&self) -> &str {
            &self.destination
        }

        async fn deliver(
            &mut self,
            payload: &[u8],
            compressed: bool,
        ) -> Result<usize, ContractError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            self.calls += 1;
            self.recorded.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on_call == Some(self.calls) {
                *self.recorded.failed.lock().unwrap() = true;
                return Err(ContractError::sink_write(&self.name, "rejected by test"));
            }
            if *self.recorded.failed.lock().unwrap() {
                self.recorded.after_failure.fetch_add(1, Ordering::SeqCst);
            }

            self.recorded
                .bytes
                .fetch_add(payload.len() as u64, Ordering::SeqCst);
            self.recorded.payloads.lock().unwrap().push((
                self.destination.clone(),
                compressed,
                payload.to_vec(),
            ));
            Ok(payload.len())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    /// Newline-delimited dataset: `items` items of two lines each, with a size marker
    pub fn dataset(items: usize) -> String {
        let mut data = format!("dataset-size:{items},{}\n", items * 4);
        for i in 0..items {
            data.push_str(&format!(
                "{{\"index\":{{\"_index\":\"cpu\"}}}}\n{{\"host\":\"h{}\",\"usage_user\":{},\"usage_idle\":{}}}\n",
                i % 10,
                i % 100,
                100 - i % 100
            ));
        }
        data
    }

    pub fn source(data: impl Into<Vec<u8>>) -> LineSource<Cursor<Vec<u8>>> {
        LineSource::new("memory", Cursor::new(data.into()))
    }

    pub fn config(workers: usize, batch_size: usize, gzip: bool) -> PipelineConfig {
        PipelineConfig {
            load: LoadConfig {
                workers,
                batch_size,
                gzip,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ConfigVersion, LoaderConfig};

    #[test]
    fn test_default_config_needs_targets() {
        let mut config = LoaderConfig::default();
        assert_eq!(config.version, ConfigVersion::V1);
        let err = config_loader::validate(&config).unwrap_err();
        assert!(err.to_string().contains("targets"));

        config.load.do_load = false;
        config_loader::validate(&config).unwrap();
    }

    #[test]
    fn test_config_file_roundtrip() {
        let mut config = LoaderConfig::default();
        config.load.workers = 8;
        config.load.item_limit = 2500;
        config
            .targets
            .push(contracts::TargetConfig::http("es", "http://localhost:9200"));

        let toml = ConfigLoader::to_toml(&config).unwrap();
        let parsed = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(parsed.load.workers, 8);
        assert_eq!(parsed.load.item_limit(), Some(2500));
        assert_eq!(parsed.targets.len(), 1);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::BTreeSet;
    use std::io::Read;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use bulkload_cli::{Pipeline, PipelineConfig, PipelineError};
    use contracts::{SinkType, TargetConfig};
    use dispatcher::DispatcherError;
    use ingestion::IngestionError;
    use rand::Rng;

    use crate::support::{config, dataset, source, Recorded, RecordingSink};

    fn sinks(workers: usize, recorded: &Recorded) -> Vec<RecordingSink> {
        (0..workers)
            .map(|i| RecordingSink::new(format!("sink-{i}"), recorded))
            .collect()
    }

    /// 10,000 lines -> 5,000 items -> 5 batches of 1,000 over 4 workers
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_e2e_full_dataset() {
        let recorded = Recorded::default();
        let pipeline = Pipeline::new(config(4, 1000, true)).with_hostname("e2e");

        let outcome = pipeline
            .run_with_sinks(source(dataset(5000)), sinks(4, &recorded))
            .await
            .unwrap();

        assert_eq!(outcome.scan.lines, 10_000);
        assert_eq!(outcome.stats.items, 5000);
        assert_eq!(outcome.stats.values, 20_000);
        assert_eq!(outcome.stats.batches, 5);
        assert_eq!(outcome.stats.workers, 4);
        assert_eq!(outcome.pool.batches(), 5);
        assert_eq!(outcome.pool.items(), 5000);
        assert!(outcome.pool.workers.iter().all(|w| w.items % 1000 == 0));
        assert_eq!(recorded.calls.load(Ordering::SeqCst), 5);
        assert!(outcome.stats.summary_line().starts_with("loaded 5000 items in "));
    }

    /// Item limit stops the scan early and skips the dataset size check
    #[tokio::test]
    async fn test_e2e_item_limit() {
        let recorded = Recorded::default();
        let mut cfg = config(2, 1000, false);
        cfg.load.item_limit = 2500;
        let pipeline = Pipeline::new(cfg);

        let outcome = pipeline
            .run_with_sinks(source(dataset(5000)), sinks(2, &recorded))
            .await
            .unwrap();

        assert!(outcome.scan.limit_reached);
        assert_eq!(outcome.stats.items, 2500);
        assert_eq!(outcome.stats.batches, 3);
        assert_eq!(outcome.pool.items(), 2500);
        assert_eq!(recorded.calls.load(Ordering::SeqCst), 3);
    }

    /// A sink failing on its third call aborts the whole run
    #[tokio::test]
    async fn test_e2e_delivery_failure_aborts_run() {
        let recorded = Recorded::default();
        let pipeline = Pipeline::new(config(1, 100, false));
        let sink = RecordingSink::new("flaky", &recorded).failing_on(3);

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            pipeline.run_with_sinks(source(dataset(5000)), vec![sink]),
        )
        .await
        .expect("pipeline must not hang after a delivery failure");

        let err = result.unwrap_err();
        assert!(err.is_load_failure());
        match err {
            PipelineError::Dispatch(DispatcherError::Delivery { seq, .. }) => assert_eq!(seq, 2),
            other => panic!("expected delivery error, got {other:?}"),
        }
        assert_eq!(recorded.calls.load(Ordering::SeqCst), 3);
        assert_eq!(recorded.after_failure.load(Ordering::SeqCst), 0);
    }

    /// With several workers no sink accepts a batch once one has failed
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_e2e_failure_stops_other_workers() {
        let recorded = Recorded::default();
        let pipeline = Pipeline::new(config(3, 50, false));
        let mut all = sinks(2, &recorded)
            .into_iter()
            .map(|s| s.with_delay(Duration::from_millis(20)))
            .collect::<Vec<_>>();
        all.push(RecordingSink::new("flaky", &recorded).failing_on(3));

        let err = pipeline
            .run_with_sinks(source(dataset(5000)), all)
            .await
            .unwrap_err();

        assert_eq!(err.stage(), "delivery");
        // 100 batches in total; the run ended long before they were all sent
        assert!(recorded.payloads.lock().unwrap().len() < 100);
    }

    /// Uncompressed: bytes handed to sinks equal bytes scanned
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_bytes_round_trip() {
        let recorded = Recorded::default();
        let pipeline = Pipeline::new(config(3, 333, false));

        let outcome = pipeline
            .run_with_sinks(source(dataset(4000)), sinks(3, &recorded))
            .await
            .unwrap();

        assert_eq!(recorded.bytes.load(Ordering::SeqCst), outcome.stats.bytes);
        assert_eq!(outcome.pool.raw_bytes(), outcome.stats.bytes);
        assert_eq!(outcome.pool.body_bytes(), outcome.stats.bytes);
        assert!(recorded
            .payloads
            .lock()
            .unwrap()
            .iter()
            .all(|(_, compressed, _)| !compressed));
    }

    /// Gzip bodies decompress back to the scanned items, in order
    #[tokio::test]
    async fn test_e2e_gzip_bodies_decode_to_input() {
        let recorded = Recorded::default();
        let pipeline = Pipeline::new(config(1, 64, true));
        let data = dataset(500);

        let outcome = pipeline
            .run_with_sinks(source(data.clone()), sinks(1, &recorded))
            .await
            .unwrap();

        let mut decoded = String::new();
        for (_, compressed, body) in recorded.payloads.lock().unwrap().iter() {
            assert!(compressed);
            flate2::read::GzDecoder::new(body.as_slice())
                .read_to_string(&mut decoded)
                .unwrap();
        }

        let expected: String = data.lines().skip(1).map(|l| format!("{l}\n")).collect();
        assert_eq!(decoded, expected);
        assert!(outcome.pool.body_bytes() < outcome.stats.bytes);
    }

    /// Worker i targets endpoint i % M, and every endpoint gets traffic
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_e2e_every_endpoint_receives_batches() {
        let endpoints = vec![
            TargetConfig::http("es-0", "http://es-0:9200"),
            TargetConfig::http("es-1", "http://es-1:9200"),
            TargetConfig::http("es-2", "http://es-2:9200"),
        ];
        let workers = 5;
        let recorded = Recorded::default();
        let sinks: Vec<RecordingSink> = dispatcher::assign_targets(workers, &endpoints)
            .into_iter()
            .map(|t| {
                RecordingSink::new(t.params["url"].clone(), &recorded)
                    .with_delay(Duration::from_millis(10))
            })
            .collect();

        let pipeline = Pipeline::new(config(workers, 100, false));
        let outcome = pipeline
            .run_with_sinks(source(dataset(3000)), sinks)
            .await
            .unwrap();

        assert_eq!(outcome.stats.batches, 30);
        let per_destination = outcome.pool.batches_per_destination();
        let hit: BTreeSet<&str> = per_destination.keys().map(String::as_str).collect();
        assert_eq!(
            hit,
            BTreeSet::from(["http://es-0:9200", "http://es-1:9200", "http://es-2:9200"])
        );
        assert_eq!(per_destination.values().sum::<u64>(), 30);
    }

    /// Count mismatch against the announced dataset size is fatal
    #[tokio::test]
    async fn test_e2e_dataset_size_mismatch() {
        let recorded = Recorded::default();
        let data = dataset(100).replacen("dataset-size:100,", "dataset-size:101,", 1);
        let pipeline = Pipeline::new(config(2, 10, false));

        let err = pipeline
            .run_with_sinks(source(data), sinks(2, &recorded))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Scan(IngestionError::ItemCountMismatch {
                actual: 100,
                expected: 101
            })
        ));
    }

    /// Random line counts that do not fill whole items never produce RunStats
    #[tokio::test]
    async fn test_e2e_partial_item_is_fatal() {
        let mut rng = rand::rng();

        for _ in 0..20 {
            let lines_per_item = rng.random_range(2..=5usize);
            let mut lines = rng.random_range(1..400usize);
            if lines % lines_per_item == 0 {
                lines += 1;
            }

            let data: String = (0..lines).map(|i| format!("{{\"n\":{i}}}\n")).collect();
            let mut cfg = config(2, rng.random_range(1..50), false);
            cfg.load.lines_per_item = lines_per_item;

            let recorded = Recorded::default();
            let result = Pipeline::new(cfg)
                .run_with_sinks(source(data), sinks(2, &recorded))
                .await;

            match result {
                Err(PipelineError::Scan(IngestionError::LineCountMismatch { lines: got, .. })) => {
                    assert_eq!(got, lines as u64)
                }
                other => panic!(
                    "lines={lines} per_item={lines_per_item}: {:?}",
                    other.map(|o| o.stats)
                ),
            }
        }
    }

    /// Telemetry emits one point per delivered batch and drains on shutdown
    #[tokio::test]
    async fn test_e2e_telemetry_counts_batches() {
        let recorded = Recorded::default();
        let mut cfg = config(2, 100, false);
        cfg.telemetry.enabled = true;
        cfg.telemetry.stderr = true;
        let pipeline = Pipeline::new(cfg).with_hostname("bench-host");

        let outcome = pipeline
            .run_with_sinks(source(dataset(1000)), sinks(2, &recorded))
            .await
            .unwrap();

        let telemetry = outcome.telemetry.expect("telemetry enabled");
        assert_eq!(telemetry.received, 10);
        assert_eq!(telemetry.sent, 10);
        assert_eq!(telemetry.dropped, 0);
    }

    /// Config file through real file sinks: every scanned byte lands on disk
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_file_targets_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let out_a = dir.path().join("a.ndjson");
        let out_b = dir.path().join("b.ndjson");
        let toml = format!(
            r#"
[load]
workers = 4
batch_size = 250
gzip = false

[[targets]]
name = "a"
sink_type = "file"
params = {{ path = "{}" }}

[[targets]]
name = "b"
sink_type = "file"
params = {{ path = "{}" }}
"#,
            out_a.display(),
            out_b.display()
        );
        let loaded = config_loader::ConfigLoader::load_from_str(
            &toml,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();
        assert!(loaded.targets.iter().all(|t| t.sink_type == SinkType::File));

        let pipeline = Pipeline::new(PipelineConfig::from(loaded));
        let outcome = pipeline.run(source(dataset(2000))).await.unwrap();

        let written = std::fs::metadata(&out_a).unwrap().len()
            + std::fs::metadata(&out_b).unwrap().len();
        assert_eq!(outcome.stats.items, 2000);
        assert_eq!(written, outcome.stats.bytes);
    }

    /// A stream cut before its trailing size marker is rejected
    #[tokio::test]
    async fn test_e2e_missing_marker_is_fatal() {
        let recorded = Recorded::default();
        let data: String = dataset(100).lines().skip(1).map(|l| format!("{l}\n")).collect();

        let err = Pipeline::new(config(2, 10, false))
            .run_with_sinks(source(data.clone()), sinks(2, &recorded))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Scan(IngestionError::MissingDatasetSize { items: 100 })
        ));

        let mut cfg = config(2, 10, false);
        cfg.load.require_dataset_size = false;
        let outcome = Pipeline::new(cfg)
            .run_with_sinks(source(data), sinks(2, &Recorded::default()))
            .await
            .unwrap();
        assert_eq!(outcome.stats.items, 100);
        assert_eq!(outcome.stats.values, 0);
    }

    /// Workers sharing one truncating file target append, never overwrite
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_shared_truncating_file_target() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("shared.ndjson");
        std::fs::write(&out, "previous run\n").unwrap();

        let toml = format!(
            r#"
[load]
workers = 2
batch_size = 100
gzip = false

[[targets]]
name = "shared"
sink_type = "file"
params = {{ path = "{}", truncate = "true" }}
"#,
            out.display()
        );
        let loaded = config_loader::ConfigLoader::load_from_str(
            &toml,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();

        let outcome = Pipeline::new(PipelineConfig::from(loaded))
            .run(source(dataset(2000)))
            .await
            .unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(outcome.stats.workers, 2);
        assert_eq!(written.len() as u64, outcome.stats.bytes);
        assert_eq!(written.lines().count(), 4000);
        assert!(!written.contains("previous run"));
    }
}
