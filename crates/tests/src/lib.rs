//! # Integration Tests
//!
//! End-to-end flows across crates:
//! - configuration contracts
//! - drop a file -> watcher -> in-process boundary -> dispatcher -> stages

#[cfg(test)]
mod contract_tests {
    use contracts::{RunStatus, ServiceConfig, StageName};

    #[test]
    fn test_default_config_is_valid() {
        config_loader::ConfigLoader::validate(&ServiceConfig::default()).unwrap();
    }

    #[test]
    fn test_stage_order() {
        let names: Vec<_> = StageName::ALL.iter().map(|s| s.to_string()).collect();
        assert_eq!(names, ["prepare", "fit", "score"]);
        assert!(RunStatus::Failed.is_terminal());
        assert!(!RunStatus::Queued.is_terminal());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    use boundary::InProcessBoundary;
    use contracts::{
        ChangeSourceKind, ExecutorConfig, Run, RunStatus, RunStore, StageName, StepStatus,
        WatcherConfig,
    };
    use dispatcher::RunDispatcher;
    use ingestion::{change_source_for, sentinel_for, IngestWatcher, WatcherHandle};
    use run_engine::{MemoryRunStore, PipelineExecutor, RunLog};
    use stages::BaselineStages;

    /// Store, dispatcher and a polling watcher over `<data_root>/inbound`
    struct Harness {
        data_root: PathBuf,
        inbound: PathBuf,
        store: Arc<MemoryRunStore>,
        dispatcher: RunDispatcher,
        watcher: WatcherHandle,
    }

    impl Harness {
        fn start(data_root: &Path, tweak: impl FnOnce(&mut WatcherConfig)) -> Self {
            let inbound = data_root.join("inbound");
            let mut config = WatcherConfig {
                watch_root: inbound.clone(),
                stability_window_secs: 0.2,
                poll_interval_secs: 0.05,
                debounce_secs: 0.1,
                flush_interval_secs: 0.02,
                source: ChangeSourceKind::Polling,
                scan_interval_secs: 0.05,
                ..WatcherConfig::default()
            };
            tweak(&mut config);

            let store = Arc::new(MemoryRunStore::new());
            let executor = PipelineExecutor::new(store.clone(), Arc::new(BaselineStages), data_root);
            let dispatcher = RunDispatcher::spawn(Arc::new(executor), &ExecutorConfig::default());
            let boundary = InProcessBoundary::new(store.clone(), dispatcher.queue());

            let watcher = IngestWatcher::new(config.clone(), Arc::new(boundary))
                .start(change_source_for(&config))
                .unwrap();

            Self {
                data_root: data_root.to_path_buf(),
                inbound,
                store,
                dispatcher,
                watcher,
            }
        }

        /// Write through a temporary name and rename, the way uploaders do
        fn drop_file(&self, name: &str, content: &str) -> PathBuf {
            let tmp = self.inbound.join(format!("{name}.partial"));
            std::fs::write(&tmp, content).unwrap();
            let path = self.inbound.join(name);
            std::fs::rename(&tmp, &path).unwrap();
            path
        }

        async fn wait_for_runs(&self, count: usize) -> Vec<Run> {
            for _ in 0..500 {
                let runs = self.store.list_runs(100).unwrap();
                if runs.len() >= count && runs.iter().all(|r| r.status.is_terminal()) {
                    return runs;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            panic!("timed out waiting for {count} finished runs");
        }

        async fn stop(self) {
            self.watcher.shutdown().await;
            self.dispatcher.shutdown().await;
        }
    }

    fn labelled_csv(rows: usize) -> String {
        let mut csv = String::from("time,temp,humidity,label\n");
        for t in (0..rows).rev() {
            let (temp, label) = if t % 3 == 0 { (80 + t % 4, "hot") } else { (20 + t % 4, "ok") };
            if t % 5 == 0 {
                csv.push_str(&format!("{t},,{},{label}\n", 40 + t % 7));
            } else {
                csv.push_str(&format!("{t},{temp},{},{label}\n", 40 + t % 7));
            }
        }
        csv
    }

    #[tokio::test]
    async fn test_e2e_dropped_file_runs_to_success() {
        let dir = tempfile::tempdir().unwrap();
        let harness = Harness::start(dir.path(), |_| {});

        harness.drop_file("sensor_a.csv", &labelled_csv(40));
        let runs = harness.wait_for_runs(1).await;
        assert_eq!(runs.len(), 1);
        let run = &runs[0];

        assert_eq!(run.status, RunStatus::Success, "error: {:?}", run.error);
        assert_eq!(run.model_type, "baseline");
        assert!(run.steps.iter().all(|s| s.status == StepStatus::Success));
        for stage in StageName::ALL {
            let path = &run.artifacts[stage.artifact_key()];
            assert!(Path::new(path).is_file(), "{stage}: {path}");
        }
        assert_eq!(run.metrics["val_samples"], 8.0);
        assert!((0.0..=1.0).contains(&run.metrics["accuracy"]));

        let dataset = harness.store.get_dataset(run.dataset_id).unwrap().unwrap();
        assert_eq!(dataset.name, "sensor_a");
        assert_eq!(dataset.meta["source"], "nas_watcher");
        assert_eq!(dataset.meta["sha256"].as_str().map(str::len), Some(64));

        let log = RunLog::new(&harness.data_root).tail_messages(run.id, 200).unwrap();
        assert_eq!(log.last().map(String::as_str), Some("run finished: success"));

        harness.stop().await;
    }

    #[tokio::test]
    async fn test_e2e_fit_failure_keeps_prepare_output() {
        let dir = tempfile::tempdir().unwrap();
        let harness = Harness::start(dir.path(), |_| {});

        harness.drop_file("tiny.csv", "time,x,label\n1,2,a\n");
        let runs = harness.wait_for_runs(1).await;
        let run = &runs[0];

        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error.as_deref(), Some("insufficient data"));
        let status = |stage| run.step(stage).map(|s| s.status);
        assert_eq!(status(StageName::Prepare), Some(StepStatus::Success));
        assert_eq!(status(StageName::Fit), Some(StepStatus::Failed));
        assert_eq!(status(StageName::Score), Some(StepStatus::Pending));
        assert_eq!(
            run.step(StageName::Fit).and_then(|s| s.message.as_deref()),
            Some("insufficient data")
        );
        assert!(run.artifacts.contains_key("processed_path"));
        assert!(!run.artifacts.contains_key("model_path"));

        harness.stop().await;
    }

    #[tokio::test]
    async fn test_identical_content_registers_twice() {
        let dir = tempfile::tempdir().unwrap();
        let harness = Harness::start(dir.path(), |_| {});

        let content = labelled_csv(20);
        harness.drop_file("copy_one.csv", &content);
        harness.drop_file("copy_two.csv", &content);
        harness.wait_for_runs(2).await;

        let datasets = harness.store.list_datasets(10).unwrap();
        assert_eq!(datasets.len(), 2);
        assert_eq!(datasets[0].meta["sha256"], datasets[1].meta["sha256"]);
        assert_ne!(datasets[0].source_path, datasets[1].source_path);

        harness.stop().await;
    }

    #[tokio::test]
    async fn test_sentinel_mode_waits_for_done_file() {
        let dir = tempfile::tempdir().unwrap();
        let harness = Harness::start(dir.path(), |c| c.require_done_file = true);

        let data = harness.drop_file("gated.csv", &labelled_csv(20));
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(harness.store.list_datasets(10).unwrap().is_empty());

        std::fs::write(sentinel_for(&data), "").unwrap();
        let runs = harness.wait_for_runs(1).await;
        assert_eq!(runs[0].status, RunStatus::Success, "error: {:?}", runs[0].error);
        assert_eq!(harness.store.list_datasets(10).unwrap().len(), 1);

        harness.stop().await;
    }

    #[tokio::test]
    async fn test_ignored_files_never_register() {
        let dir = tempfile::tempdir().unwrap();
        let harness = Harness::start(dir.path(), |_| {});

        std::fs::write(harness.inbound.join("upload.csv.tmp"), "x\n").unwrap();
        std::fs::write(harness.inbound.join("notes.txt"), "x\n").unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert!(harness.store.list_datasets(10).unwrap().is_empty());
        let stats = harness.watcher.stats();
        assert_eq!(stats.candidates_scheduled, 0);
        assert!(stats.events_ignored >= 2);

        harness.stop().await;
    }
}
