/*!
 * Common test utilities for the msgtrans test suite
 */

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use msgtrans::app_config::{HealthConfig, JobConfig};
use msgtrans::job::{ArtifactStore, Job, JobFile, JobOrchestrator, JobStatus, MsgArrCodec, ProgressSink};
use msgtrans::providers::mock::MockProvider;
use msgtrans::translation::{LanguagePair, TranslationEngine, TwoLevelCache};

/// Route library logs to the test output (`RUST_LOG=debug cargo test`)
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Language pair used throughout the tests
pub fn pair() -> LanguagePair {
    LanguagePair::new("en", "pt-br")
}

/// Engine over an in-memory cache with the given providers, in chain order
pub fn engine_with(providers: Vec<MockProvider>) -> Arc<TranslationEngine> {
    let cache = Arc::new(TwoLevelCache::in_memory(1000).expect("in-memory cache"));
    let engine = providers
        .into_iter()
        .fold(TranslationEngine::new(cache), |engine, provider| {
            engine.with_provider(provider, &HealthConfig::default(), None)
        });
    Arc::new(engine)
}

/// Job settings with the given batch size and concurrency
pub fn job_config(batch_size: usize, max_concurrent_jobs: usize) -> JobConfig {
    JobConfig {
        batch_size,
        max_concurrent_jobs,
        ..JobConfig::default()
    }
}

/// Orchestrator translating PHP message files
pub fn php_orchestrator(
    engine: Arc<TranslationEngine>,
    store: Arc<dyn ArtifactStore>,
    config: &JobConfig,
) -> JobOrchestrator {
    JobOrchestrator::new(engine, Arc::new(MsgArrCodec), store, config, pair())
}

/// PHP message file with `count` distinct strings
pub fn php_file(name: &str, count: usize) -> JobFile {
    let mut contents = String::from("<?php\n");
    for i in 0..count {
        contents.push_str(&format!("$msg_arr['{}_{}'] = '{} message number {}';\n", name, i, name, i));
    }
    JobFile::new(format!("{}.php", name), contents)
}

/// Sink cancelling a job once it has processed `threshold` strings
pub struct CancelAt {
    threshold: usize,
    orchestrator: OnceLock<Arc<JobOrchestrator>>,
}

impl CancelAt {
    pub fn new(threshold: usize) -> Arc<Self> {
        Arc::new(Self {
            threshold,
            orchestrator: OnceLock::new(),
        })
    }

    pub fn attach(&self, orchestrator: Arc<JobOrchestrator>) {
        let _ = self.orchestrator.set(orchestrator);
    }
}

impl ProgressSink for CancelAt {
    fn on_progress(&self, job: &Job) {
        if job.status == JobStatus::Running && job.translated_strings >= self.threshold {
            if let Some(orchestrator) = self.orchestrator.get() {
                orchestrator.cancel(&job.id);
            }
        }
    }
}

/// Sink recording the highest number of jobs seen running at once
#[derive(Default)]
pub struct RunningTracker {
    states: Mutex<HashMap<String, JobStatus>>,
    max_running: Mutex<usize>,
}

impl RunningTracker {
    pub fn max_running(&self) -> usize {
        *self.max_running.lock()
    }
}

impl ProgressSink for RunningTracker {
    fn on_progress(&self, job: &Job) {
        let mut states = self.states.lock();
        states.insert(job.id.clone(), job.status);
        let running = states.values().filter(|s| **s == JobStatus::Running).count();
        let mut max = self.max_running.lock();
        *max = (*max).max(running);
    }
}
