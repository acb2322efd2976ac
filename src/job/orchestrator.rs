/*!
 * Job orchestrator.
 *
 * Every submitted job gets its own tokio task. The task owns the job's state
 * and is the only writer; it publishes a snapshot through a watch channel
 * (and to the configured sinks) after every state change. The orchestrator
 * keeps the receiving ends plus a cancel flag per job.
 *
 * Jobs wait for a slot on a semaphore, so at most `max_concurrent_jobs` run
 * at the same time. A pending job can be cancelled before it gets a slot.
 */

use chrono::Utc;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore, watch};
use uuid::Uuid;

use super::codec::FileCodec;
use super::models::{Job, JobFile, JobRequest, JobStatus};
use super::progress::ProgressSink;
use super::store::ArtifactStore;
use crate::app_config::JobConfig;
use crate::errors::{FileError, JobError};
use crate::translation::{LanguagePair, TranslationEngine, TranslationUnit, ValidationStats};

/// Length of generated job ids
const JOB_ID_LEN: usize = 8;

/// Orchestrator-side view of a job
struct JobHandle {
    /// Submission order, used to list newest first
    seq: u64,
    snapshot: watch::Receiver<Job>,
    cancel: Arc<AtomicBool>,
    deleted: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

/// Runs translation jobs and tracks their state
pub struct JobOrchestrator {
    engine: Arc<TranslationEngine>,
    codec: Arc<dyn FileCodec>,
    store: Arc<dyn ArtifactStore>,
    sinks: Vec<Arc<dyn ProgressSink>>,
    config: JobConfig,
    default_pair: LanguagePair,
    semaphore: Arc<Semaphore>,
    jobs: Mutex<HashMap<String, JobHandle>>,
    next_seq: Mutex<u64>,
}

impl JobOrchestrator {
    pub fn new(
        engine: Arc<TranslationEngine>,
        codec: Arc<dyn FileCodec>,
        store: Arc<dyn ArtifactStore>,
        config: &JobConfig,
        default_pair: LanguagePair,
    ) -> Self {
        Self {
            engine,
            codec,
            store,
            sinks: Vec::new(),
            config: config.clone(),
            default_pair,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1))),
            jobs: Mutex::new(HashMap::new()),
            next_seq: Mutex::new(0),
        }
    }

    /// Add a progress sink; sinks only see jobs submitted afterwards
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn engine(&self) -> &Arc<TranslationEngine> {
        &self.engine
    }

    /// Register a job and start its task; returns the job id
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, request: JobRequest) -> String {
        let pair = request.pair.unwrap_or_else(|| self.default_pair.clone());
        let cancel = Arc::new(AtomicBool::new(false));
        let deleted = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());

        let (id, tx) = {
            let mut jobs = self.jobs.lock();
            let id = loop {
                let candidate: String = Uuid::new_v4().simple().to_string()[..JOB_ID_LEN].to_string();
                if !jobs.contains_key(&candidate) {
                    break candidate;
                }
            };

            let job = Job::new(id.clone(), request.files.len(), &pair);
            let (tx, rx) = watch::channel(job);
            let seq = {
                let mut next = self.next_seq.lock();
                *next += 1;
                *next
            };
            jobs.insert(
                id.clone(),
                JobHandle {
                    seq,
                    snapshot: rx,
                    cancel: cancel.clone(),
                    deleted: deleted.clone(),
                    wake: wake.clone(),
                },
            );
            (id, tx)
        };

        info!("[{}] Job submitted: {} files, {}", id, request.files.len(), pair);

        let job = tx.borrow().clone();
        let runner = JobRunner {
            job,
            tx,
            files: request.files,
            pair,
            engine: self.engine.clone(),
            codec: self.codec.clone(),
            store: self.store.clone(),
            sinks: self.sinks.clone(),
            batch_size: self.config.batch_size.max(1),
            semaphore: self.semaphore.clone(),
            cancel,
            deleted,
            wake,
        };
        runner.publish();
        tokio::spawn(runner.run());

        id
    }

    /// Ask a job to stop; false when unknown or already finished
    pub fn cancel(&self, job_id: &str) -> bool {
        let jobs = self.jobs.lock();
        let Some(handle) = jobs.get(job_id) else {
            return false;
        };
        if handle.snapshot.borrow().is_terminal() {
            return false;
        }
        handle.cancel.store(true, Ordering::SeqCst);
        handle.wake.notify_one();
        info!("[{}] Cancellation requested", job_id);
        true
    }

    /// Latest snapshot of a job
    pub fn status(&self, job_id: &str) -> Option<Job> {
        self.jobs
            .lock()
            .get(job_id)
            .map(|handle| handle.snapshot.borrow().clone())
    }

    /// Watch a job's snapshots
    pub fn subscribe(&self, job_id: &str) -> Option<watch::Receiver<Job>> {
        self.jobs.lock().get(job_id).map(|handle| handle.snapshot.clone())
    }

    /// All known jobs, newest first
    pub fn list(&self) -> Vec<Job> {
        let jobs = self.jobs.lock();
        let mut handles: Vec<&JobHandle> = jobs.values().collect();
        handles.sort_by(|a, b| b.seq.cmp(&a.seq));
        handles
            .into_iter()
            .map(|handle| handle.snapshot.borrow().clone())
            .collect()
    }

    /// Wait until a job reaches a terminal state and return its final snapshot
    pub async fn wait(&self, job_id: &str) -> Option<Job> {
        let mut rx = self.subscribe(job_id)?;
        let finished = rx.wait_for(|job| job.is_terminal()).await.map(|job| job.clone()).ok();
        // Without a sender the last snapshot is final
        Some(finished.unwrap_or_else(|| rx.borrow().clone()))
    }

    /// Cancel a job, forget it and remove its output
    pub async fn delete(&self, job_id: &str) -> bool {
        let removed = self.jobs.lock().remove(job_id);
        let Some(handle) = removed else {
            return false;
        };
        handle.deleted.store(true, Ordering::SeqCst);
        handle.cancel.store(true, Ordering::SeqCst);
        handle.wake.notify_one();

        if let Err(e) = self.store.remove_job(job_id).await {
            warn!("[{}] Failed to remove job output: {}", job_id, e);
        }
        info!("[{}] Job deleted", job_id);
        true
    }

    /// Remove finished jobs older than `max_age`; returns how many were removed
    pub async fn sweep_expired(&self, max_age: Duration) -> usize {
        let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        let now = Utc::now();

        let expired: Vec<String> = {
            let mut jobs = self.jobs.lock();
            let ids: Vec<String> = jobs
                .iter()
                .filter(|(_, handle)| {
                    let job = handle.snapshot.borrow();
                    job.is_terminal()
                        && job
                            .finished_at
                            .is_some_and(|finished| now.signed_duration_since(finished) >= max_age)
                })
                .map(|(id, _)| id.clone())
                .collect();
            for id in &ids {
                jobs.remove(id);
            }
            ids
        };

        for id in &expired {
            if let Err(e) = self.store.remove_job(id).await {
                warn!("[{}] Failed to remove expired job output: {}", id, e);
            }
        }
        if !expired.is_empty() {
            info!("Removed {} expired jobs", expired.len());
        }
        expired.len()
    }

    /// Sweep with the configured retention period
    pub async fn sweep(&self) -> usize {
        self.sweep_expired(self.config.retention()).await
    }
}

/// State owned by a job's task
struct JobRunner {
    job: Job,
    tx: watch::Sender<Job>,
    files: Vec<JobFile>,
    pair: LanguagePair,
    engine: Arc<TranslationEngine>,
    codec: Arc<dyn FileCodec>,
    store: Arc<dyn ArtifactStore>,
    sinks: Vec<Arc<dyn ProgressSink>>,
    batch_size: usize,
    semaphore: Arc<Semaphore>,
    cancel: Arc<AtomicBool>,
    deleted: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

/// How processing of one file ended
enum FileOutcome {
    Done,
    Cancelled,
}

impl JobRunner {
    fn publish(&self) {
        self.tx.send_replace(self.job.clone());
        for sink in &self.sinks {
            sink.on_progress(&self.job);
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn finish(&mut self, status: JobStatus) {
        if self.job.transition(status) {
            self.publish();
        }
    }

    fn fail(&mut self, error: JobError) {
        error!("[{}] Job failed: {}", self.job.id, error);
        self.job.errors.push(error.to_string());
        self.finish(JobStatus::Failed);
    }

    async fn run(mut self) {
        let slot = tokio::select! {
            permit = self.semaphore.clone().acquire_owned() => Some(permit),
            _ = self.wake.notified() => None,
        };

        match slot {
            Some(Ok(permit)) if !self.is_cancelled() => self.execute(permit).await,
            Some(Err(_)) => {
                error!("[{}] Job scheduler closed", self.job.id);
                self.job.errors.push("job scheduler closed".to_string());
                self.finish(JobStatus::Failed);
            }
            _ => {
                info!("[{}] Job cancelled before start", self.job.id);
                self.finish(JobStatus::Cancelled);
            }
        }

        if self.deleted.load(Ordering::SeqCst) {
            if let Err(e) = self.store.remove_job(&self.job.id).await {
                warn!("[{}] Failed to remove output of deleted job: {}", self.job.id, e);
            }
        }
    }

    async fn execute(&mut self, _permit: OwnedSemaphorePermit) {
        self.job.transition(JobStatus::Running);
        self.publish();
        info!("[{}] Job started", self.job.id);

        if self.files.is_empty() {
            self.fail(JobError::NoFiles);
            return;
        }

        let files = std::mem::take(&mut self.files);
        let extracted: Vec<Result<Vec<String>, FileError>> =
            files.iter().map(|file| self.codec.extract(&file.contents)).collect();

        self.job.total_strings = extracted
            .iter()
            .filter_map(|result| result.as_ref().ok())
            .map(Vec::len)
            .sum();

        debug!(
            "[{}] {} strings in {} files",
            self.job.id,
            self.job.total_strings,
            files.len()
        );
        self.publish();

        let mut validation = ValidationStats::default();
        let mut cancelled = false;

        for (file, strings) in files.iter().zip(extracted) {
            if self.is_cancelled() {
                cancelled = true;
                break;
            }

            let strings = match strings {
                Ok(strings) => strings,
                Err(e) => {
                    warn!("[{}] Skipping {}: {}", self.job.id, file.path, e);
                    self.job.errors.push(format!("{}: {}", file.path, e));
                    validation.file_missing();
                    self.job.files_done += 1;
                    self.publish();
                    continue;
                }
            };

            match self.process_file(file, strings, &mut validation).await {
                FileOutcome::Done => {
                    self.job.files_done += 1;
                    self.publish();
                }
                FileOutcome::Cancelled => {
                    cancelled = true;
                    break;
                }
            }
        }

        self.job.validation = Some(validation);
        if cancelled {
            info!(
                "[{}] Job cancelled after {}/{} files",
                self.job.id, self.job.files_done, self.job.total_files
            );
            self.finish(JobStatus::Cancelled);
        } else {
            self.job.progress = 100;
            info!(
                "[{}] Job completed: {} strings, {} errors",
                self.job.id,
                self.job.translated_strings,
                self.job.errors.len()
            );
            self.finish(JobStatus::Completed);
        }
    }

    /// Translate one file batch by batch and store the result
    ///
    /// On cancellation the file is still rewritten and stored, with the
    /// strings not reached yet left in the source language.
    async fn process_file(
        &mut self,
        file: &JobFile,
        strings: Vec<String>,
        validation: &mut ValidationStats,
    ) -> FileOutcome {
        self.job.current_file = Some(file.path.clone());
        self.publish();
        debug!("[{}] Translating {} ({} strings)", self.job.id, file.path, strings.len());

        let mut units: Vec<TranslationUnit> = strings.into_iter().map(TranslationUnit::new).collect();
        let total = units.len();
        let mut processed = 0;

        for chunk in units.chunks_mut(self.batch_size) {
            let report = self.engine.translate_batch(chunk, &self.pair).await;
            for &index in &report.failed {
                self.job
                    .errors
                    .push(format!("{}: untranslated: {}", file.path, chunk[index].source));
            }

            processed += chunk.len();
            self.job.translated_strings += chunk.len();
            self.job.update_progress();
            self.publish();

            if self.is_cancelled() {
                break;
            }
        }
        let interrupted = self.is_cancelled() && processed < total;

        let outputs: Vec<String> = units.iter().map(TranslationUnit::output).collect();
        if let Err(e) = self.store_file(file, &outputs).await {
            warn!("[{}] Failed to write {}: {}", self.job.id, file.path, e);
            self.job.errors.push(format!("{}: {}", file.path, e));
            validation.file_missing();
        }

        for (index, unit) in units[..processed].iter().enumerate() {
            validation.check(&file.path, index, &unit.source, &unit.output(), unit.is_resolved());
        }

        if interrupted {
            FileOutcome::Cancelled
        } else {
            FileOutcome::Done
        }
    }

    async fn store_file(&self, file: &JobFile, outputs: &[String]) -> Result<(), FileError> {
        let rewritten = self.codec.rewrite(&file.contents, outputs)?;
        self.store.write(&self.job.id, &file.path, &rewritten).await
    }
}
