/*!
 * Job submission, cancellation and bookkeeping
 */

use std::sync::Arc;
use std::time::Duration;

use msgtrans::job::{ArtifactStore, JobFile, JobOrchestrator, JobRequest, JobStatus, MemoryStore};
use msgtrans::providers::mock::MockProvider;

use crate::common::{CancelAt, RunningTracker, engine_with, init_logging, job_config, php_file, php_orchestrator};

#[tokio::test]
async fn test_cancel_duringSecondFile_shouldKeepFinishedAndPartialOutput() {
    init_logging();
    let store = Arc::new(MemoryStore::new());
    let sink = CancelAt::new(150);
    let orchestrator = Arc::new(
        php_orchestrator(
            engine_with(vec![MockProvider::prefix("TR:")]),
            store.clone(),
            &job_config(50, 3),
        )
        .with_sink(sink.clone()),
    );
    sink.attach(orchestrator.clone());

    let files = (1..=4).map(|i| php_file(&format!("file{}", i), 100)).collect();
    let id = orchestrator.submit(JobRequest::new(files));
    let job = orchestrator.wait(&id).await.unwrap();

    assert_eq!(job.status, JobStatus::Cancelled);
    assert_eq!(job.files_done, 1);
    assert_eq!(job.translated_strings, 150);
    assert_eq!(job.total_strings, 400);
    assert_eq!(job.progress, 37);
    assert!(job.finished_at.is_some());

    let validation = job.validation.unwrap();
    assert_eq!(validation.total(), 150);

    assert_eq!(store.list(&id).await.unwrap(), vec!["file1.php", "file2.php"]);
    let partial = String::from_utf8(store.read(&id, "file2.php").await.unwrap().unwrap()).unwrap();
    assert!(partial.contains("'TR:file2 message number 49'"));
    assert!(partial.contains("'file2 message number 50'"));
    assert!(store.read(&id, "file3.php").await.unwrap().is_none());
}

#[tokio::test]
async fn test_submit_withoutFiles_shouldFail() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = php_orchestrator(engine_with(vec![MockProvider::prefix("TR:")]), store.clone(), &job_config(50, 3));

    let id = orchestrator.submit(JobRequest::new(Vec::new()));
    let job = orchestrator.wait(&id).await.unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.errors, vec!["No input files in job"]);
    assert!(job.validation.is_none());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_submit_withoutTranslatableStrings_shouldCompleteAndStoreFiles() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = php_orchestrator(engine_with(vec![MockProvider::prefix("TR:")]), store.clone(), &job_config(50, 3));
    let empty = "<?php\n// nothing here\n";
    let files = vec![
        JobFile::new("empty.php", empty),
        JobFile::new("binary.php", vec![0xff, 0xfe, 0x00]),
    ];

    let id = orchestrator.submit(JobRequest::new(files));
    let job = orchestrator.wait(&id).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.total_strings, 0);
    assert_eq!(job.files_done, 2);
    assert_eq!(job.progress, 100);
    assert_eq!(job.errors.len(), 1);
    assert!(job.errors[0].starts_with("binary.php:"));

    let validation = job.validation.unwrap();
    assert_eq!(validation.total(), 0);
    assert_eq!(validation.missing_files, 1);

    assert_eq!(store.list(&id).await.unwrap(), vec!["empty.php"]);
    assert_eq!(store.read(&id, "empty.php").await.unwrap().unwrap(), empty.as_bytes());
}

#[tokio::test]
async fn test_submit_withUnreadableFile_shouldContinueWithOthers() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = php_orchestrator(engine_with(vec![MockProvider::prefix("TR:")]), store.clone(), &job_config(50, 3));
    let files = vec![JobFile::new("broken.php", vec![0xff, 0xfe]), php_file("good", 3)];

    let id = orchestrator.submit(JobRequest::new(files));
    let job = orchestrator.wait(&id).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.files_done, 2);
    assert_eq!(job.errors.len(), 1);
    assert!(job.errors[0].starts_with("broken.php:"));
    assert_eq!(job.validation.unwrap().missing_files, 1);
    assert_eq!(store.list(&id).await.unwrap(), vec!["good.php"]);
}

#[tokio::test]
async fn test_submit_withFailingProvider_shouldRecordUntranslatedStrings() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = php_orchestrator(engine_with(vec![MockProvider::failing()]), store.clone(), &job_config(50, 3));

    let id = orchestrator.submit(JobRequest::new(vec![php_file("menu", 2)]));
    let job = orchestrator.wait(&id).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(
        job.errors,
        vec![
            "menu.php: untranslated: menu message number 0",
            "menu.php: untranslated: menu message number 1",
        ]
    );
    assert_eq!(job.validation.unwrap().untranslated, 2);

    let output = store.read(&id, "menu.php").await.unwrap().unwrap();
    assert_eq!(output, php_file("menu", 2).contents);
}

#[tokio::test]
async fn test_jobs_withConcurrencyLimit_shouldRunOneAtATime() {
    let store = Arc::new(MemoryStore::new());
    let tracker = Arc::new(RunningTracker::default());
    let orchestrator = php_orchestrator(
        engine_with(vec![MockProvider::reversed_delay("TR:", 1)]),
        store.clone(),
        &job_config(10, 1),
    )
    .with_sink(tracker.clone());

    let ids: Vec<String> = (0..3)
        .map(|i| orchestrator.submit(JobRequest::new(vec![php_file(&format!("job{}", i), 20)])))
        .collect();
    for id in &ids {
        assert_eq!(orchestrator.wait(id).await.unwrap().status, JobStatus::Completed);
    }

    assert_eq!(tracker.max_running(), 1);
}

#[tokio::test]
async fn test_cancel_whilePending_shouldNeverStart() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = php_orchestrator(
        engine_with(vec![MockProvider::reversed_delay("TR:", 2)]),
        store.clone(),
        &job_config(10, 1),
    );

    let running = orchestrator.submit(JobRequest::new(vec![php_file("first", 30)]));
    let waiting = orchestrator.submit(JobRequest::new(vec![php_file("second", 30)]));
    assert!(orchestrator.cancel(&waiting));

    let cancelled = orchestrator.wait(&waiting).await.unwrap();
    assert_eq!(cancelled.status, JobStatus::Cancelled);
    assert!(cancelled.started_at.is_none());
    assert!(!orchestrator.cancel(&waiting));

    let finished = orchestrator.wait(&running).await.unwrap();
    assert_eq!(finished.status, JobStatus::Completed);
    assert!(store.list(&waiting).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_status_andList_shouldTrackJobs() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = php_orchestrator(engine_with(vec![MockProvider::prefix("TR:")]), store, &job_config(50, 3));

    assert!(orchestrator.status("missing").is_none());
    assert!(!orchestrator.cancel("missing"));

    let first = orchestrator.submit(JobRequest::new(vec![php_file("a", 1)]));
    let second = orchestrator.submit(JobRequest::new(vec![php_file("b", 1)]));
    assert_eq!(first.len(), 8);
    assert_ne!(first, second);

    orchestrator.wait(&first).await;
    orchestrator.wait(&second).await;

    let listed: Vec<String> = orchestrator.list().into_iter().map(|job| job.id).collect();
    assert_eq!(listed, vec![second.clone(), first.clone()]);
    assert_eq!(orchestrator.status(&first).unwrap().progress, 100);
}

#[tokio::test]
async fn test_delete_shouldForgetJobAndRemoveOutput() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = php_orchestrator(engine_with(vec![MockProvider::prefix("TR:")]), store.clone(), &job_config(50, 3));

    let id = orchestrator.submit(JobRequest::new(vec![php_file("a", 2)]));
    orchestrator.wait(&id).await;
    assert_eq!(store.len(), 1);

    assert!(orchestrator.delete(&id).await);

    assert!(orchestrator.status(&id).is_none());
    assert!(orchestrator.wait(&id).await.is_none());
    assert!(store.is_empty());
    assert!(!orchestrator.delete(&id).await);
}

#[tokio::test]
async fn test_delete_whileRunning_shouldLeaveNoOutputBehind() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = php_orchestrator(
        engine_with(vec![MockProvider::reversed_delay("TR:", 1)]),
        store.clone(),
        &job_config(5, 3),
    );

    let id = orchestrator.submit(JobRequest::new(vec![php_file("a", 20), php_file("b", 20)]));
    let mut updates = orchestrator.subscribe(&id).unwrap();
    updates.wait_for(|job| job.translated_strings > 0).await.unwrap();

    assert!(orchestrator.delete(&id).await);
    // The sender goes away once the task has stopped and cleaned up
    while updates.changed().await.is_ok() {}

    assert_eq!(updates.borrow().status, JobStatus::Cancelled);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_sweepExpired_shouldOnlyRemoveFinishedJobs() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator: JobOrchestrator =
        php_orchestrator(engine_with(vec![MockProvider::prefix("TR:")]), store.clone(), &job_config(50, 3));

    let id = orchestrator.submit(JobRequest::new(vec![php_file("a", 1)]));
    orchestrator.wait(&id).await;

    assert_eq!(orchestrator.sweep().await, 0);
    assert_eq!(orchestrator.sweep_expired(Duration::ZERO).await, 1);
    assert!(orchestrator.list().is_empty());
    assert!(store.is_empty());
}
