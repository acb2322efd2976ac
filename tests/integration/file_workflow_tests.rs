/*!
 * End-to-end file translation through a job
 */

use std::sync::Arc;

use msgtrans::app_config::{Config, HealthConfig, ProviderConfig, ProviderKind};
use msgtrans::database::{DatabaseConnection, Repository};
use msgtrans::job::{
    BroadcastSink, DirectoryStore, JobFile, JobOrchestrator, JobRequest, JobStatus, PlainLinesCodec,
};
use msgtrans::providers::mock::MockProvider;
use msgtrans::translation::{LanguagePair, TranslationEngine, TwoLevelCache};
use tempfile::TempDir;

use crate::common::{init_logging, job_config, pair, php_orchestrator};

const MESSAGES: &str = "<?php\n$msg_arr['save'] = 'Save';\n$msg_arr['welcome'] = 'Welcome back, {name}';\n$msg_arr['user'] = 'User {id} logged in';\n";

#[tokio::test]
async fn test_job_withPrefixProvider_shouldTranslateAndCacheEveryString() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let cache = Arc::new(TwoLevelCache::in_memory(100).unwrap());
    let engine = Arc::new(
        TranslationEngine::new(cache.clone()).with_provider(MockProvider::prefix("TR:"), &HealthConfig::default(), None),
    );
    let store = Arc::new(DirectoryStore::new(dir.path()));
    let orchestrator = php_orchestrator(engine, store.clone(), &job_config(50, 3));

    let id = orchestrator.submit(JobRequest::new(vec![JobFile::new("lang/pt.php", MESSAGES)]));
    let job = orchestrator.wait(&id).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100);
    assert_eq!(job.total_strings, 3);
    assert_eq!(job.translated_strings, 3);
    assert_eq!(job.files_done, 1);
    assert!(job.errors.is_empty());
    assert!(job.current_file.is_none());
    assert_eq!(job.validation.as_ref().unwrap().success, 3);

    let written = std::fs::read_to_string(dir.path().join(&id).join("output/lang/pt.php")).unwrap();
    assert_eq!(
        written,
        "<?php\n$msg_arr['save'] = 'TR:Save';\n$msg_arr['welcome'] = 'TR:Welcome back, {name}';\n$msg_arr['user'] = 'TR:User {id} logged in';\n"
    );

    assert_eq!(cache.database_stats().await.unwrap().total_entries, 3);
    assert_eq!(
        cache.get("User __PH0__ logged in", "en", "pt-br").await.as_deref(),
        Some("TR:User __PH0__ logged in")
    );
}

#[tokio::test]
async fn test_job_withWarmCache_shouldNotCallProvider() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("cache.db");
    let provider = MockProvider::prefix("TR:");

    for _ in 0..2 {
        let repository = Repository::new(DatabaseConnection::new(&db_path).unwrap());
        let cache = Arc::new(TwoLevelCache::new(repository, 100));
        let engine = Arc::new(
            TranslationEngine::new(cache).with_provider(provider.clone(), &HealthConfig::default(), None),
        );
        let store = Arc::new(DirectoryStore::new(dir.path().join("jobs")));
        let orchestrator = php_orchestrator(engine, store, &job_config(50, 3));

        let id = orchestrator.submit(JobRequest::new(vec![JobFile::new("pt.php", MESSAGES)]));
        assert_eq!(orchestrator.wait(&id).await.unwrap().status, JobStatus::Completed);
    }

    assert_eq!(provider.request_count(), 3);
}

#[tokio::test]
async fn test_job_withPlainLinesAndConfiguredMock_shouldReportProgress() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.providers = vec![ProviderConfig::new(ProviderKind::Mock)];
    config.jobs.batch_size = 2;

    let cache = Arc::new(TwoLevelCache::in_memory(100).unwrap());
    let engine = Arc::new(TranslationEngine::from_config(&config, cache));
    let sink = Arc::new(BroadcastSink::new(64));
    let mut progress = sink.subscribe();
    let orchestrator = JobOrchestrator::new(
        engine,
        Arc::new(PlainLinesCodec),
        Arc::new(DirectoryStore::new(dir.path())),
        &config.jobs,
        pair(),
    )
    .with_sink(sink);

    let request = JobRequest::new(vec![JobFile::new("notes.txt", "one\ntwo\n\nthree\n")])
        .with_pair(LanguagePair::new("en", "de"));
    let id = orchestrator.submit(request);
    let job = orchestrator.wait(&id).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.target_language, "de");
    let written = std::fs::read_to_string(dir.path().join(&id).join("output/notes.txt")).unwrap();
    assert_eq!(written, "[mock] one\n[mock] two\n\n[mock] three\n");

    let mut seen = Vec::new();
    while let Ok(snapshot) = progress.try_recv() {
        seen.push((snapshot.status, snapshot.translated_strings));
    }
    assert_eq!(seen.first(), Some(&(JobStatus::Pending, 0)));
    assert_eq!(seen.last(), Some(&(JobStatus::Completed, 3)));
    assert!(seen.contains(&(JobStatus::Running, 2)));
}
