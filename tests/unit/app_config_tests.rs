/*!
 * Tests for application configuration
 */

use msgtrans::app_config::{Config, LogLevel, ProviderKind};
use tempfile::TempDir;

fn config_without_deepl() -> Config {
    let mut config = Config::default();
    for provider in &mut config.providers {
        if provider.kind == ProviderKind::DeeplFree {
            provider.enabled = false;
        }
    }
    config
}

#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf.json");

    let config = Config::load_or_create(&path).unwrap();

    assert!(path.exists());
    assert_eq!(config.source_language, "en");
    assert_eq!(config.jobs.batch_size, 50);
    assert_eq!(config.jobs.max_concurrent_jobs, 3);
    assert_eq!(config.health.base_cooldown_secs, 30);
    assert_eq!(config.health.max_cooldown_secs, 480);
}

#[test]
fn test_loadOrCreate_withPartialFile_shouldFillDefaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(
        &path,
        r#"{
            "source_language": "en",
            "target_language": "de",
            "providers": [{ "type": "mock" }],
            "log_level": "debug"
        }"#,
    )
    .unwrap();

    let config = Config::load_or_create(&path).unwrap();

    assert_eq!(config.target_language, "de");
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.providers.len(), 1);
    assert!(config.providers[0].enabled);
    assert_eq!(config.cache.memory_capacity, 10_000);
    assert!(config.validate().is_ok());
}

#[test]
fn test_saveThenLoad_shouldKeepProviderChain() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf.json");
    let mut config = config_without_deepl();
    config.providers.reverse();
    config.save(&path).unwrap();

    let loaded = Config::load_or_create(&path).unwrap();
    let kinds: Vec<ProviderKind> = loaded.enabled_providers().map(|p| p.kind).collect();

    assert_eq!(
        kinds,
        vec![ProviderKind::TranslateShell, ProviderKind::MyMemory, ProviderKind::GoogleFree]
    );
}

#[test]
fn test_loadOrCreate_withInvalidJson_shouldFail() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(Config::load_or_create(&path).is_err());
}

#[test]
fn test_validate_withBadValues_shouldFail() {
    assert!(config_without_deepl().validate().is_ok());

    let mut config = config_without_deepl();
    config.target_language = "klingon".to_string();
    assert!(config.validate().is_err());

    let mut config = config_without_deepl();
    config.jobs.batch_size = 0;
    assert!(config.validate().is_err());

    let mut config = config_without_deepl();
    for provider in &mut config.providers {
        provider.enabled = false;
    }
    assert!(config.validate().is_err());

    let mut config = config_without_deepl();
    config.health.base_cooldown_secs = 1000;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withMalformedEndpoint_shouldFail() {
    let mut config = config_without_deepl();
    config.providers[0].endpoint = "not a url".to_string();
    assert!(config.validate().is_err());

    // translate-shell uses the endpoint as a binary path
    let mut config = config_without_deepl();
    for provider in &mut config.providers {
        if provider.kind == ProviderKind::TranslateShell {
            provider.endpoint = "/usr/local/bin/trans".to_string();
        }
    }
    assert!(config.validate().is_ok());
}
