use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO, optionally with region, e.g. "en")
    pub source_language: String,

    /// Target language code (ISO, optionally with region, e.g. "pt-br")
    pub target_language: String,

    /// Provider chain, tried in this order
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,

    /// Circuit breaker settings shared by all providers
    #[serde(default)]
    pub health: HealthConfig,

    /// Translation cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Job engine settings
    #[serde(default)]
    pub jobs: JobConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation backend type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    // @provider: Google Translate web endpoint, no key
    #[serde(rename = "google_free")]
    GoogleFree,
    // @provider: DeepL API free tier, key required
    #[serde(rename = "deepl_free")]
    DeeplFree,
    // @provider: MyMemory API, optional registration email
    #[serde(rename = "mymemory")]
    MyMemory,
    // @provider: translate-shell CLI
    #[serde(rename = "translate_shell")]
    TranslateShell,
    // @provider: deterministic offline stub
    #[serde(rename = "mock")]
    Mock,
}

impl ProviderKind {
    // @returns: Human readable provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::GoogleFree => "Google Translate (free)",
            Self::DeeplFree => "DeepL Free API",
            Self::MyMemory => "MyMemory",
            Self::TranslateShell => "translate-shell",
            Self::Mock => "Mock",
        }
    }

    // @returns: Whether the provider talks to a web API
    pub fn is_http(&self) -> bool {
        matches!(self, Self::GoogleFree | Self::DeeplFree | Self::MyMemory)
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::GoogleFree => "google_free".to_string(),
            Self::DeeplFree => "deepl_free".to_string(),
            Self::MyMemory => "mymemory".to_string(),
            Self::TranslateShell => "translate_shell".to_string(),
            Self::Mock => "mock".to_string(),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "google_free" | "google" => Ok(Self::GoogleFree),
            "deepl_free" | "deepl" => Ok(Self::DeeplFree),
            "mymemory" => Ok(Self::MyMemory),
            "translate_shell" | "trans" => Ok(Self::TranslateShell),
            "mock" => Ok(Self::Mock),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Configuration of one provider in the chain
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub kind: ProviderKind,

    // @field: Disabled providers are left out of the chain
    #[serde(default = "default_true")]
    pub enabled: bool,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL, empty means the provider default
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Registration email (MyMemory raises its daily quota with it)
    #[serde(default = "String::new")]
    pub email: String,

    // @field: Timeout seconds per call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Max concurrent single-item calls within one batch
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    // @field: Max texts handed to the provider per batch call
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    // @field: Rate limit (requests per minute)
    #[serde(default)]
    pub max_requests_per_minute: Option<u32>,
}

impl ProviderConfig {
    // @param kind: Provider enum
    // @returns: Provider config with defaults
    pub fn new(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::GoogleFree => Self {
                kind,
                enabled: true,
                api_key: String::new(),
                endpoint: default_google_endpoint(),
                email: String::new(),
                timeout_secs: 8,
                concurrency: 10,
                max_batch_size: default_max_batch_size(),
                max_requests_per_minute: Some(50),
            },
            ProviderKind::DeeplFree => Self {
                kind,
                enabled: true,
                api_key: String::new(),
                endpoint: default_deepl_endpoint(),
                email: String::new(),
                timeout_secs: 30,
                concurrency: 1,
                max_batch_size: 50,
                max_requests_per_minute: Some(30),
            },
            ProviderKind::MyMemory => Self {
                kind,
                enabled: true,
                api_key: String::new(),
                endpoint: default_mymemory_endpoint(),
                email: String::new(),
                timeout_secs: 15,
                concurrency: 4,
                max_batch_size: default_max_batch_size(),
                max_requests_per_minute: Some(30),
            },
            ProviderKind::TranslateShell => Self {
                kind,
                enabled: true,
                api_key: String::new(),
                endpoint: String::new(),
                email: String::new(),
                timeout_secs: 8,
                concurrency: 2,
                max_batch_size: default_max_batch_size(),
                max_requests_per_minute: Some(20),
            },
            ProviderKind::Mock => Self {
                kind,
                enabled: true,
                api_key: String::new(),
                endpoint: String::new(),
                email: String::new(),
                timeout_secs: default_timeout_secs(),
                concurrency: default_concurrency(),
                max_batch_size: default_max_batch_size(),
                max_requests_per_minute: None,
            },
        }
    }

    /// Call timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Circuit breaker settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HealthConfig {
    /// Cooldown after the first rate-limit failure, doubled per consecutive one
    #[serde(default = "default_base_cooldown_secs")]
    pub base_cooldown_secs: u64,

    /// Upper bound for the cooldown
    #[serde(default = "default_max_cooldown_secs")]
    pub max_cooldown_secs: u64,

    /// Consecutive non-rate-limit failures before a base cooldown is applied
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            base_cooldown_secs: default_base_cooldown_secs(),
            max_cooldown_secs: default_max_cooldown_secs(),
            failure_threshold: default_failure_threshold(),
        }
    }
}

/// Translation cache settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Number of entries kept in memory
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,

    /// SQLite file for the durable tier; None uses the user data directory
    #[serde(default)]
    pub database_path: Option<String>,

    /// Entries preloaded into memory at startup, 0 disables warm-up
    #[serde(default = "default_warm_up_limit")]
    pub warm_up_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_capacity: default_memory_capacity(),
            database_path: None,
            warm_up_limit: default_warm_up_limit(),
        }
    }
}

/// Job engine settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JobConfig {
    /// Strings per engine call; progress is reported after each batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Jobs running at the same time, later submissions wait
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Age after which finished jobs are removed by the sweep
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,

    /// Directory where job output is written
    #[serde(default = "default_jobs_dir")]
    pub jobs_dir: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            retention_hours: default_retention_hours(),
            jobs_dir: default_jobs_dir(),
        }
    }
}

impl JobConfig {
    /// Retention window as a Duration
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_hours * 3600)
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_concurrency() -> usize {
    4
}

fn default_max_batch_size() -> usize {
    50
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_true() -> bool {
    true
}

fn default_base_cooldown_secs() -> u64 {
    30
}

fn default_max_cooldown_secs() -> u64 {
    480
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_memory_capacity() -> usize {
    10_000
}

fn default_warm_up_limit() -> usize {
    5_000
}

fn default_batch_size() -> usize {
    50
}

fn default_max_concurrent_jobs() -> usize {
    3
}

fn default_retention_hours() -> u64 {
    24
}

fn default_jobs_dir() -> String {
    "jobs".to_string()
}

fn default_google_endpoint() -> String {
    "https://translate.googleapis.com/translate_a/single".to_string()
}

fn default_deepl_endpoint() -> String {
    "https://api-free.deepl.com/v2/translate".to_string()
}

fn default_mymemory_endpoint() -> String {
    "https://api.mymemory.translated.net/get".to_string()
}

// Free providers first, then the keyed one, then the local CLI as last resort
fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig::new(ProviderKind::GoogleFree),
        ProviderConfig::new(ProviderKind::DeeplFree),
        ProviderConfig::new(ProviderKind::MyMemory),
        ProviderConfig::new(ProviderKind::TranslateShell),
    ]
}

impl Config {
    /// Load the configuration file, creating it with defaults when it does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            Ok(config)
        } else {
            warn!("Config file not found at '{}', creating default config.", path.display());
            let config = Config::default();
            config.save(path)?;
            Ok(config)
        }
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))?;
        Ok(())
    }

    /// Fill provider credentials from `DEEPL_API_KEY` and `MYMEMORY_EMAIL` when unset
    pub fn apply_env_overrides(&mut self) {
        let deepl_key = std::env::var("DEEPL_API_KEY").ok();
        let mymemory_email = std::env::var("MYMEMORY_EMAIL").ok();
        self.apply_overrides(deepl_key, mymemory_email);
    }

    fn apply_overrides(&mut self, deepl_key: Option<String>, mymemory_email: Option<String>) {
        for provider in &mut self.providers {
            match provider.kind {
                ProviderKind::DeeplFree if provider.api_key.is_empty() => {
                    if let Some(key) = deepl_key.as_ref().filter(|k| !k.trim().is_empty()) {
                        provider.api_key = key.trim().to_string();
                    }
                }
                ProviderKind::MyMemory if provider.email.is_empty() => {
                    if let Some(email) = mymemory_email.as_ref().filter(|e| !e.trim().is_empty()) {
                        provider.email = email.trim().to_string();
                    }
                }
                _ => {}
            }
        }
    }

    /// Providers that take part in the chain, in priority order
    pub fn enabled_providers(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.iter().filter(|p| p.enabled)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Validate languages
        crate::language_utils::validate_language_tag(&self.source_language)?;
        crate::language_utils::validate_language_tag(&self.target_language)?;

        if self.enabled_providers().next().is_none() {
            return Err(anyhow!("At least one translation provider must be enabled"));
        }

        for provider in self.enabled_providers() {
            if provider.kind == ProviderKind::DeeplFree && provider.api_key.trim().is_empty() {
                return Err(anyhow!(
                    "Translation API key is required for the DeepL provider (set DEEPL_API_KEY or disable it)"
                ));
            }
            if provider.max_batch_size == 0 {
                return Err(anyhow!("max_batch_size must be positive for provider {}", provider.kind));
            }
            if provider.kind.is_http() && !provider.endpoint.is_empty() {
                Url::parse(&provider.endpoint)
                    .with_context(|| format!("Invalid endpoint for provider {}: {}", provider.kind, provider.endpoint))?;
            }
        }

        if self.jobs.batch_size == 0 {
            return Err(anyhow!("jobs.batch_size must be positive"));
        }
        if self.jobs.max_concurrent_jobs == 0 {
            return Err(anyhow!("jobs.max_concurrent_jobs must be positive"));
        }
        if self.cache.memory_capacity == 0 {
            return Err(anyhow!("cache.memory_capacity must be positive"));
        }
        if self.health.base_cooldown_secs > self.health.max_cooldown_secs {
            return Err(anyhow!("health.base_cooldown_secs cannot exceed health.max_cooldown_secs"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "en".to_string(),
            target_language: "pt-br".to_string(),
            providers: default_providers(),
            health: HealthConfig::default(),
            cache: CacheConfig::default(),
            jobs: JobConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
