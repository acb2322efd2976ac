/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for the translation backends:
 * - Google: free web endpoint, one text per request, concurrent fan-out
 * - DeepL: free API tier, key required, native batch requests
 * - MyMemory: free API, optional registration email
 * - translate-shell: local `trans` command line tool
 * - Mock: deterministic offline stub
 *
 * The backend set is closed, so the chain holds a `Backend` enum and dispatches
 * with `match` instead of boxing trait objects.
 */

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::fmt::Debug;

use crate::app_config::{ProviderConfig, ProviderKind};
use crate::errors::ProviderError;

/// Common trait for all translation providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably in the provider chain.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Stable provider name used in logs and statistics
    fn name(&self) -> &str;

    /// Translate a single text
    ///
    /// # Arguments
    /// * `text` - The text to translate, never blank
    /// * `source_language` - Source language tag
    /// * `target_language` - Target language tag
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The translation or an error
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError>;

    /// Translate several texts, one result per input in input order
    ///
    /// The default fans out single-item calls, at most `concurrency()` in flight,
    /// and reassembles the results by index.
    async fn translate_batch(
        &self,
        texts: &[String],
        source_language: &str,
        target_language: &str,
    ) -> Vec<Result<String, ProviderError>> {
        fan_out(self, texts, source_language, target_language).await
    }

    /// Whether `translate_batch` is a single request to the service
    fn supports_native_batch(&self) -> bool {
        false
    }

    /// Maximum number of texts per `translate_batch` call
    fn max_batch_size(&self) -> usize {
        50
    }

    /// Maximum concurrent single-item calls during fan-out
    fn concurrency(&self) -> usize {
        1
    }

    /// Whether credentials or the required binary are present
    fn is_configured(&self) -> bool {
        true
    }
}

/// Run single-item calls concurrently, bounded by the provider's concurrency,
/// and reassemble the results in input order
pub async fn fan_out<P: Provider + ?Sized>(
    provider: &P,
    texts: &[String],
    source_language: &str,
    target_language: &str,
) -> Vec<Result<String, ProviderError>> {
    let concurrency = provider.concurrency().max(1);

    let calls: Vec<_> = texts
        .iter()
        .cloned()
        .enumerate()
        .map(move |(index, text)| async move {
            (index, provider.translate(&text, source_language, target_language).await)
        })
        .collect();

    let mut indexed: Vec<(usize, Result<String, ProviderError>)> = stream::iter(calls)
        .buffer_unordered(concurrency)
        .collect()
        .await;

    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, result)| result).collect()
}

/// Treat empty output or output equal to the input as a failed translation
pub(crate) fn ensure_translated(source: &str, translated: &str) -> Result<String, ProviderError> {
    let translated = translated.trim();
    if translated.is_empty() || translated.to_lowercase() == source.trim().to_lowercase() {
        return Err(ProviderError::Unchanged);
    }
    Ok(translated.to_string())
}

/// Build the HTTP client shared by the web backends
pub(crate) fn http_client(config: &ProviderConfig) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(config.timeout())
        .user_agent(concat!("msgtrans/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

/// Any backend the chain can hold
#[derive(Debug)]
pub enum Backend {
    Google(google::GoogleProvider),
    DeepL(deepl::DeeplProvider),
    MyMemory(mymemory::MyMemoryProvider),
    TranslateShell(translate_shell::TranslateShellProvider),
    Mock(mock::MockProvider),
}

impl Backend {
    /// Create the backend described by a provider configuration entry
    pub fn from_config(config: &ProviderConfig) -> Self {
        match config.kind {
            ProviderKind::GoogleFree => Self::Google(google::GoogleProvider::new(config)),
            ProviderKind::DeeplFree => Self::DeepL(deepl::DeeplProvider::new(config)),
            ProviderKind::MyMemory => Self::MyMemory(mymemory::MyMemoryProvider::new(config)),
            ProviderKind::TranslateShell => {
                Self::TranslateShell(translate_shell::TranslateShellProvider::new(config))
            }
            ProviderKind::Mock => Self::Mock(mock::MockProvider::prefix("[mock] ")),
        }
    }

    fn inner(&self) -> &dyn Provider {
        match self {
            Self::Google(p) => p,
            Self::DeepL(p) => p,
            Self::MyMemory(p) => p,
            Self::TranslateShell(p) => p,
            Self::Mock(p) => p,
        }
    }
}

impl From<mock::MockProvider> for Backend {
    fn from(provider: mock::MockProvider) -> Self {
        Self::Mock(provider)
    }
}

#[async_trait]
impl Provider for Backend {
    fn name(&self) -> &str {
        self.inner().name()
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        self.inner().translate(text, source_language, target_language).await
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        source_language: &str,
        target_language: &str,
    ) -> Vec<Result<String, ProviderError>> {
        self.inner().translate_batch(texts, source_language, target_language).await
    }

    fn supports_native_batch(&self) -> bool {
        self.inner().supports_native_batch()
    }

    fn max_batch_size(&self) -> usize {
        self.inner().max_batch_size()
    }

    fn concurrency(&self) -> usize {
        self.inner().concurrency()
    }

    fn is_configured(&self) -> bool {
        self.inner().is_configured()
    }
}

pub mod deepl;
pub mod google;
pub mod mock;
pub mod mymemory;
pub mod translate_shell;
