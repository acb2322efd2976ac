/*!
 * Mock provider implementations for testing.
 *
 * This module provides a deterministic backend that simulates different behaviors:
 * - `MockProvider::prefix()` - Always succeeds by prefixing the text
 * - `MockProvider::echo()` - Returns the input unchanged
 * - `MockProvider::intermittent()` - Fails every Nth request
 * - `MockProvider::failing()` / `rate_limited()` - Always fails
 * - `MockProvider::reversed_delay()` - Later requests finish first
 */

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{Provider, fan_out};

/// Requests per delay cycle in reversed-delay mode
const DELAY_CYCLE: usize = 16;

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with `prefix + text`
    Prefix(String),
    /// Returns the text as is
    Echo,
    /// Fails intermittently (every Nth request) with a server error
    Intermittent { fail_every: usize },
    /// Always fails with a server error
    Failing,
    /// Always fails with a rate limit
    RateLimited,
    /// Always reports the text as left untranslated
    Unchanged,
    /// Succeeds with `prefix + text`, delaying earlier requests longer than later ones
    ReversedDelay { prefix: String, step_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Name reported to the chain
    name: String,
    /// Behavior mode
    behavior: MockBehavior,
    /// Serve `translate_batch` as a single call
    native_batch: bool,
    /// Texts per batch call
    max_batch_size: usize,
    /// Concurrent calls during fan-out
    concurrency: usize,
    /// Single-item request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Native batch call counter, shared between clones
    batch_count: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            name: "mock".to_string(),
            behavior,
            native_batch: false,
            max_batch_size: 50,
            concurrency: 4,
            request_count: Arc::new(AtomicUsize::new(0)),
            batch_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a mock provider that prefixes every text
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::new(MockBehavior::Prefix(prefix.into()))
    }

    /// Create a mock provider that returns the text unchanged
    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every: fail_every.max(1) })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock provider that is always rate limited
    pub fn rate_limited() -> Self {
        Self::new(MockBehavior::RateLimited)
    }

    /// Create a mock provider that never changes its input
    pub fn unchanged() -> Self {
        Self::new(MockBehavior::Unchanged)
    }

    /// Create a mock provider whose later requests complete first
    pub fn reversed_delay(prefix: impl Into<String>, step_ms: u64) -> Self {
        Self::new(MockBehavior::ReversedDelay { prefix: prefix.into(), step_ms })
            .with_concurrency(DELAY_CYCLE)
    }

    /// Set the name reported to the chain
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Serve batches as one call instead of fanning out
    pub fn with_native_batch(mut self, native_batch: bool) -> Self {
        self.native_batch = native_batch;
        self
    }

    /// Set the maximum texts per batch call
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size.max(1);
        self
    }

    /// Set the fan-out concurrency
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Texts this provider was asked to translate
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Native batch calls made
    pub fn batch_count(&self) -> usize {
        self.batch_count.load(Ordering::SeqCst)
    }

    async fn respond(&self, text: &str) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);

        match &self.behavior {
            MockBehavior::Prefix(prefix) => Ok(format!("{}{}", prefix, text)),
            MockBehavior::Echo => Ok(text.to_string()),
            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(format!("[TRANSLATED] {}", text))
                }
            }
            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),
            MockBehavior::RateLimited => {
                Err(ProviderError::RateLimitExceeded("Simulated rate limit".to_string()))
            }
            MockBehavior::Unchanged => Err(ProviderError::Unchanged),
            MockBehavior::ReversedDelay { prefix, step_ms } => {
                let remaining = (DELAY_CYCLE - count % DELAY_CYCLE) as u64;
                tokio::time::sleep(Duration::from_millis(step_ms * remaining)).await;
                Ok(format!("{}{}", prefix, text))
            }
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            behavior: self.behavior.clone(),
            native_batch: self.native_batch,
            max_batch_size: self.max_batch_size,
            concurrency: self.concurrency,
            request_count: Arc::clone(&self.request_count),
            batch_count: Arc::clone(&self.batch_count),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn translate(
        &self,
        text: &str,
        _source_language: &str,
        _target_language: &str,
    ) -> Result<String, ProviderError> {
        self.respond(text).await
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        source_language: &str,
        target_language: &str,
    ) -> Vec<Result<String, ProviderError>> {
        if !self.native_batch {
            return fan_out(self, texts, source_language, target_language).await;
        }

        self.batch_count.fetch_add(1, Ordering::SeqCst);
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.respond(text).await);
        }
        results
    }

    fn supports_native_batch(&self) -> bool {
        self.native_batch
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    fn concurrency(&self) -> usize {
        self.concurrency
    }
}
