use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::Value;

use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::{Provider, ensure_translated, http_client};

/// Client for the free Google Translate web endpoint
///
/// One request per text. The endpoint tolerates roughly 50 requests per
/// minute before it starts answering 429.
#[derive(Debug)]
pub struct GoogleProvider {
    /// HTTP client for API requests
    client: Client,
    /// Endpoint URL
    endpoint: String,
    /// Concurrent requests during fan-out
    concurrency: usize,
    /// Texts per batch call
    max_batch_size: usize,
}

impl GoogleProvider {
    /// Create a new Google client from its configuration entry
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client: http_client(config),
            endpoint: config.endpoint.clone(),
            concurrency: config.concurrency,
            max_batch_size: config.max_batch_size,
        }
    }

    /// Join the translated segments of a `[[["tr","src",...],...],...]` response
    pub fn parse_response(body: &Value) -> Result<String, ProviderError> {
        let segments = body
            .get(0)
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::ParseError("missing segment list".to_string()))?;

        Ok(segments
            .iter()
            .filter_map(|segment| segment.get(0).and_then(Value::as_str))
            .collect())
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    fn name(&self) -> &str {
        "google_free"
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        let source = language_utils::to_google_code(source_language);
        let target = language_utils::to_google_code(target_language);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", source.as_str()),
                ("tl", target.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            debug!("Google endpoint returned {}: {}", status, message);
            return Err(ProviderError::from_status(status.as_u16(), message));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        ensure_translated(text, &Self::parse_response(&body)?)
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    fn concurrency(&self) -> usize {
        self.concurrency
    }
}
