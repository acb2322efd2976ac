use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::{Provider, ensure_translated, http_client};

/// Client for the MyMemory translation API
///
/// Anonymous use allows about 5000 characters a day; a registration email
/// sent as `de` raises that to 50000.
#[derive(Debug)]
pub struct MyMemoryProvider {
    /// HTTP client for API requests
    client: Client,
    /// Endpoint URL
    endpoint: String,
    /// Registration email, may be empty
    email: String,
    /// Concurrent requests during fan-out
    concurrency: usize,
    /// Texts per batch call
    max_batch_size: usize,
}

/// MyMemory response body
#[derive(Debug, Deserialize)]
pub struct MyMemoryResponse {
    /// Translation payload
    #[serde(rename = "responseData", default)]
    pub response_data: Option<MyMemoryData>,
    /// Status code, sent as a number or as a string
    #[serde(rename = "responseStatus", default)]
    pub response_status: Value,
    /// Error details when the status is not 200
    #[serde(rename = "responseDetails", default)]
    pub response_details: Value,
}

/// Translation payload of a MyMemory response
#[derive(Debug, Deserialize)]
pub struct MyMemoryData {
    /// The translated text
    #[serde(rename = "translatedText", default)]
    pub translated_text: String,
}

impl MyMemoryResponse {
    /// Numeric response status, 200 when absent
    pub fn status(&self) -> u16 {
        match &self.response_status {
            Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()).unwrap_or(200),
            Value::String(s) => s.trim().parse().unwrap_or(200),
            _ => 200,
        }
    }

    /// Translated text or the matching error
    pub fn into_translation(self, source: &str) -> Result<String, ProviderError> {
        let status = self.status();
        if status != 200 {
            let message = match &self.response_details {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Err(ProviderError::from_status(status, message));
        }
        let translated = self.response_data.map(|d| d.translated_text).unwrap_or_default();
        ensure_translated(source, &translated)
    }
}

impl MyMemoryProvider {
    /// Create a new MyMemory client from its configuration entry
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client: http_client(config),
            endpoint: config.endpoint.clone(),
            email: config.email.trim().to_string(),
            concurrency: config.concurrency,
            max_batch_size: config.max_batch_size,
        }
    }
}

#[async_trait]
impl Provider for MyMemoryProvider {
    fn name(&self) -> &str {
        "mymemory"
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        let langpair = format!(
            "{}|{}",
            language_utils::to_lowercase_tag(source_language),
            language_utils::to_lowercase_tag(target_language)
        );

        let mut query: Vec<(&str, &str)> = vec![("q", text), ("langpair", langpair.as_str())];
        if !self.email.is_empty() {
            query.push(("de", self.email.as_str()));
        }

        let response = self.client.get(&self.endpoint).query(&query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            debug!("MyMemory API returned {}: {}", status, message);
            return Err(ProviderError::from_status(status.as_u16(), message));
        }

        let body: MyMemoryResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        body.into_translation(text)
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    fn concurrency(&self) -> usize {
        self.concurrency
    }
}
