use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;

use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::{Provider, ensure_translated, http_client};

/// DeepL answers 456 when the monthly character quota is used up
const QUOTA_EXCEEDED: u16 = 456;

/// Client for the DeepL API free tier
#[derive(Debug)]
pub struct DeeplProvider {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// Endpoint URL
    endpoint: String,
    /// Texts per request
    max_batch_size: usize,
}

/// DeepL translate response
#[derive(Debug, Deserialize)]
pub struct DeeplResponse {
    /// One entry per submitted text, in order
    pub translations: Vec<DeeplTranslation>,
}

/// Individual translation in a DeepL response
#[derive(Debug, Deserialize)]
pub struct DeeplTranslation {
    /// Language DeepL detected for the source text
    #[serde(default)]
    pub detected_source_language: Option<String>,
    /// The translated text
    pub text: String,
}

impl DeeplProvider {
    /// Create a new DeepL client from its configuration entry
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client: http_client(config),
            api_key: config.api_key.trim().to_string(),
            endpoint: config.endpoint.clone(),
            max_batch_size: config.max_batch_size.min(50),
        }
    }

    /// Send one request carrying all texts as repeated `text` fields
    async fn request(
        &self,
        texts: &[String],
        source_language: &str,
        target_language: &str,
    ) -> Result<DeeplResponse, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured("DeepL API key missing".to_string()));
        }

        let mut form: Vec<(&str, String)> = vec![
            ("source_lang", language_utils::to_deepl_code(source_language, false)),
            ("target_lang", language_utils::to_deepl_code(target_language, true)),
        ];
        form.extend(texts.iter().map(|text| ("text", text.clone())));

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            debug!("DeepL API returned {}: {}", status, message);
            if status.as_u16() == QUOTA_EXCEEDED {
                return Err(ProviderError::RateLimitExceeded(format!("quota exceeded: {}", message)));
            }
            return Err(ProviderError::from_status(status.as_u16(), message));
        }

        response
            .json::<DeeplResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }

    /// Pair each source text with its translation; missing entries become errors
    pub fn pair_results(texts: &[String], response: DeeplResponse) -> Vec<Result<String, ProviderError>> {
        let mut translations = response.translations.into_iter();
        texts
            .iter()
            .map(|source| match translations.next() {
                Some(translation) => ensure_translated(source, &translation.text),
                None => Err(ProviderError::ParseError("fewer translations than texts".to_string())),
            })
            .collect()
    }
}

#[async_trait]
impl Provider for DeeplProvider {
    fn name(&self) -> &str {
        "deepl_free"
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        let texts = [text.to_string()];
        let response = self.request(&texts, source_language, target_language).await?;
        Self::pair_results(&texts, response)
            .pop()
            .unwrap_or(Err(ProviderError::Unchanged))
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        source_language: &str,
        target_language: &str,
    ) -> Vec<Result<String, ProviderError>> {
        if texts.is_empty() {
            return Vec::new();
        }
        match self.request(texts, source_language, target_language).await {
            Ok(response) => Self::pair_results(texts, response),
            Err(e) => vec![Err(e); texts.len()],
        }
    }

    fn supports_native_batch(&self) -> bool {
        true
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
