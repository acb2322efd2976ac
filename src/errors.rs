/*!
 * Error types for the msgtrans application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 *
 * Propagation follows the job engine's taxonomy:
 * - `ProviderError` is absorbed by the provider chain and never leaves the engine
 * - `FileError` aborts a single file; the job moves on to the next one
 * - `JobError` is fatal to a whole job
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The provider is missing credentials or a required binary
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// The provider returned an empty result or the input unchanged
    #[error("Provider returned the text untranslated")]
    Unchanged,

    /// The call did not finish within the provider's timeout
    #[error("Request timed out after {0}s")]
    Timeout(u64),
}

impl ProviderError {
    /// Whether this failure should put the provider into cooldown
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimitExceeded(_))
    }

    /// Map a non-success HTTP status to the matching error
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            429 => Self::RateLimitExceeded(message),
            401 | 403 => Self::AuthenticationError(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            Self::from_status(status.as_u16(), error.to_string())
        } else if error.is_timeout() {
            Self::ConnectionError(format!("timeout: {}", error))
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::ConnectionError(error.to_string())
        }
    }
}

/// Errors from the two-level translation cache
#[derive(Error, Debug)]
pub enum CacheError {
    /// The durable tier could not be read or written
    #[error("Cache storage error: {0}")]
    Storage(String),
}

impl From<anyhow::Error> for CacheError {
    fn from(error: anyhow::Error) -> Self {
        Self::Storage(format!("{:#}", error))
    }
}

/// Errors that abort the processing of a single file
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FileError {
    /// File contents are not valid UTF-8
    #[error("File is not valid UTF-8: {0}")]
    Encoding(String),

    /// The rewrite step got a different number of strings than extraction produced
    #[error("Expected {expected} strings for rewrite, got {actual}")]
    StringCountMismatch {
        /// Strings found by extraction
        expected: usize,
        /// Strings handed to rewrite
        actual: usize,
    },

    /// Reading or writing the file failed
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for FileError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

/// Errors that are fatal to a whole job
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JobError {
    /// The job was submitted without any input file
    #[error("No input files in job")]
    NoFiles,

    /// Unknown job id
    #[error("Job not found: {0}")]
    NotFound(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(#[from] FileError),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the translation cache
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Error from the job engine
    #[error("Job error: {0}")]
    Job(#[from] JobError),

    /// Error in the configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(FileError::Io(error.to_string()))
    }
}
