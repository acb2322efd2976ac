use async_trait::async_trait;
use log::debug;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::{Provider, ensure_translated};

/// Wrapper around the translate-shell command line tool (`trans -b`)
///
/// Kept as the last resort in the chain. The tool returns its input unchanged
/// when the service behind it is throttling, so identical output counts as a
/// rate limit here.
#[derive(Debug)]
pub struct TranslateShellProvider {
    /// Resolved `trans` executable, None when it is not on PATH
    binary: Option<PathBuf>,
    /// Time allowed for one invocation
    timeout: Duration,
    /// Concurrent processes during fan-out
    concurrency: usize,
    /// Texts per batch call
    max_batch_size: usize,
}

/// Locate an executable on PATH
fn find_on_path(program: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

impl TranslateShellProvider {
    /// Create the provider, resolving `trans` from PATH
    pub fn new(config: &ProviderConfig) -> Self {
        let binary = if config.endpoint.is_empty() {
            find_on_path("trans")
        } else {
            Some(PathBuf::from(&config.endpoint))
        };
        Self::with_binary(binary, config)
    }

    /// Create the provider with an explicit executable
    pub fn with_binary(binary: Option<PathBuf>, config: &ProviderConfig) -> Self {
        Self {
            binary,
            timeout: config.timeout(),
            concurrency: config.concurrency,
            max_batch_size: config.max_batch_size,
        }
    }

    /// Interpret the tool's exit status and output
    pub fn interpret_output(source: &str, success: bool, stdout: &str) -> Result<String, ProviderError> {
        if !success {
            return Err(ProviderError::RequestFailed("trans exited with an error".to_string()));
        }
        match ensure_translated(source, stdout) {
            Err(ProviderError::Unchanged) if !stdout.trim().is_empty() => Err(
                ProviderError::RateLimitExceeded("output identical to input".to_string()),
            ),
            other => other,
        }
    }
}

#[async_trait]
impl Provider for TranslateShellProvider {
    fn name(&self) -> &str {
        "translate_shell"
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        let binary = self
            .binary
            .as_ref()
            .ok_or_else(|| ProviderError::NotConfigured("`trans` not found on PATH".to_string()))?;

        let pair = format!(
            "{}:{}",
            language_utils::to_lowercase_tag(source_language),
            language_utils::to_lowercase_tag(target_language)
        );

        let mut command = Command::new(binary);
        command.arg("-b").arg(&pair).arg(text).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            debug!(
                "trans failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Self::interpret_output(text, output.status.success(), &stdout)
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    fn concurrency(&self) -> usize {
        self.concurrency
    }

    fn is_configured(&self) -> bool {
        self.binary.is_some()
    }
}
