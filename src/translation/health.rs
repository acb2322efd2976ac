/*!
 * Provider health tracking.
 *
 * Each provider in the chain carries a small circuit breaker:
 * - a rolling 60 second request window capped by the provider's rate limit
 * - an exponential cooldown after consecutive rate-limit failures
 * - a base cooldown after a run of other failures
 *
 * A success closes the breaker again. All methods take `now` explicitly so
 * the state machine can be driven deterministically.
 */

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::app_config::HealthConfig;

/// Length of the request window
const WINDOW: Duration = Duration::from_secs(60);

/// How a provider call failed, as far as health is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The service asked us to slow down
    RateLimit,
    /// Anything else
    Other,
}

/// Externally visible provider state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Requests may be sent
    Available,
    /// Skipped until the cooldown expires
    CoolingDown,
    /// Missing credentials or binary
    Disabled,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Available => "available",
            Self::CoolingDown => "cooling_down",
            Self::Disabled => "disabled",
        };
        write!(f, "{}", s)
    }
}

/// Serializable view of a provider's health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSnapshot {
    pub name: String,
    pub priority: usize,
    pub status: HealthStatus,
    pub total_requests: u64,
    pub successful: u64,
    pub failed: u64,
    pub rate_limited: u64,
    pub consecutive_failures: u32,
    pub consecutive_rate_limits: u32,
    /// Seconds left in the current cooldown
    pub cooldown_remaining_secs: Option<u64>,
    pub requests_this_window: u32,
    pub last_error: Option<String>,
    /// Successful calls over all finished calls, in percent
    pub success_rate: f64,
}

/// Health record of one provider
#[derive(Debug, Clone)]
pub struct ProviderHealth {
    name: String,
    priority: usize,
    config: HealthConfig,
    max_requests_per_minute: Option<u32>,

    consecutive_failures: u32,
    consecutive_rate_limits: u32,
    cooldown_until: Option<Instant>,

    total_requests: u64,
    successful: u64,
    failed: u64,
    rate_limited: u64,

    requests_this_window: u32,
    window_start: Instant,
    last_error: Option<String>,
}

impl ProviderHealth {
    /// Create a healthy record
    pub fn new(
        name: impl Into<String>,
        priority: usize,
        config: &HealthConfig,
        max_requests_per_minute: Option<u32>,
    ) -> Self {
        Self {
            name: name.into(),
            priority,
            config: config.clone(),
            max_requests_per_minute,
            consecutive_failures: 0,
            consecutive_rate_limits: 0,
            cooldown_until: None,
            total_requests: 0,
            successful: 0,
            failed: 0,
            rate_limited: 0,
            requests_this_window: 0,
            window_start: Instant::now(),
            last_error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cooldown_until(&self) -> Option<Instant> {
        self.cooldown_until
    }

    /// Whether the provider is inside a cooldown period
    pub fn is_cooling_down(&self, now: Instant) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }

    fn roll_window(&mut self, now: Instant) {
        if now.saturating_duration_since(self.window_start) >= WINDOW {
            self.window_start = now;
            self.requests_this_window = 0;
        }
    }

    /// How many requests may start now; None while cooling down or out of budget
    pub fn request_budget(&mut self, now: Instant) -> Option<usize> {
        if self.is_cooling_down(now) {
            return None;
        }
        self.roll_window(now);

        match self.max_requests_per_minute {
            None => Some(usize::MAX),
            Some(limit) => {
                let remaining = limit.saturating_sub(self.requests_this_window) as usize;
                (remaining > 0).then_some(remaining)
            }
        }
    }

    /// Count requests about to be sent
    pub fn reserve(&mut self, requests: usize, now: Instant) {
        self.roll_window(now);
        let requests = u32::try_from(requests).unwrap_or(u32::MAX);
        self.requests_this_window = self.requests_this_window.saturating_add(requests);
        self.total_requests += u64::from(requests);
    }

    /// A call succeeded: close the breaker
    pub fn record_success(&mut self) {
        self.successful += 1;
        self.consecutive_failures = 0;
        self.consecutive_rate_limits = 0;
        self.cooldown_until = None;
    }

    /// A call failed; returns the cooldown applied, if any
    pub fn record_failure(
        &mut self,
        kind: FailureKind,
        message: impl Into<String>,
        now: Instant,
    ) -> Option<Duration> {
        self.failed += 1;
        self.last_error = Some(message.into());

        let cooldown = match kind {
            FailureKind::RateLimit => {
                self.rate_limited += 1;
                self.consecutive_rate_limits += 1;
                Some(self.rate_limit_cooldown(self.consecutive_rate_limits))
            }
            FailureKind::Other => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.config.failure_threshold.max(1) {
                    self.consecutive_failures = 0;
                    Some(Duration::from_secs(self.config.base_cooldown_secs))
                } else {
                    None
                }
            }
        };

        if let Some(duration) = cooldown {
            let until = now + duration;
            // Never shorten a cooldown that is already running
            self.cooldown_until = Some(self.cooldown_until.map_or(until, |current| current.max(until)));
        }
        cooldown
    }

    /// Cooldown for the k-th consecutive rate limit: base * 2^(k-1), capped
    pub fn rate_limit_cooldown(&self, consecutive: u32) -> Duration {
        let factor = 2u64.saturating_pow(consecutive.saturating_sub(1));
        let secs = self
            .config
            .base_cooldown_secs
            .saturating_mul(factor)
            .min(self.config.max_cooldown_secs);
        Duration::from_secs(secs)
    }

    /// Current state given whether the backend is configured
    pub fn status(&self, configured: bool, now: Instant) -> HealthStatus {
        if !configured {
            HealthStatus::Disabled
        } else if self.is_cooling_down(now) {
            HealthStatus::CoolingDown
        } else {
            HealthStatus::Available
        }
    }

    /// Serializable copy of the record
    pub fn snapshot(&self, configured: bool, now: Instant) -> ProviderSnapshot {
        let finished = self.successful + self.failed;
        ProviderSnapshot {
            name: self.name.clone(),
            priority: self.priority,
            status: self.status(configured, now),
            total_requests: self.total_requests,
            successful: self.successful,
            failed: self.failed,
            rate_limited: self.rate_limited,
            consecutive_failures: self.consecutive_failures,
            consecutive_rate_limits: self.consecutive_rate_limits,
            cooldown_remaining_secs: self
                .cooldown_until
                .filter(|until| *until > now)
                .map(|until| until.duration_since(now).as_secs()),
            requests_this_window: self.requests_this_window,
            last_error: self.last_error.clone(),
            success_rate: if finished == 0 {
                0.0
            } else {
                self.successful as f64 * 100.0 / finished as f64
            },
        }
    }
}
