/*!
 * Tests for provider health tracking
 */

use std::time::{Duration, Instant};

use msgtrans::app_config::HealthConfig;
use msgtrans::translation::{FailureKind, HealthStatus, ProviderHealth};

fn health(rpm: Option<u32>) -> ProviderHealth {
    ProviderHealth::new("google_free", 0, &HealthConfig::default(), rpm)
}

#[test]
fn test_rateLimits_shouldCoolDown30Then60Then120ThenReset() {
    let mut health = health(None);
    let start = Instant::now();

    let first = health.record_failure(FailureKind::RateLimit, "429", start);
    assert_eq!(first, Some(Duration::from_secs(30)));
    assert!(health.request_budget(start + Duration::from_secs(29)).is_none());

    let after_first = start + Duration::from_secs(31);
    assert!(health.request_budget(after_first).is_some());
    let second = health.record_failure(FailureKind::RateLimit, "429", after_first);
    assert_eq!(second, Some(Duration::from_secs(60)));

    let after_second = after_first + Duration::from_secs(61);
    let third = health.record_failure(FailureKind::RateLimit, "429", after_second);
    assert_eq!(third, Some(Duration::from_secs(120)));
    assert_eq!(health.cooldown_until(), Some(after_second + Duration::from_secs(120)));

    health.record_success();
    assert_eq!(health.cooldown_until(), None);
    assert!(health.request_budget(after_second).is_some());

    let again = health.record_failure(FailureKind::RateLimit, "429", after_second);
    assert_eq!(again, Some(Duration::from_secs(30)));
}

#[test]
fn test_snapshot_shouldReportCountersAndStatus() {
    let mut health = health(Some(10));
    let now = Instant::now();

    health.reserve(3, now);
    health.record_success();
    health.record_failure(FailureKind::RateLimit, "quota", now);

    let snapshot = health.snapshot(true, now);
    assert_eq!(snapshot.status, HealthStatus::CoolingDown);
    assert_eq!(snapshot.total_requests, 3);
    assert_eq!(snapshot.successful, 1);
    assert_eq!(snapshot.rate_limited, 1);
    assert_eq!(snapshot.requests_this_window, 3);
    assert_eq!(snapshot.last_error.as_deref(), Some("quota"));
    assert_eq!(snapshot.success_rate, 50.0);
    assert!(snapshot.cooldown_remaining_secs.is_some_and(|s| s <= 30));

    assert_eq!(health.status(false, now), HealthStatus::Disabled);
}
