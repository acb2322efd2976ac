/*!
 * Translation core.
 *
 * This module contains everything between an extracted string and its
 * translation. It is split into several submodules:
 *
 * - `placeholders`: `{name}` protection and integrity checks
 * - `unit`: the per-string work item
 * - `health`: per-provider circuit breaker and request window
 * - `cache`: two-level (memory + SQLite) translation cache
 * - `engine`: cache plus provider chain
 * - `validation`: post-translation checks
 */

// Re-export main types for easier usage
pub use self::cache::{CacheStats, TwoLevelCache};
pub use self::engine::{BatchReport, EngineStats, LanguagePair, TranslationEngine};
pub use self::health::{FailureKind, HealthStatus, ProviderHealth, ProviderSnapshot};
pub use self::unit::TranslationUnit;
pub use self::validation::{IssueKind, ValidationIssue, ValidationStats};

// Submodules
pub mod cache;
pub mod engine;
pub mod health;
pub mod placeholders;
pub mod unit;
pub mod validation;
