/*!
 * # msgtrans - translation jobs for message catalogs
 *
 * A Rust library for translating application message files (PHP `$msg_arr`
 * language tables, plain line files) through a chain of machine translation
 * backends.
 *
 * ## Features
 *
 * - Translate through several backends with automatic fallback:
 *   - Google Translate web endpoint
 *   - DeepL API (free tier)
 *   - MyMemory
 *   - translate-shell
 * - Per-provider health tracking with cooldowns and request windows
 * - Two-level translation cache (in-memory LRU + SQLite)
 * - `{placeholder}` protection and post-translation validation
 * - Background jobs with progress reporting and cancellation
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `translation`: Translation core:
 *   - `translation::engine`: Cache plus provider chain
 *   - `translation::cache`: Two-level translation cache
 *   - `translation::health`: Provider circuit breaker
 *   - `translation::placeholders`: Placeholder protection
 *   - `translation::validation`: Post-translation checks
 * - `job`: Job orchestration, file codecs and output storage
 * - `database`: SQLite storage for the persistent cache
 * - `language_utils`: Language code utilities
 * - `providers`: Client implementations for the translation backends
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod database;
pub mod errors;
pub mod job;
pub mod language_utils;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{AppError, CacheError, FileError, JobError, ProviderError};
pub use job::{Job, JobOrchestrator, JobRequest, JobStatus};
pub use language_utils::{get_language_name, validate_language_tag};
pub use translation::{LanguagePair, TranslationEngine, TwoLevelCache};
