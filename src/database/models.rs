/*!
 * Database entity models.
 *
 * These structures map directly to database tables and provide
 * type-safe access to persisted data.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Translation cache row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Database ID
    pub id: i64,
    /// SHA256 hash of the normalized source text
    pub source_text_hash: String,
    /// Normalized source text
    pub source_text: String,
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
    /// Translated text
    pub translated_text: String,
    /// Number of lookups served from this row
    pub hit_count: i64,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Last lookup or write timestamp (RFC 3339)
    pub last_used_at: String,
}

impl CacheRecord {
    /// Create a new cache record for `source_text`, which must already be normalized
    pub fn new(
        source_text: &str,
        source_language: &str,
        target_language: &str,
        translated_text: &str,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: 0, // Will be assigned by database
            source_text_hash: super::Repository::hash_text(source_text),
            source_text: source_text.to_string(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            translated_text: translated_text.to_string(),
            hit_count: 0,
            created_at: now.clone(),
            last_used_at: now,
        }
    }
}

/// Aggregate numbers for the cache table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheTableStats {
    /// Rows in the table
    pub total_entries: i64,
    /// Sum of hit counts
    pub total_hits: i64,
    /// Distinct (source, target) language pairs
    pub language_pairs: i64,
    /// Database file size in bytes
    pub file_size_bytes: u64,
}

impl fmt::Display for CacheTableStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Entries: {}, Hits: {}, Language pairs: {}, Size: {} KB",
            self.total_entries,
            self.total_hits,
            self.language_pairs,
            self.file_size_bytes / 1024
        )
    }
}
