/*!
 * Translation caching functionality.
 *
 * Two tiers sit in front of the providers:
 * - L1: a bounded in-memory LRU map, lost on restart
 * - L2: the SQLite table behind `Repository`, kept across runs
 *
 * Lookups fall through L1 to L2 and promote L2 hits. Writes go to L2 first;
 * L1 is only updated once the durable write succeeded, so memory never holds
 * an entry the database does not.
 */

use log::{debug, warn};
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::database::{CacheRecord, CacheTableStats, Repository};
use crate::errors::CacheError;

/// Cache key combining normalized text, source language, and target language
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    source_text: String,
    source_language: String,
    target_language: String,
}

impl CacheKey {
    fn new(source_text: &str, source_language: &str, target_language: &str) -> Self {
        Self {
            source_text: normalize(source_text).to_string(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
        }
    }
}

/// Texts differing only in surrounding whitespace share an entry
fn normalize(text: &str) -> &str {
    text.trim()
}

/// Lookup counters
#[derive(Debug, Default)]
struct CacheCounters {
    lookups: AtomicU64,
    memory_hits: AtomicU64,
    database_hits: AtomicU64,
    misses: AtomicU64,
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub lookups: u64,
    pub memory_hits: u64,
    pub database_hits: u64,
    pub misses: u64,
    /// Hits from either tier over lookups, in percent
    pub hit_rate: f64,
    pub memory_entries: usize,
    pub memory_capacity: usize,
}

/// Two-level translation cache
pub struct TwoLevelCache {
    memory: Mutex<LruCache<CacheKey, String>>,
    repository: Repository,
    counters: CacheCounters,
}

impl std::fmt::Debug for TwoLevelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwoLevelCache")
            .field("memory_entries", &self.memory.lock().len())
            .field("repository", &self.repository)
            .finish()
    }
}

impl TwoLevelCache {
    /// Create a cache holding at most `memory_capacity` entries in memory
    pub fn new(repository: Repository, memory_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(memory_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            memory: Mutex::new(LruCache::new(capacity)),
            repository,
            counters: CacheCounters::default(),
        }
    }

    /// Create a cache backed by an in-memory database (for testing)
    pub fn in_memory(memory_capacity: usize) -> Result<Self, CacheError> {
        Ok(Self::new(Repository::new_in_memory()?, memory_capacity))
    }

    /// Look a translation up in memory, then in the database
    ///
    /// Database errors are logged and reported as a miss.
    pub async fn get(&self, text: &str, source_language: &str, target_language: &str) -> Option<String> {
        self.counters.lookups.fetch_add(1, Ordering::Relaxed);
        let key = CacheKey::new(text, source_language, target_language);

        let cached = self.memory.lock().get(&key).cloned();
        if let Some(hit) = cached {
            self.counters.memory_hits.fetch_add(1, Ordering::Relaxed);
            return Some(hit);
        }

        match self
            .repository
            .get_cached_translation(&key.source_text, source_language, target_language)
            .await
        {
            Ok(Some(hit)) => {
                self.counters.database_hits.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Cache L2 hit for '{}' ({} -> {})",
                    truncate_text(&key.source_text, 30),
                    source_language,
                    target_language
                );
                self.memory.lock().put(key, hit.clone());
                Some(hit)
            }
            Ok(None) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                warn!("Translation cache lookup failed: {:#}", e);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store one translation
    pub async fn put(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        translation: &str,
    ) -> Result<(), CacheError> {
        self.put_many(
            vec![(text.to_string(), translation.to_string())],
            source_language,
            target_language,
        )
        .await
    }

    /// Store several `(source, translation)` pairs in one database transaction
    pub async fn put_many(
        &self,
        entries: Vec<(String, String)>,
        source_language: &str,
        target_language: &str,
    ) -> Result<(), CacheError> {
        let entries: Vec<(CacheKey, String)> = entries
            .into_iter()
            .filter(|(text, _)| !normalize(text).is_empty())
            .map(|(text, translation)| (CacheKey::new(&text, source_language, target_language), translation))
            .collect();
        if entries.is_empty() {
            return Ok(());
        }

        let records = entries
            .iter()
            .map(|(key, translation)| {
                CacheRecord::new(&key.source_text, source_language, target_language, translation)
            })
            .collect();
        let stored = self.repository.cache_translations(records).await?;

        // The database keeps the first stored value; memory mirrors whatever it holds
        let mut memory = self.memory.lock();
        for ((key, _), translation) in entries.into_iter().zip(stored) {
            memory.put(key, translation);
        }
        Ok(())
    }

    /// Preload the most used database entries into memory
    pub async fn warm_up(&self, limit: usize) -> Result<usize, CacheError> {
        if limit == 0 {
            return Ok(0);
        }

        let records = self.repository.get_top_cache_entries(limit).await?;
        let mut memory = self.memory.lock();
        // Least used first, so the most used end up most recent
        for record in records.iter().rev() {
            let key = CacheKey {
                source_text: record.source_text.clone(),
                source_language: record.source_language.clone(),
                target_language: record.target_language.clone(),
            };
            memory.put(key, record.translated_text.clone());
        }

        debug!("Warmed translation cache with {} entries", records.len());
        Ok(records.len())
    }

    /// Remove every entry from both tiers; returns the number of database rows deleted
    pub async fn clear(&self) -> Result<i64, CacheError> {
        let deleted = self.repository.clear_cache().await?;
        self.memory.lock().clear();
        debug!("Translation cache cleared");
        Ok(deleted)
    }

    /// Lookup statistics
    pub fn stats(&self) -> CacheStats {
        let lookups = self.counters.lookups.load(Ordering::Relaxed);
        let memory_hits = self.counters.memory_hits.load(Ordering::Relaxed);
        let database_hits = self.counters.database_hits.load(Ordering::Relaxed);
        let misses = self.counters.misses.load(Ordering::Relaxed);
        let memory = self.memory.lock();

        CacheStats {
            lookups,
            memory_hits,
            database_hits,
            misses,
            hit_rate: if lookups > 0 {
                (memory_hits + database_hits) as f64 * 100.0 / lookups as f64
            } else {
                0.0
            },
            memory_entries: memory.len(),
            memory_capacity: memory.cap().get(),
        }
    }

    /// Statistics of the database tier
    pub async fn database_stats(&self) -> Result<CacheTableStats, CacheError> {
        Ok(self.repository.get_cache_stats().await?)
    }

    /// Number of entries held in memory
    pub fn memory_len(&self) -> usize {
        self.memory.lock().len()
    }
}

/// Truncate text to a maximum number of characters with ellipsis
pub(crate) fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
