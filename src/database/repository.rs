/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API over the translation cache table,
 * abstracting away the SQL details and providing type-safe access.
 */

use anyhow::Result;
use rusqlite::{OptionalExtension, params};
use sha2::{Digest, Sha256};

use super::connection::DatabaseConnection;
use super::models::{CacheRecord, CacheTableStats};

/// Repository for database operations
#[derive(Clone, Debug)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

/// Insert a row, or only bump usage when the key already exists; yields the stored text
const UPSERT_CACHE_SQL: &str = r#"
    INSERT INTO translation_cache (
        source_text_hash, source_text, source_language, target_language,
        translated_text, hit_count, created_at, last_used_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    ON CONFLICT(source_text_hash, source_language, target_language)
    DO UPDATE SET hit_count = translation_cache.hit_count + 1,
                  last_used_at = excluded.last_used_at
    RETURNING translated_text
"#;

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Compute SHA256 hash of text
    pub fn hash_text(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Get a cached translation and record the hit
    pub async fn get_cached_translation(
        &self,
        source_text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<Option<String>> {
        let source_text_hash = Self::hash_text(source_text);
        let source_language = source_language.to_string();
        let target_language = target_language.to_string();

        self.db
            .execute_async(move |conn| {
                let result: Option<(i64, String)> = conn
                    .query_row(
                        r#"
                        SELECT id, translated_text
                        FROM translation_cache
                        WHERE source_text_hash = ?1
                          AND source_language = ?2
                          AND target_language = ?3
                        "#,
                        params![source_text_hash, source_language, target_language],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;

                let Some((id, translated_text)) = result else {
                    return Ok(None);
                };

                conn.execute(
                    "UPDATE translation_cache SET hit_count = hit_count + 1, last_used_at = ?2 WHERE id = ?1",
                    params![id, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(Some(translated_text))
            })
            .await
    }

    /// Store a translation; an existing row keeps its text
    pub async fn cache_translation(&self, record: &CacheRecord) -> Result<String> {
        let stored = self.cache_translations(vec![record.clone()]).await?;
        Ok(stored.into_iter().next().unwrap_or_else(|| record.translated_text.clone()))
    }

    /// Store several translations in one transaction
    ///
    /// Returns the text each row holds afterwards, in input order. For keys
    /// that were already cached this is the earlier translation.
    pub async fn cache_translations(&self, records: Vec<CacheRecord>) -> Result<Vec<String>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        self.db
            .transaction_async(move |tx| {
                let mut stmt = tx.prepare(UPSERT_CACHE_SQL)?;
                let mut stored = Vec::with_capacity(records.len());
                for record in &records {
                    let text: String = stmt.query_row(params![
                        record.source_text_hash,
                        record.source_text,
                        record.source_language,
                        record.target_language,
                        record.translated_text,
                        record.hit_count,
                        record.created_at,
                        record.last_used_at,
                    ], |row| row.get(0))?;
                    stored.push(text);
                }
                Ok(stored)
            })
            .await
    }

    /// Get cache statistics
    pub async fn get_cache_stats(&self) -> Result<CacheTableStats> {
        let file_size_bytes = self.db.file_size();

        self.db
            .execute_async(move |conn| {
                let (total_entries, total_hits): (i64, i64) = conn.query_row(
                    "SELECT COUNT(*), COALESCE(SUM(hit_count), 0) FROM translation_cache",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;

                let language_pairs: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM (SELECT DISTINCT source_language, target_language FROM translation_cache)",
                    [],
                    |row| row.get(0),
                )?;

                Ok(CacheTableStats {
                    total_entries,
                    total_hits,
                    language_pairs,
                    file_size_bytes,
                })
            })
            .await
    }

    /// Clear the translation cache
    pub async fn clear_cache(&self) -> Result<i64> {
        self.db
            .execute_async(|conn| {
                let deleted = conn.execute("DELETE FROM translation_cache", [])?;
                Ok(deleted as i64)
            })
            .await
    }

    /// Most frequently used entries across all language pairs (for cache warming)
    pub async fn get_top_cache_entries(&self, limit: usize) -> Result<Vec<CacheRecord>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, source_text_hash, source_text, source_language, target_language,
                           translated_text, hit_count, created_at, last_used_at
                    FROM translation_cache
                    ORDER BY hit_count DESC, last_used_at DESC
                    LIMIT ?1
                    "#,
                )?;

                let records = stmt
                    .query_map(params![limit as i64], |row| {
                        Ok(CacheRecord {
                            id: row.get(0)?,
                            source_text_hash: row.get(1)?,
                            source_text: row.get(2)?,
                            source_language: row.get(3)?,
                            target_language: row.get(4)?,
                            translated_text: row.get(5)?,
                            hit_count: row.get(6)?,
                            created_at: row.get(7)?,
                            last_used_at: row.get(8)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                Ok(records)
            })
            .await
    }
}
