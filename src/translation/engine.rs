/*!
 * Translation engine: cache in front of a priority-ordered provider chain.
 *
 * A batch of units is resolved in three steps:
 * 1. blank strings resolve to themselves, everything else is looked up in the cache
 * 2. misses walk the provider chain; whatever one provider cannot translate is
 *    handed to the next one
 * 3. new translations are written back to the cache
 *
 * The engine never fails a batch. Units no provider could translate carry an
 * error message and fall back to their source text.
 */

use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use super::cache::{CacheStats, TwoLevelCache, truncate_text};
use super::health::{FailureKind, HealthStatus, ProviderHealth, ProviderSnapshot};
use super::unit::TranslationUnit;
use crate::app_config::{Config, HealthConfig};
use crate::errors::ProviderError;
use crate::providers::{Backend, Provider};

/// Source and target language of a translation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

impl LanguagePair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// Outcome of one `translate_batch` call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Units in the batch
    pub total: usize,
    /// Units that were blank
    pub blank: usize,
    /// Units served by the cache
    pub from_cache: usize,
    /// Units translated by a provider
    pub translated: usize,
    /// Indexes of units left untranslated
    pub failed: Vec<usize>,
    /// Units translated per provider
    pub by_provider: BTreeMap<String, usize>,
}

impl BatchReport {
    /// Units that ended up with a translation
    pub fn resolved(&self) -> usize {
        self.total - self.failed.len()
    }
}

/// Engine-wide statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub cache: CacheStats,
    pub providers: Vec<ProviderSnapshot>,
    pub active_provider: Option<String>,
}

/// A provider and its health record
#[derive(Debug)]
struct ChainEntry {
    backend: Backend,
    health: Mutex<ProviderHealth>,
}

/// Distinct protected text and the units sharing it
struct Pending {
    text: String,
    units: Vec<usize>,
    last_error: Option<String>,
}

/// Cache plus provider chain
#[derive(Debug)]
pub struct TranslationEngine {
    chain: Vec<ChainEntry>,
    cache: Arc<TwoLevelCache>,
}

impl TranslationEngine {
    /// Create an engine without providers
    pub fn new(cache: Arc<TwoLevelCache>) -> Self {
        Self {
            chain: Vec::new(),
            cache,
        }
    }

    /// Append a provider to the end of the chain
    pub fn with_provider(
        mut self,
        backend: impl Into<Backend>,
        health: &HealthConfig,
        max_requests_per_minute: Option<u32>,
    ) -> Self {
        let backend = backend.into();
        let health = ProviderHealth::new(backend.name(), self.chain.len(), health, max_requests_per_minute);
        self.chain.push(ChainEntry {
            backend,
            health: Mutex::new(health),
        });
        self
    }

    /// Create an engine with the enabled providers of the configuration, in order
    pub fn from_config(config: &Config, cache: Arc<TwoLevelCache>) -> Self {
        let engine = config.enabled_providers().fold(Self::new(cache), |engine, provider| {
            engine.with_provider(
                Backend::from_config(provider),
                &config.health,
                provider.max_requests_per_minute,
            )
        });

        let names: Vec<&str> = engine.chain.iter().map(|e| e.backend.name()).collect();
        let available: Vec<&str> = engine
            .chain
            .iter()
            .filter(|e| e.backend.is_configured())
            .map(|e| e.backend.name())
            .collect();
        info!("Translation engine initialized with providers: {:?}", names);
        info!("Available providers: {:?}", available);
        engine
    }

    /// The shared cache
    pub fn cache(&self) -> &Arc<TwoLevelCache> {
        &self.cache
    }

    /// Provider names in chain order
    pub fn provider_names(&self) -> Vec<String> {
        self.chain.iter().map(|e| e.backend.name().to_string()).collect()
    }

    /// Translate a single text
    pub async fn translate(&self, text: &str, pair: &LanguagePair) -> TranslationUnit {
        let mut units = [TranslationUnit::new(text)];
        self.translate_batch(&mut units, pair).await;
        let [unit] = units;
        unit
    }

    /// Resolve every unit through the cache and the provider chain
    ///
    /// Results are written back into `units` by index, so order is preserved
    /// whatever order providers answer in.
    pub async fn translate_batch(&self, units: &mut [TranslationUnit], pair: &LanguagePair) -> BatchReport {
        let mut report = BatchReport {
            total: units.len(),
            ..BatchReport::default()
        };

        let mut pending: Vec<Pending> = Vec::new();
        let mut by_text: HashMap<String, usize> = HashMap::new();

        for (index, unit) in units.iter_mut().enumerate() {
            if unit.is_blank() {
                let text = unit.protected.clone();
                unit.resolve(text, false);
                report.blank += 1;
                continue;
            }

            if let Some(&slot) = by_text.get(&unit.protected) {
                pending[slot].units.push(index);
                continue;
            }

            if let Some(hit) = self.cache.get(&unit.protected, &pair.source, &pair.target).await {
                unit.resolve(hit, true);
                report.from_cache += 1;
                continue;
            }

            by_text.insert(unit.protected.clone(), pending.len());
            pending.push(Pending {
                text: unit.protected.clone(),
                units: vec![index],
                last_error: None,
            });
        }

        if pending.is_empty() {
            return report;
        }

        let mut remaining: Vec<usize> = (0..pending.len()).collect();
        let mut new_entries: Vec<(String, String)> = Vec::new();

        for entry in &self.chain {
            if remaining.is_empty() {
                break;
            }
            if !entry.backend.is_configured() {
                continue;
            }

            let name = entry.backend.name();
            let mut carried = Vec::new();
            let mut cursor = 0;

            while cursor < remaining.len() {
                let now = Instant::now();
                let Some(budget) = entry.health.lock().request_budget(now) else {
                    debug!("Provider {} unavailable, passing {} texts on", name, remaining.len() - cursor);
                    break;
                };

                let native = entry.backend.supports_native_batch();
                let max_batch = entry.backend.max_batch_size().max(1);
                let chunk_size = if native { max_batch } else { max_batch.min(budget) };
                let chunk_end = (cursor + chunk_size).min(remaining.len());
                let chunk = &remaining[cursor..chunk_end];
                cursor = chunk_end;

                entry
                    .health
                    .lock()
                    .reserve(if native { 1 } else { chunk.len() }, now);

                let texts: Vec<String> = chunk.iter().map(|&slot| pending[slot].text.clone()).collect();
                debug!("Sending {} texts to {}", texts.len(), name);
                let mut results = entry
                    .backend
                    .translate_batch(&texts, &pair.source, &pair.target)
                    .await
                    .into_iter();

                let mut any_success = false;
                let mut rate_limit: Option<String> = None;
                let mut other_error: Option<String> = None;

                for &slot in chunk {
                    let result = results.next().unwrap_or_else(|| {
                        Err(ProviderError::ParseError("missing result for text".to_string()))
                    });
                    match result {
                        Ok(translation) => {
                            any_success = true;
                            let item = &pending[slot];
                            for &index in &item.units {
                                units[index].resolve(translation.clone(), false);
                            }
                            report.translated += item.units.len();
                            *report.by_provider.entry(name.to_string()).or_insert(0) += item.units.len();
                            new_entries.push((item.text.clone(), translation));
                        }
                        Err(error) => {
                            let message = error.to_string();
                            if error.is_rate_limit() {
                                rate_limit = Some(message.clone());
                            } else if error != ProviderError::Unchanged {
                                // Identical output says nothing about the provider's health
                                other_error = Some(message.clone());
                            }
                            pending[slot].last_error = Some(format!("{}: {}", name, message));
                            carried.push(slot);
                        }
                    }
                }

                let mut health = entry.health.lock();
                if any_success {
                    health.record_success();
                } else if let Some(message) = rate_limit {
                    if let Some(cooldown) = health.record_failure(FailureKind::RateLimit, message, now) {
                        warn!("Provider {} rate limited, cooling down for {}s", name, cooldown.as_secs());
                    }
                } else if let Some(message) = other_error {
                    if let Some(cooldown) = health.record_failure(FailureKind::Other, message, now) {
                        warn!("Provider {} keeps failing, cooling down for {}s", name, cooldown.as_secs());
                    }
                }
            }

            carried.extend_from_slice(&remaining[cursor..]);
            carried.sort_unstable();
            if !carried.is_empty() {
                debug!("{} texts left after {}", carried.len(), name);
            }
            remaining = carried;
        }

        for &slot in &remaining {
            let item = &pending[slot];
            let error = item
                .last_error
                .clone()
                .unwrap_or_else(|| "no translation provider available".to_string());
            warn!("All providers failed for: {}", truncate_text(&item.text, 60));
            for &index in &item.units {
                units[index].fail(error.clone());
                report.failed.push(index);
            }
        }
        report.failed.sort_unstable();

        if let Err(e) = self.cache.put_many(new_entries, &pair.source, &pair.target).await {
            warn!("Failed to store translations in cache: {}", e);
        }

        report
    }

    /// First configured provider that is not cooling down
    pub fn active_provider(&self) -> Option<String> {
        let now = Instant::now();
        self.chain
            .iter()
            .find(|e| e.health.lock().status(e.backend.is_configured(), now) == HealthStatus::Available)
            .map(|e| e.backend.name().to_string())
    }

    /// Cache and provider statistics
    pub fn stats(&self) -> EngineStats {
        let now = Instant::now();
        EngineStats {
            cache: self.cache.stats(),
            providers: self
                .chain
                .iter()
                .map(|e| e.health.lock().snapshot(e.backend.is_configured(), now))
                .collect(),
            active_provider: self.active_provider(),
        }
    }
}
