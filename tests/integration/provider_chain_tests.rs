/*!
 * Provider chain behavior through the translation engine
 */

use std::sync::Arc;

use msgtrans::app_config::HealthConfig;
use msgtrans::providers::mock::MockProvider;
use msgtrans::translation::{HealthStatus, TranslationEngine, TranslationUnit, TwoLevelCache};

use crate::common::{engine_with, pair};

fn units(texts: &[&str]) -> Vec<TranslationUnit> {
    texts.iter().map(|t| TranslationUnit::new(*t)).collect()
}

fn outputs(units: &[TranslationUnit]) -> Vec<String> {
    units.iter().map(TranslationUnit::output).collect()
}

#[tokio::test]
async fn test_chain_withHealthyFirstProvider_shouldNotCallSecond() {
    let first = MockProvider::prefix("A:").with_name("first");
    let second = MockProvider::prefix("B:").with_name("second");
    let engine = engine_with(vec![first.clone(), second.clone()]);
    let mut batch = units(&["One", "Two"]);

    let report = engine.translate_batch(&mut batch, &pair()).await;

    assert_eq!(outputs(&batch), vec!["A:One", "A:Two"]);
    assert_eq!(second.request_count(), 0);
    assert_eq!(report.by_provider.get("first"), Some(&2));
}

#[tokio::test]
async fn test_chain_withFailingFirstProvider_shouldFallBack() {
    let first = MockProvider::failing().with_name("first");
    let second = MockProvider::prefix("B:").with_name("second");
    let engine = engine_with(vec![first.clone(), second]);
    let mut batch = units(&["One", "Two", "Three"]);

    let report = engine.translate_batch(&mut batch, &pair()).await;

    assert_eq!(outputs(&batch), vec!["B:One", "B:Two", "B:Three"]);
    assert_eq!(first.request_count(), 3);
    assert!(report.failed.is_empty());
    assert_eq!(report.by_provider.get("second"), Some(&3));
}

#[tokio::test]
async fn test_chain_withIntermittentProvider_shouldOnlyForwardFailures() {
    let first = MockProvider::intermittent(2).with_name("first").with_native_batch(true);
    let second = MockProvider::prefix("B:").with_name("second");
    let engine = engine_with(vec![first, second.clone()]);
    let mut batch = units(&["One", "Two", "Three", "Four"]);

    let report = engine.translate_batch(&mut batch, &pair()).await;

    assert_eq!(
        outputs(&batch),
        vec!["[TRANSLATED] One", "B:Two", "[TRANSLATED] Three", "B:Four"]
    );
    assert_eq!(second.request_count(), 2);
    assert_eq!(report.translated, 4);
}

#[tokio::test]
async fn test_chain_whenAllProvidersFail_shouldKeepSourceWithoutError() {
    let engine = engine_with(vec![
        MockProvider::failing().with_name("first"),
        MockProvider::rate_limited().with_name("second"),
    ]);
    let mut batch = units(&["One", "", "Two {x}"]);

    let report = engine.translate_batch(&mut batch, &pair()).await;

    assert_eq!(report.failed, vec![0, 2]);
    assert_eq!(report.blank, 1);
    assert_eq!(outputs(&batch), vec!["One", "", "Two {x}"]);
    let error = batch[0].error.as_deref().unwrap();
    assert!(error.starts_with("second:"), "unexpected error: {}", error);
}

#[tokio::test]
async fn test_chain_withRateLimitedProvider_shouldSkipItWhileCoolingDown() {
    let limited = MockProvider::rate_limited().with_name("limited");
    let fallback = MockProvider::prefix("B:").with_name("fallback");
    let engine = engine_with(vec![limited.clone(), fallback]);

    let mut batch = units(&["One", "Two"]);
    engine.translate_batch(&mut batch, &pair()).await;
    let calls_after_first_batch = limited.request_count();

    let mut batch = units(&["Three"]);
    engine.translate_batch(&mut batch, &pair()).await;

    assert_eq!(outputs(&batch), vec!["B:Three"]);
    assert_eq!(limited.request_count(), calls_after_first_batch);

    let stats = engine.stats();
    assert_eq!(stats.providers[0].status, HealthStatus::CoolingDown);
    assert_eq!(stats.providers[0].consecutive_rate_limits, 1);
    assert_eq!(stats.active_provider.as_deref(), Some("fallback"));
}

#[tokio::test]
async fn test_chain_withRequestBudget_shouldPassRemainderOn() {
    let cache = Arc::new(TwoLevelCache::in_memory(100).unwrap());
    let budgeted = MockProvider::prefix("A:").with_name("budgeted");
    let fallback = MockProvider::prefix("B:").with_name("fallback");
    let engine = TranslationEngine::new(cache)
        .with_provider(budgeted.clone(), &HealthConfig::default(), Some(2))
        .with_provider(fallback.clone(), &HealthConfig::default(), None);
    let mut batch = units(&["1 one", "2 two", "3 three", "4 four", "5 five"]);

    engine.translate_batch(&mut batch, &pair()).await;

    assert_eq!(budgeted.request_count(), 2);
    assert_eq!(fallback.request_count(), 3);
    assert_eq!(
        outputs(&batch),
        vec!["A:1 one", "A:2 two", "B:3 three", "B:4 four", "B:5 five"]
    );
}

#[tokio::test]
async fn test_batch_withOutOfOrderCompletion_shouldPreserveOrder() {
    let provider = MockProvider::reversed_delay("R:", 2);
    let engine = engine_with(vec![provider]);
    let texts: Vec<String> = (0..16).map(|i| format!("Sentence {}", i)).collect();
    let mut batch: Vec<TranslationUnit> = texts.iter().map(TranslationUnit::new).collect();

    engine.translate_batch(&mut batch, &pair()).await;

    let expected: Vec<String> = texts.iter().map(|t| format!("R:{}", t)).collect();
    assert_eq!(outputs(&batch), expected);
}

#[tokio::test]
async fn test_batch_withEchoProvider_shouldKeepPlaceholdersIntact() {
    let engine = engine_with(vec![MockProvider::echo()]);
    let mut batch = units(&["Hello {name}", "{count} files in {folder}", "No placeholders"]);

    engine.translate_batch(&mut batch, &pair()).await;

    assert_eq!(batch[1].protected, "__PH0__ files in __PH1__");
    assert_eq!(
        outputs(&batch),
        vec!["Hello {name}", "{count} files in {folder}", "No placeholders"]
    );
}

#[tokio::test]
async fn test_batch_secondTime_shouldBeServedFromCache() {
    let provider = MockProvider::prefix("TR:");
    let engine = engine_with(vec![provider.clone()]);

    let mut first = units(&["Save", "Cancel"]);
    engine.translate_batch(&mut first, &pair()).await;
    let mut second = units(&["Save", "Cancel"]);
    let report = engine.translate_batch(&mut second, &pair()).await;

    assert_eq!(provider.request_count(), 2);
    assert_eq!(report.from_cache, 2);
    assert!(second.iter().all(|u| u.from_cache));
    assert_eq!(outputs(&second), vec!["TR:Save", "TR:Cancel"]);
}
