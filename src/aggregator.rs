//! The aggregator: cache-or-fetch, snapshot/delta tracking and the poll loop
//!
//! One `Aggregator` instance exclusively owns the merged-view cache entry and
//! the last-broadcast snapshot. Both sit behind their own async mutex so that
//! overlapping poll cycles and on-demand reads serialize instead of
//! interleaving partial writes; redundant fetches are tolerated, torn state
//! is not. The poll cycle is the sole writer of the snapshot.

use crate::{
    cache::TtlCache,
    config::Config,
    constants::{
        BROADCAST_CHANNEL_CAPACITY, MERGED_VIEW_KEY, PRICE_DELTA_THRESHOLD_PCT,
        VOLUME_DELTA_THRESHOLD_FRAC,
    },
    error::AggregatorError,
    merge::merge_records,
    metrics::{MetricsCollector, SourceMetrics},
    source::TokenSource,
    types::{MarketEvent, TokenDelta, TokenRecord, TokenUpdate},
};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex};
use tokio::time::sleep;

/// Multi-source market data aggregator
pub struct Aggregator {
    sources: Vec<Arc<dyn TokenSource>>,
    metrics: Vec<Arc<MetricsCollector>>,
    cache: Mutex<TtlCache<Vec<TokenRecord>>>,
    snapshot: Mutex<HashMap<String, TokenRecord>>,
    events: broadcast::Sender<MarketEvent>,
    poll_interval: Duration,
}

impl Aggregator {
    /// Creates an aggregator over the given sources
    pub fn new(sources: Vec<Arc<dyn TokenSource>>, config: &Config) -> Self {
        let metrics = sources
            .iter()
            .map(|s| Arc::new(MetricsCollector::new(s.source_name())))
            .collect();
        let (events, _) = broadcast::channel(BROADCAST_CHANNEL_CAPACITY);

        Self {
            sources,
            metrics,
            cache: Mutex::new(TtlCache::new(config.cache_ttl)),
            snapshot: Mutex::new(HashMap::new()),
            events,
            poll_interval: config.poll_interval,
        }
    }

    /// Subscribes to snapshot/update events.
    ///
    /// Delivery is best-effort: receivers that fall behind the channel
    /// capacity lose the oldest events.
    pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
        self.events.subscribe()
    }

    /// Returns the merged view, fetching from the sources only on cache miss.
    ///
    /// Serves both the read endpoint and the poll cycle, so a cycle that
    /// lands while the cache is warm reuses the cached merge. The effective
    /// refresh cadence is therefore `max(poll interval, cache TTL)`.
    pub async fn merged_view(&self) -> Result<Vec<TokenRecord>, AggregatorError> {
        let mut cache = self.cache.lock().await;
        if let Some(view) = cache.get(MERGED_VIEW_KEY) {
            return Ok(view);
        }

        let view = self.fetch_all().await?;
        cache.insert(MERGED_VIEW_KEY, view.clone());
        Ok(view)
    }

    /// Fans out to every source concurrently and merges whatever succeeded.
    ///
    /// A failing source is logged and contributes nothing to the cycle;
    /// the fetch as a whole fails only when every source failed.
    async fn fetch_all(&self) -> Result<Vec<TokenRecord>, AggregatorError> {
        let fetches = self
            .sources
            .iter()
            .zip(&self.metrics)
            .map(|(source, metrics)| async move {
                let start = Instant::now();
                let result = source.fetch_tokens().await;
                metrics.record_fetch(start.elapsed(), result.is_ok()).await;
                (source.source_name(), result)
            });

        let mut batches = Vec::with_capacity(self.sources.len());
        let mut failures = Vec::new();
        for (name, result) in join_all(fetches).await {
            match result {
                Ok(records) => {
                    tracing::debug!(source = name, count = records.len(), "Source fetch ok");
                    batches.push(records);
                }
                Err(e) => {
                    tracing::warn!(source = name, error = %e, "Source fetch failed");
                    failures.push(format!("{}: {}", name, e));
                }
            }
        }

        if batches.is_empty() && !self.sources.is_empty() {
            return Err(AggregatorError::all_sources_failed(failures.join("; ")));
        }

        Ok(merge_records(batches))
    }

    /// Runs one poll cycle: refresh the view, diff it against the previous
    /// snapshot, broadcast, and replace the snapshot wholesale.
    pub async fn run_cycle(&self) -> Result<(), AggregatorError> {
        let view = self.merged_view().await?;

        let mut snapshot = self.snapshot.lock().await;

        if snapshot.is_empty() {
            self.publish(MarketEvent::Snapshot(view.clone()));
        } else {
            let updates = compute_updates(&snapshot, &view);
            if !updates.is_empty() {
                self.publish(MarketEvent::Update(updates));
            }
        }

        // Replace even when nothing was emitted: unchanged records become
        // the next baseline, so thresholds never drift across cycles.
        *snapshot = view
            .into_iter()
            .map(|record| (record.address.clone(), record))
            .collect();

        Ok(())
    }

    /// Runs a cycle immediately, then keeps polling on the configured
    /// interval. Cycle errors are logged and never stop the loop.
    pub fn spawn_polling(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let aggregator = self;
        tokio::spawn(async move {
            tracing::info!(
                interval_ms = aggregator.poll_interval.as_millis() as u64,
                sources = aggregator.sources.len(),
                "Starting poll loop"
            );
            loop {
                if let Err(e) = aggregator.run_cycle().await {
                    tracing::warn!(error = %e, "Poll cycle failed");
                }
                sleep(aggregator.poll_interval).await;
            }
        })
    }

    /// Current metrics for every configured source
    pub async fn source_metrics(&self) -> Vec<SourceMetrics> {
        let mut result = Vec::with_capacity(self.metrics.len());
        for collector in &self.metrics {
            result.push(collector.snapshot().await);
        }
        result
    }

    /// Names of the configured sources
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.source_name()).collect()
    }

    fn publish(&self, event: MarketEvent) {
        // fire-and-forget: no receivers is not an error
        match &event {
            MarketEvent::Snapshot(records) => {
                tracing::info!(count = records.len(), "Broadcasting snapshot")
            }
            MarketEvent::Update(updates) => {
                tracing::debug!(count = updates.len(), "Broadcasting update")
            }
        }
        let _ = self.events.send(event);
    }
}

/// Decides which records changed enough to justify a broadcast.
///
/// New addresses are included in full; known addresses are included as a
/// partial delta iff the price moved more than the threshold percentage or
/// the volume moved more than the threshold fraction of its prior value.
/// Tokens that disappeared from the view are not reported.
fn compute_updates(prev: &HashMap<String, TokenRecord>, next: &[TokenRecord]) -> Vec<TokenUpdate> {
    let mut updates = Vec::new();

    for record in next {
        let Some(old) = prev.get(&record.address) else {
            updates.push(TokenUpdate::New(record.clone()));
            continue;
        };

        let old_price = old.price.unwrap_or(0.0);
        let new_price = record.price.unwrap_or(0.0);
        let price_pct = if old_price != 0.0 {
            (new_price - old_price) / old_price * 100.0
        } else {
            0.0
        };

        let old_volume = old.volume_24h.unwrap_or(0.0);
        let volume_diff = (record.volume_24h.unwrap_or(0.0) - old_volume).abs();

        if price_pct.abs() > PRICE_DELTA_THRESHOLD_PCT
            || (old_volume != 0.0 && volume_diff > old_volume * VOLUME_DELTA_THRESHOLD_FRAC)
        {
            updates.push(TokenUpdate::Changed(TokenDelta::from(record)));
        }
    }

    updates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::source::mock::MockSource;
    use tokio::sync::broadcast::error::TryRecvError;

    fn record(address: &str, price: f64, volume: f64) -> TokenRecord {
        let mut r = TokenRecord::new(address).with_source("mock");
        r.price = Some(price);
        r.volume_24h = Some(volume);
        r
    }

    /// Cache TTL of zero so every cycle refetches
    fn uncached_config() -> Config {
        Config {
            cache_ttl: Duration::ZERO,
            ..Config::default()
        }
    }

    fn aggregator_with(sources: Vec<Arc<dyn TokenSource>>, config: Config) -> Aggregator {
        Aggregator::new(sources, &config)
    }

    #[tokio::test]
    async fn one_failing_source_does_not_poison_the_view() {
        let good = Arc::new(MockSource::new("good"));
        good.push_records(vec![record("X", 1.0, 100.0)]);
        let bad = Arc::new(MockSource::new("bad"));
        bad.push_error(SourceError::Timeout);

        let aggregator = aggregator_with(vec![good as Arc<dyn TokenSource>, bad], uncached_config());
        let view = aggregator.merged_view().await.unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].address, "X");
    }

    #[tokio::test]
    async fn all_sources_failing_surfaces_an_error() {
        let a = Arc::new(MockSource::new("a"));
        a.push_error(SourceError::Timeout);
        let b = Arc::new(MockSource::new("b"));
        b.push_error(SourceError::RateLimited);

        let aggregator = aggregator_with(vec![a as Arc<dyn TokenSource>, b], uncached_config());
        let err = aggregator.merged_view().await.unwrap_err();
        assert!(matches!(err, AggregatorError::AllSourcesFailed(_)));
    }

    #[tokio::test]
    async fn warm_cache_skips_source_calls() {
        let source = Arc::new(MockSource::new("counted"));
        source.push_records(vec![record("X", 1.0, 100.0)]);

        let config = Config {
            cache_ttl: Duration::from_secs(60),
            ..Config::default()
        };
        let aggregator = aggregator_with(vec![source.clone() as Arc<dyn TokenSource>], config);

        aggregator.merged_view().await.unwrap();
        aggregator.merged_view().await.unwrap();
        aggregator.run_cycle().await.unwrap();
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn first_cycle_always_broadcasts_a_snapshot() {
        let source = Arc::new(MockSource::new("mock"));
        source.push_records(vec![record("X", 1.0, 1000.0), record("Y", 2.0, 500.0)]);

        let aggregator = aggregator_with(vec![source as Arc<dyn TokenSource>], uncached_config());
        let mut rx = aggregator.subscribe();
        aggregator.run_cycle().await.unwrap();

        match rx.try_recv().unwrap() {
            MarketEvent::Snapshot(records) => assert_eq!(records.len(), 2),
            other => panic!("expected snapshot, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn sub_threshold_moves_emit_nothing() {
        let source = Arc::new(MockSource::new("mock"));
        source.push_records(vec![record("X", 1.0, 1000.0)]);
        // 0.3% price move, 2% volume move
        source.push_records(vec![record("X", 1.003, 1020.0)]);

        let aggregator = aggregator_with(vec![source as Arc<dyn TokenSource>], uncached_config());
        let mut rx = aggregator.subscribe();
        aggregator.run_cycle().await.unwrap();
        rx.try_recv().unwrap(); // snapshot
        aggregator.run_cycle().await.unwrap();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn above_threshold_price_move_emits_a_partial_delta() {
        let source = Arc::new(MockSource::new("mock"));
        source.push_records(vec![record("X", 1.0, 1000.0)]);
        // 0.6% price move
        let mut moved = record("X", 1.006, 1000.0);
        moved.price_change_24h = Some(0.6);
        moved.name = Some("Foo".to_string());
        source.push_records(vec![moved]);

        let aggregator = aggregator_with(vec![source as Arc<dyn TokenSource>], uncached_config());
        let mut rx = aggregator.subscribe();
        aggregator.run_cycle().await.unwrap();
        rx.try_recv().unwrap(); // snapshot
        aggregator.run_cycle().await.unwrap();

        let updates = match rx.try_recv().unwrap() {
            MarketEvent::Update(updates) => updates,
            other => panic!("expected update, got {:?}", other),
        };
        assert_eq!(updates.len(), 1);
        let TokenUpdate::Changed(delta) = &updates[0] else {
            panic!("expected a partial delta");
        };
        assert_eq!(delta.address, "X");
        assert_eq!(delta.price, Some(1.006));

        // the delta carries exactly the repricing fields, nothing else
        let json = serde_json::to_value(delta).unwrap();
        let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["price", "price_24hr_change", "token_address", "volume_24h"]
        );
    }

    #[tokio::test]
    async fn volume_spike_alone_emits_a_delta() {
        let source = Arc::new(MockSource::new("mock"));
        source.push_records(vec![record("X", 1.0, 1000.0)]);
        // 10% volume move, flat price
        source.push_records(vec![record("X", 1.0, 1100.0)]);

        let aggregator = aggregator_with(vec![source as Arc<dyn TokenSource>], uncached_config());
        let mut rx = aggregator.subscribe();
        aggregator.run_cycle().await.unwrap();
        rx.try_recv().unwrap();
        aggregator.run_cycle().await.unwrap();
        assert!(matches!(rx.try_recv(), Ok(MarketEvent::Update(_))));
    }

    #[tokio::test]
    async fn new_token_is_sent_in_full() {
        let source = Arc::new(MockSource::new("mock"));
        source.push_records(vec![record("X", 1.0, 1000.0)]);
        source.push_records(vec![record("X", 1.0, 1000.0), record("Z", 5.0, 10.0)]);

        let aggregator = aggregator_with(vec![source as Arc<dyn TokenSource>], uncached_config());
        let mut rx = aggregator.subscribe();
        aggregator.run_cycle().await.unwrap();
        rx.try_recv().unwrap();
        aggregator.run_cycle().await.unwrap();

        let updates = match rx.try_recv().unwrap() {
            MarketEvent::Update(updates) => updates,
            other => panic!("expected update, got {:?}", other),
        };
        assert_eq!(updates.len(), 1);
        match &updates[0] {
            TokenUpdate::New(full) => {
                assert_eq!(full.address, "Z");
                assert_eq!(full.price, Some(5.0));
                assert!(full.sources.contains("mock"));
            }
            other => panic!("expected full record, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn baseline_is_replaced_even_without_a_delta() {
        let source = Arc::new(MockSource::new("mock"));
        source.push_records(vec![record("X", 1.0, 1000.0)]);
        // +0.4%: below threshold, but becomes the new baseline
        source.push_records(vec![record("X", 1.004, 1000.0)]);
        // +0.4% relative to 1.004; would be +0.8% against a stale baseline
        source.push_records(vec![record("X", 1.008, 1000.0)]);

        let aggregator = aggregator_with(vec![source as Arc<dyn TokenSource>], uncached_config());
        let mut rx = aggregator.subscribe();
        aggregator.run_cycle().await.unwrap();
        rx.try_recv().unwrap();
        aggregator.run_cycle().await.unwrap();
        aggregator.run_cycle().await.unwrap();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn zero_prior_price_never_divides() {
        let mut stale = record("X", 0.0, 1000.0);
        stale.price = Some(0.0);
        let prev: HashMap<_, _> = vec![("X".to_string(), stale)].into_iter().collect();
        let next = vec![record("X", 5.0, 1000.0)];

        // price_pct is forced to 0, volume is flat, so no update
        assert!(compute_updates(&prev, &next).is_empty());
    }

    #[tokio::test]
    async fn disappeared_tokens_are_not_reported() {
        let source = Arc::new(MockSource::new("mock"));
        source.push_records(vec![record("X", 1.0, 1000.0), record("Y", 2.0, 500.0)]);
        source.push_records(vec![record("X", 1.0, 1000.0)]);

        let aggregator = aggregator_with(vec![source as Arc<dyn TokenSource>], uncached_config());
        let mut rx = aggregator.subscribe();
        aggregator.run_cycle().await.unwrap();
        rx.try_recv().unwrap();
        aggregator.run_cycle().await.unwrap();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }
}
