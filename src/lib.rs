//! # Token Market Aggregator
//!
//! Periodically pulls token price/volume data from multiple upstream
//! providers, merges the records by token address, caches the merged view
//! for a bounded TTL, and pushes a full snapshot (first cycle) or threshold
//! deltas (later cycles) to subscribers. A paginated read endpoint serves
//! the same merged view on demand.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use token_market_aggregator::{
//!     Aggregator, Config, DexScreenerSource, GeckoTerminalSource, TokenSource,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env();
//! let sources: Vec<Arc<dyn TokenSource>> = vec![
//!     Arc::new(DexScreenerSource::new()?),
//!     Arc::new(GeckoTerminalSource::new()?),
//! ];
//!
//! let aggregator = Arc::new(Aggregator::new(sources, &config));
//! Arc::clone(&aggregator).spawn_polling();
//!
//! // live events
//! let _events = aggregator.subscribe();
//!
//! // on-demand reads go through the same cache-or-fetch path
//! let view = aggregator.merged_view().await?;
//! println!("{} tokens in the merged view", view.len());
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod merge;
pub mod metrics;
pub mod pagination;
pub mod providers;
pub mod server;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use aggregator::Aggregator;
pub use cache::TtlCache;
pub use config::Config;
pub use error::{AggregatorError, SourceError};
pub use metrics::SourceMetrics;
pub use providers::{DexScreenerSource, GeckoTerminalSource};
pub use source::TokenSource;
pub use types::{MarketEvent, TokenDelta, TokenRecord, TokenUpdate};
