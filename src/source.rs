//! Source abstraction for fetching token records from upstream providers

use crate::{error::SourceError, types::TokenRecord};
use async_trait::async_trait;

/// Trait for upstream market-data sources
///
/// Implementations fetch token listings from one provider (DexScreener,
/// GeckoTerminal, ...) and normalize them into the common record shape.
/// Each implementation is responsible for its own request timeout and
/// retry-with-backoff policy, for deduplicating by address within its own
/// result set, and for skipping malformed individual entries rather than
/// failing the whole fetch.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Fetches the current token listing from this provider
    ///
    /// # Returns
    /// Normalized records, each stamped with this source's name, or an error
    /// when the upstream is unreachable or unparseable after retries.
    async fn fetch_tokens(&self) -> Result<Vec<TokenRecord>, SourceError>;

    /// Returns the name of this source
    fn source_name(&self) -> &'static str;
}
