//! Error types for the token market data aggregator

use thiserror::Error;

/// Errors that can occur when fetching records from a single provider.
///
/// These never propagate past the merge fan-out: a failing source simply
/// contributes nothing to the cycle.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network request failed
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Provider returned a body that could not be parsed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Provider API error
    #[error("Provider API error: {0}")]
    Api(String),

    /// Timeout waiting for response
    #[error("Request timeout")]
    Timeout,
}

/// Errors surfaced by the aggregator to its immediate caller.
///
/// The read endpoint maps these to a 502 response; the poll loop logs them
/// and waits for the next tick. Nothing here is fatal to the process.
#[derive(Debug, Error, Clone)]
pub enum AggregatorError {
    /// Every configured source failed in the same cycle
    #[error("All sources failed: {0}")]
    AllSourcesFailed(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AggregatorError {
    /// Creates an AllSourcesFailed error
    pub fn all_sources_failed(msg: impl Into<String>) -> Self {
        Self::AllSourcesFailed(msg.into())
    }

    /// Creates an Internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
