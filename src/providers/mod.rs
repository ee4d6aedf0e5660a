//! Source adapter implementations
//!
//! Each adapter normalizes one provider's native response shape into
//! [`TokenRecord`](crate::types::TokenRecord)s. The shared HTTP helper here
//! applies the per-request timeout and the retry-with-backoff policy every
//! adapter is contractually required to carry, so a hung or flaky upstream
//! never stalls a poll cycle beyond its bounded retries.

pub mod dexscreener;
pub mod geckoterminal;

pub use dexscreener::DexScreenerSource;
pub use geckoterminal::GeckoTerminalSource;

use crate::constants::{
    MAX_RETRY_ATTEMPTS, REQUEST_TIMEOUT_SECS, RETRY_BASE_DELAY_MS, RETRY_JITTER_MS, USER_AGENT,
};
use crate::error::SourceError;
use rand::Rng;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;

/// Builds the HTTP client used by an adapter, with the standard timeout
pub(crate) fn http_client() -> Result<Client, SourceError> {
    Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .map_err(SourceError::Network)
}

/// GETs `url` and deserializes the JSON body, retrying with exponential
/// backoff plus jitter. Fails only after every attempt is exhausted.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
) -> Result<T, SourceError> {
    let mut last_error = None;

    for attempt in 1..=MAX_RETRY_ATTEMPTS {
        match try_get_json(client, url).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::warn!(
                    url,
                    attempt,
                    max_attempts = MAX_RETRY_ATTEMPTS,
                    error = %e,
                    "Provider request failed"
                );
                last_error = Some(e);
                if attempt < MAX_RETRY_ATTEMPTS {
                    let jitter = rand::thread_rng().gen_range(0..RETRY_JITTER_MS);
                    let delay = RETRY_BASE_DELAY_MS * 2u64.pow(attempt - 1) + jitter;
                    sleep(Duration::from_millis(delay)).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or(SourceError::Timeout))
}

async fn try_get_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T, SourceError> {
    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            SourceError::Timeout
        } else {
            SourceError::Network(e)
        }
    })?;

    if response.status().as_u16() == 429 {
        return Err(SourceError::RateLimited);
    }
    if !response.status().is_success() {
        return Err(SourceError::Api(format!(
            "HTTP {}: {}",
            response.status(),
            response.text().await.unwrap_or_default()
        )));
    }

    let body = response.text().await.map_err(SourceError::Network)?;
    serde_json::from_str(&body)
        .map_err(|e| SourceError::InvalidResponse(format!("Failed to parse response: {}", e)))
}

/// A JSON field that providers report either as a number or as a numeric
/// string (DexScreener's `priceUsd` is a string, for example)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum JsonNumber {
    Number(f64),
    Text(String),
}

impl JsonNumber {
    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self {
            JsonNumber::Number(n) => Some(*n),
            JsonNumber::Text(s) => s.parse().ok(),
        }
    }
}

/// Converts an optional number-or-string field into an optional f64
pub(crate) fn numeric(field: &Option<JsonNumber>) -> Option<f64> {
    field.as_ref().and_then(JsonNumber::as_f64)
}

/// Maps empty strings to absent, per the record shape's field semantics
pub(crate) fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_number_accepts_both_shapes() {
        let n: JsonNumber = serde_json::from_str("1.5").unwrap();
        assert_eq!(n.as_f64(), Some(1.5));
        let s: JsonNumber = serde_json::from_str("\"2.75\"").unwrap();
        assert_eq!(s.as_f64(), Some(2.75));
        let garbage: JsonNumber = serde_json::from_str("\"n/a\"").unwrap();
        assert_eq!(garbage.as_f64(), None);
    }

    #[test]
    fn empty_strings_become_absent() {
        assert_eq!(non_empty(Some(String::new())), None);
        assert_eq!(non_empty(Some("x".to_string())).as_deref(), Some("x"));
        assert_eq!(non_empty(None), None);
    }
}
