//! GeckoTerminal source adapter
//!
//! Pulls the network token listing. The listing format varies between
//! deployments, so entries are decoded individually and malformed ones are
//! skipped rather than failing the whole fetch.

use super::{get_json, http_client, non_empty, numeric, JsonNumber};
use crate::constants::GECKOTERMINAL_TOKENS_URL;
use crate::error::SourceError;
use crate::merge::merge_records;
use crate::source::TokenSource;
use crate::types::TokenRecord;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

const SOURCE_NAME: &str = "geckoterminal";

#[derive(Debug, Deserialize)]
struct GeckoEntry {
    token_address: Option<String>,
    address: Option<String>,
    id: Option<String>,
    token: Option<GeckoTokenInfo>,
    name: Option<String>,
    symbol: Option<String>,
    price: Option<JsonNumber>,
    volume_24h: Option<JsonNumber>,
    market_cap: Option<JsonNumber>,
    price_change_24h: Option<JsonNumber>,
    price_change_7d: Option<JsonNumber>,
    protocol: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeckoTokenInfo {
    name: Option<String>,
    symbol: Option<String>,
}

/// GeckoTerminal network listing adapter
pub struct GeckoTerminalSource {
    client: Client,
}

impl GeckoTerminalSource {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client()?,
        })
    }

    fn normalize(body: serde_json::Value) -> Vec<TokenRecord> {
        // a non-array body means an empty contribution, not a failure
        let Some(entries) = body.as_array() else {
            return Vec::new();
        };

        let records = entries
            .iter()
            .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
            .filter_map(normalize_entry)
            .collect();

        merge_records(std::iter::once(records))
    }
}

fn normalize_entry(entry: GeckoEntry) -> Option<TokenRecord> {
    let address = entry
        .token_address
        .or(entry.address)
        .or(entry.id)
        .filter(|a| !a.is_empty())?;

    let nested = entry.token.as_ref();
    let mut record = TokenRecord::new(address).with_source(SOURCE_NAME);
    record.name = nested
        .and_then(|t| non_empty(t.name.clone()))
        .or_else(|| non_empty(entry.name))
        .or_else(|| non_empty(entry.symbol.clone()));
    record.ticker = nested
        .and_then(|t| non_empty(t.symbol.clone()))
        .or_else(|| non_empty(entry.symbol));
    record.price = numeric(&entry.price);
    record.volume_24h = numeric(&entry.volume_24h);
    record.market_cap = numeric(&entry.market_cap);
    record.price_change_24h = numeric(&entry.price_change_24h);
    record.price_change_7d = numeric(&entry.price_change_7d);
    record.protocol = non_empty(entry.protocol).or_else(|| Some(SOURCE_NAME.to_string()));
    Some(record)
}

#[async_trait]
impl TokenSource for GeckoTerminalSource {
    async fn fetch_tokens(&self) -> Result<Vec<TokenRecord>, SourceError> {
        tracing::debug!(url = GECKOTERMINAL_TOKENS_URL, "Fetching GeckoTerminal listing");

        let body: serde_json::Value = get_json(&self.client, GECKOTERMINAL_TOKENS_URL).await?;
        let records = Self::normalize(body);
        tracing::debug!(count = records.len(), "Normalized GeckoTerminal records");
        Ok(records)
    }

    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }
}
