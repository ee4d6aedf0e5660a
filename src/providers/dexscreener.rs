//! DexScreener source adapter
//!
//! Queries the token search endpoint and normalizes both sections of the
//! response: `pairs` (pair listings wrapping a token) and `tokens` (bare
//! token listings). Entries missing an address are skipped.

use super::{get_json, http_client, non_empty, numeric, JsonNumber};
use crate::constants::{DEXSCREENER_SEARCH_QUERY, DEXSCREENER_SEARCH_URL};
use crate::error::SourceError;
use crate::merge::merge_records;
use crate::source::TokenSource;
use crate::types::TokenRecord;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

const SOURCE_NAME: &str = "dexscreener";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    pairs: Option<Vec<PairEntry>>,
    #[serde(default)]
    tokens: Option<Vec<TokenEntry>>,
}

#[derive(Debug, Deserialize)]
struct PairEntry {
    token: Option<TokenEntry>,
    #[serde(rename = "volumeUsd")]
    volume_usd: Option<JsonNumber>,
    liquidity: Option<JsonNumber>,
    #[serde(rename = "dexId")]
    dex_id: Option<String>,
    exchange: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenEntry {
    address: Option<String>,
    name: Option<String>,
    symbol: Option<String>,
    #[serde(rename = "priceUsd")]
    price_usd: Option<JsonNumber>,
    #[serde(rename = "marketCapUsd")]
    market_cap_usd: Option<JsonNumber>,
    #[serde(rename = "priceChange")]
    price_change: Option<PriceChange>,
    #[serde(rename = "dexId")]
    dex_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PriceChange {
    hour: Option<f64>,
    day: Option<f64>,
}

/// DexScreener search adapter
pub struct DexScreenerSource {
    client: Client,
    query: String,
}

impl DexScreenerSource {
    /// Creates an adapter searching for the default token universe
    pub fn new() -> Result<Self, SourceError> {
        Self::with_query(DEXSCREENER_SEARCH_QUERY)
    }

    /// Creates an adapter with a custom search query
    pub fn with_query(query: &str) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client()?,
            query: query.to_string(),
        })
    }

    fn normalize(response: SearchResponse) -> Vec<TokenRecord> {
        let mut records = Vec::new();

        for pair in response.pairs.unwrap_or_default() {
            let Some(token) = pair.token else { continue };
            let Some(record) = normalize_token(&token) else {
                continue;
            };
            let mut record = record;
            record.volume_24h = numeric(&pair.volume_usd);
            record.liquidity = numeric(&pair.liquidity);
            record.protocol = non_empty(pair.dex_id)
                .or_else(|| non_empty(pair.exchange))
                .or_else(|| Some(SOURCE_NAME.to_string()));
            records.push(record);
        }

        for token in response.tokens.unwrap_or_default() {
            if let Some(record) = normalize_token(&token) {
                records.push(record);
            }
        }

        // within-source dedupe, required by the adapter contract
        merge_records(std::iter::once(records))
    }
}

fn normalize_token(token: &TokenEntry) -> Option<TokenRecord> {
    let address = token.address.clone().filter(|a| !a.is_empty())?;

    let mut record = TokenRecord::new(address).with_source(SOURCE_NAME);
    record.name = non_empty(token.name.clone()).or_else(|| non_empty(token.symbol.clone()));
    record.ticker = non_empty(token.symbol.clone());
    record.price = numeric(&token.price_usd);
    record.market_cap = numeric(&token.market_cap_usd);
    record.price_change_1h = token.price_change.as_ref().and_then(|c| c.hour);
    record.price_change_24h = token.price_change.as_ref().and_then(|c| c.day);
    record.protocol = non_empty(token.dex_id.clone()).or_else(|| Some(SOURCE_NAME.to_string()));
    Some(record)
}

#[async_trait]
impl TokenSource for DexScreenerSource {
    async fn fetch_tokens(&self) -> Result<Vec<TokenRecord>, SourceError> {
        let url = format!(
            "{}?q={}",
            DEXSCREENER_SEARCH_URL,
            urlencode(&self.query)
        );
        tracing::debug!(url = %url, "Fetching DexScreener listing");

        let response: SearchResponse = get_json(&self.client, &url).await?;
        let records = Self::normalize(response);
        tracing::debug!(count = records.len(), "Normalized DexScreener records");
        Ok(records)
    }

    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }
}

/// Percent-encodes the characters that matter in a query component
fn urlencode(raw: &str) -> String {
    raw.bytes()
        .flat_map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                vec![b as char]
            }
            _ => format!("%{:02X}", b).chars().collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_pairs_and_tokens_sections() {
        let body = serde_json::json!({
            "pairs": [
                {
                    "token": {
                        "address": "addr1",
                        "name": "Foo",
                        "symbol": "FOO",
                        "priceUsd": "0.042",
                        "priceChange": { "hour": 1.5, "day": -2.0 }
                    },
                    "volumeUsd": 12345.0,
                    "liquidity": 678.0,
                    "dexId": "raydium"
                },
                { "volumeUsd": 1.0 }
            ],
            "tokens": [
                { "address": "addr2", "symbol": "BAR", "priceUsd": 1.25 },
                { "name": "no address, skipped" }
            ]
        });
        let response: SearchResponse = serde_json::from_value(body).unwrap();
        let mut records = DexScreenerSource::normalize(response);
        records.sort_by(|a, b| a.address.cmp(&b.address));

        assert_eq!(records.len(), 2);
        let foo = &records[0];
        assert_eq!(foo.address, "addr1");
        assert_eq!(foo.name.as_deref(), Some("Foo"));
        assert_eq!(foo.price, Some(0.042));
        assert_eq!(foo.volume_24h, Some(12345.0));
        assert_eq!(foo.liquidity, Some(678.0));
        assert_eq!(foo.price_change_1h, Some(1.5));
        assert_eq!(foo.price_change_24h, Some(-2.0));
        assert_eq!(foo.protocol.as_deref(), Some("raydium"));
        assert!(foo.sources.contains(SOURCE_NAME));

        let bar = &records[1];
        assert_eq!(bar.address, "addr2");
        // name falls back to the symbol
        assert_eq!(bar.name.as_deref(), Some("BAR"));
        assert_eq!(bar.price, Some(1.25));
        assert_eq!(bar.market_cap, None);
    }

    #[test]
    fn duplicate_addresses_within_the_response_collapse() {
        let body = serde_json::json!({
            "pairs": [
                { "token": { "address": "dup", "symbol": "D", "priceUsd": "1.0" }, "volumeUsd": 10.0 },
                { "token": { "address": "dup", "symbol": "D", "priceUsd": "2.0" }, "volumeUsd": 20.0 }
            ]
        });
        let response: SearchResponse = serde_json::from_value(body).unwrap();
        let records = DexScreenerSource::normalize(response);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].price, Some(2.0));
        assert_eq!(records[0].volume_24h, Some(20.0));
    }

    #[test]
    fn query_is_percent_encoded() {
        assert_eq!(urlencode("meme coin"), "meme%20coin");
        assert_eq!(urlencode("sol"), "sol");
    }
}
