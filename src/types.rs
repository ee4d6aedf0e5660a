//! Types for the token market data aggregator

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A merged market-data record for one token.
///
/// `address` is the stable identity; every other field is optional because
/// upstream providers report different subsets. Absent and zero are distinct:
/// a provider that does not report a field leaves it `None`, it is never
/// defaulted to `0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Stable token identifier, unique within a merged view
    #[serde(rename = "token_address")]
    pub address: String,

    /// Display name
    #[serde(rename = "token_name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Display ticker symbol
    #[serde(rename = "token_ticker", skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,

    /// Price in USD
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    /// Market capitalization in USD
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,

    /// 24h trade volume in USD
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_24h: Option<f64>,

    /// Pool liquidity in USD
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquidity: Option<f64>,

    /// 24h transaction count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_count: Option<u64>,

    /// 1h price change percentage
    #[serde(rename = "price_1hr_change", skip_serializing_if = "Option::is_none")]
    pub price_change_1h: Option<f64>,

    /// 24h price change percentage
    #[serde(rename = "price_24hr_change", skip_serializing_if = "Option::is_none")]
    pub price_change_24h: Option<f64>,

    /// 7d price change percentage
    #[serde(rename = "price_7d_change", skip_serializing_if = "Option::is_none")]
    pub price_change_7d: Option<f64>,

    /// Venue/exchange identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    /// Names of the providers that contributed to this record
    #[serde(default)]
    pub sources: BTreeSet<String>,
}

impl TokenRecord {
    /// Creates a record carrying only an address, everything else absent
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
            ticker: None,
            price: None,
            market_cap: None,
            volume_24h: None,
            liquidity: None,
            transaction_count: None,
            price_change_1h: None,
            price_change_24h: None,
            price_change_7d: None,
            protocol: None,
            sources: BTreeSet::new(),
        }
    }

    /// Stamps the contributing source name onto the record
    pub fn with_source(mut self, source: &str) -> Self {
        self.sources.insert(source.to_string());
        self
    }
}

/// Partial update for a token whose tracked fields moved past threshold.
///
/// Only the fields subscribers need to reprice a row; everything else is
/// available through the read endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenDelta {
    #[serde(rename = "token_address")]
    pub address: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_24h: Option<f64>,

    #[serde(rename = "price_24hr_change", skip_serializing_if = "Option::is_none")]
    pub price_change_24h: Option<f64>,
}

impl From<&TokenRecord> for TokenDelta {
    fn from(record: &TokenRecord) -> Self {
        Self {
            address: record.address.clone(),
            price: record.price,
            volume_24h: record.volume_24h,
            price_change_24h: record.price_change_24h,
        }
    }
}

/// One entry in an update batch: a token new to the view is sent in full,
/// a token that changed is sent as a partial delta. Untagged so a batch
/// serializes as a flat array of objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenUpdate {
    New(TokenRecord),
    Changed(TokenDelta),
}

/// Events broadcast to subscribers.
///
/// Delivery is best-effort, fire-and-forget: there is no acknowledgment and
/// no replay for receivers that fall behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum MarketEvent {
    /// Full merged view, emitted once on the first successful poll cycle
    Snapshot(Vec<TokenRecord>),
    /// Tokens that appeared or moved past threshold since the previous cycle
    Update(Vec<TokenUpdate>),
}

impl MarketEvent {
    /// Event name as it appears on the wire
    pub fn event_name(&self) -> &'static str {
        match self {
            MarketEvent::Snapshot(_) => "snapshot",
            MarketEvent::Update(_) => "update",
        }
    }
}
