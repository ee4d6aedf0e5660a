//! Cursor encoding and read-endpoint query shaping
//!
//! Cursors are opaque, reversible encodings of a start offset. Invalid query
//! input never fails a request: unparseable limits, cursors and filters all
//! degrade to their defaults.

use crate::constants::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::types::TokenRecord;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

/// Encodes a start offset into an opaque cursor
pub fn encode_cursor(offset: usize) -> String {
    BASE64.encode(offset.to_string())
}

/// Decodes a cursor back into a start offset.
///
/// Absent, undecodable or non-numeric cursors decode to 0.
pub fn decode_cursor(cursor: Option<&str>) -> usize {
    let Some(cursor) = cursor else { return 0 };
    BASE64
        .decode(cursor)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// Sortable fields of the read endpoint, always descending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Price,
    Volume,
    PriceChange24h,
    MarketCap,
}

impl SortKey {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "price" => Some(Self::Price),
            "volume" => Some(Self::Volume),
            "price_change_24h" => Some(Self::PriceChange24h),
            "market_cap" => Some(Self::MarketCap),
            _ => None,
        }
    }

    /// Sort value for a record; absent fields sort last
    fn value(&self, record: &TokenRecord) -> f64 {
        let field = match self {
            Self::Price => record.price,
            Self::Volume => record.volume_24h,
            Self::PriceChange24h => record.price_change_24h,
            Self::MarketCap => record.market_cap,
        };
        field.unwrap_or(f64::NEG_INFINITY)
    }
}

/// Raw query parameters of `GET /tokens`.
///
/// Fields are kept as strings so that malformed values degrade to defaults
/// instead of rejecting the request during extraction.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TokensQuery {
    pub limit: Option<String>,
    pub cursor: Option<String>,
    pub sort: Option<String>,
    #[serde(rename = "minVolume")]
    pub min_volume: Option<String>,
}

impl TokensQuery {
    /// Page size: default 20, capped at 100
    pub fn limit(&self) -> usize {
        self.limit
            .as_deref()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .min(MAX_PAGE_LIMIT)
    }

    /// Start offset decoded from the cursor
    pub fn offset(&self) -> usize {
        decode_cursor(self.cursor.as_deref())
    }

    /// Requested sort key; unknown values mean provider order
    pub fn sort_key(&self) -> Option<SortKey> {
        self.sort.as_deref().and_then(SortKey::parse)
    }

    /// Inclusive lower bound on `volume_24h`; 0 disables the filter
    pub fn min_volume(&self) -> f64 {
        self.min_volume
            .as_deref()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0.0)
    }
}

/// One page of the filtered/sorted merged view
#[derive(Debug, Clone, Serialize)]
pub struct TokensPage {
    pub data: Vec<TokenRecord>,
    /// Cursor for the next page; null when this page reaches the end
    #[serde(rename = "nextCursor")]
    pub next_cursor: Option<String>,
}

/// Applies filter, sort and pagination to a merged view
pub fn paginate(mut records: Vec<TokenRecord>, query: &TokensQuery) -> TokensPage {
    let min_volume = query.min_volume();
    if min_volume > 0.0 {
        records.retain(|r| r.volume_24h.unwrap_or(0.0) >= min_volume);
    }

    if let Some(key) = query.sort_key() {
        records.sort_by(|a, b| key.value(b).total_cmp(&key.value(a)));
    }

    let offset = query.offset().min(records.len());
    let end = offset.saturating_add(query.limit()).min(records.len());
    let next_cursor = if end < records.len() {
        Some(encode_cursor(end))
    } else {
        None
    };

    TokensPage {
        data: records[offset..end].to_vec(),
        next_cursor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(address: &str, price: f64, volume: f64) -> TokenRecord {
        let mut r = TokenRecord::new(address);
        r.price = Some(price);
        r.volume_24h = Some(volume);
        r
    }

    #[test]
    fn cursor_round_trips() {
        assert_eq!(decode_cursor(Some(&encode_cursor(0))), 0);
        assert_eq!(decode_cursor(Some(&encode_cursor(42))), 42);
    }

    #[test]
    fn bad_cursor_decodes_to_zero() {
        assert_eq!(decode_cursor(None), 0);
        assert_eq!(decode_cursor(Some("not-base64!!")), 0);
        // valid base64, not a number
        assert_eq!(decode_cursor(Some(&BASE64.encode("abc"))), 0);
    }

    #[test]
    fn short_view_fits_one_page_with_null_cursor() {
        let records: Vec<_> = (0..5).map(|i| record(&format!("a{}", i), 1.0, 10.0)).collect();
        let page = paginate(records, &TokensQuery::default());
        assert_eq!(page.data.len(), 5);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn pages_chain_through_next_cursor() {
        let records: Vec<_> = (0..45).map(|i| record(&format!("a{}", i), 1.0, 10.0)).collect();
        let first = paginate(records.clone(), &TokensQuery::default());
        assert_eq!(first.data.len(), 20);
        let cursor = first.next_cursor.expect("more pages expected");

        let query = TokensQuery {
            cursor: Some(cursor),
            ..Default::default()
        };
        let second = paginate(records.clone(), &query);
        assert_eq!(second.data.len(), 20);
        assert_eq!(second.data[0].address, records[20].address);

        let query = TokensQuery {
            cursor: second.next_cursor,
            ..Default::default()
        };
        let last = paginate(records, &query);
        assert_eq!(last.data.len(), 5);
        assert!(last.next_cursor.is_none());
    }

    #[test]
    fn limit_is_capped_and_bad_limit_falls_back() {
        let query = TokensQuery {
            limit: Some("500".to_string()),
            ..Default::default()
        };
        assert_eq!(query.limit(), 100);

        let query = TokensQuery {
            limit: Some("bananas".to_string()),
            ..Default::default()
        };
        assert_eq!(query.limit(), 20);
    }

    #[test]
    fn min_volume_filter_is_inclusive_and_skips_unreported() {
        let mut unreported = TokenRecord::new("no-vol");
        unreported.price = Some(1.0);
        let records = vec![
            record("low", 1.0, 500.0),
            record("edge", 1.0, 1000.0),
            record("high", 1.0, 2000.0),
            unreported,
        ];
        let query = TokensQuery {
            min_volume: Some("1000".to_string()),
            ..Default::default()
        };
        let page = paginate(records, &query);
        let addresses: Vec<_> = page.data.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(addresses, vec!["edge", "high"]);
    }

    #[test]
    fn sort_is_descending_with_absent_fields_last() {
        let mut no_price = TokenRecord::new("none");
        no_price.volume_24h = Some(1.0);
        let records = vec![
            record("mid", 5.0, 1.0),
            no_price,
            record("top", 9.0, 1.0),
            record("bottom", 1.0, 1.0),
        ];
        let query = TokensQuery {
            sort: Some("price".to_string()),
            ..Default::default()
        };
        let page = paginate(records, &query);
        let addresses: Vec<_> = page.data.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(addresses, vec!["top", "mid", "bottom", "none"]);
    }

    #[test]
    fn unknown_sort_preserves_provider_order() {
        let records = vec![record("b", 1.0, 1.0), record("a", 9.0, 1.0)];
        let query = TokensQuery {
            sort: Some("sideways".to_string()),
            ..Default::default()
        };
        let page = paginate(records, &query);
        assert_eq!(page.data[0].address, "b");
    }
}
