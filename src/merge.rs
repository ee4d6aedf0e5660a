//! Multi-source merge of token records
//!
//! Folds the concatenated output of all sources into one map keyed by token
//! address. Identity fields (name, ticker, protocol) are first-writer-wins:
//! they are stable across providers and should not flap with source ordering.
//! Metric fields are last-writer-wins: providers update independently and a
//! stale price is worse than an inconsistent one.

use crate::types::TokenRecord;
use std::collections::HashMap;

/// Merges record batches from any number of sources into a deduplicated view.
///
/// Records without a non-empty address are discarded. Output order is
/// unspecified; callers that need an ordering sort afterwards.
pub fn merge_records<I>(batches: I) -> Vec<TokenRecord>
where
    I: IntoIterator<Item = Vec<TokenRecord>>,
{
    let mut merged: HashMap<String, TokenRecord> = HashMap::new();

    for batch in batches {
        for record in batch {
            if record.address.is_empty() {
                continue;
            }
            match merged.get_mut(&record.address) {
                None => {
                    merged.insert(record.address.clone(), record);
                }
                Some(existing) => merge_into(existing, record),
            }
        }
    }

    merged.into_values().collect()
}

/// Folds `incoming` into `existing` under the field precedence rules
fn merge_into(existing: &mut TokenRecord, incoming: TokenRecord) {
    // identity fields: keep the first non-empty value seen
    existing.name = take_first(existing.name.take(), incoming.name);
    existing.ticker = take_first(existing.ticker.take(), incoming.ticker);
    existing.protocol = take_first(existing.protocol.take(), incoming.protocol);

    // metric fields: the later-processed source wins when it reports a value
    existing.price = incoming.price.or(existing.price);
    existing.market_cap = incoming.market_cap.or(existing.market_cap);
    existing.volume_24h = incoming.volume_24h.or(existing.volume_24h);
    existing.liquidity = incoming.liquidity.or(existing.liquidity);
    existing.transaction_count = incoming.transaction_count.or(existing.transaction_count);
    existing.price_change_1h = incoming.price_change_1h.or(existing.price_change_1h);
    existing.price_change_24h = incoming.price_change_24h.or(existing.price_change_24h);
    existing.price_change_7d = incoming.price_change_7d.or(existing.price_change_7d);

    existing.sources.extend(incoming.sources);
}

fn take_first(existing: Option<String>, incoming: Option<String>) -> Option<String> {
    match existing {
        Some(s) if !s.is_empty() => Some(s),
        _ => incoming.filter(|s| !s.is_empty()),
    }
}
