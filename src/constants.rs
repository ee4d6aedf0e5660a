//! Constants for the token market data aggregator
//!
//! Compile-time defaults live here; the handful of runtime-tunable settings
//! (poll interval, cache TTL, port) are read from the environment in
//! `config.rs` with these values as fallbacks.

/// Cache key under which the merged view is stored
pub const MERGED_VIEW_KEY: &str = "tokens:merged";

/// How often the polling loop refreshes the merged view (in milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 15_000;

/// How long a merged view stays valid in the cache (in milliseconds)
pub const DEFAULT_CACHE_TTL_MS: u64 = 30_000;

/// Port the HTTP/WebSocket server listens on
pub const DEFAULT_PORT: u16 = 3000;

/// HTTP request timeout when fetching from a provider (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 8;

/// Maximum number of attempts per provider request
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base backoff delay between provider retries (in milliseconds)
pub const RETRY_BASE_DELAY_MS: u64 = 300;

/// Upper bound on the random jitter added to each backoff delay (in milliseconds)
pub const RETRY_JITTER_MS: u64 = 100;

/// Price move (in percent of the prior price) that qualifies a token for a delta
pub const PRICE_DELTA_THRESHOLD_PCT: f64 = 0.5;

/// Volume move (as a fraction of the prior volume) that qualifies a token for a delta
pub const VOLUME_DELTA_THRESHOLD_FRAC: f64 = 0.05;

/// Default page size for the read endpoint
pub const DEFAULT_PAGE_LIMIT: usize = 20;

/// Hard cap on the page size for the read endpoint
pub const MAX_PAGE_LIMIT: usize = 100;

/// DexScreener search endpoint
pub const DEXSCREENER_SEARCH_URL: &str = "https://api.dexscreener.com/latest/dex/search";

/// Search query used to pull the tracked token universe from DexScreener
pub const DEXSCREENER_SEARCH_QUERY: &str = "meme";

/// GeckoTerminal token listing endpoint for the tracked network
pub const GECKOTERMINAL_TOKENS_URL: &str =
    "https://api.geckoterminal.com/api/v2/networks/solana/tokens";

/// User agent for HTTP requests
pub const USER_AGENT: &str = "token-market-aggregator/0.1.0";

/// Capacity of the subscriber broadcast channel; lagging receivers drop messages
pub const BROADCAST_CHANNEL_CAPACITY: usize = 64;
