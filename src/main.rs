use std::sync::Arc;
use token_market_aggregator::{
    server, Aggregator, Config, DexScreenerSource, GeckoTerminalSource, TokenSource,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(?config, "Starting token market aggregator");

    let mut sources: Vec<Arc<dyn TokenSource>> = Vec::new();
    match DexScreenerSource::new() {
        Ok(source) => sources.push(Arc::new(source)),
        Err(e) => tracing::error!(error = %e, "Failed to build DexScreener source"),
    }
    match GeckoTerminalSource::new() {
        Ok(source) => sources.push(Arc::new(source)),
        Err(e) => tracing::error!(error = %e, "Failed to build GeckoTerminal source"),
    }
    if sources.is_empty() {
        tracing::error!("No sources available, exiting");
        std::process::exit(1);
    }

    let aggregator = Arc::new(Aggregator::new(sources, &config));
    Arc::clone(&aggregator).spawn_polling();

    if let Err(e) = server::serve(aggregator, config.port).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
