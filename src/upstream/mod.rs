//! Upstream market-data module
//!
//! Pull-based futures ticker source and its error taxonomy

mod binance;
mod types;

pub use binance::{BinanceConfig, BinanceFuturesClient, BINANCE_FUTURES_URL, TICKER_24H_PATH};
pub use types::{MarketSnapshot, SymbolSet, Ticker, UpstreamError, SNAPSHOT_KEY_PREFIX};

use async_trait::async_trait;

/// Trait for market-data sources
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Rate-limit bucket this source draws from (e.g. "futures-ticker")
    fn resource_class(&self) -> &str;

    /// Fetch tickers for a symbol set
    async fn fetch(&self, symbols: &SymbolSet) -> Result<MarketSnapshot, UpstreamError>;
}
