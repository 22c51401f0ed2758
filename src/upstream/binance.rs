//! Binance USDⓈ-M futures 24h ticker client

use super::types::{MarketSnapshot, SymbolSet, Ticker, UpstreamError};
use super::MarketDataSource;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::time::Duration;

/// Binance futures REST base URL
pub const BINANCE_FUTURES_URL: &str = "https://fapi.binance.com";

/// 24h ticker endpoint
pub const TICKER_24H_PATH: &str = "/fapi/v1/ticker/24hr";

/// Configuration for the Binance futures client
#[derive(Debug, Clone)]
pub struct BinanceConfig {
    /// REST base URL
    pub base_url: String,
    /// Ticker endpoint path
    pub ticker_path: String,
    /// Request timeout
    pub timeout: Duration,
    /// Resource class reported to the rate-limit guard
    pub resource_class: String,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            base_url: BINANCE_FUTURES_URL.to_string(),
            ticker_path: TICKER_24H_PATH.to_string(),
            timeout: Duration::from_secs(10),
            resource_class: "futures-ticker".to_string(),
        }
    }
}

/// Pull-based client for the futures ticker array
pub struct BinanceFuturesClient {
    config: BinanceConfig,
    client: Client,
}

impl BinanceFuturesClient {
    /// Create a client with the default configuration
    pub fn new() -> Result<Self, UpstreamError> {
        Self::with_config(BinanceConfig::default())
    }

    /// Create a client with a custom configuration
    pub fn with_config(config: BinanceConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| UpstreamError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Full ticker URL
    fn ticker_url(&self) -> String {
        format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.ticker_path
        )
    }

    /// Decode the ticker array and keep only the requested symbols
    fn parse_tickers(body: &str, symbols: &SymbolSet) -> Result<Vec<Ticker>, UpstreamError> {
        let tickers: Vec<Ticker> =
            serde_json::from_str(body).map_err(|e| UpstreamError::Decode(e.to_string()))?;

        Ok(tickers
            .into_iter()
            .filter(|t| symbols.contains(&t.symbol))
            .collect())
    }
}

#[async_trait]
impl MarketDataSource for BinanceFuturesClient {
    fn resource_class(&self) -> &str {
        &self.config.resource_class
    }

    async fn fetch(&self, symbols: &SymbolSet) -> Result<MarketSnapshot, UpstreamError> {
        let url = self.ticker_url();

        tracing::debug!(url = %url, symbols = %symbols, "Fetching futures tickers");

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::from_status(status.as_u16(), body));
        }

        let body = response.text().await?;
        let tickers = Self::parse_tickers(&body, symbols)?;

        tracing::debug!(tickers = tickers.len(), "Fetched futures tickers");

        Ok(MarketSnapshot {
            tickers,
            fetched_at: Utc::now(),
        })
    }
}
