//! Upstream market-data types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Cache key prefix for market snapshots
pub const SNAPSHOT_KEY_PREFIX: &str = "market_";

/// 24h ticker for one futures symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    /// Trading symbol (e.g., "BTCUSDT")
    pub symbol: String,
    /// Last traded price
    pub last_price: Decimal,
    /// 24h base volume
    pub volume: Decimal,
    /// 24h price change in percent
    pub price_change_percent: Decimal,
}

/// Tickers for a symbol set as returned by one upstream call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Tickers in upstream order
    pub tickers: Vec<Ticker>,
    /// Time the upstream call completed
    pub fetched_at: DateTime<Utc>,
}

impl MarketSnapshot {
    /// Find the ticker for a symbol
    pub fn ticker(&self, symbol: &str) -> Option<&Ticker> {
        self.tickers.iter().find(|t| t.symbol == symbol)
    }

    /// Number of tickers
    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    /// Whether the snapshot holds no tickers
    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}

/// Normalised, order-independent set of symbols.
///
/// An empty set means "every symbol the upstream lists".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SymbolSet {
    symbols: BTreeSet<String>,
}

impl SymbolSet {
    /// Build a set, upper-casing and trimming each symbol
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let symbols = symbols
            .into_iter()
            .map(|s| s.as_ref().trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        Self { symbols }
    }

    /// Set covering every symbol
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether the set covers every symbol
    pub fn is_all(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Whether a symbol is requested
    pub fn contains(&self, symbol: &str) -> bool {
        self.is_all() || self.symbols.contains(symbol)
    }

    /// Symbols in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }

    /// Number of explicit symbols
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether no explicit symbols were given
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Cache key for this set, e.g. `market_BTCUSDT,ETHUSDT`
    pub fn cache_key(&self) -> String {
        if self.is_all() {
            return format!("{}ALL", SNAPSHOT_KEY_PREFIX);
        }
        let joined: Vec<&str> = self.iter().collect();
        format!("{}{}", SNAPSHOT_KEY_PREFIX, joined.join(","))
    }
}

impl FromStr for SymbolSet {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.split(',')))
    }
}

impl fmt::Display for SymbolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all() {
            return write!(f, "*");
        }
        let joined: Vec<&str> = self.iter().collect();
        write!(f, "{}", joined.join(","))
    }
}

/// Upstream call failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    /// Upstream signalled the caller exceeded its rate limit
    #[error("Rate limited by upstream (HTTP {status})")]
    RateLimited { status: u16 },
    /// Request timed out
    #[error("Upstream request timed out")]
    Timeout,
    /// Connection-level failure
    #[error("Network error: {0}")]
    Network(String),
    /// Any other non-success status
    #[error("Upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// Payload could not be decoded
    #[error("Failed to decode upstream payload: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// Map a non-success HTTP status to an error
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        match status {
            418 | 429 => UpstreamError::RateLimited { status },
            _ => UpstreamError::Status {
                status,
                body: body.into(),
            },
        }
    }

    /// Whether this failure counts against the rate-limit guard
    pub fn is_violation(&self) -> bool {
        matches!(self, UpstreamError::RateLimited { .. })
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Timeout
        } else if e.is_decode() {
            UpstreamError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            UpstreamError::from_status(status.as_u16(), e.to_string())
        } else {
            UpstreamError::Network(e.to_string())
        }
    }
}
