//! Shared fixtures for integration tests

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tickguard::clock::ManualClock;
use tickguard::orchestrator::{OrchestratorConfig, SnapshotOrchestrator};
use tickguard::upstream::{MarketDataSource, MarketSnapshot, SymbolSet, Ticker, UpstreamError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

pub fn snapshot(price: i64) -> MarketSnapshot {
    MarketSnapshot {
        tickers: vec![Ticker {
            symbol: "BTCUSDT".to_string(),
            last_price: Decimal::from(price),
            volume: Decimal::ONE,
            price_change_percent: Decimal::ZERO,
        }],
        fetched_at: Utc::now(),
    }
}

/// Source that replays a script of results and counts calls
pub struct ScriptedSource {
    calls: AtomicUsize,
    script: Mutex<VecDeque<Result<i64, UpstreamError>>>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<i64, UpstreamError>>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            script: Mutex::new(script.into()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataSource for ScriptedSource {
    fn resource_class(&self) -> &str {
        "futures-ticker"
    }

    async fn fetch(&self, _symbols: &SymbolSet) -> Result<MarketSnapshot, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(UpstreamError::Timeout));
        next.map(snapshot)
    }
}

/// Source that blocks every fetch until released
pub struct GatedSource {
    calls: AtomicUsize,
    gate: Semaphore,
}

impl GatedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate: Semaphore::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Let waiting fetches complete
    pub fn release(&self) {
        self.gate.add_permits(1024);
    }
}

#[async_trait]
impl MarketDataSource for GatedSource {
    fn resource_class(&self) -> &str {
        "futures-ticker"
    }

    async fn fetch(&self, _symbols: &SymbolSet) -> Result<MarketSnapshot, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| UpstreamError::Network(e.to_string()))?;
        Ok(snapshot(45000))
    }
}

pub fn orchestrator(source: Arc<dyn MarketDataSource>) -> (SnapshotOrchestrator, ManualClock) {
    let clock = ManualClock::default();
    let orch =
        SnapshotOrchestrator::new(source, OrchestratorConfig::default(), Arc::new(clock.clone()));
    (orch, clock)
}

pub fn btc() -> SymbolSet {
    SymbolSet::new(["BTCUSDT"])
}

/// Poll until no fetch is in flight
pub async fn wait_idle(orch: &SnapshotOrchestrator) {
    for _ in 0..200 {
        if orch.in_flight().await == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("fetch still in flight");
}

/// HTTP stub serving one canned response per connection, in order.
///
/// Returns the base URL and a counter of accepted connections.
pub async fn serve_script(responses: Vec<(&'static str, &'static str)>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        for (status_line, body) in responses {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
        }
    });

    (format!("http://{}", addr), hits)
}
