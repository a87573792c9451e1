use anyhow::{Context, Result, bail};
use axum::{Router, extract::State, routing::get};
use chrono::{DateTime, Utc};
use pms5003_lib::{CancelSignal, Measurement, Pms5003};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Slack the polling period must leave over the acquisition timeout
pub const TIME_BUFFER: Duration = Duration::from_secs(10);

/// Body served before the first successful reading
pub const NO_DATA_YET: &str = "No data yet";

/// Document served to HTTP clients
#[derive(Debug, Serialize)]
struct ServerData<'a> {
    pms5003: &'a Measurement,
    updated_at: DateTime<Utc>,
}

/// Last successfully rendered reading, shared between the poller and handlers.
#[derive(Debug, Clone)]
pub struct Cache {
    output: Arc<RwLock<String>>,
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            output: Arc::new(RwLock::new(NO_DATA_YET.to_string())),
        }
    }
}

impl Cache {
    pub async fn get(&self) -> String {
        self.output.read().await.clone()
    }

    /// Replace the cached document with `m`.
    pub async fn update(&self, m: &Measurement, at: DateTime<Utc>) -> Result<()> {
        let doc = ServerData {
            pms5003: m,
            updated_at: at,
        };
        let rendered = serde_json::to_string_pretty(&doc).context("Failed to encode reading as JSON")?;
        *self.output.write().await = rendered;
        Ok(())
    }
}

/// Reject a period too short to fit one acquisition plus slack.
pub fn check_period(period: Duration, timeout: Duration) -> Result<()> {
    if period.is_zero() {
        bail!("period must be greater than zero");
    }
    if period + TIME_BUFFER < timeout {
        bail!("too short period compared to timeout");
    }
    Ok(())
}

/// Poll the sensor every `period` and serve the latest reading on `listen`.
pub async fn run(sensor: Pms5003, period: Duration, listen: String, shutdown: CancelSignal) -> Result<()> {
    check_period(period, sensor.session().timeout)?;

    let cache = Cache::default();
    let poller = tokio::spawn(poll_periodically(sensor, period, cache.clone(), shutdown.clone()));

    let app = Router::new().route("/", get(handler)).with_state(cache);
    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .with_context(|| format!("Failed to bind {}", listen))?;
    info!("Starting server at {}", listen);

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { signal.cancelled().await })
        .await
        .context("HTTP server failed")?;

    shutdown.cancel();
    poller.await.context("Poller task failed")?;
    Ok(())
}

async fn poll_periodically(sensor: Pms5003, period: Duration, cache: Cache, shutdown: CancelSignal) {
    let mut ticker = tokio::time::interval(period);
    // The first tick completes immediately; skip it so the first reading comes after one period
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.cancelled() => break,
        }
        info!("Getting data by ticker");
        match sensor.read(&shutdown).await {
            Ok(m) => {
                if let Err(e) = cache.update(&m, Utc::now()).await {
                    warn!("Not updating the cached output: {:#}", e);
                }
            }
            Err(e) => warn!("Not updating the cached output: {}", e),
        }
    }
    info!("Poller stopped");
}

async fn handler(State(cache): State<Cache>) -> String {
    cache.get().await
}
