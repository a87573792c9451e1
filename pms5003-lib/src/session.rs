use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use crate::cancel::CancelSignal;
use crate::config::{SerialConfig, SessionConfig};
use crate::error::PmsError;
use crate::measurement::Measurement;
use crate::reader::FrameReader;
use crate::source::{ByteSource, SerialSource, SourceGuard};

type Worker = JoinHandle<Result<Measurement, PmsError>>;

/// Acquire one measurement within `timeout`, using the default backoff.
///
/// See [`acquire_with_config`].
pub async fn acquire<S>(source: S, timeout: Duration, cancel: &CancelSignal) -> Result<Measurement, PmsError>
where
    S: ByteSource + Send + 'static,
{
    acquire_with_config(source, SessionConfig::default().with_timeout(timeout), cancel).await
}

/// Open the serial port, acquire one measurement, close the port.
pub async fn acquire_from_port(
    serial: &SerialConfig,
    session: SessionConfig,
    cancel: &CancelSignal,
) -> Result<Measurement, PmsError> {
    let source = SerialSource::open(serial)?;
    acquire_with_config(source, session, cancel).await
}

/// Run frame attempts on a blocking worker until one verifies, the deadline
/// passes, or `cancel` is raised.
///
/// Exactly one outcome is returned. The source is owned by the worker and is
/// closed before this function returns, whichever way the race ends.
pub async fn acquire_with_config<S>(
    source: S,
    config: SessionConfig,
    cancel: &CancelSignal,
) -> Result<Measurement, PmsError>
where
    S: ByteSource + Send + 'static,
{
    let started = Instant::now();
    info!(timeout_ms = config.timeout.as_millis() as u64, "Starting acquisition");

    let stop = CancelSignal::new();
    // Stops the worker even if this future is dropped before it completes
    let _stop_on_drop = StopOnDrop(stop.clone());
    let mut worker = spawn_worker(source, stop.clone(), config.short_read_backoff);

    let deadline = tokio::time::sleep(config.timeout);
    tokio::pin!(deadline);

    let outcome = tokio::select! {
        biased;
        joined = &mut worker => {
            let outcome = flatten(joined);
            match &outcome {
                Ok(m) => info!(elapsed_ms = started.elapsed().as_millis() as u64, "Measurement acquired: {}", m),
                Err(e) => warn!("Acquisition failed: {}", e),
            }
            return outcome;
        }
        _ = cancel.cancelled() => {
            info!("Acquisition cancelled by caller");
            Err(PmsError::Cancelled)
        }
        _ = &mut deadline => {
            warn!("{}", PmsError::Timeout(config.timeout));
            Err(PmsError::Timeout(config.timeout))
        }
    };

    // The outcome is decided; stop the worker and wait for it to release the source
    stop.cancel();
    match worker.await {
        Ok(Ok(m)) => debug!("Discarding measurement that arrived after the session ended: {}", m),
        Ok(Err(e)) => debug!("Worker stopped: {}", e),
        Err(e) => warn!("Worker failed after the session ended: {}", e),
    }
    outcome
}

/// Raises the worker's stop flag when the session ends on any path.
struct StopOnDrop(CancelSignal);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

fn spawn_worker<S>(source: S, stop: CancelSignal, short_read_backoff: Duration) -> Worker
where
    S: ByteSource + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        // Dropping the reader at the end of this closure closes the source
        let mut reader = FrameReader::new(SourceGuard::new(source), stop, short_read_backoff);
        reader.read_measurement()
    })
}

fn flatten(joined: Result<Result<Measurement, PmsError>, JoinError>) -> Result<Measurement, PmsError> {
    joined.map_err(|e| PmsError::Worker(e.to_string()))?
}
