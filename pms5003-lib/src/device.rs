use std::time::Duration;
use tracing::info;

use crate::cancel::CancelSignal;
use crate::config::{SerialConfig, SessionConfig};
use crate::error::PmsError;
use crate::measurement::Measurement;
use crate::session;

/// A PMS5003 attached to a serial port.
///
/// Holds settings only; the port is opened for each [`Pms5003::read`] and
/// closed again before it returns.
#[derive(Debug, Clone)]
pub struct Pms5003 {
    serial: SerialConfig,
    session: SessionConfig,
}

impl Pms5003 {
    pub fn new(serial: SerialConfig) -> Self {
        Self {
            serial,
            session: SessionConfig::default(),
        }
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.session.timeout = timeout;
        self
    }

    pub fn serial(&self) -> &SerialConfig {
        &self.serial
    }

    pub fn session(&self) -> &SessionConfig {
        &self.session
    }

    /// Run one acquisition session against the sensor.
    pub async fn read(&self, cancel: &CancelSignal) -> Result<Measurement, PmsError> {
        info!(port = %self.serial.port, "Reading PMS5003");
        session::acquire_from_port(&self.serial, self.session, cancel).await
    }
}
