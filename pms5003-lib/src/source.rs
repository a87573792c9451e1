use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Read};
use tracing::{debug, info};

use crate::config::SerialConfig;
use crate::error::PmsError;

/// Blocking byte stream the frame reader pulls from.
///
/// `read` may return fewer bytes than requested, including zero when nothing
/// arrived in time. Only an `Err` is treated as a failure.
pub trait ByteSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Release the underlying device. Reads after `close` must fail.
    fn close(&mut self);
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Closes the wrapped source exactly once: on `close` or when dropped.
#[derive(Debug)]
pub struct SourceGuard<S: ByteSource> {
    source: S,
    closed: bool,
}

impl<S: ByteSource> SourceGuard<S> {
    pub fn new(source: S) -> Self {
        Self { source, closed: false }
    }
}

impl<S: ByteSource> ByteSource for SourceGuard<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.source.read(buf)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.source.close();
        }
    }
}

impl<S: ByteSource> Drop for SourceGuard<S> {
    fn drop(&mut self) {
        self.close();
    }
}

/// The sensor's serial port.
pub struct SerialSource {
    name: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialSource {
    pub fn open(config: &SerialConfig) -> Result<Self, PmsError> {
        info!(port = %config.port, baud = config.baud_rate, "Opening serial port");
        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.read_timeout)
            .open()?;
        Ok(Self {
            name: config.port.clone(),
            port: Some(port),
        })
    }
}

impl ByteSource for SerialSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "serial port already closed"))?;
        match Read::read(port, buf) {
            // A quiet line is a short read, not a failure
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => Ok(0),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(0),
            other => other,
        }
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!(port = %self.name, "Serial port closed");
        }
    }
}

impl std::fmt::Debug for SerialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialSource")
            .field("name", &self.name)
            .field("open", &self.port.is_some())
            .finish()
    }
}
