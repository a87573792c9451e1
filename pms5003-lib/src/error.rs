use std::io;
use std::time::Duration;
use thiserror::Error;

/// The primary error type for the `pms5003-lib` library.
#[derive(Error, Debug)]
pub enum PmsError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Bad frame length: expected 28, got {0}")]
    BadFrameLength(u16),

    #[error("Checksum mismatch: frame carries {expected:#06x}, computed {computed:#06x}")]
    ChecksumMismatch { expected: u16, computed: u32 },

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("{} seconds elapsed. timeout.", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("Acquisition cancelled")]
    Cancelled,

    #[error("Acquisition worker failed: {0}")]
    Worker(String),
}

impl PmsError {
    /// Frame-level failures that only trigger a resynchronization.
    ///
    /// These never leave an acquisition session; everything else is the
    /// session's final outcome.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PmsError::BadFrameLength(_) | PmsError::ChecksumMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_taxonomy() {
        assert!(PmsError::BadFrameLength(20).is_recoverable());
        assert!(
            PmsError::ChecksumMismatch {
                expected: 0xFFFF,
                computed: 0x0200
            }
            .is_recoverable()
        );
        assert!(!PmsError::Cancelled.is_recoverable());
        assert!(!PmsError::Timeout(Duration::from_secs(5)).is_recoverable());
        assert!(!PmsError::Io(io::Error::from(io::ErrorKind::BrokenPipe)).is_recoverable());
    }

    #[test]
    fn test_timeout_message_matches_cli_output() {
        let err = PmsError::Timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "5 seconds elapsed. timeout.");
    }

    #[test]
    fn test_timeout_message_keeps_sub_second_deadline() {
        let err = PmsError::Timeout(Duration::from_millis(300));
        assert_eq!(err.to_string(), "0.3 seconds elapsed. timeout.");
    }
}
