use std::time::Duration;
use tracing::debug;

use crate::cancel::CancelSignal;
use crate::constants::{BODY_SIZE, LENGTH_FIELD_SIZE};
use crate::error::PmsError;
use crate::frame::{self, Checksum, Frame, Synchronizer};
use crate::measurement::Measurement;
use crate::source::ByteSource;

/// Blocking frame reader: runs synchronize → validate → decode → verify
/// attempts against a byte source until one succeeds.
///
/// `stop` is checked before every read and during short-read backoff; a raised
/// stop ends the current attempt with [`PmsError::Cancelled`].
pub struct FrameReader<S: ByteSource> {
    source: S,
    stop: CancelSignal,
    short_read_backoff: Duration,
}

impl<S: ByteSource> FrameReader<S> {
    pub fn new(source: S, stop: CancelSignal, short_read_backoff: Duration) -> Self {
        Self {
            source,
            stop,
            short_read_backoff,
        }
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    /// Retry attempts until a frame verifies; only fatal errors escape.
    pub fn read_measurement(&mut self) -> Result<Measurement, PmsError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.read_frame() {
                Ok(frame) => {
                    debug!(attempt, "Frame verified");
                    return Ok(frame.measurement());
                }
                Err(e) if e.is_recoverable() => {
                    debug!(attempt, "Frame rejected, resynchronizing: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One attempt. Synchronizer and checksum are fresh on every call.
    pub fn read_frame(&mut self) -> Result<Frame, PmsError> {
        let mut checksum = self.wait_for_start()?;
        debug!("Start marker found");
        // Last chance to bail out before committing to the rest of the frame
        self.check_stop()?;

        let mut length = [0u8; LENGTH_FIELD_SIZE];
        self.read_exact(&mut length)?;
        frame::validate_length(length, &mut checksum)?;

        let mut body = [0u8; BODY_SIZE];
        self.read_exact(&mut body)?;
        debug!(bytes = hex::encode(body), "Frame body");
        frame::decode_body(&body, checksum)
    }

    fn wait_for_start(&mut self) -> Result<Checksum, PmsError> {
        let mut sync = Synchronizer::new();
        let mut byte = [0u8; 1];
        loop {
            self.read_exact(&mut byte)?;
            if let Some(checksum) = sync.feed(byte[0]) {
                return Ok(checksum);
            }
        }
    }

    fn check_stop(&self) -> Result<(), PmsError> {
        if self.stop.is_cancelled() {
            return Err(PmsError::Cancelled);
        }
        Ok(())
    }

    /// Fill `buf`, keeping bytes already received across short reads.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), PmsError> {
        let mut filled = 0;
        while filled < buf.len() {
            self.check_stop()?;
            let n = self.source.read(&mut buf[filled..])?;
            filled += n;
            if filled < buf.len() {
                debug!(
                    filled,
                    wanted = buf.len(),
                    backoff_ms = self.short_read_backoff.as_millis() as u64,
                    "Short read, waiting for more data"
                );
                if self.stop.wait_timeout(self.short_read_backoff) {
                    return Err(PmsError::Cancelled);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encode_frame;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Hands out one scripted chunk per read call.
    struct Chunks(VecDeque<io::Result<Vec<u8>>>);

    impl ByteSource for Chunks {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(Ok(mut chunk)) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.0.push_front(Ok(chunk.split_off(n)));
                    }
                    Ok(n)
                }
                Some(Err(e)) => Err(e),
                None => Err(io::Error::from(io::ErrorKind::UnexpectedEof)),
            }
        }

        fn close(&mut self) {}
    }

    fn reader(chunks: Vec<io::Result<Vec<u8>>>) -> FrameReader<Chunks> {
        FrameReader::new(Chunks(chunks.into()), CancelSignal::new(), Duration::from_millis(1))
    }

    #[test]
    fn test_short_reads_keep_frame_position() {
        let bytes = encode_frame([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12], 0);
        let mut r = reader(vec![
            Ok(bytes[..6].to_vec()),
            Ok(vec![]),
            Ok(bytes[6..20].to_vec()),
            Ok(vec![]),
            Ok(bytes[20..].to_vec()),
        ]);
        let m = r.read_measurement().unwrap();
        assert_eq!(m.words(), [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn test_bad_length_resynchronizes() {
        let good = encode_frame([7; 12], 0);
        let mut stream = vec![0x42, 0x4D, 0x00, 0x14];
        stream.extend_from_slice(&good);
        let mut r = reader(vec![Ok(stream)]);
        assert_eq!(r.read_measurement().unwrap().pm1_0(), 7);
    }

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_resync_stays_below_warn_level() {
        let mut bad = encode_frame([7; 12], 0);
        bad[31] ^= 0x01;
        let mut stream = vec![0x42, 0x4D, 0x00, 0x14];
        stream.extend_from_slice(&bad);
        stream.extend_from_slice(&encode_frame([8; 12], 0));

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(move || writer.clone())
            .finish();

        let m = tracing::subscriber::with_default(subscriber, || reader(vec![Ok(stream)]).read_measurement());
        assert_eq!(m.unwrap().pm1_0(), 8);
        let logged = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logged.is_empty(), "Unexpected output at the CLI's default level: {}", logged);
    }

    #[test]
    fn test_single_attempt_reports_mismatch() {
        let mut bad = encode_frame([7; 12], 0);
        bad[31] ^= 0x01;
        let mut r = reader(vec![Ok(bad.to_vec())]);
        assert!(matches!(r.read_frame(), Err(PmsError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_io_error_is_fatal() {
        let mut r = reader(vec![
            Ok(vec![0x00, 0x42]),
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged")),
        ]);
        match r.read_measurement() {
            Err(PmsError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("Expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn test_stop_checked_before_reading() {
        let stop = CancelSignal::new();
        stop.cancel();
        let bytes = encode_frame([1; 12], 0);
        let mut r = FrameReader::new(Chunks(vec![Ok(bytes.to_vec())].into()), stop, Duration::from_millis(1));
        assert!(matches!(r.read_measurement(), Err(PmsError::Cancelled)));
        // Nothing consumed
        assert_eq!(r.into_inner().0.len(), 1);
    }
}
