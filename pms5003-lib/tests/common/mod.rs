//! Common test utilities and shared imports

// Allow unused imports and dead code since this is a shared module
// used across multiple test files - not all items are used in every test file
#[allow(unused_imports)]
pub use hex;
#[allow(unused_imports)]
pub use pms5003_lib::{
    ByteSource, CancelSignal, Measurement, PmsError, SessionConfig, acquire, acquire_with_config, encode_frame,
};
#[allow(unused_imports)]
pub use std::time::{Duration, Instant};

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Measurement words used by most tests
#[allow(dead_code)]
pub const WORDS: [u16; 12] = [10, 20, 30, 11, 21, 31, 300, 50, 10, 5, 2, 1];

/// Frame from the wire-format example: PM1.0 = 10, PM2.5 = 20, ...
#[allow(dead_code)]
pub fn valid_frame() -> Vec<u8> {
    encode_frame(WORDS, 0).to_vec()
}

/// Same frame with the checksum forced to FF FF
#[allow(dead_code)]
pub fn corrupted_frame() -> Vec<u8> {
    let mut frame = valid_frame();
    frame[30] = 0xFF;
    frame[31] = 0xFF;
    frame
}

/// Decode hex string to bytes for testing
#[allow(dead_code)]
pub fn hex_to_bytes(hex_data: &str) -> Vec<u8> {
    hex::decode(hex_data).expect("Failed to decode hex")
}

/// Session bounds suited to tests: short deadline, near-instant backoff
#[allow(dead_code)]
pub fn test_config(timeout: Duration) -> SessionConfig {
    SessionConfig::default()
        .with_timeout(timeout)
        .with_short_read_backoff(Duration::from_millis(10))
}

/// What the mock does once its script runs out.
#[derive(Debug, Clone, Copy)]
#[allow(dead_code)]
pub enum Tail {
    /// Behave like a quiet serial line: block briefly, then return 0 bytes
    Silent(Duration),
    /// Fail every read
    Broken,
    /// Panic inside `read`
    Panic,
}

/// Observes a [`MockSource`] after it has been moved into a session.
#[derive(Debug, Clone, Default)]
pub struct Observer {
    closes: Arc<AtomicUsize>,
    reads_after_close: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl Observer {
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn read_after_close(&self) -> bool {
        self.reads_after_close.load(Ordering::SeqCst)
    }
}

/// Scripted byte source: serves `chunks` one read at a time, then `tail`.
#[derive(Debug)]
pub struct MockSource {
    chunks: VecDeque<Vec<u8>>,
    tail: Tail,
    seen: Observer,
}

#[allow(dead_code)]
impl MockSource {
    pub fn new(stream: Vec<u8>, tail: Tail) -> (Self, Observer) {
        Self::chunked(vec![stream], tail)
    }

    pub fn chunked(chunks: Vec<Vec<u8>>, tail: Tail) -> (Self, Observer) {
        let seen = Observer::default();
        let source = Self {
            chunks: chunks.into(),
            tail,
            seen: seen.clone(),
        };
        (source, seen)
    }

    pub fn silent() -> (Self, Observer) {
        Self::new(Vec::new(), Tail::Silent(Duration::from_millis(20)))
    }
}

impl ByteSource for MockSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.seen.close_count() > 0 {
            self.seen.reads_after_close.store(true, Ordering::SeqCst);
            return Err(io::Error::new(io::ErrorKind::NotConnected, "mock closed"));
        }
        if let Some(mut chunk) = self.chunks.pop_front() {
            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            if n < chunk.len() {
                self.chunks.push_front(chunk.split_off(n));
            }
            return Ok(n);
        }
        match self.tail {
            Tail::Silent(block_for) => {
                std::thread::sleep(block_for);
                Ok(0)
            }
            Tail::Broken => Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock unplugged")),
            Tail::Panic => panic!("mock source exploded"),
        }
    }

    fn close(&mut self) {
        self.seen.closes.fetch_add(1, Ordering::SeqCst);
    }
}
