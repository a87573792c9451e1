use tracing::debug;
use zerocopy::byteorder::big_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::constants::{
    BODY_SIZE, DATA_SIZE, FRAME_LENGTH, FRAME_SIZE, LENGTH_FIELD_SIZE, MARKER_SIZE, MEASUREMENT_FIELDS, START_BYTE_1,
    START_BYTE_2,
};
use crate::error::PmsError;
use crate::measurement::Measurement;

/// Running sum of the checksum-covered bytes of one frame attempt.
///
/// The widest possible sum (30 bytes of 0xFF) fits easily, so no wrapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checksum(u32);

impl Checksum {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn add(&mut self, bytes: &[u8]) {
        self.0 += bytes.iter().map(|&b| u32::from(b)).sum::<u32>();
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }

    pub fn matches(&self, expected: u16) -> bool {
        self.0 == u32::from(expected)
    }
}

/// Position of the synchronizer in the start-marker search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    SawFirstMarker,
    Synced,
}

/// Byte-at-a-time scanner for the `0x42 0x4D` start marker.
///
/// Seeds the frame checksum with the two marker bytes once synced.
#[derive(Debug, Default)]
pub struct Synchronizer {
    state: SyncState,
    checksum: Checksum,
}

impl Synchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Feed one byte; returns the seeded checksum when the marker completes.
    ///
    /// A `0x42` arriving while waiting for `0x4D` re-arms the search on that
    /// byte instead of falling back to `Idle`.
    pub fn feed(&mut self, byte: u8) -> Option<Checksum> {
        match (self.state, byte) {
            (SyncState::SawFirstMarker, START_BYTE_2) => {
                self.checksum.add(&[byte]);
                self.state = SyncState::Synced;
                Some(self.checksum)
            }
            (_, START_BYTE_1) => {
                self.checksum.reset();
                self.checksum.add(&[byte]);
                self.state = SyncState::SawFirstMarker;
                None
            }
            _ => {
                self.checksum.reset();
                self.state = SyncState::Idle;
                None
            }
        }
    }
}

/// Check the declared frame length and fold its bytes into the checksum.
pub fn validate_length(raw: [u8; LENGTH_FIELD_SIZE], checksum: &mut Checksum) -> Result<(), PmsError> {
    let length = u16::from_be_bytes(raw);
    if length != FRAME_LENGTH {
        return Err(PmsError::BadFrameLength(length));
    }
    checksum.add(&raw);
    Ok(())
}

/// Wire layout of the 28 bytes following the length field.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct FrameBodyRaw {
    pub measurements: [U16; MEASUREMENT_FIELDS],
    /// Covered by the checksum, never reported
    pub reserved: U16,
    pub checksum: U16,
}

/// A checksum-verified frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub measurements: [u16; MEASUREMENT_FIELDS],
    pub reserved: u16,
    pub checksum: u16,
}

impl Frame {
    pub fn measurement(&self) -> Measurement {
        Measurement::from_words(self.measurements)
    }

    /// Validate a complete frame held in memory, marker included.
    pub fn parse(bytes: &[u8; FRAME_SIZE]) -> Result<Self, PmsError> {
        let mut sync = Synchronizer::new();
        sync.feed(bytes[0]);
        let Some(mut checksum) = sync.feed(bytes[1]) else {
            return Err(PmsError::InvalidFrame(format!(
                "missing start marker: {:02x} {:02x}",
                bytes[0], bytes[1]
            )));
        };
        let body_start = MARKER_SIZE + LENGTH_FIELD_SIZE;
        validate_length([bytes[2], bytes[3]], &mut checksum)?;
        let mut body = [0u8; BODY_SIZE];
        body.copy_from_slice(&bytes[body_start..]);
        decode_body(&body, checksum)
    }
}

/// Fold the data words into the checksum and compare with the trailing word.
pub fn decode_body(body: &[u8; BODY_SIZE], mut checksum: Checksum) -> Result<Frame, PmsError> {
    checksum.add(&body[..DATA_SIZE]);

    let raw: FrameBodyRaw = zerocopy::transmute!(*body);
    let expected = raw.checksum.get();
    debug!(
        computed = checksum.value(),
        expected,
        reserved = raw.reserved.get(),
        "Verifying frame checksum"
    );
    if !checksum.matches(expected) {
        return Err(PmsError::ChecksumMismatch {
            expected,
            computed: checksum.value(),
        });
    }

    Ok(Frame {
        measurements: raw.measurements.map(|w| w.get()),
        reserved: raw.reserved.get(),
        checksum: expected,
    })
}

/// Build the wire bytes for a frame carrying `words` and `reserved`.
///
/// Used to replay readings and to drive the decoder in tests.
pub fn encode_frame(words: [u16; MEASUREMENT_FIELDS], reserved: u16) -> [u8; FRAME_SIZE] {
    let mut frame = [0u8; FRAME_SIZE];
    frame[0] = START_BYTE_1;
    frame[1] = START_BYTE_2;
    frame[2..4].copy_from_slice(&FRAME_LENGTH.to_be_bytes());
    for (i, word) in words.iter().enumerate() {
        let at = 4 + i * 2;
        frame[at..at + 2].copy_from_slice(&word.to_be_bytes());
    }
    frame[28..30].copy_from_slice(&reserved.to_be_bytes());

    let mut checksum = Checksum::new();
    checksum.add(&frame[..FRAME_SIZE - 2]);
    // 30 bytes of at most 0xFF each always fits in a u16
    let sum = checksum.value() as u16;
    frame[30..32].copy_from_slice(&sum.to_be_bytes());
    frame
}
