// Protocol constants for the PMS5003

use std::time::Duration;

/// First byte of the start marker ('B')
pub const START_BYTE_1: u8 = 0x42;

/// Second byte of the start marker ('M')
pub const START_BYTE_2: u8 = 0x4D;

/// Size of the start marker (2 bytes)
pub const MARKER_SIZE: usize = 2;

/// Size of the frame length field (2 bytes)
pub const LENGTH_FIELD_SIZE: usize = 2;

/// Value the frame length field must carry: body bytes following it (28)
pub const FRAME_LENGTH: u16 = 28;

/// Size of the frame body (28 bytes)
pub const BODY_SIZE: usize = FRAME_LENGTH as usize;

/// Size of a complete frame (32 bytes)
pub const FRAME_SIZE: usize = MARKER_SIZE + LENGTH_FIELD_SIZE + BODY_SIZE;

/// Number of measurement words at the start of the body
pub const MEASUREMENT_FIELDS: usize = 12;

/// Number of checksum-covered data words in the body (12 measurements + 1 reserved)
pub const DATA_FIELDS: usize = MEASUREMENT_FIELDS + 1;

/// Size of the checksum-covered data block in the body (26 bytes)
pub const DATA_SIZE: usize = DATA_FIELDS * 2;

/// Default serial device on a Raspberry Pi
pub const DEFAULT_PORT: &str = "/dev/ttyAMA0";

/// Fixed line speed of the sensor
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Serial read timeout; bounds how long a blocked read can hide a stop request
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Overall session deadline
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(5);

/// Wait before re-requesting the remainder of a short read
pub const DEFAULT_SHORT_READ_BACKOFF: Duration = Duration::from_secs(1);
