pub mod cancel;
pub mod config;
pub mod constants;
pub mod device;
pub mod error;
pub mod frame;
pub mod measurement;
pub mod reader;
pub mod session;
pub mod source;

// Re-export the main types for easy access
pub use cancel::CancelSignal;
pub use config::{SerialConfig, SessionConfig};
pub use device::Pms5003;
pub use error::PmsError;
pub use frame::{Frame, encode_frame};
pub use measurement::{Field, Measurement};
pub use session::{acquire, acquire_from_port, acquire_with_config};
pub use source::{ByteSource, SerialSource};
