//! Domain model (records, tokens, inbound signals, decode errors).

pub mod errors;
pub mod record;
pub mod signal;

pub use self::errors::EventError;
pub use self::record::{DEFAULT_KEY_ATTRIBUTE, RecordKey, TaskRecord, TaskToken};
pub use self::signal::{InboundSignal, StopEventKind};
