//! Protocol detection module
//!
//! This module recognizes the opening message of a PostgreSQL frontend
//! connection by reading a single length-prefixed frame:
//!
//! - `cursor`: sticky-failure reader over a payload
//! - `frame`: bounded frame extraction from blocking or async streams
//! - `startup`: `SSLRequest` / `StartupMessage` structural classification
//! - `detector`: the matcher used by connection routers

mod cursor;
mod detector;
mod frame;
mod startup;
mod types;

pub use cursor::Cursor;
pub use detector::{
    shared_header_pool, DetectionResult, PostgresMatcher, ProtocolDetector, ProtocolInfo,
};
pub use frame::{payload_len, Frame, FrameOutcome, FrameReader};
pub use startup::{ClassifierPolicy, StartupClassifier};
pub use types::{
    Mismatch, ProtocolCode, ProtocolVersion, StartupKind, HEADER_SIZE, MAX_STARTUP_PAYLOAD,
    MIN_MESSAGE_LENGTH, MIN_STARTUP_PAYLOAD, SSL_REQUEST_CODE,
};
