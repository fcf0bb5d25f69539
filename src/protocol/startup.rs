//! Startup payload classification
//!
//! A startup-phase payload is either an `SSLRequest` (just the 4-byte
//! sentinel) or a `StartupMessage`: a packed protocol version followed by
//! `key\0value\0` pairs and a single closing `\0`. Only the structure is
//! checked; parameter contents are never interpreted.

use log::trace;

use crate::config::SslRequestPolicy;
use super::cursor::Cursor;
use super::types::{
    Mismatch, ProtocolCode, ProtocolVersion, StartupKind, MIN_STARTUP_PAYLOAD,
};

/// Structural rules applied by [`StartupClassifier`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierPolicy {
    /// How strictly an `SSLRequest` must be formed
    pub ssl_request: SslRequestPolicy,
    /// Oldest protocol major version accepted
    pub min_major_version: u16,
    /// Reject startups that carry no parameters
    pub require_parameters: bool,
}

impl Default for ClassifierPolicy {
    fn default() -> Self {
        Self {
            ssl_request: SslRequestPolicy::Strict,
            min_major_version: ProtocolVersion::V3_0.major,
            require_parameters: false,
        }
    }
}

/// Classifies a frame payload
#[derive(Debug, Clone, Default)]
pub struct StartupClassifier {
    policy: ClassifierPolicy,
}

impl StartupClassifier {
    pub fn new(policy: ClassifierPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ClassifierPolicy {
        &self.policy
    }

    /// Whether `payload` is a well-formed startup-phase message
    pub fn is_startup(&self, payload: &[u8]) -> bool {
        self.classify(payload).is_ok()
    }

    /// Classify `payload`, reporting what it is or why it is not
    pub fn classify(&self, payload: &[u8]) -> Result<StartupKind, Mismatch> {
        let mut cursor = Cursor::new(payload);
        let code = cursor.read_u32();
        if cursor.is_failed() {
            return Err(Mismatch::PayloadTooShort(payload.len()));
        }

        let version = match ProtocolCode::from(code) {
            ProtocolCode::SslRequest => {
                if payload.len() == 4 || self.policy.ssl_request == SslRequestPolicy::Lenient {
                    return Ok(StartupKind::SslRequest);
                }
                return Err(Mismatch::MalformedSslRequest { len: payload.len() });
            }
            ProtocolCode::Version(version) => version,
        };

        if version.major < self.policy.min_major_version {
            return Err(Mismatch::UnsupportedVersion(version));
        }
        if payload.len() < MIN_STARTUP_PAYLOAD {
            return Err(Mismatch::StartupTooShort(payload.len()));
        }

        let parameters = walk_parameters(&mut cursor)?;
        if parameters == 0 && self.policy.require_parameters {
            return Err(Mismatch::NoParameters);
        }

        trace!("Startup v{} with {} parameter(s)", version, parameters);
        Ok(StartupKind::Startup { version, parameters })
    }
}

/// Walk `key\0value\0` pairs up to the closing `\0`, returning the pair count
///
/// The terminator must be the last byte of the payload.
fn walk_parameters(cursor: &mut Cursor<'_>) -> Result<usize, Mismatch> {
    let mut pairs = 0;

    loop {
        if cursor.is_failed() {
            return Err(Mismatch::MalformedParameter { offset: cursor.last_string_start() });
        }
        if cursor.at_end() {
            return Err(Mismatch::MissingTerminator);
        }

        cursor.read_cstr();
        if cursor.is_failed() {
            return Err(Mismatch::MalformedParameter { offset: cursor.last_string_start() });
        }

        if cursor.consumed_terminator() {
            if cursor.at_end() {
                return Ok(pairs);
            }
            return Err(Mismatch::TrailingBytes {
                offset: cursor.offset(),
                len: cursor.offset() + cursor.remaining(),
            });
        }

        if cursor.remaining() == 0 {
            return Err(Mismatch::MissingValue { offset: cursor.offset() });
        }

        cursor.read_cstr();
        if cursor.is_failed() {
            return Err(Mismatch::MalformedParameter { offset: cursor.last_string_start() });
        }
        pairs += 1;
    }
}
