//! Error handling module
//!
//! This module defines the error types and result type aliases used in the crate.
//! Structural mismatches are not errors: they are reported as
//! [`Mismatch`](crate::protocol::Mismatch) values so that a non-matching stream
//! never aborts the surrounding detection pipeline.

use thiserror::Error;
use std::io;

/// PostgreSQL sniffer error type
#[derive(Error, Debug)]
pub enum SnifferError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Transport failure while reading the 4-byte length header
    #[error("reading message length header: {0}")]
    ReadHeader(#[source] io::Error),

    /// Transport failure while reading the declared payload
    #[error("reading message payload (declared length {declared}): {source}")]
    ReadPayload {
        /// Payload length announced by the header
        declared: usize,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SnifferError {
    /// Kind of the underlying I/O error, if this is a transport failure
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Io(e) | Self::ReadHeader(e) => Some(e.kind()),
            Self::ReadPayload { source, .. } => Some(source.kind()),
            Self::Config(_) => None,
        }
    }
}

impl From<config::ConfigError> for SnifferError {
    fn from(err: config::ConfigError) -> Self {
        SnifferError::Config(err.to_string())
    }
}

/// Result type alias
///
/// This is a `Result` type alias that uses our custom `SnifferError`.
pub type Result<T> = std::result::Result<T, SnifferError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "peer reset");
        let err: SnifferError = io_err.into();

        match err {
            SnifferError::Io(_) => {}
            _ => panic!("Should convert to IO error"),
        }
        assert_eq!(err.io_kind(), Some(io::ErrorKind::ConnectionReset));
    }

    #[test]
    fn test_error_display() {
        let err = SnifferError::ReadPayload {
            declared: 42,
            source: io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"),
        };
        let err_str = err.to_string();
        assert!(err_str.contains("declared length 42"));
        assert!(err_str.contains("pipe closed"));

        let err = SnifferError::Config("Invalid configuration".to_string());
        assert!(format!("{}", err).contains("Invalid configuration"));
        assert_eq!(err.io_kind(), None);
    }
}
