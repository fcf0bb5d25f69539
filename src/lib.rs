//! pg-sniffer: passive PostgreSQL startup detection
//!
//! This library tells a connection router whether a freshly accepted stream
//! opens with a PostgreSQL frontend handshake, either an `SSLRequest` asking
//! to negotiate TLS or a plaintext `StartupMessage`, without reading past the
//! single length-prefixed frame the client declared.
//!
//! # Main Features
//!
//! - Tristate decision: match, mismatch, or transport failure
//! - Bounded reads: declared payloads above 16 KiB are never allocated
//! - Blocking (`std::io::Read`) and async (`tokio::io::AsyncRead`) streams
//! - Pooled header buffers with guaranteed release
//!
//! # Example
//!
//! ```no_run
//! use pg_sniffer::{PostgresMatcher, ProtocolDetector, DetectionResult};
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> pg_sniffer::Result<()> {
//!     let listener = TcpListener::bind("0.0.0.0:5432").await?;
//!     let matcher = PostgresMatcher::default();
//!
//!     let (mut stream, peer) = listener.accept().await?;
//!     match matcher.detect_async(&mut stream).await {
//!         DetectionResult::Matched(kind) => println!("{} from {}", kind, peer),
//!         DetectionResult::NotMatched(reason) => println!("not postgres: {}", reason),
//!         DetectionResult::Failed(e) => return Err(e),
//!     }
//!
//!     Ok(())
//! }
//! ```

// Public modules
pub mod common;
pub mod config;
pub mod protocol;

// Re-export commonly used structures and functions for convenience
pub use crate::common::{init_logger, BufferPool, Result, SnifferError};
pub use crate::config::{ConfigLoader, ConfigValidator, MatcherConfig, SslRequestPolicy};
pub use crate::protocol::{
    DetectionResult, Frame, Mismatch, PostgresMatcher, ProtocolDetector, ProtocolVersion,
    StartupKind,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
