//! Protocol detector implementation
//!
//! This module decides whether a fresh connection opens with a PostgreSQL
//! `SSLRequest` or `StartupMessage`. The detector reads exactly one
//! length-prefixed frame and never more, so the routing layer that owns the
//! stream can replay the consumed bytes to whichever handler claims it.

use log::{debug, warn};
use once_cell::sync::Lazy;
use std::io::Read;
use tokio::io::AsyncRead;

use crate::common::{BufferPool, Result, SnifferError};
use crate::config::{defaults, MatcherConfig};
use super::frame::{payload_len, FrameOutcome, FrameReader};
use super::startup::{ClassifierPolicy, StartupClassifier};
use super::types::{Mismatch, StartupKind, HEADER_SIZE};

/// Protocol detection result
///
/// A mismatch is never an error: other matchers may still claim the
/// connection. `Failed` is reserved for a broken transport.
#[derive(Debug)]
pub enum DetectionResult {
    /// The stream opens with a PostgreSQL startup-phase message
    Matched(StartupKind),
    /// The stream is something else
    NotMatched(Mismatch),
    /// The stream failed while more bytes were expected
    Failed(SnifferError),
}

impl DetectionResult {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched(_))
    }

    /// Collapse into `Ok(true)`, `Ok(false)` or the transport error
    pub fn into_result(self) -> Result<bool> {
        match self {
            Self::Matched(_) => Ok(true),
            Self::NotMatched(_) => Ok(false),
            Self::Failed(e) => Err(e),
        }
    }
}

/// Protocol information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolInfo {
    /// Protocol name
    pub name: String,
    /// Protocol version (if available)
    pub version: Option<String>,
}

/// Protocol detector trait
///
/// This trait defines the interface for protocol detection.
pub trait ProtocolDetector: Send + Sync {
    /// Detect the protocol from a blocking stream
    ///
    /// # Parameters
    ///
    /// * `stream` - Stream positioned at its first byte
    fn detect<R: Read + ?Sized>(&self, stream: &mut R) -> DetectionResult;

    /// Detect the protocol from an async stream
    #[allow(async_fn_in_trait)]
    async fn detect_async<R: AsyncRead + Unpin + ?Sized>(&self, stream: &mut R) -> DetectionResult;

    /// Get protocol information
    ///
    /// # Parameters
    ///
    /// * `data` - Leading bytes of a connection, length header included
    ///
    /// # Returns
    ///
    /// Returns protocol information if `data` holds a complete matching frame
    fn get_protocol_info(&self, data: &[u8]) -> Option<ProtocolInfo>;
}

static SHARED_HEADER_POOL: Lazy<BufferPool> =
    Lazy::new(|| BufferPool::new(defaults::header_pool_size(), HEADER_SIZE));

/// Header pool shared by matchers built with [`PostgresMatcher::default`]
pub fn shared_header_pool() -> &'static BufferPool {
    &SHARED_HEADER_POOL
}

/// PostgreSQL startup matcher
#[derive(Clone)]
pub struct PostgresMatcher {
    reader: FrameReader,
    classifier: StartupClassifier,
}

impl Default for PostgresMatcher {
    fn default() -> Self {
        Self {
            reader: FrameReader::default().with_pool(shared_header_pool().clone()),
            classifier: StartupClassifier::default(),
        }
    }
}

impl PostgresMatcher {
    /// Create a matcher with explicit parts
    pub fn new(reader: FrameReader, classifier: StartupClassifier) -> Self {
        Self { reader, classifier }
    }

    /// Create a matcher from configuration
    ///
    /// A `header_pool_size` of 0 disables header buffer pooling.
    pub fn from_config(config: &MatcherConfig) -> Self {
        let mut reader = FrameReader::new(config.max_payload_size);
        if config.header_pool_size > 0 {
            reader = reader.with_pool(BufferPool::new(config.header_pool_size, HEADER_SIZE));
        }

        let classifier = StartupClassifier::new(ClassifierPolicy {
            ssl_request: config.ssl_request_policy,
            min_major_version: config.min_major_version,
            require_parameters: config.require_parameters,
        });

        Self { reader, classifier }
    }

    pub fn classifier(&self) -> &StartupClassifier {
        &self.classifier
    }

    /// Whether the stream opens with a PostgreSQL startup-phase message
    ///
    /// # Errors
    ///
    /// Only transport failures are returned; a mismatch is `Ok(false)`.
    pub fn matches<R: Read + ?Sized>(&self, stream: &mut R) -> Result<bool> {
        self.detect(stream).into_result()
    }

    /// Async counterpart of [`matches`](Self::matches)
    ///
    /// # Errors
    ///
    /// Only transport failures are returned; a mismatch is `Ok(false)`.
    pub async fn matches_async<R: AsyncRead + Unpin + ?Sized>(&self, stream: &mut R) -> Result<bool> {
        self.detect_async(stream).await.into_result()
    }

    fn decide(&self, outcome: FrameOutcome) -> DetectionResult {
        let frame = match outcome {
            FrameOutcome::Frame(frame) => frame,
            FrameOutcome::NotMatched(mismatch) => return DetectionResult::NotMatched(mismatch),
            FrameOutcome::Failed(e) => {
                warn!("Transport failure during PostgreSQL detection: {}", e);
                return DetectionResult::Failed(e);
            }
        };

        match self.classifier.classify(frame.payload()) {
            Ok(kind) => {
                debug!("PostgreSQL {} detected", kind);
                DetectionResult::Matched(kind)
            }
            Err(mismatch) => {
                debug!("Non-PostgreSQL payload: {}", mismatch);
                DetectionResult::NotMatched(mismatch)
            }
        }
    }
}

impl ProtocolDetector for PostgresMatcher {
    fn detect<R: Read + ?Sized>(&self, stream: &mut R) -> DetectionResult {
        self.decide(self.reader.read_frame(stream))
    }

    async fn detect_async<R: AsyncRead + Unpin + ?Sized>(&self, stream: &mut R) -> DetectionResult {
        let outcome = self.reader.read_frame_async(stream).await;
        self.decide(outcome)
    }

    fn get_protocol_info(&self, data: &[u8]) -> Option<ProtocolInfo> {
        let header: [u8; HEADER_SIZE] = data.get(..HEADER_SIZE)?.try_into().ok()?;
        let len = payload_len(u32::from_be_bytes(header), self.reader.max_payload()).ok()?;
        let payload = data.get(HEADER_SIZE..HEADER_SIZE + len)?;

        match self.classifier.classify(payload).ok()? {
            StartupKind::SslRequest => Some(ProtocolInfo {
                name: "PostgreSQL SSLRequest".to_string(),
                version: None,
            }),
            StartupKind::Startup { version, .. } => Some(ProtocolInfo {
                name: "PostgreSQL".to_string(),
                version: Some(version.to_string()),
            }),
        }
    }
}
