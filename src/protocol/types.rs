//! Protocol types shared by the frame reader, classifier and detector

use std::fmt;

/// Request code sent by a client asking to negotiate TLS (`SSLRequest`)
pub const SSL_REQUEST_CODE: u32 = 80877103;

/// Size of the self-inclusive length field
pub const HEADER_SIZE: usize = 4;

/// Smallest valid message: `SSLRequest` (4 length + 4 code)
pub const MIN_MESSAGE_LENGTH: u32 = 8;

/// Smallest valid `StartupMessage` payload: version (4) + final NUL (1)
pub const MIN_STARTUP_PAYLOAD: usize = 5;

/// Hard ceiling for a startup payload (16 KiB)
pub const MAX_STARTUP_PAYLOAD: usize = 16 * 1024;

/// Packed protocol version (`major << 16 | minor`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion {
    /// Upper 16 bits
    pub major: u16,
    /// Lower 16 bits
    pub minor: u16,
}

impl ProtocolVersion {
    /// Protocol 3.0, the version spoken by every current client
    pub const V3_0: ProtocolVersion = ProtocolVersion::new(3, 0);

    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    pub const fn from_packed(code: u32) -> Self {
        Self {
            major: (code >> 16) as u16,
            minor: (code & 0xFFFF) as u16,
        }
    }

    pub const fn packed(self) -> u32 {
        ((self.major as u32) << 16) | self.minor as u32
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// First 4 bytes of a startup-phase payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolCode {
    /// The `SSLRequest` sentinel
    SslRequest,
    /// Anything else is read as a packed protocol version
    Version(ProtocolVersion),
}

impl From<u32> for ProtocolCode {
    fn from(code: u32) -> Self {
        if code == SSL_REQUEST_CODE {
            Self::SslRequest
        } else {
            Self::Version(ProtocolVersion::from_packed(code))
        }
    }
}

/// What a matching stream turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupKind {
    /// TLS negotiation request
    SslRequest,
    /// Plaintext startup with a well-formed parameter list
    Startup {
        version: ProtocolVersion,
        /// Number of key/value pairs
        parameters: usize,
    },
}

impl fmt::Display for StartupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SslRequest => write!(f, "SSLRequest"),
            Self::Startup { version, parameters } => {
                write!(f, "StartupMessage v{} with {} parameter(s)", version, parameters)
            }
        }
    }
}

/// Why a stream is not a PostgreSQL startup
///
/// These are decisions, not failures: a mismatch lets the router move on to
/// the next matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mismatch {
    /// Stream ended before the 4-byte length header
    HeaderTruncated,
    /// Declared length below the 8-byte minimum
    LengthTooSmall(u32),
    /// Declared payload above the configured bound; nothing was read
    PayloadTooLarge { declared: usize, max: usize },
    /// Stream ended before the declared payload arrived
    PayloadTruncated { declared: usize },
    /// Payload cannot even hold the 4-byte code
    PayloadTooShort(usize),
    /// `SSLRequest` code with a payload that is not exactly 4 bytes
    MalformedSslRequest { len: usize },
    /// Protocol major version below the accepted minimum
    UnsupportedVersion(ProtocolVersion),
    /// Startup payload without room for version and terminator
    StartupTooShort(usize),
    /// A key or value is missing its NUL terminator
    MalformedParameter { offset: usize },
    /// Payload ended where the list terminator was expected
    MissingTerminator,
    /// A key is not followed by a value
    MissingValue { offset: usize },
    /// Bytes follow the list terminator
    TrailingBytes { offset: usize, len: usize },
    /// Parameter list is empty but parameters are required
    NoParameters,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeaderTruncated => write!(f, "stream ended before length header"),
            Self::LengthTooSmall(len) => {
                write!(f, "declared length {} below minimum {}", len, MIN_MESSAGE_LENGTH)
            }
            Self::PayloadTooLarge { declared, max } => {
                write!(f, "declared payload {} exceeds maximum {}", declared, max)
            }
            Self::PayloadTruncated { declared } => {
                write!(f, "stream ended before declared payload of {} bytes", declared)
            }
            Self::PayloadTooShort(len) => write!(f, "payload of {} bytes has no request code", len),
            Self::MalformedSslRequest { len } => {
                write!(f, "SSLRequest code with {}-byte payload", len)
            }
            Self::UnsupportedVersion(version) => {
                write!(f, "unsupported protocol version {}", version)
            }
            Self::StartupTooShort(len) => write!(f, "startup payload of {} bytes too short", len),
            Self::MalformedParameter { offset } => {
                write!(f, "unterminated parameter string at offset {}", offset)
            }
            Self::MissingTerminator => write!(f, "parameter list has no terminator"),
            Self::MissingValue { offset } => {
                write!(f, "parameter key without value at offset {}", offset)
            }
            Self::TrailingBytes { offset, len } => {
                write!(
                    f,
                    "{} trailing byte(s) after terminator at offset {}",
                    len.saturating_sub(*offset),
                    offset
                )
            }
            Self::NoParameters => write!(f, "startup carries no parameters"),
        }
    }
}
