//! Length-prefixed frame extraction
//!
//! A startup-phase frame is a 4-byte big-endian length that counts itself,
//! followed by `length - 4` payload bytes. The reader consumes exactly that
//! many bytes and no more, so the caller can replay them verbatim.
//!
//! Premature end of stream is a mismatch (the client never sent a complete
//! handshake); any other I/O error is a transport failure.

use bytes::{BufMut, Bytes, BytesMut};
use log::{debug, trace};
use std::io::{self, Read};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::common::{BufferPool, PooledBuffer, SnifferError};
use super::types::{
    Mismatch, ProtocolVersion, HEADER_SIZE, MAX_STARTUP_PAYLOAD, MIN_MESSAGE_LENGTH,
    SSL_REQUEST_CODE,
};

/// One length-prefixed message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    length: u32,
    payload: Bytes,
}

impl Frame {
    fn from_payload(payload: Bytes) -> Self {
        // Saturate so an oversized frame still declares itself too large
        let length = u32::try_from(payload.len() + HEADER_SIZE).unwrap_or(u32::MAX);
        Self { length, payload }
    }

    /// Build an `SSLRequest` frame
    pub fn ssl_request() -> Self {
        Self::from_payload(Bytes::copy_from_slice(&SSL_REQUEST_CODE.to_be_bytes()))
    }

    /// Build a `StartupMessage` frame
    ///
    /// Keys and values are written as given; embedding a NUL produces a
    /// frame the classifier will reject. No size limit is applied here:
    /// a payload above 16 KiB builds fine but is never matched by
    /// [`FrameReader`].
    pub fn startup(version: ProtocolVersion, params: &[(&str, &str)]) -> Self {
        let size = 4 + params.iter().map(|(k, v)| k.len() + v.len() + 2).sum::<usize>() + 1;
        let mut payload = BytesMut::with_capacity(size);

        payload.put_u32(version.packed());
        for (key, value) in params {
            payload.put_slice(key.as_bytes());
            payload.put_u8(0);
            payload.put_slice(value.as_bytes());
            payload.put_u8(0);
        }
        payload.put_u8(0);

        Self::from_payload(payload.freeze())
    }

    /// Declared total length, header included
    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// The exact bytes this frame occupies on the wire
    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.length as usize);
        out.put_u32(self.length);
        out.put_slice(&self.payload);
        out.freeze()
    }
}

/// Result of reading one frame
#[derive(Debug)]
pub enum FrameOutcome {
    /// A complete frame within bounds
    Frame(Frame),
    /// Not a startup-phase frame; no transport problem
    NotMatched(Mismatch),
    /// The stream broke while more bytes were legitimately expected
    Failed(SnifferError),
}

/// Validate a declared length and return the payload size
pub fn payload_len(length: u32, max_payload: usize) -> Result<usize, Mismatch> {
    if length < MIN_MESSAGE_LENGTH {
        return Err(Mismatch::LengthTooSmall(length));
    }

    let payload = (length as usize) - HEADER_SIZE;
    if payload == 0 {
        return Err(Mismatch::LengthTooSmall(length));
    }
    if payload > max_payload {
        return Err(Mismatch::PayloadTooLarge {
            declared: payload,
            max: max_payload,
        });
    }

    Ok(payload)
}

/// Header buffer, borrowed from the pool when one is available
enum HeaderBuf {
    Pooled(PooledBuffer),
    Local([u8; HEADER_SIZE]),
}

impl HeaderBuf {
    fn pooled(mut buf: PooledBuffer) -> Self {
        buf.resize(HEADER_SIZE, 0);
        Self::Pooled(buf)
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        match self {
            Self::Pooled(buf) => &mut buf[..HEADER_SIZE],
            Self::Local(buf) => buf,
        }
    }

    fn length(&self) -> u32 {
        let bytes = match self {
            Self::Pooled(buf) => &buf[..HEADER_SIZE],
            Self::Local(buf) => &buf[..],
        };
        u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

/// Reads a single startup-phase frame from a stream
#[derive(Clone)]
pub struct FrameReader {
    max_payload: usize,
    pool: Option<BufferPool>,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new(MAX_STARTUP_PAYLOAD)
    }
}

impl FrameReader {
    /// Create a reader accepting payloads up to `max_payload` bytes
    ///
    /// The bound is clamped to 16 KiB.
    pub fn new(max_payload: usize) -> Self {
        Self {
            max_payload: max_payload.min(MAX_STARTUP_PAYLOAD),
            pool: None,
        }
    }

    /// Borrow header buffers from `pool`
    pub fn with_pool(mut self, pool: BufferPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Header buffer for one read, never waiting on the pool
    ///
    /// A header read can stall for as long as the client stays silent, so an
    /// exhausted pool falls back to a private buffer instead of queueing.
    fn borrow_header(&self) -> HeaderBuf {
        match self.pool.as_ref().and_then(BufferPool::try_get_buffer) {
            Some(buf) => HeaderBuf::pooled(buf),
            None => HeaderBuf::Local([0; HEADER_SIZE]),
        }
    }

    /// Read one frame from a blocking stream
    pub fn read_frame<R: Read + ?Sized>(&self, stream: &mut R) -> FrameOutcome {
        let length = {
            let mut header = self.borrow_header();
            if let Err(e) = stream.read_exact(header.bytes_mut()) {
                return header_error(e);
            }
            header.length()
        };

        let len = match payload_len(length, self.max_payload) {
            Ok(len) => len,
            Err(mismatch) => return not_matched(mismatch),
        };

        let mut payload = BytesMut::zeroed(len);
        if let Err(e) = stream.read_exact(&mut payload) {
            return payload_error(len, e);
        }

        trace!("Read frame: length {}, payload {} bytes", length, len);
        FrameOutcome::Frame(Frame {
            length,
            payload: payload.freeze(),
        })
    }

    /// Read one frame from an async stream
    pub async fn read_frame_async<R>(&self, stream: &mut R) -> FrameOutcome
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let length = {
            let mut header = self.borrow_header();
            if let Err(e) = stream.read_exact(header.bytes_mut()).await {
                return header_error(e);
            }
            header.length()
        };

        let len = match payload_len(length, self.max_payload) {
            Ok(len) => len,
            Err(mismatch) => return not_matched(mismatch),
        };

        let mut payload = BytesMut::zeroed(len);
        if let Err(e) = stream.read_exact(&mut payload).await {
            return payload_error(len, e);
        }

        trace!("Read frame: length {}, payload {} bytes", length, len);
        FrameOutcome::Frame(Frame {
            length,
            payload: payload.freeze(),
        })
    }
}

fn not_matched(mismatch: Mismatch) -> FrameOutcome {
    debug!("Not a startup frame: {}", mismatch);
    FrameOutcome::NotMatched(mismatch)
}

fn header_error(err: io::Error) -> FrameOutcome {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        return not_matched(Mismatch::HeaderTruncated);
    }
    debug!("Error reading length header: {}", err);
    FrameOutcome::Failed(SnifferError::ReadHeader(err))
}

fn payload_error(declared: usize, err: io::Error) -> FrameOutcome {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        return not_matched(Mismatch::PayloadTruncated { declared });
    }
    debug!("Error reading {}-byte payload: {}", declared, err);
    FrameOutcome::Failed(SnifferError::ReadPayload { declared, source: err })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Yields its data one byte per read, then an error
    struct Trickle<'a> {
        data: &'a [u8],
        then: io::ErrorKind,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.data.split_first() {
                Some((&b, rest)) if !buf.is_empty() => {
                    buf[0] = b;
                    self.data = rest;
                    Ok(1)
                }
                Some(_) => Ok(0),
                None if self.then == io::ErrorKind::UnexpectedEof => Ok(0),
                None => Err(io::Error::new(self.then, "injected")),
            }
        }
    }

    fn expect_frame(outcome: FrameOutcome) -> Frame {
        match outcome {
            FrameOutcome::Frame(frame) => frame,
            other => panic!("Expected frame, got {:?}", other),
        }
    }

    #[test]
    fn test_payload_len_bounds() {
        assert_eq!(payload_len(7, MAX_STARTUP_PAYLOAD), Err(Mismatch::LengthTooSmall(7)));
        assert_eq!(payload_len(4, MAX_STARTUP_PAYLOAD), Err(Mismatch::LengthTooSmall(4)));
        assert_eq!(payload_len(8, MAX_STARTUP_PAYLOAD), Ok(4));
        assert_eq!(payload_len(16388, MAX_STARTUP_PAYLOAD), Ok(16384));
        assert_eq!(
            payload_len(16389, MAX_STARTUP_PAYLOAD),
            Err(Mismatch::PayloadTooLarge { declared: 16385, max: 16384 })
        );
        assert!(payload_len(u32::MAX, MAX_STARTUP_PAYLOAD).is_err());
    }

    #[test]
    fn test_read_ssl_request_frame() {
        let wire = Frame::ssl_request().to_bytes();
        assert_eq!(&wire[..], &[0x00, 0x00, 0x00, 0x08, 0x04, 0xD2, 0x16, 0x2F]);

        let frame = expect_frame(FrameReader::default().read_frame(&mut &wire[..]));
        assert_eq!(frame.length(), 8);
        assert_eq!(frame.payload(), &[0x04, 0xD2, 0x16, 0x2F]);
    }

    #[test]
    fn test_reads_exactly_one_frame() {
        let mut wire = Frame::startup(ProtocolVersion::V3_0, &[("user", "test")]).to_bytes().to_vec();
        wire.extend_from_slice(b"next message");

        let mut stream = &wire[..];
        let frame = expect_frame(FrameReader::default().read_frame(&mut stream));
        assert_eq!(frame.to_bytes().len() + stream.len(), wire.len());
        assert_eq!(stream, b"next message");
    }

    #[test]
    fn test_partial_reads_are_completed() {
        let wire = Frame::startup(ProtocolVersion::V3_0, &[("database", "db")]).to_bytes();
        let mut stream = Trickle { data: &wire, then: io::ErrorKind::UnexpectedEof };
        let frame = expect_frame(FrameReader::default().read_frame(&mut stream));
        assert_eq!(frame.to_bytes(), wire);
    }

    #[test]
    fn test_truncation_is_mismatch() {
        let mut short: &[u8] = &[0x00, 0x00];
        assert!(matches!(
            FrameReader::default().read_frame(&mut short),
            FrameOutcome::NotMatched(Mismatch::HeaderTruncated)
        ));

        let mut body: &[u8] = &[0x00, 0x00, 0x00, 0x0A, 0x00, 0x03, 0x00, 0x00];
        assert!(matches!(
            FrameReader::default().read_frame(&mut body),
            FrameOutcome::NotMatched(Mismatch::PayloadTruncated { declared: 6 })
        ));
    }

    #[test]
    fn test_oversized_payload_is_not_read() {
        let mut stream = Trickle {
            data: &20004u32.to_be_bytes(),
            then: io::ErrorKind::ConnectionReset,
        };
        // The reset would surface if the reader tried to read the body
        assert!(matches!(
            FrameReader::default().read_frame(&mut stream),
            FrameOutcome::NotMatched(Mismatch::PayloadTooLarge { declared: 20000, .. })
        ));
    }

    #[test]
    fn test_configured_bound_is_clamped() {
        assert_eq!(FrameReader::new(1 << 20).max_payload(), MAX_STARTUP_PAYLOAD);

        let reader = FrameReader::new(16);
        let wire = Frame::startup(ProtocolVersion::V3_0, &[("application_name", "psql")]).to_bytes();
        assert!(matches!(
            reader.read_frame(&mut &wire[..]),
            FrameOutcome::NotMatched(Mismatch::PayloadTooLarge { max: 16, .. })
        ));
    }

    #[test]
    fn test_transport_errors_propagate() {
        let mut stream = Trickle { data: &[0x00], then: io::ErrorKind::ConnectionReset };
        match FrameReader::default().read_frame(&mut stream) {
            FrameOutcome::Failed(SnifferError::ReadHeader(e)) => {
                assert_eq!(e.kind(), io::ErrorKind::ConnectionReset)
            }
            other => panic!("Expected header failure, got {:?}", other),
        }

        let mut stream = Trickle {
            data: &[0x00, 0x00, 0x00, 0x09, 0x00, 0x03],
            then: io::ErrorKind::BrokenPipe,
        };
        match FrameReader::default().read_frame(&mut stream) {
            FrameOutcome::Failed(SnifferError::ReadPayload { declared, source }) => {
                assert_eq!(declared, 5);
                assert_eq!(source.kind(), io::ErrorKind::BrokenPipe);
            }
            other => panic!("Expected payload failure, got {:?}", other),
        }
    }

    #[test]
    fn test_pooled_header_released_on_every_path() {
        let pool = BufferPool::new(1, HEADER_SIZE);
        let reader = FrameReader::default().with_pool(pool.clone());

        let ok = Frame::ssl_request().to_bytes();
        assert!(matches!(reader.read_frame(&mut &ok[..]), FrameOutcome::Frame(_)));
        assert_eq!(pool.available(), 1);

        let mut tiny: &[u8] = &[0x00, 0x00, 0x00, 0x07];
        assert!(matches!(reader.read_frame(&mut tiny), FrameOutcome::NotMatched(_)));
        assert_eq!(pool.available(), 1);

        let mut broken = Trickle { data: &[], then: io::ErrorKind::ConnectionAborted };
        assert!(matches!(reader.read_frame(&mut broken), FrameOutcome::Failed(_)));
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_exhausted_pool_falls_back() {
        let pool = BufferPool::new(1, HEADER_SIZE);
        let reader = FrameReader::default().with_pool(pool.clone());
        let _held = pool.try_get_buffer().unwrap();

        let wire = Frame::ssl_request().to_bytes();
        assert!(matches!(reader.read_frame(&mut &wire[..]), FrameOutcome::Frame(_)));
    }

    #[tokio::test]
    async fn test_async_read_does_not_wait_on_exhausted_pool() {
        let pool = BufferPool::new(1, HEADER_SIZE);
        let reader = FrameReader::default().with_pool(pool.clone());

        // A silent client keeps the only pooled header busy
        let (_client, mut idle) = tokio::io::duplex(64);
        let stalled = {
            let reader = reader.clone();
            tokio::spawn(async move { reader.read_frame_async(&mut idle).await })
        };
        while pool.available() > 0 {
            tokio::task::yield_now().await;
        }

        let wire = Frame::ssl_request().to_bytes();
        let outcome = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            reader.read_frame_async(&mut &wire[..]),
        )
        .await
        .expect("complete frame must not wait for the pool");
        assert!(matches!(outcome, FrameOutcome::Frame(_)));

        stalled.abort();
    }

    #[test]
    fn test_oversized_builder_frame_is_rejected() {
        let value = "x".repeat(MAX_STARTUP_PAYLOAD);
        let frame = Frame::startup(ProtocolVersion::V3_0, &[("options", &value)]);
        assert_eq!(frame.length() as usize, frame.payload().len() + HEADER_SIZE);

        let wire = frame.to_bytes();
        assert!(matches!(
            FrameReader::default().read_frame(&mut &wire[..]),
            FrameOutcome::NotMatched(Mismatch::PayloadTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_read_frame_async() {
        let pool = BufferPool::new(2, HEADER_SIZE);
        let reader = FrameReader::default().with_pool(pool.clone());

        let wire = Frame::startup(ProtocolVersion::V3_0, &[("user", "postgres")]).to_bytes();
        let frame = expect_frame(reader.read_frame_async(&mut &wire[..]).await);
        assert_eq!(frame.to_bytes(), wire);

        let mut short: &[u8] = &[0x00, 0x00, 0x00];
        assert!(matches!(
            reader.read_frame_async(&mut short).await,
            FrameOutcome::NotMatched(Mismatch::HeaderTruncated)
        ));
        assert_eq!(pool.available(), 2);
    }
}
