use std::time::Duration;

/// Errors raised by the buffer pool.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// No buffer became available within the timeout. Backpressure signal,
    /// not corruption.
    #[error("buffer pool exhausted (no buffer available after {waited:?})")]
    Exhausted { waited: Duration },

    /// A release did not complete within the timeout (over-returned pool).
    #[error("buffer pool release timed out after {waited:?}")]
    ReleaseTimedOut { waited: Duration },
}

/// Errors that can occur while encoding or decoding envelopes.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The handshake preamble carries an invalid magic number.
    #[error("invalid preamble magic (expected 0x5743 \"WC\")")]
    InvalidMagic,

    /// The handshake preamble names a protocol version we do not speak.
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),

    /// The handshake preamble carries an out-of-range field.
    #[error("invalid handshake: {0}")]
    InvalidHandshake(String),

    /// An envelope frame exceeds the configured maximum size.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The stream ended before a complete preamble or frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,

    /// Binary (CBOR) serialization failed.
    #[error("binary encode error: {0}")]
    BinaryEncode(String),

    /// Binary (CBOR) deserialization failed.
    #[error("binary decode error: {0}")]
    BinaryDecode(String),

    /// Text (JSON) serialization/deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A structurally valid JSON document did not match the envelope shape.
    #[error("malformed text envelope: {0}")]
    TextShape(String),

    /// Could not obtain or return a scratch buffer.
    #[error("buffer pool error: {0}")]
    Pool(#[from] PoolError),

    /// An I/O error occurred on the underlying stream.
    #[error("codec I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;
