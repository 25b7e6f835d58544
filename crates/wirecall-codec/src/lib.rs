//! Envelope serialization for wirecall.
//!
//! Two wire formats (compact binary via CBOR, human-readable JSON), an
//! orthogonal zlib compression wrapper, a fixed uncompressed handshake
//! preamble, and the bounded blocking buffer pool both ends serialize
//! through. Symmetric by construction: whatever one end encodes, the other
//! end decodes to an equal envelope.

pub mod codec;
pub mod error;
pub mod frame;
pub mod pool;
pub mod text;

pub use codec::EnvelopeCodec;
pub use error::{CodecError, PoolError, Result};
pub use frame::{DEFAULT_MAX_FRAME, MAGIC, PREAMBLE_SIZE, PROTOCOL_VERSION};
pub use pool::{BufferLease, BufferPool, DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_POOL_CAPACITY};
