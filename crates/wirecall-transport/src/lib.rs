//! Blocking socket transport for wirecall.
//!
//! One stream type over two socket families (TCP and, on Unix, domain
//! sockets), plus a listener that yields streams. Everything above this
//! crate works in terms of `Read + Write`; nothing here knows what an
//! envelope is.

pub mod endpoint;
pub mod error;
pub mod listener;
pub mod stream;

pub use endpoint::{Endpoint, DEFAULT_READ_TIMEOUT};
pub use error::{Result, TransportError};
pub use listener::CallListener;
pub use stream::CallStream;
