//! Lightweight RPC with pluggable wire formats over blocking sockets.
//!
//! A call is one connection: the client connects, sends a six-byte
//! handshake naming the wire format and compression, writes one request
//! envelope, and reads one response envelope. Methods are addressed by a
//! digest of their signature, so both ends agree on an identity without a
//! shared IDL or code generation.
//!
//! # Crate structure
//!
//! - [`proto`] — envelopes, values, sessions, failures, method identity
//! - [`codec`] — wire formats, compression, framing, the buffer pool
//! - [`transport`] — blocking TCP and Unix socket streams
//! - [`client`] — the invocation engine
//! - [`server`] — registry, dispatcher, serving loop

/// Re-export protocol types.
pub mod proto {
    pub use wirecall_proto::*;
}

/// Re-export codec types.
pub mod codec {
    pub use wirecall_codec::*;
}

/// Re-export transport types.
pub mod transport {
    pub use wirecall_transport::*;
}

/// Re-export client types.
pub mod client {
    pub use wirecall_client::*;
}

/// Re-export server types.
pub mod server {
    pub use wirecall_server::*;
}

pub mod logging;

// The working set for a typical caller.
pub use wirecall_client::{Client, ClientError, FailureHandler, WireConfig};
pub use wirecall_proto::{
    Failure, FailureKind, MethodHandle, Session, SessionRetriever, SessionValidator, Value,
    WireFormat,
};
pub use wirecall_server::{Dispatcher, HandlerError, MethodRegistry, Server};
pub use wirecall_transport::{CallListener, Endpoint};
