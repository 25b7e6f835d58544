//! Wire-level data records and the shared API surface of wirecall.
//!
//! Everything both ends of a call must agree on lives here: the method
//! identity digest, the handshake record, the request/response envelopes,
//! the polymorphic value model, sessions and the typed failure taxonomy.
//! No I/O happens in this crate.

pub mod envelope;
pub mod failure;
pub mod identity;
pub mod session;
pub mod value;

pub use envelope::{Handshake, RequestEnvelope, ResponseEnvelope, Status, WireFormat};
pub use failure::{Failure, FailureKind};
pub use identity::{resolve_identity, MethodHandle};
pub use session::{Session, SessionRejection, SessionRetriever, SessionValidator};
pub use value::Value;
