use serde::{Deserialize, Serialize};

use crate::failure::Failure;
use crate::session::Session;
use crate::value::Value;

/// Wire format negotiated by the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireFormat {
    /// Compact self-describing binary encoding.
    Binary,
    /// Human-readable JSON encoding.
    Text,
}

impl WireFormat {
    /// Single-byte code used in the handshake preamble.
    pub fn code(self) -> u8 {
        match self {
            WireFormat::Binary => 0,
            WireFormat::Text => 1,
        }
    }

    /// Decode a preamble code. Returns `None` for unknown codes.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(WireFormat::Binary),
            1 => Some(WireFormat::Text),
            _ => None,
        }
    }
}

/// The per-call preamble telling the server how the envelope bytes that
/// follow are encoded. Built once by the client, read once by the server,
/// immutable after construction. Never compressed or format-encoded itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handshake {
    pub format: WireFormat,
    pub compressed: bool,
    /// Text format only: emit 64-bit integers as native JSON numbers
    /// (`true`) or as decimal strings (`false`).
    pub numeric_text: bool,
}

impl Handshake {
    pub fn new(format: WireFormat, compressed: bool, numeric_text: bool) -> Self {
        Self {
            format,
            compressed,
            numeric_text,
        }
    }
}

/// A client call on the wire: method address, caller session, arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub method_identity: String,
    pub session: Session,
    pub arguments: Vec<Value>,
}

impl RequestEnvelope {
    /// Build a request. An absent argument list normalizes to empty.
    pub fn new(
        method_identity: impl Into<String>,
        session: Session,
        arguments: Option<Vec<Value>>,
    ) -> Self {
        Self {
            method_identity: method_identity.into(),
            session,
            arguments: arguments.unwrap_or_default(),
        }
    }
}

/// Call outcome discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Ok,
    Error,
}

/// The server's reply: either a result value or a typed failure,
/// selected by `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub status: Status,
    pub result: Option<Value>,
    pub error: Option<Failure>,
}

impl ResponseEnvelope {
    pub fn ok(result: Value) -> Self {
        Self {
            status: Status::Ok,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(failure: Failure) -> Self {
        Self {
            status: Status::Error,
            result: None,
            error: Some(failure),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}
