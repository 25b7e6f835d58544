use std::fmt;

use serde::{Deserialize, Serialize};

/// Discriminates the typed failures a server can report in a response
/// envelope. Kinds, not concrete exception types: the client reconstructs
/// the failure from this tag plus the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Request envelope missing or carrying a blank method identity.
    NullRequest,
    /// Identity not present in the server's registry (version skew).
    MethodNotFound,
    /// Argument count disagrees with the declared parameter count.
    ArityMismatch,
    /// A registered session validator rejected the session.
    SessionRejected,
    /// The target handler failed during execution.
    RemoteInvocation,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::NullRequest => "null request",
            FailureKind::MethodNotFound => "method not found",
            FailureKind::ArityMismatch => "wrong number of arguments",
            FailureKind::SessionRejected => "session rejected",
            FailureKind::RemoteInvocation => "remote invocation failed",
        };
        f.write_str(name)
    }
}

/// A typed failure carried inside a response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    /// Optional server-side rendering of the underlying cause.
    pub detail: Option<String>,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn null_request() -> Self {
        Self::new(
            FailureKind::NullRequest,
            "request envelope is missing a method identity",
        )
    }

    pub fn method_not_found(identity: &str) -> Self {
        Self::new(
            FailureKind::MethodNotFound,
            format!("no method registered for identity {identity}"),
        )
    }

    pub fn arity_mismatch(name: &str, declared: usize, supplied: usize) -> Self {
        Self::new(
            FailureKind::ArityMismatch,
            format!("method '{name}' declares {declared} parameters, request supplied {supplied}"),
        )
    }

    pub fn session_rejected(reason: impl Into<String>) -> Self {
        Self::new(FailureKind::SessionRejected, reason)
    }

    pub fn remote_invocation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::RemoteInvocation, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let failure = Failure::method_not_found("ABCD");
        let rendered = failure.to_string();
        assert!(rendered.contains("method not found"));
        assert!(rendered.contains("ABCD"));
    }

    #[test]
    fn detail_is_preserved() {
        let failure = Failure::remote_invocation("handler failed").with_detail("divide by zero");
        assert_eq!(failure.detail.as_deref(), Some("divide by zero"));
    }

    #[test]
    fn arity_mismatch_names_both_counts() {
        let failure = Failure::arity_mismatch("add", 2, 3);
        assert!(failure.message.contains('2'));
        assert!(failure.message.contains('3'));
    }
}
