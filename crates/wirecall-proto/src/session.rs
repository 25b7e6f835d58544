use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller identity attached to every request envelope.
///
/// Immutable value object. The server exposes it to the invoked handler for
/// the duration of the call only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub session_id: String,
    pub client_app: String,
}

impl Session {
    /// Create a session; a blank `session_id` is replaced by a fresh token.
    pub fn new(
        username: impl Into<String>,
        session_id: impl Into<String>,
        client_app: impl Into<String>,
    ) -> Self {
        let session_id = session_id.into();
        let session_id = if session_id.trim().is_empty() {
            Uuid::new_v4().to_string()
        } else {
            session_id
        };
        Self {
            username: username.into(),
            session_id,
            client_app: client_app.into(),
        }
    }

    /// The default session used when no retriever is configured and when the
    /// context slot is read outside any call.
    pub fn anonymous() -> Self {
        Self {
            username: "unknown".to_string(),
            session_id: Uuid::new_v4().to_string(),
            client_app: "unknown_client".to_string(),
        }
    }
}

/// Client-side collaborator returning the active session for outgoing calls.
pub trait SessionRetriever: Send + Sync {
    fn session(&self) -> Session;
}

/// Why a session validator rejected an inbound session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("session rejected: {reason}")]
pub struct SessionRejection {
    pub reason: String,
}

impl SessionRejection {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Server-side collaborator run against every inbound session.
///
/// Validators run in registration order; the first rejection short-circuits
/// the dispatch before the handler is invoked.
pub trait SessionValidator: Send + Sync {
    fn check(&self, session: &Session) -> Result<(), SessionRejection>;
}

impl<F> SessionValidator for F
where
    F: Fn(&Session) -> Result<(), SessionRejection> + Send + Sync,
{
    fn check(&self, session: &Session) -> Result<(), SessionRejection> {
        self(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_session_id_gets_generated_token() {
        let a = Session::new("alice", "", "app");
        let b = Session::new("alice", "   ", "app");
        assert!(!a.session_id.is_empty());
        assert!(!b.session_id.trim().is_empty());
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn explicit_session_id_is_kept() {
        let session = Session::new("alice", "token-1", "app");
        assert_eq!(session.session_id, "token-1");
    }

    #[test]
    fn anonymous_session_defaults() {
        let session = Session::anonymous();
        assert_eq!(session.username, "unknown");
        assert_eq!(session.client_app, "unknown_client");
        assert!(!session.session_id.is_empty());
    }

    #[test]
    fn closure_acts_as_validator() {
        let validator = |session: &Session| {
            if session.username == "anon" {
                Err(SessionRejection::new("anonymous callers not allowed"))
            } else {
                Ok(())
            }
        };

        assert!(validator.check(&Session::new("alice", "t", "app")).is_ok());
        let err = validator
            .check(&Session::new("anon", "t", "app"))
            .unwrap_err();
        assert!(err.reason.contains("anonymous"));
    }
}
