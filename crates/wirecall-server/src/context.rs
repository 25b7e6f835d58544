use std::sync::{Arc, Mutex};

use wirecall_proto::Session;

/// Per-call view a handler receives: the authenticated session, the call id
/// used in log lines, the caller's address, and the slot tracking reentrant
/// invocations within this call.
pub struct CallContext {
    session: Session,
    call_id: String,
    peer: String,
    method_name: String,
    method_identity: String,
    slot: Arc<ContextSlot>,
}

impl CallContext {
    pub(crate) fn new(
        session: Session,
        call_id: String,
        peer: String,
        method_name: String,
        method_identity: String,
        slot: Arc<ContextSlot>,
    ) -> Self {
        Self {
            session,
            call_id,
            peer,
            method_name,
            method_identity,
            slot,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    /// Network address (or transport label) of the caller.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Declared name of the method being invoked.
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// Wire identity the request addressed.
    pub fn method_identity(&self) -> &str {
        &self.method_identity
    }

    /// How many invocations are stacked in this slot, including this one.
    pub fn depth(&self) -> usize {
        self.slot.depth()
    }

    pub fn slot(&self) -> &Arc<ContextSlot> {
        &self.slot
    }
}

/// Explicit holder for the session of the invocation in flight.
///
/// Every dispatch owns its own slot; concurrent calls never share one, so
/// `current` and `depth` only ever reflect the nesting of the call the
/// handler is running in. Handlers that call other local methods push a
/// nested entry, so the depth tells reentrant dispatch apart from a fresh
/// top-level call. When nothing is entered, [`ContextSlot::current`] falls
/// back to the anonymous session rather than reporting absence.
#[derive(Default)]
pub struct ContextSlot {
    stack: Mutex<Vec<Session>>,
}

impl ContextSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a session for the duration of the returned guard.
    pub fn enter(self: &Arc<Self>, session: Session) -> ContextGuard {
        self.stack
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(session);
        ContextGuard {
            slot: Arc::clone(self),
        }
    }

    /// The innermost entered session, or the anonymous session when the
    /// slot is empty.
    pub fn current(&self) -> Session {
        self.stack
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
            .unwrap_or_else(Session::anonymous)
    }

    /// Number of stacked invocations. Zero outside any dispatch.
    pub fn depth(&self) -> usize {
        self.stack.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Pops the slot entry it was created for when dropped, so the context
/// unwinds on every exit path of a dispatch.
pub struct ContextGuard {
    slot: Arc<ContextSlot>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.slot
            .stack
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slot_reports_anonymous() {
        let slot = Arc::new(ContextSlot::new());
        assert_eq!(slot.depth(), 0);
        let session = slot.current();
        assert_eq!(session.username, "unknown");
        assert_eq!(session.client_app, "unknown_client");
    }

    #[test]
    fn enter_and_drop_track_depth() {
        let slot = Arc::new(ContextSlot::new());
        let outer = slot.enter(Session::new("alice", "t1", "app"));
        assert_eq!(slot.depth(), 1);
        assert_eq!(slot.current().username, "alice");

        {
            let _inner = slot.enter(Session::new("bob", "t2", "app"));
            assert_eq!(slot.depth(), 2);
            assert_eq!(slot.current().username, "bob");
        }

        assert_eq!(slot.depth(), 1);
        assert_eq!(slot.current().username, "alice");
        drop(outer);
        assert_eq!(slot.depth(), 0);
    }
}
