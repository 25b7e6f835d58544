use std::collections::HashMap;

use tracing::{debug, warn};

use wirecall_proto::{MethodHandle, Value};

use crate::context::CallContext;
use crate::error::HandlerError;

type HandlerFn = dyn Fn(&CallContext, &[Value]) -> std::result::Result<Value, HandlerError>
    + Send
    + Sync;

/// One invocable method: its human name (for log lines), its declared
/// parameter count, and the closure that runs it.
pub struct RegisteredMethod {
    name: String,
    arity: usize,
    handler: Box<HandlerFn>,
}

impl RegisteredMethod {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn invoke(
        &self,
        ctx: &CallContext,
        args: &[Value],
    ) -> std::result::Result<Value, HandlerError> {
        (self.handler)(ctx, args)
    }
}

/// Table of methods keyed by wire identity.
///
/// Registration is explicit: the server names each method it exposes via a
/// [`MethodHandle`], and anything not registered is unreachable from the
/// wire. Registering the same handle twice replaces the earlier handler.
#[derive(Default)]
pub struct MethodRegistry {
    methods: HashMap<String, RegisteredMethod>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, handle: &MethodHandle, handler: F)
    where
        F: Fn(&CallContext, &[Value]) -> std::result::Result<Value, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        let identity = handle.identity().to_string();
        let method = RegisteredMethod {
            name: handle.name().to_string(),
            arity: handle.arity(),
            handler: Box::new(handler),
        };
        if self.methods.insert(identity, method).is_some() {
            warn!(method = handle.name(), "replacing existing registration");
        } else {
            debug!(method = handle.name(), arity = handle.arity(), "method registered");
        }
    }

    pub fn lookup(&self, identity: &str) -> Option<&RegisteredMethod> {
        self.methods.get(identity)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
