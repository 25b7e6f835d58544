use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use wirecall_codec::{BufferPool, CodecError, EnvelopeCodec, DEFAULT_MAX_FRAME};
use wirecall_proto::{Failure, RequestEnvelope, ResponseEnvelope, SessionValidator, Status};

use crate::context::{CallContext, ContextSlot};
use crate::error::Result;
use crate::registry::MethodRegistry;

/// Walks one inbound call from handshake to response.
///
/// The walk is fixed: read the handshake, decode the request, look the
/// method up, check the argument count, run the session validators in
/// order, invoke the handler inside an entered context, write the response.
/// Every failure before the handler short-circuits into an error response;
/// the handler is never invoked for a call that fails an earlier step.
pub struct Dispatcher {
    registry: Arc<MethodRegistry>,
    validators: Vec<Box<dyn SessionValidator>>,
    pool: Arc<BufferPool>,
    max_frame: usize,
}

impl Dispatcher {
    pub fn new(registry: Arc<MethodRegistry>, pool: Arc<BufferPool>) -> Self {
        Self {
            registry,
            validators: Vec::new(),
            pool,
            max_frame: DEFAULT_MAX_FRAME,
        }
    }

    /// Append a session validator. Validators run in registration order and
    /// the first rejection wins.
    pub fn with_validator<V: SessionValidator + 'static>(mut self, validator: V) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn with_max_frame(mut self, max_frame: usize) -> Self {
        self.max_frame = max_frame;
        self
    }

    /// Serve exactly one call on `stream`. `peer` labels the caller in
    /// logs and is exposed to handlers through the context.
    ///
    /// Returns `Err` only when no response could be produced at all
    /// (broken handshake, dead socket, exhausted pool). Anything the
    /// protocol can express travels back inside the response envelope
    /// and counts as a served call.
    pub fn serve_call<S: Read + Write>(&self, stream: &mut S, peer: &str) -> Result<()> {
        let started = Instant::now();
        let call_id = Uuid::new_v4().to_string();
        let span = info_span!("call", id = %call_id, %peer);
        let _entered = span.enter();

        let codec = EnvelopeCodec::accept(stream, Arc::clone(&self.pool))?
            .with_max_frame(self.max_frame);
        debug!(handshake = ?codec.handshake(), "handshake read");

        let request = match codec.read_request(stream) {
            Ok(request) => request,
            Err(err) if is_fatal(&err) => return Err(err.into()),
            Err(err) => {
                warn!(%err, "request did not decode");
                let failure = Failure::null_request().with_detail(err.to_string());
                let response = ResponseEnvelope::failed(failure);
                codec.write_response(&response, stream)?;
                return Ok(());
            }
        };

        let response = self.respond(&request, &call_id, peer);
        codec.write_response(&response, stream)?;

        let outcome = match response.status {
            Status::Ok => "ok",
            Status::Error => "error",
        };
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            outcome, "call served"
        );
        Ok(())
    }

    /// Produce the response for a decoded request. Pure with respect to the
    /// stream, so it is directly testable without sockets.
    pub fn respond(&self, request: &RequestEnvelope, call_id: &str, peer: &str) -> ResponseEnvelope {
        if request.method_identity.trim().is_empty() {
            warn!("request carries a blank method identity");
            return ResponseEnvelope::failed(Failure::null_request());
        }

        let method = match self.registry.lookup(&request.method_identity) {
            Some(method) => method,
            None => {
                warn!(identity = %request.method_identity, "method not found");
                return ResponseEnvelope::failed(Failure::method_not_found(
                    &request.method_identity,
                ));
            }
        };

        debug!(method = method.name(), "method resolved");

        if request.arguments.len() != method.arity() {
            warn!(
                method = method.name(),
                declared = method.arity(),
                supplied = request.arguments.len(),
                "arity mismatch"
            );
            return ResponseEnvelope::failed(Failure::arity_mismatch(
                method.name(),
                method.arity(),
                request.arguments.len(),
            ));
        }

        for validator in &self.validators {
            if let Err(rejection) = validator.check(&request.session) {
                warn!(
                    method = method.name(),
                    username = %request.session.username,
                    reason = %rejection.reason,
                    "session rejected"
                );
                return ResponseEnvelope::failed(Failure::session_rejected(rejection.reason));
            }
        }

        // Each call gets its own slot so concurrent dispatches never see
        // one another's session, only their own reentrant nesting.
        let slot = Arc::new(ContextSlot::new());
        let _guard = slot.enter(request.session.clone());
        let ctx = CallContext::new(
            request.session.clone(),
            call_id.to_string(),
            peer.to_string(),
            method.name().to_string(),
            request.method_identity.clone(),
            slot,
        );

        match method.invoke(&ctx, &request.arguments) {
            Ok(result) => ResponseEnvelope::ok(result),
            Err(err) => {
                warn!(method = method.name(), error = %err.message, "handler failed");
                let mut failure = Failure::remote_invocation(err.message);
                if let Some(detail) = err.detail {
                    failure = failure.with_detail(detail);
                }
                ResponseEnvelope::failed(failure)
            }
        }
    }
}

/// Errors that leave no channel to answer on.
fn is_fatal(err: &CodecError) -> bool {
    matches!(
        err,
        CodecError::Io(_) | CodecError::ConnectionClosed | CodecError::Pool(_)
    )
}
