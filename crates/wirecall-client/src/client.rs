use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info_span, warn};

use wirecall_codec::{BufferPool, CodecError, EnvelopeCodec, DEFAULT_POOL_CAPACITY};
use wirecall_proto::{
    Failure, MethodHandle, RequestEnvelope, Session, SessionRetriever, Status, Value,
};
use wirecall_transport::Endpoint;

use crate::config::WireConfig;
use crate::error::{ClientError, Result};

/// Sink for invocation errors.
///
/// When one is installed, `invoke` delivers every error here instead of
/// returning it, and the call itself resolves to `Value::Null`. Use this
/// when the caller treats failures as events (log, count, alert) rather
/// than control flow.
pub trait FailureHandler: Send + Sync {
    fn on_failure(&self, error: &ClientError);
}

impl<F> FailureHandler for F
where
    F: Fn(&ClientError) + Send + Sync,
{
    fn on_failure(&self, error: &ClientError) {
        self(error)
    }
}

/// Client invocation engine. One connection per call: connect, handshake,
/// write the request, read the response, close.
pub struct Client {
    endpoint: Endpoint,
    config: WireConfig,
    pool: Arc<BufferPool>,
    session_retriever: Option<Box<dyn SessionRetriever>>,
    failure_handler: Option<Box<dyn FailureHandler>>,
}

impl Client {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            config: WireConfig::default(),
            pool: Arc::new(BufferPool::new(DEFAULT_POOL_CAPACITY)),
            session_retriever: None,
            failure_handler: None,
        }
    }

    pub fn with_config(mut self, config: WireConfig) -> Self {
        self.config = config;
        self
    }

    /// Share a buffer pool with other clients instead of owning one.
    pub fn with_pool(mut self, pool: Arc<BufferPool>) -> Self {
        self.pool = pool;
        self
    }

    /// Supply the session attached to outgoing calls. Without one, calls
    /// carry the anonymous session.
    pub fn with_session_retriever<R: SessionRetriever + 'static>(mut self, retriever: R) -> Self {
        self.session_retriever = Some(Box::new(retriever));
        self
    }

    pub fn with_failure_handler<H: FailureHandler + 'static>(mut self, handler: H) -> Self {
        self.failure_handler = Some(Box::new(handler));
        self
    }

    /// Invoke a remote method and wait for its result.
    ///
    /// With a failure handler installed this never returns `Err`: the error
    /// goes to the handler and the call yields `Value::Null`.
    pub fn invoke(&self, handle: &MethodHandle, arguments: Vec<Value>) -> Result<Value> {
        let session = match &self.session_retriever {
            Some(retriever) => retriever.session(),
            None => Session::anonymous(),
        };
        self.invoke_with_session(handle, session, arguments)
    }

    /// Invoke with an explicit session, bypassing the retriever.
    pub fn invoke_with_session(
        &self,
        handle: &MethodHandle,
        session: Session,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        let span = info_span!("invoke", method = handle.name());
        let _entered = span.enter();
        let started = Instant::now();

        let outcome = self.invoke_inner(handle, session, arguments);
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = outcome.is_ok(),
            "invocation finished"
        );

        match outcome {
            Err(err) => {
                if let Some(handler) = &self.failure_handler {
                    warn!(%err, "delivering invocation error to failure handler");
                    handler.on_failure(&err);
                    Ok(Value::Null)
                } else {
                    Err(err)
                }
            }
            ok => ok,
        }
    }

    fn invoke_inner(
        &self,
        handle: &MethodHandle,
        session: Session,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        let mut stream = self
            .endpoint
            .connect_with_timeout(self.config.read_timeout)?;

        let codec = EnvelopeCodec::new(self.config.handshake(), Arc::clone(&self.pool));
        codec.write_handshake(&mut stream)?;

        let request = RequestEnvelope::new(handle.identity(), session, Some(arguments));
        codec.write_request(&request, &mut stream)?;

        let response = match codec.read_response(&mut stream) {
            Ok(response) => response,
            Err(CodecError::ConnectionClosed) => return Err(ClientError::NullResponse),
            Err(err) => return Err(err.into()),
        };

        match response.status {
            Status::Ok => Ok(response.result.unwrap_or(Value::Null)),
            Status::Error => {
                let failure = response.error.unwrap_or_else(|| {
                    Failure::remote_invocation("server reported an error without details")
                });
                Err(ClientError::Remote(failure))
            }
        }
    }
}
