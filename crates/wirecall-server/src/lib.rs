//! Server half of wirecall: a registry of invocable methods, a dispatcher
//! that walks one call from handshake to response, and a serving loop that
//! runs one dispatch per accepted connection.

pub mod context;
pub mod dispatch;
pub mod error;
pub mod registry;
pub mod server;

pub use context::{CallContext, ContextGuard, ContextSlot};
pub use dispatch::Dispatcher;
pub use error::{DispatchError, HandlerError, Result};
pub use registry::MethodRegistry;
pub use server::Server;
