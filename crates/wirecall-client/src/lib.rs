//! Client half of wirecall: per-call connection, handshake, request
//! write, response read, typed error propagation.

pub mod client;
pub mod config;
pub mod error;

pub use client::{Client, FailureHandler};
pub use config::WireConfig;
pub use error::{ClientError, Result};
