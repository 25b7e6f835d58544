use std::net::TcpStream;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::stream::CallStream;

/// How long a connected client waits for the server's reply before the
/// socket read fails.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(500_000);

/// Where a call connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp(String),
    #[cfg(unix)]
    Unix(std::path::PathBuf),
}

impl Endpoint {
    pub fn tcp(addr: impl Into<String>) -> Self {
        Self::Tcp(addr.into())
    }

    #[cfg(unix)]
    pub fn unix(path: impl Into<std::path::PathBuf>) -> Self {
        Self::Unix(path.into())
    }

    /// Connect with the default read timeout.
    pub fn connect(&self) -> Result<CallStream> {
        self.connect_with_timeout(DEFAULT_READ_TIMEOUT)
    }

    /// Open a blocking connection and arm its read timeout.
    pub fn connect_with_timeout(&self, read_timeout: Duration) -> Result<CallStream> {
        let stream = match self {
            Self::Tcp(addr) => {
                let stream = TcpStream::connect(addr).map_err(|e| TransportError::Connect {
                    endpoint: addr.clone(),
                    source: e,
                })?;
                debug!(%addr, "connected over tcp");
                CallStream::from_tcp(stream)
            }
            #[cfg(unix)]
            Self::Unix(path) => {
                let stream = std::os::unix::net::UnixStream::connect(path).map_err(|e| {
                    TransportError::Connect {
                        endpoint: path.display().to_string(),
                        source: e,
                    }
                })?;
                debug!(?path, "connected over unix socket");
                CallStream::from_unix(stream)
            }
        };
        stream.set_read_timeout(Some(read_timeout))?;
        Ok(stream)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tcp(addr) => write!(f, "tcp://{addr}"),
            #[cfg(unix)]
            Self::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}
