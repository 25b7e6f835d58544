use std::net::{SocketAddr, TcpListener, ToSocketAddrs};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::CallStream;

/// Listening socket that yields one [`CallStream`] per incoming call.
pub struct CallListener {
    inner: ListenerInner,
}

enum ListenerInner {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix {
        listener: std::os::unix::net::UnixListener,
        path: std::path::PathBuf,
    },
}

impl CallListener {
    /// Bind a TCP listener. Pass port 0 to let the OS pick one; the chosen
    /// address is available through [`CallListener::local_addr`].
    pub fn bind_tcp(addr: impl ToSocketAddrs + std::fmt::Debug) -> Result<Self> {
        let listener = TcpListener::bind(&addr).map_err(|e| TransportError::Bind {
            endpoint: format!("{addr:?}"),
            source: e,
        })?;
        info!(addr = ?listener.local_addr().ok(), "listening on tcp");
        Ok(Self {
            inner: ListenerInner::Tcp(listener),
        })
    }

    /// Bind a Unix domain socket listener, removing a stale socket file at
    /// the path first. Existing non-socket files are never removed.
    #[cfg(unix)]
    pub fn bind_unix(path: impl AsRef<std::path::Path>) -> Result<Self> {
        use std::os::unix::fs::FileTypeExt;

        let path = path.as_ref().to_path_buf();
        let bind_err = |e: std::io::Error| TransportError::Bind {
            endpoint: path.display().to_string(),
            source: e,
        };

        if path.exists() {
            let metadata = std::fs::symlink_metadata(&path).map_err(bind_err)?;
            if metadata.file_type().is_socket() {
                debug!(?path, "removing stale socket");
                std::fs::remove_file(&path).map_err(bind_err)?;
            } else {
                return Err(bind_err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "existing path is not a unix socket",
                )));
            }
        }

        let listener = std::os::unix::net::UnixListener::bind(&path).map_err(bind_err)?;
        info!(?path, "listening on unix domain socket");
        Ok(Self {
            inner: ListenerInner::Unix { listener, path },
        })
    }

    /// Accept one incoming connection (blocking).
    pub fn accept(&self) -> Result<CallStream> {
        match &self.inner {
            ListenerInner::Tcp(listener) => {
                let (stream, addr) = listener.accept().map_err(TransportError::Accept)?;
                debug!(%addr, "accepted tcp connection");
                Ok(CallStream::from_tcp(stream))
            }
            #[cfg(unix)]
            ListenerInner::Unix { listener, .. } => {
                let (stream, _addr) = listener.accept().map_err(TransportError::Accept)?;
                debug!("accepted unix connection");
                Ok(CallStream::from_unix(stream))
            }
        }
    }

    /// The bound TCP address, if this is a TCP listener.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.inner {
            ListenerInner::Tcp(listener) => listener.local_addr().ok(),
            #[cfg(unix)]
            ListenerInner::Unix { .. } => None,
        }
    }
}

impl Drop for CallListener {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let ListenerInner::Unix { path, .. } = &self.inner {
            use std::os::unix::fs::FileTypeExt;
            if let Ok(metadata) = std::fs::symlink_metadata(path) {
                if metadata.file_type().is_socket() {
                    debug!(?path, "cleaning up socket file");
                    let _ = std::fs::remove_file(path);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::thread;

    use crate::endpoint::Endpoint;

    use super::*;

    #[test]
    fn tcp_bind_accept_connect() {
        let listener = CallListener::bind_tcp("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let mut client = Endpoint::tcp(addr.to_string()).connect().unwrap();
            client.write_all(b"hello").unwrap();
        });

        let mut server = listener.accept().unwrap();
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        handle.join().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn unix_socket_file_cleaned_up_on_drop() {
        let dir = std::env::temp_dir().join(format!("wirecall-listener-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let sock_path = dir.join("cleanup.sock");

        let listener = CallListener::bind_unix(&sock_path).unwrap();
        assert!(sock_path.exists());
        drop(listener);
        assert!(!sock_path.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn unix_bind_rejects_existing_regular_file() {
        let dir = std::env::temp_dir().join(format!("wirecall-bind-file-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let sock_path = dir.join("not-a-socket.sock");
        std::fs::write(&sock_path, b"regular-file").unwrap();

        let result = CallListener::bind_unix(&sock_path);
        assert!(matches!(result, Err(TransportError::Bind { .. })));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
