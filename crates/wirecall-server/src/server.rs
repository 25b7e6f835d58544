use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use tracing::{info, warn};

use wirecall_transport::CallListener;

use crate::dispatch::Dispatcher;
use crate::error::Result;

/// Serving loop: one accepted connection is one call, handled on its own
/// thread. The connection is closed once the response is written.
pub struct Server {
    listener: CallListener,
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    pub fn new(listener: CallListener, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            listener,
            dispatcher,
        }
    }

    /// The bound TCP address, when listening on TCP.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept and serve exactly one call on the calling thread.
    pub fn serve_one(&self) -> Result<()> {
        let mut stream = self.listener.accept()?;
        let peer = stream.peer_label();
        self.dispatcher.serve_call(&mut stream, &peer)
    }

    /// Accept forever, spawning a thread per call. Returns only when the
    /// listener itself fails.
    pub fn run(&self) -> Result<()> {
        info!(addr = ?self.local_addr(), "server accepting calls");
        loop {
            let mut stream = self.listener.accept()?;
            let dispatcher = Arc::clone(&self.dispatcher);
            thread::spawn(move || {
                let peer = stream.peer_label();
                if let Err(err) = dispatcher.serve_call(&mut stream, &peer) {
                    warn!(%err, %peer, "call aborted");
                }
            });
        }
    }
}
