use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::context::{Callbacks, ConnectionInformation};
use crate::registry::Registry;
use crate::sockets::SocketTable;
use crate::sys::{Poller, Server};

/// Drives the listening socket: a blocking accept loop that validates each
/// peer through the user's `clientConnected` callback before admitting it
/// into the Registry and Poller.
pub struct Acceptor {
    server: Arc<Server>,
    registry: Arc<Registry>,
    sockets: Arc<SocketTable>,
    poller: Arc<Poller>,
    callbacks: Arc<Callbacks>,
    server_ctx: Option<crate::context::NetworkConnection>,
    active: Arc<AtomicBool>,
}

impl Acceptor {
    pub fn new(
        server: Arc<Server>,
        registry: Arc<Registry>,
        sockets: Arc<SocketTable>,
        poller: Arc<Poller>,
        callbacks: Arc<Callbacks>,
        server_ctx: Option<crate::context::NetworkConnection>,
        active: Arc<AtomicBool>,
    ) -> Self {
        Self {
            server,
            registry,
            sockets,
            poller,
            callbacks,
            server_ctx,
            active,
        }
    }

    /// Runs one accept cycle: blocks on `accept`, validates, and either
    /// admits or rejects the peer. Returns `false` once the listener has
    /// been shut down from underneath the call (the signal to stop
    /// looping); logs and continues on any other accept error.
    pub fn accept_one(&self) -> bool {
        let (socket, peer_addr) = match self.server.accept() {
            Ok(pair) => pair,
            Err(err) => {
                if !self.active.load(Ordering::Acquire) {
                    return false;
                }

                log::warn!("accept failed: {err}");
                return true;
            }
        };

        let info = ConnectionInformation::from_socket(&socket);
        let handle = socket.raw() as u32;

        let new_ctx = self
            .callbacks
            .client_connected
            .as_ref()
            .and_then(|cb| cb(peer_addr, handle, self.server_ctx.as_ref(), &info));

        match new_ctx {
            Some(ctx) => {
                if let Err(err) = self.poller.add_socket(&socket) {
                    log::warn!("failed to register accepted socket {handle} with poller: {err}");
                    socket.close();
                    return true;
                }

                self.registry.insert(handle, ctx);
                self.sockets.insert(handle, socket);
            }
            None => {
                log::debug!("clientConnected rejected peer {peer_addr}");
                socket.close();
            }
        }

        true
    }

    /// Runs until `active` is cleared or the listener reports shutdown.
    pub fn run(&self) {
        while self.active.load(Ordering::Acquire) {
            if !self.accept_one() {
                break;
            }
        }
    }
}
