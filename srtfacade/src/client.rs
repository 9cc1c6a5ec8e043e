use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::context::{Callbacks, ConnectionInformation, NetworkConnection};
use crate::engine::EventEngine;
use crate::error::FacadeError;
use crate::registry::Registry;
use crate::sockets::SocketTable;
use crate::sys::{Options, Poller, Socket};

/// Blocking-connect attempt with bounded timeout; on success, runs its own
/// recv/dispatch loop; on broken, reconnects until `stop`. There is no
/// backoff beyond the connect timeout itself.
///
/// Shares its Registry/SocketTable/Poller with the Facade so that
/// `sendData`/`getStatistics` can reach the live connection by the same
/// handle-keyed lookup path the server side uses; each reconnect attempt
/// simply clears and repopulates them with the one new socket.
pub struct ClientLoop {
    remote_addr: SocketAddr,
    local_addr: Option<SocketAddr>,
    opt: Options,
    max_payload: usize,
    callbacks: Arc<Callbacks>,
    ctx: NetworkConnection,
    active: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
    bound_socket: Arc<AtomicU32>,
    bound_port: Arc<AtomicU32>,
    server_ctx: Arc<RwLock<Option<(u32, NetworkConnection)>>>,
    registry: Arc<Registry>,
    sockets: Arc<SocketTable>,
}

impl ClientLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        remote_addr: SocketAddr,
        local_addr: Option<SocketAddr>,
        opt: Options,
        max_payload: usize,
        callbacks: Arc<Callbacks>,
        ctx: NetworkConnection,
        active: Arc<AtomicBool>,
        connected: Arc<AtomicBool>,
        bound_socket: Arc<AtomicU32>,
        bound_port: Arc<AtomicU32>,
        server_ctx: Arc<RwLock<Option<(u32, NetworkConnection)>>>,
        registry: Arc<Registry>,
        sockets: Arc<SocketTable>,
    ) -> Self {
        Self {
            remote_addr,
            local_addr,
            opt,
            max_payload,
            callbacks,
            ctx,
            active,
            connected,
            bound_socket,
            bound_port,
            server_ctx,
            registry,
            sockets,
        }
    }

    /// A single blocking connect attempt. Does not loop and does not touch
    /// any shared bookkeeping — callers decide what to do with the result.
    pub fn connect_once(&self) -> Result<Socket, FacadeError> {
        if let Some(local) = self.local_addr {
            log::debug!("connecting with preferred local endpoint {local}");
        }

        Socket::connect(self.remote_addr, &self.opt).map_err(FacadeError::ConnectFailed)
    }

    /// Installs an already-connected socket (used by the synchronous first
    /// attempt in `startClient`) and runs recv/dispatch until broken, then
    /// falls into the ordinary reconnect loop.
    pub fn run_with_connected(&self, socket: Socket) {
        self.run_connected(socket);
        self.run();
    }

    fn run_connected(&self, socket: Socket) {
        let handle = socket.raw() as u32;
        let info = ConnectionInformation::from_socket(&socket);

        self.bound_socket.store(handle, Ordering::Release);
        if let Some(local) = socket.local_addr() {
            self.bound_port.store(local.port() as u32, Ordering::Release);
        }
        *self.server_ctx.write() = Some((handle, self.ctx.clone()));
        self.connected.store(true, Ordering::Release);

        if let Some(cb) = &self.callbacks.connected_to_server {
            cb(&self.ctx, handle, &info);
        }

        let poller = match Poller::new().and_then(|p| p.add_socket(&socket).map(|_| p)) {
            Ok(poller) => poller,
            Err(err) => {
                log::warn!("failed to register client socket with poller: {err}");
                socket.close();
                self.teardown();
                return;
            }
        };

        self.registry.insert(handle, self.ctx.clone());
        self.sockets.insert(handle, socket);

        let engine = EventEngine::new(
            self.registry.clone(),
            self.sockets.clone(),
            Arc::new(poller),
            self.callbacks.clone(),
            self.active.clone(),
            self.max_payload,
        );

        while self.active.load(Ordering::Acquire) && !self.sockets.is_empty() {
            engine.poll_once();
        }

        self.teardown();
    }

    fn teardown(&self) {
        self.connected.store(false, Ordering::Release);
        self.bound_socket.store(0, Ordering::Release);
        self.bound_port.store(0, Ordering::Release);
        *self.server_ctx.write() = None;
    }

    /// Runs the reconnect loop until `stop` is requested.
    pub fn run(&self) {
        while self.active.load(Ordering::Acquire) {
            match self.connect_once() {
                Ok(socket) => self.run_connected(socket),
                Err(err) => {
                    log::debug!("connect attempt failed: {err}");

                    if !self.active.load(Ordering::Acquire) {
                        break;
                    }

                    // No backoff beyond the connect timeout itself: loop
                    // straight back into another attempt.
                }
            }
        }
    }
}
