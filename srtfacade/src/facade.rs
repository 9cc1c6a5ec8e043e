use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Mutex, RwLock};

use crate::acceptor::Acceptor;
use crate::client::ClientLoop;
use crate::config::Configuration;
use crate::context::{Callbacks, NetworkConnection};
use crate::engine::{max_payload_size, EventEngine};
use crate::error::FacadeError;
use crate::registry::Registry;
use crate::sockets::SocketTable;
use crate::sys::options::Role;
use crate::sys::{BindStageError, Options, Poller, Server, TraceStats};

fn bind_error(err: BindStageError) -> FacadeError {
    match err {
        BindStageError::Bind(err) => FacadeError::BindFailed(err),
        BindStageError::Listen(err) => FacadeError::ListenFailed(err),
    }
}

/// The instance's current mode. Transitions only `Unknown → Server|Client`
/// on a successful start, and back to `Unknown` on `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Unknown,
    Server,
    Client,
}

struct ServerState {
    active: Arc<AtomicBool>,
    registry: Arc<Registry>,
    sockets: Arc<SocketTable>,
    bound_port: Arc<AtomicU32>,
    bound_socket: Arc<AtomicU32>,
    threads: Vec<JoinHandle<()>>,
    max_payload: usize,
    /// Present only in multi-client mode, where the listening socket stays
    /// open for the instance's whole lifetime and must be closed by `stop`
    /// to unblock the Acceptor's in-flight accept. Single-client mode
    /// recreates and destroys its own listener every cycle instead.
    listener: Option<Arc<Server>>,
}

struct ClientState {
    active: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
    bound_socket: Arc<AtomicU32>,
    bound_port: Arc<AtomicU32>,
    server_ctx: Arc<RwLock<Option<(u32, NetworkConnection)>>>,
    sockets: Arc<SocketTable>,
    thread: Option<JoinHandle<()>>,
    max_payload: usize,
}

/// Owns the component assembly and lifecycle atomics for one instance. The
/// public `startServer`/`startClient`/`stop`/`sendData`/introspection
/// surface lives here.
pub struct Facade {
    mode: Mutex<Mode>,
    server: Mutex<Option<ServerState>>,
    client: Mutex<Option<ClientState>>,
}

impl Default for Facade {
    fn default() -> Self {
        Self::new()
    }
}

impl Facade {
    pub fn new() -> Self {
        Self {
            mode: Mutex::new(Mode::Unknown),
            server: Mutex::new(None),
            client: Mutex::new(None),
        }
    }

    pub fn current_mode(&self) -> Mode {
        *self.mode.lock()
    }

    fn resolve(host: &str, port: u16) -> Result<SocketAddr, FacadeError> {
        if let Ok(addr) = format!("{host}:{port}").parse::<SocketAddr>() {
            return Ok(addr);
        }

        (host, port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut it| it.next())
            .ok_or_else(|| FacadeError::AddressResolutionFailed(host.to_string()))
    }

    fn listener_options(config: &Configuration) -> Options {
        Options {
            role: Role::Listener,
            reorder_window: config.reorder_window,
            latency: config.latency,
            overhead_bw_pct: config.overhead_bw_pct,
            mtu: config.mtu,
            peer_idle_timeout: config.peer_idle_timeout,
            passphrase: config.passphrase.clone(),
            stream_id: String::new(),
            ipv6_only: config.ipv6_only,
        }
    }

    fn caller_options(config: &Configuration) -> Options {
        Options {
            role: Role::Caller,
            reorder_window: config.reorder_window,
            latency: config.latency,
            overhead_bw_pct: config.overhead_bw_pct,
            mtu: config.mtu,
            peer_idle_timeout: config.peer_idle_timeout,
            passphrase: config.passphrase.clone(),
            stream_id: config.stream_id.clone(),
            ipv6_only: false,
        }
    }

    /// Rejects a configuration that would otherwise fail deep inside the
    /// socket factory with a confusing FFI error: a missing mandatory
    /// callback, an MTU too small to carry any live-mode payload, or a PSK
    /// outside SRT's 10-79 byte passphrase length.
    fn validate_configuration(
        config: &Configuration,
        callbacks: &Callbacks,
        is_server: bool,
    ) -> Result<(), FacadeError> {
        if is_server && callbacks.client_connected.is_none() {
            return Err(FacadeError::ConfigurationRejected(
                "clientConnected is mandatory for startServer".to_string(),
            ));
        }

        if max_payload_size(config.mtu) == 0 {
            return Err(FacadeError::ConfigurationRejected(format!(
                "mtu {} is too small to carry a live-mode payload",
                config.mtu
            )));
        }

        if !config.passphrase.is_empty() && !(10..=79).contains(&config.passphrase.len()) {
            return Err(FacadeError::ConfigurationRejected(format!(
                "passphrase length {} is outside the 10-79 byte range SRT requires",
                config.passphrase.len()
            )));
        }

        Ok(())
    }

    /// Starts a server. Fails (returns `false`) if `clientConnected` isn't
    /// installed, if the configuration is otherwise rejected, if the
    /// configured address can't be resolved, or if bind/listen fails.
    pub fn start_server(
        &self,
        config: Configuration,
        callbacks: Callbacks,
        server_ctx: Option<NetworkConnection>,
    ) -> bool {
        let mut mode = self.mode.lock();
        if *mode != Mode::Unknown {
            return false;
        }

        if let Err(err) = Self::validate_configuration(&config, &callbacks, true) {
            log::warn!("startServer: {err}");
            return false;
        }

        let addr = match Self::resolve(&config.local_host, config.local_port) {
            Ok(addr) => addr,
            Err(err) => {
                log::warn!("startServer: {err}");
                return false;
            }
        };

        let opt = Self::listener_options(&config);
        let callbacks = Arc::new(callbacks);
        let max_payload = max_payload_size(config.mtu);
        let active = Arc::new(AtomicBool::new(true));
        let registry = Arc::new(Registry::new());
        let sockets = Arc::new(SocketTable::new());
        let bound_port = Arc::new(AtomicU32::new(0));
        let bound_socket = Arc::new(AtomicU32::new(0));

        if config.single_client {
            let server = match Server::bind(addr, opt.clone(), 1) {
                Ok(server) => Arc::new(server),
                Err(err) => {
                    log::warn!("startServer: {}", bind_error(err));
                    return false;
                }
            };

            if let Some(local) = server.local_addr() {
                bound_port.store(local.port() as u32, Ordering::Release);
            }
            bound_socket.store(server.raw() as u32, Ordering::Release);

            let handle = {
                let active = active.clone();
                let registry = registry.clone();
                let sockets = sockets.clone();
                let callbacks = callbacks.clone();
                let bound_port = bound_port.clone();
                let bound_socket = bound_socket.clone();

                thread::Builder::new()
                    .name("srtfacade-single-client".to_string())
                    .spawn(move || {
                        Self::run_single_client_worker(
                            addr,
                            opt,
                            max_payload,
                            active,
                            registry,
                            sockets,
                            callbacks,
                            server_ctx,
                            bound_port,
                            bound_socket,
                            server,
                        )
                    })
                    .expect("failed to spawn single-client worker thread")
            };

            *self.server.lock() = Some(ServerState {
                active,
                registry,
                sockets,
                bound_port,
                bound_socket,
                threads: vec![handle],
                max_payload,
                listener: None,
            });
        } else {
            let server = match Server::bind(addr, opt, 16) {
                Ok(server) => Arc::new(server),
                Err(err) => {
                    log::warn!("startServer: {}", bind_error(err));
                    return false;
                }
            };

            if let Some(local) = server.local_addr() {
                bound_port.store(local.port() as u32, Ordering::Release);
            }
            bound_socket.store(server.raw() as u32, Ordering::Release);

            let poller = match Poller::new() {
                Ok(poller) => Arc::new(poller),
                Err(err) => {
                    log::warn!("startServer poller creation failed: {err}");
                    return false;
                }
            };

            let acceptor = Acceptor::new(
                server.clone(),
                registry.clone(),
                sockets.clone(),
                poller.clone(),
                callbacks.clone(),
                server_ctx,
                active.clone(),
            );
            let engine = EventEngine::new(
                registry.clone(),
                sockets.clone(),
                poller,
                callbacks,
                active.clone(),
                max_payload,
            );

            let acceptor_handle = thread::Builder::new()
                .name("srtfacade-acceptor".to_string())
                .spawn(move || acceptor.run())
                .expect("failed to spawn acceptor thread");
            let engine_handle = thread::Builder::new()
                .name("srtfacade-event-engine".to_string())
                .spawn(move || engine.run())
                .expect("failed to spawn event engine thread");

            *self.server.lock() = Some(ServerState {
                active,
                registry,
                sockets,
                bound_port,
                bound_socket,
                threads: vec![acceptor_handle, engine_handle],
                max_payload,
                listener: Some(server),
            });
        }

        *mode = Mode::Server;
        true
    }

    /// `first_server` is already bound and listening (synchronously, by the
    /// caller in `startServer`, so a bind failure is reported as `false`
    /// before this worker is even spawned); every subsequent cycle rebinds
    /// a fresh listener on its own.
    #[allow(clippy::too_many_arguments)]
    fn run_single_client_worker(
        addr: SocketAddr,
        opt: Options,
        max_payload: usize,
        active: Arc<AtomicBool>,
        registry: Arc<Registry>,
        sockets: Arc<SocketTable>,
        callbacks: Arc<Callbacks>,
        server_ctx: Option<NetworkConnection>,
        bound_port: Arc<AtomicU32>,
        bound_socket: Arc<AtomicU32>,
        first_server: Arc<Server>,
    ) {
        let mut next_server = Some(first_server);

        while active.load(Ordering::Acquire) {
            let server = match next_server.take() {
                Some(server) => server,
                None => match Server::bind(addr, opt.clone(), 1) {
                    Ok(server) => Arc::new(server),
                    Err(err) => {
                        log::warn!("single-client relisten: {}", bind_error(err));
                        break;
                    }
                },
            };

            if let Some(local) = server.local_addr() {
                bound_port.store(local.port() as u32, Ordering::Release);
            }
            bound_socket.store(server.raw() as u32, Ordering::Release);

            let poller = match Poller::new() {
                Ok(poller) => Arc::new(poller),
                Err(err) => {
                    log::warn!("single-client poller creation failed: {err}");
                    break;
                }
            };

            let acceptor = Acceptor::new(
                server.clone(),
                registry.clone(),
                sockets.clone(),
                poller.clone(),
                callbacks.clone(),
                server_ctx.clone(),
                active.clone(),
            );

            if !acceptor.accept_one() {
                break;
            }

            server.close();

            if !sockets.is_empty() {
                let engine = EventEngine::new(
                    registry.clone(),
                    sockets.clone(),
                    poller,
                    callbacks.clone(),
                    active.clone(),
                    max_payload,
                );

                while active.load(Ordering::Acquire) && !sockets.is_empty() {
                    engine.poll_once();
                }
            }
        }
    }

    /// Starts a client. `local_addr`, when given, binds the caller socket
    /// to a specific local endpoint before connecting.
    pub fn start_client(
        &self,
        config: Configuration,
        local_addr: Option<(String, u16)>,
        callbacks: Callbacks,
        ctx: NetworkConnection,
    ) -> bool {
        let mut mode = self.mode.lock();
        if *mode != Mode::Unknown {
            return false;
        }

        if let Err(err) = Self::validate_configuration(&config, &callbacks, false) {
            log::warn!("startClient: {err}");
            return false;
        }

        let remote = match Self::resolve(&config.remote_host, config.remote_port) {
            Ok(addr) => addr,
            Err(err) => {
                log::warn!("startClient: {err}");
                return false;
            }
        };

        let resolved_local = match &local_addr {
            Some((host, port)) => match Self::resolve(host, *port) {
                Ok(addr) => Some(addr),
                Err(err) => {
                    log::warn!("startClient: {err}");
                    return false;
                }
            },
            None => None,
        };

        let opt = Self::caller_options(&config);
        let max_payload = max_payload_size(config.mtu);
        let callbacks = Arc::new(callbacks);
        let active = Arc::new(AtomicBool::new(true));
        let connected = Arc::new(AtomicBool::new(false));
        let bound_socket = Arc::new(AtomicU32::new(0));
        let bound_port = Arc::new(AtomicU32::new(0));
        let server_ctx = Arc::new(RwLock::new(None));
        let registry = Arc::new(Registry::new());
        let sockets = Arc::new(SocketTable::new());

        let client_loop = ClientLoop::new(
            remote,
            resolved_local,
            opt,
            max_payload,
            callbacks,
            ctx,
            active.clone(),
            connected.clone(),
            bound_socket.clone(),
            bound_port.clone(),
            server_ctx.clone(),
            registry,
            sockets.clone(),
        );

        let thread = if config.fail_on_connect_error {
            match client_loop.connect_once() {
                Ok(socket) => Some(
                    thread::Builder::new()
                        .name("srtfacade-client".to_string())
                        .spawn(move || client_loop.run_with_connected(socket))
                        .expect("failed to spawn client thread"),
                ),
                Err(err) => {
                    log::warn!("startClient initial connect failed: {err}");
                    return false;
                }
            }
        } else {
            Some(
                thread::Builder::new()
                    .name("srtfacade-client".to_string())
                    .spawn(move || client_loop.run())
                    .expect("failed to spawn client thread"),
            )
        };

        *self.client.lock() = Some(ClientState {
            active,
            connected,
            bound_socket,
            bound_port,
            server_ctx,
            sockets,
            thread,
            max_payload,
        });

        *mode = Mode::Client;
        true
    }

    /// Idempotent. Clears the active atomic, closes the owning socket to
    /// unblock any in-flight syscall, joins the instance's threads, and for
    /// a server drains the Registry invoking `clientDisconnected` for every
    /// connection still open.
    pub fn stop(&self) -> bool {
        let mut mode = self.mode.lock();

        if let Some(mut state) = self.server.lock().take() {
            state.active.store(false, Ordering::Release);

            if let Some(listener) = &state.listener {
                listener.close();
            }

            for (_handle, socket) in state.sockets.drain() {
                socket.close();
            }

            for handle in state.threads.drain(..) {
                let _ = handle.join();
            }

            for (handle, _ctx) in state.registry.clear() {
                log::debug!("stop: closing socket {handle} still held in registry");
            }
        }

        if let Some(mut state) = self.client.lock().take() {
            state.active.store(false, Ordering::Release);

            for (_handle, socket) in state.sockets.drain() {
                socket.close();
            }

            if let Some(thread) = state.thread.take() {
                let _ = thread.join();
            }

            state.connected.store(false, Ordering::Release);
        }

        *mode = Mode::Unknown;
        true
    }

    /// Sends one message. `target` selects the socket in server mode and is
    /// ignored in client mode (the single cached connection is used
    /// instead). Fails fast without touching the socket if `data` exceeds
    /// the live-mode payload maximum.
    pub fn send_data(&self, data: &[u8], target: Option<u32>) -> bool {
        match *self.mode.lock() {
            Mode::Server => {
                let server = self.server.lock();
                let Some(state) = server.as_ref() else {
                    return false;
                };
                let Some(target) = target else {
                    return false;
                };
                if let Err(err) = Self::check_payload_size(data.len(), state.max_payload) {
                    log::debug!("sendData rejected: {err}");
                    return false;
                }
                match state.sockets.send(target, data) {
                    Ok(()) => true,
                    Err(err) => {
                        log::debug!("sendData: {}", FacadeError::SendFailed(err));
                        false
                    }
                }
            }
            Mode::Client => {
                let client = self.client.lock();
                let Some(state) = client.as_ref() else {
                    return false;
                };
                let handle = state.bound_socket.load(Ordering::Acquire);
                if handle == 0 {
                    return false;
                }
                if let Err(err) = Self::check_payload_size(data.len(), state.max_payload) {
                    log::debug!("sendData rejected: {err}");
                    return false;
                }
                match state.sockets.send(handle, data) {
                    Ok(()) => true,
                    Err(err) => {
                        log::debug!("sendData: {}", FacadeError::SendFailed(err));
                        false
                    }
                }
            }
            Mode::Unknown => false,
        }
    }

    fn check_payload_size(size: usize, max: usize) -> Result<(), FacadeError> {
        if size > max {
            return Err(FacadeError::MessageTooLarge { size, max });
        }

        Ok(())
    }

    pub fn get_statistics(&self, target: Option<u32>, clear: bool) -> Option<TraceStats> {
        match *self.mode.lock() {
            Mode::Server => {
                let server = self.server.lock();
                let state = server.as_ref()?;
                state.sockets.get_stats(target?, clear).ok()
            }
            Mode::Client => {
                let client = self.client.lock();
                let state = client.as_ref()?;
                let handle = state.bound_socket.load(Ordering::Acquire);
                if handle == 0 {
                    return None;
                }
                state.sockets.get_stats(handle, clear).ok()
            }
            Mode::Unknown => None,
        }
    }

    pub fn active_clients(&self) -> Vec<(u32, NetworkConnection)> {
        match self.server.lock().as_ref() {
            Some(state) => state.registry.snapshot(),
            None => Vec::new(),
        }
    }

    pub fn active_client_sockets(&self) -> Vec<u32> {
        match self.server.lock().as_ref() {
            Some(state) => state.registry.sockets(),
            None => Vec::new(),
        }
    }

    pub fn connected_server(&self) -> (u32, Option<NetworkConnection>) {
        match self.client.lock().as_ref() {
            Some(state) => match state.server_ctx.read().clone() {
                Some((handle, ctx)) => (handle, Some(ctx)),
                None => (0, None),
            },
            None => (0, None),
        }
    }

    pub fn is_connected_to_server(&self) -> bool {
        self.client
            .lock()
            .as_ref()
            .map(|state| state.connected.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    pub fn bound_socket(&self) -> u32 {
        if let Some(state) = self.server.lock().as_ref() {
            return state.bound_socket.load(Ordering::Acquire);
        }

        if let Some(state) = self.client.lock().as_ref() {
            return state.bound_socket.load(Ordering::Acquire);
        }

        0
    }

    pub fn locally_bound_port(&self) -> u16 {
        if let Some(state) = self.server.lock().as_ref() {
            return state.bound_port.load(Ordering::Acquire) as u16;
        }

        if let Some(state) = self.client.lock().as_ref() {
            return state.bound_port.load(Ordering::Acquire) as u16;
        }

        0
    }
}
