use std::{any::Any, fmt, net::SocketAddr, sync::Arc};

/// The application's opaque, per-connection payload.
///
/// A sum-of-anything handle rather than an inheritance hierarchy: the
/// application attaches any `Send + Sync` value at connect time and
/// downcasts it on its own terms wherever it's handed back.
#[derive(Clone)]
pub struct NetworkConnection(Arc<dyn Any + Send + Sync>);

impl NetworkConnection {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for NetworkConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkConnection").finish_non_exhaustive()
    }
}

/// Populated after a successful connect. Both fields carry sentinel values
/// when the underlying option couldn't be read back.
#[derive(Debug, Clone)]
pub struct ConnectionInformation {
    pub peer_version: String,
    pub negotiated_latency: i32,
    /// The stream id the peer presented at handshake time, empty if none
    /// was set. Populated from the accepted/connected socket itself, so
    /// the `clientConnected` callback can read back what a client sent
    /// with `Configuration::stream_id` without a separate accessor.
    pub stream_id: String,
}

impl ConnectionInformation {
    pub const UNKNOWN_VERSION: &'static str = "unknown";
    pub const UNKNOWN_LATENCY: i32 = -1;

    pub(crate) fn from_socket(socket: &crate::sys::Socket) -> Self {
        Self {
            peer_version: socket
                .peer_version()
                .unwrap_or_else(|| Self::UNKNOWN_VERSION.to_string()),
            negotiated_latency: socket.negotiated_latency().unwrap_or(Self::UNKNOWN_LATENCY),
            stream_id: socket.stream_id().unwrap_or_default(),
        }
    }
}

/// One received message, handed to the data callbacks alongside the
/// connection's context and socket handle. Mirrors the SRT message control
/// block at the level of detail this facade exposes.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageControl {
    pub msg_no: i32,
}

pub type ClientConnectedCallback =
    Box<dyn Fn(SocketAddr, u32, Option<&NetworkConnection>, &ConnectionInformation) -> Option<NetworkConnection> + Send + Sync>;
pub type ReceivedDataCallback =
    Box<dyn Fn(&[u8], MessageControl, &NetworkConnection, u32) + Send + Sync>;
pub type ReceivedDataNoCopyCallback =
    Box<dyn Fn(&[u8], MessageControl, &NetworkConnection, u32) + Send + Sync>;
pub type ClientDisconnectedCallback = Box<dyn Fn(&NetworkConnection, u32) + Send + Sync>;
pub type ConnectedToServerCallback =
    Box<dyn Fn(&NetworkConnection, u32, &ConnectionInformation) + Send + Sync>;

/// All optional callback slots, plus the one mandatory server callback.
/// Held behind the Facade, never cloned into hot loops.
#[derive(Default)]
pub struct Callbacks {
    pub client_connected: Option<ClientConnectedCallback>,
    pub received_data: Option<ReceivedDataCallback>,
    pub received_data_no_copy: Option<ReceivedDataNoCopyCallback>,
    pub client_disconnected: Option<ClientDisconnectedCallback>,
    pub connected_to_server: Option<ConnectedToServerCallback>,
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("client_connected", &self.client_connected.is_some())
            .field("received_data", &self.received_data.is_some())
            .field("received_data_no_copy", &self.received_data_no_copy.is_some())
            .field("client_disconnected", &self.client_disconnected.is_some())
            .field("connected_to_server", &self.connected_to_server.is_some())
            .finish()
    }
}

impl Callbacks {
    /// Dispatches whichever data callback is installed, preferring the
    /// no-copy slot per the Design Notes' "prefer no-copy when both are
    /// set" rule. The borrowed buffer's validity ends when this returns.
    pub(crate) fn dispatch_received_data(
        &self,
        payload: &[u8],
        ctrl: MessageControl,
        ctx: &NetworkConnection,
        socket: u32,
    ) {
        if let Some(cb) = &self.received_data_no_copy {
            cb(payload, ctrl, ctx, socket);
        } else if let Some(cb) = &self.received_data {
            cb(payload, ctrl, ctx, socket);
        }
    }
}
