mod acceptor;
mod client;
mod config;
mod context;
mod engine;
mod error;
mod facade;
mod registry;
mod sockets;
mod sys;

pub use config::{Configuration, ConfigurationBuilder};
pub use context::{
    Callbacks, ClientConnectedCallback, ClientDisconnectedCallback, ConnectedToServerCallback,
    ConnectionInformation, MessageControl, NetworkConnection, ReceivedDataCallback,
    ReceivedDataNoCopyCallback,
};
pub use engine::max_payload_size;
pub use error::FacadeError;
pub use facade::{Facade, Mode};
pub use sys::TraceStats;

/// Initializes the native SRT library and installs its log handler under
/// the `srt` log target. Callers typically invoke this once at process
/// start, before the first `Facade`.
pub fn startup() -> bool {
    sys::startup()
}

/// Tears down the native SRT library's global state. Call once, after
/// every `Facade` has been stopped.
pub fn shutdown() {
    sys::cleanup()
}
