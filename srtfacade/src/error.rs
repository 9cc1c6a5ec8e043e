use thiserror::Error;

/// Internal error taxonomy. The public Facade surface never exposes this
/// directly — every operation reduces to a boolean or a populated
/// out-param — but each internal failure path is logged through one of
/// these variants before being collapsed.
#[derive(Debug, Error)]
pub enum FacadeError {
    #[error("configuration rejected: {0}")]
    ConfigurationRejected(String),

    #[error("address resolution failed: {0}")]
    AddressResolutionFailed(String),

    #[error("bind failed: {0}")]
    BindFailed(#[source] std::io::Error),

    #[error("listen failed: {0}")]
    ListenFailed(#[source] std::io::Error),

    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    #[error("message too large: {size} bytes exceeds the live-mode maximum of {max} bytes")]
    MessageTooLarge { size: usize, max: usize },

    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Surfaced only via the `clientDisconnected` callback, never returned
    /// from a public operation.
    #[error("peer gone")]
    PeerGone,
}
