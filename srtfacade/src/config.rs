use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Immutable for the lifetime of a single `startServer`/`startClient` call.
///
/// Mirrors the teacher's configuration-struct convention: a plain,
/// `Clone`+`Debug` struct with a builder, optionally `serde`-gated behind
/// this crate's `serde` feature.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Configuration {
    pub local_host: String,
    pub local_port: u16,
    pub remote_host: String,
    pub remote_port: u16,
    pub reorder_window: u32,
    pub latency: Duration,
    pub overhead_bw_pct: u32,
    pub mtu: u32,
    pub peer_idle_timeout: Duration,
    pub passphrase: String,
    pub stream_id: String,
    pub ipv6_only: bool,
    pub fail_on_connect_error: bool,
    pub single_client: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            local_host: "0.0.0.0".to_string(),
            local_port: 0,
            remote_host: String::new(),
            remote_port: 0,
            reorder_window: 25,
            latency: Duration::from_millis(120),
            overhead_bw_pct: 25,
            mtu: 1500,
            peer_idle_timeout: Duration::from_secs(5),
            passphrase: String::new(),
            stream_id: String::new(),
            ipv6_only: false,
            fail_on_connect_error: true,
            single_client: false,
        }
    }
}

impl Configuration {
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigurationBuilder {
    inner: Configuration,
}

macro_rules! setter {
    ($name:ident, $ty:ty) => {
        pub fn $name(mut self, value: $ty) -> Self {
            self.inner.$name = value;
            self
        }
    };
}

impl ConfigurationBuilder {
    pub fn local_host(mut self, value: impl Into<String>) -> Self {
        self.inner.local_host = value.into();
        self
    }

    setter!(local_port, u16);

    pub fn remote_host(mut self, value: impl Into<String>) -> Self {
        self.inner.remote_host = value.into();
        self
    }

    setter!(remote_port, u16);
    setter!(reorder_window, u32);
    setter!(latency, Duration);
    setter!(overhead_bw_pct, u32);
    setter!(mtu, u32);
    setter!(peer_idle_timeout, Duration);

    pub fn passphrase(mut self, value: impl Into<String>) -> Self {
        self.inner.passphrase = value.into();
        self
    }

    pub fn stream_id(mut self, value: impl Into<String>) -> Self {
        self.inner.stream_id = value.into();
        self
    }

    setter!(ipv6_only, bool);
    setter!(fail_on_connect_error, bool);
    setter!(single_client, bool);

    pub fn build(self) -> Configuration {
        self.inner
    }
}
