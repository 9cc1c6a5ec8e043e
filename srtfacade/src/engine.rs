use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::context::{Callbacks, MessageControl};
use crate::registry::Registry;
use crate::sockets::SocketTable;
use crate::sys::Poller;

/// Poller wait timeout: bounds how long the Event Engine can go without
/// observing a cancellation request.
pub const POLL_TIMEOUT_MS: i64 = 500;

/// The configured MTU's derived live-mode payload ceiling. Messages above
/// this size are rejected by `sendData` without touching the socket.
pub fn max_payload_size(mtu: u32) -> usize {
    (mtu as usize).saturating_sub(44).min(1456)
}

/// Polls the Poller; for each readable socket receives one message and
/// dispatches a data callback; for each broken socket (or a fatal receive)
/// tears down the connection and dispatches the disconnect callback.
pub struct EventEngine {
    registry: Arc<Registry>,
    sockets: Arc<SocketTable>,
    poller: Arc<Poller>,
    callbacks: Arc<Callbacks>,
    active: Arc<AtomicBool>,
    max_payload: usize,
}

impl EventEngine {
    pub fn new(
        registry: Arc<Registry>,
        sockets: Arc<SocketTable>,
        poller: Arc<Poller>,
        callbacks: Arc<Callbacks>,
        active: Arc<AtomicBool>,
        max_payload: usize,
    ) -> Self {
        Self {
            registry,
            sockets,
            poller,
            callbacks,
            active,
            max_payload,
        }
    }

    /// Runs a single poller wait and dispatches whatever it reports. This
    /// is the unit both the multi-client Event Engine thread and the
    /// single-socket Client Loop recv/dispatch phase call in a loop.
    pub fn poll_once(&self) {
        let events = match self.poller.wait(POLL_TIMEOUT_MS) {
            Ok(events) => events,
            Err(err) => {
                log::warn!("poller wait failed: {err}");
                return;
            }
        };

        for event in events {
            let handle = event.socket as u32;

            if event.broken {
                self.disconnect(handle);
                continue;
            }

            if event.readable {
                let mut buf = vec![0u8; self.max_payload];
                match self.sockets.recv(handle, &mut buf) {
                    Ok(n) => {
                        if let Some(ctx) = self.registry.get(handle) {
                            self.callbacks.dispatch_received_data(
                                &buf[..n],
                                MessageControl::default(),
                                &ctx,
                                handle,
                            );
                        }
                    }
                    Err(err) => {
                        log::debug!("recv failed on socket {handle}: {err}");
                        self.disconnect(handle);
                    }
                }
            }
        }
    }

    fn disconnect(&self, handle: u32) {
        self.poller.remove(handle as i32);

        let ctx = self.registry.remove(handle);
        let socket = self.sockets.remove(handle);

        if let (Some(ctx), Some(cb)) = (&ctx, &self.callbacks.client_disconnected) {
            cb(ctx, handle);
        }

        if let Some(socket) = socket {
            socket.close();
        }
    }

    /// Runs until `active` is cleared.
    pub fn run(&self) {
        while self.active.load(Ordering::Acquire) {
            self.poll_once();
        }
    }
}
