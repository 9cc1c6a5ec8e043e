use parking_lot::Mutex;
use std::collections::HashMap;

use crate::context::NetworkConnection;

/// Mapping from socket handle to per-connection user context, guarded for
/// concurrent reads and writes.
///
/// Every operation holds the mutex only long enough to touch the map; no
/// operation here ever calls a user callback while holding it — callers
/// fetch what they need and invoke callbacks after releasing the guard.
#[derive(Default)]
pub struct Registry {
    connections: Mutex<HashMap<u32, NetworkConnection>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, socket: u32, ctx: NetworkConnection) {
        self.connections.lock().insert(socket, ctx);
    }

    pub fn remove(&self, socket: u32) -> Option<NetworkConnection> {
        self.connections.lock().remove(&socket)
    }

    pub fn get(&self, socket: u32) -> Option<NetworkConnection> {
        self.connections.lock().get(&socket).cloned()
    }

    pub fn snapshot(&self) -> Vec<(u32, NetworkConnection)> {
        self.connections
            .lock()
            .iter()
            .map(|(&socket, ctx)| (socket, ctx.clone()))
            .collect()
    }

    pub fn sockets(&self) -> Vec<u32> {
        self.connections.lock().keys().copied().collect()
    }

    /// Drains the registry, returning every remaining entry. Used by
    /// shutdown to invoke `clientDisconnected` for every connection still
    /// open when `stop` is called.
    pub fn clear(&self) -> Vec<(u32, NetworkConnection)> {
        self.connections.lock().drain().collect()
    }

    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
