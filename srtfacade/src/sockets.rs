use parking_lot::Mutex;
use std::collections::HashMap;

use crate::sys::Socket;

/// Owns the live `Socket` objects keyed by handle, alongside the Registry's
/// context mapping. Kept separate from `Registry` because the Registry's
/// contract (§4.2) is a pure handle→context map with snapshot semantics;
/// the underlying socket's lifetime is this table's concern.
#[derive(Default)]
pub struct SocketTable {
    sockets: Mutex<HashMap<u32, Socket>>,
}

impl SocketTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, handle: u32, socket: Socket) {
        self.sockets.lock().insert(handle, socket);
    }

    pub fn remove(&self, handle: u32) -> Option<Socket> {
        self.sockets.lock().remove(&handle)
    }

    pub fn send(&self, handle: u32, buf: &[u8]) -> Result<(), std::io::Error> {
        match self.sockets.lock().get(&handle) {
            Some(socket) => socket.send(buf),
            None => Err(std::io::Error::other("unknown socket")),
        }
    }

    pub fn recv(&self, handle: u32, buf: &mut [u8]) -> Result<usize, std::io::Error> {
        match self.sockets.lock().get(&handle) {
            Some(socket) => socket.recv(buf),
            None => Err(std::io::Error::other("unknown socket")),
        }
    }

    pub fn get_stats(
        &self,
        handle: u32,
        clear: bool,
    ) -> Result<crate::sys::TraceStats, std::io::Error> {
        match self.sockets.lock().get(&handle) {
            Some(socket) => socket.get_stats(clear),
            None => Err(std::io::Error::other("unknown socket")),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sockets.lock().is_empty()
    }

    pub fn drain(&self) -> Vec<(u32, Socket)> {
        self.sockets.lock().drain().collect()
    }
}
