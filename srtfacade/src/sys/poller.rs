use std::io::Error;

use super::{
    error, socket::Socket, srt_epoll_add_usock, srt_epoll_create, srt_epoll_release,
    srt_epoll_remove_usock, srt_epoll_uwait, SRTSOCKET, SRT_EPOLL_ERR, SRT_EPOLL_EVENT,
    SRT_EPOLL_IN,
};

/// Per-wait event batch cap: governs only how many ready sockets are
/// harvested from a single `srt_epoll_uwait` call, not a thread pool size.
/// Remaining ready sockets are picked up on the next wait.
pub const MAX_EVENTS_PER_WAIT: usize = 5;

/// A single socket's classified readiness, as reported by one `wait()`.
#[derive(Debug, Clone, Copy)]
pub struct PollEvent {
    pub socket: SRTSOCKET,
    pub readable: bool,
    pub broken: bool,
}

/// Thin wrapper over the SRT readiness poller. Adding and removing a socket
/// is idempotent-safe: the underlying API tolerates redundant add/remove
/// calls, so callers don't need to track membership themselves.
pub struct Poller {
    eid: i32,
}

unsafe impl Send for Poller {}
unsafe impl Sync for Poller {}

impl Poller {
    pub fn new() -> Result<Self, Error> {
        let eid = unsafe { srt_epoll_create() };
        if eid == -1 {
            return Err(error());
        }

        Ok(Self { eid })
    }

    fn add(&self, fd: SRTSOCKET) -> Result<(), Error> {
        let events = SRT_EPOLL_IN | SRT_EPOLL_ERR;
        if unsafe { srt_epoll_add_usock(self.eid, fd, &events) } == -1 {
            return Err(error());
        }

        Ok(())
    }

    pub fn add_socket(&self, socket: &Socket) -> Result<(), Error> {
        self.add(socket.raw())
    }

    pub fn remove(&self, fd: SRTSOCKET) {
        unsafe {
            srt_epoll_remove_usock(self.eid, fd);
        }
    }

    /// Blocks up to `timeout_ms` waiting for readiness, returning at most
    /// `MAX_EVENTS_PER_WAIT` classified events. An empty result on timeout
    /// is not an error: callers loop back around to check for shutdown.
    pub fn wait(&self, timeout_ms: i64) -> Result<Vec<PollEvent>, Error> {
        let mut raw = [SRT_EPOLL_EVENT { fd: 0, events: 0 }; MAX_EVENTS_PER_WAIT];
        let n = unsafe {
            srt_epoll_uwait(
                self.eid,
                raw.as_mut_ptr(),
                MAX_EVENTS_PER_WAIT as i32,
                timeout_ms,
            )
        };

        if n <= 0 {
            // Both "no socket became ready before the timeout" and genuine
            // errors are reported as a non-positive return here; either way
            // there's nothing to dispatch this iteration, and the caller
            // loops back around to re-check for shutdown.
            return Ok(Vec::new());
        }

        Ok(raw[..n as usize]
            .iter()
            .map(|ev| PollEvent {
                socket: ev.fd,
                readable: ev.events & SRT_EPOLL_IN != 0,
                broken: ev.events & SRT_EPOLL_ERR != 0,
            })
            .collect())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        unsafe {
            srt_epoll_release(self.eid);
        }
    }
}
