use std::{
    ffi::{c_char, c_int, c_void},
    io::Error,
    mem::size_of,
    net::SocketAddr,
    time::Duration,
};

use os_socketaddr::OsSocketAddr;

use super::{
    error, options::Options, srt_bstats, srt_close, srt_connect, srt_create_socket,
    srt_getsockflag, srt_getsockname, srt_recv, srt_send, SRTSOCKET, SRT_INVALID_SOCK,
    SRT_SOCKOPT, TraceStats,
};

/// A connected (or about to connect) SRT socket: either the caller side of
/// a client connection or one accepted by a `Server`.
pub struct Socket {
    fd: SRTSOCKET,
}

unsafe impl Send for Socket {}
unsafe impl Sync for Socket {}

impl Socket {
    pub(crate) fn new(fd: SRTSOCKET) -> Self {
        Self { fd }
    }

    pub(crate) fn raw(&self) -> SRTSOCKET {
        self.fd
    }

    /// Creates a fresh socket, applies the caller-side options, and issues a
    /// blocking connect to `addr`. Blocks until the handshake completes, the
    /// connect timeout elapses, or the peer rejects the connection (e.g. a
    /// pre-shared key mismatch).
    pub fn connect(addr: SocketAddr, opt: &Options) -> Result<Self, Error> {
        let fd = unsafe { srt_create_socket() };
        if fd == SRT_INVALID_SOCK {
            return Err(error());
        }

        opt.apply_socket(fd)?;

        let addr: OsSocketAddr = addr.into();
        if unsafe { srt_connect(fd, addr.as_ptr() as *const _, addr.len() as c_int) } == -1 {
            let err = error();
            unsafe { srt_close(fd) };
            return Err(err);
        }

        Ok(Self { fd })
    }

    /// Receives exactly one message, up to `max_payload_size` bytes. Returns
    /// `Ok(n)` with `n == 0` never occurring in message mode: a live-mode
    /// receive either returns a full message or an error.
    pub fn recv(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let n = unsafe { srt_recv(self.fd, buf.as_mut_ptr() as *mut c_char, buf.len() as c_int) };
        if n == -1 {
            return Err(error());
        }

        Ok(n as usize)
    }

    /// Sends one message. In live mode this either transmits the whole
    /// buffer or fails; partial sends do not occur.
    pub fn send(&self, buf: &[u8]) -> Result<(), Error> {
        let n = unsafe { srt_send(self.fd, buf.as_ptr() as *const c_char, buf.len() as c_int) };
        if n == -1 {
            return Err(error());
        }

        Ok(())
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        let mut addr = OsSocketAddr::new();
        let mut addrlen = addr.capacity() as c_int;
        unsafe {
            srt_getsockname(self.fd, addr.as_mut_ptr() as *mut _, &mut addrlen);
        }

        addr.into()
    }

    /// Reads back the peer's negotiated SRT version, formatted as
    /// `major.minor.patch`, or `None` if unavailable.
    pub fn peer_version(&self) -> Option<String> {
        let mut value: i32 = 0;
        let mut len = size_of::<i32>() as c_int;
        if unsafe {
            srt_getsockflag(
                self.fd,
                SRT_SOCKOPT::SRTO_PEERVERSION,
                &mut value as *mut i32 as *mut c_void,
                &mut len,
            )
        } != 0
        {
            return None;
        }

        Some(format!(
            "{}.{}.{}",
            (value >> 16) & 0xff,
            (value >> 8) & 0xff,
            value & 0xff
        ))
    }

    /// Reads back the negotiated receive latency in milliseconds, or `None`
    /// if unavailable.
    pub fn negotiated_latency(&self) -> Option<i32> {
        let mut value: i32 = 0;
        let mut len = size_of::<i32>() as c_int;
        if unsafe {
            srt_getsockflag(
                self.fd,
                SRT_SOCKOPT::SRTO_RCVLATENCY,
                &mut value as *mut i32 as *mut c_void,
                &mut len,
            )
        } != 0
        {
            return None;
        }

        Some(value)
    }

    /// Reads back the stream id the peer presented at handshake time.
    pub fn stream_id(&self) -> Option<String> {
        let mut buf = [0u8; 512];
        let mut len = buf.len() as c_int;
        if unsafe {
            srt_getsockflag(
                self.fd,
                SRT_SOCKOPT::SRTO_STREAMID,
                buf.as_mut_ptr() as *mut c_void,
                &mut len,
            )
        } != 0
        {
            return None;
        }

        String::from_utf8(buf[..len.max(0) as usize].to_vec()).ok()
    }

    pub fn get_stats(&self, clear: bool) -> Result<TraceStats, Error> {
        let mut stats = TraceStats::default();
        if unsafe { srt_bstats(self.fd, &mut stats, clear as i32) } != 0 {
            return Err(error());
        }

        Ok(stats)
    }

    pub fn close(&self) {
        unsafe { srt_close(self.fd) };
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        self.close()
    }
}

/// Connect timeout cap applied on top of the configured peer-idle timeout,
/// per the Socket Factory's caller-side option translation.
pub const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
