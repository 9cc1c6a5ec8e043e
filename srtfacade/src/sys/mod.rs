pub mod options;
mod poller;
mod server;
mod socket;

pub use self::{
    SRT_TRACEBSTATS as TraceStats, options::Options, poller::Poller, poller::PollEvent,
    server::BindStageError, server::Server, socket::Socket,
};

use std::{
    ffi::{CStr, c_char, c_int, c_void},
    io::Error,
    ptr::null,
};

use common::strings::PSTR;
use libc::sockaddr;
use log::{Level, log};

pub(crate) fn error() -> Error {
    Error::other(
        unsafe { CStr::from_ptr(srt_getlasterror_str()) }
            .to_str()
            .map(|s| s.to_string())
            .ok()
            .unwrap_or_default(),
    )
}

extern "C" fn loghandler(
    _ctx: *const c_void,
    level: SRT_LOG_LEVEL,
    _file: *const c_char,
    _line: c_int,
    area: *const c_char,
    message: *const c_char,
) {
    if let (Ok(area), Ok(message)) = (
        PSTR::from(area).to_string(),
        PSTR::from(message).to_string(),
    ) {
        log!(
            target: "srt",
            level.into(),
            "area={}, message={}",
            area,
            message.replace(['\r', '\n'], "")
        );
    }
}

/// This function shall be called at the start of an application that uses
/// the SRT library. It provides all necessary platform-specific
/// initializations, sets up global data, and starts the SRT GC thread.
/// If this function isn't explicitly called, it will be called
/// automatically when creating the first socket. However, relying on
/// this behavior is strongly discouraged.
pub fn startup() -> bool {
    unsafe { srt_setloglevel(SRT_LOG_LEVEL::LOG_INFO as c_int) }
    unsafe { srt_setloghandler(null(), loghandler) }
    unsafe { srt_startup() != -1 }
}

/// This function cleans up all global SRT resources and shall be called
/// just before exiting the application that uses the SRT library. This
/// cleanup function will still be called from the C++ global
/// destructor, if not called by the application, although relying on
/// this behavior is strongly discouraged.
pub fn cleanup() {
    unsafe {
        srt_cleanup();
    }
}

#[allow(clippy::upper_case_acronyms)]
pub(crate) type SRTSOCKET = i32;
pub(crate) const SRT_INVALID_SOCK: i32 = -1;

#[repr(C)]
#[allow(unused)]
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SRT_SOCKSTATUS {
    SRTS_INIT = 1,
    SRTS_OPENED,
    SRTS_LISTENING,
    SRTS_CONNECTING,
    SRTS_CONNECTED,
    SRTS_BROKEN,
    SRTS_CLOSING,
    SRTS_CLOSED,
    SRTS_NONEXIST,
}

#[repr(C)]
#[allow(unused)]
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SRT_TRANSTYPE {
    SRTT_LIVE,
    SRTT_FILE,
    SRTT_INVALID,
}

#[repr(C)]
#[allow(unused)]
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SRT_SOCKOPT {
    SRTO_MSS = 0,
    SRTO_SNDSYN = 1,
    SRTO_RCVSYN = 2,
    SRTO_ISN = 3,
    SRTO_FC = 4,
    SRTO_SNDBUF = 5,
    SRTO_RCVBUF = 6,
    SRTO_LINGER = 7,
    SRTO_UDP_SNDBUF = 8,
    SRTO_UDP_RCVBUF = 9,
    SRTO_RENDEZVOUS = 12,
    SRTO_SNDTIMEO = 13,
    SRTO_RCVTIMEO = 14,
    SRTO_REUSEADDR = 15,
    SRTO_MAXBW = 16,
    SRTO_STATE = 17,
    SRTO_EVENT = 18,
    SRTO_SNDDATA = 19,
    SRTO_RCVDATA = 20,
    SRTO_SENDER = 21,
    SRTO_TSBPDMODE = 22,
    SRTO_LATENCY = 23,
    SRTO_INPUTBW = 24,
    SRTO_OHEADBW,
    SRTO_PASSPHRASE = 26,
    SRTO_PBKEYLEN,
    SRTO_KMSTATE,
    SRTO_IPTTL = 29,
    SRTO_IPTOS,
    SRTO_TLPKTDROP = 31,
    SRTO_SNDDROPDELAY = 32,
    SRTO_NAKREPORT = 33,
    SRTO_VERSION = 34,
    SRTO_PEERVERSION,
    SRTO_CONNTIMEO = 36,
    SRTO_DRIFTTRACER = 37,
    SRTO_MININPUTBW = 38,
    SRTO_SNDKMSTATE = 40,
    SRTO_RCVKMSTATE,
    SRTO_LOSSMAXTTL,
    SRTO_RCVLATENCY,
    SRTO_PEERLATENCY,
    SRTO_MINVERSION,
    SRTO_STREAMID,
    SRTO_CONGESTION,
    SRTO_MESSAGEAPI,
    SRTO_PAYLOADSIZE,
    SRTO_TRANSTYPE = 50,
    SRTO_KMREFRESHRATE,
    SRTO_KMPREANNOUNCE,
    SRTO_ENFORCEDENCRYPTION,
    SRTO_IPV6ONLY,
    SRTO_PEERIDLETIMEO,
    SRTO_BINDTODEVICE,
    SRTO_GROUPCONNECT,
    SRTO_GROUPMINSTABLETIMEO,
    SRTO_GROUPTYPE,
    SRTO_PACKETFILTER = 60,
    SRTO_RETRANSMITALGO = 61,
    SRTO_E_SIZE,
}

#[repr(C)]
#[allow(unused)]
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SRT_LOG_LEVEL {
    LOG_EMERG = 0,
    LOG_ALERT,
    LOG_CRIT,
    LOG_ERR,
    LOG_WARNING,
    LOG_NOTICE,
    LOG_INFO,
    LOG_DEBUG,
}

impl Into<Level> for SRT_LOG_LEVEL {
    fn into(self) -> Level {
        match self {
            Self::LOG_EMERG | Self::LOG_CRIT | Self::LOG_ERR => Level::Error,
            Self::LOG_ALERT | Self::LOG_WARNING => Level::Warn,
            Self::LOG_NOTICE | Self::LOG_INFO => Level::Info,
            Self::LOG_DEBUG => Level::Debug,
        }
    }
}

/// Epoll readiness flags, as returned by `srt_epoll_uwait` in the `events`
/// field of each `SRT_EPOLL_EVENT`. Only the flags the Poller classifies on
/// are declared; the others (`SRT_EPOLL_OUT`, `SRT_EPOLL_UPDATE`, ...) are
/// not meaningful for this facade's blocking-accept/blocking-recv model.
pub(crate) const SRT_EPOLL_IN: i32 = 0x1;
pub(crate) const SRT_EPOLL_ERR: i32 = 0x4;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
#[allow(non_camel_case_types)]
pub(crate) struct SRT_EPOLL_EVENT {
    pub fd: SRTSOCKET,
    pub events: c_int,
}

#[repr(C)]
#[derive(Default, Debug, Clone, Copy)]
#[allow(non_camel_case_types)]
pub struct SRT_TRACEBSTATS {
    pub ms_time_stamp: i64,
    pub pkt_sent_total: i64,
    pub pkt_recv_total: i64,
    pub pkt_snd_loss_total: c_int,
    pub pkt_rcv_loss_total: c_int,
    pub pkt_retrans_total: c_int,
    pub pkt_sent_ack_total: c_int,
    pub pkt_recv_ack_total: c_int,
    pub pkt_sent_nak_total: c_int,
    pub pkt_recv_nak_total: c_int,
    pub us_snd_duration_total: i64,
    pub pkt_snd_drop_total: c_int,
    pub pkt_rcv_drop_total: c_int,
    pub pkt_rcv_undecrypt_total: c_int,
    pub byte_sent_total: u64,
    pub byte_recv_total: u64,
    pub byte_rcv_loss_total: u64,
    pub byte_retrans_total: u64,
    pub byte_snd_drop_total: u64,
    pub byte_rcv_drop_total: u64,
    pub byte_rcv_undecrypt_total: u64,
    pub pkt_sent: i64,
    pub pkt_recv: i64,
    pub pkt_snd_loss: c_int,
    pub pkt_rcv_loss: c_int,
    pub pkt_retrans: c_int,
    pub pkt_rcv_retrans: c_int,
    pub pkt_sent_ack: c_int,
    pub pkt_recv_ack: c_int,
    pub pkt_sent_nak: c_int,
    pub pkt_recv_nak: c_int,
    pub mbps_send_rate: f64,
    pub mbps_recv_rate: f64,
    pub us_snd_duration: i64,
    pub pkt_reorder_distance: c_int,
    pub pkt_rcv_avg_belated_time: f64,
    pub pkt_rcv_belated: i64,
    pub pkt_snd_drop: c_int,
    pub pkt_rcv_drop: c_int,
    pub pkt_rcv_undecrypt: c_int,
    pub byte_sent: u64,
    pub byte_recv: u64,
    pub byte_rcv_loss: u64,
    pub byte_retrans: u64,
    pub byte_snd_drop: u64,
    pub byte_rcv_drop: u64,
    pub byte_rcv_undecrypt: u64,
    pub us_pkt_snd_period: f64,
    pub pkt_flow_window: c_int,
    pub pkt_congestion_window: c_int,
    pub pkt_flight_size: c_int,
    pub ms_rtt: f64,
    pub mbps_bandwidth: f64,
    pub byte_avail_snd_buf: c_int,
    pub byte_avail_rcv_buf: c_int,
    pub mbps_max_bw: f64,
    pub byte_mss: c_int,
    pub pkt_snd_buf: c_int,
    pub byte_snd_buf: c_int,
    pub ms_snd_buf: c_int,
    pub ms_snd_tsb_pd_delay: c_int,
    pub pkt_rcv_buf: c_int,
    pub byte_rcv_buf: c_int,
    pub ms_rcv_buf: c_int,
    pub ms_rcv_tsb_pd_delay: c_int,
    pub pkt_snd_filter_extra_total: c_int,
    pub pkt_rcv_filter_extra_total: c_int,
    pub pkt_rcv_filter_supply_total: c_int,
    pub pkt_rcv_filter_loss_total: c_int,
    pub pkt_snd_filter_extra: c_int,
    pub pkt_rcv_filter_extra: c_int,
    pub pkt_rcv_filter_supply: c_int,
    pub pkt_rcv_filter_loss: c_int,
    pub pkt_reorder_tolerance: c_int,
    pub pkt_sent_unique_total: i64,
    pub pkt_recv_unique_total: i64,
    pub byte_sent_unique_total: u64,
    pub byte_recv_unique_total: u64,
    pub pkt_sent_unique: i64,
    pub pkt_recv_unique: i64,
    pub byte_sent_unique: u64,
    pub byte_recv_unique: u64,
}

unsafe extern "C" {
    pub(crate) fn srt_getlasterror_str() -> *const c_char;
    /// By default logs are printed to standard error stream. This function
    /// replaces the sending to a stream with a handler function that will
    /// receive them.
    pub(crate) fn srt_setloghandler(
        ctx: *const c_void,
        callback: extern "C" fn(
            ctx: *const c_void,
            level: SRT_LOG_LEVEL,
            file: *const c_char,
            line: c_int,
            area: *const c_char,
            message: *const c_char,
        ),
    );
    /// Sets the minimum severity for logging. A particular log entry is
    /// displayed only if it has a severity greater than or equal to the
    /// minimum. Setting this value to LOG_DEBUG turns on all levels.
    pub(crate) fn srt_setloglevel(level: c_int);
    /// This function shall be called at the start of an application that
    /// uses the SRT library. It provides all necessary
    /// platform-specific initializations, sets up global data, and
    /// starts the SRT GC thread. If this function isn't explicitly
    /// called, it will be called automatically when creating the
    /// first socket. However, relying on this behavior is strongly
    /// discouraged.
    pub(crate) fn srt_startup() -> c_int;
    /// This function cleans up all global SRT resources and shall be called
    /// just before exiting the application that uses the SRT library. This
    /// cleanup function will still be called from the C++ global
    /// destructor, if not called by the application, although relying on
    /// this behavior is strongly discouraged.
    pub(crate) fn srt_cleanup() -> c_int;
    /// Creates an SRT socket.
    ///
    /// Note that socket IDs always have the `SRTGROUP_MASK` bit clear.
    pub(crate) fn srt_create_socket() -> SRTSOCKET;
    /// Binds a socket to a local address and port. When the port number
    /// parameter is 0, the effective port number is system-allocated; use
    /// `srt_getsockname` to retrieve it after binding.
    pub(crate) fn srt_bind(s: SRTSOCKET, name: *const sockaddr, name_len: c_int) -> c_int;
    /// Closes the socket and frees all used resources.
    pub(crate) fn srt_close(s: SRTSOCKET) -> c_int;
    /// Sets up the listening state on a socket with a backlog setting that
    /// defines how many sockets may wait until accepted.
    pub(crate) fn srt_listen(s: SRTSOCKET, backlog: c_int) -> c_int;
    /// Accepts a pending connection, then creates and returns a new socket
    /// that handles this connection.
    ///
    /// If the listening socket is configured for blocking mode
    /// (`SRTO_RCVSYN` set to true, default), the call blocks until the
    /// incoming connection is ready.
    pub(crate) fn srt_accept(s: SRTSOCKET, name: *mut sockaddr, name_len: *mut c_int) -> SRTSOCKET;
    /// Connects a socket to a remote party with a specified address and
    /// port. If the socket is configured for blocking mode (the default),
    /// the call blocks until the connection succeeds or fails.
    pub(crate) fn srt_connect(s: SRTSOCKET, name: *const sockaddr, name_len: c_int) -> c_int;
    /// Extracts the payload waiting to be received. In live mode, the
    /// function behaves as in message mode, retrieving at most the maximum
    /// payload of one MTU.
    pub(crate) fn srt_recv(s: SRTSOCKET, buf: *mut c_char, len: c_int) -> c_int;
    /// Sends a payload to a remote party over a given socket. In live mode,
    /// a single call is allowed to send at most `SRTO_PAYLOADSIZE` bytes,
    /// which can't be larger than 1456 bytes (1316 default); the call
    /// always either sends the whole message or fails.
    pub(crate) fn srt_send(s: SRTSOCKET, buf: *const c_char, len: c_int) -> c_int;
    /// Extracts the address to which the socket was bound. Useful for
    /// discovering the system-autoselected local port after binding to
    /// port 0.
    pub(crate) fn srt_getsockname(
        s: SRTSOCKET,
        addr: *mut sockaddr,
        addr_len: *mut c_int,
    ) -> c_int;
    /// Gets the current status of the socket.
    pub(crate) fn srt_getsockstate(s: SRTSOCKET) -> SRT_SOCKSTATUS;
    /// Sets a value for a socket option.
    pub(crate) fn srt_setsockflag(
        s: SRTSOCKET,
        opt: SRT_SOCKOPT,
        optval: *const c_void,
        optlen: c_int,
    ) -> c_int;
    /// Gets the value of the given socket option.
    pub(crate) fn srt_getsockflag(
        s: SRTSOCKET,
        opt: SRT_SOCKOPT,
        optval: *mut c_void,
        optlen: *mut c_int,
    ) -> c_int;
    /// Reports the current statistics.
    ///
    /// `clear`: 1 if the statistics should be cleared after retrieval.
    pub fn srt_bstats(s: SRTSOCKET, perf: *mut SRT_TRACEBSTATS, clear: c_int) -> c_int;
    /// Creates a new epoll container and returns its id.
    pub(crate) fn srt_epoll_create() -> c_int;
    /// Adds a socket to an epoll container, watching for the given event
    /// flags (a bitwise-or of `SRT_EPOLL_*`). Calling this again for a
    /// socket already in the container updates its watched events.
    pub(crate) fn srt_epoll_add_usock(eid: c_int, u: SRTSOCKET, events: *const c_int) -> c_int;
    /// Removes a socket from an epoll container. Safe to call even if the
    /// socket isn't currently in the container.
    pub(crate) fn srt_epoll_remove_usock(eid: c_int, u: SRTSOCKET) -> c_int;
    /// Blocks up to `ms_timeout` milliseconds waiting for any watched
    /// socket in the container to become ready, writing up to
    /// `*fds_len_in_out` ready sockets into `fdsSet` and updating
    /// `*fds_len_in_out` with the number actually written.
    pub(crate) fn srt_epoll_uwait(
        eid: c_int,
        fds_set: *mut SRT_EPOLL_EVENT,
        fds_len: c_int,
        ms_timeout: i64,
    ) -> c_int;
    /// Releases an epoll container created by `srt_epoll_create`.
    pub(crate) fn srt_epoll_release(eid: c_int) -> c_int;
}
