use std::{ffi::c_void, io::Error, mem::size_of, time::Duration};

use super::{error, socket::MAX_CONNECT_TIMEOUT, SRTSOCKET, SRT_SOCKOPT, SRT_TRANSTYPE};

/// Which end of the connection a socket is being configured for. Server
/// listening sockets and accepted sockets are `Listener`; client sockets
/// are `Caller`. A handful of options (stream id, connect timeout,
/// IPv6-only) only make sense on one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Listener,
    Caller,
}

/// Socket options translated 1:1 from a `Configuration` before bind/connect.
///
/// This is the Socket Factory's only job: everything else about a socket's
/// behavior is fixed by the protocol's live-mode defaults.
#[derive(Debug, Clone)]
pub struct Options {
    pub role: Role,
    pub reorder_window: u32,
    pub latency: Duration,
    pub overhead_bw_pct: u32,
    pub mtu: u32,
    pub peer_idle_timeout: Duration,
    pub passphrase: String,
    pub stream_id: String,
    pub ipv6_only: bool,
}

impl Options {
    pub(crate) fn apply_socket(&self, fd: SRTSOCKET) -> Result<(), Error> {
        set(fd, SRT_SOCKOPT::SRTO_TRANSTYPE, &SRT_TRANSTYPE::SRTT_LIVE)?;
        set(fd, SRT_SOCKOPT::SRTO_MESSAGEAPI, &1i32)?;
        set(
            fd,
            SRT_SOCKOPT::SRTO_SENDER,
            &(if self.role == Role::Caller { 1i32 } else { 0i32 }),
        )?;

        set(fd, SRT_SOCKOPT::SRTO_RCVLATENCY, &(self.latency.as_millis() as i32))?;
        set(fd, SRT_SOCKOPT::SRTO_PEERLATENCY, &(self.latency.as_millis() as i32))?;
        set(
            fd,
            SRT_SOCKOPT::SRTO_PEERIDLETIMEO,
            &(self.peer_idle_timeout.as_millis() as i32),
        )?;

        set(fd, SRT_SOCKOPT::SRTO_OHEADBW, &(self.overhead_bw_pct as i32))?;
        set(fd, SRT_SOCKOPT::SRTO_LOSSMAXTTL, &(self.reorder_window as i32))?;

        set(fd, SRT_SOCKOPT::SRTO_MSS, &(self.mtu as i32))?;

        if !self.passphrase.is_empty() {
            set(fd, SRT_SOCKOPT::SRTO_PBKEYLEN, &16i32)?;
            set_bytes(fd, SRT_SOCKOPT::SRTO_PASSPHRASE, self.passphrase.as_bytes())?;
        }

        if self.role == Role::Caller && !self.stream_id.is_empty() {
            set_bytes(fd, SRT_SOCKOPT::SRTO_STREAMID, self.stream_id.as_bytes())?;
        }

        if self.role == Role::Listener {
            set(fd, SRT_SOCKOPT::SRTO_IPV6ONLY, &(self.ipv6_only as i32))?;
        }

        if self.role == Role::Caller {
            let conn_timeo = self.peer_idle_timeout.min(MAX_CONNECT_TIMEOUT);
            set(fd, SRT_SOCKOPT::SRTO_CONNTIMEO, &(conn_timeo.as_millis() as i32))?;
        }

        Ok(())
    }
}

fn set<T>(fd: SRTSOCKET, opt: SRT_SOCKOPT, value: &T) -> Result<(), Error> {
    if unsafe {
        super::srt_setsockflag(
            fd,
            opt,
            value as *const T as *const c_void,
            size_of::<T>() as i32,
        )
    } == -1
    {
        return Err(error());
    }

    Ok(())
}

fn set_bytes(fd: SRTSOCKET, opt: SRT_SOCKOPT, bytes: &[u8]) -> Result<(), Error> {
    if unsafe {
        super::srt_setsockflag(
            fd,
            opt,
            bytes.as_ptr() as *const c_void,
            bytes.len() as i32,
        )
    } == -1
    {
        return Err(error());
    }

    Ok(())
}
