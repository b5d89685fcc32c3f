//! Listening socket ownership and descriptor handoff.
//!
//! # Responsibilities
//! - Bind the TCP listener once in the master, reuse it on later runs
//! - Place the listener at the well-known descriptor in a spawning child
//! - Rebuild the listener from the inherited descriptor in a worker
//!
//! # Design Decisions
//! - The worker never binds; its socket always comes from the master, so
//!   the address and port survive every handoff
//! - The descriptor index is fixed rather than advertised

use std::io;
use std::net::{AddrParseError, SocketAddr, TcpListener};
use std::os::fd::{AsRawFd, FromRawFd, RawFd};
use std::sync::{Arc, Mutex};

use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use nix::sys::socket::{getsockopt, sockopt, SockType};
use thiserror::Error;

/// Descriptor index at which a worker finds its listening socket.
pub const INHERITED_FD: RawFd = 3;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The configured address does not parse.
    #[error("invalid bind address {addr:?}: {source}")]
    Address {
        addr: String,
        #[source]
        source: AddrParseError,
    },

    /// Failed to bind to address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The inherited descriptor is missing or is not a TCP listener.
    #[error("descriptor {fd} is not a listening TCP socket: {source}")]
    NotTcp {
        fd: RawFd,
        #[source]
        source: io::Error,
    },
}

/// Bind a blocking-free standard listener on `addr`.
pub fn bind(addr: &str) -> Result<TcpListener, ListenerError> {
    let socket_addr: SocketAddr = addr.parse().map_err(|source| ListenerError::Address {
        addr: addr.to_string(),
        source,
    })?;

    let listener = TcpListener::bind(socket_addr).map_err(|source| ListenerError::Bind {
        addr: socket_addr,
        source,
    })?;
    listener
        .set_nonblocking(true)
        .map_err(|source| ListenerError::Bind {
            addr: socket_addr,
            source,
        })?;

    Ok(listener)
}

/// Take ownership of the listening socket at `fd`.
///
/// Fails unless `fd` is an open stream socket with an IP address. The
/// descriptor is marked close-on-exec so the worker's own children do not
/// inherit it.
pub fn inherit(fd: RawFd) -> Result<TcpListener, ListenerError> {
    let not_tcp = |source: io::Error| ListenerError::NotTcp { fd, source };

    fcntl(fd, FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC)).map_err(|e| not_tcp(e.into()))?;

    // SAFETY: the master placed a socket it owns at `fd` before exec and
    // nothing else in this process refers to it.
    let listener = unsafe { TcpListener::from_raw_fd(fd) };

    let kind = getsockopt(&listener, sockopt::SockType).map_err(|e| not_tcp(e.into()))?;
    if kind != SockType::Stream {
        return Err(not_tcp(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("socket type is {kind:?}"),
        )));
    }
    let local_addr = listener.local_addr().map_err(not_tcp)?;
    listener.set_nonblocking(true).map_err(not_tcp)?;

    tracing::info!(fd, address = %local_addr, "Listener inherited");
    Ok(listener)
}

/// Make `fd` available at [`INHERITED_FD`] across `exec`.
///
/// Runs between fork and exec, so it only issues async-signal-safe calls.
pub fn place_inherited(fd: RawFd) -> io::Result<()> {
    if fd == INHERITED_FD {
        fcntl(fd, FcntlArg::F_SETFD(FdFlag::empty()))?;
    } else {
        nix::unistd::dup2(fd, INHERITED_FD)?;
    }
    Ok(())
}

/// The master's listening socket, bound on first use.
#[derive(Debug, Default)]
pub struct SharedListener {
    slot: Mutex<Option<Arc<TcpListener>>>,
}

impl SharedListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the bound listener, binding `addr` if nothing is bound yet.
    ///
    /// Later calls reuse the first socket; a different `addr` is ignored.
    pub fn get_or_bind(&self, addr: &str) -> Result<Arc<TcpListener>, ListenerError> {
        let mut slot = self.slot.lock().expect("listener mutex poisoned");

        if let Some(listener) = slot.as_ref() {
            tracing::debug!(requested = addr, "Reusing bound listener");
            return Ok(Arc::clone(listener));
        }

        let listener = Arc::new(bind(addr)?);
        tracing::info!(
            address = ?listener.local_addr().ok(),
            fd = listener.as_raw_fd(),
            "Listener bound"
        );
        *slot = Some(Arc::clone(&listener));
        Ok(listener)
    }

    pub fn is_bound(&self) -> bool {
        self.slot.lock().expect("listener mutex poisoned").is_some()
    }

    /// Address of the bound socket, if any.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.slot
            .lock()
            .expect("listener mutex poisoned")
            .as_ref()
            .and_then(|listener| listener.local_addr().ok())
    }

    /// Drop the master's handle on the socket. Returns whether one was held.
    pub fn close(&self) -> bool {
        self.slot.lock().expect("listener mutex poisoned").take().is_some()
    }
}
