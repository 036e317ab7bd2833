//! TCP listener and the thread-per-connection accept loop.

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread;

use logging::{DebugFlag, debug_gte, emit_debug};

use crate::session::serve_connection;
use crate::{DaemonConfig, DaemonError, ShareDefinition};

/// A bound share daemon ready to accept connections.
///
/// Binding and serving are split so callers can learn the actual listen
/// address before any connection is handled; tests bind port `0` and read
/// the ephemeral port back through [`local_addr`](Self::local_addr).
#[derive(Debug)]
pub struct Daemon {
    listener: TcpListener,
    local_addr: SocketAddr,
    shares: Arc<Vec<ShareDefinition>>,
}

impl Daemon {
    /// Validates share roots and binds the listener socket.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::ShareRoot`] when a configured root is missing
    /// or not a directory, and [`DaemonError::Bind`] when the socket cannot
    /// be bound.
    pub fn bind(config: &DaemonConfig) -> Result<Self, DaemonError> {
        for share in config.shares() {
            if !share.root().is_dir() {
                return Err(DaemonError::ShareRoot {
                    name: share.name().to_owned(),
                    root: share.root().to_path_buf(),
                });
            }
        }

        let requested = SocketAddr::new(config.bind_address(), config.port());
        let listener = TcpListener::bind(requested).map_err(|source| DaemonError::Bind {
            addr: requested,
            source,
        })?;
        let local_addr = listener.local_addr().map_err(|source| DaemonError::Bind {
            addr: requested,
            source,
        })?;
        if debug_gte(DebugFlag::Bind, 1) {
            emit_debug(DebugFlag::Bind, 1, format!("listening on {local_addr}"));
        }

        Ok(Self {
            listener,
            local_addr,
            shares: Arc::new(config.shares().to_vec()),
        })
    }

    /// Address the listener actually bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts connections forever, serving each on its own thread.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::Accept`] when the listener fails for any
    /// reason other than an interrupted system call.
    pub fn run(self) -> Result<(), DaemonError> {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if debug_gte(DebugFlag::Connect, 1) {
                        emit_debug(DebugFlag::Connect, 1, format!("connection from {peer}"));
                    }
                    let shares = Arc::clone(&self.shares);
                    thread::spawn(move || {
                        if let Err(err) = serve_connection(stream, &shares) {
                            if debug_gte(DebugFlag::Connect, 1) {
                                emit_debug(
                                    DebugFlag::Connect,
                                    1,
                                    format!("session from {peer} failed: {err}"),
                                );
                            }
                        }
                    });
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(source) => {
                    return Err(DaemonError::Accept {
                        addr: self.local_addr,
                        source,
                    });
                }
            }
        }
    }
}
