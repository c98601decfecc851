//! Socket lifecycle for both ends: connect with retry on refusal (client),
//! bind/listen/accept with a backlog of one (server).

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};

use crate::error::{ProtocolError, Result};

/// Default wait between connection attempts while the server is not listening.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Pending connection queue length. Exchanges are served one at a time.
pub const LISTEN_BACKLOG: i32 = 1;

/// How the client waits for a server that is not listening yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Fixed wait after each refusal.
    pub interval: Duration,
    /// Refusals tolerated before giving up. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_RETRY_INTERVAL,
            max_attempts: None,
        }
    }
}

/// Connect to `host:port`, retrying only while the connection is refused.
/// Any other error is returned at once as `TransportFailure`.
pub fn connect(host: &str, port: u16, policy: &RetryPolicy) -> Result<TcpStream> {
    let mut attempts: u32 = 0;
    loop {
        match TcpStream::connect((host, port)) {
            Ok(stream) => {
                tracing::debug!(host, port, attempts, "connected");
                return Ok(stream);
            }
            Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                attempts = attempts.saturating_add(1);
                if policy.max_attempts.is_some_and(|max| attempts >= max) {
                    tracing::warn!(host, port, attempts, "connection still refused, giving up");
                    return Err(ProtocolError::TransportFailure(e));
                }
                tracing::warn!(
                    host,
                    port,
                    retry_in = ?policy.interval,
                    "connection refused by the server, retrying"
                );
                thread::sleep(policy.interval);
            }
            Err(e) => return Err(ProtocolError::TransportFailure(e)),
        }
    }
}

/// Bind and listen on `host:port` with address reuse and a backlog of one.
pub fn listen(host: &str, port: u16) -> Result<TcpListener> {
    let display = format!("{}:{}", host, port);
    let bind_failure = |source: io::Error| ProtocolError::BindFailure {
        addr: display.clone(),
        source,
    };
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(&bind_failure)?
        .next()
        .ok_or_else(|| {
            bind_failure(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "host resolved to no addresses",
            ))
        })?;
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(&bind_failure)?;
    socket.set_reuse_address(true).map_err(&bind_failure)?;
    socket.bind(&addr.into()).map_err(&bind_failure)?;
    socket.listen(LISTEN_BACKLOG).map_err(&bind_failure)?;
    Ok(socket.into())
}

/// Block until exactly one client connects.
pub fn accept(listener: &TcpListener) -> Result<(TcpStream, SocketAddr)> {
    listener.accept().map_err(ProtocolError::TransportFailure)
}
