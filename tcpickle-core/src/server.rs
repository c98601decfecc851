//! Server side: offer units one at a time until the client declines.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};

use serde::Serialize;

use crate::endpoint;
use crate::error::{ProtocolError, Result};
use crate::protocol::{ResponseCode, DEFAULT_HOST, DEFAULT_PORT};
use crate::wire;

/// Upper bound for the client's code read. A code is `wire::CODE_SIZE` bytes.
const CODE_BUF_SIZE: usize = 1024;

/// Offers data units to one client at a time.
///
/// Each `offer_*` call is one exchange on a freshly accepted connection. A
/// decline closes the listening socket for good; build a new server to serve
/// again.
pub struct ProtocolServer {
    ip: String,
    port: u16,
    listener: Option<TcpListener>,
}

impl ProtocolServer {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
            listener: None,
        }
    }

    /// Bind and listen. Returns the bound host and port, so port 0 reports
    /// the port the OS picked. Bind errors are not retried.
    pub fn initialize(&mut self) -> Result<(String, u16)> {
        if self.listener.is_none() {
            let listener = endpoint::listen(&self.ip, self.port)?;
            self.listener = Some(listener);
        }
        let addr = self.local_addr()?;
        tracing::info!(host = %addr.ip(), port = addr.port(), "server ready");
        Ok((addr.ip().to_string(), addr.port()))
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .as_ref()
            .ok_or(ProtocolError::NotListening)?
            .local_addr()
            .map_err(ProtocolError::TransportFailure)
    }

    /// Offer one unit. Blocks until a client connects.
    ///
    /// Returns `true` once the unit was sent and `false` when the client
    /// declined, in which case the listening socket is closed too.
    pub fn offer_unit<T: Serialize + ?Sized>(&mut self, unit: &T) -> Result<bool> {
        let payload = wire::encode_unit(unit)?;
        self.offer_raw(&payload)
    }

    /// Offer pre-encoded bytes. Same exchange as [`Self::offer_unit`].
    pub fn offer_raw(&mut self, payload: &[u8]) -> Result<bool> {
        let listener = self.listener.as_ref().ok_or(ProtocolError::NotListening)?;
        tracing::debug!("waiting for a client to connect");
        let (mut stream, peer) = endpoint::accept(listener)?;
        tracing::debug!(%peer, "incoming connection");

        match read_code(&mut stream)? {
            ResponseCode::DeclineData => {
                tracing::info!(%peer, "client declined, closing the session");
                drop(stream);
                self.close();
                Ok(false)
            }
            ResponseCode::AcceptData => {
                tracing::debug!(%peer, bytes = payload.len(), "sending data");
                stream.write_all(payload).map_err(ProtocolError::SendFailure)?;
                stream.flush().map_err(ProtocolError::SendFailure)?;
                tracing::debug!(%peer, "data has been sent");
                Ok(true)
            }
            other => Err(ProtocolError::UnexpectedResponse(other)),
        }
    }

    /// Offer units in order until the client declines or `units` runs out.
    /// Either way the listening socket is closed afterwards. Returns how many
    /// units were sent.
    pub fn serve<I>(&mut self, units: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: Serialize,
    {
        let mut sent = 0;
        for unit in units {
            if !self.offer_unit(&unit)? {
                return Ok(sent);
            }
            sent += 1;
        }
        tracing::info!(sent, "no more units to offer, closing the session");
        self.close();
        Ok(sent)
    }

    /// Drop the listening socket. Later offers fail with `NotListening`.
    pub fn close(&mut self) {
        if self.listener.take().is_some() {
            tracing::debug!(ip = %self.ip, port = self.port, "listening socket closed");
        }
    }
}

impl Default for ProtocolServer {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

fn read_code(stream: &mut TcpStream) -> Result<ResponseCode> {
    let mut buf = [0u8; CODE_BUF_SIZE];
    let mut n = 0;
    // Keep reading until a full code arrived or the client closed.
    while n < wire::CODE_SIZE {
        match stream.read(&mut buf[n..]) {
            Ok(0) => break,
            Ok(read) => n += read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ProtocolError::TransportFailure(e)),
        }
    }
    let code = wire::decode_response(&buf[..n])?;
    tracing::debug!(%code, "got response code");
    Ok(code)
}
