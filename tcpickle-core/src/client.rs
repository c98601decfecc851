//! Client side: one exchange per call, one connection per exchange.

use std::io::{Read, Write};
use std::net::TcpStream;

use serde::de::DeserializeOwned;

use crate::endpoint::{self, RetryPolicy};
use crate::error::{ProtocolError, Result};
use crate::protocol::{ResponseCode, DEFAULT_HOST, DEFAULT_PORT};
use crate::wire;

/// Read size while draining a payload.
const CHUNK_SIZE: usize = 4096;

/// Pulls data units from a [`crate::ProtocolServer`].
///
/// Holds at most one connection. Every public operation leaves the client
/// closed when it returns, on success and on error alike.
pub struct ProtocolClient {
    ip: String,
    port: u16,
    retry: RetryPolicy,
    stream: Option<TcpStream>,
}

impl ProtocolClient {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
            retry: RetryPolicy::default(),
            stream: None,
        }
    }

    /// Replace the policy used while the server refuses connections.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether a connection is currently held.
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Connect now instead of at the next request. No-op if already open.
    /// Blocks until the server listens (or the retry policy gives up).
    pub fn initialize(&mut self) -> Result<()> {
        if self.stream.is_none() {
            let stream = endpoint::connect(&self.ip, self.port, &self.retry)?;
            tracing::info!(ip = %self.ip, port = self.port, "connected to server");
            self.stream = Some(stream);
        }
        Ok(())
    }

    /// Ask for the next unit and decode it.
    ///
    /// Returns `Ok(None)` when the server closed without sending anything,
    /// which is distinct from a unit that decodes to an empty value.
    pub fn request_unit<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        let bytes = self.request_raw()?;
        if bytes.is_empty() {
            tracing::warn!("server closed without sending data");
            return Ok(None);
        }
        let unit = wire::decode_unit(&bytes)?;
        tracing::debug!(bytes = bytes.len(), "unit decoded");
        Ok(Some(unit))
    }

    /// Ask for the next unit and return its encoded bytes as received.
    /// An empty vector means no data was sent.
    pub fn request_raw(&mut self) -> Result<Vec<u8>> {
        let mut stream = self.take_connection()?;
        send_code(&mut stream, ResponseCode::AcceptData)?;
        let bytes = read_until_closed(&mut stream)?;
        tracing::debug!(bytes = bytes.len(), "payload received");
        Ok(bytes)
    }

    /// Tell the server to stop offering. Ends its session.
    pub fn stop_session(&mut self) -> Result<()> {
        let mut stream = self.take_connection()?;
        send_code(&mut stream, ResponseCode::DeclineData)?;
        tracing::info!("decline issued to server");
        Ok(())
    }

    /// Connect if needed and move the connection out, so it is dropped
    /// (closed) when the calling exchange returns.
    fn take_connection(&mut self) -> Result<TcpStream> {
        self.initialize()?;
        self.stream.take().ok_or_else(|| {
            ProtocolError::TransportFailure(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "no connection",
            ))
        })
    }
}

impl Default for ProtocolClient {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

fn send_code(stream: &mut TcpStream, code: ResponseCode) -> Result<()> {
    tracing::debug!(%code, "sending response code");
    stream
        .write_all(&wire::encode_response(code))
        .map_err(ProtocolError::TransportFailure)?;
    stream.flush().map_err(ProtocolError::TransportFailure)
}

fn read_until_closed(stream: &mut TcpStream) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => return Ok(data),
            Ok(n) => data.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ProtocolError::TransportFailure(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    /// One-shot peer: accept, read the code, reply with `reply`, close.
    fn fake_server(reply: Vec<u8>) -> (u16, thread::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut code = [0u8; wire::CODE_SIZE];
            stream.read_exact(&mut code).unwrap();
            stream.write_all(&reply).unwrap();
            code.to_vec()
        });
        (port, handle)
    }

    #[test]
    fn starts_closed() {
        let client = ProtocolClient::default();
        assert!(!client.is_open());
        assert_eq!(client.ip(), DEFAULT_HOST);
        assert_eq!(client.port(), DEFAULT_PORT);
    }

    #[test]
    fn request_sends_accept_and_decodes() {
        let unit = vec![10u32, 20, 30];
        let (port, server) = fake_server(wire::encode_unit(&unit).unwrap());
        let mut client = ProtocolClient::new("127.0.0.1", port);
        let got: Option<Vec<u32>> = client.request_unit().unwrap();
        assert_eq!(got, Some(unit));
        assert!(!client.is_open());
        let code = server.join().unwrap();
        assert_eq!(wire::decode_response(&code).unwrap(), ResponseCode::AcceptData);
    }

    #[test]
    fn no_bytes_is_none() {
        let (port, server) = fake_server(Vec::new());
        let mut client = ProtocolClient::new("127.0.0.1", port);
        let got: Option<Vec<u32>> = client.request_unit().unwrap();
        assert!(got.is_none());
        assert!(!client.is_open());
        server.join().unwrap();
    }

    #[test]
    fn empty_unit_is_some() {
        let (port, server) = fake_server(wire::encode_unit(&Vec::<u8>::new()).unwrap());
        let mut client = ProtocolClient::new("127.0.0.1", port);
        let got: Option<Vec<u8>> = client.request_unit().unwrap();
        assert_eq!(got, Some(Vec::new()));
        server.join().unwrap();
    }

    #[test]
    fn decode_failure_still_closes() {
        let (port, server) = fake_server(b"not bincode".to_vec());
        let mut client = ProtocolClient::new("127.0.0.1", port);
        let res: Result<Option<Vec<u64>>> = client.request_unit();
        assert!(matches!(res, Err(ProtocolError::Decode(_))));
        assert!(!client.is_open());
        server.join().unwrap();
    }

    #[test]
    fn initialize_then_request_uses_held_connection() {
        let (port, server) = fake_server(wire::encode_unit(&7u8).unwrap());
        let mut client = ProtocolClient::new("127.0.0.1", port);
        client.initialize().unwrap();
        assert!(client.is_open());
        assert_eq!(client.request_unit::<u8>().unwrap(), Some(7));
        assert!(!client.is_open());
        server.join().unwrap();
    }

    #[test]
    fn failed_code_write_is_transport_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut stream = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (_peer, _) = listener.accept().unwrap();
        stream.shutdown(std::net::Shutdown::Write).unwrap();
        assert!(matches!(
            send_code(&mut stream, ResponseCode::AcceptData),
            Err(ProtocolError::TransportFailure(_))
        ));
    }

    #[test]
    fn stop_session_sends_decline() {
        let (port, server) = fake_server(Vec::new());
        let mut client = ProtocolClient::new("127.0.0.1", port);
        client.stop_session().unwrap();
        assert!(!client.is_open());
        let code = server.join().unwrap();
        assert_eq!(wire::decode_response(&code).unwrap(), ResponseCode::DeclineData);
    }
}
