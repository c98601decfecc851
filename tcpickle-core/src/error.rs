//! Error kinds surfaced by client and server.

use std::io;

use crate::protocol::ResponseCode;

/// Every failure the protocol reports. Connection refusal is not here: the
/// client retries it internally.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Connect, accept, read or code write failed for a reason other than refusal.
    #[error("transport failure: {0}")]
    TransportFailure(#[source] io::Error),
    /// Received code is out of range (`raw`) or not an integer at all (`None`).
    #[error("invalid response code: {}", describe_raw(.raw))]
    InvalidResponseCode { raw: Option<i64> },
    /// Received code is recognized but not legal at this point.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(ResponseCode),
    #[error("cannot bind {addr}: {source}")]
    BindFailure {
        addr: String,
        #[source]
        source: io::Error,
    },
    /// Writing the payload failed mid-stream. Partial data is not resent.
    #[error("send failure: {0}")]
    SendFailure(#[source] io::Error),
    #[error("encode error: {0}")]
    Encode(#[source] bincode::Error),
    #[error("decode error: {0}")]
    Decode(#[source] bincode::Error),
    /// The listening socket was closed by a decline, an exhausted source or `close()`.
    #[error("server is not listening")]
    NotListening,
}

fn describe_raw(raw: &Option<i64>) -> String {
    match raw {
        Some(v) => v.to_string(),
        None => "not an integer".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_code_messages() {
        let out_of_range = ProtocolError::InvalidResponseCode { raw: Some(7) };
        assert_eq!(out_of_range.to_string(), "invalid response code: 7");
        let garbage = ProtocolError::InvalidResponseCode { raw: None };
        assert_eq!(garbage.to_string(), "invalid response code: not an integer");
    }

    #[test]
    fn bind_failure_names_address() {
        let err = ProtocolError::BindFailure {
            addr: "127.0.0.1:1".into(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "in use"),
        };
        assert!(err.to_string().starts_with("cannot bind 127.0.0.1:1"));
    }
}
