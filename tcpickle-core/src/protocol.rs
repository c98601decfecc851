//! TCPickle wire protocol: response codes and default endpoint.

use crate::error::ProtocolError;

/// Default host for both ends.
pub const DEFAULT_HOST: &str = "localhost";

/// Default TCP port for both ends.
pub const DEFAULT_PORT: u16 = 50007;

/// Decision a client sends at the start of every exchange.
/// Encoding is a bincode `i64`; framing is connection close (see wire module).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    /// Never sent by a correct peer. Exists so "no valid code" is representable.
    Invalid,
    /// Send the offered unit.
    AcceptData,
    /// Stop offering; ends the session.
    DeclineData,
}

impl ResponseCode {
    /// Stable integer value carried on the wire.
    pub fn value(self) -> i64 {
        match self {
            ResponseCode::Invalid => 0,
            ResponseCode::AcceptData => 1,
            ResponseCode::DeclineData => 2,
        }
    }
}

impl TryFrom<i64> for ResponseCode {
    type Error = ProtocolError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(ResponseCode::Invalid),
            1 => Ok(ResponseCode::AcceptData),
            2 => Ok(ResponseCode::DeclineData),
            other => Err(ProtocolError::InvalidResponseCode { raw: Some(other) }),
        }
    }
}

impl std::fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResponseCode::Invalid => "INVALID",
            ResponseCode::AcceptData => "ACCEPT_DATA",
            ResponseCode::DeclineData => "DECLINE_DATA",
        };
        write!(f, "{}({})", name, self.value())
    }
}
