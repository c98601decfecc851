//! Encoding: bincode, fixed-width little-endian integers, trailing bytes rejected.
//! Framing is by connection close, so a decoder always sees one whole message.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ProtocolError, Result};
use crate::protocol::ResponseCode;

/// Size of an encoded response code.
pub const CODE_SIZE: usize = 8;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

/// Encode a response code for the wire.
pub fn encode_response(code: ResponseCode) -> Vec<u8> {
    code.value().to_le_bytes().to_vec()
}

/// Decode a response code received from a client.
///
/// Anything that is not exactly one integer, or an integer outside the known
/// set, is `InvalidResponseCode`. `0` is recognized as [`ResponseCode::Invalid`]
/// and rejected as `UnexpectedResponse`, so it is never returned as a value.
pub fn decode_response(bytes: &[u8]) -> Result<ResponseCode> {
    let raw: i64 = options()
        .deserialize(bytes)
        .map_err(|_| ProtocolError::InvalidResponseCode { raw: None })?;
    match ResponseCode::try_from(raw)? {
        ResponseCode::Invalid => Err(ProtocolError::UnexpectedResponse(ResponseCode::Invalid)),
        code => Ok(code),
    }
}

/// Encode a data unit into the byte stream the server sends.
pub fn encode_unit<T: Serialize + ?Sized>(unit: &T) -> Result<Vec<u8>> {
    options().serialize(unit).map_err(ProtocolError::Encode)
}

/// Decode a data unit from everything received before the server closed.
pub fn decode_unit<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    options().deserialize(bytes).map_err(ProtocolError::Decode)
}
