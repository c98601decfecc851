//! TCPickle protocol reference implementation.
//! A server offers serde values one at a time; a client accepts each or
//! declines to end the session. One exchange per TCP connection, framed by close.

pub mod client;
pub mod endpoint;
pub mod error;
pub mod protocol;
pub mod server;
pub mod wire;

pub use client::ProtocolClient;
pub use endpoint::RetryPolicy;
pub use error::{ProtocolError, Result};
pub use protocol::{ResponseCode, DEFAULT_HOST, DEFAULT_PORT};
pub use server::ProtocolServer;
pub use wire::{decode_response, decode_unit, encode_response, encode_unit};
