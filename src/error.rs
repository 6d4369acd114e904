use thiserror::Error;

/// Top-level error for the rollcall runtime. Fatal startup problems (a bad
/// config file, a bind failure) surface here and exit the process non-zero.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Why a wire payload could not be decoded.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum DecodeErrorKind {
    #[error("malformed JSON")]
    MalformedJson,
    #[error("missing required field")]
    MissingField,
    #[error("jsonrpc version is not 2.0")]
    WrongVersion,
}

/// Failure to decode an inbound request or response.
///
/// Recovered locally at the transport boundary: on the server side it becomes
/// a JSON-RPC error response to the remote caller, on the client side it
/// becomes [`TransportError::Decode`]. It never crashes the node.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
#[error("decode error: {kind}: {detail}")]
pub struct DecodeError {
    pub kind: DecodeErrorKind,
    pub detail: String,
}

impl DecodeError {
    pub fn new(kind: DecodeErrorKind, detail: impl Into<String>) -> DecodeError {
        DecodeError {
            kind,
            detail: detail.into(),
        }
    }
}

/// Failure to serialize an outbound value.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
#[error("encode error: {0}")]
pub struct EncodeError(pub String);

/// Failure of an outbound RPC call.
///
/// When the failed call was a relay forward, the round stalls at this hop:
/// the error is logged and not retried, and the original `start_roll_call`
/// caller never sees it because that call already returned.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection refused by {0}")]
    ConnectionRefused(String),

    #[error("timed out waiting for a response from {0}")]
    Timeout(String),

    #[error("io error talking to peer: {0}")]
    Io(#[from] std::io::Error),

    #[error("peer sent an undecodable response: {0}")]
    Decode(#[from] DecodeError),

    #[error("could not encode request: {0}")]
    Encode(#[from] EncodeError),

    #[error("peer answered with an error: {code}: {message}")]
    Rpc { code: i64, message: String },
}
