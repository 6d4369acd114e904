//! JSON-RPC 2.0 envelope codec.
//!
//! Pure byte <-> value transformations; framing (one newline-terminated
//! envelope per line) and socket handling live in [`super::transport`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DecodeError, DecodeErrorKind, EncodeError};

pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const SERVER_ERROR: i64 = -32000;

/// A decoded JSON-RPC request envelope.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Request {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
    pub id: Value,
}

/// A JSON-RPC response envelope. Exactly one of `result` and `error` is set.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    pub id: Value,
}

/// The JSON-RPC error object, `{code, message, data?}`.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> RpcError {
        RpcError {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error(detail: impl Into<String>) -> RpcError {
        RpcError {
            code: PARSE_ERROR,
            message: "Parse error".to_string(),
            data: Some(Value::String(detail.into())),
        }
    }

    pub fn invalid_request(detail: impl Into<String>) -> RpcError {
        RpcError {
            code: INVALID_REQUEST,
            message: "Invalid request".to_string(),
            data: Some(Value::String(detail.into())),
        }
    }

    pub fn method_not_found(method: &str) -> RpcError {
        RpcError::new(METHOD_NOT_FOUND, format!("Method not found: {}", method))
    }

    pub fn invalid_params(detail: impl Into<String>) -> RpcError {
        RpcError::new(INVALID_PARAMS, detail)
    }
}

impl Response {
    pub fn from_result(result: Value, id: Value) -> Response {
        Response {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn from_error(error: RpcError, id: Value) -> Response {
        Response {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

pub fn encode_request(
    method: &str,
    params: Vec<Value>,
    id: Value,
) -> Result<Vec<u8>, EncodeError> {
    let request = Request {
        jsonrpc: JSONRPC_VERSION.to_string(),
        method: method.to_string(),
        params,
        id,
    };
    serde_json::to_vec(&request).map_err(|err| EncodeError(err.to_string()))
}

pub fn encode_response(response: &Response) -> Result<Vec<u8>, EncodeError> {
    serde_json::to_vec(response).map_err(|err| EncodeError(err.to_string()))
}

pub fn decode_request(bytes: &[u8]) -> Result<Request, DecodeError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|err| DecodeError::new(DecodeErrorKind::MalformedJson, err.to_string()))?;
    let obj = value.as_object().ok_or_else(|| {
        DecodeError::new(DecodeErrorKind::MissingField, "request is not a JSON object")
    })?;

    match obj.get("jsonrpc") {
        None => {
            return Err(DecodeError::new(
                DecodeErrorKind::MissingField,
                "missing jsonrpc field",
            ))
        }
        Some(version) if version == JSONRPC_VERSION => {}
        Some(version) => {
            return Err(DecodeError::new(
                DecodeErrorKind::WrongVersion,
                format!("unsupported jsonrpc version: {}", version),
            ))
        }
    }

    let method = obj
        .get("method")
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError::new(DecodeErrorKind::MissingField, "missing method field"))?
        .to_string();

    let params = match obj.get("params") {
        None => vec![],
        Some(Value::Array(params)) => params.clone(),
        Some(_) => {
            return Err(DecodeError::new(
                DecodeErrorKind::MissingField,
                "params is not an array",
            ))
        }
    };

    let id = obj
        .get("id")
        .cloned()
        .ok_or_else(|| DecodeError::new(DecodeErrorKind::MissingField, "missing id field"))?;

    Ok(Request {
        jsonrpc: JSONRPC_VERSION.to_string(),
        method,
        params,
        id,
    })
}

pub fn decode_response(bytes: &[u8]) -> Result<Response, DecodeError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|err| DecodeError::new(DecodeErrorKind::MalformedJson, err.to_string()))?;

    match value.get("jsonrpc") {
        None => {
            return Err(DecodeError::new(
                DecodeErrorKind::MissingField,
                "missing jsonrpc field",
            ))
        }
        Some(version) if version == JSONRPC_VERSION => {}
        Some(version) => {
            return Err(DecodeError::new(
                DecodeErrorKind::WrongVersion,
                format!("unsupported jsonrpc version: {}", version),
            ))
        }
    }

    let response: Response = serde_json::from_value(value)
        .map_err(|err| DecodeError::new(DecodeErrorKind::MissingField, err.to_string()))?;

    if response.result.is_none() && response.error.is_none() {
        return Err(DecodeError::new(
            DecodeErrorKind::MissingField,
            "response carries neither result nor error",
        ));
    }

    Ok(response)
}
