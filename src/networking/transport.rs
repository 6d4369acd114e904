//! TCP boundary: the accept/dispatch server loop and the outbound
//! one-shot RPC client.
//!
//! One connection carries one request and one response. Each accepted
//! connection gets its own task so a node can be mid-relay and still accept
//! fresh connections.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{event, Level};
use uuid::Uuid;

use crate::error::{DecodeErrorKind, TransportError};
use crate::networking::wire::{self, Response, RpcError};

/// Upper bound on one framed envelope. A peer streaming bytes without a
/// newline stops being read at this point instead of growing the buffer
/// without limit.
pub const MAX_FRAME_BYTES: u64 = 1024 * 1024;

/// Dispatch target for inbound requests. The transport decodes the envelope
/// and hands the method name and params to the handler; protocol logic lives
/// behind this trait.
#[async_trait]
pub trait RpcHandler: Send + Sync + 'static {
    async fn handle(&self, method: &str, params: Vec<Value>)
        -> std::result::Result<Value, RpcError>;
}

/// Accept connections on `listener` and dispatch them to `handler` until the
/// shutdown channel fires. The listening socket is dropped on return.
pub async fn serve(
    listener: TcpListener,
    handler: Arc<dyn RpcHandler>,
    mut shutdown: broadcast::Receiver<()>,
) -> crate::Result<()> {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        let handler = handler.clone();
                        tokio::spawn(async move {
                            if let Err(err) = handle_connection(stream, handler).await {
                                event!(Level::WARN, "connection from {} failed: {}", addr, err);
                            }
                        });
                    }
                    // transient on long-running listeners (reset while in the
                    // backlog, fd exhaustion); keep accepting
                    Err(err) => {
                        event!(Level::ERROR, "accept failed: {}", err);
                        sleep(Duration::from_millis(100)).await;
                    }
                }
            }
            _ = shutdown.recv() => {
                event!(Level::INFO, "listener shutting down");
                break;
            }
        }
    }
    Ok(())
}

/// Read one framed request, answer it, release the connection. Decode
/// failures become JSON-RPC error responses, never a crash; since the
/// request id is unrecoverable in that case the response id is null.
async fn handle_connection(stream: TcpStream, handler: Arc<dyn RpcHandler>) -> io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half.take(MAX_FRAME_BYTES));
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let response = if line.len() as u64 >= MAX_FRAME_BYTES && !line.ends_with('\n') {
        Response::from_error(
            RpcError::invalid_request("request frame exceeds maximum size"),
            Value::Null,
        )
    } else {
        match wire::decode_request(line.as_bytes()) {
            Err(err) => {
                let rpc_error = match err.kind {
                    DecodeErrorKind::MalformedJson => RpcError::parse_error(err.detail),
                    _ => RpcError::invalid_request(err.detail),
                };
                Response::from_error(rpc_error, Value::Null)
            }
            Ok(request) => match handler.handle(&request.method, request.params).await {
                Ok(result) => Response::from_result(result, request.id),
                Err(error) => Response::from_error(error, request.id),
            },
        }
    };

    let mut bytes = wire::encode_response(&response)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    bytes.push(b'\n');
    write_half.write_all(&bytes).await?;
    write_half.flush().await?;
    Ok(())
}

/// Issue one RPC call: connect to `addr`, send one framed request with a
/// fresh id, wait up to `timeout` for the framed response. The connection is
/// dropped on every exit path.
pub async fn call(
    addr: &str,
    method: &str,
    params: Vec<Value>,
    timeout: Duration,
) -> std::result::Result<Value, TransportError> {
    let stream = TcpStream::connect(addr).await.map_err(|err| {
        if err.kind() == io::ErrorKind::ConnectionRefused {
            TransportError::ConnectionRefused(addr.to_string())
        } else {
            TransportError::Io(err)
        }
    })?;
    let (read_half, mut write_half) = stream.into_split();

    let id = Value::String(Uuid::new_v4().to_string());
    let mut bytes = wire::encode_request(method, params, id)?;
    bytes.push(b'\n');
    write_half.write_all(&bytes).await?;
    write_half.flush().await?;

    let mut reader = BufReader::new(read_half.take(MAX_FRAME_BYTES));
    let mut line = String::new();
    tokio::time::timeout(timeout, reader.read_line(&mut line))
        .await
        .map_err(|_| TransportError::Timeout(addr.to_string()))??;

    let response = wire::decode_response(line.as_bytes())?;
    if let Some(error) = response.error {
        return Err(TransportError::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    Ok(response.result.unwrap_or(Value::Null))
}
