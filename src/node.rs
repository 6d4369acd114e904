//! The ring protocol state machine, independent of transport mechanics.
//!
//! A node owns its identity, the address of its single next peer, and the
//! traversal state of the current round. The state lives behind an
//! `Arc<RwLock<...>>` so several node instances can coexist in one process
//! (which is how the ring-closure tests run a whole ring in-process).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{event, Level};

use crate::networking::transport::{self, RpcHandler};
use crate::networking::wire::{RpcError, SERVER_ERROR};
use crate::token::{NodeId, RingToken};

/// How long an outbound relay waits for the next peer's ack before the
/// round is considered stalled at this hop.
pub const DEFAULT_RELAY_TIMEOUT_MS: u64 = 5000;

/// Where this node stands with respect to the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No round involving this node is outstanding.
    Idle,
    /// This node started the current round and is awaiting its token's return.
    Originated,
    /// Forwarding someone else's token. Transient within the handling of a
    /// single `relay` call; never written to the stored phase, since a write
    /// could clobber a concurrent `Completed` or `Originated` transition.
    Relaying,
    /// A round this node originated has returned home.
    Completed,
}

/// Per-process ring state. Created once at startup and kept for the process
/// lifetime; one round at a time travels the ring.
pub struct RingNode {
    self_id: NodeId,
    next_peer: String,
    relay_timeout: Duration,
    phase: Phase,
    last_round_result: Option<RingToken>,
}

pub type RingNodeLock = Arc<RwLock<RingNode>>;

impl RingNode {
    pub fn new(self_id: NodeId, next_peer: String, relay_timeout: Duration) -> RingNode {
        RingNode {
            self_id,
            next_peer,
            relay_timeout,
            phase: Phase::Idle,
            last_round_result: None,
        }
    }

    pub fn self_id(&self) -> &str {
        &self.self_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The token as it looked when a round this node originated completed.
    pub fn last_round_result(&self) -> Option<&RingToken> {
        self.last_round_result.as_ref()
    }
}

/// Start a new round with this node as origin.
///
/// Rejected with `AlreadyInProgress` while a round this node originated is
/// still outstanding; starting over from `Completed` is fine. The handler
/// acks as soon as the outbound relay has been submitted, without waiting
/// for the ring.
pub async fn handle_start_roll_call(
    node_lock: RingNodeLock,
) -> std::result::Result<Value, RpcError> {
    let (self_id, next_peer, token, relay_timeout) = {
        let mut node = node_lock.write().await;
        if node.phase == Phase::Originated {
            return Err(RpcError::new(SERVER_ERROR, "AlreadyInProgress"));
        }
        node.phase = Phase::Originated;
        (
            node.self_id.clone(),
            node.next_peer.clone(),
            RingToken::new(node.self_id.clone()),
            node.relay_timeout,
        )
    };

    event!(
        Level::INFO,
        "{}: roll call started, forwarding to {}",
        self_id,
        next_peer
    );
    spawn_relay(self_id, next_peer, token, relay_timeout);
    Ok(json!("ok"))
}

/// Handle a token arriving from our predecessor on the ring.
///
/// A token whose origin matches our own identity has traversed the full ring:
/// the round is complete and the token is kept as the round result (ring size
/// is unknown to members, so closure detection is purely identity-based). Any
/// other token gets this node appended and is forwarded onward; the ack goes
/// back to the predecessor without waiting for the forward to land. Foreign
/// tokens leave the stored phase untouched (Idle stays Idle, an originator
/// stays Originated), so a concurrent phase transition cannot be lost.
pub async fn handle_relay(
    node_lock: RingNodeLock,
    token: RingToken,
) -> std::result::Result<Value, RpcError> {
    if !token.is_consistent() {
        return Err(RpcError::invalid_params(format!(
            "token hop_count {} does not match visited length {}",
            token.hop_count,
            token.visited.len()
        )));
    }

    let (self_id, next_peer, relay_timeout, forwarded) = {
        let mut node = node_lock.write().await;
        if token.origin == node.self_id {
            node.phase = Phase::Completed;
            event!(
                Level::INFO,
                "{}: roll call complete after {} hops, visited {:?}",
                node.self_id,
                token.hop_count,
                token.visited
            );
            node.last_round_result = Some(token);
            return Ok(json!("ok"));
        }

        let self_id = node.self_id.clone();
        let forwarded = token.advance(&self_id);
        (
            self_id,
            node.next_peer.clone(),
            node.relay_timeout,
            forwarded,
        )
    };

    event!(
        Level::DEBUG,
        "{}: relaying token from {} to {} (hop {})",
        self_id,
        forwarded.origin,
        next_peer,
        forwarded.hop_count
    );
    spawn_relay(self_id, next_peer, forwarded, relay_timeout);
    Ok(json!("ok"))
}

/// Submit the outbound relay as an independent task. Failure is logged and
/// the round stalls at this hop; no retry, no rerouting, and the caller that
/// delivered the token to us has already been acked.
fn spawn_relay(self_id: NodeId, next_peer: String, token: RingToken, timeout: Duration) {
    tokio::spawn(async move {
        let params = match serde_json::to_value(&token) {
            Ok(value) => vec![value],
            Err(err) => {
                event!(Level::ERROR, "{}: could not encode token: {}", self_id, err);
                return;
            }
        };
        match transport::call(&next_peer, "relay", params, timeout).await {
            Ok(_) => {
                event!(Level::DEBUG, "{}: relay to {} acknowledged", self_id, next_peer);
            }
            Err(err) => {
                event!(
                    Level::ERROR,
                    "{}: relay to {} failed, round stalled: {}",
                    self_id,
                    next_peer,
                    err
                );
            }
        }
    });
}

/// Dispatches the two ring protocol methods to the state machine. Anything
/// else is rejected, keeping the RPC surface closed.
pub struct NodeHandler {
    node_lock: RingNodeLock,
}

impl NodeHandler {
    pub fn new(node_lock: RingNodeLock) -> NodeHandler {
        NodeHandler { node_lock }
    }
}

#[async_trait]
impl RpcHandler for NodeHandler {
    async fn handle(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> std::result::Result<Value, RpcError> {
        match method {
            "start_roll_call" => handle_start_roll_call(self.node_lock.clone()).await,
            "relay" => {
                let param = params.into_iter().next().ok_or_else(|| {
                    RpcError::invalid_params("relay expects one token parameter")
                })?;
                let token: RingToken = serde_json::from_value(param)
                    .map_err(|err| RpcError::invalid_params(format!("bad token: {}", err)))?;
                handle_relay(self.node_lock.clone(), token).await
            }
            other => Err(RpcError::method_not_found(other)),
        }
    }
}
