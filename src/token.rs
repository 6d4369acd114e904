use serde::{Deserialize, Serialize};

/// Opaque identity of a node within one ring. Usually the node's host:port,
/// but any unique label works; closure detection only compares for equality.
pub type NodeId = String;

/// The message passed around the ring.
///
/// Exactly one token is alive on the ring per round. Ownership passes to the
/// next node on forward: a node appends itself and increments the hop count
/// via [`RingToken::advance`] (which consumes the token), and must not touch
/// it again after sending it onward.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RingToken {
    /// Identity of the node that started the roll call. Never changes for
    /// the lifetime of one round.
    pub origin: NodeId,
    /// Incremented by exactly one at each relaying node before forwarding.
    pub hop_count: u64,
    /// One entry appended per hop, in traversal order. `visited.len()`
    /// equals `hop_count` at all times after the token leaves the origin.
    pub visited: Vec<NodeId>,
}

impl RingToken {
    pub fn new(origin: NodeId) -> RingToken {
        RingToken {
            origin,
            hop_count: 0,
            visited: vec![],
        }
    }

    /// Record `node` on the token and bump the hop count. Consumes the token
    /// so a relaying node cannot keep using the pre-forward value.
    pub fn advance(mut self, node: &str) -> RingToken {
        self.visited.push(node.to_string());
        self.hop_count += 1;
        self
    }

    /// Whether the hop count still matches the visited log. Tokens arriving
    /// off the wire are checked before they are acted on.
    pub fn is_consistent(&self) -> bool {
        self.visited.len() as u64 == self.hop_count
    }
}
