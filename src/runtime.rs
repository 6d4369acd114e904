//! Process-wide bootstrap: read the node settings, bind the listener, wire
//! the state machine into the transport, and run until ctrl-c.

use std::sync::Arc;
use std::time::Duration;

use config::Config;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::{broadcast, RwLock};
use tracing::{event, Level};

use crate::networking::transport;
use crate::node::{NodeHandler, RingNode, DEFAULT_RELAY_TIMEOUT_MS};

/// Run one ring node until an external stop signal arrives.
///
/// Required settings: `node.bind_address` and `node.next_peer`. Optional:
/// `node.id` (defaults to the bind address) and `node.relay_timeout_ms`.
/// A bind failure or a missing required setting is fatal and propagates out
/// so the process exits non-zero.
pub async fn run(settings: Config) -> crate::Result<()> {
    let bind_address: String = settings.get("node.bind_address")?;
    let next_peer: String = settings.get("node.next_peer")?;
    let self_id: String = match settings.get::<String>("node.id") {
        Ok(id) => id,
        Err(_) => bind_address.clone(),
    };
    let relay_timeout_ms: u64 = match settings.get::<u64>("node.relay_timeout_ms") {
        Ok(ms) => ms,
        Err(_) => DEFAULT_RELAY_TIMEOUT_MS,
    };

    let listener = TcpListener::bind(&bind_address).await?;
    event!(
        Level::INFO,
        "node {} listening on {}, forwarding to {}",
        self_id,
        bind_address,
        next_peer
    );

    let node_lock = Arc::new(RwLock::new(RingNode::new(
        self_id,
        next_peer,
        Duration::from_millis(relay_timeout_ms),
    )));
    let handler = Arc::new(NodeHandler::new(node_lock));

    // the broadcast pair lets ctrl-c stop the accept loop so the listening
    // socket is released rather than leaked
    let (notify_shutdown, _) = broadcast::channel(1);

    tokio::select! {
        res = transport::serve(listener, handler, notify_shutdown.subscribe()) => {
            res?;
        },
        _ = signal::ctrl_c() => {
            event!(Level::INFO, "shutting down");
            let _ = notify_shutdown.send(());
        }
    }

    Ok(())
}
