//! End-to-end ring scenarios: several nodes in one process, wired into a
//! ring over real TCP sockets on ephemeral ports.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, RwLock};
use tokio::time::sleep;

use rollcall::error::TransportError;
use rollcall::networking::transport;
use rollcall::networking::wire::SERVER_ERROR;
use rollcall::node::{NodeHandler, Phase, RingNode, RingNodeLock};

const CALL_TIMEOUT: Duration = Duration::from_secs(1);

struct TestRing {
    addrs: Vec<String>,
    nodes: Vec<RingNodeLock>,
    // dropping the senders would stop the listeners mid-test
    _shutdowns: Vec<broadcast::Sender<()>>,
}

/// Bind `ids.len()` listeners on ephemeral ports and wire each node's
/// next_peer to its successor, last back to first.
async fn spawn_ring(ids: &[&str]) -> TestRing {
    let mut listeners = vec![];
    let mut addrs = vec![];
    for _ in ids {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        addrs.push(listener.local_addr().unwrap().to_string());
        listeners.push(listener);
    }

    let mut nodes = vec![];
    let mut shutdowns = vec![];
    for (i, listener) in listeners.into_iter().enumerate() {
        let next_peer = addrs[(i + 1) % addrs.len()].clone();
        let node_lock = Arc::new(RwLock::new(RingNode::new(
            ids[i].to_string(),
            next_peer,
            Duration::from_millis(500),
        )));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        tokio::spawn(transport::serve(
            listener,
            Arc::new(NodeHandler::new(node_lock.clone())),
            shutdown_rx,
        ));
        nodes.push(node_lock);
        shutdowns.push(shutdown_tx);
    }

    TestRing {
        addrs,
        nodes,
        _shutdowns: shutdowns,
    }
}

/// Poll the originator until its round completes, or panic after ~2s. The
/// start_roll_call ack does not imply the round has finished, so completion
/// has to be awaited out-of-band.
async fn wait_for_completion(node_lock: &RingNodeLock) {
    for _ in 0..100 {
        if node_lock.read().await.phase() == Phase::Completed {
            return;
        }
        sleep(Duration::from_millis(20)).await;
    }
    panic!("round did not complete in time");
}

#[tokio::test]
async fn test_three_node_ring_closes() {
    let ring = spawn_ring(&["A", "B", "C"]).await;

    let ack = transport::call(&ring.addrs[0], "start_roll_call", vec![], CALL_TIMEOUT)
        .await
        .unwrap();
    assert_eq!(ack, json!("ok"));

    wait_for_completion(&ring.nodes[0]).await;

    let node_a = ring.nodes[0].read().await;
    let result = node_a.last_round_result().unwrap();
    assert_eq!(result.origin, "A");
    assert_eq!(result.hop_count, 2);
    assert_eq!(result.visited, vec!["B", "C"]);
}

#[tokio::test]
async fn test_five_node_ring_visits_in_physical_order() {
    let ring = spawn_ring(&["n1", "n2", "n3", "n4", "n5"]).await;

    // start from the middle of the ring, not just node 0
    transport::call(&ring.addrs[2], "start_roll_call", vec![], CALL_TIMEOUT)
        .await
        .unwrap();
    wait_for_completion(&ring.nodes[2]).await;

    let origin = ring.nodes[2].read().await;
    let result = origin.last_round_result().unwrap();
    assert_eq!(result.origin, "n3");
    assert_eq!(result.hop_count, 4);
    assert_eq!(result.visited, vec!["n4", "n5", "n1", "n2"]);
}

#[tokio::test]
async fn test_new_round_can_start_after_completion() {
    let ring = spawn_ring(&["A", "B", "C"]).await;

    transport::call(&ring.addrs[0], "start_roll_call", vec![], CALL_TIMEOUT)
        .await
        .unwrap();
    wait_for_completion(&ring.nodes[0]).await;

    // second round from the same origin; the stored result is overwritten
    let ack = transport::call(&ring.addrs[0], "start_roll_call", vec![], CALL_TIMEOUT)
        .await
        .unwrap();
    assert_eq!(ack, json!("ok"));
    wait_for_completion(&ring.nodes[0]).await;

    let node_a = ring.nodes[0].read().await;
    assert_eq!(node_a.last_round_result().unwrap().visited, vec!["B", "C"]);
}

#[tokio::test]
async fn test_unreachable_peer_stalls_round_in_originated() {
    // reserve a port, then free it, so A's next peer refuses connections
    let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = probe.local_addr().unwrap().to_string();
    drop(probe);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let node_lock = Arc::new(RwLock::new(RingNode::new(
        "A".to_string(),
        dead_addr,
        Duration::from_millis(200),
    )));
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(transport::serve(
        listener,
        Arc::new(NodeHandler::new(node_lock.clone())),
        shutdown_rx,
    ));

    // the caller still gets an immediate ack; the failure is mid-ring
    let ack = transport::call(&addr, "start_roll_call", vec![], CALL_TIMEOUT)
        .await
        .unwrap();
    assert_eq!(ack, json!("ok"));

    sleep(Duration::from_millis(400)).await;
    {
        let node = node_lock.read().await;
        assert_eq!(node.phase(), Phase::Originated);
        assert!(node.last_round_result().is_none());
    }

    // and while the round is stalled, a second start is rejected
    let err = transport::call(&addr, "start_roll_call", vec![], CALL_TIMEOUT)
        .await
        .unwrap_err();
    match err {
        TransportError::Rpc { code, message } => {
            assert_eq!(code, SERVER_ERROR);
            assert_eq!(message, "AlreadyInProgress");
        }
        other => panic!("expected AlreadyInProgress, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_method_is_rejected_but_ring_still_works() {
    let ring = spawn_ring(&["A", "B", "C"]).await;

    let err = transport::call(&ring.addrs[1], "shutdown_everything", vec![], CALL_TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Rpc { code: -32601, .. }));

    transport::call(&ring.addrs[0], "start_roll_call", vec![], CALL_TIMEOUT)
        .await
        .unwrap();
    wait_for_completion(&ring.nodes[0]).await;
}
