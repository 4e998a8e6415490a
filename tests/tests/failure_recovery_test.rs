//! Crashes, graceful departures and a lossy network
use ringlet_integration_tests::integration::{NetworkInvariants, TestHarness};
use ringlet_node::ChordError;
use serde_json::json;
use std::time::Duration;

async fn ring_with_data(first_port: u16, count: u16, keys: usize) -> (TestHarness, Vec<String>) {
    let harness = TestHarness::new();
    let addresses = harness.build_ring(first_port, count).await.unwrap();
    harness.wait_for_stabilization(40).await.unwrap();
    for i in 0..keys {
        harness
            .insert(&addresses[i % addresses.len()], &format!("key-{}", i), json!(i))
            .await
            .unwrap();
    }
    harness.trigger_stabilization_cycles(1).await;
    (harness, addresses)
}

#[tokio::test]
async fn test_ring_heals_after_crash() {
    let (harness, addresses) = ring_with_data(8300, 6, 20).await;

    harness.fail_node(&addresses[2]).await;
    let rounds = harness.wait_for_stabilization(30).await.unwrap();
    println!("Ring healed after {} rounds", rounds);

    let violations = NetworkInvariants::check_all(&harness).await;
    assert!(violations.is_empty(), "invariants violated: {:?}", violations);
}

#[tokio::test]
async fn test_ring_survives_adjacent_crashes() {
    let (harness, _) = ring_with_data(8310, 7, 20).await;

    // crash two neighbours; successor lists of three still bridge the gap
    let ring = harness.ring_order().await;
    harness.fail_node(&ring[3].peer_id).await;
    harness.fail_node(&ring[4].peer_id).await;
    harness.wait_for_stabilization(30).await.unwrap();

    let violations = NetworkInvariants::check_all(&harness).await;
    assert!(violations.is_empty(), "invariants violated: {:?}", violations);
}

#[tokio::test]
async fn test_graceful_leave() {
    let (harness, _) = ring_with_data(8320, 5, 20).await;
    let ring = harness.ring_order().await;
    let leaving = ring[1].clone();
    let predecessor = ring[0].clone();
    let successor = ring[2].clone();

    harness.leave_node(&leaving.peer_id).await.unwrap();
    // LEAVES_NETWORK is one-way
    tokio::time::sleep(Duration::from_millis(50)).await;

    let successor_node = harness.get_node(&successor.peer_id).await.unwrap();
    assert_eq!(successor_node.predecessor(), Some(predecessor));
    assert!(!harness.network().is_node_registered(&leaving.peer_id).await);

    let left = harness.get_node(&leaving.peer_id).await.unwrap();
    assert!(matches!(
        left.insert("late", json!(0)).await,
        Err(ChordError::Left)
    ));

    harness.wait_for_stabilization(30).await.unwrap();
    let violations = NetworkInvariants::check_all(&harness).await;
    assert!(violations.is_empty(), "invariants violated: {:?}", violations);
}

#[tokio::test]
async fn test_last_two_nodes_after_leave() {
    let (harness, addresses) = ring_with_data(8330, 3, 5).await;

    harness.leave_node(&addresses[0]).await.unwrap();
    harness.wait_for_stabilization(20).await.unwrap();

    let remaining = harness.get_all_node_addresses().await;
    assert_eq!(remaining.len(), 2);
    let violations = NetworkInvariants::check_all(&harness).await;
    assert!(violations.is_empty(), "invariants violated: {:?}", violations);
}

#[tokio::test]
async fn test_operations_with_latency() {
    let (harness, addresses) = ring_with_data(8340, 4, 0).await;
    harness.network().set_latency(5).await;

    harness.insert(&addresses[0], "slow", json!("but steady")).await.unwrap();
    assert_eq!(
        harness.retrieve(&addresses[3], "slow").await.unwrap(),
        vec![json!("but steady")]
    );
    assert!(harness.network().delivered_count() > 0);
}

#[tokio::test]
async fn test_recovered_node_rejoins() {
    let (harness, addresses) = ring_with_data(8350, 4, 10).await;

    harness.fail_node(&addresses[1]).await;
    harness.wait_for_stabilization(30).await.unwrap();

    // a crashed node comes back as a fresh process on a new port
    let replacement = harness.add_node(8354).await.unwrap();
    harness
        .connect_node_to_network(&replacement, Some(&addresses[0]))
        .await
        .unwrap();
    harness.wait_for_stabilization(30).await.unwrap();

    let violations = NetworkInvariants::check_all(&harness).await;
    assert!(violations.is_empty(), "invariants violated: {:?}", violations);
}
