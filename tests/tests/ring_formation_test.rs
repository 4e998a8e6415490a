//! Ring formation: create, join and stabilize rings of various sizes
use ringlet_integration_tests::integration::{NetworkInvariants, TestHarness};
use ringlet_node::ChordError;
use serde_json::json;

#[tokio::test]
async fn test_single_node_ring() {
    let harness = TestHarness::new();
    let addresses = harness.build_ring(8100, 1).await.unwrap();
    let node = harness.get_node(&addresses[0]).await.unwrap();

    assert!(node.successor().is_none());
    assert!(node.predecessor().is_none());

    harness.insert(&addresses[0], "solo", json!("value")).await.unwrap();
    assert_eq!(
        harness.retrieve(&addresses[0], "solo").await.unwrap(),
        vec![json!("value")]
    );
}

#[tokio::test]
async fn test_two_node_ring() {
    let harness = TestHarness::new();
    let addresses = harness.build_ring(8110, 2).await.unwrap();
    harness.wait_for_stabilization(10).await.unwrap();

    let first = harness.get_node(&addresses[0]).await.unwrap();
    let second = harness.get_node(&addresses[1]).await.unwrap();
    assert_eq!(first.successor().unwrap().peer_id, addresses[1]);
    assert_eq!(second.successor().unwrap().peer_id, addresses[0]);
    assert_eq!(first.predecessor().unwrap().peer_id, addresses[1]);
    assert_eq!(second.predecessor().unwrap().peer_id, addresses[0]);

    let violations = NetworkInvariants::check_all(&harness).await;
    assert!(violations.is_empty(), "invariants violated: {:?}", violations);
}

#[tokio::test]
async fn test_three_node_ring() {
    let harness = TestHarness::new();
    harness.build_ring(8120, 3).await.unwrap();
    harness.wait_for_stabilization(20).await.unwrap();

    let violations = NetworkInvariants::check_all(&harness).await;
    assert!(violations.is_empty(), "invariants violated: {:?}", violations);
}

#[tokio::test]
async fn test_ten_node_ring() {
    let harness = TestHarness::new();
    harness.build_ring(8130, 10).await.unwrap();
    let rounds = harness.wait_for_stabilization(60).await.unwrap();
    println!("Ten node ring stabilized after {} rounds", rounds);

    let violations = NetworkInvariants::check_all(&harness).await;
    assert!(violations.is_empty(), "invariants violated: {:?}", violations);

    // every successor list holds the next nodes in ring order
    let ring = harness.ring_order().await;
    let size = harness.successor_list_size();
    for (index, peer) in ring.iter().enumerate() {
        let node = harness.get_node(&peer.peer_id).await.unwrap();
        let expected: Vec<_> = (1..=size)
            .map(|step| ring[(index + step) % ring.len()].clone())
            .collect();
        assert_eq!(node.successors(), expected, "successor list of {}", peer.peer_id);
    }
}

#[tokio::test]
async fn test_join_order_does_not_matter() {
    let harness = TestHarness::new();
    let addresses = harness.build_ring(8150, 2).await.unwrap();

    // late nodes join through the most recent member rather than the first
    let mut bootstrap = addresses[1].clone();
    for port in 8152..8156 {
        let address = harness.add_node(port).await.unwrap();
        harness
            .connect_node_to_network(&address, Some(&bootstrap))
            .await
            .unwrap();
        harness.trigger_stabilization_cycles(2).await;
        bootstrap = address;
    }

    harness.wait_for_stabilization(40).await.unwrap();
    let violations = NetworkInvariants::check_all(&harness).await;
    assert!(violations.is_empty(), "invariants violated: {:?}", violations);
}

#[tokio::test]
async fn test_join_through_unreachable_bootstrap() {
    let harness = TestHarness::new();
    let address = harness.add_node(8160).await.unwrap();
    let node = harness.get_node(&address).await.unwrap();

    let result = node.join("127.0.0.1:8169").await;
    assert!(matches!(result, Err(ChordError::Rpc(_))), "got {:?}", result);
    assert!(node.successor().is_none());
    assert!(matches!(
        node.insert("key", json!(1)).await,
        Err(ChordError::NotJoined)
    ));

    // a failed join leaves the node free to start its own ring
    node.create().await.unwrap();
    node.insert("key", json!(1)).await.unwrap();
}

#[tokio::test]
async fn test_create_twice_is_rejected() {
    let harness = TestHarness::new();
    let addresses = harness.build_ring(8170, 2).await.unwrap();
    let node = harness.get_node(&addresses[1]).await.unwrap();

    assert!(matches!(node.create().await, Err(ChordError::AlreadyJoined)));
    assert!(matches!(
        node.join(&addresses[0]).await,
        Err(ChordError::AlreadyJoined)
    ));
}
