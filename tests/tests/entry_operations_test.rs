//! Insert, retrieve and remove across a stabilized ring, plus replica placement
use futures::future::join_all;
use ringlet_integration_tests::integration::{NetworkInvariants, TestHarness};
use ringlet_node::Id;
use serde_json::json;

async fn stable_ring(first_port: u16, count: u16) -> (TestHarness, Vec<String>) {
    let harness = TestHarness::new();
    let addresses = harness.build_ring(first_port, count).await.unwrap();
    harness.wait_for_stabilization(40).await.unwrap();
    (harness, addresses)
}

#[tokio::test]
async fn test_insert_is_visible_from_every_node() {
    let (harness, addresses) = stable_ring(8200, 5).await;

    harness.insert(&addresses[0], "color", json!("red")).await.unwrap();
    harness.insert(&addresses[3], "color", json!("blue")).await.unwrap();

    for address in &addresses {
        let mut values = harness.retrieve(address, "color").await.unwrap();
        values.sort_by_key(|v| v.to_string());
        assert_eq!(values, vec![json!("blue"), json!("red")], "via {}", address);
    }
}

#[tokio::test]
async fn test_entry_lands_on_owner() {
    let (harness, addresses) = stable_ring(8210, 5).await;

    for i in 0..10 {
        let key = format!("owned-{}", i);
        harness.insert(&addresses[i % addresses.len()], &key, json!(i)).await.unwrap();

        let owner = harness.expected_owner(&key).await.unwrap();
        let node = harness.get_node(&owner.peer_id).await.unwrap();
        assert!(
            node.get_entries().iter().any(|entry| entry.value == json!(i)),
            "{} is missing from its owner {}",
            key,
            owner.peer_id
        );
    }
}

#[tokio::test]
async fn test_replicas_reach_successors() {
    let (harness, addresses) = stable_ring(8220, 6).await;

    for i in 0..15 {
        let key = format!("replicated-{}", i);
        harness.insert(&addresses[0], &key, json!({"n": i})).await.unwrap();
    }
    harness.trigger_stabilization_cycles(1).await;

    let violations = NetworkInvariants::check_replication(&harness).await;
    assert!(violations.is_empty(), "replicas missing: {:?}", violations);
}

#[tokio::test]
async fn test_remove_deletes_value_and_replicas() {
    let (harness, addresses) = stable_ring(8230, 4).await;

    harness.insert(&addresses[1], "fruit", json!("apple")).await.unwrap();
    harness.insert(&addresses[1], "fruit", json!("pear")).await.unwrap();
    harness.trigger_stabilization_cycles(1).await;

    harness.remove(&addresses[2], "fruit", json!("apple")).await.unwrap();
    harness.trigger_stabilization_cycles(1).await;

    for address in &addresses {
        assert_eq!(
            harness.retrieve(address, "fruit").await.unwrap(),
            vec![json!("pear")]
        );
        let node = harness.get_node(address).await.unwrap();
        assert!(
            node.get_entries().iter().all(|entry| entry.value != json!("apple")),
            "{} still holds a removed replica",
            address
        );
    }
}

#[tokio::test]
async fn test_missing_key_yields_nothing() {
    let (harness, addresses) = stable_ring(8240, 3).await;
    for address in &addresses {
        assert!(harness.retrieve(address, "never-stored").await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_concurrent_inserts() {
    let (harness, addresses) = stable_ring(8250, 5).await;

    let inserts = (0..20).map(|i| {
        let node = addresses[i % addresses.len()].clone();
        let harness = &harness;
        async move {
            harness
                .insert(&node, &format!("burst-{}", i), json!(i))
                .await
                .map_err(|e| e.to_string())
        }
    });
    for result in join_all(inserts).await {
        result.unwrap();
    }

    let violations = NetworkInvariants::check_data_availability(&harness).await;
    assert!(violations.is_empty(), "data unavailable: {:?}", violations);
}

#[tokio::test]
async fn test_joining_node_takes_over_its_keys() {
    let (harness, addresses) = stable_ring(8260, 4).await;
    for i in 0..30 {
        harness
            .insert(&addresses[i % addresses.len()], &format!("handover-{}", i), json!(i))
            .await
            .unwrap();
    }

    let newcomer = harness.add_node(8264).await.unwrap();
    harness
        .connect_node_to_network(&newcomer, Some(&addresses[0]))
        .await
        .unwrap();
    harness.wait_for_stabilization(30).await.unwrap();

    let node = harness.get_node(&newcomer).await.unwrap();
    for (key, values) in harness.get_stored_data().await {
        let owner = harness.expected_owner(&key).await.unwrap();
        if owner.peer_id != newcomer {
            continue;
        }
        for value in values {
            assert!(
                node.get_entries().iter().any(|entry| entry.value == value),
                "newcomer lacks {}",
                key
            );
        }
    }

    let violations = NetworkInvariants::check_all(&harness).await;
    assert!(violations.is_empty(), "invariants violated: {:?}", violations);
}

#[tokio::test]
async fn test_evicted_successor_drops_replicas() {
    let (harness, addresses) = stable_ring(8270, 6).await;
    let ring = harness.ring_order().await;
    let owner = ring[0].clone();
    let owner_node = harness.get_node(&owner.peer_id).await.unwrap();
    let farthest = owner_node.successors().last().cloned().unwrap();

    let mut owned = Vec::new();
    for i in 0..200 {
        let key = format!("converge-{}", i);
        if harness.expected_owner(&key).await == Some(owner.clone()) {
            harness.insert(&addresses[0], &key, json!(i)).await.unwrap();
            owned.push(Id::create_with_size(&key, harness.id_size()).unwrap());
        }
    }
    assert!(!owned.is_empty());

    let farthest_node = harness.get_node(&farthest.peer_id).await.unwrap();
    let holds = |id: &Id| farthest_node.get_entries().iter().any(|entry| &entry.id == id);
    assert!(owned.iter().all(|id| holds(id)), "{} should start out as a replica", farthest.peer_id);

    // a newcomer right behind the owner pushes the farthest successor out of its list
    let port = (8300..9300)
        .find(|port| {
            Id::create_with_size(&format!("127.0.0.1:{}", port), harness.id_size())
                .is_ok_and(|id| id.is_in_interval(&owner.id, &ring[1].id))
        })
        .unwrap();
    let newcomer = harness.add_node(port).await.unwrap();
    harness
        .connect_node_to_network(&newcomer, Some(&addresses[0]))
        .await
        .unwrap();
    harness.wait_for_stabilization(30).await.unwrap();

    assert!(!owner_node.successors().contains(&farthest));
    assert!(
        owned.iter().all(|id| !holds(id)),
        "{} still holds replicas it is no longer responsible for",
        farthest.peer_id
    );

    let violations = NetworkInvariants::check_replication(&harness).await;
    assert!(violations.is_empty(), "replicas missing: {:?}", violations);
}
