use crate::integration::{NetworkInvariants, NetworkSimulator, SimulatedTransport};
use ringlet_node::{ChordNode, Config, Id, Peer};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

pub type TestNode = ChordNode<SimulatedTransport>;

/// Main test harness that orchestrates multi-node ring tests.
///
/// Periodic tasks are disabled on every node; tests drive stabilization
/// explicitly through [`TestHarness::trigger_stabilization_round`].
pub struct TestHarness {
    /// Simulated network for message routing
    network: NetworkSimulator,
    /// Running node instances by peer id
    nodes: Arc<RwLock<HashMap<String, TestNode>>>,
    /// Nodes that crashed or left, still around for inspection
    departed: Arc<RwLock<HashSet<String>>>,
    /// Tracks data stored during tests for invariant checking
    stored_data: Arc<RwLock<BTreeMap<String, Vec<Value>>>>,
    id_size: usize,
    successor_list_size: usize,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_ring_settings(ringlet_lib::DEFAULT_ID_SIZE, 3)
    }

    pub fn with_ring_settings(id_size: usize, successor_list_size: usize) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        Self {
            network: NetworkSimulator::new(),
            nodes: Arc::new(RwLock::new(HashMap::new())),
            departed: Arc::new(RwLock::new(HashSet::new())),
            stored_data: Arc::new(RwLock::new(BTreeMap::new())),
            id_size,
            successor_list_size,
        }
    }

    pub fn node_config(&self, peer_id: &str) -> Config {
        Config {
            peer_id: peer_id.to_string(),
            id_size: self.id_size,
            successor_list_size: self.successor_list_size,
            stabilize_task_interval: Duration::ZERO,
            fix_finger_task_interval: Duration::ZERO,
            check_predecessor_task_interval: Duration::ZERO,
            request_timeout: Duration::from_secs(2),
            ..Config::default()
        }
    }

    /// Add a new node to the network, not yet part of any ring
    pub async fn add_node(&self, port: u16) -> Result<String, Box<dyn Error>> {
        let address = format!("127.0.0.1:{}", port);
        let inbox = self.network.register_node(&address).await;
        let transport = Arc::new(self.network.create_transport(&address));
        let node = ChordNode::new(self.node_config(&address), transport, inbox)?;

        self.nodes.write().await.insert(address.clone(), node);
        Ok(address)
    }

    /// Adds `count` nodes on consecutive ports, creates a ring on the first
    /// one and joins the others through it. A couple of stabilization rounds
    /// run after every join, standing in for the periodic tasks.
    pub async fn build_ring(&self, first_port: u16, count: u16) -> Result<Vec<String>, Box<dyn Error>> {
        let mut addresses = Vec::new();
        for offset in 0..count {
            addresses.push(self.add_node(first_port + offset).await?);
        }

        if let Some((first, rest)) = addresses.split_first() {
            self.connect_node_to_network(first, None).await?;
            for address in rest {
                self.connect_node_to_network(address, Some(first)).await?;
                self.trigger_stabilization_cycles(2).await;
            }
        }
        Ok(addresses)
    }

    /// Create a new ring, or join the one `bootstrap_address` belongs to
    pub async fn connect_node_to_network(
        &self,
        node_address: &str,
        bootstrap_address: Option<&str>,
    ) -> Result<(), Box<dyn Error>> {
        let node = self
            .get_node(node_address)
            .await
            .ok_or_else(|| format!("Node {} not found", node_address))?;

        match bootstrap_address {
            Some(bootstrap) => node.join(bootstrap).await?,
            None => node.create().await?,
        }
        Ok(())
    }

    /// Simulate a crash: the node stops answering without telling anyone
    pub async fn fail_node(&self, address: &str) {
        self.network.mark_node_failed(address).await;
        self.departed.write().await.insert(address.to_string());
    }

    /// Leave the ring gracefully
    pub async fn leave_node(&self, address: &str) -> Result<(), Box<dyn Error>> {
        let node = self
            .get_node(address)
            .await
            .ok_or_else(|| format!("Node {} not found", address))?;
        node.leave().await?;
        self.departed.write().await.insert(address.to_string());
        Ok(())
    }

    /// Get node by address, including departed ones
    pub async fn get_node(&self, address: &str) -> Option<TestNode> {
        self.nodes.read().await.get(address).cloned()
    }

    /// Addresses of nodes that are still up, sorted
    pub async fn get_all_node_addresses(&self) -> Vec<String> {
        let departed = self.departed.read().await;
        let mut addresses: Vec<String> = self
            .nodes
            .read()
            .await
            .keys()
            .filter(|address| !departed.contains(*address))
            .cloned()
            .collect();
        addresses.sort();
        addresses
    }

    /// Live nodes in ring order, starting at the smallest id
    pub async fn ring_order(&self) -> Vec<Peer> {
        let mut peers: Vec<Peer> = Vec::new();
        for address in self.get_all_node_addresses().await {
            if let Some(node) = self.get_node(&address).await {
                peers.push(Peer::with_id(address, node.node_id().clone()));
            }
        }
        peers.sort_by(|a, b| a.id.cmp(&b.id));
        peers
    }

    /// The live node responsible for `key`
    pub async fn expected_owner(&self, key: &str) -> Option<Peer> {
        let id = Id::create_with_size(key, self.id_size).ok()?;
        let ring = self.ring_order().await;
        ring.iter()
            .find(|peer| peer.id >= id)
            .or_else(|| ring.first())
            .cloned()
    }

    /// Trigger a single round of stabilization on all live nodes
    pub async fn trigger_stabilization_round(&self) {
        for address in self.get_all_node_addresses().await {
            if let Some(node) = self.get_node(&address).await {
                node.check_predecessor().await;
                node.stabilize().await;
                node.fix_fingers().await;
            }
        }
    }

    pub async fn trigger_stabilization_cycles(&self, rounds: usize) {
        for _ in 0..rounds {
            self.trigger_stabilization_round().await;
            // let one-way replica messages land
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Runs stabilization rounds until successors and predecessors line up
    /// with ring order, then a few more to settle fingers and replicas.
    pub async fn wait_for_stabilization(&self, max_rounds: usize) -> Result<usize, Box<dyn Error>> {
        for round in 1..=max_rounds {
            self.trigger_stabilization_cycles(1).await;
            if NetworkInvariants::check_ring_order(self).await.is_empty() {
                self.trigger_stabilization_cycles(3).await;
                return Ok(round);
            }
        }
        let violations = NetworkInvariants::check_ring_order(self).await;
        Err(format!(
            "ring not stable after {} rounds: {:?}",
            max_rounds, violations
        )
        .into())
    }

    /// Insert through a specific node and remember the value for invariant checks
    pub async fn insert(&self, node_address: &str, key: &str, value: Value) -> Result<(), Box<dyn Error>> {
        let node = self
            .get_node(node_address)
            .await
            .ok_or_else(|| format!("Node {} not found", node_address))?;
        node.insert(key, value.clone()).await?;
        self.stored_data
            .write()
            .await
            .entry(key.to_string())
            .or_default()
            .push(value);
        Ok(())
    }

    /// Retrieve through a specific node with timeout
    pub async fn retrieve(&self, node_address: &str, key: &str) -> Result<Vec<Value>, Box<dyn Error>> {
        let node = self
            .get_node(node_address)
            .await
            .ok_or_else(|| format!("Node {} not found", node_address))?;

        match tokio::time::timeout(Duration::from_secs(5), node.retrieve(key)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err("retrieve timed out after 5 seconds".into()),
        }
    }

    pub async fn remove(&self, node_address: &str, key: &str, value: Value) -> Result<(), Box<dyn Error>> {
        let node = self
            .get_node(node_address)
            .await
            .ok_or_else(|| format!("Node {} not found", node_address))?;
        node.remove(key, value.clone()).await?;
        let mut stored = self.stored_data.write().await;
        if let Some(values) = stored.get_mut(key) {
            values.retain(|v| *v != value);
            if values.is_empty() {
                stored.remove(key);
            }
        }
        Ok(())
    }

    pub async fn get_stored_data(&self) -> BTreeMap<String, Vec<Value>> {
        self.stored_data.read().await.clone()
    }

    pub fn network(&self) -> &NetworkSimulator {
        &self.network
    }

    pub fn id_size(&self) -> usize {
        self.id_size
    }

    pub fn successor_list_size(&self) -> usize {
        self.successor_list_size
    }
}
