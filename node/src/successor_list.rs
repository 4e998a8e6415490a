use std::fmt;

use ringlet_lib::dht_messages::NodeInfo;
use ringlet_lib::{Entry, Id};

use crate::peer::Peer;
use crate::reference_list::RingAction;

/// The next few nodes clockwise from the local id, nearest first.
#[derive(Debug, Clone)]
pub struct SuccessorList {
    local: Id,
    capacity: usize,
    successors: Vec<Peer>,
}

impl SuccessorList {
    pub fn new(local: Id, capacity: usize) -> Self {
        SuccessorList {
            local,
            capacity: capacity.max(1),
            successors: Vec::with_capacity(capacity + 1),
        }
    }

    /// Inserts `node` in ring order.
    ///
    /// A node that is already listed, or that lies beyond the farthest
    /// successor of a full list, is rejected. On insertion the entries produced
    /// by `replicas` are pushed to the new successor. If the list overflows,
    /// its farthest member is told to drop what it holds for this node and is
    /// returned so the caller can check whether it is still referenced.
    pub fn add_successor<F>(
        &mut self,
        node: &Peer,
        replicas: F,
        actions: &mut Vec<RingAction>,
    ) -> Option<Peer>
    where
        F: FnOnce() -> Vec<Entry>,
    {
        if node.id == self.local || self.contains_reference(node) {
            return None;
        }
        if self.is_full() {
            if let Some(last) = self.successors.last() {
                if node.id.is_in_interval(&last.id, &self.local) {
                    return None;
                }
            }
        }

        let position = self
            .successors
            .iter()
            .position(|s| node.id.is_in_interval(&self.local, &s.id))
            .unwrap_or(self.successors.len());
        self.successors.insert(position, node.clone());

        let entries = replicas();
        if !entries.is_empty() {
            actions.push(RingAction::InsertReplicas {
                to: node.clone(),
                entries,
            });
        }

        if self.successors.len() > self.capacity {
            let evicted = self.successors.pop()?;
            actions.push(RingAction::RemoveReplicas {
                to: evicted.clone(),
                from: self.local.clone(),
                entries: Vec::new(),
            });
            return Some(evicted);
        }
        None
    }

    pub fn direct_successor(&self) -> Option<&Peer> {
        self.successors.first()
    }

    pub fn last(&self) -> Option<&Peer> {
        self.successors.last()
    }

    /// The farthest successor that still lies in `(local, key)`.
    pub fn closest_preceding_node(&self, key: &Id) -> Option<&Peer> {
        self.successors
            .iter()
            .rev()
            .find(|s| s.id.is_in_interval(&self.local, key))
    }

    /// Drops `node`; refilling from the finger table is up to the caller.
    pub fn remove(&mut self, node: &Peer) -> bool {
        let before = self.successors.len();
        self.successors.retain(|s| s != node);
        self.successors.len() != before
    }

    pub fn references(&self) -> &[Peer] {
        &self.successors
    }

    pub fn len(&self) -> usize {
        self.successors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.successors.len() >= self.capacity
    }

    pub fn contains_reference(&self, node: &Peer) -> bool {
        self.successors.contains(node)
    }

    pub fn status(&self) -> Vec<NodeInfo> {
        self.successors.iter().map(Peer::to_info).collect()
    }
}

impl fmt::Display for SuccessorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Successors]")?;
        for (i, node) in self.successors.iter().enumerate() {
            writeln!(f, "[{}] {}", i, node)?;
        }
        Ok(())
    }
}
