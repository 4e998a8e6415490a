use std::fmt;

use ringlet_lib::dht_messages::NodeInfo;
use ringlet_lib::{Entry, EntryList, Id};
use serde::{Deserialize, Serialize};

use crate::finger_table::FingerTable;
use crate::peer::Peer;
use crate::successor_list::SuccessorList;

/// Work the reference structures ask the node to carry out on other peers.
///
/// The structures are plain data guarded by the node's lock; they only record
/// what has to happen and the node performs it after releasing the lock.
#[derive(Debug, Clone, PartialEq)]
pub enum RingAction {
    InsertReplicas {
        to: Peer,
        entries: Vec<Entry>,
    },
    /// An empty `entries` list asks `to` to drop every replica in `(to, from)`.
    RemoveReplicas {
        to: Peer,
        from: Id,
        entries: Vec<Entry>,
    },
    Disconnect {
        peer: Peer,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceStatus {
    pub successors: Vec<NodeInfo>,
    pub predecessor: Option<NodeInfo>,
    pub finger_table: Vec<Option<NodeInfo>>,
}

/// Every remote node the local node currently knows about.
#[derive(Debug, Clone)]
pub struct ReferenceList {
    local: Peer,
    finger_table: FingerTable,
    successors: SuccessorList,
    predecessor: Option<Peer>,
    actions: Vec<RingAction>,
}

impl ReferenceList {
    pub fn new(local: Peer, successor_list_size: usize) -> Self {
        ReferenceList {
            finger_table: FingerTable::new(local.id.clone()),
            successors: SuccessorList::new(local.id.clone(), successor_list_size),
            predecessor: None,
            actions: Vec::new(),
            local,
        }
    }

    pub fn local(&self) -> &Peer {
        &self.local
    }

    pub fn add_reference(&mut self, node: &Peer, entries: &EntryList) {
        if *node == self.local {
            return;
        }

        for evicted in self.finger_table.add_reference(node) {
            self.disconnect_if_unreferenced(&evicted);
        }
        self.add_successor(node, entries);
    }

    fn add_successor(&mut self, node: &Peer, entries: &EntryList) {
        // without a predecessor the owned range is unknown; set_predecessor
        // pushes it to every successor once one arrives
        let local = &self.local.id;
        let predecessor = self.predecessor.as_ref().map(|p| &p.id);
        let replicas = || match predecessor {
            Some(from) => entries.get_entries_in_interval(from, local),
            None => Vec::new(),
        };

        let evicted = self
            .successors
            .add_successor(node, replicas, &mut self.actions);
        if let Some(evicted) = evicted {
            self.disconnect_if_unreferenced(&evicted);
        }
    }

    pub fn remove_reference(&mut self, node: &Peer, entries: &EntryList) {
        if *node == self.local {
            return;
        }

        self.finger_table.remove_reference(node);

        self.successors.remove(node);
        let refill: Vec<Peer> = self
            .finger_table
            .first_entries(self.successors.capacity())
            .into_iter()
            .filter(|candidate| candidate != node)
            .collect();
        for candidate in &refill {
            self.add_successor(candidate, entries);
        }

        if self.predecessor.as_ref() == Some(node) {
            self.predecessor = None;
        }

        self.disconnect_if_unreferenced(node);

        // successors may fill finger slots the removed node left empty
        let successors = self.successors.references().to_vec();
        for successor in &successors {
            for evicted in self.finger_table.add_reference(successor) {
                self.disconnect_if_unreferenced(&evicted);
            }
        }
    }

    pub fn successor(&self) -> Option<&Peer> {
        self.successors.direct_successor()
    }

    pub fn successors(&self) -> Vec<Peer> {
        self.successors.references().to_vec()
    }

    pub fn predecessor(&self) -> Option<&Peer> {
        self.predecessor.as_ref()
    }

    /// Best next hop towards `key` among fingers, successors and predecessor:
    /// the candidate with the smallest clockwise distance to `key`.
    pub fn closest_preceding_node(&self, key: &Id) -> Option<Peer> {
        if *key == self.local.id {
            return None;
        }

        let mut candidates: Vec<&Peer> = Vec::with_capacity(3);
        if let Some(node) = self.finger_table.closest_preceding_node(key) {
            candidates.push(node);
        }
        if let Some(node) = self.successors.closest_preceding_node(key) {
            candidates.push(node);
        }
        if let Some(predecessor) = &self.predecessor {
            if key.is_in_interval(&predecessor.id, &self.local.id) {
                candidates.push(predecessor);
            }
        }

        candidates
            .into_iter()
            .min_by(|a, b| key.sub(&a.id).cmp(&key.sub(&b.id)))
            .cloned()
    }

    /// Adopts `candidate` as predecessor if there is none yet or it sits
    /// between the current one and the local node. It is recorded as a
    /// regular reference either way.
    pub fn add_reference_as_predecessor(&mut self, candidate: &Peer, entries: &EntryList) {
        if *candidate == self.local {
            return;
        }

        let accept = match &self.predecessor {
            None => true,
            Some(current) => candidate.id.is_in_interval(&current.id, &self.local.id),
        };
        if accept {
            self.set_predecessor(candidate, entries);
        }

        self.add_reference(candidate, entries);
    }

    fn set_predecessor(&mut self, node: &Peer, entries: &EntryList) {
        if *node == self.local || self.predecessor.as_ref() == Some(node) {
            return;
        }

        match self.predecessor.replace(node.clone()) {
            Some(former) => {
                self.disconnect_if_unreferenced(&former);
                if self.successors.is_full() {
                    if let Some(last) = self.successors.last() {
                        self.actions.push(RingAction::RemoveReplicas {
                            to: last.clone(),
                            from: node.id.clone(),
                            entries: Vec::new(),
                        });
                    }
                }
            }
            None => {
                let replicas = entries.get_entries_in_interval(&node.id, &self.local.id);
                if replicas.is_empty() {
                    return;
                }
                for successor in self.successors.references() {
                    self.actions.push(RingAction::InsertReplicas {
                        to: successor.clone(),
                        entries: replicas.clone(),
                    });
                }
            }
        }
    }

    pub fn disconnect_if_unreferenced(&mut self, node: &Peer) {
        if !self.contains_reference(node) {
            self.actions.push(RingAction::Disconnect { peer: node.clone() });
        }
    }

    pub fn first_finger_table_entries(&self, count: usize) -> Vec<Peer> {
        self.finger_table.first_entries(count)
    }

    pub fn contains_reference(&self, node: &Peer) -> bool {
        self.finger_table.contains_reference(node)
            || self.successors.contains_reference(node)
            || self.predecessor.as_ref() == Some(node)
    }

    pub fn drain_actions(&mut self) -> Vec<RingAction> {
        std::mem::take(&mut self.actions)
    }

    pub fn statuses(&self) -> ReferenceStatus {
        ReferenceStatus {
            successors: self.successors.status(),
            predecessor: self.predecessor.as_ref().map(Peer::to_info),
            finger_table: self.finger_table.status(),
        }
    }
}

impl fmt::Display for ReferenceList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.successors)?;
        writeln!(f, "[Predecessor]")?;
        if let Some(predecessor) = &self.predecessor {
            writeln!(f, "{}", predecessor)?;
        }
        writeln!(f)?;
        write!(f, "{}", self.finger_table)
    }
}
