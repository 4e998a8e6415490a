use std::fmt;

use ringlet_lib::dht_messages::NodeInfo;
use ringlet_lib::Id;

use crate::peer::Peer;

/// Routing shortcuts of the local node.
///
/// Slot `i` holds the closest known node preceding `local + 2^i`. A node at
/// distance `d` from the local id is only ever stored from slot
/// `floor(log2 d) + 1` onwards, so the occupied slots always form contiguous
/// runs whose nodes get farther away as the index grows.
#[derive(Debug, Clone)]
pub struct FingerTable {
    local: Id,
    table: Vec<Option<Peer>>,
    targets: Vec<Id>,
}

impl FingerTable {
    pub fn new(local: Id) -> Self {
        let bits = local.bit_length();
        let targets = (0..bits)
            .filter_map(|i| local.add_power_of_two(i).ok())
            .collect();
        FingerTable {
            local,
            table: vec![None; bits],
            targets,
        }
    }

    pub fn size(&self) -> usize {
        self.table.len()
    }

    pub fn get(&self, index: usize) -> Option<&Peer> {
        self.table.get(index).and_then(Option::as_ref)
    }

    /// Stores `node` in every slot it serves better than the current occupant.
    ///
    /// Returns the distinct nodes that were pushed out so the caller can
    /// decide whether they are still referenced anywhere else.
    pub fn add_reference(&mut self, node: &Peer) -> Vec<Peer> {
        let Some(index) = node.id.interval_power_of_two_from(&self.local) else {
            return Vec::new();
        };

        let mut evicted: Vec<Peer> = Vec::new();
        for i in index + 1..self.table.len() {
            let (Some(slot), Some(target)) = (self.table.get_mut(i), self.targets.get(i)) else {
                break;
            };
            let replace = match slot {
                None => true,
                Some(occupant) => node.id.is_in_interval(&occupant.id, target),
            };
            if !replace {
                break;
            }
            if let Some(old) = slot.replace(node.clone()) {
                if !evicted.contains(&old) {
                    evicted.push(old);
                }
            }
        }
        evicted
    }

    pub fn closest_preceding_node(&self, key: &Id) -> Option<&Peer> {
        let index = key.interval_power_of_two_from(&self.local)?;
        self.get(index)
    }

    /// Clears every slot held by `node`, falling back to the occupant of the
    /// slot just below its first one (which may be empty).
    pub fn remove_reference(&mut self, node: &Peer) {
        let Some(index) = node.id.interval_power_of_two_from(&self.local) else {
            return;
        };

        let replacement = self.get(index).cloned();
        for i in index + 1..self.table.len() {
            let Some(slot) = self.table.get_mut(i) else {
                break;
            };
            if slot.as_ref() != Some(node) {
                break;
            }
            *slot = replacement.clone();
        }
    }

    /// Up to `count` distinct nodes in slot order, nearest first.
    pub fn first_entries(&self, count: usize) -> Vec<Peer> {
        let mut result: Vec<Peer> = Vec::new();
        for node in self.table.iter().flatten() {
            if result.len() >= count {
                break;
            }
            if result.last() != Some(node) {
                result.push(node.clone());
            }
        }
        result
    }

    pub fn contains_reference(&self, node: &Peer) -> bool {
        match node.id.interval_power_of_two_from(&self.local) {
            Some(index) => self.get(index + 1) == Some(node),
            None => false,
        }
    }

    pub fn status(&self) -> Vec<Option<NodeInfo>> {
        self.table
            .iter()
            .map(|slot| slot.as_ref().map(Peer::to_info))
            .collect()
    }
}

impl fmt::Display for FingerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[FingerTable]")?;
        let last = self.table.len().saturating_sub(1);
        for (i, slot) in self.table.iter().enumerate() {
            let Some(node) = slot else {
                continue;
            };
            let same_at = |j: usize| self.get(j) == Some(node);

            if i == 0 || !same_at(i - 1) {
                writeln!(f, "[{}] {}", i, node)?;
            } else if i == last || !same_at(i + 1) {
                writeln!(f, "[{}]", i)?;
            } else if i == 1 || !same_at(i - 2) {
                writeln!(f, "...")?;
            }
        }
        Ok(())
    }
}
