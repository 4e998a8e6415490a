use std::fmt;
use std::hash::{Hash, Hasher};

use ringlet_lib::dht_messages::NodeInfo;
use ringlet_lib::{Id, IdError};

/// A ring member as known locally: its transport address and ring position.
///
/// Two peers are equal when their ids are equal.
#[derive(Debug, Clone)]
pub struct Peer {
    pub peer_id: String,
    pub id: Id,
}

impl Peer {
    /// Derives the ring id by hashing `peer_id`.
    pub fn new(peer_id: impl Into<String>, id_size: usize) -> Result<Self, IdError> {
        let peer_id = peer_id.into();
        let id = Id::create_with_size(&peer_id, id_size)?;
        Ok(Peer { peer_id, id })
    }

    pub fn with_id(peer_id: impl Into<String>, id: Id) -> Self {
        Peer {
            peer_id: peer_id.into(),
            id,
        }
    }

    /// Rebuilds a peer from a wire descriptor; any `node_id` it carries is ignored.
    pub fn from_info(info: &NodeInfo, id_size: usize) -> Result<Self, IdError> {
        Self::new(info.peer_id.clone(), id_size)
    }

    pub fn to_info(&self) -> NodeInfo {
        NodeInfo {
            peer_id: self.peer_id.clone(),
            node_id: Some(self.id.clone()),
        }
    }
}

impl PartialEq for Peer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Peer {}

impl Hash for Peer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.peer_id)
    }
}
