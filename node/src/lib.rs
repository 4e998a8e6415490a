//! Ringlet DHT node library
//!
//! A Chord-style overlay node: reference bookkeeping, the ring protocol,
//! request routing over a pluggable transport and a small HTTP status API.
//! Used by the `ringlet-node` binary and by the integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod finger_table;
mod handler;
pub mod node;
pub mod peer;
pub mod reference_list;
pub mod remote_node;
pub mod ring_node;
pub mod rpc;
pub mod successor_list;
mod tasks;
pub mod transport;

pub use config::Config;
pub use error::{ChordError, ConfigError, RpcError};
pub use node::{ChordNode, EntryEvent, NodeStatus};
pub use peer::Peer;
pub use ring_node::{RingNode, Routing};
pub use transport::{Envelope, TcpTransport, Transport};

// Re-export from lib crate for convenience
pub use ringlet_lib::dht_messages::{Message, NodeInfo};
pub use ringlet_lib::{Entry, EntryList, Id};
