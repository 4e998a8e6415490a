//! Integration Testing Framework for ringlet nodes
//!
//! Runs several real `ChordNode`s in one process. Messages travel through an
//! in-memory simulator instead of TCP, so tests can crash nodes, drop
//! messages and drive stabilization rounds by hand.

pub mod test_harness;

pub use invariants::{InvariantViolation, NetworkInvariants};
pub use network_simulator::{NetworkSimulator, SimulatedTransport};
pub use test_harness::{TestHarness, TestNode};
