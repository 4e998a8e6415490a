use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use ringlet_lib::{Entry, Id};

use crate::error::ChordError;
use crate::peer::Peer;

/// Outcome of a single routing step: either the answer, or the node to ask next.
#[derive(Debug, Clone, PartialEq)]
pub enum Routing<T> {
    Success(T),
    Redirect(Peer),
}

impl<T> Routing<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Routing<U> {
        match self {
            Routing::Success(value) => Routing::Success(f(value)),
            Routing::Redirect(next) => Routing::Redirect(next),
        }
    }
}

/// The operations every ring member offers, whether it lives in this process
/// or behind the transport.
#[async_trait]
pub trait RingNode: Send + Sync {
    fn peer(&self) -> &Peer;

    async fn find_successor_iterative(&self, key: &Id) -> Result<Routing<Peer>, ChordError>;

    /// Returns `[predecessor or candidate, successors...]` and offers `candidate`
    /// as the new predecessor.
    async fn notify(&self, candidate: &Peer) -> Result<Vec<Peer>, ChordError>;

    async fn notify_and_copy_entries(
        &self,
        candidate: &Peer,
    ) -> Result<(Vec<Peer>, Vec<Entry>), ChordError>;

    async fn insert_entry_iterative(&self, entry: &Entry) -> Result<Routing<()>, ChordError>;

    async fn remove_entry_iterative(&self, entry: &Entry) -> Result<Routing<()>, ChordError>;

    async fn retrieve_entries_iterative(&self, id: &Id)
        -> Result<Routing<Vec<Entry>>, ChordError>;

    async fn insert_replicas(&self, replicas: Vec<Entry>) -> Result<(), ChordError>;

    async fn remove_replicas(&self, from: &Id, replicas: Vec<Entry>) -> Result<(), ChordError>;

    async fn ping(&self) -> Result<(), ChordError>;

    async fn leaves_network(&self, predecessor: &Peer) -> Result<(), ChordError>;
}

/// Walks FIND_SUCCESSOR redirects starting at `start` until some node answers.
///
/// A round is counted each time a hop passes or lands on the starting node,
/// or a node redirects to itself. More than `max_round_count` rounds fails
/// with [`ChordError::RoutingLoop`].
pub async fn lookup<F>(
    start: Arc<dyn RingNode>,
    key: &Id,
    max_round_count: usize,
    resolve: F,
) -> Result<Peer, ChordError>
where
    F: Fn(&Peer) -> Arc<dyn RingNode> + Send + Sync,
{
    let start_id = start.peer().id.clone();
    let mut current = start;
    let mut rounds = 0;

    loop {
        let next = match current.find_successor_iterative(key).await? {
            Routing::Success(successor) => return Ok(successor),
            Routing::Redirect(next) => next,
        };

        let current_id = &current.peer().id;
        if next.id == start_id
            || next.id == *current_id
            || start_id.is_in_interval(current_id, &next.id)
        {
            rounds += 1;
            if rounds > max_round_count {
                debug!("lookup of {} exceeded {} rounds", key, max_round_count);
                return Err(ChordError::RoutingLoop);
            }
        }

        debug!("lookup of {}: {} redirects to {}", key, current.peer(), next);
        current = resolve(&next);
    }
}
