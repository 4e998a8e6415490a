use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;
use futures::FutureExt;
use log::debug;
use ringlet_lib::dht_messages::{Message, NodeInfo};
use ringlet_lib::{Entry, EntryList, Id};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::ChordError;
use crate::peer::Peer;
use crate::reference_list::{ReferenceList, RingAction};
use crate::remote_node::RemoteNode;
use crate::ring_node::{self, RingNode, Routing};
use crate::rpc::RequestRouter;
use crate::transport::{Envelope, Transport};

macro_rules! log_info {
    ($address:expr, $($arg:tt)*) => ({
        log::info!("[{}] {}", $address, format_args!($($arg)*));
    })
}

macro_rules! log_error {
    ($address:expr, $($arg:tt)*) => ({
        log::error!("[{}] {}", $address, format_args!($($arg)*));
    })
}

pub(crate) use {log_error, log_info};

/// Upper bound on entry-level redirects followed by insert, retrieve and remove.
pub const MAX_ENTRY_REDIRECTS: usize = 32;

const EVENT_CAPACITY: usize = 256;

/// Change to the local entry list, published to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryEvent {
    Inserted(Vec<Entry>),
    Removed(Vec<Entry>),
}

/// Diagnostic snapshot of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub peer_id: String,
    pub node_id: Id,
    pub successors: Vec<NodeInfo>,
    pub predecessor: Option<NodeInfo>,
    pub finger_table: Vec<Option<NodeInfo>>,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    Uninitialized,
    Joining,
    Active,
    Left,
}

#[derive(Debug)]
pub(crate) struct RingState {
    pub(crate) references: ReferenceList,
    pub(crate) entries: EntryList,
}

pub struct ChordNode<T: Transport> {
    pub(crate) config: Arc<Config>,
    pub(crate) local: Peer,
    state: Arc<Mutex<RingState>>,
    lifecycle: Arc<Mutex<Lifecycle>>,
    pub(crate) transport: Arc<T>,
    pub(crate) router: Arc<RequestRouter<T>>,
    inbox: Arc<Mutex<Option<mpsc::UnboundedReceiver<Envelope>>>>,
    dispatcher: Arc<Mutex<Option<JoinHandle<()>>>>,
    pub(crate) tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
    events: broadcast::Sender<EntryEvent>,
}

impl<T: Transport> Clone for ChordNode<T> {
    fn clone(&self) -> Self {
        ChordNode {
            config: self.config.clone(),
            local: self.local.clone(),
            state: self.state.clone(),
            lifecycle: self.lifecycle.clone(),
            transport: self.transport.clone(),
            router: self.router.clone(),
            inbox: self.inbox.clone(),
            dispatcher: self.dispatcher.clone(),
            tasks: self.tasks.clone(),
            events: self.events.clone(),
        }
    }
}

fn lock<U>(mutex: &Mutex<U>) -> MutexGuard<'_, U> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Transport> ChordNode<T> {
    /// Builds a node that has neither created nor joined a ring yet.
    ///
    /// `inbox` must be the receiving end of the channel `transport` delivers
    /// inbound envelopes to.
    pub fn new(
        config: Config,
        transport: Arc<T>,
        inbox: mpsc::UnboundedReceiver<Envelope>,
    ) -> Result<Self, ChordError> {
        config.validate()?;
        let local = Peer::new(config.peer_id.clone(), config.id_size)?;
        let router = Arc::new(RequestRouter::new(
            config.peer_id.clone(),
            transport.clone(),
            config.request_timeout,
        ));
        let state = RingState {
            references: ReferenceList::new(local.clone(), config.successor_list_size),
            entries: EntryList::new(),
        };
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(ChordNode {
            config: Arc::new(config),
            local,
            state: Arc::new(Mutex::new(state)),
            lifecycle: Arc::new(Mutex::new(Lifecycle::Uninitialized)),
            transport,
            router,
            inbox: Arc::new(Mutex::new(Some(inbox))),
            dispatcher: Arc::new(Mutex::new(None)),
            tasks: Arc::new(Mutex::new(Vec::new())),
            events,
        })
    }

    pub fn peer_id(&self) -> &str {
        &self.local.peer_id
    }

    pub fn node_id(&self) -> &Id {
        &self.local.id
    }

    pub fn node_info(&self) -> NodeInfo {
        self.local.to_info()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EntryEvent> {
        self.events.subscribe()
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, RingState> {
        lock(&self.state)
    }

    /// Runs `f` against the reference and entry lists, then carries out the
    /// remote work it queued once the lock is released.
    pub(crate) async fn update<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut ReferenceList, &mut EntryList) -> R + Send,
        R: Send,
    {
        let (result, actions) = {
            let mut state = self.state();
            let RingState {
                references,
                entries,
            } = &mut *state;
            let result = f(references, entries);
            (result, references.drain_actions())
        };
        self.dispatch(actions).await;
        result
    }

    async fn dispatch(&self, actions: Vec<RingAction>) {
        for action in actions {
            let outcome = match action {
                RingAction::InsertReplicas { to, entries } => {
                    debug!("[{}] Pushing {} replicas to {}", self.local.peer_id, entries.len(), to);
                    self.resolve(&to).insert_replicas(entries).await
                }
                RingAction::RemoveReplicas { to, from, entries } => {
                    debug!("[{}] Asking {} to drop replicas from {}", self.local.peer_id, to, from);
                    self.resolve(&to).remove_replicas(&from, entries).await
                }
                RingAction::Disconnect { peer } => {
                    self.transport.disconnect(&peer.peer_id).await;
                    Ok(())
                }
            };
            if let Err(e) = outcome {
                log_error!(self.local.peer_id, "Failed to sync replicas: {}", e);
            }
        }
    }

    pub(crate) fn emit(&self, event: EntryEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    /// The capability handle for `peer`: this node itself or an RPC proxy.
    pub fn resolve(&self, peer: &Peer) -> Arc<dyn RingNode> {
        if *peer == self.local {
            Arc::new(self.clone())
        } else {
            Arc::new(RemoteNode::new(
                peer.clone(),
                self.router.clone(),
                self.config.id_size,
            ))
        }
    }

    fn lifecycle(&self) -> Lifecycle {
        *lock(&self.lifecycle)
    }

    fn set_lifecycle(&self, next: Lifecycle) {
        *lock(&self.lifecycle) = next;
    }

    pub(crate) fn ensure_active(&self) -> Result<(), ChordError> {
        match self.lifecycle() {
            Lifecycle::Active => Ok(()),
            Lifecycle::Left => Err(ChordError::Left),
            Lifecycle::Uninitialized | Lifecycle::Joining => Err(ChordError::NotJoined),
        }
    }

    /// Claims the node for create or join and starts serving inbound messages.
    fn begin(&self) -> Result<(), ChordError> {
        {
            let mut lifecycle = lock(&self.lifecycle);
            match *lifecycle {
                Lifecycle::Uninitialized => *lifecycle = Lifecycle::Joining,
                Lifecycle::Left => return Err(ChordError::Left),
                Lifecycle::Joining | Lifecycle::Active => return Err(ChordError::AlreadyJoined),
            }
        }

        if let Some(inbox) = lock(&self.inbox).take() {
            let handle = tokio::spawn(self.clone().serve(inbox));
            *lock(&self.dispatcher) = Some(handle);
        }
        Ok(())
    }

    async fn serve(self, mut inbox: mpsc::UnboundedReceiver<Envelope>) {
        while let Some(Envelope { from, message }) = inbox.recv().await {
            match message {
                Message::Request(request) => {
                    let node = self.clone();
                    tokio::spawn(async move {
                        let Some(response) = node.handle_request(request).await else {
                            return;
                        };
                        if let Err(e) = node
                            .transport
                            .send(&from, Message::Response(response))
                            .await
                        {
                            log_error!(node.local.peer_id, "Failed to respond to {}: {}", from, e);
                        }
                    });
                }
                Message::Response(response) => self.router.complete(response),
            }
        }
        debug!("[{}] Inbox closed", self.local.peer_id);
    }

    /// Starts a new ring with this node as its only member.
    pub async fn create(&self) -> Result<(), ChordError> {
        self.begin()?;
        self.start_tasks();
        self.set_lifecycle(Lifecycle::Active);
        log_info!(self.local.peer_id, "Created network as {}", self.local.id);
        Ok(())
    }

    /// Joins the ring `bootstrap` belongs to.
    ///
    /// Failing to reach the bootstrap node or to find a successor aborts the
    /// join. Failing to copy entries from the successor afterwards does not.
    pub async fn join(&self, bootstrap: &str) -> Result<(), ChordError> {
        self.begin()?;
        match self.join_via(bootstrap).await {
            Ok(()) => {
                self.start_tasks();
                self.set_lifecycle(Lifecycle::Active);
                log_info!(self.local.peer_id, "Joined network via {}", bootstrap);
                Ok(())
            }
            Err(e) => {
                self.set_lifecycle(Lifecycle::Uninitialized);
                log_error!(self.local.peer_id, "Failed to join via {}: {}", bootstrap, e);
                Err(e)
            }
        }
    }

    async fn join_via(&self, bootstrap: &str) -> Result<(), ChordError> {
        if bootstrap == self.local.peer_id {
            return Err(ChordError::InvalidArgument(
                "cannot join through this node's own address".to_string(),
            ));
        }
        let bootstrap = Peer::new(bootstrap, self.config.id_size)?;

        self.update(|refs, entries| refs.add_reference(&bootstrap, entries))
            .await;
        let successor = match self.lookup_from(&bootstrap, &self.local.id).await {
            Ok(successor) if successor == self.local => Err(ChordError::InvalidArgument(
                format!("{} is already a member of the ring", self.local.id),
            )),
            other => other,
        };
        let successor = match successor {
            Ok(successor) => successor,
            Err(e) => {
                self.update(|refs, entries| refs.remove_reference(&bootstrap, entries))
                    .await;
                return Err(e);
            }
        };
        debug!("[{}] Successor on join is {}", self.local.peer_id, successor);

        self.update(|refs, entries| refs.add_reference(&successor, entries))
            .await;
        let (references, copied) = match self.notify_and_copy_on_join(successor).await {
            Ok(result) => result,
            Err(e) => {
                log_error!(self.local.peer_id, "Failed to copy entries on join: {}", e);
                (Vec::new(), Vec::new())
            }
        };

        self.update(|refs, entries| {
            for reference in &references {
                if !refs.contains_reference(reference) {
                    refs.add_reference(reference, entries);
                }
            }
            entries.add_all(copied.iter().cloned());
        })
        .await;
        if !copied.is_empty() {
            log_info!(self.local.peer_id, "Copied {} entries on join", copied.len());
            self.emit(EntryEvent::Inserted(copied));
        }
        Ok(())
    }

    /// Asks `successor` to accept this node as predecessor. If the successor
    /// already knows a node between the two, that node is tried instead, up to
    /// the configured number of attempts.
    async fn notify_and_copy_on_join(
        &self,
        mut successor: Peer,
    ) -> Result<(Vec<Peer>, Vec<Entry>), ChordError> {
        let mut attempts = self.config.max_notify_and_copy_attempts;
        while attempts > 0 {
            let (references, entries) = self
                .resolve(&successor)
                .notify_and_copy_entries(&self.local)
                .await?;

            let Some(first) = references.first().cloned() else {
                return Ok((references, entries));
            };
            if references.len() == 1 {
                // the successor was alone in the ring
                self.update(|refs, list| refs.add_reference_as_predecessor(&successor, list))
                    .await;
                return Ok((references, entries));
            }
            if first == self.local {
                return Ok((references, entries));
            }
            if self.local.id.is_in_interval(&first.id, &successor.id) {
                self.update(|refs, list| refs.add_reference_as_predecessor(&first, list))
                    .await;
                return Ok((references, entries));
            }

            debug!("[{}] {} sits before {}, retrying there", self.local.peer_id, first, successor);
            self.update(|refs, list| refs.add_reference(&first, list))
                .await;
            successor = first;
            attempts -= 1;
        }
        Ok((Vec::new(), Vec::new()))
    }

    /// Leaves the ring, handing the predecessor over to the successor.
    pub async fn leave(&self) -> Result<(), ChordError> {
        {
            let mut lifecycle = lock(&self.lifecycle);
            match *lifecycle {
                Lifecycle::Active => *lifecycle = Lifecycle::Left,
                Lifecycle::Left => return Err(ChordError::Left),
                Lifecycle::Uninitialized | Lifecycle::Joining => {
                    return Err(ChordError::NotJoined)
                }
            }
        }
        self.stop_tasks();

        let (successor, predecessor) = {
            let state = self.state();
            (
                state.references.successor().cloned(),
                state.references.predecessor().cloned(),
            )
        };
        if let (Some(successor), Some(predecessor)) = (successor, predecessor) {
            if let Err(e) = self.resolve(&successor).leaves_network(&predecessor).await {
                log_error!(self.local.peer_id, "Failed to notify {} of leave: {}", successor, e);
            }
        }

        self.router.close();
        self.transport.shutdown().await;
        if let Some(handle) = lock(&self.dispatcher).take() {
            handle.abort();
        }
        log_info!(self.local.peer_id, "Left network");
        Ok(())
    }

    /// Resolves the node responsible for `key`.
    ///
    /// A hop that fails is dropped from the references and the lookup starts
    /// over from this node.
    pub async fn find_successor(&self, key: &Id) -> Result<Peer, ChordError> {
        let budget = self.local.id.bit_length() + self.config.successor_list_size + 2;
        for _ in 0..budget {
            let next = match self.find_successor_iterative(key).await? {
                Routing::Success(successor) => return Ok(successor),
                Routing::Redirect(next) => next,
            };
            match self.lookup_from(&next, key).await {
                Ok(successor) => return Ok(successor),
                Err(ChordError::RoutingLoop) => return Err(ChordError::RoutingLoop),
                Err(e) => {
                    log_error!(self.local.peer_id, "Lookup via {} failed: {}", next, e);
                    self.update(|refs, entries| refs.remove_reference(&next, entries))
                        .await;
                }
            }
        }
        Err(ChordError::LookupExhausted(budget))
    }

    pub(crate) async fn lookup_from(&self, start: &Peer, key: &Id) -> Result<Peer, ChordError> {
        ring_node::lookup(
            self.resolve(start),
            key,
            self.config.max_round_count,
            |peer: &Peer| self.resolve(peer),
        )
        .await
    }

    async fn follow_redirects<R, F>(&self, mut target: Peer, op: F) -> Result<R, ChordError>
    where
        R: Send,
        F: Fn(Arc<dyn RingNode>) -> BoxFuture<'static, Result<Routing<R>, ChordError>> + Send + Sync,
    {
        for _ in 0..MAX_ENTRY_REDIRECTS {
            match op(self.resolve(&target)).await? {
                Routing::Success(result) => return Ok(result),
                Routing::Redirect(next) => {
                    debug!("[{}] {} redirected to {}", self.local.peer_id, target, next);
                    target = next;
                }
            }
        }
        Err(ChordError::TooManyRedirects(MAX_ENTRY_REDIRECTS))
    }

    pub async fn insert(&self, key: &str, value: Value) -> Result<(), ChordError> {
        self.ensure_active()?;
        let entry = Entry::from_key(key, value, self.config.id_size)?;
        let target = self.find_successor(&entry.id).await?;
        self.follow_redirects(target, |node| {
            let entry = entry.clone();
            async move { node.insert_entry_iterative(&entry).await }.boxed()
        })
        .await
    }

    pub async fn retrieve(&self, key: &str) -> Result<Vec<Value>, ChordError> {
        self.ensure_active()?;
        let id = Id::create_with_size(key, self.config.id_size)?;
        let target = self.find_successor(&id).await?;
        let entries = self
            .follow_redirects(target, |node| {
                let id = id.clone();
                async move { node.retrieve_entries_iterative(&id).await }.boxed()
            })
            .await?;
        Ok(entries.into_iter().map(|entry| entry.value).collect())
    }

    pub async fn remove(&self, key: &str, value: Value) -> Result<(), ChordError> {
        self.ensure_active()?;
        let entry = Entry::from_key(key, value, self.config.id_size)?;
        let target = self.find_successor(&entry.id).await?;
        self.follow_redirects(target, |node| {
            let entry = entry.clone();
            async move { node.remove_entry_iterative(&entry).await }.boxed()
        })
        .await
    }

    pub fn successor(&self) -> Option<Peer> {
        self.state().references.successor().cloned()
    }

    pub fn successors(&self) -> Vec<Peer> {
        self.state().references.successors()
    }

    pub fn predecessor(&self) -> Option<Peer> {
        self.state().references.predecessor().cloned()
    }

    pub fn get_entries(&self) -> Vec<Entry> {
        self.state().entries.dump()
    }

    /// Replaces the local entry list wholesale.
    pub fn set_entries(&self, entries: Vec<Entry>) {
        let mut list = EntryList::new();
        list.add_all(entries);
        self.state().entries = list;
    }

    pub fn statuses(&self) -> NodeStatus {
        let state = self.state();
        let references = state.references.statuses();
        NodeStatus {
            peer_id: self.local.peer_id.clone(),
            node_id: self.local.id.clone(),
            successors: references.successors,
            predecessor: references.predecessor,
            finger_table: references.finger_table,
            entries: state.entries.dump(),
        }
    }

    // Ring-side operations, invoked for local calls and by the request handler.

    /// Decides one FIND_SUCCESSOR hop without leaving this node.
    pub async fn find_successor_iterative(&self, key: &Id) -> Result<Routing<Peer>, ChordError> {
        let state = self.state();
        let references = &state.references;

        let owns_key = match references.predecessor() {
            None => true,
            Some(predecessor) => key.is_in_interval(&predecessor.id, &self.local.id),
        };
        if owns_key || *key == self.local.id {
            return Ok(Routing::Success(self.local.clone()));
        }

        let next = references
            .closest_preceding_node(key)
            .or_else(|| references.successor().cloned());
        Ok(match next {
            Some(next) => Routing::Redirect(next),
            None => Routing::Success(self.local.clone()),
        })
    }

    pub async fn notify(&self, candidate: &Peer) -> Result<Vec<Peer>, ChordError> {
        let references = self
            .update(|refs, entries| {
                let mut references =
                    vec![refs.predecessor().unwrap_or(candidate).clone()];
                references.extend(refs.successors());
                refs.add_reference_as_predecessor(candidate, entries);
                references
            })
            .await;
        Ok(references)
    }

    pub async fn notify_and_copy_entries(
        &self,
        candidate: &Peer,
    ) -> Result<(Vec<Peer>, Vec<Entry>), ChordError> {
        let copied = self
            .state()
            .entries
            .get_entries_in_interval(&self.local.id, &candidate.id);
        let references = self.notify(candidate).await?;
        Ok((references, copied))
    }

    /// The predecessor, if it rather than this node is responsible for `id`.
    fn owner_elsewhere(&self, id: &Id) -> Option<Peer> {
        let state = self.state();
        let predecessor = state.references.predecessor()?;
        if id.is_in_interval(&predecessor.id, &self.local.id) || *id == self.local.id {
            None
        } else {
            Some(predecessor.clone())
        }
    }

    pub async fn insert_entry_iterative(&self, entry: &Entry) -> Result<Routing<()>, ChordError> {
        if let Some(predecessor) = self.owner_elsewhere(&entry.id) {
            return Ok(Routing::Redirect(predecessor));
        }

        let successors = {
            let mut state = self.state();
            state.entries.add(entry.clone());
            state.references.successors()
        };
        self.emit(EntryEvent::Inserted(vec![entry.clone()]));

        for successor in successors {
            if let Err(e) = self.resolve(&successor).insert_replicas(vec![entry.clone()]).await {
                log_error!(self.local.peer_id, "Failed to replicate to {}: {}", successor, e);
            }
        }
        Ok(Routing::Success(()))
    }

    pub async fn retrieve_entries_iterative(
        &self,
        id: &Id,
    ) -> Result<Routing<Vec<Entry>>, ChordError> {
        {
            let state = self.state();
            if state.entries.has(id) {
                return Ok(Routing::Success(state.entries.get_entries(id)));
            }
        }
        if let Some(predecessor) = self.owner_elsewhere(id) {
            return Ok(Routing::Redirect(predecessor));
        }
        Ok(Routing::Success(Vec::new()))
    }

    pub async fn remove_entry_iterative(&self, entry: &Entry) -> Result<Routing<()>, ChordError> {
        if let Some(predecessor) = self.owner_elsewhere(&entry.id) {
            return Ok(Routing::Redirect(predecessor));
        }

        let successors = {
            let mut state = self.state();
            state.entries.remove(entry);
            state.references.successors()
        };
        self.emit(EntryEvent::Removed(vec![entry.clone()]));

        for successor in successors {
            if let Err(e) = self
                .resolve(&successor)
                .remove_replicas(&self.local.id, vec![entry.clone()])
                .await
            {
                log_error!(self.local.peer_id, "Failed to replicate removal to {}: {}", successor, e);
            }
        }
        Ok(Routing::Success(()))
    }

    pub async fn insert_replicas(&self, replicas: Vec<Entry>) -> Result<(), ChordError> {
        if replicas.is_empty() {
            return Ok(());
        }
        self.state().entries.add_all(replicas.iter().cloned());
        debug!("[{}] Stored {} replicas", self.local.peer_id, replicas.len());
        self.emit(EntryEvent::Inserted(replicas));
        Ok(())
    }

    /// Drops `replicas`, or everything in `(local, from)` when the list is empty.
    pub async fn remove_replicas(&self, from: &Id, replicas: Vec<Entry>) -> Result<(), ChordError> {
        let removed = {
            let mut state = self.state();
            let removed = if replicas.is_empty() {
                state.entries.get_entries_in_interval(&self.local.id, from)
            } else {
                replicas
            };
            state.entries.remove_all(&removed);
            removed
        };
        if !removed.is_empty() {
            debug!("[{}] Dropped {} replicas", self.local.peer_id, removed.len());
            self.emit(EntryEvent::Removed(removed));
        }
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), ChordError> {
        Ok(())
    }

    pub async fn leaves_network(&self, predecessor: &Peer) -> Result<(), ChordError> {
        log_info!(self.local.peer_id, "Predecessor left, new predecessor is {}", predecessor);
        self.update(|refs, entries| {
            if let Some(old) = refs.predecessor().cloned() {
                refs.remove_reference(&old, entries);
            }
            refs.add_reference_as_predecessor(predecessor, entries);
        })
        .await;
        Ok(())
    }
}

#[async_trait::async_trait]
impl<T: Transport> RingNode for ChordNode<T> {
    fn peer(&self) -> &Peer {
        &self.local
    }

    async fn find_successor_iterative(&self, key: &Id) -> Result<Routing<Peer>, ChordError> {
        ChordNode::find_successor_iterative(self, key).await
    }

    async fn notify(&self, candidate: &Peer) -> Result<Vec<Peer>, ChordError> {
        ChordNode::notify(self, candidate).await
    }

    async fn notify_and_copy_entries(
        &self,
        candidate: &Peer,
    ) -> Result<(Vec<Peer>, Vec<Entry>), ChordError> {
        ChordNode::notify_and_copy_entries(self, candidate).await
    }

    async fn insert_entry_iterative(&self, entry: &Entry) -> Result<Routing<()>, ChordError> {
        ChordNode::insert_entry_iterative(self, entry).await
    }

    async fn remove_entry_iterative(&self, entry: &Entry) -> Result<Routing<()>, ChordError> {
        ChordNode::remove_entry_iterative(self, entry).await
    }

    async fn retrieve_entries_iterative(
        &self,
        id: &Id,
    ) -> Result<Routing<Vec<Entry>>, ChordError> {
        ChordNode::retrieve_entries_iterative(self, id).await
    }

    async fn insert_replicas(&self, replicas: Vec<Entry>) -> Result<(), ChordError> {
        ChordNode::insert_replicas(self, replicas).await
    }

    async fn remove_replicas(&self, from: &Id, replicas: Vec<Entry>) -> Result<(), ChordError> {
        ChordNode::remove_replicas(self, from, replicas).await
    }

    async fn ping(&self) -> Result<(), ChordError> {
        ChordNode::ping(self).await
    }

    async fn leaves_network(&self, predecessor: &Peer) -> Result<(), ChordError> {
        ChordNode::leaves_network(self, predecessor).await
    }
}

impl<T: Transport> fmt::Display for ChordNode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        writeln!(f, "[Node] {}", self.local)?;
        writeln!(f, "{}", state.references)?;
        write!(f, "{}", state.entries)
    }
}
