use std::future::Future;
use std::time::Duration;

use log::debug;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::node::{log_error, ChordNode, EntryEvent};
use crate::peer::Peer;
use crate::transport::Transport;

/// Runs `task` every `period`, first after one full period. A zero period
/// disables the task.
fn every<T, F, Fut>(period: Duration, node: ChordNode<T>, task: F) -> Option<JoinHandle<()>>
where
    T: Transport,
    F: Fn(ChordNode<T>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    if period.is_zero() {
        return None;
    }
    Some(tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            task(node.clone()).await;
        }
    }))
}

impl<T: Transport> ChordNode<T> {
    pub(crate) fn start_tasks(&self) {
        let handles = [
            every(self.config.stabilize_task_interval, self.clone(), |node| async move {
                node.stabilize().await
            }),
            every(self.config.fix_finger_task_interval, self.clone(), |node| async move {
                node.fix_fingers().await
            }),
            every(
                self.config.check_predecessor_task_interval,
                self.clone(),
                |node| async move { node.check_predecessor().await },
            ),
        ];

        let mut tasks = self.tasks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        tasks.extend(handles.into_iter().flatten());
    }

    pub(crate) fn stop_tasks(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        for handle in tasks.drain(..) {
            handle.abort();
        }
    }

    /// Confirms this node with its successor and adopts what the successor
    /// knows about the neighbourhood.
    pub async fn stabilize(&self) {
        let successors = self.successors();
        let Some(successor) = successors.first().cloned() else {
            return;
        };

        let references = match self.resolve(&successor).notify(&self.local).await {
            Ok(references) => references,
            Err(e) => {
                log_error!(self.local.peer_id, "Successor {} did not answer: {}", successor, e);
                self.update(|refs, entries| refs.remove_reference(&successor, entries))
                    .await;
                return;
            }
        };

        self.reconcile(&successors, &successor, &references).await;

        let moved = references.first().is_some_and(|first| *first != self.local);
        if moved {
            match self
                .resolve(&successor)
                .notify_and_copy_entries(&self.local)
                .await
            {
                Ok((references, copied)) => {
                    if !copied.is_empty() {
                        self.update(|_, entries| entries.add_all(copied.iter().cloned()))
                            .await;
                        self.emit(EntryEvent::Inserted(copied));
                    }
                    self.reconcile(&successors, &successor, &references).await;
                }
                Err(e) => {
                    log_error!(self.local.peer_id, "Failed to copy entries from {}: {}", successor, e);
                }
            }
        }

        debug!(
            "[{}] Stabilized, successors: {:?}",
            self.local.peer_id,
            self.successors()
                .iter()
                .map(|s| s.peer_id.as_str())
                .collect::<Vec<_>>()
        );
    }

    /// Drops former successors the remote no longer vouches for, adds what it
    /// reported and pings a newly adopted direct successor.
    async fn reconcile(&self, previous: &[Peer], successor: &Peer, references: &[Peer]) {
        let current = self
            .update(|refs, entries| {
                let predecessor = refs.predecessor().cloned();
                for stale in previous {
                    if stale != successor
                        && predecessor.as_ref() != Some(stale)
                        && !references.contains(stale)
                    {
                        refs.remove_reference(stale, entries);
                    }
                }
                for reference in references {
                    refs.add_reference(reference, entries);
                }
                refs.successor().cloned()
            })
            .await;

        let Some(current) = current else {
            return;
        };
        if current != *successor {
            if let Err(e) = self.resolve(&current).ping().await {
                log_error!(self.local.peer_id, "New successor {} is unreachable: {}", current, e);
                self.update(|refs, entries| refs.remove_reference(&current, entries))
                    .await;
            }
        }
    }

    /// Refreshes one randomly chosen finger.
    pub async fn fix_fingers(&self) {
        let bits = self.local.id.bit_length();
        let index = rand::thread_rng().gen_range(0..bits);
        let target = match self.local.id.add_power_of_two(index) {
            Ok(target) => target,
            Err(e) => {
                log_error!(self.local.peer_id, "Bad finger index {}: {}", index, e);
                return;
            }
        };

        match self.find_successor(&target).await {
            Ok(successor) => {
                debug!("[{}] Finger {} -> {}", self.local.peer_id, index, successor);
                if successor != self.local {
                    self.update(|refs, entries| {
                        if !refs.contains_reference(&successor) {
                            refs.add_reference(&successor, entries);
                        }
                    })
                    .await;
                }
            }
            Err(e) => {
                log_error!(self.local.peer_id, "Failed to fix finger {}: {}", index, e);
            }
        }
    }

    /// Evicts the predecessor if it stopped answering.
    pub async fn check_predecessor(&self) {
        let Some(predecessor) = self.predecessor() else {
            return;
        };
        if let Err(e) = self.resolve(&predecessor).ping().await {
            log_error!(self.local.peer_id, "Predecessor {} is unreachable: {}", predecessor, e);
            self.update(|refs, entries| refs.remove_reference(&predecessor, entries))
                .await;
        }
    }
}
