use std::sync::Arc;

use async_trait::async_trait;
use ringlet_lib::dht_messages::{
    Method, NodeInfo, RequestParams, Response, ResponseResult, Status,
};
use ringlet_lib::{Entry, Id};

use crate::error::ChordError;
use crate::peer::Peer;
use crate::ring_node::{RingNode, Routing};
use crate::rpc::RequestRouter;
use crate::transport::Transport;

/// A ring member reached through the request router.
pub struct RemoteNode<T: Transport> {
    peer: Peer,
    router: Arc<RequestRouter<T>>,
    id_size: usize,
}

impl<T: Transport> RemoteNode<T> {
    pub fn new(peer: Peer, router: Arc<RequestRouter<T>>, id_size: usize) -> Self {
        RemoteNode {
            peer,
            router,
            id_size,
        }
    }

    async fn call(&self, call: RequestParams) -> Result<Response, ChordError> {
        let method = call.method();
        let response = self.router.call(&self.peer.peer_id, call).await?;
        if response.status != Status::Failed {
            return Ok(response);
        }
        Err(match response.result {
            ResponseResult::Error { message } => ChordError::Remote {
                peer: self.peer.peer_id.clone(),
                method,
                message,
            },
            _ => self.unexpected(method),
        })
    }

    async fn send(&self, call: RequestParams) -> Result<(), ChordError> {
        Ok(self.router.send_one_way(&self.peer.peer_id, call).await?)
    }

    fn unexpected(&self, method: Method) -> ChordError {
        ChordError::UnexpectedResponse {
            peer: self.peer.peer_id.clone(),
            method,
        }
    }

    fn to_peer(&self, info: &NodeInfo) -> Result<Peer, ChordError> {
        Ok(Peer::from_info(info, self.id_size)?)
    }

    fn to_peers(&self, infos: &[NodeInfo]) -> Result<Vec<Peer>, ChordError> {
        infos.iter().map(|info| self.to_peer(info)).collect()
    }

    /// Interprets a response that either carries a value or redirects elsewhere.
    fn routing<R>(
        &self,
        response: Response,
        success: impl FnOnce(ResponseResult) -> Option<R>,
    ) -> Result<Routing<R>, ChordError> {
        let method = response.method;
        match (response.status, response.result) {
            (Status::Redirect, ResponseResult::Redirect { redirect }) => {
                Ok(Routing::Redirect(self.to_peer(&redirect)?))
            }
            (Status::Success, result) => success(result)
                .map(Routing::Success)
                .ok_or_else(|| self.unexpected(method)),
            _ => Err(self.unexpected(method)),
        }
    }

    fn check_entry_ids<'a>(
        &self,
        entries: impl IntoIterator<Item = &'a Entry>,
    ) -> Result<(), ChordError> {
        for entry in entries {
            self.peer.id.ensure_same_length(&entry.id)?;
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Transport> RingNode for RemoteNode<T> {
    fn peer(&self) -> &Peer {
        &self.peer
    }

    async fn find_successor_iterative(&self, key: &Id) -> Result<Routing<Peer>, ChordError> {
        let response = self
            .call(RequestParams::FindSuccessor { key: key.clone() })
            .await?;
        let successor = self.routing(response, |result| match result {
            ResponseResult::Successor { successor } => Some(successor),
            _ => None,
        })?;
        Ok(match successor {
            Routing::Success(info) => Routing::Success(self.to_peer(&info)?),
            Routing::Redirect(next) => Routing::Redirect(next),
        })
    }

    async fn notify(&self, candidate: &Peer) -> Result<Vec<Peer>, ChordError> {
        let response = self
            .call(RequestParams::Notify {
                potential_predecessor: candidate.to_info(),
            })
            .await?;
        match response.result {
            ResponseResult::References { references } => self.to_peers(&references),
            _ => Err(self.unexpected(Method::Notify)),
        }
    }

    async fn notify_and_copy_entries(
        &self,
        candidate: &Peer,
    ) -> Result<(Vec<Peer>, Vec<Entry>), ChordError> {
        let response = self
            .call(RequestParams::NotifyAndCopy {
                potential_predecessor: candidate.to_info(),
            })
            .await?;
        match response.result {
            ResponseResult::ReferencesAndEntries {
                references,
                entries,
            } => {
                self.check_entry_ids(&entries)?;
                Ok((self.to_peers(&references)?, entries))
            }
            _ => Err(self.unexpected(Method::NotifyAndCopy)),
        }
    }

    async fn insert_entry_iterative(&self, entry: &Entry) -> Result<Routing<()>, ChordError> {
        let response = self
            .call(RequestParams::InsertEntry {
                entry: entry.clone(),
            })
            .await?;
        self.routing(response, |_| Some(()))
    }

    async fn remove_entry_iterative(&self, entry: &Entry) -> Result<Routing<()>, ChordError> {
        let response = self
            .call(RequestParams::RemoveEntry {
                entry: entry.clone(),
            })
            .await?;
        self.routing(response, |_| Some(()))
    }

    async fn retrieve_entries_iterative(
        &self,
        id: &Id,
    ) -> Result<Routing<Vec<Entry>>, ChordError> {
        let response = self
            .call(RequestParams::RetrieveEntries { id: id.clone() })
            .await?;
        self.routing(response, |result| match result {
            ResponseResult::Entries { entries } => Some(entries),
            _ => None,
        })
    }

    async fn insert_replicas(&self, replicas: Vec<Entry>) -> Result<(), ChordError> {
        self.send(RequestParams::InsertReplicas { replicas }).await
    }

    async fn remove_replicas(&self, from: &Id, replicas: Vec<Entry>) -> Result<(), ChordError> {
        self.send(RequestParams::RemoveReplicas {
            sending_node_id: from.clone(),
            replicas,
        })
        .await
    }

    async fn ping(&self) -> Result<(), ChordError> {
        self.call(RequestParams::Ping).await.map(|_| ())
    }

    async fn leaves_network(&self, predecessor: &Peer) -> Result<(), ChordError> {
        self.send(RequestParams::LeavesNetwork {
            predecessor: predecessor.to_info(),
        })
        .await
    }
}
