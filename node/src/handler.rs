use ringlet_lib::dht_messages::{
    NodeInfo, Request, RequestParams, Response, ResponseResult,
};
use ringlet_lib::{Entry, Id};

use crate::error::ChordError;
use crate::node::{log_error, ChordNode};
use crate::peer::Peer;
use crate::ring_node::Routing;
use crate::rpc::timestamp_millis;
use crate::transport::Transport;

impl<T: Transport> ChordNode<T> {
    /// Serves one inbound request. One-way requests produce no response.
    pub async fn handle_request(&self, request: Request) -> Option<Response> {
        let expects_response = request.method().expects_response();
        let outcome = self.answer(&request).await;

        let response = match outcome {
            Ok(Routing::Success(result)) => {
                Response::success(&request, timestamp_millis(), result)
            }
            Ok(Routing::Redirect(next)) => {
                Response::redirect(&request, timestamp_millis(), next.to_info())
            }
            Err(e) => {
                log_error!(self.local.peer_id, "{:?} request failed: {}", request.method(), e);
                Response::failure(&request, timestamp_millis(), e.to_string())
            }
        };
        expects_response.then_some(response)
    }

    async fn answer(&self, request: &Request) -> Result<Routing<ResponseResult>, ChordError> {
        match &request.call {
            RequestParams::FindSuccessor { key } => {
                self.check_id(key)?;
                Ok(match self.find_successor_iterative(key).await? {
                    Routing::Success(successor) => Routing::Success(ResponseResult::Successor {
                        successor: successor.to_info(),
                    }),
                    Routing::Redirect(next) => Routing::Redirect(next),
                })
            }
            RequestParams::Notify {
                potential_predecessor,
            } => {
                let candidate = self.to_peer(potential_predecessor)?;
                let references = self.notify(&candidate).await?;
                Ok(Routing::Success(ResponseResult::References {
                    references: references.iter().map(Peer::to_info).collect(),
                }))
            }
            RequestParams::NotifyAndCopy {
                potential_predecessor,
            } => {
                let candidate = self.to_peer(potential_predecessor)?;
                let (references, entries) = self.notify_and_copy_entries(&candidate).await?;
                Ok(Routing::Success(ResponseResult::ReferencesAndEntries {
                    references: references.iter().map(Peer::to_info).collect(),
                    entries,
                }))
            }
            RequestParams::Ping => Ok(Routing::Success(ResponseResult::Empty)),
            RequestParams::InsertReplicas { replicas } => {
                self.check_entries(replicas)?;
                self.insert_replicas(replicas.clone()).await?;
                Ok(Routing::Success(ResponseResult::Empty))
            }
            RequestParams::RemoveReplicas {
                sending_node_id,
                replicas,
            } => {
                self.check_id(sending_node_id)?;
                self.check_entries(replicas)?;
                self.remove_replicas(sending_node_id, replicas.clone())
                    .await?;
                Ok(Routing::Success(ResponseResult::Empty))
            }
            RequestParams::InsertEntry { entry } => {
                self.check_id(&entry.id)?;
                Ok(self
                    .insert_entry_iterative(entry)
                    .await?
                    .map(|()| ResponseResult::Empty))
            }
            RequestParams::RetrieveEntries { id } => {
                self.check_id(id)?;
                Ok(self
                    .retrieve_entries_iterative(id)
                    .await?
                    .map(|entries| ResponseResult::Entries { entries }))
            }
            RequestParams::RemoveEntry { entry } => {
                self.check_id(&entry.id)?;
                Ok(self
                    .remove_entry_iterative(entry)
                    .await?
                    .map(|()| ResponseResult::Empty))
            }
            RequestParams::LeavesNetwork { predecessor } => {
                let predecessor = self.to_peer(predecessor)?;
                self.leaves_network(&predecessor).await?;
                Ok(Routing::Success(ResponseResult::Empty))
            }
        }
    }

    fn check_id(&self, id: &Id) -> Result<(), ChordError> {
        Ok(self.local.id.ensure_same_length(id)?)
    }

    fn check_entries(&self, entries: &[Entry]) -> Result<(), ChordError> {
        entries.iter().try_for_each(|entry| self.check_id(&entry.id))
    }

    fn to_peer(&self, info: &NodeInfo) -> Result<Peer, ChordError> {
        if info.peer_id.is_empty() {
            return Err(ChordError::InvalidArgument("empty peer id".to_string()));
        }
        Ok(Peer::from_info(info, self.config.id_size)?)
    }
}
