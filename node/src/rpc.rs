use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, warn};
use ringlet_lib::dht_messages::{Message, Request, RequestParams, Response};
use tokio::sync::oneshot;

use crate::error::RpcError;
use crate::transport::Transport;

/// Milliseconds since the UNIX epoch, as carried in every request and response.
pub fn timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

pub fn new_request_id() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

/// Matches outgoing requests with the responses that come back for them.
///
/// Whichever of the response or the timeout takes the pending entry out of
/// the table first decides the outcome of the call.
pub struct RequestRouter<T: Transport> {
    local: String,
    transport: Arc<T>,
    timeout: Duration,
    pending: Mutex<HashMap<String, oneshot::Sender<Response>>>,
    closed: AtomicBool,
}

impl<T: Transport> RequestRouter<T> {
    pub fn new(local: impl Into<String>, transport: Arc<T>, timeout: Duration) -> Self {
        RequestRouter {
            local: local.into(),
            transport,
            timeout,
            pending: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<String, oneshot::Sender<Response>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sends `call` to `peer` and waits for its response.
    pub async fn call(&self, peer: &str, call: RequestParams) -> Result<Response, RpcError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RpcError::Shutdown);
        }

        let request = Request::new(new_request_id(), timestamp_millis(), call);
        let request_id = request.request_id.clone();
        let (tx, rx) = oneshot::channel();
        self.pending().insert(request_id.clone(), tx);

        debug!(
            "[{}] -> {} {:?} ({})",
            self.local,
            peer,
            request.method(),
            request_id
        );
        if let Err(e) = self.transport.send(peer, Message::Request(request)).await {
            self.pending().remove(&request_id);
            return Err(e);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(RpcError::Cancelled(request_id)),
            Err(_) => {
                self.pending().remove(&request_id);
                Err(RpcError::Timeout(request_id))
            }
        }
    }

    /// Sends a request that is never answered.
    pub async fn send_one_way(&self, peer: &str, call: RequestParams) -> Result<(), RpcError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RpcError::Shutdown);
        }
        let request = Request::new(new_request_id(), timestamp_millis(), call);
        debug!("[{}] -> {} {:?}", self.local, peer, request.method());
        self.transport.send(peer, Message::Request(request)).await
    }

    /// Hands an inbound response to the call waiting for it.
    pub fn complete(&self, response: Response) {
        let waiting = self.pending().remove(&response.request_id);
        match waiting {
            Some(tx) => {
                // the caller may have given up in the meantime
                let _ = tx.send(response);
            }
            None => {
                warn!(
                    "[{}] Dropping response to unknown request {} ({:?})",
                    self.local, response.request_id, response.method
                );
            }
        }
    }

    /// Fails every in-flight call and refuses new ones.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.pending().clear();
    }

    pub fn pending_count(&self) -> usize {
        self.pending().len()
    }
}
