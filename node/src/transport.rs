use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use lru::LruCache;
use ringlet_lib::dht_messages::Message;
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

use crate::config::Config;
use crate::error::RpcError;

/// A message together with the peer id of the node that sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub from: String,
    pub message: Message,
}

/// Moves messages between peers. Inbound envelopes are handed to the node
/// through the inbox channel given to the transport when it is built.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, peer: &str, message: Message) -> Result<(), RpcError>;

    /// Releases any connection held for `peer`.
    async fn disconnect(&self, peer: &str);

    async fn shutdown(&self);
}

type Connection = FramedWrite<TcpStream, LengthDelimitedCodec>;

/// Length-delimited JSON over TCP.
///
/// Connections are one-directional: a node writes requests and responses on
/// connections it opened itself and only reads from connections it accepted.
pub struct TcpTransport {
    local: String,
    pool: Mutex<LruCache<String, Connection>>,
    close_delay: Duration,
    closed: AtomicBool,
    listener: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl TcpTransport {
    pub async fn bind(
        config: &Config,
        inbox: mpsc::UnboundedSender<Envelope>,
    ) -> Result<Arc<Self>, RpcError> {
        let listener = TcpListener::bind(&config.peer_id).await?;
        info!(
            "[{}] Listening for peers on {}",
            config.peer_id,
            listener.local_addr()?
        );

        let capacity = NonZeroUsize::new(config.connection_pool_size).unwrap_or(NonZeroUsize::MIN);
        let transport = Arc::new(TcpTransport {
            local: config.peer_id.clone(),
            pool: Mutex::new(LruCache::new(capacity)),
            close_delay: config.connection_close_delay,
            closed: AtomicBool::new(false),
            listener: std::sync::Mutex::new(None),
        });

        let handle = tokio::spawn(accept_loop(
            listener,
            inbox,
            config.peer_id.clone(),
            config.silent_connection_close_timeout,
        ));
        if let Ok(mut slot) = transport.listener.lock() {
            *slot = Some(handle);
        }
        Ok(transport)
    }

    async fn connect(&self, peer: &str) -> Result<Connection, RpcError> {
        let stream = TcpStream::connect(peer)
            .await
            .map_err(|source| RpcError::Connect {
                peer: peer.to_string(),
                source,
            })?;
        debug!("[{}] Opened connection to {}", self.local, peer);
        Ok(FramedWrite::new(stream, LengthDelimitedCodec::new()))
    }

    async fn release(&self, peer: &str, connection: Connection) {
        let evicted = self.pool.lock().await.push(peer.to_string(), connection);
        if let Some((evicted_peer, evicted)) = evicted {
            debug!("[{}] Connection pool evicted {}", self.local, evicted_peer);
            self.close_later(evicted);
        }
    }

    fn close_later(&self, mut connection: Connection) {
        let delay = self.close_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = SinkExt::<Bytes>::close(&mut connection).await;
        });
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&self, peer: &str, message: Message) -> Result<(), RpcError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RpcError::Shutdown);
        }

        let envelope = Envelope {
            from: self.local.clone(),
            message,
        };
        let frame = Bytes::from(serde_json::to_vec(&envelope)?);

        let pooled = self.pool.lock().await.pop(peer);
        let mut connection = match pooled {
            Some(mut connection) => match connection.send(frame.clone()).await {
                Ok(()) => {
                    self.release(peer, connection).await;
                    return Ok(());
                }
                Err(e) => {
                    debug!("[{}] Pooled connection to {} is stale: {}", self.local, peer, e);
                    self.connect(peer).await?
                }
            },
            None => self.connect(peer).await?,
        };

        connection.send(frame).await?;
        self.release(peer, connection).await;
        Ok(())
    }

    async fn disconnect(&self, peer: &str) {
        if let Some(connection) = self.pool.lock().await.pop(peer) {
            debug!("[{}] Disconnecting from {}", self.local, peer);
            self.close_later(connection);
        }
    }

    async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Ok(mut listener) = self.listener.lock() {
            if let Some(handle) = listener.take() {
                handle.abort();
            }
        }

        let mut pool = self.pool.lock().await;
        while let Some((_, mut connection)) = pool.pop_lru() {
            let _ = SinkExt::<Bytes>::close(&mut connection).await;
        }
        info!("[{}] Transport shut down", self.local);
    }
}

async fn accept_loop(
    listener: TcpListener,
    inbox: mpsc::UnboundedSender<Envelope>,
    local: String,
    silent_timeout: Duration,
) {
    loop {
        match listener.accept().await {
            Ok((socket, address)) => {
                debug!("[{}] Accepted connection from {}", local, address);
                tokio::spawn(read_frames(socket, inbox.clone(), local.clone(), silent_timeout));
            }
            Err(e) => {
                error!("[{}] Failed to accept connection: {}", local, e);
            }
        }
    }
}

async fn read_frames(
    socket: TcpStream,
    inbox: mpsc::UnboundedSender<Envelope>,
    local: String,
    silent_timeout: Duration,
) {
    let mut frames = FramedRead::new(socket, LengthDelimitedCodec::new());

    // a peer that connects must speak up within the grace period
    let first = match tokio::time::timeout(silent_timeout, frames.next()).await {
        Ok(frame) => frame,
        Err(_) => {
            debug!("[{}] Closing silent inbound connection", local);
            return;
        }
    };

    let mut next = first;
    while let Some(frame) = next {
        match frame {
            Ok(bytes) => match serde_json::from_slice::<Envelope>(&bytes) {
                Ok(envelope) => {
                    if inbox.send(envelope).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!("[{}] Dropping undecodable frame: {}", local, e);
                }
            },
            Err(e) => {
                debug!("[{}] Inbound connection failed: {}", local, e);
                return;
            }
        }
        next = frames.next().await;
    }
}
