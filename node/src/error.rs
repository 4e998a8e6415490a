use ringlet_lib::dht_messages::Method;
use ringlet_lib::IdError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Failures while moving a message between two peers.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("failed to connect to {peer}: {source}")]
    Connect {
        peer: String,
        #[source]
        source: std::io::Error,
    },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode message: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("peer {0} is unreachable")]
    Unreachable(String),
    #[error("request {0} timed out")]
    Timeout(String),
    #[error("request {0} was cancelled")]
    Cancelled(String),
    #[error("transport is shut down")]
    Shutdown,
}

#[derive(Debug, Error)]
pub enum ChordError {
    #[error("invalid identifier: {0}")]
    Id(#[from] IdError),
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("create or join network at first")]
    NotJoined,
    #[error("node already created or joined a network")]
    AlreadyJoined,
    #[error("node has left the network")]
    Left,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("FIND_SUCCESSOR request circulates in the network")]
    RoutingLoop,
    #[error("lookup gave up after {0} attempts")]
    LookupExhausted(usize),
    #[error("request redirected more than {0} times")]
    TooManyRedirects(usize),
    #[error("{peer} answered {method:?} with failure: {message}")]
    Remote {
        peer: String,
        method: Method,
        message: String,
    },
    #[error("{peer} sent an unexpected {method:?} response")]
    UnexpectedResponse { peer: String, method: Method },
}
