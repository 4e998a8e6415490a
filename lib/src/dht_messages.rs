use serde::{Deserialize, Serialize};

use crate::entry::Entry;
use crate::id::Id;

pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Descriptor exchanged between peers. The receiver derives the node id from
/// `peer_id` itself, so `node_id` is informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub peer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<Id>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Method {
    FindSuccessor,
    NotifyAndCopy,
    Notify,
    Ping,
    InsertReplicas,
    RemoveReplicas,
    InsertEntry,
    RetrieveEntries,
    RemoveEntry,
    LeavesNetwork,
}

impl Method {
    /// One-way methods are fire-and-forget: the receiver never answers them.
    pub fn expects_response(self) -> bool {
        !matches!(
            self,
            Method::InsertReplicas | Method::RemoveReplicas | Method::LeavesNetwork
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestParams {
    FindSuccessor { key: Id },
    NotifyAndCopy { potential_predecessor: NodeInfo },
    Notify { potential_predecessor: NodeInfo },
    Ping,
    InsertReplicas { replicas: Vec<Entry> },
    RemoveReplicas { sending_node_id: Id, replicas: Vec<Entry> },
    InsertEntry { entry: Entry },
    RetrieveEntries { id: Id },
    RemoveEntry { entry: Entry },
    LeavesNetwork { predecessor: NodeInfo },
}

impl RequestParams {
    pub fn method(&self) -> Method {
        match self {
            RequestParams::FindSuccessor { .. } => Method::FindSuccessor,
            RequestParams::NotifyAndCopy { .. } => Method::NotifyAndCopy,
            RequestParams::Notify { .. } => Method::Notify,
            RequestParams::Ping => Method::Ping,
            RequestParams::InsertReplicas { .. } => Method::InsertReplicas,
            RequestParams::RemoveReplicas { .. } => Method::RemoveReplicas,
            RequestParams::InsertEntry { .. } => Method::InsertEntry,
            RequestParams::RetrieveEntries { .. } => Method::RetrieveEntries,
            RequestParams::RemoveEntry { .. } => Method::RemoveEntry,
            RequestParams::LeavesNetwork { .. } => Method::LeavesNetwork,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub version: String,
    pub request_id: String,
    pub timestamp: u64,
    pub call: RequestParams,
}

impl Request {
    pub fn new(request_id: String, timestamp: u64, call: RequestParams) -> Self {
        Request {
            version: PROTOCOL_VERSION.to_string(),
            request_id,
            timestamp,
            call,
        }
    }

    pub fn method(&self) -> Method {
        self.call.method()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Success,
    Redirect,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Empty,
    Successor { successor: NodeInfo },
    Redirect { redirect: NodeInfo },
    References { references: Vec<NodeInfo> },
    ReferencesAndEntries {
        references: Vec<NodeInfo>,
        entries: Vec<Entry>,
    },
    Entries { entries: Vec<Entry> },
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub version: String,
    pub request_id: String,
    pub timestamp: u64,
    pub method: Method,
    pub status: Status,
    pub result: ResponseResult,
}

impl Response {
    fn answer(request: &Request, timestamp: u64, status: Status, result: ResponseResult) -> Self {
        Response {
            version: PROTOCOL_VERSION.to_string(),
            request_id: request.request_id.clone(),
            timestamp,
            method: request.method(),
            status,
            result,
        }
    }

    pub fn success(request: &Request, timestamp: u64, result: ResponseResult) -> Self {
        Self::answer(request, timestamp, Status::Success, result)
    }

    pub fn redirect(request: &Request, timestamp: u64, next: NodeInfo) -> Self {
        Self::answer(
            request,
            timestamp,
            Status::Redirect,
            ResponseResult::Redirect { redirect: next },
        )
    }

    pub fn failure(request: &Request, timestamp: u64, message: impl Into<String>) -> Self {
        Self::answer(
            request,
            timestamp,
            Status::Failed,
            ResponseResult::Error {
                message: message.into(),
            },
        )
    }
}

/// Everything that travels between two peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Request(Request),
    Response(Response),
}
