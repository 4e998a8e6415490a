use std::convert::Infallible;

use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{body::Bytes, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use log::{error, info};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::error::ChordError;
use crate::node::ChordNode;
use crate::transport::Transport;

fn format_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    response
}

fn error_response(status: StatusCode, message: impl std::fmt::Display) -> Response<Full<Bytes>> {
    format_response(status, json!({ "error": message.to_string() }).to_string())
}

fn not_found() -> Response<Full<Bytes>> {
    error_response(StatusCode::NOT_FOUND, "Not Found")
}

fn ping() -> Response<Full<Bytes>> {
    format_response(StatusCode::OK, json!({ "message": "pong" }).to_string())
}

fn chord_failure(e: ChordError) -> Response<Full<Bytes>> {
    let status = match e {
        ChordError::NotJoined | ChordError::Left => StatusCode::SERVICE_UNAVAILABLE,
        ChordError::InvalidArgument(_) | ChordError::Id(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
    };
    error_response(status, e)
}

async fn json_body(req: Request<hyper::body::Incoming>) -> Result<Value, Response<Full<Bytes>>> {
    let bytes = req
        .into_body()
        .collect()
        .await
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e))?
        .to_bytes();
    serde_json::from_slice(&bytes).map_err(|e| error_response(StatusCode::BAD_REQUEST, e))
}

async fn handler<T: Transport>(
    node: ChordNode<T>,
    req: Request<hyper::body::Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    if let Some(key) = path.strip_prefix("/entries/").filter(|key| !key.is_empty()) {
        let response = match method {
            Method::GET => match node.retrieve(key).await {
                Ok(values) => format_response(StatusCode::OK, json!(values).to_string()),
                Err(e) => chord_failure(e),
            },
            Method::PUT => match json_body(req).await {
                Ok(value) => match node.insert(key, value).await {
                    Ok(()) => format_response(StatusCode::CREATED, "{}"),
                    Err(e) => chord_failure(e),
                },
                Err(response) => response,
            },
            Method::DELETE => match json_body(req).await {
                Ok(value) => match node.remove(key, value).await {
                    Ok(()) => format_response(StatusCode::OK, "{}"),
                    Err(e) => chord_failure(e),
                },
                Err(response) => response,
            },
            _ => not_found(),
        };
        return Ok(response);
    }

    Ok(match (method, path.as_str()) {
        (Method::GET, "/ping") => ping(),
        (Method::GET, "/status") => match serde_json::to_string(&node.statuses()) {
            Ok(body) => format_response(StatusCode::OK, body),
            Err(e) => {
                error!("Failed to serialize status: {}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
            }
        },
        _ => not_found(),
    })
}

/// Serves the HTTP status and entry API for `node` on `address`.
pub async fn run<T: Transport>(
    node: ChordNode<T>,
    address: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(address).await?;

    info!("API is listening on http://{}", listener.local_addr()?);
    loop {
        let (tcp, _) = listener.accept().await?;
        let io = TokioIo::new(tcp);
        let node = node.clone();
        tokio::task::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .serve_connection(io, service_fn(move |req| handler(node.clone(), req)))
                .await
            {
                error!("Error serving connection: {:?}", err);
            }
        });
    }
}
