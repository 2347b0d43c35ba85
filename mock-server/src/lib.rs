//! In-memory jsonstore server for tests and local development.
//!
//! # Design
//! One JSON document per secret, held in a `RwLock<HashMap>`. Paths below
//! the secret address nested object fields; writes create intermediate
//! objects as needed. Routing is done by hand in a single fallback handler
//! so an empty path (`/{secret}/`) is treated like any other.

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

pub type Db = Arc<RwLock<HashMap<String, Value>>>;

/// The storing server.
pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new().fallback(handle).with_state(db)
}

/// A server that answers every request with `status` and `body`.
pub fn fixed_status(status: StatusCode, body: &'static str) -> Router {
    Router::new().fallback(move || async move { (status, body) })
}

/// A server that answers every request with a description of it, wrapped
/// as `{"result": {...}}`.
pub fn echo() -> Router {
    Router::new().fallback(echo_request)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, app()).await
}

pub async fn serve(listener: TcpListener, router: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, router).await
}

/// Split `/{secret}/{path...}` into the secret and its non-empty segments.
pub fn split_path(path: &str) -> Option<(String, Vec<String>)> {
    let mut parts = path.trim_start_matches('/').split('/');
    let secret = parts.next().filter(|s| !s.is_empty())?;
    let segments = parts.filter(|s| !s.is_empty()).map(str::to_string).collect();
    Some((secret.to_string(), segments))
}

async fn handle(State(db): State<Db>, method: Method, uri: Uri, body: Bytes) -> Response {
    let Some((secret, segments)) = split_path(uri.path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    debug!(%method, depth = segments.len(), "handling request");

    match method {
        Method::GET => {
            let docs = db.read().await;
            match docs.get(&secret).and_then(|doc| lookup(doc, &segments)) {
                Some(value) => Json(json!({ "result": value })).into_response(),
                None => StatusCode::NOT_FOUND.into_response(),
            }
        }
        Method::POST | Method::PUT => {
            let value = match parse_body(&body) {
                Ok(value) => value,
                Err(status) => return status.into_response(),
            };
            let mut docs = db.write().await;
            let doc = docs.entry(secret).or_insert(Value::Null);
            insert(doc, &segments, value);
            let status = if method == Method::POST {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, Json(json!({ "ok": true }))).into_response()
        }
        Method::DELETE => {
            let mut docs = db.write().await;
            let removed = if segments.is_empty() {
                docs.remove(&secret).is_some()
            } else {
                docs.get_mut(&secret)
                    .map(|doc| remove(doc, &segments))
                    .unwrap_or(false)
            };
            if removed {
                Json(json!({ "ok": true })).into_response()
            } else {
                StatusCode::NOT_FOUND.into_response()
            }
        }
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

async fn echo_request(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let headers: Map<String, Value> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), Value::String(value.to_string())))
        })
        .collect();
    Json(json!({
        "result": {
            "method": method.as_str(),
            "path": uri.path(),
            "headers": headers,
            "body": String::from_utf8_lossy(&body),
        }
    }))
}

fn parse_body(body: &[u8]) -> Result<Value, StatusCode> {
    if body.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|_| StatusCode::BAD_REQUEST)
}

/// Value at `segments` inside `doc`.
pub fn lookup<'a>(doc: &'a Value, segments: &[String]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(doc, |node, segment| node.as_object()?.get(segment))
}

/// Set the value at `segments`, replacing non-object intermediates with
/// empty objects.
pub fn insert(doc: &mut Value, segments: &[String], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        *doc = value;
        return;
    };
    let mut node = doc;
    for segment in parents {
        node = object_mut(node)
            .entry(segment.clone())
            .or_insert(Value::Null);
    }
    object_mut(node).insert(last.clone(), value);
}

/// Remove the value at `segments`. Returns whether anything was removed.
pub fn remove(doc: &mut Value, segments: &[String]) -> bool {
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };
    let mut node = doc;
    for segment in parents {
        match node.as_object_mut().and_then(|map| map.get_mut(segment)) {
            Some(next) => node = next,
            None => return false,
        }
    }
    node.as_object_mut()
        .map(|map| map.remove(last).is_some())
        .unwrap_or(false)
}

fn object_mut(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just made an object"),
    }
}
