#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::{Value, json};

/// What the fake cluster saw, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Seen {
    Search { index: String, scroll: Option<String>, body: Value },
    Scroll { scroll_id: String, scroll: Option<String> },
    Clear { scroll_id: String },
}

#[derive(Debug, Default)]
struct Cluster {
    documents: HashMap<String, Vec<Value>>,
    /// scroll id -> (index, offset, page size)
    contexts: HashMap<String, (String, usize, usize)>,
    issued: usize,
    seen: Vec<Seen>,
    authorization: Vec<Option<String>>,
    fail_scroll_with: Option<StatusCode>,
    drop_scroll_id: bool,
}

/// A tiny stand-in for the Elasticsearch scroll API served over real HTTP.
#[derive(Debug, Clone)]
pub struct FakeElasticsearch {
    cluster: Arc<Mutex<Cluster>>,
    pub addr: SocketAddr,
}

impl FakeElasticsearch {
    pub async fn start() -> Self {
        let cluster = Arc::new(Mutex::new(Cluster::default()));
        let app = Router::new()
            .route("/_search/scroll", post(continue_scroll).delete(clear_scroll))
            .route("/{index}/_search", post(search))
            .with_state(cluster.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake elasticsearch");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake elasticsearch");
        });

        Self { cluster, addr }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn index(&self, name: &str, count: usize) {
        let docs = (0..count)
            .map(|n| json!({ "_index": name, "_id": n.to_string(), "_source": { "n": n } }))
            .collect();
        self.cluster
            .lock()
            .unwrap()
            .documents
            .insert(name.to_string(), docs);
    }

    /// Make every continuation answer with `status`.
    pub fn fail_scrolls_with(&self, status: StatusCode) {
        self.cluster.lock().unwrap().fail_scroll_with = Some(status);
    }

    /// Omit `_scroll_id` from responses.
    pub fn drop_scroll_ids(&self) {
        self.cluster.lock().unwrap().drop_scroll_id = true;
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.cluster.lock().unwrap().seen.clone()
    }

    pub fn open_contexts(&self) -> usize {
        self.cluster.lock().unwrap().contexts.len()
    }

    pub fn authorization_headers(&self) -> Vec<Option<String>> {
        self.cluster.lock().unwrap().authorization.clone()
    }
}

impl Cluster {
    fn record_auth(&mut self, headers: &HeaderMap) {
        let value = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.authorization.push(value);
    }

    /// Serve the next page of `scroll_id` and rotate its id.
    fn page(&mut self, scroll_id: String) -> Value {
        let (index, offset, size) = self
            .contexts
            .remove(&scroll_id)
            .expect("context exists");
        let docs = self.documents.get(&index).cloned().unwrap_or_default();
        let end = (offset + size).min(docs.len());
        let hits = docs[offset..end].to_vec();

        self.issued += 1;
        let next_id = format!("scroll-{}", self.issued);
        self.contexts.insert(next_id.clone(), (index, end, size));

        let mut body = json!({
            "took": 1,
            "timed_out": false,
            "hits": {
                "total": { "value": docs.len(), "relation": "eq" },
                "hits": hits,
            }
        });
        if !self.drop_scroll_id {
            body["_scroll_id"] = json!(next_id);
        }
        body
    }
}

async fn search(
    State(cluster): State<Arc<Mutex<Cluster>>>,
    Path(index): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut cluster = cluster.lock().unwrap();
    cluster.record_auth(&headers);
    cluster.seen.push(Seen::Search {
        index: index.clone(),
        scroll: params.get("scroll").cloned(),
        body: body.clone(),
    });

    if !cluster.documents.contains_key(&index) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": { "type": "index_not_found_exception" }, "status": 404 })),
        )
            .into_response();
    }

    let size = body["size"].as_u64().unwrap_or(10) as usize;
    let id = "scroll-0".to_string();
    cluster.contexts.insert(id.clone(), (index, 0, size));
    Json(cluster.page(id)).into_response()
}

async fn continue_scroll(
    State(cluster): State<Arc<Mutex<Cluster>>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut cluster = cluster.lock().unwrap();
    cluster.record_auth(&headers);
    let scroll_id = body["scroll_id"].as_str().unwrap_or_default().to_string();
    cluster.seen.push(Seen::Scroll {
        scroll_id: scroll_id.clone(),
        scroll: body["scroll"].as_str().map(str::to_string),
    });

    if let Some(status) = cluster.fail_scroll_with {
        return (status, "upstream unavailable").into_response();
    }
    if !cluster.contexts.contains_key(&scroll_id) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": { "type": "search_context_missing_exception" } })),
        )
            .into_response();
    }
    Json(cluster.page(scroll_id)).into_response()
}

async fn clear_scroll(
    State(cluster): State<Arc<Mutex<Cluster>>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut cluster = cluster.lock().unwrap();
    cluster.record_auth(&headers);
    let scroll_id = body["scroll_id"].as_str().unwrap_or_default().to_string();
    cluster.seen.push(Seen::Clear {
        scroll_id: scroll_id.clone(),
    });

    if cluster.contexts.remove(&scroll_id).is_some() {
        Json(json!({ "succeeded": true, "num_freed": 1 })).into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "succeeded": true, "num_freed": 0 })),
        )
            .into_response()
    }
}
