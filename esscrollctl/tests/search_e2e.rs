use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use assert_cmd::cargo::cargo_bin_cmd;
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use serde_json::{Value, json};
use tempfile::TempDir;

/// Serves `total` documents in pages sized by the initial request and logs
/// cleared scroll ids.
#[derive(Debug, Default)]
struct Index {
    total: usize,
    size: usize,
    offset: usize,
    cleared: Vec<String>,
}

type Shared = Arc<Mutex<Index>>;

fn page(index: &mut Index) -> Value {
    let end = (index.offset + index.size).min(index.total);
    let hits: Vec<Value> = (index.offset..end)
        .map(|n| json!({ "_id": n.to_string(), "_source": { "n": n } }))
        .collect();
    index.offset = end;
    json!({
        "_scroll_id": format!("sid-{end}"),
        "hits": { "total": { "value": index.total }, "hits": hits }
    })
}

async fn search(
    State(index): State<Shared>,
    Path(_name): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut index = index.lock().unwrap();
    index.size = body["size"].as_u64().unwrap() as usize;
    Json(page(&mut index))
}

async fn scroll(State(index): State<Shared>) -> Json<Value> {
    Json(page(&mut index.lock().unwrap()))
}

async fn clear(State(index): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let id = body["scroll_id"].as_str().unwrap().to_string();
    index.lock().unwrap().cleared.push(id);
    Json(json!({ "succeeded": true }))
}

async fn serve(total: usize) -> (SocketAddr, Shared) {
    let state: Shared = Arc::new(Mutex::new(Index {
        total,
        ..Index::default()
    }));
    let app = Router::new()
        .route("/{index}/_search", post(search))
        .route("/_search/scroll", post(scroll).delete(clear))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    (addr, state)
}

fn run_search(addr: SocketAddr, extra: &[&str]) -> assert_cmd::assert::Assert {
    let dir = TempDir::new().unwrap();
    let mut cmd = cargo_bin_cmd!("esscrollctl");
    for var in ["ESSCROLL_CONFIG_PATH", "ESSCROLL_USERNAME", "ESSCROLL_PASSWORD", "ESSCROLL_PASSWORD_FILE"] {
        cmd.env_remove(var);
    }
    cmd.current_dir(dir.path())
        .env("ESSCROLL_URL", format!("http://{addr}"))
        .args(["search", "--index", "logs", "--batch-size", "2"])
        .args(extra)
        .assert()
}

#[tokio::test(flavor = "multi_thread")]
async fn pretty_output_matches_progress_format() {
    let (addr, state) = serve(3).await;
    let assert = tokio::task::spawn_blocking(move || run_search(addr, &[]))
        .await
        .unwrap();

    let output = assert.success().get_output().stdout.clone();
    let text = String::from_utf8(output).unwrap();
    assert_eq!(text.matches(&"-".repeat(80)).count(), 3);
    assert!(text.contains("Processed 2 documents so far..."));
    assert!(text.contains("Processed 3 documents so far..."));
    assert!(text.ends_with("\nSearch completed. Total documents found: 3\n"));
    assert_eq!(state.lock().unwrap().cleared, vec!["sid-3"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn limit_stops_early_and_clears_the_cursor() {
    let (addr, state) = serve(10).await;
    let assert = tokio::task::spawn_blocking(move || {
        run_search(addr, &["--output", "ndjson", "--limit", "3"])
    })
    .await
    .unwrap();

    let output = assert.success().get_output().stdout.clone();
    let lines: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2]["_id"], "2");
    assert_eq!(state.lock().unwrap().cleared, vec!["sid-4"]);
}
