//! Request bodies and response parsing for the Elasticsearch scroll API.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::batch::{Batch, ScrollPage};
use crate::error::{BackendError, ScrollOp};
use crate::request::{FieldSelection, SearchRequest, SortSpec};
use crate::token::CursorToken;

const MAX_REASON_CHARS: usize = 512;

/// Render a keep-alive in the largest whole Elasticsearch time unit.
pub fn format_keep_alive(keep_alive: Duration) -> String {
    const UNITS: [(u128, &str); 4] = [
        (86_400_000, "d"),
        (3_600_000, "h"),
        (60_000, "m"),
        (1_000, "s"),
    ];

    let millis = keep_alive.as_millis().max(1);
    for (size, unit) in UNITS {
        if millis % size == 0 {
            return format!("{}{unit}", millis / size);
        }
    }
    format!("{millis}ms")
}

pub(crate) fn start_body(request: &SearchRequest) -> Value {
    let query = if request.query.trim().is_empty() {
        json!({ "match_all": {} })
    } else {
        json!({
            "multi_match": {
                "query": request.query,
                "fields": request.fields.patterns(),
            }
        })
    };

    let sort = match &request.sort {
        SortSpec::Doc => json!("_doc"),
        SortSpec::Field { name, order } => {
            json!({ name.as_str(): { "order": order.as_str() } })
        }
    };

    let mut body = json!({
        "size": request.batch_size,
        "query": query,
        "sort": [sort],
    });
    if let FieldSelection::Only(fields) = &request.fields {
        body["_source"] = json!(fields);
    }
    body
}

pub(crate) fn continue_body(token: &CursorToken, keep_alive: Duration) -> Value {
    json!({
        "scroll": format_keep_alive(keep_alive),
        "scroll_id": token.as_str(),
    })
}

pub(crate) fn release_body(token: &CursorToken) -> Value {
    json!({ "scroll_id": token.as_str() })
}

#[derive(Debug, Deserialize)]
struct ScrollResponse {
    #[serde(rename = "_scroll_id")]
    scroll_id: Option<String>,
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    hits: Vec<Map<String, Value>>,
    #[serde(default)]
    total: Option<TotalHits>,
}

/// `hits.total` is a bare number before 7.0 and an object after.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Count(u64),
    Relation { value: u64 },
}

impl TotalHits {
    fn value(&self) -> u64 {
        match self {
            TotalHits::Count(value) | TotalHits::Relation { value } => *value,
        }
    }
}

pub(crate) fn parse_page(
    operation: ScrollOp,
    body: &[u8],
) -> Result<ScrollPage, BackendError> {
    let response: ScrollResponse = serde_json::from_slice(body)
        .map_err(|err| BackendError::protocol(operation, err.to_string()))?;

    let token = match response.scroll_id {
        Some(id) if id.is_empty() => {
            return Err(BackendError::protocol(operation, "empty _scroll_id"));
        }
        other => other.map(CursorToken::new),
    };

    let records = response.hits.hits.into_iter().map(Value::Object).collect();
    let mut page = ScrollPage::new(token, Batch::new(records));
    if let Some(total) = response.hits.total {
        page = page.with_total_hits(total.value());
    }
    Ok(page)
}

pub(crate) fn truncate_reason(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    let head: String = chars.by_ref().take(MAX_REASON_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}
