//! Search request value passed to [`ScrollCursor::open`](crate::ScrollCursor::open).

use std::{fmt, str::FromStr, time::Duration};

use crate::error::ScrollError;

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(5 * 60);
/// Shortest keep-alive the wire format can express.
pub const MIN_KEEP_ALIVE: Duration = Duration::from_millis(1);

/// Which fields a scroll matches against and returns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldSelection {
    /// Wildcard, every field.
    #[default]
    All,
    Only(Vec<String>),
}

impl FieldSelection {
    /// Field patterns as a backend expects them; `All` is the `*` wildcard.
    pub fn patterns(&self) -> Vec<&str> {
        match self {
            FieldSelection::All => vec!["*"],
            FieldSelection::Only(fields) => {
                fields.iter().map(String::as_str).collect()
            }
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, FieldSelection::All)
    }
}

impl<S: Into<String>> FromIterator<S> for FieldSelection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let fields: Vec<String> = iter.into_iter().map(Into::into).collect();
        if fields.iter().any(|field| field == "*") {
            FieldSelection::All
        } else {
            FieldSelection::Only(fields)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Enumeration order for the scan.
///
/// Only stable, non-scoring orders are accepted: relevance ordering can shift
/// between continuation calls and makes cursoring both slower and
/// nondeterministic.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SortSpec {
    /// Index insertion order.
    #[default]
    Doc,
    Field { name: String, order: SortOrder },
}

impl SortSpec {
    pub fn field(name: impl Into<String>, order: SortOrder) -> Self {
        SortSpec::Field {
            name: name.into(),
            order,
        }
    }

    fn validate(&self) -> Result<(), ScrollError> {
        match self {
            SortSpec::Doc => Ok(()),
            SortSpec::Field { name, .. } if name.trim().is_empty() => Err(
                ScrollError::invalid_request("sort field must not be empty"),
            ),
            SortSpec::Field { name, .. } if name == "_score" => {
                Err(ScrollError::invalid_request(
                    "relevance sort (_score) is not a stable scroll order",
                ))
            }
            SortSpec::Field { .. } => Ok(()),
        }
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortSpec::Doc => f.write_str("_doc"),
            SortSpec::Field { name, order } => {
                write!(f, "{name}:{}", order.as_str())
            }
        }
    }
}

impl FromStr for SortSpec {
    type Err = ScrollError;

    /// Parses `_doc`, `field`, `field:asc` or `field:desc`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.is_empty() || raw == "_doc" {
            return Ok(SortSpec::Doc);
        }

        let (name, order) = match raw.rsplit_once(':') {
            Some((name, order)) => {
                let order = match order.to_ascii_lowercase().as_str() {
                    "asc" => SortOrder::Asc,
                    "desc" => SortOrder::Desc,
                    other => {
                        return Err(ScrollError::invalid_request(format!(
                            "unknown sort order `{other}` (expected asc or desc)"
                        )));
                    }
                };
                (name, order)
            }
            None => (raw, SortOrder::Asc),
        };

        let spec = SortSpec::field(name.trim(), order);
        spec.validate()?;
        Ok(spec)
    }
}

/// Everything needed to open one scroll session.
///
/// The cursor takes its own copy at open time and never mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Target index / collection.
    pub collection: String,
    /// Free-text query; blank means match everything.
    pub query: String,
    pub batch_size: usize,
    /// Backend-side cursor retention between calls. This is not a client
    /// timeout and must outlast the caller's per-batch processing time.
    pub keep_alive: Duration,
    pub fields: FieldSelection,
    pub sort: SortSpec,
}

impl SearchRequest {
    pub fn new(collection: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            query: query.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            keep_alive: DEFAULT_KEEP_ALIVE,
            fields: FieldSelection::All,
            sort: SortSpec::Doc,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn with_fields(mut self, fields: FieldSelection) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    /// Rejects requests that cannot drive a scroll.
    pub fn validate(&self) -> Result<(), ScrollError> {
        if self.collection.trim().is_empty() {
            return Err(ScrollError::invalid_request(
                "collection must not be empty",
            ));
        }

        if self.batch_size == 0 {
            return Err(ScrollError::invalid_request(
                "batch size must be greater than zero",
            ));
        }

        if self.keep_alive < MIN_KEEP_ALIVE {
            return Err(ScrollError::invalid_request(
                "keep-alive must be at least one millisecond",
            ));
        }

        if let FieldSelection::Only(fields) = &self.fields {
            if fields.is_empty() {
                return Err(ScrollError::invalid_request(
                    "field selection must name at least one field",
                ));
            }
            if fields.iter().any(|field| field.trim().is_empty()) {
                return Err(ScrollError::invalid_request(
                    "field names must not be empty",
                ));
            }
        }

        self.sort.validate()
    }
}
