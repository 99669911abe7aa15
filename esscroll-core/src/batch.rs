use serde::Serialize;

use crate::token::CursorToken;

/// One search hit, kept as the backend returned it.
pub type Record = serde_json::Value;

/// An ordered page of records. An empty batch signals exhaustion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Batch {
    records: Vec<Record>,
}

impl Batch {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

impl From<Vec<Record>> for Batch {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}

impl IntoIterator for Batch {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// What a backend hands back for a start or continue call.
#[derive(Debug, Clone, Default)]
pub struct ScrollPage {
    /// Token for the next continuation. May be absent when the result is
    /// empty; a page with records but no token is a protocol violation.
    pub token: Option<CursorToken>,
    pub batch: Batch,
    /// Total matches, when the backend reports it.
    pub total_hits: Option<u64>,
}

impl ScrollPage {
    pub fn new(token: Option<CursorToken>, batch: Batch) -> Self {
        Self {
            token,
            batch,
            total_hits: None,
        }
    }

    pub fn with_total_hits(mut self, total: u64) -> Self {
        self.total_hits = Some(total);
        self
    }
}
