//! # esscroll core
//!
//! Scrolled-search pagination for search backends that retain a server-side
//! cursor between requests (the Elasticsearch scroll API and compatibles).
//!
//! ## Overview
//!
//! - **Cursor engine**: [`ScrollCursor`] issues the initial search, follows the
//!   rotating cursor token through continuation calls, and releases the
//!   backend cursor exactly once on every exit path
//! - **Backend port**: [`SearchBackend`] is the async seam the cursor talks to
//! - **Elasticsearch**: [`elasticsearch::ElasticsearchBackend`] speaks the
//!   scroll REST API over `reqwest`
//!
//! ## Lifecycle
//!
//! A session moves through `NotStarted -> Active -> {Exhausted | Failed}`,
//! with `Active -> Closed` on caller-initiated termination. Terminal states are
//! sticky. Calls on one session are sequential by construction: [`ScrollCursor::next`]
//! and [`ScrollCursor::close`] take `&mut self`.
//!
//! ## Examples
//!
//! ```no_run
//! use std::{ops::ControlFlow, sync::Arc};
//!
//! use esscroll_core::{
//!     ScrollCursor, ScrollError, SearchRequest,
//!     elasticsearch::{ElasticsearchBackend, ElasticsearchOptions},
//! };
//!
//! async fn count_matches() -> Result<usize, Box<dyn std::error::Error>> {
//!     let backend = ElasticsearchBackend::new(ElasticsearchOptions::new(
//!         "http://localhost:9200",
//!     ))?;
//!     let request = SearchRequest::new("logs", "timeout").with_batch_size(500);
//!
//!     let summary = ScrollCursor::scan(Arc::new(backend), request, |batch| async move {
//!         println!("got {} records", batch.len());
//!         Ok::<_, ScrollError>(ControlFlow::Continue(()))
//!     })
//!     .await?;
//!
//!     Ok(summary.records)
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod backend;
pub mod batch;
pub mod cursor;
pub mod elasticsearch;
pub mod error;
pub mod request;
pub mod token;

pub use backend::SearchBackend;
pub use batch::{Batch, Record, ScrollPage};
pub use cursor::{ScanEnd, ScanSummary, ScrollCursor, ScrollStatus};
pub use error::{BackendError, ReleaseWarning, Result, ScrollError, ScrollOp};
pub use request::{FieldSelection, SearchRequest, SortOrder, SortSpec};
pub use token::CursorToken;
