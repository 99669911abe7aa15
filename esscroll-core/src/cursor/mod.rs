//! Scroll session state machine.
//!
//! A [`ScrollCursor`] owns one backend cursor from the initial search until it
//! is released. The token lives inside the `Active` phase only, so leaving
//! `Active` necessarily hands the token to the single release call.

mod scan;

pub use scan::{ScanEnd, ScanSummary};

use std::{fmt, sync::Arc};

use tracing::{debug, info, warn};

use crate::backend::SearchBackend;
use crate::batch::{Batch, ScrollPage};
use crate::error::{ReleaseWarning, Result, ScrollError, ScrollOp};
use crate::request::SearchRequest;
use crate::token::CursorToken;

/// Externally visible session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollStatus {
    NotStarted,
    Active,
    Exhausted,
    Closed,
    Failed,
}

impl ScrollStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ScrollStatus::Exhausted | ScrollStatus::Closed | ScrollStatus::Failed
        )
    }
}

impl fmt::Display for ScrollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScrollStatus::NotStarted => "not started",
            ScrollStatus::Active => "active",
            ScrollStatus::Exhausted => "exhausted",
            ScrollStatus::Closed => "closed",
            ScrollStatus::Failed => "failed",
        })
    }
}

enum Phase {
    NotStarted,
    Active(CursorToken),
    Exhausted,
    Closed,
    Failed,
}

impl Phase {
    fn status(&self) -> ScrollStatus {
        match self {
            Phase::NotStarted => ScrollStatus::NotStarted,
            Phase::Active(_) => ScrollStatus::Active,
            Phase::Exhausted => ScrollStatus::Exhausted,
            Phase::Closed => ScrollStatus::Closed,
            Phase::Failed => ScrollStatus::Failed,
        }
    }
}

/// Client side of a server-retained search cursor.
///
/// Created by [`ScrollCursor::open`], which also returns the first batch.
/// Every exit path releases the backend cursor at most once:
///
/// - an empty batch from [`next`](Self::next) exhausts and releases,
/// - a failed call marks the session failed and releases with the last token,
/// - [`close`](Self::close) releases an active session early,
/// - dropping an active cursor releases in the background when a tokio
///   runtime is available, and otherwise logs the leak.
pub struct ScrollCursor {
    backend: Arc<dyn SearchBackend>,
    request: SearchRequest,
    phase: Phase,
    batches: usize,
    records: usize,
    total_hits: Option<u64>,
    release_warning: Option<ReleaseWarning>,
}

impl fmt::Debug for ScrollCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("ScrollCursor");
        debug
            .field("backend", &self.backend.name())
            .field("collection", &self.request.collection)
            .field("status", &self.status());
        if let Phase::Active(token) = &self.phase {
            debug.field("token", token);
        }
        debug
            .field("batches", &self.batches)
            .field("records", &self.records)
            .finish()
    }
}

impl ScrollCursor {
    /// Validate `request`, run the initial search, and return the session
    /// together with its first batch.
    ///
    /// An empty first batch leaves the session `Exhausted`; a token issued
    /// alongside it is released before returning. A failure before any token
    /// was obtained never reaches the release path.
    pub async fn open(
        backend: Arc<dyn SearchBackend>,
        request: SearchRequest,
    ) -> Result<(Self, Batch)> {
        request.validate()?;

        let mut cursor = Self {
            backend,
            request,
            phase: Phase::NotStarted,
            batches: 0,
            records: 0,
            total_hits: None,
            release_warning: None,
        };
        let first = cursor.start().await?;
        Ok((cursor, first))
    }

    pub fn status(&self) -> ScrollStatus {
        self.phase.status()
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Active(_))
    }

    pub fn request(&self) -> &SearchRequest {
        &self.request
    }

    /// Token the next continuation would use.
    pub fn token(&self) -> Option<&CursorToken> {
        match &self.phase {
            Phase::Active(token) => Some(token),
            _ => None,
        }
    }

    /// Non-empty batches yielded so far, including the first.
    pub fn batches_yielded(&self) -> usize {
        self.batches
    }

    pub fn records_yielded(&self) -> usize {
        self.records
    }

    /// Total matches as last reported by the backend.
    pub fn total_hits(&self) -> Option<u64> {
        self.total_hits
    }

    /// The release failure, if the session's release call failed.
    pub fn release_warning(&self) -> Option<&ReleaseWarning> {
        self.release_warning.as_ref()
    }

    /// Fetch the next batch.
    ///
    /// Returns `Ok(None)` once the backend reports an empty batch; the session
    /// is then `Exhausted` and its cursor released. On a failed call the
    /// session becomes `Failed`, the cursor is released with the last known
    /// token, and the call's error is returned unchanged.
    pub async fn next(&mut self) -> Result<Option<Batch>> {
        let token = match &self.phase {
            Phase::Active(token) => token.clone(),
            other => {
                return Err(ScrollError::InvalidState {
                    action: "advance",
                    status: other.status(),
                });
            }
        };

        let page = match self
            .backend
            .continue_scroll(&token, self.request.keep_alive)
            .await
        {
            Ok(page) => page,
            Err(err) => {
                warn!(
                    collection = %self.request.collection,
                    token = %token.fingerprint(),
                    error = %err,
                    "scroll continuation failed"
                );
                self.fail(token).await;
                return Err(err.into());
            }
        };

        let ScrollPage {
            token: next_token,
            batch,
            total_hits,
        } = page;
        if total_hits.is_some() {
            self.total_hits = total_hits;
        }

        if batch.is_empty() {
            let last = next_token.unwrap_or(token);
            info!(
                collection = %self.request.collection,
                batches = self.batches,
                records = self.records,
                "scroll exhausted"
            );
            self.phase = Phase::Exhausted;
            self.release(last).await;
            return Ok(None);
        }

        let Some(next_token) = next_token else {
            self.fail(token).await;
            return Err(ScrollError::ProtocolError {
                operation: ScrollOp::Continue,
                reason: "response carried hits but no cursor token".into(),
            });
        };

        if next_token != token {
            debug!(
                from = %token.fingerprint(),
                to = %next_token.fingerprint(),
                "scroll token rotated"
            );
        }
        self.phase = Phase::Active(next_token);
        self.record_batch(&batch);
        Ok(Some(batch))
    }

    /// End the session early.
    ///
    /// Releases the cursor of an `Active` session and moves it to `Closed`.
    /// Any other status is left untouched, so repeated calls are no-ops. A
    /// failed release is logged and returned, never raised.
    pub async fn close(&mut self) -> Option<ReleaseWarning> {
        match std::mem::replace(&mut self.phase, Phase::Closed) {
            Phase::Active(token) => {
                info!(
                    collection = %self.request.collection,
                    batches = self.batches,
                    records = self.records,
                    "closing scroll before exhaustion"
                );
                self.release(token).await
            }
            Phase::NotStarted => None,
            settled => {
                self.phase = settled;
                None
            }
        }
    }

    async fn start(&mut self) -> Result<Batch> {
        debug!(
            backend = self.backend.name(),
            collection = %self.request.collection,
            batch_size = self.request.batch_size,
            keep_alive = ?self.request.keep_alive,
            "opening scroll"
        );

        let page = match self.backend.start_scroll(&self.request).await {
            Ok(page) => page,
            Err(err) => {
                warn!(
                    collection = %self.request.collection,
                    error = %err,
                    "initial scroll search failed"
                );
                self.phase = Phase::Failed;
                return Err(err.into());
            }
        };

        let ScrollPage {
            token,
            batch,
            total_hits,
        } = page;
        self.total_hits = total_hits;

        match (token, batch.is_empty()) {
            (None, false) => {
                self.phase = Phase::Failed;
                Err(ScrollError::ProtocolError {
                    operation: ScrollOp::Start,
                    reason: "response carried hits but no cursor token".into(),
                })
            }
            (None, true) => {
                info!(collection = %self.request.collection, "scroll matched nothing");
                self.phase = Phase::Exhausted;
                Ok(batch)
            }
            (Some(token), true) => {
                info!(collection = %self.request.collection, "scroll matched nothing");
                self.phase = Phase::Exhausted;
                self.release(token).await;
                Ok(batch)
            }
            (Some(token), false) => {
                info!(
                    collection = %self.request.collection,
                    total_hits = ?self.total_hits,
                    "scroll opened"
                );
                self.phase = Phase::Active(token);
                self.record_batch(&batch);
                Ok(batch)
            }
        }
    }

    async fn fail(&mut self, token: CursorToken) {
        self.phase = Phase::Failed;
        self.release(token).await;
    }

    /// Callers move the token out of `Phase::Active` first, so a session's
    /// token is released at most once.
    async fn release(&mut self, token: CursorToken) -> Option<ReleaseWarning> {
        match self.backend.release_scroll(&token).await {
            Ok(()) => {
                debug!(token = %token.fingerprint(), "scroll cursor released");
                None
            }
            Err(err) => {
                let warning = ReleaseWarning::new(&token, &err);
                warn!(
                    collection = %self.request.collection,
                    %warning,
                    "scroll cursor left for the backend to expire"
                );
                self.release_warning = Some(warning.clone());
                Some(warning)
            }
        }
    }

    fn record_batch(&mut self, batch: &Batch) {
        self.batches += 1;
        self.records += batch.len();
    }
}

impl Drop for ScrollCursor {
    fn drop(&mut self) {
        let Phase::Active(token) = std::mem::replace(&mut self.phase, Phase::Closed)
        else {
            return;
        };

        let collection = std::mem::take(&mut self.request.collection);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!(
                    %collection,
                    token = %token.fingerprint(),
                    "active scroll cursor dropped without close; releasing in background"
                );
                let backend = Arc::clone(&self.backend);
                handle.spawn(async move {
                    if let Err(err) = backend.release_scroll(&token).await {
                        let warning = ReleaseWarning::new(&token, &err);
                        warn!(%collection, %warning, "background scroll release failed");
                    }
                });
            }
            Err(_) => {
                warn!(
                    %collection,
                    token = %token.fingerprint(),
                    "active scroll cursor dropped outside a runtime; it stays open until its keep-alive expires"
                );
            }
        }
    }
}
