use std::{future::Future, ops::ControlFlow, sync::Arc};

use futures::Stream;
use tracing::debug;

use super::ScrollCursor;
use crate::backend::SearchBackend;
use crate::batch::Batch;
use crate::error::{ReleaseWarning, ScrollError};
use crate::request::SearchRequest;

/// How a scoped scan finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEnd {
    /// The backend ran out of results.
    Exhausted,
    /// The handler asked to stop; the cursor was closed early.
    Stopped,
}

#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub batches: usize,
    pub records: usize,
    pub total_hits: Option<u64>,
    pub end: ScanEnd,
    pub release_warning: Option<ReleaseWarning>,
}

impl ScrollCursor {
    /// Run a whole scroll session inside one scope.
    ///
    /// `handler` receives every non-empty batch in order and returns
    /// `ControlFlow::Break(())` to stop early. The backend cursor is released
    /// on every way out of the scope: exhaustion, an early break, a handler
    /// error, or a backend failure. Errors are returned after the release.
    pub async fn scan<F, Fut, E>(
        backend: Arc<dyn SearchBackend>,
        request: SearchRequest,
        mut handler: F,
    ) -> Result<ScanSummary, E>
    where
        F: FnMut(Batch) -> Fut,
        Fut: Future<Output = Result<ControlFlow<()>, E>>,
        E: From<ScrollError>,
    {
        let (mut cursor, first) = Self::open(backend, request).await?;

        let outcome: Result<ScanEnd, E> = async {
            let mut batch = first;
            loop {
                if batch.is_empty() {
                    return Ok(ScanEnd::Exhausted);
                }
                if handler(batch).await?.is_break() {
                    return Ok(ScanEnd::Stopped);
                }
                match cursor.next().await? {
                    Some(next) => batch = next,
                    None => return Ok(ScanEnd::Exhausted),
                }
            }
        }
        .await;

        // No-op unless the loop left through a break or a handler error.
        cursor.close().await;

        let end = outcome?;
        debug!(
            collection = %cursor.request().collection,
            batches = cursor.batches_yielded(),
            records = cursor.records_yielded(),
            ?end,
            "scan finished"
        );

        Ok(ScanSummary {
            batches: cursor.batches_yielded(),
            records: cursor.records_yielded(),
            total_hits: cursor.total_hits(),
            end,
            release_warning: cursor.release_warning().cloned(),
        })
    }

    /// Expose a scroll session as a stream of non-empty batches.
    ///
    /// The stream ends after exhaustion and yields at most one error, after
    /// which the session is already released. Dropping the stream early drops
    /// the cursor, which releases it in the background.
    pub fn stream(
        backend: Arc<dyn SearchBackend>,
        request: SearchRequest,
    ) -> impl Stream<Item = Result<Batch, ScrollError>> + Send + 'static {
        async_stream::try_stream! {
            let (mut cursor, first) = ScrollCursor::open(backend, request).await?;
            if !first.is_empty() {
                yield first;
                while let Some(batch) = cursor.next().await? {
                    yield batch;
                }
            }
        }
    }
}
