use std::time::Duration;

use async_trait::async_trait;

use crate::batch::ScrollPage;
use crate::error::BackendError;
use crate::request::SearchRequest;
use crate::token::CursorToken;

/// A search service that can retain a cursor between calls.
///
/// Implementations own transport concerns (connection reuse, client-side
/// timeouts, authentication). A client-side timeout is reported like any other
/// call failure, as [`BackendError::Unavailable`].
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run the initial search and open a cursor retained for
    /// `request.keep_alive`.
    async fn start_scroll(
        &self,
        request: &SearchRequest,
    ) -> Result<ScrollPage, BackendError>;

    /// Fetch the next page and refresh the cursor's retention clock.
    async fn continue_scroll(
        &self,
        token: &CursorToken,
        keep_alive: Duration,
    ) -> Result<ScrollPage, BackendError>;

    /// Free the retained cursor.
    async fn release_scroll(&self, token: &CursorToken) -> Result<(), BackendError>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}
