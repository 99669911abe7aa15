#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use esscroll_core::{
    Batch, BackendError, CursorToken, ScrollOp, ScrollPage, SearchBackend,
    SearchRequest,
};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Start { collection: String, batch_size: usize },
    Continue { token: String, keep_alive: Duration },
    Release { token: String },
}

/// In-memory scroll backend over `total` numbered records.
///
/// Issues a fresh token (`tok-1`, `tok-2`, ...) on every successful call and
/// records every call it receives.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    total: usize,
    state: Mutex<ScriptState>,
    /// 1-based continuation call that fails with a transport error.
    pub fail_continue_on: Option<usize>,
    pub fail_start: bool,
    pub fail_release: bool,
    /// Whether an empty initial result still carries a token.
    pub token_for_empty_start: bool,
}

#[derive(Debug, Default)]
struct ScriptState {
    offset: usize,
    batch_size: usize,
    issued: usize,
    continuations: usize,
    calls: Vec<Call>,
}

impl ScriptedBackend {
    pub fn with_records(total: usize) -> Self {
        Self {
            total,
            token_for_empty_start: true,
            ..Default::default()
        }
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn failing_continue_on(mut self, call: usize) -> Self {
        self.fail_continue_on = Some(call);
        self
    }

    pub fn failing_release(mut self) -> Self {
        self.fail_release = true;
        self
    }

    pub fn without_empty_start_token(mut self) -> Self {
        self.token_for_empty_start = false;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn releases(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Release { token } => Some(token),
                _ => None,
            })
            .collect()
    }

    pub fn continuation_tokens(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Continue { token, .. } => Some(token),
                _ => None,
            })
            .collect()
    }

    fn next_page(state: &mut ScriptState, total: usize) -> (CursorToken, Batch) {
        let end = (state.offset + state.batch_size).min(total);
        let records = (state.offset..end).map(|n| json!({ "_id": n })).collect();
        state.offset = end;
        state.issued += 1;
        (
            CursorToken::new(format!("tok-{}", state.issued)),
            Batch::new(records),
        )
    }
}

#[async_trait]
impl SearchBackend for ScriptedBackend {
    async fn start_scroll(
        &self,
        request: &SearchRequest,
    ) -> Result<ScrollPage, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Start {
            collection: request.collection.clone(),
            batch_size: request.batch_size,
        });
        if self.fail_start {
            return Err(BackendError::unavailable(ScrollOp::Start, "connection refused"));
        }

        state.batch_size = request.batch_size;
        let (token, batch) = Self::next_page(&mut state, self.total);
        let token = if batch.is_empty() && !self.token_for_empty_start {
            None
        } else {
            Some(token)
        };
        Ok(ScrollPage::new(token, batch).with_total_hits(self.total as u64))
    }

    async fn continue_scroll(
        &self,
        token: &CursorToken,
        keep_alive: Duration,
    ) -> Result<ScrollPage, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Continue {
            token: token.as_str().to_string(),
            keep_alive,
        });
        state.continuations += 1;
        if self.fail_continue_on == Some(state.continuations) {
            return Err(BackendError::unavailable(
                ScrollOp::Continue,
                "request timed out",
            ));
        }

        let (token, batch) = Self::next_page(&mut state, self.total);
        Ok(ScrollPage::new(Some(token), batch))
    }

    async fn release_scroll(&self, token: &CursorToken) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Release {
            token: token.as_str().to_string(),
        });
        if self.fail_release {
            return Err(BackendError::unavailable(ScrollOp::Release, "connection reset"));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
