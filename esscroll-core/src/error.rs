use std::fmt;

use thiserror::Error;

use crate::cursor::ScrollStatus;
use crate::token::CursorToken;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The backend call a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollOp {
    Start,
    Continue,
    Release,
}

impl fmt::Display for ScrollOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScrollOp::Start => "start scroll",
            ScrollOp::Continue => "continue scroll",
            ScrollOp::Release => "release scroll",
        })
    }
}

/// Failures reported by a [`SearchBackend`](crate::SearchBackend).
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport failure (connect, timeout, reset) or a non-success status.
    #[error("{operation} failed{}: {reason}", status_suffix(.status))]
    Unavailable {
        operation: ScrollOp,
        status: Option<u16>,
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The backend answered, but not in the expected shape.
    #[error("{operation} returned a malformed response: {reason}")]
    Protocol { operation: ScrollOp, reason: String },
}

impl BackendError {
    pub fn unavailable(operation: ScrollOp, reason: impl Into<String>) -> Self {
        BackendError::Unavailable {
            operation,
            status: None,
            reason: reason.into(),
            source: None,
        }
    }

    pub fn protocol(operation: ScrollOp, reason: impl Into<String>) -> Self {
        BackendError::Protocol {
            operation,
            reason: reason.into(),
        }
    }

    pub fn operation(&self) -> ScrollOp {
        match self {
            BackendError::Unavailable { operation, .. }
            | BackendError::Protocol { operation, .. } => *operation,
        }
    }
}

/// Primary errors surfaced by the cursor engine.
#[derive(Debug, Error)]
pub enum ScrollError {
    /// The search request was rejected before any network interaction.
    #[error("invalid search request: {0}")]
    InvalidRequest(String),

    /// The backend could not be reached or refused the call.
    #[error("search backend unavailable during {operation}{}: {reason}", status_suffix(.status))]
    BackendUnavailable {
        operation: ScrollOp,
        status: Option<u16>,
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The backend answered with an unexpected or malformed response.
    #[error("protocol error during {operation}: {reason}")]
    ProtocolError { operation: ScrollOp, reason: String },

    /// The caller drove the session against its state machine.
    #[error("cannot {action} a scroll session that is {status}")]
    InvalidState {
        action: &'static str,
        status: ScrollStatus,
    },
}

impl ScrollError {
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        ScrollError::InvalidRequest(reason.into())
    }

    /// True for errors that moved a session into `Failed`.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            ScrollError::BackendUnavailable { .. }
                | ScrollError::ProtocolError { .. }
        )
    }
}

impl From<BackendError> for ScrollError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unavailable {
                operation,
                status,
                reason,
                source,
            } => ScrollError::BackendUnavailable {
                operation,
                status,
                reason,
                source,
            },
            BackendError::Protocol { operation, reason } => {
                ScrollError::ProtocolError { operation, reason }
            }
        }
    }
}

/// A failed best-effort cursor release.
///
/// Never promoted to a primary error; the cursor logs it and keeps the most
/// recent one so callers can observe it after the fact.
#[derive(Debug, Clone, Error)]
#[error("failed to release scroll cursor {token}: {reason}")]
pub struct ReleaseWarning {
    /// Fingerprint of the token that could not be released.
    pub token: String,
    pub reason: String,
}

impl ReleaseWarning {
    pub(crate) fn new(token: &CursorToken, err: &BackendError) -> Self {
        Self {
            token: token.fingerprint(),
            reason: err.to_string(),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|code| format!(" with status {code}"))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, ScrollError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_errors_keep_their_category() {
        let unavailable: ScrollError = BackendError::Unavailable {
            operation: ScrollOp::Continue,
            status: Some(503),
            reason: "service unavailable".into(),
            source: None,
        }
        .into();
        assert!(matches!(
            unavailable,
            ScrollError::BackendUnavailable {
                operation: ScrollOp::Continue,
                status: Some(503),
                ..
            }
        ));
        assert_eq!(
            unavailable.to_string(),
            "search backend unavailable during continue scroll with status 503: service unavailable"
        );

        let protocol: ScrollError =
            BackendError::protocol(ScrollOp::Start, "missing hits").into();
        assert!(matches!(protocol, ScrollError::ProtocolError { .. }));
        assert!(protocol.is_backend_failure());
    }

    #[test]
    fn release_warning_hides_full_token() {
        let token = CursorToken::new("FGluY2x1ZGVfY29udGV4dF91dWlkDXF1ZXJ5QW5kRmV0Y2gB");
        let warning = ReleaseWarning::new(
            &token,
            &BackendError::unavailable(ScrollOp::Release, "connection refused"),
        );
        let text = warning.to_string();
        assert!(text.contains("connection refused"));
        assert!(!text.contains(token.as_str()));
    }
}
