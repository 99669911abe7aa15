use std::fmt;

const FINGERPRINT_CHARS: usize = 12;

/// Opaque cursor identifier issued by the backend.
///
/// Backends may rotate the token on every call, so the cursor only ever keeps
/// the most recent one. Debug output is shortened to a fingerprint because the
/// full value is a bearer credential for the retained search context.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CursorToken(String);

impl CursorToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix safe to put in logs.
    pub fn fingerprint(&self) -> String {
        let mut chars = self.0.chars();
        let prefix: String = chars.by_ref().take(FINGERPRINT_CHARS).collect();
        if chars.next().is_some() {
            format!("{prefix}…")
        } else {
            prefix
        }
    }
}

impl fmt::Debug for CursorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CursorToken")
            .field(&self.fingerprint())
            .finish()
    }
}

impl From<String> for CursorToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CursorToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_truncates_long_tokens() {
        let token = CursorToken::new("DXF1ZXJ5QW5kRmV0Y2gBAAAAAAAAAD4WYm9laVYtZndUQlNsdDcwakFMNjU1QQ==");
        assert_eq!(token.fingerprint(), "DXF1ZXJ5QW5k…");
        assert!(!format!("{token:?}").contains(token.as_str()));
    }

    #[test]
    fn fingerprint_keeps_short_tokens() {
        assert_eq!(CursorToken::new("scroll-1").fingerprint(), "scroll-1");
    }
}
