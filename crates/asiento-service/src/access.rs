use std::collections::HashSet;

use axum::http::{header, HeaderMap};

/// Decides whether a request may reach the API.
pub trait AccessGuard: Send + Sync {
    fn is_authorized(&self, token: Option<&str>) -> bool;
}

/// Fixed set of bearer tokens. With no tokens configured every request is
/// let through, which is meant for local development.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenGuard {
    tokens: HashSet<String>,
}

impl StaticTokenGuard {
    pub fn new(tokens: impl IntoIterator<Item = String>) -> Self {
        Self {
            tokens: tokens
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl AccessGuard for StaticTokenGuard {
    fn is_authorized(&self, token: Option<&str>) -> bool {
        if self.is_open() {
            return true;
        }
        token.is_some_and(|t| self.tokens.contains(t))
    }
}

/// Token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn empty_guard_is_open() {
        let guard = StaticTokenGuard::new(Vec::new());
        assert!(guard.is_authorized(None));
        assert!(guard.is_authorized(Some("anything")));
    }

    #[test]
    fn configured_guard_checks_token() {
        let guard = StaticTokenGuard::new(vec!["s3cret".to_string(), " ".to_string()]);
        assert!(!guard.is_open());
        assert!(guard.is_authorized(Some("s3cret")));
        assert!(!guard.is_authorized(Some("wrong")));
        assert!(!guard.is_authorized(None));
    }

    #[test]
    fn bearer_prefix_is_required() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"));
        assert_eq!(bearer_token(&headers), Some("s3cret"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic s3cret"));
        assert_eq!(bearer_token(&headers), None);
    }
}
