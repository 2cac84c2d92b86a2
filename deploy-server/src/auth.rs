use axum::http::{header, HeaderMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;
use tracing::error;

use crate::error::ServerError;

/// Delay imposed on every failed authentication to slow down guessing.
pub const AUTH_FAILURE_DELAY: Duration = Duration::from_secs(3);

/// Checks the `Authorization: Bearer <secret>` header against the shared
/// secret loaded at startup.
#[derive(Clone)]
pub struct AuthGuard {
    expected: Option<Arc<str>>,
}

impl AuthGuard {
    /// An unset or empty secret rejects every request.
    pub fn new(secret: Option<&str>) -> Self {
        Self {
            expected: secret
                .filter(|s| !s.is_empty())
                .map(|s| Arc::from(format!("Bearer {}", s))),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.expected.is_some()
    }

    /// Exact comparison of the presented header value.
    pub fn authenticate(&self, presented: Option<&str>) -> bool {
        match (&self.expected, presented) {
            (Some(expected), Some(presented)) => {
                bool::from(expected.as_bytes().ct_eq(presented.as_bytes()))
            }
            _ => false,
        }
    }

    /// Authenticate a request, sleeping [`AUTH_FAILURE_DELAY`] before
    /// reporting a failure.
    pub async fn authorize(&self, headers: &HeaderMap) -> Result<(), ServerError> {
        let presented = headers
            .get(header::AUTHORIZATION)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

        if self.authenticate(presented.as_deref()) {
            return Ok(());
        }

        error!(
            authorization = ?presented,
            "Unauthorized request with invalid pre-shared key"
        );
        tokio::time::sleep(AUTH_FAILURE_DELAY).await;
        Err(ServerError::Unauthorized)
    }
}

impl fmt::Debug for AuthGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGuard")
            .field("configured", &self.is_configured())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use tokio::time::Instant;

    #[test]
    fn test_exact_match_only() {
        let guard = AuthGuard::new(Some("s3cret"));

        assert!(guard.authenticate(Some("Bearer s3cret")));
        assert!(!guard.authenticate(Some("Bearer s3cret ")));
        assert!(!guard.authenticate(Some("bearer s3cret")));
        assert!(!guard.authenticate(Some("s3cret")));
        assert!(!guard.authenticate(Some("Bearer s3cre")));
        assert!(!guard.authenticate(None));
    }

    #[test]
    fn test_missing_secret_rejects_everything() {
        for guard in [AuthGuard::new(None), AuthGuard::new(Some(""))] {
            assert!(!guard.is_configured());
            assert!(!guard.authenticate(Some("Bearer ")));
            assert!(!guard.authenticate(Some("Bearer None")));
        }
    }

    #[test]
    fn test_debug_hides_secret() {
        let rendered = format!("{:?}", AuthGuard::new(Some("s3cret")));
        assert!(!rendered.contains("s3cret"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_delayed() {
        let guard = AuthGuard::new(Some("s3cret"));
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer guess"));

        let start = Instant::now();
        let result = guard.authorize(&headers).await;

        assert!(matches!(result, Err(ServerError::Unauthorized)));
        assert!(start.elapsed() >= AUTH_FAILURE_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_is_not_delayed() {
        let guard = AuthGuard::new(Some("s3cret"));
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"));

        let start = Instant::now();
        guard.authorize(&headers).await.unwrap();

        assert!(start.elapsed() < AUTH_FAILURE_DELAY);
    }
}
