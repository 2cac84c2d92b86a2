use std::fmt;

use crate::rate_limit::RateLimit;

/// Ceilings applied per client address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimits {
    /// Applied to every deployment route
    pub global: Vec<RateLimit>,
    /// Applied on top of `global` to deletions
    pub delete: Vec<RateLimit>,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            global: vec![RateLimit::per_day(250), RateLimit::per_hour(15)],
            delete: vec![RateLimit::per_hour(1)],
        }
    }
}

#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Shared secret expected in `Authorization: Bearer <secret>`
    pub secret: Option<String>,
    pub rate_limits: RateLimits,
}

impl ServerConfig {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret,
            rate_limits: RateLimits::default(),
        }
    }

    pub fn with_rate_limits(mut self, rate_limits: RateLimits) -> Self {
        self.rate_limits = rate_limits;
        self
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("rate_limits", &self.rate_limits)
            .finish()
    }
}
