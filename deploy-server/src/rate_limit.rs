//! Per-client sliding-window rate limiting.
//!
//! A [`RateLimiter`] keeps one request history per client for every route it
//! guards and admits a request only if every applicable ceiling admits it.
//! Only admitted requests are recorded, so a client that keeps hammering a
//! closed window neither extends it nor spends budget on other routes.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::ServerError;

const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Prune stale clients every this many checks.
const CLEANUP_INTERVAL: u64 = 100;

/// At most `max_requests` within any `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimit {
    pub const fn per_hour(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: HOUR,
        }
    }

    pub const fn per_day(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: DAY,
        }
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.window == HOUR {
            write!(f, "{} per hour", self.max_requests)
        } else if self.window == DAY {
            write!(f, "{} per day", self.max_requests)
        } else {
            write!(f, "{} per {}s", self.max_requests, self.window.as_secs())
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Hit {
    at: Instant,
    route: &'static str,
}

/// Per-client request history shared by every route it guards.
///
/// Global ceilings count hits on all routes; route ceilings count only hits
/// on their own route. All applicable ceilings are checked under one lock.
pub struct RateLimiter {
    global: Vec<RateLimit>,
    routes: HashMap<&'static str, Vec<RateLimit>>,
    horizon: Duration,
    state: Mutex<HashMap<IpAddr, VecDeque<Hit>>>,
    request_count: AtomicU64,
}

impl RateLimiter {
    pub fn new(global: Vec<RateLimit>) -> Self {
        let horizon = longest_window(&global);
        Self {
            global,
            routes: HashMap::new(),
            horizon,
            state: Mutex::new(HashMap::new()),
            request_count: AtomicU64::new(0),
        }
    }

    /// Extra ceilings applied only to requests on `route`.
    pub fn with_route_limits(mut self, route: &'static str, limits: Vec<RateLimit>) -> Self {
        self.horizon = self.horizon.max(longest_window(&limits));
        self.routes.insert(route, limits);
        self
    }

    /// Record a request from `ip` on `route`, or return how long until it
    /// would be admitted.
    pub fn check(&self, ip: IpAddr, route: &'static str) -> Result<(), Duration> {
        let now = Instant::now();

        let count = self.request_count.fetch_add(1, Ordering::Relaxed);
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if count > 0 && count % CLEANUP_INTERVAL == 0 {
            let horizon = self.horizon;
            state.retain(|_, hits| {
                hits.back()
                    .is_some_and(|hit| now.duration_since(hit.at) < horizon)
            });
            debug!(tracked = state.len(), "Pruned rate limiter state");
        }

        let hits = state.entry(ip).or_default();
        while hits
            .front()
            .is_some_and(|hit| now.duration_since(hit.at) >= self.horizon)
        {
            hits.pop_front();
        }

        let route_limits = self.routes.get(route).map(Vec::as_slice).unwrap_or(&[]);
        let ceilings = self
            .global
            .iter()
            .map(|limit| (limit, None))
            .chain(route_limits.iter().map(|limit| (limit, Some(route))));

        for (limit, scope) in ceilings {
            let mut in_window = hits.iter().filter(|hit| {
                now.duration_since(hit.at) < limit.window
                    && scope.map_or(true, |route| hit.route == route)
            });
            let oldest = in_window.next().map(|hit| hit.at);
            let recent = oldest.map_or(0, |_| 1 + in_window.count());

            if recent >= limit.max_requests as usize {
                let retry_after = oldest
                    .map(|t| limit.window.saturating_sub(now.duration_since(t)))
                    .unwrap_or(limit.window);
                warn!(
                    route,
                    client = %ip,
                    limit = %limit,
                    "Rate limit exceeded"
                );
                return Err(retry_after);
            }
        }

        hits.push_back(Hit { at: now, route });
        Ok(())
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

fn longest_window(limits: &[RateLimit]) -> Duration {
    limits
        .iter()
        .map(|l| l.window)
        .max()
        .unwrap_or(Duration::ZERO)
}

/// A [`RateLimiter`] bound to the route it guards.
#[derive(Clone)]
pub struct RouteLimiter {
    pub limiter: Arc<RateLimiter>,
    pub route: &'static str,
}

/// Middleware rejecting requests once the caller's address exceeds a ceiling.
pub async fn enforce(
    State(guard): State<RouteLimiter>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    guard
        .limiter
        .check(addr.ip(), guard.route)
        .map_err(|retry_after| ServerError::RateLimited { retry_after })?;
    Ok(next.run(request).await)
}
