//! Per-client rate limiting and baseline security headers.
//!
//! The limiter is a token bucket per client IP: each client starts with
//! `max_requests` tokens and regains them linearly over the window.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderName, HeaderValue, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::sync::Mutex;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::warn;

use crate::server::error::ApiError;

/// Message returned with every 429.
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests, please try again later.";

/// Buckets kept before idle ones are pruned.
const MAX_TRACKED_CLIENTS: usize = 10_000;

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn full(capacity: f64, now: Instant) -> Self {
        Self { tokens: capacity, last_refill: now }
    }

    fn refill(&mut self, capacity: f64, per_second: f64, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = elapsed.mul_add(per_second, self.tokens).min(capacity);
        self.last_refill = now;
    }

    fn try_consume(&mut self) -> bool {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Token-bucket rate limiter keyed by client address.
///
/// Requests whose peer address is unknown share one bucket.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: Mutex<HashMap<Option<IpAddr>, TokenBucket>>,
    capacity: f64,
    per_second: f64,
    window: Duration,
}

impl RateLimiter {
    /// Allows `max_requests` per `window` for each client.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let capacity = f64::from(max_requests);
        let per_second = capacity / window.as_secs_f64().max(f64::EPSILON);
        Self { buckets: Mutex::new(HashMap::new()), capacity, per_second, window }
    }

    /// Takes one token for `client`; `false` means the request must be refused.
    pub async fn check(&self, client: Option<IpAddr>) -> bool {
        self.check_at(client, Instant::now()).await
    }

    async fn check_at(&self, client: Option<IpAddr>, now: Instant) -> bool {
        let mut buckets = self.buckets.lock().await;

        if buckets.len() >= MAX_TRACKED_CLIENTS {
            // A bucket idle for a whole window is full again, same as a fresh one
            let window = self.window;
            buckets.retain(|_, b| now.saturating_duration_since(b.last_refill) < window);
        }

        let bucket = buckets.entry(client).or_insert_with(|| TokenBucket::full(self.capacity, now));
        bucket.refill(self.capacity, self.per_second, now);
        bucket.try_consume()
    }
}

/// Middleware refusing requests over the client's budget with a 429.
pub async fn enforce_rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = request.extensions().get::<ConnectInfo<SocketAddr>>().map(|ConnectInfo(addr)| addr.ip());

    if limiter.check(client).await {
        next.run(request).await
    } else {
        warn!(client = ?client, path = %request.uri().path(), "Rate limit exceeded");
        ApiError::RateLimited(RATE_LIMIT_MESSAGE.to_string()).into_response()
    }
}

fn security_headers() -> [(HeaderName, HeaderValue); 6] {
    [
        (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        (header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN")),
        (header::REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
        (header::X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("off")),
        (
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=15552000; includeSubDomains"),
        ),
        (
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'none'; frame-ancestors 'self'"),
        ),
    ]
}

/// Adds the security headers to every response that doesn't set them itself.
pub fn with_security_headers<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    security_headers()
        .into_iter()
        .fold(router, |router, (name, value)| router.layer(SetResponseHeaderLayer::if_not_present(name, value)))
}
