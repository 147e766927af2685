use crate::models::errors::AppError;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Throttling policy for credential endpoints
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Attempts allowed per client inside one window
    pub max_attempts: usize,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            window: Duration::from_secs(60),
        }
    }
}

/// Sliding-window attempt counter keyed by client address.
///
/// Guards `register` and `login` against credential stuffing. State is
/// process-local and lost on restart.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    attempts: Arc<RwLock<HashMap<String, VecDeque<Instant>>>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            attempts: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// A limiter that never rejects, used when `max_attempts` is 0.
    pub fn disabled() -> Self {
        Self::new(RateLimitConfig {
            max_attempts: 0,
            window: Duration::ZERO,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.max_attempts > 0
    }

    /// Records an attempt for `client`, or rejects it with the seconds until
    /// the oldest attempt leaves the window.
    pub async fn check(&self, client: &str) -> Result<(), AppError> {
        if !self.is_enabled() {
            return Ok(());
        }

        let now = Instant::now();
        let mut attempts = self.attempts.write().await;
        let window = attempts.entry(client.to_string()).or_default();
        prune(window, now, self.config.window);

        if window.len() >= self.config.max_attempts {
            let retry_after = window
                .front()
                .map(|oldest| self.config.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(self.config.window);
            tracing::warn!(client = %client, "Authentication rate limit exceeded");
            return Err(AppError::rate_limited(
                "Too many authentication attempts, please try again later",
                retry_after.as_secs().max(1),
            ));
        }

        window.push_back(now);
        Ok(())
    }

    /// Drops clients with no attempts left in the window; returns how many.
    pub async fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut attempts = self.attempts.write().await;
        let before = attempts.len();

        for window in attempts.values_mut() {
            prune(window, now, self.config.window);
        }
        attempts.retain(|_, window| !window.is_empty());

        let removed = before - attempts.len();
        if removed > 0 {
            tracing::debug!("Cleaned up {} idle rate limit entries", removed);
        }
        removed
    }
}

fn prune(window: &mut VecDeque<Instant>, now: Instant, length: Duration) {
    while let Some(oldest) = window.front() {
        if now.duration_since(*oldest) >= length {
            window.pop_front();
        } else {
            break;
        }
    }
}

/// Key for a caller; requests without connection info share one bucket.
pub fn client_key(addr: Option<SocketAddr>) -> String {
    addr.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "anonymous".to_string())
}
