use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};

use busbuddy_store::app_config::RateLimitConfig;

use crate::error::ApiError;
use crate::state::AppState;

struct WindowTable {
    last_sweep: Instant,
    entries: HashMap<String, (Instant, u32)>,
}

/// Fixed-window per-client counters. The window resets as a whole rather
/// than sliding, so a client gets at most `max_requests` per window.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<WindowTable>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_seconds),
            windows: Mutex::new(WindowTable {
                last_sweep: Instant::now(),
                entries: HashMap::new(),
            }),
        }
    }

    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            // Fail open: a poisoned counter table must not take the API down.
            Err(_) => return true,
        };

        // Sweep at most once per window length; clients that never come
        // back must not stay resident in the table.
        if now.duration_since(windows.last_sweep) >= self.window {
            let window = self.window;
            windows
                .entries
                .retain(|_, (start, _)| now.duration_since(*start) < window);
            windows.last_sweep = now;
        }

        let entry = windows.entries.entry(key.to_string()).or_insert((now, 0));
        if now.duration_since(entry.0) >= self.window {
            *entry = (now, 0);
        }
        entry.1 += 1;
        entry.1 <= self.max_requests
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.windows.lock().map(|w| w.entries.len()).unwrap_or(0)
    }
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.rate_limiter.check(&addr.ip().to_string()) {
        Ok(next.run(req).await)
    } else {
        Err(ApiError::RateLimited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, window_seconds: u64) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            max_requests,
            window_seconds,
        })
    }

    #[test]
    fn blocks_after_limit() {
        let l = limiter(2, 60);
        assert!(l.check("10.0.0.1"));
        assert!(l.check("10.0.0.1"));
        assert!(!l.check("10.0.0.1"));
    }

    #[test]
    fn clients_are_counted_separately() {
        let l = limiter(1, 60);
        assert!(l.check("10.0.0.1"));
        assert!(!l.check("10.0.0.1"));
        assert!(l.check("10.0.0.2"));
    }

    #[test]
    fn window_rollover_resets_the_count() {
        let l = limiter(1, 1);
        let start = Instant::now();
        assert!(l.check_at("10.0.0.1", start));
        assert!(!l.check_at("10.0.0.1", start));
        assert!(l.check_at("10.0.0.1", start + Duration::from_secs(2)));
    }

    #[test]
    fn stale_clients_are_swept() {
        let l = limiter(1, 1);
        let start = Instant::now();
        for i in 0..1000 {
            assert!(l.check_at(&format!("10.0.{}.{}", i / 256, i % 256), start));
        }
        assert_eq!(l.tracked_clients(), 1000);

        assert!(l.check_at("192.168.0.1", start + Duration::from_secs(3600)));
        assert_eq!(l.tracked_clients(), 1);
    }
}
