use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::debug;

use crate::core::constants::{DOMAIN_RATE_LIMIT_JITTER_RANGE, DOMAIN_RATE_LIMIT_MIN_SECS};

/// Per-domain last-visit timestamp, generalizing the teacher's single-target
/// `AntiBot`/`RequestDelay` pair (`features/antibot.rs`) to a process-wide
/// map keyed by domain (§4.D, §9 Design Note "Rate-limit map").
#[derive(Debug)]
struct DomainState {
    last_request_at: Instant,
}

/// Enforces `>= 2.0s + uniform jitter in [0.1, 1.0]s` between two requests to
/// the same domain. The critical section covers read-compute-delay-write as
/// a single lock hold so two concurrent tasks can't race past the delay.
pub struct DomainRateLimiter {
    domains: Mutex<HashMap<String, DomainState>>,
}

impl DomainRateLimiter {
    pub fn new() -> Self {
        DomainRateLimiter {
            domains: Mutex::new(HashMap::new()),
        }
    }

    fn jittered_delay() -> Duration {
        let mut rng = rand::rng();
        let jitter_secs = rng.random_range(DOMAIN_RATE_LIMIT_JITTER_RANGE.0..=DOMAIN_RATE_LIMIT_JITTER_RANGE.1);
        Duration::from_secs_f64(DOMAIN_RATE_LIMIT_MIN_SECS + jitter_secs)
    }

    /// Waits, if necessary, until it is polite to issue the next request to
    /// `domain`. Reserves the slot under the same lock acquisition that reads
    /// the prior visit, before releasing the lock to sleep, so two
    /// concurrent callers for the same domain can't both read the same
    /// stale `last_request_at` and under-delay relative to each other.
    pub async fn wait_for_domain(&self, domain: &str) {
        let required_delay = Self::jittered_delay();

        let sleep_for = {
            let mut domains = self.domains.lock().unwrap();
            let now = Instant::now();
            let wait = match domains.get(domain) {
                Some(state) => {
                    let elapsed = now.duration_since(state.last_request_at);
                    if elapsed < required_delay {
                        required_delay - elapsed
                    } else {
                        Duration::ZERO
                    }
                }
                None => Duration::ZERO,
            };
            domains.insert(domain.to_string(), DomainState { last_request_at: now + wait });
            wait
        };

        if !sleep_for.is_zero() {
            debug!("rate limiting {domain}: waiting {:?}", sleep_for);
            tokio::time::sleep(sleep_for).await;
        }
    }
}

impl Default for DomainRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_request_to_same_domain_waits_for_minimum_delay() {
        let limiter = DomainRateLimiter::new();
        limiter.wait_for_domain("example.com").await;

        let start = Instant::now();
        limiter.wait_for_domain("example.com").await;
        let elapsed = start.elapsed();

        assert!(elapsed.as_secs_f64() >= DOMAIN_RATE_LIMIT_MIN_SECS - 0.05);
    }

    #[tokio::test]
    async fn different_domains_do_not_block_each_other() {
        let limiter = DomainRateLimiter::new();
        limiter.wait_for_domain("a.example.com").await;

        let start = Instant::now();
        limiter.wait_for_domain("b.example.com").await;
        let elapsed = start.elapsed();

        assert!(elapsed.as_secs_f64() < DOMAIN_RATE_LIMIT_MIN_SECS);
    }
}
