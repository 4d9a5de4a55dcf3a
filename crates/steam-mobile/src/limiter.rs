use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Semaphore;
use tracing::trace;

/// One service's rate-limiting pair (C4).
///
/// `conn` caps how many requests to this service may be in flight at once; it is held for the
/// whole duration of the wrapped operation. `rate` has capacity 1 and enforces a minimum
/// start-to-start interval: it's acquired synchronously and released by a detached timer after
/// `delay` has elapsed, so a slow operation doesn't itself stretch the gap before the next one
/// may *start*.
struct ServiceLimiter {
    conn: Arc<Semaphore>,
    rate: Arc<Semaphore>,
}

/// Per-host dual-semaphore gate shared by every handler in the process.
///
/// Built once (see [`crate::context::SteamContext::new`]) and handed out as `Arc` so that
/// operations against the same Steam host, issued from different [`crate::SteamAuthenticator`]
/// instances, still serialize against each other — this is what keeps us from hammering
/// `steamcommunity.com` just because the caller spun up multiple handlers.
pub struct RateLimiter {
    services: RwLock<HashMap<&'static str, ServiceLimiter>>,
    default: Option<ServiceLimiter>,
    delay: Duration,
}

impl RateLimiter {
    /// `max_connections` bounds in-flight requests per service. `delay` is `WebLimiterDelay`;
    /// passing `Duration::ZERO` disables the limiter entirely (every call bypasses it).
    pub fn new(services: &[&'static str], max_connections: usize, delay: Duration) -> Self {
        let mut map = HashMap::with_capacity(services.len());
        for &name in services {
            map.insert(name, Self::build_pair(max_connections));
        }
        Self {
            services: RwLock::new(map),
            default: (!services.is_empty()).then(|| Self::build_pair(max_connections)),
            delay,
        }
    }

    fn build_pair(max_connections: usize) -> ServiceLimiter {
        ServiceLimiter {
            conn: Arc::new(Semaphore::new(max_connections.max(1))),
            rate: Arc::new(Semaphore::new(1)),
        }
    }

    /// Runs `op` under the named service's gate: acquire `conn` (held for `op`'s whole
    /// duration), then `rate` (released by a background timer after `delay`). Falls back to the
    /// default bucket for an unregistered service name, and bypasses entirely if the delay is
    /// zero or there is no bucket at all to use.
    pub async fn limit<F, Fut, T>(&self, service: &str, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        if self.delay.is_zero() {
            return op().await;
        }

        let pair = {
            let services = self.services.read();
            match services.get(service) {
                Some(pair) => Some((pair.conn.clone(), pair.rate.clone())),
                None => self.default.as_ref().map(|p| (p.conn.clone(), p.rate.clone())),
            }
        };

        let Some((conn, rate)) = pair else {
            return op().await;
        };

        let _conn_permit = conn.acquire_owned().await.expect("semaphore is never closed");
        let rate_permit = rate.acquire_owned().await.expect("semaphore is never closed");

        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            drop(rate_permit);
            trace!("rate limiter slot released");
        });

        op().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn bypasses_entirely_when_delay_is_zero() {
        let limiter = RateLimiter::new(&["community"], 5, Duration::ZERO);
        let ran = AtomicUsize::new(0);
        limiter
            .limit("community", || async {
                ran.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn falls_back_to_default_bucket_for_unknown_service() {
        let limiter = RateLimiter::new(&["community"], 5, Duration::from_millis(1));
        let ran = AtomicUsize::new(0);
        limiter
            .limit("some-other-host", || async {
                ran.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
