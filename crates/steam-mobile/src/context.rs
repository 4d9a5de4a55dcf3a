use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::limiter::RateLimiter;
use crate::{STEAM_COMMUNITY_HOST, STEAM_HELP_HOST, STEAM_STORE_HOST, STEAM_WEBAPI_HOST};

/// Tunable constants from spec §6, injected rather than hardcoded so tests can shrink the
/// timeouts and delays instead of actually waiting on them.
#[derive(Debug, Clone)]
pub struct SteamMobileConfig {
    pub max_tries: u32,
    pub connection_timeout: Duration,
    pub web_limiter_delay: Duration,
    pub confirmations_limiter_delay: Duration,
    pub max_connections_per_service: usize,
    pub check_session_preemptively: bool,
}

impl Default for SteamMobileConfig {
    fn default() -> Self {
        Self {
            max_tries: 5,
            connection_timeout: Duration::from_secs(90),
            web_limiter_delay: Duration::from_millis(300),
            confirmations_limiter_delay: Duration::from_secs(10),
            max_connections_per_service: 8,
            check_session_preemptively: true,
        }
    }
}

/// Process-wide mutable state, constructed once and shared (via `Arc`) across every
/// [`crate::SteamAuthenticator`] in the process: the corrected Steam clock, the per-host rate
/// limiters, and the global confirmations gate. Modeling this explicitly — instead of lazy
/// statics — is what spec §9's Design Notes ask for: inject the TTL and limiter parameters, make
/// construction visible.
pub struct SteamContext {
    pub(crate) config: SteamMobileConfig,
    pub(crate) time: Arc<steam_totp::TimeSync>,
    pub(crate) limiter: RateLimiter,
    confirmations_gate: Arc<Semaphore>,
}

impl SteamContext {
    pub fn new(config: SteamMobileConfig) -> Arc<Self> {
        let limiter = RateLimiter::new(
            &[
                STEAM_COMMUNITY_HOST,
                STEAM_STORE_HOST,
                STEAM_HELP_HOST,
                STEAM_WEBAPI_HOST,
            ],
            config.max_connections_per_service,
            config.web_limiter_delay,
        );
        Arc::new(Self {
            confirmations_gate: Arc::new(Semaphore::new(1)),
            limiter,
            time: Arc::new(steam_totp::TimeSync::new()),
            config,
        })
    }

    /// Runs `op` under the global confirmations gate (a binary semaphore released by a 10s
    /// background timer), unless `confirmations_limiter_delay` is zero.
    pub(crate) async fn limit_confirmations<F, Fut, T>(&self, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let delay = self.config.confirmations_limiter_delay;
        if delay.is_zero() {
            return op().await;
        }

        let permit = self
            .confirmations_gate
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore is never closed");

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            drop(permit);
        });

        op().await
    }
}

impl std::fmt::Debug for SteamContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SteamContext").field("config", &self.config).finish()
    }
}
