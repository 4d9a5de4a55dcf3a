use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use serde::Deserialize;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use crate::error::TotpError;

const QUERY_TIME_URL: &str = "https://api.steampowered.com/ITwoFactorService/QueryTime/v1";
const TIME_TTL: Duration = Duration::from_secs(86_400);

#[derive(Debug, Deserialize)]
struct QueryTimeResponse {
    response: QueryTimeInner,
}

#[derive(Debug, Deserialize)]
struct QueryTimeInner {
    #[serde(default)]
    server_time: Option<String>,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_secs()
}

/// Process-wide corrected Steam clock (C1, the Time Oracle).
///
/// `Δ = server_time - local_unix_time` is refreshed at most once per [`TIME_TTL`] (24h),
/// behind a double-checked lock so concurrent callers never issue more than one `QueryTime`
/// call per refresh. Construct one instance and share it (`Arc<TimeSync>`) across every
/// handler that needs Steam time; do not construct a new one per handler.
#[derive(Debug)]
pub struct TimeSync {
    delta: RwLock<Option<i64>>,
    last_check: RwLock<Option<Instant>>,
    refresh_gate: AsyncMutex<()>,
    http: reqwest::Client,
}

impl Default for TimeSync {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSync {
    pub fn new() -> Self {
        Self {
            delta: RwLock::new(None),
            last_check: RwLock::new(None),
            refresh_gate: AsyncMutex::new(()),
            http: reqwest::Client::new(),
        }
    }

    fn is_fresh(&self) -> bool {
        match *self.last_check.read() {
            Some(at) => at.elapsed() < TIME_TTL,
            None => false,
        }
    }

    /// Returns the corrected Steam time, in seconds. Refreshes `Δ` from `QueryTime` if the TTL
    /// has elapsed; falls back to raw local time (without updating `Δ`) if the RPC fails.
    pub async fn steam_time(&self) -> u32 {
        if self.is_fresh() {
            if let Some(delta) = *self.delta.read() {
                return Self::apply_delta(delta);
            }
        }

        let _permit = self.refresh_gate.lock().await;
        // Double-check: another caller may have refreshed while we waited for the gate.
        if self.is_fresh() {
            if let Some(delta) = *self.delta.read() {
                return Self::apply_delta(delta);
            }
        }

        match self.query_server_time().await {
            Ok(server_time) => {
                let delta = server_time as i64 - unix_now() as i64;
                *self.delta.write() = Some(delta);
                *self.last_check.write() = Some(Instant::now());
                debug!(delta, "refreshed Steam time delta");
                Self::apply_delta(delta)
            }
            Err(err) => {
                warn!("QueryTime failed, falling back to local clock: {err}");
                unix_now() as u32
            }
        }
    }

    fn apply_delta(delta: i64) -> u32 {
        (unix_now() as i64 + delta).max(0) as u32
    }

    async fn query_server_time(&self) -> Result<u64, TotpError> {
        let response = self
            .http
            .post(QUERY_TIME_URL)
            .body("steamid=0")
            .send()
            .await?
            .text()
            .await?;
        let parsed: QueryTimeResponse = serde_json::from_str(&response)?;
        parsed
            .response
            .server_time
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|&t| t != 0)
            .ok_or(TotpError::BadServerTime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freshness_starts_false() {
        let sync = TimeSync::new();
        assert!(!sync.is_fresh());
    }

    #[tokio::test]
    #[ignore = "hits the real Steam API"]
    async fn falls_back_to_local_time_when_query_fails() {
        // Whether or not QueryTime is reachable from the test environment, steam_time() must
        // return a sane non-zero value rather than propagating the error.
        let sync = TimeSync::new();
        let t = sync.steam_time().await;
        assert!(t > 0);
    }
}
