//! Session manager (C5): owns `initialized`/`last_session_check`/`last_session_refresh`,
//! detects expiry by HEAD-probing `store.steampowered.com/account`, and serializes refreshes
//! through the bot facade.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::RwLock;
use reqwest::{Method, Url};
use tracing::{debug, warn};

use crate::bot::SteamClient;
use crate::client::MobileClient;
use crate::errors::InternalError;
use crate::user::SteamId;
use crate::{Inner, STEAM_STORE_BASE};

/// Per-handler session bookkeeping. See spec §3 "Session state" and the invariant in §8.1:
/// `last_session_check >= last_session_refresh` at all times.
#[derive(Debug)]
pub(crate) struct SessionState {
    initialized: AtomicBool,
    last_check: RwLock<Option<Instant>>,
    last_refresh: RwLock<Option<Instant>>,
    mutex: tokio::sync::Mutex<()>,
}

impl SessionState {
    pub(crate) fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            last_check: RwLock::new(None),
            last_refresh: RwLock::new(None),
            mutex: tokio::sync::Mutex::new(()),
        }
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_uninitialized(&self) {
        self.initialized.store(false, Ordering::SeqCst);
    }

    /// Called once, by the handshake, on success: spec §4.7 step 12.
    pub(crate) fn mark_initialized(&self) {
        let now = Instant::now();
        *self.last_check.write() = Some(now);
        *self.last_refresh.write() = Some(now);
        self.initialized.store(true, Ordering::SeqCst);
    }

    /// `last_session_check == last_session_refresh`: the dedup helper design notes §9 asks
    /// re-implementations to extract, so `is_session_expired` and `refresh_session` can consume
    /// it with explicit (and opposite) polarity instead of duplicating the comparison.
    fn last_seen_healthy(&self) -> bool {
        *self.last_check.read() == *self.last_refresh.read()
    }

    /// Blocks until any in-flight check/refresh completes, without performing one itself. Used
    /// by the executor's non-preemptive sessioning mode (spec §4.6 step 2, "otherwise").
    pub(crate) async fn block_until_quiescent(&self) {
        let _guard = self.mutex.lock().await;
    }
}

pub(crate) fn is_session_expired_uri(uri: &Url) -> bool {
    uri.path().starts_with("/login") || uri.host_str() == Some("lostauth")
}

/// True iff `uri` is the authenticated user's own profile — a known Steam quirk where
/// unrelated requests sometimes terminate there (spec §4.5 URI classifier).
pub(crate) fn is_self_profile_uri(uri: &Url, steam_id: SteamId, vanity_url: Option<&str>) -> bool {
    let path = uri.path();
    path == format!("/profiles/{steam_id}") || vanity_url.is_some_and(|v| path == format!("/id/{v}"))
}

/// Expiry probe (spec §4.5 `is_session_expired`). Returns `Ok(None)` iff the HEAD request
/// itself failed at the transport level; otherwise `Ok(Some(expired))`.
pub(crate) async fn is_session_expired<B: SteamClient>(inner: &Inner<B>) -> Result<Option<bool>, InternalError> {
    let triggered_at = Instant::now();
    let _guard = inner.session.mutex.lock().await;

    let already_checked = inner
        .session
        .last_check
        .read()
        .is_some_and(|last| last >= triggered_at);
    if already_checked {
        return Ok(Some(!inner.session.last_seen_healthy()));
    }

    let response = match inner
        .client
        .send::<(), _>(format!("{STEAM_STORE_BASE}/account"), Method::HEAD, None)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "session probe failed at the transport level");
            return Ok(None);
        }
    };

    let expired = MobileClient::location_of(&response)
        .map(|uri| is_session_expired_uri(&uri))
        .unwrap_or(false);

    debug!(expired, "session probe result");
    let now = Instant::now();
    *inner.session.last_check.write() = Some(now);
    if expired {
        inner.session.initialized.store(false, Ordering::SeqCst);
    } else {
        *inner.session.last_refresh.write() = Some(now);
    }

    Ok(Some(expired))
}

/// Refresh (spec §4.5 `refresh_session`). The returned bool's polarity is *inverted* relative
/// to [`is_session_expired`]'s dedup branch on purpose, per design notes §9: `true` means "the
/// session was seen healthy as of last check", consumed by the caller with the understanding
/// that it may be reporting a stale-but-still-deduplicated fact rather than a fresh refresh.
pub(crate) async fn refresh_session<B: SteamClient>(inner: &Inner<B>) -> bool {
    let triggered_at = Instant::now();
    let _guard = inner.session.mutex.lock().await;

    let already_checked = inner
        .session
        .last_check
        .read()
        .is_some_and(|last| last >= triggered_at);
    if already_checked {
        return inner.session.last_seen_healthy();
    }

    inner.session.initialized.store(false, Ordering::SeqCst);
    let result = inner.bot.refresh_session().await;
    let now = Instant::now();
    *inner.session.last_check.write() = Some(now);

    match result {
        Ok(()) => {
            *inner.session.last_refresh.write() = Some(now);
            true
        }
        Err(e) => {
            warn!(error = %e, "bot facade failed to refresh the session");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_starts_unchecked_but_vacuously_healthy() {
        let state = SessionState::new();
        assert!(state.last_seen_healthy()); // None == None
        assert!(!state.is_initialized());
    }

    #[test]
    fn mark_initialized_sets_check_equal_to_refresh() {
        let state = SessionState::new();
        state.mark_initialized();
        assert!(state.is_initialized());
        assert!(state.last_seen_healthy());
    }

    #[test]
    fn self_profile_uri_matches_numeric_and_vanity_paths() {
        let steam_id = SteamId::new(76_561_198_092_541_763);
        let numeric = Url::parse("https://steamcommunity.com/profiles/76561198092541763").unwrap();
        assert!(is_self_profile_uri(&numeric, steam_id, None));

        let vanity = Url::parse("https://steamcommunity.com/id/somebody").unwrap();
        assert!(is_self_profile_uri(&vanity, steam_id, Some("somebody")));
        assert!(!is_self_profile_uri(&vanity, steam_id, Some("someone_else")));
    }

    #[test]
    fn session_expired_uri_matches_login_path_or_lostauth_host() {
        let login = Url::parse("https://steamcommunity.com/login/home/?goto=0").unwrap();
        assert!(is_session_expired_uri(&login));

        let lostauth = Url::parse("https://lostauth/").unwrap();
        assert!(is_session_expired_uri(&lostauth));

        let normal = Url::parse("https://steamcommunity.com/id/somebody").unwrap();
        assert!(!is_session_expired_uri(&normal));
    }
}
