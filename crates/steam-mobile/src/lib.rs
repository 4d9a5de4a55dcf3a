//! Steam mobile authenticator sessions: TOTP login codes, mobile confirmations, and the
//! authenticated web session (cookies, rate limiting, retries, API key lifecycle) that backs
//! them.
//!
//! The entry point is [`SteamAuthenticator`], a typestate wrapper that only exposes
//! [`SteamAuthenticator::login`] while [`Unauthenticated`] and only exposes the confirmation/API
//! key surface once [`Authenticated`].

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use const_format::concatcp;
use proxied::Proxy;

pub mod bot;
mod client;
pub mod context;
mod crypto;
pub mod errors;
mod limiter;
mod session;
mod types;
pub mod user;
mod web_handler;
mod executor;

pub use bot::{NullBot, SteamClient};
pub use context::{SteamContext, SteamMobileConfig};
pub use errors::AuthError;
pub use user::{SteamId, SteamUser, Universe};
pub use web_handler::confirmation::{Confirmation, ConfirmationKind};

use client::MobileClient;
use session::SessionState;

pub const STEAM_COMMUNITY_HOST: &str = "steamcommunity.com";
pub const STEAM_STORE_HOST: &str = "store.steampowered.com";
pub const STEAM_HELP_HOST: &str = "help.steampowered.com";
pub const STEAM_WEBAPI_HOST: &str = "api.steampowered.com";

pub(crate) const STEAM_COMMUNITY_BASE: &str = concatcp!("https://", STEAM_COMMUNITY_HOST);
pub(crate) const STEAM_STORE_BASE: &str = concatcp!("https://", STEAM_STORE_HOST);
pub(crate) const STEAM_HELP_BASE: &str = concatcp!("https://", STEAM_HELP_HOST);
pub(crate) const STEAM_WEBAPI_BASE: &str = concatcp!("https://", STEAM_WEBAPI_HOST);

pub(crate) const MOBILE_REFERER: &str = concatcp!(STEAM_COMMUNITY_BASE, "/mobilelogin?oauth_client_id=DE45CD61&oauth_scope=read_profile%20write_profile%20read_client%20write_client");

pub(crate) const AUTHENTICATE_USER_URL: &str = concatcp!(STEAM_WEBAPI_BASE, "/ISteamUserAuth/AuthenticateUser/v1");

pub(crate) const ACCOUNT_PROBE_URL: &str = concatcp!(STEAM_STORE_BASE, "/account");

pub(crate) const API_KEY_PAGE_URL: &str = concatcp!(STEAM_COMMUNITY_BASE, "/dev/apikey?l=english");
pub(crate) const API_KEY_REGISTER_URL: &str = concatcp!(STEAM_COMMUNITY_BASE, "/dev/registerkey");

pub(crate) const CONFIRMATIONS_LIST_URL: &str = concatcp!(STEAM_COMMUNITY_BASE, "/mobileconf/conf");
pub(crate) const CONFIRMATIONS_MULTIAJAXOP_URL: &str = concatcp!(STEAM_COMMUNITY_BASE, "/mobileconf/multiajaxop");
pub(crate) const CONFIRMATIONS_AJAXOP_URL: &str = concatcp!(STEAM_COMMUNITY_BASE, "/mobileconf/ajaxop");

pub(crate) const PARENTAL_UNLOCK_PATH: &str = "/parental/ajaxunlock";

/// Three ways Steam wants the anti-CSRF `sessionid` stamped onto a form body, chosen per
/// endpoint (see spec §6: "market posts use camelCase; most others lowercase"), or omitted
/// entirely for calls that don't carry a session (the handshake itself, `QueryTime`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionIdCasing {
    Lower,
    Camel,
    Pascal,
    Omit,
}

impl SessionIdCasing {
    pub(crate) const fn field_name(self) -> Option<&'static str> {
        match self {
            Self::Lower => Some("sessionid"),
            Self::Camel => Some("sessionID"),
            Self::Pascal => Some("SessionID"),
            Self::Omit => None,
        }
    }
}

/// A logged-in state: the three session cookies are present on all three web hosts and the
/// session manager considers the handler initialized.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated;

/// The initial state: constructed but not yet past the auth handshake.
#[derive(Debug, Clone, Copy)]
pub struct Unauthenticated;

pub(crate) struct Inner<B> {
    pub(crate) client: MobileClient,
    pub(crate) user: SteamUser,
    pub(crate) ctx: Arc<SteamContext>,
    pub(crate) bot: B,
    pub(crate) session: SessionState,
    pub(crate) cached_api_key: parking_lot::RwLock<Option<String>>,
}

impl<B> Debug for Inner<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inner")
            .field("user", &self.user)
            .field("session", &self.session)
            .finish()
    }
}

/// Main entry point. `B` is the caller's [`SteamClient`] bot facade implementation; `State` is
/// either [`Unauthenticated`] or [`Authenticated`] and gates which methods are callable.
pub struct SteamAuthenticator<State, B> {
    inner: Inner<B>,
    state: PhantomData<State>,
}

impl<State, B> Debug for SteamAuthenticator<State, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SteamAuthenticator").field("inner", &self.inner).finish()
    }
}

impl<B> SteamAuthenticator<Unauthenticated, B>
where
    B: SteamClient,
{
    /// Constructs a new handler. `cached_api_key` starts empty; the key is resolved lazily on
    /// first [`SteamAuthenticator::api_key`] call rather than here, so construction never blocks
    /// on the network (design notes §9, open question (a)).
    pub fn new(user: SteamUser, bot: B, ctx: Arc<SteamContext>, proxy: Option<Proxy>) -> Self {
        Self {
            inner: Inner {
                client: MobileClient::new(proxy),
                user,
                ctx,
                bot,
                session: SessionState::new(),
                cached_api_key: parking_lot::RwLock::new(None),
            },
            state: PhantomData,
        }
    }

    /// Performs the RSA+AES auth handshake (C7) and transitions to [`Authenticated`] on
    /// success.
    pub async fn login(
        self,
        web_api_user_nonce: &[u8],
    ) -> Result<SteamAuthenticator<Authenticated, B>, (Self, AuthError)> {
        match web_handler::login::login(&self.inner, web_api_user_nonce).await {
            Ok(()) => Ok(SteamAuthenticator {
                inner: self.inner,
                state: PhantomData,
            }),
            Err(e) => {
                let err = AuthError::from(e);
                Err((self, err))
            }
        }
    }
}

impl<B> SteamAuthenticator<Authenticated, B>
where
    B: SteamClient,
{
    /// Generates the current five-character TOTP login code for this account.
    pub async fn generate_login_code(&self) -> Option<String> {
        let steam_time = self.inner.ctx.time.steam_time().await;
        steam_totp::generate_auth_code(self.inner.user.shared_secret(), steam_time)
    }

    /// Resolves the API key, registering one if none exists yet. See spec §4.8.
    pub async fn api_key(&self) -> Result<String, AuthError> {
        web_handler::api_key::resolve(&self.inner).await.map_err(AuthError::from)
    }

    /// Lists pending mobile confirmations (C9 listing).
    pub async fn fetch_confirmations(&self) -> Result<Vec<Confirmation>, AuthError> {
        web_handler::confirmation::fetch_confirmations(&self.inner)
            .await
            .map_err(AuthError::from)
    }

    /// Accepts or denies a batch of confirmations, falling back to per-item calls if the batch
    /// call reports failure (C9 batch approve/cancel + fallback).
    pub async fn process_confirmations(&self, accept: bool, confirmations: &[Confirmation]) -> Result<bool, AuthError> {
        web_handler::confirmation::process_confirmations(&self.inner, accept, confirmations)
            .await
            .map_err(AuthError::from)
    }

    /// Convenience wrapper: fetch then accept/deny every pending confirmation in one call.
    pub async fn handle_confirmations(&self, accept: bool) -> Result<bool, AuthError> {
        let confirmations = self.fetch_confirmations().await?;
        if confirmations.is_empty() {
            return Ok(true);
        }
        self.process_confirmations(accept, &confirmations).await
    }

    /// Returns the raw value of a cookie set on `host`, mostly useful for debugging/tests.
    pub fn dump_cookie(&self, host: &str, name: &str) -> Option<String> {
        self.inner.client.cookie(host, name)
    }

    /// Logical disconnect: clears `initialized` and the cached API key (spec §3 "Lifecycle").
    /// The cookie jar itself is left alone; a subsequent `login` overwrites it.
    pub fn disconnect(self) -> SteamAuthenticator<Unauthenticated, B> {
        self.inner.session.mark_uninitialized();
        *self.inner.cached_api_key.write() = None;
        SteamAuthenticator {
            inner: self.inner,
            state: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_casing_maps_to_expected_field_names() {
        assert_eq!(SessionIdCasing::Lower.field_name(), Some("sessionid"));
        assert_eq!(SessionIdCasing::Camel.field_name(), Some("sessionID"));
        assert_eq!(SessionIdCasing::Pascal.field_name(), Some("SessionID"));
        assert_eq!(SessionIdCasing::Omit.field_name(), None);
    }
}
