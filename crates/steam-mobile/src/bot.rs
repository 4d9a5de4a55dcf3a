use crate::errors::InternalError;

/// The "bot" facade: the part of a Steam client that owns the underlying Steam Network
/// connection (CM sockets, protobuf handshakes, the works) and is entirely out of scope for
/// this crate. We only need two things from it:
///
/// - a way to re-establish a web session when [`crate::session`] detects it has expired, and
/// - whether the account has been flagged as limited, which short-circuits API key resolution.
///
/// `Init`/`OnDisconnected`/`OnVanityURLChanged` from the spec are the facade's own callbacks
/// into *its* owner, not something this crate drives; they aren't represented here.
pub trait SteamClient: Send + Sync {
    /// Performs a full relogin against the Steam Network and returns once the web session's
    /// cookies have been refreshed. Called by [`crate::session::refresh_session`] while holding
    /// the per-handler session mutex.
    fn refresh_session(&self) -> impl std::future::Future<Output = Result<(), InternalError>> + Send;

    /// Whether Steam has limited this account (e.g. no phone number, no purchases). A limited
    /// account can never successfully register an API key.
    fn is_account_limited(&self) -> impl std::future::Future<Output = bool> + Send;
}

/// A [`SteamClient`] that always succeeds and reports the account as unlimited. Useful for
/// tests and for callers that manage their own relogin out of band (e.g. by holding a
/// long-lived refresh token) and just want `steam-mobile` to call back into them trivially.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBot;

impl SteamClient for NullBot {
    async fn refresh_session(&self) -> Result<(), InternalError> {
        Ok(())
    }

    async fn is_account_limited(&self) -> bool {
        false
    }
}
