//! Error types.
//!
//! Steam's own HTML screen-scraping surface can't always distinguish "nothing to report" from
//! "something went wrong", so most public operations return `Result<Option<T>, AuthError>` or
//! `Result<Vec<T>, AuthError>` rather than a single error type swallowing both: the `Option`/`Vec`
//! carries the spec's "absence sentinel" (transient/expected emptiness), while `Err` is reserved
//! for transport failure or a response that doesn't parse the way Steam is known to format it.

/// Errors that can happen while just talking to Steam: sending requests, parsing bodies, or
/// reading cookies out of the jar. Internal to this crate; public methods wrap it in
/// [`AuthError`].
#[derive(Debug, thiserror::Error)]
pub enum InternalError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("could not parse URL: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("could not urlencode request body: {0}")]
    FormEncode(#[from] serde_urlencoded::ser::Error),
    #[error("could not deserialize response body: {0}")]
    Deserialize(#[from] serde_json::Error),
    #[error("TOTP/confirmation hash error: {0}")]
    Totp(#[from] steam_totp::TotpError),
    #[error("request required a sessionid cookie, but none is set for this host")]
    MissingSessionId,
    #[error("{0}")]
    GeneralFailure(String),
}

/// Errors from the RSA+AES login handshake (C7).
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error(transparent)]
    Internal(#[from] InternalError),
    #[error("steam_id does not belong to an individual account")]
    InvalidSteamId,
    #[error("no RSA public key is known for universe {0:?}")]
    UnknownUniverse(crate::user::Universe),
    #[error("web_api_user_nonce must not be empty")]
    EmptyNonce,
    #[error("RSA encryption of the session key failed: {0}")]
    Rsa(String),
    #[error("AuthenticateUser did not return usable login tokens")]
    EmptyTokens,
    #[error("parental unlock was rejected by {0}")]
    ParentalUnlockRejected(&'static str),
}

/// Errors from API-key discovery/registration (C8).
#[derive(Debug, thiserror::Error)]
pub enum ApiKeyError {
    #[error(transparent)]
    Internal(#[from] InternalError),
    #[error("the `/dev/apikey` page could not be parsed")]
    UnrecognizedPage,
    #[error("the `/dev/apikey` page timed out (no response, or no title under #mainContents)")]
    Timeout,
    /// "Validated email address required" looks like `Access Denied` but is transient (the
    /// account can become eligible later) — kept distinct so callers don't cache it as
    /// permanent the way a true `Access Denied` is.
    #[error("a validated email address is required before an API key can be issued")]
    EmailNotValidated,
}

/// Errors from confirmation listing/handling (C9).
#[derive(Debug, thiserror::Error)]
pub enum ConfirmationError {
    #[error(transparent)]
    Internal(#[from] InternalError),
    #[error("confirmation list HTML did not match the expected shape")]
    ParseFailed,
    #[error("device_id is not valid; set one with SteamUser::set_device_id first")]
    InvalidDeviceId,
}

/// The error type returned by every [`crate::SteamAuthenticator`] method.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Internal(#[from] InternalError),
    #[error(transparent)]
    Login(#[from] LoginError),
    #[error(transparent)]
    ApiKey(#[from] ApiKeyError),
    #[error(transparent)]
    Confirmation(#[from] ConfirmationError),
    #[error("not logged in: call login() first")]
    NotAuthenticated,
    #[error("session could not be re-established within the connection timeout")]
    SessionUnavailable,
}
