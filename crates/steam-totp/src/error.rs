//! Error types used by this crate.

/// The error type for TOTP and confirmation-hash operations, and for the server-time sync
/// that backs them.
#[derive(Debug, thiserror::Error)]
pub enum TotpError {
    #[error("base64 decode error: {0}")]
    B64(#[from] base64::DecodeError),
    #[error("HMAC error: key has an invalid length")]
    Hmac(#[from] hmac::digest::InvalidLength),
    #[error("request error: {0}")]
    Req(#[from] reqwest::Error),
    #[error("failed to deserialize QueryTime response: {0}")]
    Deserialize(#[from] serde_json::Error),
    #[error("QueryTime response did not contain a usable server_time")]
    BadServerTime,
}
