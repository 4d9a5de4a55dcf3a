use base64::Engine;

use crate::error::TotpError;

/// A base64-encoded HMAC key, either a `shared_secret` (login codes) or an `identity_secret`
/// (confirmation hashes). Steam issues these as 20 raw bytes, but we don't enforce the length
/// here: HMAC-SHA1 accepts keys of any size, and rejecting a secret Steam itself accepted would
/// only get in the user's way.
#[derive(Clone)]
pub struct Secret(Vec<u8>);

impl Secret {
    /// Decodes a base64-encoded secret as handed out by Steam.
    pub fn from_b64(encoded: impl AsRef<str>) -> Result<Self, TotpError> {
        let raw = base64::engine::general_purpose::STANDARD.decode(encoded.as_ref())?;
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(..)")
    }
}
