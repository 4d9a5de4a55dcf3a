use parking_lot::RwLock;
use steam_totp::Secret;

use crate::errors::LoginError;

/// Steam's account universe. Only `Public` is reachable from the outside world; the others
/// exist for Valve's own internal/beta/dev deployments and are kept here only so an invalid
/// universe can be rejected by value rather than by magic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Universe {
    Invalid = 0,
    Public = 1,
    Beta = 2,
    Internal = 3,
    Dev = 4,
}

impl Universe {
    pub const fn is_valid(self) -> bool {
        !matches!(self, Universe::Invalid)
    }
}

/// A 64-bit SteamID, with just enough of Valve's bit layout decoded to answer the one question
/// this crate cares about: is this an individual account?
///
/// Layout (MSB to LSB): 8 bits universe, 4 bits account type, 20 bits instance, 32 bits account
/// number + low bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SteamId(pub u64);

const ACCOUNT_TYPE_INDIVIDUAL: u64 = 1;

impl SteamId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn account_type(self) -> u64 {
        (self.0 >> 52) & 0xF
    }

    pub const fn is_individual(self) -> bool {
        self.0 != 0 && self.account_type() == ACCOUNT_TYPE_INDIVIDUAL
    }

    pub fn to_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SteamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validates and normalizes a Steam mobile `device_id`, re-exported here so callers building a
/// [`SteamUser`] and callers using [`SteamUser::set_device_id`] share one validation path.
pub fn is_valid_device_id(device_id: &str) -> bool {
    steam_totp::is_valid_device_id(device_id)
}

/// The immutable-after-construction secrets and identity a [`crate::SteamAuthenticator`] acts on
/// behalf of, plus the handful of fields Steam lets change after the fact (`vanity_url`,
/// `device_id`).
#[derive(Debug)]
pub struct SteamUser {
    pub(crate) shared_secret: Secret,
    pub(crate) identity_secret: Secret,
    device_id: RwLock<String>,
    pub(crate) steam_id: SteamId,
    pub(crate) universe: Universe,
    vanity_url: RwLock<Option<String>>,
    pub(crate) parental_code: Option<String>,
}

impl SteamUser {
    /// Builds a new user identity. Fails only if `device_id` doesn't pass
    /// [`is_valid_device_id`] — secrets are taken as opaque base64 blobs and are not validated
    /// until first use.
    pub fn new(
        shared_secret: Secret,
        identity_secret: Secret,
        device_id: impl Into<String>,
        steam_id: SteamId,
    ) -> Result<Self, LoginError> {
        let device_id = device_id.into();
        if !is_valid_device_id(&device_id) {
            return Err(LoginError::Internal(crate::errors::InternalError::GeneralFailure(
                format!("invalid device_id: {device_id}"),
            )));
        }
        Ok(Self {
            shared_secret,
            identity_secret,
            device_id: RwLock::new(device_id),
            steam_id,
            universe: Universe::Public,
            vanity_url: RwLock::new(None),
            parental_code: None,
        })
    }

    pub fn with_universe(mut self, universe: Universe) -> Self {
        self.universe = universe;
        self
    }

    /// Registers a 4-digit Steam Family View parental-unlock PIN to be entered automatically
    /// during [`crate::SteamAuthenticator::login`].
    pub fn with_parental_code(mut self, code: impl Into<String>) -> Self {
        self.parental_code = Some(code.into());
        self
    }

    pub fn device_id(&self) -> String {
        self.device_id.read().clone()
    }

    /// Corrective update to `device_id`. Only takes effect if `new_device_id` itself passes
    /// [`is_valid_device_id`]; otherwise the previous value is left untouched and an error is
    /// returned.
    pub fn set_device_id(&self, new_device_id: impl Into<String>) -> Result<(), LoginError> {
        let new_device_id = new_device_id.into();
        if !is_valid_device_id(&new_device_id) {
            return Err(LoginError::Internal(crate::errors::InternalError::GeneralFailure(
                format!("invalid device_id: {new_device_id}"),
            )));
        }
        *self.device_id.write() = new_device_id;
        Ok(())
    }

    pub fn vanity_url(&self) -> Option<String> {
        self.vanity_url.read().clone()
    }

    /// Called by the bot facade's `OnVanityURLChanged` callback (out of scope of this crate).
    pub fn set_vanity_url(&self, vanity_url: Option<String>) {
        *self.vanity_url.write() = vanity_url;
    }

    pub fn steam_id(&self) -> SteamId {
        self.steam_id
    }

    pub fn shared_secret(&self) -> &Secret {
        &self.shared_secret
    }

    pub fn identity_secret(&self) -> &Secret {
        &self.identity_secret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> Secret {
        use base64::Engine;
        Secret::from_b64(base64::engine::general_purpose::STANDARD.encode([1u8; 20])).unwrap()
    }

    fn individual_steam_id() -> SteamId {
        // universe=1 (public), type=1 (individual), instance=1, accountnum arbitrary
        SteamId::new(76_561_198_092_541_763)
    }

    #[test]
    fn rejects_invalid_device_id_at_construction() {
        let result = SteamUser::new(secret(), secret(), "android:", individual_steam_id());
        assert!(result.is_err());
    }

    #[test]
    fn accepts_valid_device_id() {
        let user = SteamUser::new(secret(), secret(), "android:1234567890", individual_steam_id()).unwrap();
        assert_eq!(user.device_id(), "android:1234567890");
    }

    #[test]
    fn corrective_set_device_id_rejects_bad_value_and_keeps_old_one() {
        let user = SteamUser::new(secret(), secret(), "android:1234567890", individual_steam_id()).unwrap();
        assert!(user.set_device_id("android:").is_err());
        assert_eq!(user.device_id(), "android:1234567890");
    }

    #[test]
    fn steam_id_recognizes_individual_accounts() {
        assert!(individual_steam_id().is_individual());
        assert!(!SteamId::new(0).is_individual());
    }
}
