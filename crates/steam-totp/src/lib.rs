//! Steam's TOTP login codes and mobile confirmation hashes.
//!
//! This crate is the deterministic half of a Steam mobile authenticator: given a shared secret
//! and the corrected Steam server time, it produces 5-character login codes
//! ([`generate_auth_code`]); given an identity secret, the same time, and a short tag, it
//! produces the base64 HMAC-SHA1 Steam expects on `/mobileconf/*` requests
//! ([`generate_confirmation_key`]). [`TimeSync`] owns the one piece of shared, refreshable state:
//! the offset between the local clock and Steam's.

mod code;
mod confirmation;
mod device_id;
mod error;
mod secret;
mod time;

pub use code::generate_auth_code;
pub use confirmation::generate_confirmation_key;
pub use device_id::is_valid_device_id;
pub use error::TotpError;
pub use secret::Secret;
pub use time::TimeSync;
