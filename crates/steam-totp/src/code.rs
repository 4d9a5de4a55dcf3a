use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::secret::Secret;

/// Steam's 26-symbol login-code alphabet. Digits and letters that are easy to confuse on a
/// phone screen (0, 1, I, O, L, S, A, E, U, V) are deliberately excluded.
const STEAM_CHARS: &[u8; 26] = b"23456789BCDFGHJKMNPQRTVWXY";

const CODE_LEN: usize = 5;
const STEAM_PERIOD_SECS: u32 = 30;

/// Generates a 5-character Steam Guard login code for the given `shared_secret` at `steam_time`
/// (corrected server time, in seconds — see [`crate::time`]).
///
/// Returns `None` if `steam_time` is zero. A malformed secret already failed at
/// [`Secret::from_b64`], so there is no base64 failure mode left to report here.
pub fn generate_auth_code(shared_secret: &Secret, steam_time: u32) -> Option<String> {
    if steam_time == 0 {
        return None;
    }

    let counter = (steam_time / STEAM_PERIOD_SECS) as u64;
    let mut mac = Hmac::<Sha1>::new_from_slice(shared_secret.as_bytes()).ok()?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[19] & 0x0F) as usize;
    let slice = &digest[offset..offset + 4];
    let mut value = u32::from_be_bytes(slice.try_into().ok()?) & 0x7FFF_FFFF;

    let mut code = String::with_capacity(CODE_LEN);
    for _ in 0..CODE_LEN {
        code.push(STEAM_CHARS[(value % 26) as usize] as char);
        value /= 26;
    }
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn b64_secret() -> Secret {
        let raw = "aaaaaaaaaaaaaaaaaaaa".as_bytes().to_vec();
        let encoded = base64::engine::general_purpose::STANDARD.encode(raw);
        Secret::from_b64(encoded).unwrap()
    }

    #[test]
    fn code_is_deterministic_and_five_chars() {
        let secret = b64_secret();
        let a = generate_auth_code(&secret, 30).unwrap();
        let b = generate_auth_code(&secret, 30).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
        assert!(a.chars().all(|c| STEAM_CHARS.contains(&(c as u8))));
    }

    #[test]
    fn code_is_stable_within_the_same_30s_window() {
        let secret = b64_secret();
        let a = generate_auth_code(&secret, 30).unwrap();
        let b = generate_auth_code(&secret, 59).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn code_changes_across_window_boundary() {
        let secret = b64_secret();
        let a = generate_auth_code(&secret, 29).unwrap();
        let b = generate_auth_code(&secret, 30).unwrap();
        // Not guaranteed in general (26^5 space), but near-certain for an arbitrary fixed
        // secret; this guards against an off-by-one in counter computation collapsing
        // every window into the same value.
        assert_ne!(a, b);
    }

    #[test]
    fn zero_time_yields_none() {
        let secret = b64_secret();
        assert!(generate_auth_code(&secret, 0).is_none());
    }
}
