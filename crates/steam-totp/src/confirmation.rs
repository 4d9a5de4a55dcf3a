use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::secret::Secret;

/// Generates the base64 HMAC-SHA1 Steam expects on every `/mobileconf/*` request: the buffer is
/// the big-endian server time followed by up to the first 32 bytes of `tag`'s UTF-8 encoding.
pub fn generate_confirmation_key(identity_secret: &Secret, steam_time: u32, tag: &str) -> String {
    let tag_bytes = tag.as_bytes();
    let tag_len = tag_bytes.len().min(32);

    let mut buffer = Vec::with_capacity(8 + tag_len);
    buffer.extend_from_slice(&(steam_time as u64).to_be_bytes());
    buffer.extend_from_slice(&tag_bytes[..tag_len]);

    let mut mac = Hmac::<Sha1>::new_from_slice(identity_secret.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(&buffer);
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_secret() -> Secret {
        let encoded = base64::engine::general_purpose::STANDARD.encode([0u8; 20]);
        Secret::from_b64(encoded).unwrap()
    }

    #[test]
    fn shape_matches_spec_vector() {
        let secret = zero_secret();
        let hash = generate_confirmation_key(&secret, 1, "conf");
        // base64(SHA1-HMAC output) is always 28 chars (20 raw bytes -> ceil(20/3)*4 = 28).
        assert_eq!(hash.len(), 28);
    }

    #[test]
    fn is_deterministic() {
        let secret = zero_secret();
        let a = generate_confirmation_key(&secret, 12345, "conf");
        let b = generate_confirmation_key(&secret, 12345, "conf");
        assert_eq!(a, b);
    }

    #[test]
    fn differs_by_tag() {
        let secret = zero_secret();
        let a = generate_confirmation_key(&secret, 12345, "conf");
        let b = generate_confirmation_key(&secret, 12345, "details");
        assert_ne!(a, b);
    }

    #[test]
    fn tag_is_truncated_at_32_bytes() {
        let secret = zero_secret();
        let long_tag = "x".repeat(64);
        let truncated_tag = "x".repeat(32);
        let a = generate_confirmation_key(&secret, 1, &long_tag);
        let b = generate_confirmation_key(&secret, 1, &truncated_tag);
        assert_eq!(a, b);
    }
}
