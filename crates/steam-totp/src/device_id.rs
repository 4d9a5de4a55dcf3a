/// Validates a Steam mobile `device_id`.
///
/// Accepts an optional `"<tag>:"` prefix (conventionally `"android:"`); after stripping the
/// prefix and any dashes, the remainder must be non-empty and consist entirely of decimal
/// digits, or entirely of hex digits (which a pure decimal string also satisfies).
pub fn is_valid_device_id(device_id: &str) -> bool {
    let residual = match device_id.find(':') {
        Some(idx) => &device_id[idx + 1..],
        None => device_id,
    };
    let residual: String = residual.chars().filter(|c| *c != '-').collect();

    if residual.is_empty() {
        return false;
    }
    residual.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_android_prefixed_uuid_like_id() {
        assert!(is_valid_device_id("android:5A6B7C8D-DEAD-BEEF-1234-567890ABCDEF"));
    }

    #[test]
    fn rejects_empty_residual() {
        assert!(!is_valid_device_id("android:"));
    }

    #[test]
    fn accepts_digits_that_also_parse_as_hex() {
        assert!(is_valid_device_id("1234abc"));
    }

    #[test]
    fn rejects_non_hex_residual() {
        assert!(!is_valid_device_id("1234g"));
    }

    #[test]
    fn accepts_unprefixed_all_digit_id() {
        assert!(is_valid_device_id("01234567890123456789"));
    }
}
