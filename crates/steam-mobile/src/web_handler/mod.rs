//! Handlers for the three stateful HTTP protocols this crate drives: the login handshake, the
//! API key lifecycle, and the mobile confirmation protocol.

pub(crate) mod api_key;
pub(crate) mod confirmation;
pub(crate) mod login;

/// Percent-encodes a query-string value. Used for `k=` (confirmation hash) and `p=` (device
/// id) in confirmation URLs, both of which can contain `+`/`/`/`=` from base64 or `:`/`-` from
/// the device id.
pub(crate) fn url_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
