//! Wire DTOs for Steam's JSON responses. POST bodies are built directly as ordered
//! `(name, value)` pairs (see [`crate::executor::FormBody`]) rather than derived `Serialize`
//! structs, since the executor needs pair-level access to stamp the session id in.

use serde::Deserialize;

/// `ISteamUserAuth/AuthenticateUser` response envelope (spec §4.7 step 7).
#[derive(Debug, Deserialize)]
pub(crate) struct AuthenticateUserEnvelope {
    pub(crate) authenticateuser: AuthenticateUserResponse,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthenticateUserResponse {
    pub(crate) token: String,
    #[serde(rename = "tokensecure")]
    pub(crate) token_secure: String,
}

/// `{success: bool}` — the shape of both `/parental/ajaxunlock` and `/mobileconf/ajaxop` /
/// `/mobileconf/multiajaxop` responses; `success: false` is itself meaningful (it is the
/// trigger for the per-item fallback in spec §4.9), so we deserialize rather than treat a
/// non-2xx as the only failure signal.
#[derive(Debug, Deserialize)]
pub(crate) struct BooleanResponse {
    pub(crate) success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticate_user_envelope_deserializes_from_steams_shape() {
        let json = r#"{"authenticateuser":{"token":"abc","tokensecure":"def"}}"#;
        let parsed: AuthenticateUserEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.authenticateuser.token, "abc");
        assert_eq!(parsed.authenticateuser.token_secure, "def");
    }

    #[test]
    fn boolean_response_reads_false_success() {
        let parsed: BooleanResponse = serde_json::from_str(r#"{"success":false}"#).unwrap();
        assert!(!parsed.success);
    }
}
