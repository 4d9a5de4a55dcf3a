//! Auth handshake (C7): RSA-wrap a random session key, AES-encrypt the single-use web API
//! nonce under it, trade both for session tokens, and install the resulting cookies on all
//! three web hosts.

use base64::Engine;
use rand::RngCore;
use reqwest::Method;
use tracing::{debug, info};

use crate::bot::SteamClient;
use crate::crypto;
use crate::errors::LoginError;
use crate::types::AuthenticateUserEnvelope;
use crate::user::Universe;
use crate::{
    Inner, AUTHENTICATE_USER_URL, PARENTAL_UNLOCK_PATH, STEAM_COMMUNITY_HOST, STEAM_HELP_HOST, STEAM_STORE_HOST,
};

pub(crate) async fn login<B: SteamClient>(inner: &Inner<B>, web_api_user_nonce: &[u8]) -> Result<(), LoginError> {
    let steam_id = inner.user.steam_id();
    if !steam_id.is_individual() {
        return Err(LoginError::InvalidSteamId);
    }
    if !inner.user.universe.is_valid() {
        return Err(LoginError::UnknownUniverse(inner.user.universe));
    }
    if web_api_user_nonce.is_empty() {
        return Err(LoginError::EmptyNonce);
    }

    let mut session_key = [0u8; 32];
    rand::rng().fill_bytes(&mut session_key);

    let encrypted_session_key = crypto::rsa_encrypt_session_key(inner.user.universe, &session_key)?;
    let encrypted_login_key = crypto::symmetric_encrypt(&session_key, web_api_user_nonce);

    let body: Vec<(String, String)> = vec![
        ("steamid".to_string(), steam_id.to_u64().to_string()),
        (
            "sessionkey".to_string(),
            base64::engine::general_purpose::STANDARD.encode(encrypted_session_key),
        ),
        (
            "encrypted_loginkey".to_string(),
            base64::engine::general_purpose::STANDARD.encode(encrypted_login_key),
        ),
    ];

    // Single attempt: the nonce is single-use, so this deliberately bypasses the session-aware
    // executor (which isn't usable yet anyway — nothing is initialized) and any retry.
    let response = inner.client.send(AUTHENTICATE_USER_URL, Method::POST, Some(&body)).await?;
    let envelope = response
        .json::<AuthenticateUserEnvelope>()
        .await
        .map_err(crate::errors::InternalError::from)?;
    let token = envelope.authenticateuser.token;
    let token_secure = envelope.authenticateuser.token_secure;
    if token.is_empty() || token_secure.is_empty() {
        return Err(LoginError::EmptyTokens);
    }

    let session_id = base64::engine::general_purpose::STANDARD.encode(steam_id.to_u64().to_string());
    let timezone_offset = format!("{},0", local_utc_offset_secs());

    for host in [STEAM_COMMUNITY_HOST, STEAM_STORE_HOST, STEAM_HELP_HOST] {
        inner.client.set_cookie(host, "sessionid", &session_id);
        inner.client.set_cookie(host, "steamLogin", &token);
        inner.client.set_cookie(host, "steamLoginSecure", &token_secure);
        inner.client.set_cookie(host, "timezoneOffset", &timezone_offset);
    }
    debug!("installed session cookies on community/store/help");

    if let Some(parental_code) = inner.user.parental_code.as_deref() {
        if parental_code.len() == 4 {
            let (community, store) = tokio::join!(
                unlock_parental_gate(inner, STEAM_COMMUNITY_HOST, &session_id, parental_code),
                unlock_parental_gate(inner, STEAM_STORE_HOST, &session_id, parental_code),
            );
            community?;
            store?;
        }
    }

    inner.session.mark_initialized();
    info!(steam_id = %steam_id, "login handshake complete");
    Ok(())
}

/// Parental unlock for one service (spec §4.7 "Parental unlock"). Bypasses the executor
/// entirely — the session isn't initialized yet — and retries up to 5 times only on a
/// self-profile redirect; a session-expired redirect is a hard failure here since there is no
/// session yet to refresh.
async fn unlock_parental_gate<B: SteamClient>(
    inner: &Inner<B>,
    host: &'static str,
    session_id: &str,
    pin: &str,
) -> Result<(), LoginError> {
    let url = format!("https://{host}{PARENTAL_UNLOCK_PATH}");
    let body = vec![("pin".to_string(), pin.to_string()), ("sessionid".to_string(), session_id.to_string())];

    const MAX_ATTEMPTS: u32 = 5;
    for attempt in 0..MAX_ATTEMPTS {
        let response = inner.client.send(url.as_str(), Method::POST, Some(&body)).await?;
        if let Some(location) = crate::client::MobileClient::location_of(&response) {
            if crate::session::is_session_expired_uri(&location) {
                return Err(LoginError::ParentalUnlockRejected(host));
            }
            let is_self_profile = crate::session::is_self_profile_uri(
                &location,
                inner.user.steam_id(),
                inner.user.vanity_url().as_deref(),
            );
            if is_self_profile && attempt + 1 < MAX_ATTEMPTS {
                continue;
            }
        }
        return Ok(());
    }
    Err(LoginError::ParentalUnlockRejected(host))
}

fn local_utc_offset_secs() -> i32 {
    use chrono::Offset;
    chrono::Local::now().offset().fix().local_minus_utc()
}
