//! API key lifecycle (C8): discover the `/dev/apikey` page's state, register if none exists
//! yet, and cache the result.

use scraper::{Html, Selector};
use url::Url;

use crate::bot::SteamClient;
use crate::errors::ApiKeyError;
use crate::executor::Executor;
use crate::{Inner, SessionIdCasing, API_KEY_PAGE_URL, API_KEY_REGISTER_URL, STEAM_COMMUNITY_HOST};

enum ApiKeyState {
    Registered(String),
    NotRegisteredYet,
    AccessDenied,
    EmailNotValidated,
    Timeout,
    Error,
}

/// Resolves the account's API key, registering one if needed. Spec §4.8 "Resolution": the
/// bot-limited check happens first and short-circuits to the permanently-unavailable sentinel
/// (an empty string) without ever touching the network.
///
/// Per design notes §9 open question (a), this is deliberately lazy — called on first use, not
/// from construction — and (b) `EmailNotValidated` is surfaced as a transient error rather than
/// folded into the permanent `AccessDenied` sentinel.
pub(crate) async fn resolve<B: SteamClient>(inner: &Inner<B>) -> Result<String, ApiKeyError> {
    if let Some(cached) = inner.cached_api_key.read().clone() {
        return Ok(cached);
    }

    if inner.bot.is_account_limited().await {
        *inner.cached_api_key.write() = Some(String::new());
        return Ok(String::new());
    }

    match discover_state(inner).await? {
        ApiKeyState::AccessDenied => {
            *inner.cached_api_key.write() = Some(String::new());
            Ok(String::new())
        }
        ApiKeyState::EmailNotValidated => Err(ApiKeyError::EmailNotValidated),
        ApiKeyState::Timeout => Err(ApiKeyError::Timeout),
        ApiKeyState::Error => Err(ApiKeyError::UnrecognizedPage),
        ApiKeyState::Registered(key) => {
            *inner.cached_api_key.write() = Some(key.clone());
            Ok(key)
        }
        ApiKeyState::NotRegisteredYet => {
            register(inner).await?;
            match discover_state(inner).await? {
                ApiKeyState::Registered(key) => {
                    *inner.cached_api_key.write() = Some(key.clone());
                    Ok(key)
                }
                ApiKeyState::Timeout => Err(ApiKeyError::Timeout),
                _ => Err(ApiKeyError::UnrecognizedPage),
            }
        }
    }
}

async fn discover_state<B: SteamClient>(inner: &Inner<B>) -> Result<ApiKeyState, ApiKeyError> {
    let mut executor = Executor::new(inner, STEAM_COMMUNITY_HOST);
    let url = Url::parse(API_KEY_PAGE_URL).expect("static url is valid");
    let Some(html) = executor.get_html(url).await? else {
        return Ok(ApiKeyState::Timeout);
    };

    let document = Html::parse_document(&html);
    let title_selector = Selector::parse("#mainContents h2").expect("static selector is valid");
    let Some(title_el) = document.select(&title_selector).next() else {
        return Ok(ApiKeyState::Timeout);
    };
    let title: String = title_el.text().collect();

    if title.contains("Validated email address required") {
        return Ok(ApiKeyState::EmailNotValidated);
    }
    if title.contains("Access Denied") {
        return Ok(ApiKeyState::AccessDenied);
    }

    let body_selector = Selector::parse("#bodyContents_ex p").expect("static selector is valid");
    let body_text: String = document
        .select(&body_selector)
        .map(|el| el.text().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ");

    if body_text.contains("Registering for a Steam Web API Key") {
        return Ok(ApiKeyState::NotRegisteredYet);
    }

    if let Some(key) = extract_registered_key(&body_text) {
        return Ok(ApiKeyState::Registered(key));
    }

    Ok(ApiKeyState::Error)
}

fn extract_registered_key(body_text: &str) -> Option<String> {
    let idx = body_text.find("Key: ")?;
    let candidate: String = body_text[idx + "Key: ".len()..].chars().take(32).collect();
    (candidate.len() == 32 && candidate.chars().all(|c| c.is_ascii_hexdigit())).then_some(candidate)
}

async fn register<B: SteamClient>(inner: &Inner<B>) -> Result<(), ApiKeyError> {
    let mut executor = Executor::new(inner, STEAM_COMMUNITY_HOST);
    let url = Url::parse(API_KEY_REGISTER_URL).expect("static url is valid");
    let body = vec![
        ("agreeToTerms".to_string(), "agreed".to_string()),
        ("domain".to_string(), "generated.by.steam-mobile.localhost".to_string()),
        ("Submit".to_string(), "Register".to_string()),
    ];
    executor.post_void(url, body, SessionIdCasing::Lower).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_a_32_char_hex_key() {
        let key = extract_registered_key("blah blah Key: 0123456789ABCDEF0123456789ABCDEF trailing");
        assert_eq!(key, Some("0123456789ABCDEF0123456789ABCDEF".to_string()));
    }

    #[test]
    fn rejects_a_key_shorter_than_32_chars() {
        assert_eq!(extract_registered_key("Key: deadbeef"), None);
    }

    #[test]
    fn rejects_when_key_marker_is_absent() {
        assert_eq!(extract_registered_key("Registering for a Steam Web API Key"), None);
    }
}
