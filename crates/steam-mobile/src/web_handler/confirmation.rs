//! Confirmation protocol (C9): list pending confirmations from HTML, batch-approve via
//! `multiajaxop`, and fall back to per-item `ajaxop` when the batch call reports failure.

use scraper::{Html, Selector};
use url::Url;

use super::url_encode;
use crate::bot::SteamClient;
use crate::errors::{ConfirmationError, InternalError};
use crate::executor::{Executor, FormBody};
use crate::types::BooleanResponse;
use crate::user::is_valid_device_id;
use crate::{
    Inner, SessionIdCasing, CONFIRMATIONS_AJAXOP_URL, CONFIRMATIONS_LIST_URL, CONFIRMATIONS_MULTIAJAXOP_URL,
    STEAM_COMMUNITY_HOST,
};

/// A pending Steam confirmation (trade, market listing, phone/account-recovery action).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub id: u64,
    pub key: String,
    pub creator: u64,
    pub kind: ConfirmationKind,
}

/// Known confirmation kinds. Value `4` ("Unknown") is deliberately left undefined on the wire
/// and is rejected rather than mapped to a variant (design notes §9, open question (c)).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationKind {
    Generic,
    Trade,
    Market,
    PhoneNumberChange,
    AccountRecovery,
}

impl ConfirmationKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().parse::<u8>().ok()? {
            1 => Some(Self::Generic),
            2 => Some(Self::Trade),
            3 => Some(Self::Market),
            5 => Some(Self::PhoneNumberChange),
            6 => Some(Self::AccountRecovery),
            _ => None,
        }
    }
}

/// Listing (spec §4.9 "Listing"). `Ok(vec![])` means the page parsed cleanly and genuinely has
/// no pending confirmations; `Err` covers both transport failure and HTML that didn't match the
/// expected shape — these stay distinguishable per the absence-sentinel discipline in
/// [`crate::errors`].
pub(crate) async fn fetch_confirmations<B: SteamClient>(inner: &Inner<B>) -> Result<Vec<Confirmation>, ConfirmationError> {
    let device_id = inner.user.device_id();
    if !is_valid_device_id(&device_id) {
        return Err(ConfirmationError::InvalidDeviceId);
    }

    let time = inner.ctx.time.steam_time().await;
    let hash = steam_totp::generate_confirmation_key(inner.user.identity_secret(), time, "conf");
    let steam_id = inner.user.steam_id();

    let url = Url::parse(&format!(
        "{CONFIRMATIONS_LIST_URL}?a={steam_id}&k={}&l=english&m=android&p={}&t={time}&tag=conf",
        url_encode(&hash),
        url_encode(&device_id),
    ))
    .map_err(InternalError::from)?;

    let html: Option<String> = inner
        .ctx
        .limit_confirmations(|| async {
            let mut executor = Executor::new(inner, STEAM_COMMUNITY_HOST);
            executor.get_html(url).await
        })
        .await?;

    let Some(html) = html else {
        return Err(ConfirmationError::Internal(InternalError::GeneralFailure(
            "confirmation listing request failed at the transport level".to_string(),
        )));
    };

    let document = Html::parse_document(&html);
    let selector = Selector::parse("div.mobileconf_list_entry").expect("static selector is valid");

    let mut confirmations = Vec::new();
    for entry in document.select(&selector) {
        let attrs = entry.value();
        let id = attrs.attr("data-confid").and_then(|s| s.parse::<u64>().ok()).filter(|&v| v != 0);
        let key = attrs.attr("data-key").map(str::to_string);
        let creator = attrs.attr("data-creator").and_then(|s| s.parse::<u64>().ok()).filter(|&v| v != 0);
        let kind = attrs.attr("data-type").and_then(ConfirmationKind::parse);

        match (id, key, creator, kind) {
            (Some(id), Some(key), Some(creator), Some(kind)) => confirmations.push(Confirmation { id, key, creator, kind }),
            _ => return Err(ConfirmationError::ParseFailed),
        }
    }

    Ok(confirmations)
}

/// Batch approve/cancel with per-item fallback (spec §4.9 "Batch approve/cancel" + "Fallback").
pub(crate) async fn process_confirmations<B: SteamClient>(
    inner: &Inner<B>,
    accept: bool,
    confirmations: &[Confirmation],
) -> Result<bool, ConfirmationError> {
    if confirmations.is_empty() {
        return Ok(true);
    }

    let device_id = inner.user.device_id();
    let time = inner.ctx.time.steam_time().await;
    let hash = steam_totp::generate_confirmation_key(inner.user.identity_secret(), time, "conf");
    let steam_id = inner.user.steam_id();
    let op = if accept { "allow" } else { "cancel" };

    let mut body: FormBody = vec![
        ("a".to_string(), steam_id.to_string()),
        ("k".to_string(), hash.clone()),
        ("m".to_string(), "android".to_string()),
        ("op".to_string(), op.to_string()),
        ("p".to_string(), device_id.clone()),
        ("t".to_string(), time.to_string()),
        ("tag".to_string(), "conf".to_string()),
    ];
    for confirmation in confirmations {
        body.push(("cid[]".to_string(), confirmation.id.to_string()));
        body.push(("ck[]".to_string(), confirmation.key.clone()));
    }

    let mut executor = Executor::new(inner, STEAM_COMMUNITY_HOST);
    let url = Url::parse(CONFIRMATIONS_MULTIAJAXOP_URL).expect("static url is valid");
    let response: Option<BooleanResponse> = executor.post_json(url, body, SessionIdCasing::Lower).await?;

    match response {
        Some(r) if r.success => Ok(true),
        Some(_) => fallback_per_item(inner, op, &hash, &device_id, time, confirmations).await,
        None => Ok(false),
    }
}

async fn fallback_per_item<B: SteamClient>(
    inner: &Inner<B>,
    op: &str,
    hash: &str,
    device_id: &str,
    time: u32,
    confirmations: &[Confirmation],
) -> Result<bool, ConfirmationError> {
    let steam_id = inner.user.steam_id();
    for confirmation in confirmations {
        let url = Url::parse(&format!(
            "{CONFIRMATIONS_AJAXOP_URL}?a={steam_id}&cid={}&ck={}&k={}&l=english&m=android&op={op}&p={}&t={time}&tag=conf",
            confirmation.id,
            url_encode(&confirmation.key),
            url_encode(hash),
            url_encode(device_id),
        ))
        .map_err(InternalError::from)?;

        let mut executor = Executor::new(inner, STEAM_COMMUNITY_HOST);
        let response: Option<BooleanResponse> = executor.get_json(url).await?;
        if response.is_none() {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_kind_rejects_the_unknown_value_four() {
        assert_eq!(ConfirmationKind::parse("4"), None);
    }

    #[test]
    fn confirmation_kind_parses_known_values() {
        assert_eq!(ConfirmationKind::parse("1"), Some(ConfirmationKind::Generic));
        assert_eq!(ConfirmationKind::parse("2"), Some(ConfirmationKind::Trade));
        assert_eq!(ConfirmationKind::parse("3"), Some(ConfirmationKind::Market));
        assert_eq!(ConfirmationKind::parse("5"), Some(ConfirmationKind::PhoneNumberChange));
        assert_eq!(ConfirmationKind::parse("6"), Some(ConfirmationKind::AccountRecovery));
    }

    #[test]
    fn confirmation_kind_rejects_garbage() {
        assert_eq!(ConfirmationKind::parse("not-a-number"), None);
    }
}
