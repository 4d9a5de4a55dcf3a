//! Request executor (C6): the one retry/session-aware template every HTTP call in this crate
//! goes through. Implemented as an explicit state machine per design notes §9
//! (`NeedCheck -> NeedRefresh -> Dispatch -> Classify -> Retry | Done`) instead of the origin's
//! recursive decremented-counter retries, so the retry budget is visibly bounded by a loop
//! rather than by call depth.

use std::time::{Duration, Instant};

use reqwest::{Method, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::bot::SteamClient;
use crate::client::MobileClient;
use crate::errors::InternalError;
use crate::session::{is_session_expired, is_session_expired_uri, is_self_profile_uri, refresh_session};
use crate::{Inner, SessionIdCasing};

/// Ordered `(name, value)` form-body pairs. Chosen as the one body shape the executor works
/// with (spec §3 mentions "map or ordered list of pairs" for POST/JSON; an ordered list is a
/// strict superset of a map for our purposes, and it's the shape session-id stamping needs to
/// mutate in place — remove any prior pair under that field name, then append fresh).
pub(crate) type FormBody = Vec<(String, String)>;

fn stamp_session_id(body: &mut FormBody, casing: SessionIdCasing, session_id: &str) {
    let Some(field) = casing.field_name() else { return };
    body.retain(|(name, _)| name != field);
    body.push((field.to_string(), session_id.to_string()));
}

enum Step {
    NeedCheck,
    NeedRefresh,
    Dispatch,
    Classify(Response),
    Retry,
    Done(Option<Response>),
}

pub(crate) struct Executor<'a, B> {
    inner: &'a Inner<B>,
    service: &'static str,
    max_tries: u32,
    preemptive: bool,
    expect_self_profile: bool,
}

impl<'a, B> Executor<'a, B>
where
    B: SteamClient,
{
    pub(crate) fn new(inner: &'a Inner<B>, service: &'static str) -> Self {
        Self {
            inner,
            service,
            max_tries: inner.ctx.config.max_tries,
            preemptive: inner.ctx.config.check_session_preemptively,
            expect_self_profile: false,
        }
    }

    /// Marks this call as one that is *expected* to terminate on the user's own profile page,
    /// so the self-profile classifier doesn't treat that as Steam's quirky misrouting (spec
    /// §4.5: "Steam occasionally returns the user's own profile ... for unrelated requests").
    pub(crate) fn expecting_self_profile(mut self) -> Self {
        self.expect_self_profile = true;
        self
    }

    async fn wait_for_initialization(&self) -> bool {
        if self.inner.session.is_initialized() {
            return true;
        }
        let deadline = Instant::now() + self.inner.ctx.config.connection_timeout;
        loop {
            if self.inner.session.is_initialized() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    /// The executor primitive. Returns `Ok(None)` for every absence path spec §7 describes
    /// (invalid input already rejected by the caller, transport failure, retry exhaustion,
    /// refresh failure); `Ok(Some(response))` on a response that classified as final.
    async fn execute(&mut self, url: Url, method: Method, mut body: Option<FormBody>, casing: SessionIdCasing) -> Result<Option<Response>, InternalError> {
        if url.host_str().is_none() {
            return Err(InternalError::GeneralFailure("request url has no host".to_string()));
        }
        if self.max_tries == 0 {
            return Ok(None);
        }

        let mut step = Step::NeedCheck;
        loop {
            step = match step {
                Step::NeedCheck => {
                    if self.preemptive {
                        match is_session_expired(self.inner).await? {
                            Some(true) => Step::NeedRefresh,
                            _ => Step::Dispatch,
                        }
                    } else {
                        self.inner.session.block_until_quiescent().await;
                        Step::Dispatch
                    }
                }
                Step::NeedRefresh => {
                    if self.max_tries == 0 {
                        return Ok(None);
                    }
                    self.max_tries -= 1;
                    if refresh_session(self.inner).await {
                        Step::Dispatch
                    } else {
                        return Ok(None);
                    }
                }
                Step::Dispatch => {
                    if !self.wait_for_initialization().await {
                        warn!(host = url.host_str(), "session never became initialized within the connection timeout");
                        return Ok(None);
                    }

                    if let Some(body) = body.as_mut() {
                        if casing.field_name().is_some() {
                            let host = url.host_str().unwrap_or_default();
                            let Some(session_id) = self.inner.client.cookie(host, "sessionid") else {
                                return Err(InternalError::MissingSessionId);
                            };
                            stamp_session_id(body, casing, &session_id);
                        }
                    }

                    let client = &self.inner.client;
                    let method = method.clone();
                    let url = url.clone();
                    let body = body.clone();
                    let response = self
                        .inner
                        .ctx
                        .limiter
                        .limit(self.service, || client.send(url, method, body.as_ref()))
                        .await;

                    match response {
                        Ok(response) => Step::Classify(response),
                        Err(e) => {
                            debug!(error = %e, "request transport failure");
                            return Ok(None);
                        }
                    }
                }
                Step::Classify(response) => {
                    let location = MobileClient::location_of(&response);
                    let expired = location.as_ref().is_some_and(is_session_expired_uri);
                    let self_profile = !self.expect_self_profile
                        && location.as_ref().is_some_and(|uri| {
                            is_self_profile_uri(uri, self.inner.user.steam_id(), self.inner.user.vanity_url().as_deref())
                        });

                    if expired {
                        Step::NeedRefresh
                    } else if self_profile {
                        Step::Retry
                    } else {
                        Step::Done(Some(response))
                    }
                }
                Step::Retry => {
                    if self.max_tries == 0 {
                        return Ok(None);
                    }
                    self.max_tries -= 1;
                    Step::NeedCheck
                }
                Step::Done(response) => return Ok(response),
            };
        }
    }

    pub(crate) async fn get_html(&mut self, url: Url) -> Result<Option<String>, InternalError> {
        match self.execute(url, Method::GET, None, SessionIdCasing::Omit).await? {
            Some(response) => Ok(Some(response.text().await?)),
            None => Ok(None),
        }
    }

    pub(crate) async fn get_json<Resp: DeserializeOwned>(&mut self, url: Url) -> Result<Option<Resp>, InternalError> {
        match self.execute(url, Method::GET, None, SessionIdCasing::Omit).await? {
            Some(response) => Ok(Some(response.json::<Resp>().await?)),
            None => Ok(None),
        }
    }

    /// No XML parsing crate is pulled into the dependency stack: nothing this spec actually
    /// implements needs structured XML (inventory/trade parsing is a Non-goal), so this returns
    /// the raw body for a future caller to parse.
    pub(crate) async fn get_xml(&mut self, url: Url) -> Result<Option<String>, InternalError> {
        match self.execute(url, Method::GET, None, SessionIdCasing::Omit).await? {
            Some(response) => Ok(Some(response.text().await?)),
            None => Ok(None),
        }
    }

    pub(crate) async fn head(&mut self, url: Url) -> Result<bool, InternalError> {
        Ok(self.execute(url, Method::HEAD, None, SessionIdCasing::Omit).await?.is_some())
    }

    pub(crate) async fn post_html(&mut self, url: Url, body: FormBody, casing: SessionIdCasing) -> Result<Option<String>, InternalError> {
        match self.execute(url, Method::POST, Some(body), casing).await? {
            Some(response) => Ok(Some(response.text().await?)),
            None => Ok(None),
        }
    }

    pub(crate) async fn post_json<Resp: DeserializeOwned>(
        &mut self,
        url: Url,
        body: FormBody,
        casing: SessionIdCasing,
    ) -> Result<Option<Resp>, InternalError> {
        match self.execute(url, Method::POST, Some(body), casing).await? {
            Some(response) => Ok(Some(response.json::<Resp>().await?)),
            None => Ok(None),
        }
    }

    pub(crate) async fn post_void(&mut self, url: Url, body: FormBody, casing: SessionIdCasing) -> Result<bool, InternalError> {
        Ok(self.execute(url, Method::POST, Some(body), casing).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionIdCasing;

    #[test]
    fn stamp_session_id_replaces_prior_pair_under_the_chosen_casing() {
        let mut body: FormBody = vec![("sessionid".to_string(), "stale".to_string()), ("a".to_string(), "1".to_string())];
        stamp_session_id(&mut body, SessionIdCasing::Lower, "fresh");
        assert_eq!(
            body,
            vec![("a".to_string(), "1".to_string()), ("sessionid".to_string(), "fresh".to_string())]
        );
    }

    #[test]
    fn stamp_session_id_is_a_no_op_when_casing_is_omit() {
        let mut body: FormBody = vec![("a".to_string(), "1".to_string())];
        stamp_session_id(&mut body, SessionIdCasing::Omit, "fresh");
        assert_eq!(body, vec![("a".to_string(), "1".to_string())]);
    }
}
