use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use proxied::{Proxy, ProxifyClient};
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    redirect::Policy,
    Client, IntoUrl, Method, Response, Url,
};
use serde::Serialize;
use tracing::{debug, trace};

use crate::errors::InternalError;
use crate::MOBILE_REFERER;

/// Cookies are scoped per Steam host (community/store/help), since the spec calls for
/// installing the *same* session cookies independently on each of the three domains. A single
/// flat `name -> value` map per host is all Steam's web surface actually needs; we don't track
/// expiry, `Secure`/`HttpOnly` flags, or path scoping beyond `/`, since nothing here ever sets a
/// cookie on any other path.
#[derive(Debug, Default)]
pub struct CookieJar {
    by_host: HashMap<String, HashMap<String, String>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, host: &str, name: impl Into<String>, value: impl Into<String>) {
        self.by_host
            .entry(host.to_string())
            .or_default()
            .insert(name.into(), value.into());
    }

    pub fn get(&self, host: &str, name: &str) -> Option<String> {
        self.by_host.get(host)?.get(name).cloned()
    }

    /// Absorbs `Set-Cookie` headers from a response into the jar, scoped to the response's own
    /// host (Steam never sets a cookie for a domain other than the one that's replying).
    fn absorb_response_cookies(&mut self, response: &Response) {
        let Some(host) = response.url().host_str().map(str::to_owned) else {
            return;
        };
        for cookie in response.cookies() {
            trace!(host, name = cookie.name(), "storing cookie from response");
            self.set(&host, cookie.name().to_string(), cookie.value().to_string());
        }
    }

    /// Renders the `Cookie:` header value for a single host.
    fn header_value(&self, host: &str) -> String {
        match self.by_host.get(host) {
            Some(cookies) => cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
            None => String::new(),
        }
    }
}

/// Low-level HTTP client impersonating the Steam mobile app: fixed user agent, mobile-client
/// headers, and a hand-rolled per-host cookie jar (reqwest's built-in jar doesn't let us read
/// cookies back out, which the session manager and executor both need to do).
#[derive(Debug)]
pub struct MobileClient {
    pub(crate) inner: Client,
    pub(crate) cookies: Arc<RwLock<CookieJar>>,
}

impl MobileClient {
    pub fn new(proxy: Option<Proxy>) -> Self {
        Self {
            inner: Self::build_http_client(proxy),
            cookies: Arc::new(RwLock::new(Self::with_mobile_cookies())),
        }
    }

    fn with_mobile_cookies() -> CookieJar {
        let mut jar = CookieJar::new();
        for host in [crate::STEAM_COMMUNITY_HOST, crate::STEAM_STORE_HOST, crate::STEAM_HELP_HOST] {
            jar.set(host, "Steam_Language", "english");
            jar.set(host, "mobileClient", "android");
            jar.set(host, "mobileClientVersion", "0 (2.1.3)");
        }
        jar
    }

    fn build_http_client(proxy: Option<Proxy>) -> Client {
        let user_agent = "Dalvik/2.1.0 (Linux; U; Android 9; Valve Steam App Version/3)";
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("text/javascript, text/html, application/xml, text/xml, */*"),
        );
        headers.insert(reqwest::header::REFERER, HeaderValue::from_static(MOBILE_REFERER));
        headers.insert(
            "X-Requested-With",
            HeaderValue::from_static("com.valvesoftware.android.steam.community"),
        );

        proxy
            .proxify(
                Client::builder()
                    .user_agent(user_agent)
                    .redirect(Policy::none())
                    .default_headers(headers)
                    .referer(false),
            )
            .build()
            .expect("static client configuration is always valid")
    }

    pub(crate) fn cookie(&self, host: &str, name: &str) -> Option<String> {
        self.cookies.read().get(host, name)
    }

    pub(crate) fn set_cookie(&self, host: &str, name: &str, value: &str) {
        self.cookies.write().set(host, name, value);
    }

    /// Sends one request with no session awareness and no retries: the raw primitive every
    /// other layer (session checks, the executor, the auth handshake) is built on. Cookies for
    /// the target host are attached from the jar before sending and absorbed back in after.
    ///
    /// `Policy::none()` means we see the *first* redirect response rather than reqwest silently
    /// following it — the session manager and executor both need the `Location` header on that
    /// first hop to classify where Steam is sending us.
    pub(crate) async fn send<T, U>(&self, url: U, method: Method, form_body: Option<&T>) -> Result<Response, InternalError>
    where
        T: Serialize,
        U: IntoUrl,
    {
        let url = url.into_url()?;
        let host = url.host_str().unwrap_or_default().to_string();

        let mut headers = HeaderMap::new();
        let cookie_header = self.cookies.read().header_value(&host);
        if !cookie_header.is_empty() {
            headers.insert(reqwest::header::COOKIE, cookie_header.parse().unwrap());
        }

        let mut builder = self.inner.request(method, url).headers(headers);
        if let Some(body) = form_body {
            let encoded = serde_urlencoded::to_string(body)?;
            debug!(body = %encoded, "request body");
            builder = builder
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded; charset=UTF-8")
                .body(encoded);
        }

        let response = builder.send().await?;
        debug!(status = %response.status(), url = %response.url(), "response");
        self.cookies.write().absorb_response_cookies(&response);
        Ok(response)
    }

    /// Pulls the `Location` header off a response that is (or might be) a redirect. The session
    /// manager and executor both classify on this without ever letting reqwest auto-follow it.
    pub(crate) fn location_of(response: &Response) -> Option<Url> {
        response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|raw| Url::parse(raw).ok().or_else(|| response.url().join(raw).ok()))
    }
}
