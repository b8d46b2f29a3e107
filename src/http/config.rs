use http::Uri;
use std::env::{self, VarError};
use std::time::Duration;

/// Settings for the client talking to the identity provider. Timeouts are unset by default,
/// leaving the token refresh call unbounded.
#[derive(Debug, Default, Clone)]
pub struct HttpConfig {
    pub(crate) timeout: Option<Duration>,
    pub(crate) conn_timeout: Option<Duration>,
    pub(crate) proxy: ProxyConfig,
}

impl HttpConfig {
    pub fn new(
        timeout: Option<Duration>,
        conn_timeout: Option<Duration>,
        proxy: ProxyConfig,
    ) -> Self {
        Self {
            timeout,
            conn_timeout,
            proxy,
        }
    }
}

/// Checked in this order when no proxy is configured explicitly.
const PROXY_ENV_NAMES: [&str; 2] = ["HTTPS_PROXY", "HTTP_PROXY"];
const PROXY_SCHEMES: [&str; 4] = ["http", "https", "socks5", "socks5h"];

#[derive(thiserror::Error, Debug)]
pub enum ProxyError {
    #[error("invalid proxy url `{0}`: `{1}`")]
    InvalidUrl(String, String),
}

/// Proxy the APS token requests go through, `None` for a direct connection.
///
/// Accepts `http`, `https`, `socks5` and `socks5h` urls with a host, credentials and port
/// being optional.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct ProxyConfig {
    url: Option<String>,
}

impl ProxyConfig {
    /// An empty `proxy_url` means no proxy.
    pub fn new(proxy_url: &str) -> Result<Self, ProxyError> {
        Ok(Self {
            url: parse_proxy_url(proxy_url)?,
        })
    }

    pub fn url(&self) -> Option<String> {
        self.url.clone()
    }

    /// Falls back to `HTTPS_PROXY` and then `HTTP_PROXY` when no proxy was configured.
    pub fn with_env_fallback(self) -> Result<Self, ProxyError> {
        self.with_fallback_from(env::var)
    }

    fn with_fallback_from<F>(self, lookup: F) -> Result<Self, ProxyError>
    where
        F: Fn(&'static str) -> Result<String, VarError>,
    {
        if self.url.is_some() {
            return Ok(self);
        }

        match PROXY_ENV_NAMES.into_iter().find_map(|name| lookup(name).ok()) {
            Some(value) => Self::new(value.trim()),
            None => Ok(self),
        }
    }
}

fn parse_proxy_url(value: &str) -> Result<Option<String>, ProxyError> {
    if value.is_empty() {
        return Ok(None);
    }

    let invalid = |reason: &str| ProxyError::InvalidUrl(value.to_string(), reason.to_string());

    let uri = value
        .parse::<Uri>()
        .map_err(|err| invalid(&err.to_string()))?;
    if uri.host().is_none() {
        return Err(invalid("missing proxy host"));
    }
    match uri.scheme_str() {
        Some(scheme) if PROXY_SCHEMES.contains(&scheme) => Ok(Some(value.to_string())),
        _ => Err(invalid("expected an http, https or socks5 proxy")),
    }
}
