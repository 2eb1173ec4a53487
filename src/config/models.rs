use std::{fmt, time::Duration};

use serde_derive::Deserialize;
use url::Url;

pub const DEFAULT_SOURCE: &str = "Google-JS";
pub const DEFAULT_BASE_URI: &str = "https://www.google.com/cloudprint/";
pub const DEFAULT_LOGIN_URI: &str = "https://www.google.com/accounts/ClientLogin";

// The env source splits on `_`, so `CLOUDPRINT_BASEURI` arrives as `baseuri`.
// Multi-word fields need a matching alias.

#[derive(Clone, Deserialize)]
pub struct Settings {
    pub username: String,
    pub password: String,
    pub source: String,
    #[serde(alias = "baseuri")]
    pub base_uri: Url,
    #[serde(alias = "loginuri")]
    pub login_uri: Url,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl Settings {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Settings {
            username: username.into(),
            password: password.into(),
            source: DEFAULT_SOURCE.to_owned(),
            base_uri: Url::parse(DEFAULT_BASE_URI).expect("default base URI is valid"),
            login_uri: Url::parse(DEFAULT_LOGIN_URI).expect("default login URI is valid"),
            timeout: None,
        }
    }

    /// Blank values fall back to [`DEFAULT_SOURCE`].
    pub fn with_source(mut self, source: Option<&str>) -> Self {
        self.source = source.filter(|s| !s.trim().is_empty()).unwrap_or(DEFAULT_SOURCE).to_owned();
        self
    }

    pub fn with_base_uri(mut self, base_uri: Url) -> Self {
        self.base_uri = base_uri;
        self
    }

    pub fn with_login_uri(mut self, login_uri: Url) -> Self {
        self.login_uri = login_uri;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("source", &self.source)
            .field("base_uri", &self.base_uri.as_str())
            .field("login_uri", &self.login_uri.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}
