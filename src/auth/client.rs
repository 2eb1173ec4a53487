use std::sync::{Arc, OnceLock};

use log::{debug, info};
use snafu::{ResultExt, Snafu};
use url::Url;

use crate::transport::client::{Transport, TransportError};

use super::models::Credentials;

const ACCOUNT_TYPE: &str = "HOSTED_OR_GOOGLE";
const SERVICE_NAME: &str = "cloudprint";
const AUTH_KEY: &str = "Auth";

/// Obtains the login token once and hands out the cached copy afterwards.
///
/// Clones share the same token slot. There is no expiry handling: a token the
/// server later rejects stays cached until the client is dropped.
#[derive(Clone)]
pub struct Authenticator {
    credentials: Credentials,
    source: String,
    login_uri: Url,
    transport: Arc<dyn Transport>,
    token: Arc<OnceLock<String>>,
}

impl Authenticator {
    pub fn new(credentials: Credentials, source: String, login_uri: Url, transport: Arc<dyn Transport>) -> Self {
        Self { credentials, source, login_uri, transport, token: Arc::new(OnceLock::new()) }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn cached_token(&self) -> Option<&str> {
        self.token.get().map(String::as_str)
    }

    /// Returns the cached token, logging in first if there is none yet.
    ///
    /// Concurrent first calls may each log in; whichever token is stored first
    /// is the one every caller gets back.
    pub fn ensure_token(&self) -> Result<String, AuthError> {
        if let Some(token) = self.token.get() {
            return Ok(token.clone());
        }

        let url = self.build_login_url();
        debug!("Logging in to {} as {}", self.login_uri, self.credentials.username);

        let body = self.transport.get(&url).context(LoginSnafu { username: self.credentials.username.as_str() })?;
        let token = parse_auth_token(&body).ok_or_else(|| MissingTokenSnafu { username: self.credentials.username.as_str() }.build())?;

        info!("Obtained print service token for {}", self.credentials.username);
        Ok(self.token.get_or_init(|| token).clone())
    }

    fn build_login_url(&self) -> Url {
        let mut url = self.login_uri.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("accountType", ACCOUNT_TYPE)
            .append_pair("Email", &self.credentials.username)
            .append_pair("Passwd", &self.credentials.password)
            .append_pair("service", SERVICE_NAME)
            .append_pair("source", &self.source);
        url
    }
}

/// Extracts the `Auth` value from a newline separated `key=value` login body.
pub fn parse_auth_token(body: &str) -> Option<String> {
    body.lines()
        .filter_map(|line| line.split_once('='))
        .filter(|(key, _)| key.trim() == AUTH_KEY)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
        .last()
        .map(String::from)
}

// ////// //
// Errors //
// ////// //

#[derive(Debug, Snafu)]
pub enum AuthError {
    #[snafu(display("Login request for {username} failed"))]
    Login { username: String, source: TransportError },

    #[snafu(display("Login response for {username} did not contain an Auth token"))]
    MissingToken { username: String },
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use crate::transport::models::PostRequest;

    use super::*;

    struct LoginStub {
        body: Option<String>,
        requests: Mutex<Vec<Url>>,
    }

    impl LoginStub {
        fn new(body: Option<&str>) -> Arc<Self> {
            Arc::new(LoginStub { body: body.map(String::from), requests: Mutex::new(Vec::new()) })
        }
    }

    impl Transport for LoginStub {
        fn get(&self, url: &Url) -> Result<String, TransportError> {
            self.requests.lock().unwrap().push(url.clone());
            match &self.body {
                Some(body) => Ok(body.clone()),
                None => snafu::whatever!("connection refused"),
            }
        }

        fn post(&self, _request: PostRequest) -> Result<String, TransportError> {
            panic!("login never posts");
        }
    }

    fn authenticator(stub: Arc<LoginStub>) -> Authenticator {
        Authenticator::new(
            Credentials::new("alice@example.com", "s3cret&pw"),
            "test-app".into(),
            Url::parse("https://login.test/accounts/ClientLogin").unwrap(),
            stub,
        )
    }

    #[test]
    fn test_parse_auth_token() {
        assert_eq!(parse_auth_token("Auth=abc123\nLSID=xyz\n").as_deref(), Some("abc123"));
        assert_eq!(parse_auth_token("SID=1\r\nAuth=tok\r\n").as_deref(), Some("tok"));
        assert_eq!(parse_auth_token("SID=1\nLSID=2\n"), None);
        assert_eq!(parse_auth_token("Auth=\n"), None);
        assert_eq!(parse_auth_token(""), None);
    }

    #[test]
    fn test_token_is_fetched_once_and_cached() {
        let stub = LoginStub::new(Some("Auth=abc123\nLSID=xyz\n"));
        let auth = authenticator(stub.clone());

        assert_eq!(auth.ensure_token().unwrap(), "abc123");
        assert_eq!(auth.ensure_token().unwrap(), "abc123");
        assert_eq!(auth.cached_token(), Some("abc123"));
        assert_eq!(stub.requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_clones_share_the_token() {
        let stub = LoginStub::new(Some("Auth=shared\n"));
        let auth = authenticator(stub.clone());
        let other = auth.clone();

        auth.ensure_token().unwrap();
        assert_eq!(other.ensure_token().unwrap(), "shared");
        assert_eq!(stub.requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_login_url_carries_account_query() {
        let stub = LoginStub::new(Some("Auth=t\n"));
        let auth = authenticator(stub.clone());
        auth.ensure_token().unwrap();

        let url = stub.requests.lock().unwrap()[0].clone();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![
            ("accountType".to_string(), "HOSTED_OR_GOOGLE".to_string()),
            ("Email".to_string(), "alice@example.com".to_string()),
            ("Passwd".to_string(), "s3cret&pw".to_string()),
            ("service".to_string(), "cloudprint".to_string()),
            ("source".to_string(), "test-app".to_string()),
        ]);
        assert_eq!(url.path(), "/accounts/ClientLogin");
    }

    #[test]
    fn test_missing_auth_key_is_an_error() {
        let stub = LoginStub::new(Some("Error=BadAuthentication\n"));
        let auth = authenticator(stub.clone());

        let err = auth.ensure_token().unwrap_err();
        assert!(matches!(err, AuthError::MissingToken { .. }));
        assert!(auth.cached_token().is_none());

        // Nothing cached, so the next call tries again.
        let _ = auth.ensure_token();
        assert_eq!(stub.requests.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_transport_failure_is_a_login_error() {
        let auth = authenticator(LoginStub::new(None));
        let err = auth.ensure_token().unwrap_err();
        assert!(matches!(err, AuthError::Login { .. }));
    }
}
