use std::time::Duration;

use log::debug;
use snafu::{OptionExt, ResultExt, Snafu};
use url::Url;

use super::models::PostRequest;

/// Sends raw requests on behalf of the client and returns the response body.
///
/// Implementations must treat a non-success HTTP status as an error.
pub trait Transport: Send + Sync {
    fn get(&self, url: &Url) -> Result<String, TransportError>;

    fn post(&self, request: PostRequest) -> Result<String, TransportError>;
}

/// Blocking `reqwest` transport.
///
/// The blocking client owns a private runtime, which tokio refuses to create
/// or shut down on a runtime worker thread. Both happen on a plain thread when
/// a runtime is current, so the transport can be built and dropped from async
/// code.
pub struct HttpTransport {
    http: Option<reqwest::blocking::Client>,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let http = if tokio::runtime::Handle::try_current().is_ok() {
            std::thread::scope(|scope| scope.spawn(|| Self::build(timeout)).join())
                .map_err(|_| TransportError::Spawn)??
        } else {
            Self::build(timeout)?
        };
        Ok(Self { http: Some(http) })
    }

    fn build(timeout: Option<Duration>) -> Result<reqwest::blocking::Client, TransportError> {
        let mut builder = reqwest::blocking::Client::builder()
            .user_agent(format!("cloudprint-client/{}", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        builder.build().context(BuildSnafu)
    }

    fn http(&self) -> Result<&reqwest::blocking::Client, TransportError> {
        self.http.as_ref().context(ReleasedSnafu)
    }

    fn read_body(url: &Url, response: reqwest::blocking::Response) -> Result<String, TransportError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return StatusSnafu { url: url.as_str(), status: status.as_u16(), body }.fail();
        }

        response.text().context(ReadSnafu { url: url.as_str() })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &Url) -> Result<String, TransportError> {
        let response = self.http()?.get(url.clone())
            .send()
            .context(SendSnafu { url: url.as_str() })?;
        Self::read_body(url, response)
    }

    fn post(&self, request: PostRequest) -> Result<String, TransportError> {
        debug!("POST {} ({} bytes, {})", request.url, request.body.len(), request.content_type);

        let mut builder = self.http()?.post(request.url.clone())
            .header(reqwest::header::CONTENT_TYPE, &request.content_type);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.body(request.body)
            .send()
            .context(SendSnafu { url: request.url.as_str() })?;
        Self::read_body(&request.url, response)
    }
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        if let Some(http) = self.http.take() {
            if tokio::runtime::Handle::try_current().is_ok() {
                std::thread::spawn(move || drop(http));
            }
        }
    }
}

// ////// //
// Errors //
// ////// //

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TransportError {
    #[snafu(display("Could not create HTTP client"))]
    Build { source: reqwest::Error },

    #[snafu(display("HTTP client thread panicked while starting"))]
    Spawn,

    #[snafu(display("HTTP client was already released"))]
    Released,

    #[snafu(display("Request to {url} failed"))]
    Send { url: String, source: reqwest::Error },

    #[snafu(display("Could not read response body from {url}"))]
    Read { url: String, source: reqwest::Error },

    #[snafu(display("HTTP {status} from {url}"))]
    Status { url: String, status: u16, body: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error + Send + Sync>, Some)))]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}
