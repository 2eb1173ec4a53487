use std::{error::Error, sync::Arc};

use base64::Engine;
use log::{debug, warn};
use snafu::{ResultExt, Snafu};
use url::Url;

use crate::auth::client::{AuthError, Authenticator};
use crate::auth::models::Credentials;
use crate::config::models::Settings;
use crate::multipart::encoder::FormData;
use crate::transport::client::{HttpTransport, Transport, TransportError};
use crate::transport::models::PostRequest;

use super::models::*;

const PROXY_HEADER: &str = "X-CloudPrint-Proxy";
const AUTHORIZATION_HEADER: &str = "Authorization";
const EMPTY_BODY_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const SHARE_ROLE: &str = "APPENDER";

/// Client for the cloud print service.
///
/// Every operation except [`submit`](Self::submit) reports failure as a
/// response with `success == false` and never returns an error. Clones share
/// the transport and the cached login token.
#[derive(Clone)]
pub struct CloudPrintClient {
    auth: Authenticator,
    transport: Arc<dyn Transport>,
    base_uri: Url,
}

impl CloudPrintClient {
    pub fn new(username: &str, password: &str, source: Option<&str>, base_uri: Option<Url>) -> Result<Self, TransportError> {
        let mut settings = Settings::new(username, password).with_source(source);
        if let Some(base_uri) = base_uri {
            settings = settings.with_base_uri(base_uri);
        }
        Self::from_settings(&settings)
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(settings.timeout)?;
        Ok(Self::with_transport(settings, Arc::new(transport)))
    }

    pub fn with_transport(settings: &Settings, transport: Arc<dyn Transport>) -> Self {
        let auth = Authenticator::new(
            Credentials::new(settings.username.as_str(), settings.password.as_str()),
            settings.source.clone(),
            settings.login_uri.clone(),
            transport.clone(),
        );
        Self { auth, transport, base_uri: settings.base_uri.clone() }
    }

    pub fn source(&self) -> &str {
        self.auth.source()
    }

    /// Logs in now instead of on the first operation.
    pub fn authenticate(&self) -> Result<String, AuthError> {
        self.auth.ensure_token()
    }

    // ////////// //
    // Operations //
    // ////////// //

    /// Submits a print job.
    ///
    /// Fails with [`RequestError`] before any network activity when the content
    /// or content type is missing.
    pub fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, RequestError> {
        let form = build_submit_form(request)?;
        Ok(self.dispatch("submit", Some(form)))
    }

    /// Shares a printer with `email` as an appender.
    pub fn share_printer(&self, printer_id: &str, email: &str, notify: bool) -> GenericResponse {
        let mut form = FormData::new();
        form.add_field("printerid", printer_id)
            .add_field("email", email)
            .add_field("role", SHARE_ROLE)
            .add_field("skip_notification", (!notify).to_string());
        self.dispatch("share", Some(form))
    }

    pub fn unshare_printer(&self, printer_id: &str, email: &str) -> GenericResponse {
        let mut form = FormData::new();
        form.add_field("printerid", printer_id)
            .add_field("email", email);
        self.dispatch("unshare", Some(form))
    }

    /// Lists jobs, optionally only those of one printer.
    pub fn jobs(&self, printer_id: Option<&str>) -> JobsResponse {
        let mut form = FormData::new();
        form.add_optional_field("printerid", printer_id);
        self.dispatch("jobs", non_empty(form))
    }

    pub fn delete_job(&self, job_id: &str) -> GenericResponse {
        let mut form = FormData::new();
        form.add_field("jobid", job_id);
        self.dispatch("deletejob", Some(form))
    }

    pub fn printer_details(&self, printer_id: &str, include_connection_status: bool) -> PrinterDetailsResponse {
        let mut form = FormData::new();
        form.add_field("printerid", printer_id);
        if include_connection_status {
            form.add_field("printer_connection_status", "true");
        }
        self.dispatch("printer", Some(form))
    }

    /// Searches the printers visible to the account.
    pub fn search(&self, query: Option<&str>, connection_status: Option<ConnectionStatus>) -> SearchResponse {
        let mut form = FormData::new();
        form.add_optional_field("q", query);
        if let Some(status) = connection_status {
            form.add_field("connection_status", status.as_str());
        }
        self.dispatch("search", non_empty(form))
    }

    // //////////////// //
    // Async operations //
    // //////////////// //

    pub async fn submit_async(&self, request: SubmitRequest) -> Result<SubmitResponse, RequestError> {
        let client = self.clone();
        match tokio::task::spawn_blocking(move || client.submit(&request)).await {
            Ok(result) => result,
            Err(e) => Ok(SubmitResponse::failure(worker_failure(&e))),
        }
    }

    pub async fn share_printer_async(&self, printer_id: String, email: String, notify: bool) -> GenericResponse {
        let client = self.clone();
        run_blocking(move || client.share_printer(&printer_id, &email, notify)).await
    }

    pub async fn unshare_printer_async(&self, printer_id: String, email: String) -> GenericResponse {
        let client = self.clone();
        run_blocking(move || client.unshare_printer(&printer_id, &email)).await
    }

    pub async fn jobs_async(&self, printer_id: Option<String>) -> JobsResponse {
        let client = self.clone();
        run_blocking(move || client.jobs(printer_id.as_deref())).await
    }

    pub async fn delete_job_async(&self, job_id: String) -> GenericResponse {
        let client = self.clone();
        run_blocking(move || client.delete_job(&job_id)).await
    }

    pub async fn printer_details_async(&self, printer_id: String, include_connection_status: bool) -> PrinterDetailsResponse {
        let client = self.clone();
        run_blocking(move || client.printer_details(&printer_id, include_connection_status)).await
    }

    pub async fn search_async(&self, query: Option<String>, connection_status: Option<ConnectionStatus>) -> SearchResponse {
        let client = self.clone();
        run_blocking(move || client.search(query.as_deref(), connection_status)).await
    }

    // ////////// //
    // Dispatcher //
    // ////////// //

    /// Sends `operation` and decodes the reply, folding every failure into
    /// `R::failure`.
    fn dispatch<R: ApiResponse>(&self, operation: &str, form: Option<FormData>) -> R {
        match self.try_dispatch(operation, form) {
            Ok(response) => response,
            Err(e) => {
                let message = error_chain(&e);
                warn!("Cloud print operation '{operation}' failed: {message}");
                R::failure(message)
            }
        }
    }

    fn try_dispatch<R: ApiResponse>(&self, operation: &str, form: Option<FormData>) -> Result<R, DispatchError> {
        let token = self.auth.ensure_token().context(AuthSnafu)?;
        let url = self.operation_url(operation)?;

        let (content_type, body) = match form {
            Some(form) => (form.content_type(), form.into_bytes()),
            None => (EMPTY_BODY_CONTENT_TYPE.to_owned(), Vec::new()),
        };

        debug!("Dispatching '{operation}' to {url}");
        let request = PostRequest {
            url,
            headers: vec![
                (PROXY_HEADER.to_owned(), self.auth.source().to_owned()),
                (AUTHORIZATION_HEADER.to_owned(), format!("GoogleLogin auth={token}")),
            ],
            content_type,
            body,
        };

        let raw = self.transport.post(request).context(SendSnafu { operation })?;
        serde_json::from_str(&raw).context(DecodeSnafu { operation })
    }

    fn operation_url(&self, operation: &str) -> Result<Url, DispatchError> {
        let base = self.base_uri.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/{operation}")).context(OperationUrlSnafu { operation })
    }
}

fn build_submit_form(request: &SubmitRequest) -> Result<FormData, RequestError> {
    let content_type = request.content_type.as_deref()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| MissingContentTypeSnafu.build())?;
    let content = request.content.as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| MissingContentSnafu.build())?;

    let b64 = base64::engine::general_purpose::STANDARD.encode(content);

    let mut form = FormData::new();
    form.add_field("printerid", request.printer_id.as_str())
        .add_field("contentType", content_type)
        .add_field("content", format!("data:{content_type};base64,{b64}"))
        .add_optional_field("title", request.title.as_deref())
        .add_optional_field("capabilities", request.capabilities.as_deref())
        .add_optional_field("tag", request.tag.as_deref());
    Ok(form)
}

fn non_empty(form: FormData) -> Option<FormData> {
    (!form.is_empty()).then_some(form)
}

async fn run_blocking<R, F>(f: F) -> R
where
    R: ApiResponse,
    F: FnOnce() -> R + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(response) => response,
        Err(e) => R::failure(worker_failure(&e)),
    }
}

fn worker_failure(e: &tokio::task::JoinError) -> String {
    format!("Cloud print worker did not complete: {e}")
}

/// Renders an error and its sources on one line.
fn error_chain(e: &dyn Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

// ////// //
// Errors //
// ////// //

/// Malformed submit input. This is the only error a caller sees directly.
#[derive(Debug, Snafu)]
pub enum RequestError {
    #[snafu(display("Invalid parameters: a content type must be specified"))]
    MissingContentType,

    #[snafu(display("Invalid parameters: document content must be specified"))]
    MissingContent,
}

#[derive(Debug, Snafu)]
enum DispatchError {
    #[snafu(display("Authentication failed"))]
    Auth { source: AuthError },

    #[snafu(display("Invalid address for operation '{operation}'"))]
    OperationUrl { operation: String, source: url::ParseError },

    #[snafu(display("Unable to reach the cloud print service for '{operation}'"))]
    Send { operation: String, source: TransportError },

    #[snafu(display("Unexpected response to '{operation}'"))]
    Decode { operation: String, source: serde_json::Error },
}
