//! Client for the cloud print job submission service.
//!
//! Logs in once with account credentials, caches the returned token and
//! sends every operation as an authenticated multipart POST. Runtime failures
//! come back as responses with `success == false`; only a malformed
//! [`SubmitRequest`] is reported as an error.

pub mod auth;
pub mod cloudprint_client;
pub mod config;
pub mod multipart;
pub mod transport;

pub use crate::auth::client::{AuthError, Authenticator};
pub use crate::cloudprint_client::client::{CloudPrintClient, RequestError};
pub use crate::cloudprint_client::models::{
    ApiResponse, ConnectionStatus, GenericResponse, JobsResponse, PrintJob, Printer, PrinterDetail,
    PrinterDetailsResponse, SearchResponse, SubmitRequest, SubmitResponse,
};
pub use crate::config::loading::{load_config, SettingsError};
pub use crate::config::models::Settings;
pub use crate::multipart::encoder::FormData;
pub use crate::multipart::models::{FormParam, FormParamKind};
pub use crate::transport::client::{HttpTransport, Transport, TransportError};
pub use crate::transport::models::PostRequest;
