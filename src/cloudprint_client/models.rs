use std::{collections::HashMap, fmt};

use chrono::{DateTime, Utc};
use log::debug;
use serde::{de::DeserializeOwned, Deserialize as _, Deserializer};
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

// ///////// //
// Responses //
// ///////// //

/// Fields every service response carries.
///
/// Payload fields of the embedding response are only meaningful when
/// `success` is true.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenericResponse {
    #[serde(deserialize_with = "null_default")]
    pub success: bool,
    #[serde(deserialize_with = "lenient_string")]
    pub error_code: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub message: Option<String>,
    pub request: Option<RequestDetails>,
    #[serde(rename = "xsrf_token")]
    pub xsrf_token: Option<String>,
}

/// Echo of the request as seen by the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestDetails {
    #[serde(deserialize_with = "lenient_string")]
    pub time: Option<String>,
    pub user: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub users: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub params: HashMap<String, Value>,
}

/// Uniform access to the [`GenericResponse`] part of any typed response.
pub trait ApiResponse: DeserializeOwned + Default + Send + 'static {
    fn base(&self) -> &GenericResponse;

    fn base_mut(&mut self) -> &mut GenericResponse;

    fn is_success(&self) -> bool {
        self.base().success
    }

    fn message(&self) -> Option<&str> {
        self.base().message.as_deref()
    }

    /// A default response flagged as failed, carrying `message`.
    fn failure(message: impl Into<String>) -> Self {
        let mut response = Self::default();
        let base = response.base_mut();
        base.success = false;
        base.message = Some(message.into());
        response
    }
}

impl ApiResponse for GenericResponse {
    fn base(&self) -> &GenericResponse {
        self
    }

    fn base_mut(&mut self) -> &mut GenericResponse {
        self
    }
}

macro_rules! impl_api_response {
    ($($response:ty),+ $(,)?) => {
        $(
            impl ApiResponse for $response {
                fn base(&self) -> &GenericResponse {
                    &self.base
                }

                fn base_mut(&mut self) -> &mut GenericResponse {
                    &mut self.base
                }
            }
        )+
    };
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitResponse {
    #[serde(flatten)]
    pub base: GenericResponse,
    pub job: Option<PrintJob>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsResponse {
    #[serde(flatten)]
    pub base: GenericResponse,
    #[serde(deserialize_with = "null_default")]
    pub jobs: Vec<PrintJob>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterDetailsResponse {
    #[serde(flatten)]
    pub base: GenericResponse,
    #[serde(deserialize_with = "null_default")]
    pub printers: Vec<PrinterDetail>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    #[serde(flatten)]
    pub base: GenericResponse,
    #[serde(deserialize_with = "null_default")]
    pub printers: Vec<Printer>,
}

impl_api_response!(SubmitResponse, JobsResponse, PrinterDetailsResponse, SearchResponse);

// //////// //
// Printers //
// //////// //

/// Printer as listed by a search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Printer {
    #[serde(deserialize_with = "null_default")]
    pub id: String,
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    pub description: Option<String>,
    pub proxy: Option<String>,
    pub status: Option<String>,
    pub caps_hash: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub create_time: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub update_time: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub access_time: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub confirmed: bool,
    #[serde(deserialize_with = "lenient_count")]
    pub number_of_documents: u64,
    #[serde(deserialize_with = "lenient_count")]
    pub number_of_pages: u64,
}

impl Printer {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        timestamp_from_millis(self.create_time.as_deref())
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        timestamp_from_millis(self.update_time.as_deref())
    }

    pub fn accessed_at(&self) -> Option<DateTime<Utc>> {
        timestamp_from_millis(self.access_time.as_deref())
    }
}

/// Full printer record returned by the `printer` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrinterDetail {
    #[serde(deserialize_with = "null_default")]
    pub id: String,
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    pub display_name: Option<String>,
    pub default_display_name: Option<String>,
    pub description: Option<String>,
    pub proxy: Option<String>,
    pub status: Option<String>,
    pub connection_status: Option<String>,
    pub model: Option<String>,
    pub manufacturer: Option<String>,
    pub uuid: Option<String>,
    pub gcp_version: Option<String>,
    pub owner_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub is_tos_accepted: Option<String>,
    #[serde(rename = "type")]
    pub printer_type: Option<String>,
    pub caps_format: Option<String>,
    pub caps_hash: Option<String>,
    pub update_url: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub supported_content_types: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub create_time: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub update_time: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub access_time: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub access: Vec<PrinterAccess>,
    #[serde(deserialize_with = "null_default")]
    pub capabilities: Vec<PrinterCapability>,
}

/// One entry of a printer's sharing list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterAccess {
    pub membership: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    #[serde(rename = "type")]
    pub access_type: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub is_pending: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterCapability {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub capability_type: Option<String>,
    #[serde(rename = "psf:SelectionType")]
    pub selection_type: Option<String>,
    #[serde(rename = "psk:DisplayName")]
    pub display_name: Option<String>,
    #[serde(rename = "psf:DataType")]
    pub data_type: Option<String>,
    #[serde(rename = "psf:UnitType")]
    pub unit_type: Option<String>,
    #[serde(rename = "psf:DefaultValue", deserialize_with = "lenient_string")]
    pub default_value: Option<String>,
    #[serde(rename = "psf:MinValue", deserialize_with = "lenient_string")]
    pub min_value: Option<String>,
    #[serde(rename = "psf:MaxValue", deserialize_with = "lenient_string")]
    pub max_value: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub options: Vec<PrinterCapabilityOption>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterCapabilityOption {
    pub name: Option<String>,
    #[serde(rename = "psk:DisplayName")]
    pub display_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub default: Option<String>,
    #[serde(rename = "psk:ResolutionX", deserialize_with = "lenient_string")]
    pub resolution_x: Option<String>,
    #[serde(rename = "psk:ResolutionY", deserialize_with = "lenient_string")]
    pub resolution_y: Option<String>,
    #[serde(rename = "psk:MediaSizeWidth", deserialize_with = "lenient_string")]
    pub media_size_width: Option<String>,
    #[serde(rename = "psk:MediaSizeHeight", deserialize_with = "lenient_string")]
    pub media_size_height: Option<String>,
}

/// Filter for the `connection_status` search parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Online,
    Unknown,
    Offline,
    Dormant,
    All,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Online => "ONLINE",
            ConnectionStatus::Unknown => "UNKNOWN",
            ConnectionStatus::Offline => "OFFLINE",
            ConnectionStatus::Dormant => "DORMANT",
            ConnectionStatus::All => "ALL",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// //// //
// Jobs //
// //// //

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrintJob {
    #[serde(deserialize_with = "null_default")]
    pub id: String,
    #[serde(rename = "printerid", deserialize_with = "null_default")]
    pub printer_id: String,
    pub printer_name: Option<String>,
    pub printer_type: Option<String>,
    pub message: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub number_of_pages: Option<String>,
    pub owner_id: Option<String>,
    pub title: Option<String>,
    pub content_type: Option<String>,
    pub file_url: Option<String>,
    pub ticket_url: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub create_time: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub update_time: Option<String>,
    pub status: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub tags: Vec<String>,
}

impl PrintJob {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        timestamp_from_millis(self.create_time.as_deref())
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        timestamp_from_millis(self.update_time.as_deref())
    }
}

/// A document to print. `content` holds the raw bytes; the client base64
/// encodes them on submit.
#[derive(Debug, Clone, Default)]
pub struct SubmitRequest {
    pub printer_id: String,
    pub title: Option<String>,
    pub capabilities: Option<String>,
    pub content: Option<Vec<u8>>,
    pub content_type: Option<String>,
    pub tag: Option<String>,
}

impl SubmitRequest {
    pub fn new(printer_id: impl Into<String>, content: Vec<u8>, content_type: impl Into<String>) -> Self {
        SubmitRequest {
            printer_id: printer_id.into(),
            content: Some(content),
            content_type: Some(content_type.into()),
            ..Default::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn capabilities(mut self, capabilities: impl Into<String>) -> Self {
        self.capabilities = Some(capabilities.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

// /////// //
// Helpers //
// /////// //

fn timestamp_from_millis(value: Option<&str>) -> Option<DateTime<Utc>> {
    value?.trim().parse::<i64>().ok().and_then(DateTime::from_timestamp_millis)
}

// The service is not consistent about quoting scalars.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

// Explicit `null` decodes like an absent field.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: serde::Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let count = match &value {
        None | Some(Value::Null) => return Ok(0),
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        Some(_) => None,
    };

    Ok(count.unwrap_or_else(|| {
        debug!("Ignoring unusable count {value:?}, using 0");
        0
    }))
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, TimeZone};

    use super::*;

    #[test]
    fn test_search_response_embeds_generic_fields() {
        let json = r#"{
            "success": true,
            "xsrf_token": "AIp06Dj",
            "request": {"time": "0", "user": "alice@example.com", "users": ["alice@example.com"], "params": {"q": ["lobby"]}},
            "printers": [{
                "id": "printer-1",
                "name": "Lobby",
                "proxy": "proxy-a",
                "status": "",
                "capsHash": "abc",
                "createTime": "1356998400000",
                "updateTime": "1357084800000",
                "accessTime": "1357084800000",
                "confirmed": true,
                "numberOfDocuments": "12",
                "numberOfPages": 40
            }]
        }"#;

        let response: SearchResponse = serde_json::from_str(json).unwrap();
        assert!(response.is_success());
        assert_eq!(response.base.xsrf_token.as_deref(), Some("AIp06Dj"));
        assert_eq!(response.base.request.as_ref().unwrap().user.as_deref(), Some("alice@example.com"));

        let printer = &response.printers[0];
        assert_eq!(printer.id, "printer-1");
        assert!(printer.confirmed);
        assert_eq!(printer.number_of_documents, 12);
        assert_eq!(printer.number_of_pages, 40);
        assert_eq!(printer.created_at(), Some(Utc.with_ymd_and_hms(2013, 1, 1, 0, 0, 0).unwrap()));
        assert_eq!(printer.updated_at().unwrap().day(), 2);
    }

    #[test]
    fn test_numeric_error_code_is_accepted() {
        let json = r#"{"success": false, "errorCode": 8, "message": "Printer not found"}"#;
        let response: GenericResponse = serde_json::from_str(json).unwrap();
        assert!(!response.success);
        assert_eq!(response.error_code.as_deref(), Some("8"));
        assert_eq!(response.message(), Some("Printer not found"));
    }

    #[test]
    fn test_jobs_response_parses_jobs() {
        let json = r#"{
            "success": true,
            "jobs": [{
                "id": "job-1",
                "printerid": "printer-1",
                "printerName": "Lobby",
                "title": "Report",
                "contentType": "application/pdf",
                "numberOfPages": 3,
                "status": "DONE",
                "createTime": "1356998400000",
                "tags": ["^own", "urgent"]
            }]
        }"#;

        let response: JobsResponse = serde_json::from_str(json).unwrap();
        let job = &response.jobs[0];
        assert_eq!(job.printer_id, "printer-1");
        assert_eq!(job.number_of_pages.as_deref(), Some("3"));
        assert_eq!(job.tags, vec!["^own", "urgent"]);
        assert_eq!(job.created_at().unwrap().year(), 2013);
        assert!(job.updated_at().is_none());
    }

    #[test]
    fn test_printer_details_parse_capabilities_and_access() {
        let json = r#"{
            "success": true,
            "printers": [{
                "id": "printer-1",
                "name": "Lobby",
                "type": "GOOGLE",
                "connectionStatus": "ONLINE",
                "isTosAccepted": false,
                "access": [{"email": "bob@example.com", "role": "APPENDER", "type": "USER", "is_pending": true}],
                "capabilities": [{
                    "name": "psk:PageMediaSize",
                    "type": "Feature",
                    "psk:DisplayName": "Paper Size",
                    "options": [{"name": "psk:ISOA4", "psk:MediaSizeWidth": 210000, "default": true}]
                }]
            }]
        }"#;

        let response: PrinterDetailsResponse = serde_json::from_str(json).unwrap();
        let printer = &response.printers[0];
        assert_eq!(printer.printer_type.as_deref(), Some("GOOGLE"));
        assert_eq!(printer.connection_status.as_deref(), Some("ONLINE"));
        assert_eq!(printer.is_tos_accepted.as_deref(), Some("false"));
        assert_eq!(printer.access[0].is_pending.as_deref(), Some("true"));
        assert_eq!(printer.access[0].access_type.as_deref(), Some("USER"));

        let capability = &printer.capabilities[0];
        assert_eq!(capability.display_name.as_deref(), Some("Paper Size"));
        assert_eq!(capability.options[0].media_size_width.as_deref(), Some("210000"));
        assert_eq!(capability.options[0].default.as_deref(), Some("true"));
    }

    #[test]
    fn test_failure_response_is_default_with_message() {
        let response = SearchResponse::failure("connection refused");
        assert!(!response.is_success());
        assert_eq!(response.message(), Some("connection refused"));
        assert!(response.printers.is_empty());
    }

    #[test]
    fn test_submit_response_carries_job() {
        let json = r#"{"success": true, "message": "Print job added.", "job": {"id": "job-9", "printerid": "p"}}"#;
        let response: SubmitResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.job.unwrap().id, "job-9");
    }

    #[test]
    fn test_connection_status_wire_names() {
        assert_eq!(ConnectionStatus::Online.to_string(), "ONLINE");
        assert_eq!(ConnectionStatus::All.as_str(), "ALL");
        let parsed: ConnectionStatus = serde_json::from_str("\"DORMANT\"").unwrap();
        assert_eq!(parsed, ConnectionStatus::Dormant);
    }

    #[test]
    fn test_null_fields_decode_as_empty() {
        let json = r#"{"success": true, "printers": [{"id": "p", "name": null, "tags": null}], "request": {"users": null, "params": null}}"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        assert!(response.is_success());
        assert_eq!(response.printers[0].id, "p");
        assert_eq!(response.printers[0].name, "");
        assert!(response.base.request.unwrap().users.is_empty());

        let json = r#"{"success": null, "jobs": [{"id": null, "printerid": null, "tags": null}]}"#;
        let response: JobsResponse = serde_json::from_str(json).unwrap();
        assert!(!response.is_success());
        assert_eq!(response.jobs[0].id, "");
        assert_eq!(response.jobs[0].printer_id, "");

        let json = r#"{"success": true, "printers": null}"#;
        let response: PrinterDetailsResponse = serde_json::from_str(json).unwrap();
        assert!(response.printers.is_empty());
    }

    #[test]
    fn test_unusable_counts_fall_back_to_zero() {
        let json = r#"{"printers": [
            {"id": "a", "numberOfDocuments": -1, "numberOfPages": "many"},
            {"id": "b", "numberOfDocuments": null, "numberOfPages": true}
        ]}"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        for printer in &response.printers {
            assert_eq!(printer.number_of_documents, 0);
            assert_eq!(printer.number_of_pages, 0);
        }
    }
}
