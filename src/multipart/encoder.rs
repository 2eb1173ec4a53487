use chrono::Utc;

use super::models::{FormParam, FormParamKind};

const CRLF: &str = "\r\n";
const BOUNDARY_PREFIX: &str = "----CloudPrintFormBoundary";

/// Ordered set of form parameters plus the boundary used to delimit them.
///
/// Insertion order is kept; it is the order the sections appear on the wire.
#[derive(Debug, Clone)]
pub struct FormData {
    boundary: String,
    params: Vec<FormParam>,
}

impl Default for FormData {
    fn default() -> Self {
        Self::new()
    }
}

impl FormData {
    pub fn new() -> Self {
        Self::with_boundary(format!("{BOUNDARY_PREFIX}{}", Utc::now().timestamp_millis()))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        FormData { boundary: boundary.into(), params: Vec::new() }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn params(&self) -> &[FormParam] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn push(&mut self, param: FormParam) -> &mut Self {
        self.params.push(param);
        self
    }

    pub fn add_field(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.push(FormParam::field(name, value))
    }

    /// Adds the field only when `value` is present and not blank.
    pub fn add_optional_field(&mut self, name: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            self.add_field(name, value);
        }
        self
    }

    /// Value for the `Content-Type` request header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Serializes all sections followed by the closing boundary line.
    pub fn encode(&self) -> String {
        let mut body = String::new();

        for param in &self.params {
            body.push_str("--");
            body.push_str(&self.boundary);
            body.push_str(CRLF);

            match &param.kind {
                FormParamKind::File { filename, mime_type } => {
                    body.push_str(&format!("Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"{CRLF}", param.name, filename));
                    body.push_str(&format!("Content-Type: {mime_type}{CRLF}"));
                    body.push_str("Content-Transfer-Encoding: base64");
                    body.push_str(CRLF);
                }
                FormParamKind::Field => {
                    body.push_str(&format!("Content-Disposition: form-data; name=\"{}\"{CRLF}", param.name));
                }
            }

            body.push_str(CRLF);
            body.push_str(&param.value);
            body.push_str(CRLF);
        }

        body.push_str(&format!("--{}--{CRLF}", self.boundary));
        body
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.encode().into_bytes()
    }
}
