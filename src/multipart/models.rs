use base64::Engine;

const DEFAULT_FILE_MIME_TYPE: &str = "text/plain";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormParamKind {
    Field,
    File { filename: String, mime_type: String },
}

/// A single named section of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormParam {
    pub name: String,
    pub value: String,
    pub kind: FormParamKind,
}

impl FormParam {
    pub fn field(name: impl Into<String>, value: impl Into<String>) -> Self {
        FormParam { name: name.into(), value: value.into(), kind: FormParamKind::Field }
    }

    /// File section whose `value` is already base64 encoded.
    pub fn file(name: impl Into<String>, filename: impl Into<String>, mime_type: Option<&str>, value: impl Into<String>) -> Self {
        FormParam {
            name: name.into(),
            value: value.into(),
            kind: FormParamKind::File {
                filename: filename.into(),
                mime_type: mime_type.filter(|m| !m.trim().is_empty()).unwrap_or(DEFAULT_FILE_MIME_TYPE).to_owned(),
            },
        }
    }

    /// File section built from raw bytes.
    pub fn file_bytes(name: impl Into<String>, filename: impl Into<String>, mime_type: Option<&str>, data: &[u8]) -> Self {
        let b64 = base64::engine::general_purpose::STANDARD.encode(data);
        Self::file(name, filename, mime_type, b64)
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, FormParamKind::File { .. })
    }
}
