use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-assigned document key, treated as opaque by the client
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which the backend stores this document's rules (`policy.pdf` -> `policy.yml`)
    pub fn rules_key(&self) -> String {
        let name = self.0.rsplit(['/', '\\']).next().unwrap_or(&self.0);
        let stem = match name.rfind('.') {
            // A leading dot is part of the name, not an extension
            Some(idx) if idx > 0 => &name[..idx],
            _ => name,
        };
        format!("{}.yml", stem)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A stored document as listed by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// File extension reported by the backend (`pdf`, `docx`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<String>,
}

impl Document {
    /// Document known only by its name, as in a bare string listing
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: DocumentId::new(name.clone()),
            filename: Some(name),
            size: None,
            kind: None,
            uploaded_at: None,
        }
    }

    /// Display label: the filename when known
    pub fn label(&self) -> String {
        match &self.filename {
            Some(name) => name.clone(),
            None => format!("Document {}", self.id),
        }
    }
}

/// Metadata for one file accepted by an upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub filename: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub uploaded_at: Option<String>,
}

/// Response to `POST /upload`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub upload_id: Option<String>,
    #[serde(default)]
    pub files: Vec<UploadedFile>,
}

/// Response to `GET /status/{upload_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadStatus {
    pub upload_id: String,
    pub status: String,
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
}

/// Generic acknowledgement for mutating calls
#[derive(Debug, Clone, PartialEq)]
pub struct Ack {
    pub message: Option<String>,
    pub body: serde_json::Value,
}

impl Ack {
    pub fn from_body(body: serde_json::Value) -> Self {
        let message = body
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string);
        Self { message, body }
    }
}

/// Response to `GET /`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<String>,
}
