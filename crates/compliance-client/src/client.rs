//! HTTP client for the compliance backend
//!
//! [`ComplianceClient`] is a direct pass-through: one request per call, no
//! retries, no timeouts. Responses are decoded to JSON and handed to
//! [`crate::normalize`] where the backend has more than one shape.

use std::path::Path;

use async_trait::async_trait;
use reqwest::{multipart, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_types::{
    Ack, Document, DocumentId, QueryResult, RuleSet, RuleType, SearchResults, ServiceInfo,
    UploadReceipt, UploadStatus,
};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, RequestFailure};
use crate::normalize;

/// Bodies longer than this are cut when reported in errors
const MAX_ERROR_BODY: usize = 512;

/// A file to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, named after its final path component
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self { file_name, bytes })
    }

    fn mime_type(&self) -> &'static str {
        let lower = self.file_name.to_ascii_lowercase();
        if lower.ends_with(".pdf") {
            "application/pdf"
        } else if lower.ends_with(".docx") {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        } else if lower.ends_with(".txt") || lower.ends_with(".md") {
            "text/plain"
        } else {
            "application/octet-stream"
        }
    }
}

/// Operations the console needs from the backend
#[async_trait]
pub trait ComplianceApi: Send + Sync {
    /// `GET /documents`
    async fn list_documents(&self) -> ClientResult<Vec<Document>>;

    /// `POST /upload` with multipart field `file`
    async fn upload_document(&self, file: &UploadFile) -> ClientResult<UploadReceipt>;

    /// `POST /fetch_rules/{id}`; replaces the server-held rule set
    async fn extract_rules(&self, document: &DocumentId) -> ClientResult<Ack>;

    /// `GET /rules?filename={id}`
    async fn fetch_rules(&self, document: &DocumentId) -> ClientResult<RuleSet>;

    /// `POST /rules?filename&rule_type&rule_value`
    async fn add_rule(
        &self,
        document: &DocumentId,
        rule_type: RuleType,
        rule_value: &str,
    ) -> ClientResult<Ack>;

    /// `DELETE /rules?filename&rule_type&rule_value`; matches by value
    async fn delete_rule(
        &self,
        document: &DocumentId,
        rule_type: RuleType,
        rule_value: &str,
    ) -> ClientResult<Ack>;

    /// `POST /rag/{id}` with `{query}`
    async fn run_query(&self, document: &DocumentId, query: &str) -> ClientResult<QueryResult>;

    /// `DELETE /documents/{id}`
    async fn delete_document(&self, document: &DocumentId) -> ClientResult<Ack>;
}

/// reqwest-backed implementation of [`ComplianceApi`]
#[derive(Debug, Clone)]
pub struct ComplianceClient {
    base_url: Url,
    http: reqwest::Client,
}

impl ComplianceClient {
    /// Build a client for the configured backend
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            base_url: config.url()?,
            http: reqwest::Client::new(),
        })
    }

    /// Build a client from `COMPLIANCE_API_BASE` or the default address
    pub fn from_env() -> anyhow::Result<Self> {
        Self::new(&ClientConfig::from_env()?)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET /status/{upload_id}`
    pub async fn upload_status(&self, upload_id: &str) -> ClientResult<UploadStatus> {
        let request = self.request(Method::GET, &["status", upload_id]);
        let body = self.send("GET /status", request).await?;
        decode("GET /status", body)
    }

    /// `GET /`
    pub async fn service_info(&self) -> ClientResult<ServiceInfo> {
        let request = self.request(Method::GET, &[]);
        let body = self.send("GET /", request).await?;
        decode("GET /", body)
    }

    /// `POST /test-rag`: passages across every indexed document
    pub async fn search(&self, query: &str, top_k: usize) -> ClientResult<SearchResults> {
        let request = self
            .request(Method::POST, &["test-rag"])
            .json(&json!({ "query": query, "top_k": top_k }));
        let body = self.send("POST /test-rag", request).await?;
        decode("POST /test-rag", body)
    }

    /// `POST /reset_index`: drop the backend's search index
    pub async fn reset_index(&self) -> ClientResult<Ack> {
        let request = self.request(Method::POST, &["reset_index"]);
        let body = self.send("POST /reset_index", request).await?;
        Ok(Ack::from_body(body))
    }

    /// URL for `segments` under the base, each segment percent-encoded
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `new` rejects bases that cannot take path segments
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        self.http.request(method, self.url(segments))
    }

    fn rule_request(
        &self,
        method: Method,
        document: &DocumentId,
        rule_type: RuleType,
        rule_value: &str,
    ) -> RequestBuilder {
        self.request(method, &["rules"]).query(&[
            ("filename", document.as_str()),
            ("rule_type", rule_type.as_str()),
            ("rule_value", rule_value),
        ])
    }

    /// Send a request and decode the body as JSON
    async fn send(&self, endpoint: &str, request: RequestBuilder) -> ClientResult<Value> {
        debug!("Request: {}", endpoint);

        let response = request.send().await.map_err(|e| {
            warn!("{} transport error: {}", endpoint, e);
            ClientError::failed(endpoint, e)
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ClientError::failed(endpoint, e))?;

        if !status.is_success() {
            warn!("{} returned {}", endpoint, status);
            return Err(ClientError::failed(
                endpoint,
                RequestFailure::Status {
                    status: status.as_u16(),
                    body: truncate(&text),
                },
            ));
        }

        serde_json::from_str(&text).map_err(|e| {
            warn!("{} returned a non-JSON body: {}", endpoint, e);
            ClientError::failed(endpoint, e)
        })
    }
}

#[async_trait]
impl ComplianceApi for ComplianceClient {
    async fn list_documents(&self) -> ClientResult<Vec<Document>> {
        const ENDPOINT: &str = "GET /documents";
        let body = self
            .send(ENDPOINT, self.request(Method::GET, &["documents"]))
            .await?;
        let documents = normalize::documents(body).map_err(|e| shape(ENDPOINT, e))?;
        debug!("Listed {} documents", documents.len());
        Ok(documents)
    }

    async fn upload_document(&self, file: &UploadFile) -> ClientResult<UploadReceipt> {
        const ENDPOINT: &str = "POST /upload";
        let part = multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(file.mime_type())
            .map_err(|e| ClientError::failed(ENDPOINT, e))?;
        let form = multipart::Form::new().part("file", part);

        let request = self.request(Method::POST, &["upload"]).multipart(form);
        let body = self.send(ENDPOINT, request).await?;
        decode(ENDPOINT, body)
    }

    async fn extract_rules(&self, document: &DocumentId) -> ClientResult<Ack> {
        let request = self.request(Method::POST, &["fetch_rules", document.as_str()]);
        let body = self.send("POST /fetch_rules", request).await?;
        Ok(Ack::from_body(body))
    }

    async fn fetch_rules(&self, document: &DocumentId) -> ClientResult<RuleSet> {
        const ENDPOINT: &str = "GET /rules";
        let request = self
            .request(Method::GET, &["rules"])
            .query(&[("filename", document.as_str())]);
        let body = self.send(ENDPOINT, request).await?;
        normalize::rules(document, body).map_err(|e| shape(ENDPOINT, e))
    }

    async fn add_rule(
        &self,
        document: &DocumentId,
        rule_type: RuleType,
        rule_value: &str,
    ) -> ClientResult<Ack> {
        let request = self.rule_request(Method::POST, document, rule_type, rule_value);
        let body = self.send("POST /rules", request).await?;
        Ok(Ack::from_body(body))
    }

    async fn delete_rule(
        &self,
        document: &DocumentId,
        rule_type: RuleType,
        rule_value: &str,
    ) -> ClientResult<Ack> {
        let request = self.rule_request(Method::DELETE, document, rule_type, rule_value);
        let body = self.send("DELETE /rules", request).await?;
        Ok(Ack::from_body(body))
    }

    async fn run_query(&self, document: &DocumentId, query: &str) -> ClientResult<QueryResult> {
        let request = self
            .request(Method::POST, &["rag", document.as_str()])
            .json(&json!({ "query": query }));
        let body = self.send("POST /rag", request).await?;
        Ok(QueryResult::new(query, body))
    }

    async fn delete_document(&self, document: &DocumentId) -> ClientResult<Ack> {
        let request = self.request(Method::DELETE, &["documents", document.as_str()]);
        let body = self.send("DELETE /documents", request).await?;
        Ok(Ack::from_body(body))
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: Value) -> ClientResult<T> {
    serde_json::from_value(body).map_err(|e| ClientError::failed(endpoint, e))
}

fn shape(endpoint: &str, message: String) -> ClientError {
    warn!("{} returned an unexpected shape: {}", endpoint, message);
    ClientError::failed(endpoint, RequestFailure::Shape(message))
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
