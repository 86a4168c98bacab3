//! Backend state and test controls
//!
//! [`MockBackend`] is a cheap handle; clones share one state. The builder
//! methods seed documents, extraction fixtures, response shapes, delays and
//! injected failures before the server is started.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use shared_types::{DocumentId, RuleSet};
use tokio::sync::RwLock;

/// How `GET /rules` answers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RulesShape {
    /// `{"rules": {allowed, forbidden, required}}` for the requested document
    #[default]
    Scoped,
    /// `{"rules": {"<stem>.yml": {...}, ...}}` for every document
    AllDocuments,
}

/// How `GET /documents` answers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DocumentsShape {
    /// `{"documents": ["a.pdf", ...]}`
    #[default]
    Wrapped,
    /// `["a.pdf", ...]`
    Bare,
    /// `{"documents": [{"id", "filename", "size", "type", "uploaded_at"}]}`
    Detailed,
}

/// Injected failure for one endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Respond 500 with a JSON error body
    ServerError,
    /// Respond 200 with a body that is not JSON
    NotJson,
}

/// A request as seen by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
}

impl RecordedRequest {
    /// `METHOD /first-segment`, the key used for failure injection
    pub fn endpoint(&self) -> String {
        endpoint_key(&self.method, &self.path)
    }
}

pub(crate) fn endpoint_key(method: &str, path: &str) -> String {
    let first = path.trim_start_matches('/').split('/').next().unwrap_or("");
    format!("{} /{}", method, first)
}

#[derive(Debug, Clone)]
pub(crate) struct StoredDocument {
    pub name: String,
    pub size: u64,
    pub uploaded_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct UploadRecord {
    pub status: String,
    pub files: Vec<serde_json::Value>,
}

#[derive(Debug, Default)]
pub(crate) struct BackendState {
    pub documents: Vec<StoredDocument>,
    /// Rule sets keyed by `<stem>.yml`
    pub rules: BTreeMap<String, RuleSet>,
    /// Rules produced by extraction, keyed by document name
    pub fixtures: HashMap<String, RuleSet>,
    pub uploads: HashMap<String, UploadRecord>,
    pub next_upload: u64,
    pub requests: Vec<RecordedRequest>,
    pub rules_delays: HashMap<String, Duration>,
    pub query_delays: HashMap<String, Duration>,
    pub failures: HashMap<String, FailureMode>,
    /// `GET /rules` failures for one document only
    pub rules_failures: HashMap<String, FailureMode>,
    /// Document names visible to `POST /test-rag`
    pub index: Vec<String>,
}

impl BackendState {
    pub fn has_document(&self, name: &str) -> bool {
        self.documents.iter().any(|d| d.name == name)
    }

    /// Rules for a document, empty when none are stored
    pub fn rules_for(&self, name: &str) -> RuleSet {
        self.rules
            .get(&DocumentId::from(name).rules_key())
            .cloned()
            .unwrap_or_default()
    }

    pub fn rules_for_mut(&mut self, name: &str) -> &mut RuleSet {
        self.rules
            .entry(DocumentId::from(name).rules_key())
            .or_default()
    }
}

/// Handle to the in-memory backend
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    pub(crate) state: Arc<RwLock<BackendState>>,
    pub(crate) rules_shape: RulesShape,
    pub(crate) documents_shape: DocumentsShape,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a stored, indexed document
    pub fn with_document(self, name: &str) -> Self {
        self.seed(|state| {
            state.documents.push(StoredDocument {
                name: name.to_string(),
                size: 0,
                uploaded_at: chrono::Utc::now().to_rfc3339(),
            });
            state.index.push(name.to_string());
        })
    }

    /// Seed stored rules for a document
    pub fn with_rules(self, name: &str, rules: RuleSet) -> Self {
        self.seed(|state| *state.rules_for_mut(name) = rules)
    }

    /// Rules that extraction produces for a document
    pub fn with_fixture(self, name: &str, rules: RuleSet) -> Self {
        self.seed(|state| {
            state.fixtures.insert(name.to_string(), rules);
        })
    }

    /// Delay `GET /rules` answers for one document
    pub fn with_rules_delay(self, name: &str, delay: Duration) -> Self {
        self.seed(|state| {
            state.rules_delays.insert(name.to_string(), delay);
        })
    }

    /// Delay `POST /rag` answers for one document
    pub fn with_query_delay(self, name: &str, delay: Duration) -> Self {
        self.seed(|state| {
            state.query_delays.insert(name.to_string(), delay);
        })
    }

    /// Fail `GET /rules` for one document; other documents answer normally
    pub fn failing_rules_for(self, name: &str, mode: FailureMode) -> Self {
        self.seed(|state| {
            state.rules_failures.insert(name.to_string(), mode);
        })
    }

    /// Fail every request to `endpoint` (`"POST /rag"`, `"GET /documents"`, ...)
    pub fn failing(self, endpoint: &str, mode: FailureMode) -> Self {
        self.seed(|state| {
            state.failures.insert(endpoint.to_string(), mode);
        })
    }

    pub fn with_rules_shape(mut self, shape: RulesShape) -> Self {
        self.rules_shape = shape;
        self
    }

    pub fn with_documents_shape(mut self, shape: DocumentsShape) -> Self {
        self.documents_shape = shape;
        self
    }

    // Builder methods run before the server starts, so the lock is uncontended
    fn seed(self, f: impl FnOnce(&mut BackendState)) -> Self {
        match self.state.try_write() {
            Ok(mut state) => f(&mut state),
            Err(_) => tracing::warn!("Mock backend state busy; seed ignored"),
        }
        self
    }

    /// Start failing requests to `endpoint` on a running backend
    pub async fn inject_failure(&self, endpoint: &str, mode: FailureMode) {
        self.state
            .write()
            .await
            .failures
            .insert(endpoint.to_string(), mode);
    }

    /// Stop failing requests to `endpoint`
    pub async fn clear_failure(&self, endpoint: &str) {
        self.state.write().await.failures.remove(endpoint);
    }

    /// Names of stored documents in listing order
    pub async fn document_names(&self) -> Vec<String> {
        let state = self.state.read().await;
        state.documents.iter().map(|d| d.name.clone()).collect()
    }

    /// Stored rules for a document
    pub async fn rules_for(&self, name: &str) -> RuleSet {
        self.state.read().await.rules_for(name)
    }

    /// Document names currently searchable through `POST /test-rag`
    pub async fn indexed(&self) -> Vec<String> {
        self.state.read().await.index.clone()
    }

    /// Every request received so far
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.read().await.requests.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.state.read().await.requests.len()
    }

    /// Number of requests received for one endpoint key
    pub async fn count_for(&self, endpoint: &str) -> usize {
        self.state
            .read()
            .await
            .requests
            .iter()
            .filter(|r| r.endpoint() == endpoint)
            .count()
    }
}
