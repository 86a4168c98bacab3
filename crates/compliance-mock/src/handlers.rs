//! HTTP handlers for the mock backend

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use shared_types::{RuleSet, RuleType};
use tracing::{debug, info};

use crate::error::MockError;
use crate::state::{
    endpoint_key, DocumentsShape, FailureMode, MockBackend, RecordedRequest, RulesShape,
    StoredDocument, UploadRecord,
};

/// Records every request and applies injected failures
pub async fn record_request(
    State(backend): State<MockBackend>,
    request: Request,
    next: Next,
) -> Response {
    let recorded = RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        query: request.uri().query().map(str::to_string),
    };
    debug!("{} {}", recorded.method, recorded.path);

    let failure = {
        let mut state = backend.state.write().await;
        let failure = state
            .failures
            .get(&endpoint_key(&recorded.method, &recorded.path))
            .copied();
        state.requests.push(recorded.clone());
        failure
    };

    match failure {
        Some(mode) => failure_response(mode, recorded.endpoint()),
        None => next.run(request).await,
    }
}

fn failure_response(mode: FailureMode, endpoint: String) -> Response {
    match mode {
        FailureMode::ServerError => MockError::Injected(endpoint).into_response(),
        FailureMode::NotJson => {
            (StatusCode::OK, Body::from("<html>upstream error</html>")).into_response()
        }
    }
}

/// Handler: GET /
pub async fn service_info() -> Json<Value> {
    Json(json!({
        "message": "API running",
        "endpoints": [
            "/upload", "/documents", "/documents/{doc_id}", "/status/{upload_id}",
            "/fetch_rules/{doc_id}", "/rules", "/rag/{doc_id}", "/test-rag", "/reset_index"
        ]
    }))
}

/// Handler: GET /documents
pub async fn list_documents(State(backend): State<MockBackend>) -> Json<Value> {
    let state = backend.state.read().await;
    let names: Vec<&str> = state.documents.iter().map(|d| d.name.as_str()).collect();

    let body = match backend.documents_shape {
        DocumentsShape::Wrapped => json!({ "documents": names }),
        DocumentsShape::Bare => json!(names),
        DocumentsShape::Detailed => {
            let entries: Vec<Value> = state.documents.iter().map(document_entry).collect();
            json!({ "documents": entries })
        }
    };
    Json(body)
}

fn document_entry(doc: &StoredDocument) -> Value {
    json!({
        "id": doc.name,
        "filename": doc.name,
        "size": doc.size,
        "type": extension(&doc.name),
        "uploaded_at": doc.uploaded_at,
    })
}

fn extension(name: &str) -> String {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name[idx + 1..].to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// Handler: DELETE /documents/:id
pub async fn delete_document(
    State(backend): State<MockBackend>,
    Path(id): Path<String>,
) -> Json<Value> {
    let mut state = backend.state.write().await;
    state.documents.retain(|d| d.name != id);
    state.index.retain(|name| *name != id);
    let key = shared_types::DocumentId::from(id.as_str()).rules_key();
    state.rules.remove(&key);
    info!("Deleted document {}", id);
    Json(json!({ "deleted": id }))
}

/// Handler: POST /upload
pub async fn upload(
    State(backend): State<MockBackend>,
    mut multipart: Multipart,
) -> Result<Json<Value>, MockError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| MockError::InvalidRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| MockError::InvalidRequest("File part has no filename".into()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| MockError::InvalidRequest(format!("Failed to read file: {}", e)))?;
        upload = Some((file_name, bytes.len() as u64));
    }

    let (file_name, size) =
        upload.ok_or_else(|| MockError::InvalidRequest("No file provided".into()))?;

    let mut state = backend.state.write().await;
    let name = unique_name(&state.documents, &file_name);
    let uploaded_at = chrono::Utc::now().to_rfc3339();
    state.documents.push(StoredDocument {
        name: name.clone(),
        size,
        uploaded_at: uploaded_at.clone(),
    });
    state.index.push(name.clone());

    state.next_upload += 1;
    let upload_id = format!("upload-{}", state.next_upload);
    let files = vec![json!({
        "filename": name,
        "size": size,
        "type": extension(&name),
        "uploaded_at": uploaded_at,
    })];
    state.uploads.insert(
        upload_id.clone(),
        UploadRecord {
            status: "Uploaded".to_string(),
            files: files.clone(),
        },
    );
    info!("Stored upload {} as {}", upload_id, name);

    Ok(Json(json!({
        "message": "File uploaded successfully",
        "upload_id": upload_id,
        "files": files,
    })))
}

/// `name.pdf`, then `name_1.pdf`, `name_2.pdf`, ... when taken
fn unique_name(documents: &[StoredDocument], file_name: &str) -> String {
    let taken = |candidate: &str| documents.iter().any(|d| d.name == candidate);
    if !taken(file_name) {
        return file_name.to_string();
    }
    let (stem, ext) = match file_name.rfind('.') {
        Some(idx) if idx > 0 => (&file_name[..idx], &file_name[idx..]),
        _ => (file_name, ""),
    };
    (1..)
        .map(|i| format!("{}_{}{}", stem, i, ext))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| file_name.to_string())
}

/// Handler: GET /status/:upload_id
pub async fn upload_status(
    State(backend): State<MockBackend>,
    Path(upload_id): Path<String>,
) -> Json<Value> {
    let state = backend.state.read().await;
    let record = state.uploads.get(&upload_id);
    Json(json!({
        "upload_id": upload_id,
        "status": record.map(|r| r.status.as_str()).unwrap_or("unknown"),
        "meta": record.map(|r| json!({ "files": r.files })),
    }))
}

/// Handler: POST /fetch_rules/:id
pub async fn extract_rules(
    State(backend): State<MockBackend>,
    Path(id): Path<String>,
) -> Result<Json<Value>, MockError> {
    let mut state = backend.state.write().await;
    if !state.has_document(&id) {
        return Err(MockError::NotFound(format!("Document {}", id)));
    }
    let extracted = state.fixtures.get(&id).cloned().unwrap_or_default();
    info!("Extracted {} rules from {}", extracted.len(), id);
    *state.rules_for_mut(&id) = extracted;
    Ok(Json(json!({ "message": format!("Rules extracted and saved for {}", id) })))
}

#[derive(Debug, Deserialize)]
pub struct RulesQuery {
    pub filename: Option<String>,
}

/// Handler: GET /rules
pub async fn get_rules(
    State(backend): State<MockBackend>,
    Query(params): Query<RulesQuery>,
) -> Response {
    // The lock is not held across the sleep
    let (delay, failure) = match &params.filename {
        Some(name) => {
            let state = backend.state.read().await;
            (
                state.rules_delays.get(name).copied(),
                state.rules_failures.get(name).copied(),
            )
        }
        None => (None, None),
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if let Some(mode) = failure {
        return failure_response(mode, "GET /rules".to_string());
    }

    let state = backend.state.read().await;
    let body = match (backend.rules_shape, params.filename) {
        (RulesShape::Scoped, Some(name)) => json!({ "rules": state.rules_for(&name) }),
        _ => json!({ "rules": &state.rules }),
    };
    Json(body).into_response()
}

#[derive(Debug, Deserialize)]
pub struct RuleParams {
    pub filename: String,
    pub rule_type: String,
    pub rule_value: String,
}

impl RuleParams {
    fn parse(&self) -> Result<(RuleType, String), MockError> {
        let rule_type = self
            .rule_type
            .parse::<RuleType>()
            .map_err(|e| MockError::InvalidRequest(e.to_string()))?;
        Ok((rule_type, self.rule_value.trim().to_string()))
    }
}

/// Handler: POST /rules
pub async fn add_rule(
    State(backend): State<MockBackend>,
    Query(params): Query<RuleParams>,
) -> Result<Json<Value>, MockError> {
    let (rule_type, value) = params.parse()?;
    let mut state = backend.state.write().await;
    let rules = state.rules_for_mut(&params.filename).get_mut(rule_type);
    if !value.is_empty() && !rules.contains(&value) {
        rules.push(value.clone());
    }
    Ok(Json(json!({ "message": format!("Added '{}' to {}", value, rule_type) })))
}

/// Handler: DELETE /rules
///
/// Removes the first matching value; an absent value is not an error.
pub async fn delete_rule(
    State(backend): State<MockBackend>,
    Query(params): Query<RuleParams>,
) -> Result<Json<Value>, MockError> {
    let (rule_type, value) = params.parse()?;
    let mut state = backend.state.write().await;
    let rules = state.rules_for_mut(&params.filename).get_mut(rule_type);
    if let Some(idx) = rules.iter().position(|v| *v == value) {
        rules.remove(idx);
    }
    Ok(Json(json!({ "message": format!("Deleted '{}' from {}", value, rule_type) })))
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// Handler: POST /rag/:id
///
/// Treats each `;`-separated part of the query as a planned command and
/// checks it against the document's rules.
pub async fn run_query(
    State(backend): State<MockBackend>,
    Path(id): Path<String>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<Value>, MockError> {
    if req.query.trim().is_empty() {
        return Err(MockError::InvalidRequest("Empty query".into()));
    }
    let delay = backend.state.read().await.query_delays.get(&id).copied();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let state = backend.state.read().await;
    if !state.has_document(&id) {
        return Err(MockError::NotFound(format!("Document {}", id)));
    }
    let rules = state.rules_for(&id);

    let commands: Vec<String> = req
        .query
        .split(';')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();

    let mut safe_plan = Vec::new();
    let mut violations = Vec::new();
    for command in &commands {
        match check_command(command, &rules) {
            Some(rule) => violations.push(json!({ "command": command, "rule": rule })),
            None => safe_plan.push(command.clone()),
        }
    }

    let status = if !safe_plan.is_empty() {
        "success"
    } else if !violations.is_empty() {
        "violations"
    } else {
        "no_plan"
    };

    Ok(Json(json!({
        "query": req.query,
        "planner_raw": json!({ "Commands": commands }).to_string(),
        "safe_plan": safe_plan,
        "violations": violations,
        "status": status,
    })))
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    5
}

/// Handler: POST /test-rag
///
/// Matches indexed document names against the query words.
pub async fn search(
    State(backend): State<MockBackend>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<Value>, MockError> {
    if req.query.trim().is_empty() {
        return Err(MockError::InvalidRequest("Empty query".into()));
    }
    let words: Vec<String> = req
        .query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();

    let state = backend.state.read().await;
    let results: Vec<Value> = state
        .index
        .iter()
        .filter(|name| {
            let name = name.to_lowercase();
            words.iter().any(|w| name.contains(w.as_str()))
        })
        .take(req.top_k)
        .map(|name| json!({ "document": name, "metadata": { "source": name } }))
        .collect();

    Ok(Json(json!({ "query": req.query, "results": results })))
}

/// Handler: POST /reset_index
pub async fn reset_index(State(backend): State<MockBackend>) -> Json<Value> {
    let mut state = backend.state.write().await;
    info!("Dropped {} indexed documents", state.index.len());
    state.index.clear();
    Json(json!({ "message": "Index reset" }))
}

/// Rule violated by `command`, if any
fn check_command(command: &str, rules: &RuleSet) -> Option<String> {
    let lower = command.to_lowercase();
    if let Some(rule) = rules
        .forbidden
        .iter()
        .find(|f| !f.is_empty() && lower.contains(&f.to_lowercase()))
    {
        return Some(rule.clone());
    }
    if let Some(req) = rules
        .required
        .iter()
        .find(|r| !lower.contains(&r.to_lowercase()))
    {
        return Some(format!("missing required: {}", req));
    }
    let allowed = &rules.allowed;
    if !allowed.is_empty() && !allowed.iter().any(|a| lower.contains(&a.to_lowercase())) {
        return Some("not allowed".to_string());
    }
    None
}
