//! Client calls against the in-memory backend

use compliance_client::{
    ClientConfig, ComplianceApi, ComplianceClient, RequestFailure, UploadFile,
};
use compliance_mock::{spawn, DocumentsShape, FailureMode, MockBackend, RulesShape};
use pretty_assertions::assert_eq;
use shared_types::{DocumentId, QueryStatus, RuleSet, RuleType};

fn client_for(base_url: &str) -> ComplianceClient {
    ComplianceClient::new(&ClientConfig::new(base_url)).unwrap()
}

fn forbidden(values: &[&str]) -> RuleSet {
    RuleSet {
        forbidden: values.iter().map(|v| v.to_string()).collect(),
        ..RuleSet::default()
    }
}

#[tokio::test]
async fn test_list_documents_all_shapes() {
    for shape in [
        DocumentsShape::Wrapped,
        DocumentsShape::Bare,
        DocumentsShape::Detailed,
    ] {
        let backend = spawn(
            MockBackend::new()
                .with_document("policy.pdf")
                .with_document("terms.pdf")
                .with_documents_shape(shape),
        )
        .await
        .unwrap();
        let client = client_for(&backend.base_url);

        let documents = client.list_documents().await.unwrap();
        let ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["policy.pdf", "terms.pdf"], "shape {:?}", shape);
    }
}

#[tokio::test]
async fn test_upload_then_list() {
    let backend = spawn(MockBackend::new().with_document("policy.pdf"))
        .await
        .unwrap();
    let client = client_for(&backend.base_url);

    let receipt = client
        .upload_document(&UploadFile::new("policy.pdf", b"%PDF-1.4".to_vec()))
        .await
        .unwrap();
    assert_eq!(receipt.message.as_deref(), Some("File uploaded successfully"));
    assert_eq!(receipt.files[0].filename, "policy_1.pdf");
    assert_eq!(receipt.files[0].size, Some(8));

    let upload_id = receipt.upload_id.unwrap();
    let status = client.upload_status(&upload_id).await.unwrap();
    assert_eq!(status.status, "Uploaded");

    let documents = client.list_documents().await.unwrap();
    assert_eq!(documents.len(), 2);
}

#[tokio::test]
async fn test_extract_then_fetch_rules() {
    let backend = spawn(
        MockBackend::new()
            .with_document("policy.pdf")
            .with_fixture("policy.pdf", forbidden(&["rm", "shutdown"])),
    )
    .await
    .unwrap();
    let client = client_for(&backend.base_url);
    let doc = DocumentId::from("policy.pdf");

    assert!(client.fetch_rules(&doc).await.unwrap().is_empty());
    let ack = client.extract_rules(&doc).await.unwrap();
    assert!(ack.message.is_some());
    assert_eq!(client.fetch_rules(&doc).await.unwrap(), forbidden(&["rm", "shutdown"]));
}

#[tokio::test]
async fn test_fetch_rules_from_all_documents_map() {
    let backend = spawn(
        MockBackend::new()
            .with_rules("policy.pdf", forbidden(&["no emoji"]))
            .with_rules("terms.pdf", forbidden(&["no links"]))
            .with_rules_shape(RulesShape::AllDocuments),
    )
    .await
    .unwrap();
    let client = client_for(&backend.base_url);

    let rules = client.fetch_rules(&DocumentId::from("policy.pdf")).await.unwrap();
    assert_eq!(rules, forbidden(&["no emoji"]));
    let rules = client.fetch_rules(&DocumentId::from("unknown.pdf")).await.unwrap();
    assert!(rules.is_empty());
}

#[tokio::test]
async fn test_add_and_delete_rule_encode_values() {
    let backend = spawn(MockBackend::new().with_document("Q3 policy.pdf"))
        .await
        .unwrap();
    let client = client_for(&backend.base_url);
    let doc = DocumentId::from("Q3 policy.pdf");

    client
        .add_rule(&doc, RuleType::Required, "approval & sign-off")
        .await
        .unwrap();
    client.add_rule(&doc, RuleType::Required, "audit").await.unwrap();
    assert_eq!(
        client.fetch_rules(&doc).await.unwrap().required,
        vec!["approval & sign-off", "audit"]
    );

    client
        .delete_rule(&doc, RuleType::Required, "approval & sign-off")
        .await
        .unwrap();
    assert_eq!(backend.rules_for("Q3 policy.pdf").await.required, vec!["audit"]);
}

#[tokio::test]
async fn test_run_query_keeps_payload() {
    let backend = spawn(
        MockBackend::new()
            .with_document("policy.pdf")
            .with_rules("policy.pdf", forbidden(&["rm"])),
    )
    .await
    .unwrap();
    let client = client_for(&backend.base_url);

    let result = client
        .run_query(&DocumentId::from("policy.pdf"), "rm -rf /")
        .await
        .unwrap();
    assert_eq!(result.query, "rm -rf /");
    let outcome = result.outcome();
    assert_eq!(outcome.status, Some(QueryStatus::Violations));
    assert_eq!(outcome.violations[0].rule, "rm");
    assert_eq!(result.merged()["query"], "rm -rf /");
}

#[tokio::test]
async fn test_delete_document() {
    let backend = spawn(
        MockBackend::new()
            .with_document("policy.pdf")
            .with_rules("policy.pdf", forbidden(&["rm"])),
    )
    .await
    .unwrap();
    let client = client_for(&backend.base_url);

    client
        .delete_document(&DocumentId::from("policy.pdf"))
        .await
        .unwrap();
    assert!(backend.document_names().await.is_empty());
    assert!(backend.rules_for("policy.pdf").await.is_empty());
}

#[tokio::test]
async fn test_service_info() {
    let backend = spawn(MockBackend::new()).await.unwrap();
    let info = client_for(&backend.base_url).service_info().await.unwrap();
    assert!(info.endpoints.contains(&"/rules".to_string()));
}

#[tokio::test]
async fn test_server_error_is_request_failed() {
    let backend = spawn(MockBackend::new().failing("POST /rag", FailureMode::ServerError))
        .await
        .unwrap();
    let client = client_for(&backend.base_url);

    let err = client
        .run_query(&DocumentId::from("policy.pdf"), "ls")
        .await
        .unwrap_err();
    assert_eq!(err.endpoint(), "POST /rag");
    match err.cause() {
        RequestFailure::Status { status, body } => {
            assert_eq!(*status, 500);
            assert!(body.contains("Injected failure"));
        }
        other => panic!("unexpected cause: {other:?}"),
    }
}

#[tokio::test]
async fn test_non_json_body_is_request_failed() {
    let backend = spawn(MockBackend::new().failing("GET /documents", FailureMode::NotJson))
        .await
        .unwrap();
    let err = client_for(&backend.base_url)
        .list_documents()
        .await
        .unwrap_err();
    assert!(matches!(err.cause(), RequestFailure::Decode(_)));
}

#[tokio::test]
async fn test_unreachable_backend_is_request_failed() {
    let base_url = {
        let backend = spawn(MockBackend::new()).await.unwrap();
        backend.base_url.clone()
    };
    // Dropping the handle stopped the server; give the abort a moment
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let err = client_for(&base_url).list_documents().await.unwrap_err();
    assert_eq!(err.endpoint(), "GET /documents");
    assert!(matches!(err.cause(), RequestFailure::Transport(_)));
}

#[tokio::test]
async fn test_search_then_reset_index() {
    let backend = spawn(
        MockBackend::new()
            .with_document("travel-policy.pdf")
            .with_document("terms.pdf"),
    )
    .await
    .unwrap();
    let client = client_for(&backend.base_url);

    let found = client.search("Travel expenses", 5).await.unwrap();
    assert_eq!(found.query, "Travel expenses");
    let documents: Vec<&str> = found.results.iter().map(|h| h.document.as_str()).collect();
    assert_eq!(documents, vec!["travel-policy.pdf"]);

    let capped = client.search("policy terms", 1).await.unwrap();
    assert_eq!(capped.results.len(), 1);

    let ack = client.reset_index().await.unwrap();
    assert_eq!(ack.message.as_deref(), Some("Index reset"));
    assert!(backend.indexed().await.is_empty());
    assert!(client.search("travel", 5).await.unwrap().results.is_empty());
    // Stored documents survive an index reset
    assert_eq!(client.list_documents().await.unwrap().len(), 2);
}
