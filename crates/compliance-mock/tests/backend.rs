//! End-to-end checks of the mock backend over HTTP

use compliance_mock::{spawn, FailureMode, MockBackend, RulesShape};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use shared_types::RuleSet;

async fn get_json(url: String) -> (u16, Value) {
    let response = reqwest::get(url).await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_rule_edits_follow_backend_semantics() {
    let backend = spawn(MockBackend::new().with_document("policy.pdf"))
        .await
        .unwrap();
    let http = reqwest::Client::new();
    let rules_url = format!("{}/rules", backend.base_url);

    for value in ["rm", " rm ", "", "rm -rf"] {
        let status = http
            .post(&rules_url)
            .query(&[
                ("filename", "policy.pdf"),
                ("rule_type", "forbidden"),
                ("rule_value", value),
            ])
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status.as_u16(), 200);
    }
    // Trimmed, deduplicated, blank ignored
    assert_eq!(
        backend.rules_for("policy.pdf").await.forbidden,
        vec!["rm", "rm -rf"]
    );

    http.delete(&rules_url)
        .query(&[
            ("filename", "policy.pdf"),
            ("rule_type", "forbidden"),
            ("rule_value", "rm"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(backend.rules_for("policy.pdf").await.forbidden, vec!["rm -rf"]);

    let status = http
        .post(&rules_url)
        .query(&[
            ("filename", "policy.pdf"),
            ("rule_type", "optional"),
            ("rule_value", "x"),
        ])
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status.as_u16(), 400);
}

#[tokio::test]
async fn test_all_documents_rules_shape() {
    let backend = spawn(
        MockBackend::new()
            .with_rules(
                "policy.pdf",
                RuleSet {
                    allowed: vec!["ls".into()],
                    ..RuleSet::default()
                },
            )
            .with_rules_shape(RulesShape::AllDocuments),
    )
    .await
    .unwrap();

    let (status, body) = get_json(format!("{}/rules?filename=policy.pdf", backend.base_url)).await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({"rules": {"policy.yml": {"allowed": ["ls"], "forbidden": [], "required": []}}})
    );
}

#[tokio::test]
async fn test_query_planner_reports_violations() {
    let backend = spawn(
        MockBackend::new().with_document("policy.pdf").with_rules(
            "policy.pdf",
            RuleSet {
                forbidden: vec!["rm".into()],
                ..RuleSet::default()
            },
        ),
    )
    .await
    .unwrap();

    let response = reqwest::Client::new()
        .post(format!("{}/rag/policy.pdf", backend.base_url))
        .json(&json!({"query": "ls -la; rm -rf /tmp"}))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();

    assert_eq!(body["status"], "success");
    assert_eq!(body["safe_plan"], json!(["ls -la"]));
    assert_eq!(body["violations"], json!([{"command": "rm -rf /tmp", "rule": "rm"}]));
}

#[tokio::test]
async fn test_injected_failures_and_request_log() {
    let backend = spawn(
        MockBackend::new()
            .failing("GET /documents", FailureMode::ServerError)
            .failing("GET /rules", FailureMode::NotJson),
    )
    .await
    .unwrap();

    let response = reqwest::get(format!("{}/documents", backend.base_url))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 500);

    let response = reqwest::get(format!("{}/rules?filename=a.pdf", backend.base_url))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert!(response.json::<Value>().await.is_err());

    backend.clear_failure("GET /documents").await;
    let (status, body) = get_json(format!("{}/documents", backend.base_url)).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"documents": []}));

    assert_eq!(backend.count_for("GET /documents").await, 2);
    let requests = backend.requests().await;
    assert_eq!(requests[1].query.as_deref(), Some("filename=a.pdf"));
}

#[tokio::test]
async fn test_unknown_document_is_not_found() {
    let backend = spawn(MockBackend::new()).await.unwrap();
    let response = reqwest::Client::new()
        .post(format!("{}/fetch_rules/missing.pdf", backend.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "Document missing.pdf not found");
}
