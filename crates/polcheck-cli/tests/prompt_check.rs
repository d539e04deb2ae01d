//! Prompt-mode checks against a mocked model endpoint.

use polcheck_cli::check::check_with_model;
use polcheck_core::Policy;
use polcheck_llm::{LlmClient, LlmConfig};
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> LlmClient {
    let base = url::Url::parse(&server.uri()).expect("mock uri");
    LlmClient::new(LlmConfig::new(base, "test-key")).expect("client build")
}

async fn mount_completion(server: &MockServer, text: &str) {
    Mock::given(method("POST"))
        .and(path_regex(r":generateContent$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn model_report_is_returned() {
    let server = MockServer::start().await;
    mount_completion(
        &server,
        r#"{"compliance_report": {"is_compliant": false, "violations": [
            {"rule_violated": "No refund promises", "violating_text": "full refund", "suggestion": "Say a refund may be reviewed."}
        ]}}"#,
    )
    .await;

    let policies = vec![Policy::new("refunds.pdf", "Never promise refunds.")];
    let report = check_with_model(&client(&server), &policies, "You get a full refund.")
        .await
        .expect("report");

    assert!(!report.is_compliant());
    assert_eq!(report.violations()[0].violating_text, "full refund");
}

#[tokio::test]
async fn malformed_completion_is_an_error() {
    let server = MockServer::start().await;
    mount_completion(&server, "Sure! Here is my analysis.").await;

    let policies = vec![Policy::new("p.pdf", "rule")];
    let err = check_with_model(&client(&server), &policies, "text")
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("unusable report"));
}

#[tokio::test]
async fn empty_document_never_reaches_the_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let policies = vec![Policy::new("p.pdf", "rule")];
    assert!(check_with_model(&client(&server), &policies, "").await.is_err());
}
