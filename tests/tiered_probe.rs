mod common;

use async_trait::async_trait;
use common::{public_tool, protected_tool, tiered_server, TOKEN};
use serde_json::json;
use utcp_probe::config::ProbeConfig;
use utcp_probe::identity::{AuthError, CognitoAuth, StaticToken, TokenProvider};
use utcp_probe::probe::{self, ProbeTargets, StepOutcome};
use utcp_probe::utcp::{ManifestClient, ToolInvoker};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct FailingSignIn;

#[async_trait]
impl TokenProvider for FailingSignIn {
    async fn access_token(&self) -> Result<String, AuthError> {
        Err(AuthError::Rejected {
            kind: "NotAuthorizedException".into(),
            message: "Incorrect username or password.".into(),
        })
    }
}

#[tokio::test]
async fn tiered_server_passes_every_step() {
    let server = tiered_server().await;
    let report = probe::run_probe(
        &ProbeTargets::default(),
        &ManifestClient::new(&server.uri()),
        &StaticToken(TOKEN.into()),
        &ToolInvoker::new(),
    )
    .await;

    for step in &report.steps {
        assert_eq!(step.outcome, StepOutcome::Passed, "step {} did not pass", step.name);
    }
    assert_eq!(report.steps.len(), 8);
    assert!(report.is_success());
    assert!(report.finished_at.is_some());

    let cmp = report.comparison.as_ref().unwrap();
    assert_eq!(cmp.unauthenticated_count, 1);
    assert_eq!(cmp.authenticated_count, 2);
    assert!(cmp.is_tiered);
}

#[tokio::test]
async fn sign_in_failure_aborts_after_anonymous_discovery() {
    let server = tiered_server().await;
    let report = probe::run_probe(
        &ProbeTargets::default(),
        &ManifestClient::new(&server.uri()),
        &FailingSignIn,
        &ToolInvoker::new(),
    )
    .await;

    assert!(report.aborted.is_some());
    assert_eq!(report.steps.len(), 2);
    assert_eq!(
        report.step(probe::STEP_DISCOVER_ANON).unwrap().outcome,
        StepOutcome::Passed
    );
    assert!(report.step(probe::STEP_SIGN_IN).unwrap().outcome.is_failed());
    assert!(!report.is_success());
}

#[tokio::test]
async fn missing_cognito_settings_fail_sign_in_after_anonymous_discovery() {
    let server = tiered_server().await;
    let config = ProbeConfig {
        api_url: server.uri(),
        cognito_endpoint: Some(server.uri()),
        client_id: "client".into(),
        ..ProbeConfig::default()
    };
    let cognito = CognitoAuth::from_config(&config, reqwest::Client::new());

    let report = probe::run_probe(
        &ProbeTargets::from_config(&config),
        &ManifestClient::new(&config.api_url),
        &cognito,
        &ToolInvoker::new(),
    )
    .await;

    assert_eq!(
        report.step(probe::STEP_DISCOVER_ANON).unwrap().outcome,
        StepOutcome::Passed
    );
    match &report.step(probe::STEP_SIGN_IN).unwrap().outcome {
        StepOutcome::Failed(reason) => assert!(reason.contains("EMAIL, PASSWORD"), "{reason}"),
        other => panic!("expected failed sign-in, got {other:?}"),
    }
    assert!(report.aborted.is_some());
    // Nothing was posted to the identity endpoint.
    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.method.as_str() == "GET"));
}

#[tokio::test]
async fn open_protected_tool_is_flagged() {
    let server = MockServer::start().await;
    let tools = json!([public_tool(&server), protected_tool(&server)]);
    Mock::given(method("GET"))
        .and(path("/utcp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tools": tools })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("anyone"))
        .with_priority(10)
        .mount(&server)
        .await;

    let report = probe::run_probe(
        &ProbeTargets::default(),
        &ManifestClient::new(&server.uri()),
        &StaticToken(TOKEN.into()),
        &ToolInvoker::new(),
    )
    .await;

    let leaked = report.step(probe::STEP_PROTECTED_ANON).unwrap();
    assert!(leaked.outcome.is_failed());
    assert_eq!(leaked.detail.as_deref(), Some("anyone"));
    // Same tool list for both callers is still a (trivial) subset.
    assert_eq!(
        report.step(probe::STEP_COMPARE).unwrap().outcome,
        StepOutcome::Passed
    );
    assert_eq!(report.failed_count(), 1);
}

#[tokio::test]
async fn failed_anonymous_discovery_skips_dependent_steps() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/utcp"))
        .and(|req: &wiremock::Request| !req.headers.contains_key("authorization"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/utcp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tools": []})))
        .with_priority(10)
        .mount(&server)
        .await;

    let report = probe::run_probe(
        &ProbeTargets::default(),
        &ManifestClient::new(&server.uri()),
        &StaticToken(TOKEN.into()),
        &ToolInvoker::new(),
    )
    .await;

    assert!(report.step(probe::STEP_DISCOVER_ANON).unwrap().outcome.is_failed());
    assert!(matches!(
        report.step(probe::STEP_COMPARE).unwrap().outcome,
        StepOutcome::Skipped(_)
    ));
    assert!(matches!(
        report.step(probe::STEP_PUBLIC_ANON).unwrap().outcome,
        StepOutcome::Skipped(_)
    ));
    // Authenticated manifest is empty, so the tool steps skip too.
    assert!(matches!(
        report.step(probe::STEP_PROTECTED_AUTH).unwrap().outcome,
        StepOutcome::Skipped(_)
    ));
}
