//! Integration tests for the Langbase client
//!
//! Uses wiremock to stand in for the pipes API.

use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use forking_paths::config::{LangbaseConfig, PipeConfig, RequestConfig};
use forking_paths::error::LangbaseError;
use forking_paths::langbase::{LangbaseClient, Message, PipeRun};

fn create_test_client(base_url: &str, max_retries: u32) -> LangbaseClient {
    let config = LangbaseConfig {
        api_key: "test-api-key".to_string(),
        base_url: base_url.to_string(),
    };

    let request_config = RequestConfig {
        timeout_ms: 5000,
        max_retries,
        retry_delay_ms: 10,
    };

    LangbaseClient::new(&config, request_config).expect("Failed to create client")
}

fn scenario_run() -> PipeRun {
    PipeRun::new(
        "garden-scenario-v1",
        vec![
            Message::system("You are Destiny"),
            Message::user("This is the traveler: Artorias"),
        ],
    )
}

#[tokio::test]
async fn test_successful_pipe_call() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/pipes/run"))
        .and(header("Authorization", "Bearer test-api-key"))
        .and(body_partial_json(json!({"name": "garden-scenario-v1", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "completion": "{\"Scenario\": \"A fork\"}",
            "threadId": "thread-123",
            "raw": {
                "model": "gpt-4o-mini",
                "usage": { "prompt_tokens": 100, "completion_tokens": 50, "total_tokens": 150 }
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri(), 0);
    let response = client.run_pipe(&scenario_run()).await.unwrap();

    assert_eq!(response.completion, "{\"Scenario\": \"A fork\"}");
}

#[tokio::test]
async fn test_api_error_without_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/pipes/run"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri(), 0);
    let err = client.run_pipe(&scenario_run()).await.unwrap_err();

    match err {
        LangbaseError::Unavailable { message, retries } => {
            assert_eq!(retries, 0);
            assert!(message.contains("401"));
            assert!(message.contains("bad key"));
        }
        other => panic!("Expected Unavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_retries_until_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/pipes/run"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri(), 2);
    let err = client.run_pipe(&scenario_run()).await.unwrap_err();

    assert!(matches!(err, LangbaseError::Unavailable { retries: 2, .. }));
}

#[tokio::test]
async fn test_retry_recovers_after_transient_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/pipes/run"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/pipes/run"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "completion": "You see a lantern in the fog."
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri(), 3);
    let response = client.run_pipe(&scenario_run()).await.unwrap();
    assert_eq!(response.completion, "You see a lantern in the fog.");
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/pipes/run"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri(), 0);
    let err = client.run_pipe(&scenario_run()).await.unwrap_err();
    assert!(err.to_string().contains("Failed to parse response"));
}

#[tokio::test]
async fn test_ensure_garden_pipes_upserts_both_pipes() {
    let mock_server = MockServer::start().await;
    let pipes = PipeConfig::default();

    Mock::given(method("POST"))
        .and(path("/v1/pipes"))
        .and(body_partial_json(json!({
            "name": "garden-scenario-v1",
            "upsert": true,
            "json": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "garden-scenario-v1",
            "status": "public",
            "url": "https://langbase.com/garden-scenario-v1"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/pipes"))
        .and(body_partial_json(json!({
            "name": "garden-vision-v1",
            "upsert": true,
            "json": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "garden-vision-v1",
            "description": "vision",
            "status": "public",
            "url": "https://langbase.com/garden-vision-v1"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri(), 0);
    client.ensure_garden_pipes(&pipes).await.unwrap();
}

#[tokio::test]
async fn test_ensure_garden_pipes_tolerates_conflict() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/pipes"))
        .respond_with(ResponseTemplate::new(409).set_body_string("exists"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri(), 0);
    client
        .ensure_garden_pipes(&PipeConfig::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_ensure_garden_pipes_fails_on_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/pipes"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri(), 0);
    let err = client
        .ensure_garden_pipes(&PipeConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LangbaseError::Api { status: 500, .. }));
}
