use std::time::Duration;

use chrono::Utc;
use reqwest::StatusCode;
use secrecy::SecretString;
use serde_json::{json, Map, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wesichain_respan::{
    Delivery, IngestClient, IngestError, LogPayload, RetryPolicy, Status, DOGFOOD_HEADER,
};

fn fast_retry(max_retries: usize) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_delay: Duration::from_millis(5),
        backoff_multiplier: 2.0,
        max_delay: Duration::from_millis(20),
    }
}

fn client(server: &MockServer, retry: RetryPolicy) -> IngestClient {
    IngestClient::new(
        format!("{}/ingest", server.uri()),
        SecretString::new("test-key".to_string()),
        Duration::from_secs(5),
        retry,
    )
    .unwrap()
}

fn payload(span_name: &str) -> LogPayload {
    let now = Utc::now();
    LogPayload {
        span_workflow_name: "dify".to_string(),
        span_name: span_name.to_string(),
        log_type: "generation".to_string(),
        start_time: now,
        timestamp: now,
        latency: 0.0,
        status: Status::Success,
        input: None,
        output: Some("hi".to_string()),
        error_message: None,
        trace_unique_id: None,
        trace_name: None,
        span_unique_id: None,
        span_parent_id: None,
        session_identifier: None,
        customer_identifier: None,
        usage: None,
        prompt_tokens: None,
        completion_tokens: None,
        total_request_tokens: None,
        metadata: Map::from_iter([
            ("integration".to_string(), json!("dify")),
            ("method".to_string(), json!("chat_messages")),
        ]),
    }
}

#[tokio::test]
async fn batch_is_posted_as_json_array_with_auth_headers() {
    let server = MockServer::start().await;
    let batch = vec![payload("dify.message"), payload("dify.assistant")];
    let expected: Value = serde_json::to_value(&batch).unwrap();

    Mock::given(method("POST"))
        .and(path("/ingest"))
        .and(header("authorization", "Bearer test-key"))
        .and(header(DOGFOOD_HEADER, "1"))
        .and(header("content-type", "application/json"))
        .and(body_json(expected))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let delivery = client(&server, fast_retry(3)).send_batch(&batch).await.unwrap();
    assert_eq!(delivery, Delivery::Accepted { attempts: 1 });
}

#[tokio::test]
async fn server_errors_are_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ingest"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ingest"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let delivery = client(&server, fast_retry(3))
        .send_batch(&[payload("dify.message")])
        .await
        .unwrap();
    assert_eq!(delivery, Delivery::Accepted { attempts: 2 });
}

#[tokio::test]
async fn retries_stop_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ingest"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server, fast_retry(3))
        .send_batch(&[payload("dify.message")])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        IngestError::Server { status } if status == StatusCode::SERVICE_UNAVAILABLE
    ));
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ingest"))
        .respond_with(ResponseTemplate::new(422))
        .expect(1)
        .mount(&server)
        .await;

    let delivery = client(&server, fast_retry(3))
        .send_batch(&[payload("dify.message")])
        .await
        .unwrap();
    assert_eq!(
        delivery,
        Delivery::Rejected {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            attempts: 1
        }
    );
}

#[tokio::test]
async fn unreachable_endpoint_is_a_request_error() {
    let client = IngestClient::new(
        "http://127.0.0.1:9/ingest",
        SecretString::new("test-key".to_string()),
        Duration::from_millis(500),
        fast_retry(2),
    )
    .unwrap();

    let err = client.send_batch(&[payload("dify.message")]).await.unwrap_err();
    assert!(matches!(err, IngestError::Request(_)));
}

#[test]
fn backoff_grows_and_caps() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay_for(1), Duration::from_secs(1));
    assert_eq!(policy.delay_for(2), Duration::from_secs(2));
    assert_eq!(policy.delay_for(3), Duration::from_secs(4));
    assert_eq!(policy.delay_for(10), Duration::from_secs(30));

    let none = RetryPolicy {
        max_retries: 0,
        ..RetryPolicy::default()
    };
    assert_eq!(none.max_attempts(), 1);
}
