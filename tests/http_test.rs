mod support;

use std::sync::Arc;
use std::time::Duration;

use blogsmith::aws::{Credentials, Transport};
use blogsmith::clock::FixedClock;
use blogsmith::config::{GenerationSettings, StorageSettings};
use blogsmith::error::{AwsError, GenerateError, PublishError};
use blogsmith::generator::bedrock::BedrockRuntime;
use blogsmith::generator::{Generator, ModelInvoker};
use blogsmith::handler::{InvocationEvent, Pipeline, Response};
use blogsmith::publisher::s3::S3Store;
use blogsmith::publisher::{PublishOutcome, Publisher};
use support::{Canned, MockServer, closed_url};

const MODEL: &str = "us.meta.llama3-2-1b-instruct-v1:0";

fn transport(timeout: Duration, attempts: u32) -> Arc<Transport> {
    Arc::new(
        Transport::new(timeout, attempts)
            .unwrap()
            .with_base_backoff(Duration::from_millis(1)),
    )
}

fn credentials() -> Credentials {
    Credentials::new("AKID", "SECRET")
}

fn runtime(url: &str, attempts: u32) -> BedrockRuntime {
    BedrockRuntime::new(
        transport(Duration::from_secs(5), attempts),
        credentials(),
        "us-east-2",
        Some(url),
    )
    .unwrap()
}

fn s3(url: &str, attempts: u32) -> S3Store {
    S3Store::new(
        transport(Duration::from_secs(5), attempts),
        credentials(),
        "us-east-2",
        Some(url),
    )
    .unwrap()
}

fn generation(text: &str) -> String {
    serde_json::json!({
        "generation": text,
        "prompt_token_count": 31,
        "generation_token_count": 212,
        "stop_reason": "stop"
    })
    .to_string()
}

#[tokio::test]
async fn bedrock_invoke_is_signed_and_parsed() {
    let server = MockServer::start(vec![Canned::new(200, generation("Cats rule."))]).await;
    let generator = Generator::from_settings(
        Arc::new(runtime(&server.url, 3)),
        &GenerationSettings::default(),
    );

    assert_eq!(generator.produce("cats").await, "Cats rule.");

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert_eq!(req.method, "POST");
    assert_eq!(req.path, "/model/us.meta.llama3-2-1b-instruct-v1%3A0/invoke");
    assert!(
        req.headers["authorization"].starts_with("AWS4-HMAC-SHA256 Credential=AKID/"),
        "{}",
        req.headers["authorization"]
    );
    assert!(req.headers["authorization"].contains("/us-east-2/bedrock/aws4_request"));
    assert!(req.headers.contains_key("x-amz-date"));
    assert!(req.headers.contains_key("x-amz-content-sha256"));
    assert_eq!(req.headers["content-type"], "application/json");

    let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
    assert!(body["prompt"].as_str().unwrap().contains("blog on cats."));
    assert_eq!(body["max_gen_len"], 512);
}

#[tokio::test]
async fn bedrock_retries_server_errors() {
    let server = MockServer::start(vec![
        Canned::new(503, r#"{"message": "slow down"}"#),
        Canned::new(200, generation("second time lucky")),
    ])
    .await;

    let out = runtime(&server.url, 3).invoke(MODEL, b"{}".to_vec()).await.unwrap();

    assert_eq!(out, generation("second time lucky").into_bytes());
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn bedrock_gives_up_after_max_attempts() {
    let server = MockServer::start(vec![
        Canned::new(500, "{}"),
        Canned::new(500, "{}"),
        Canned::new(500, "{}"),
        Canned::new(200, generation("never reached")),
    ])
    .await;

    let err = runtime(&server.url, 3).invoke(MODEL, b"{}".to_vec()).await.unwrap_err();

    assert!(matches!(err, GenerateError::Remote { status: 500, .. }));
    assert_eq!(server.requests().len(), 3);
}

#[tokio::test]
async fn bedrock_client_error_is_not_retried() {
    let server = MockServer::start(vec![
        Canned::new(400, r#"{"message": "Malformed input request"}"#).header(
            "x-amzn-ErrorType",
            "ValidationException:http://internal.amazon.com/coral/com.amazon.bedrock/",
        ),
    ])
    .await;

    let err = runtime(&server.url, 3).invoke(MODEL, b"{}".to_vec()).await.unwrap_err();

    match err {
        GenerateError::Remote { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "ValidationException: Malformed input request");
        }
        other => panic!("expected Remote, got {other:?}"),
    }
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn bedrock_timeout_is_reported() {
    let server = MockServer::start(vec![
        Canned::new(200, generation("late")).delayed(Duration::from_secs(2)),
    ])
    .await;
    let runtime = BedrockRuntime::new(
        transport(Duration::from_millis(200), 1),
        credentials(),
        "us-east-2",
        Some(&server.url),
    )
    .unwrap();

    let err = runtime.invoke(MODEL, b"{}".to_vec()).await.unwrap_err();
    assert!(matches!(err, GenerateError::Request(AwsError::Timeout(_))));
}

#[tokio::test]
async fn s3_put_uses_path_style_and_plain_text() {
    let server = MockServer::start(vec![Canned::new(200, "")]).await;
    let publisher = Publisher::new(Arc::new(s3(&server.url, 3)), "bucket", "blog-output");

    let outcome = publisher.publish("cats", "120000", "Cats are great.").await;
    assert!(outcome.is_stored(), "{outcome:?}");

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert_eq!(req.method, "PUT");
    assert_eq!(req.path, "/bucket/blog-output/cats_120000.txt");
    assert_eq!(req.headers["content-type"], "text/plain");
    assert!(req.headers.contains_key("x-amz-checksum-sha256"));
    assert!(req.headers["authorization"].contains("/us-east-2/s3/aws4_request"));
    assert_eq!(req.body, b"Cats are great.");
}

#[tokio::test]
async fn s3_refuses_topic_with_dot_segments() {
    let server = MockServer::start(vec![Canned::new(200, "")]).await;
    let publisher = Publisher::new(Arc::new(s3(&server.url, 3)), "bucket", "blog-output");

    match publisher.publish("../secret", "120000", "text").await {
        PublishOutcome::Failed {
            error: PublishError::Client { status, code, .. },
            uri,
        } => {
            assert_eq!(status, 400);
            assert_eq!(code, "InvalidKey");
            assert_eq!(uri, "s3://bucket/blog-output/../secret_120000.txt");
        }
        other => panic!("expected InvalidKey, got {other:?}"),
    }
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn s3_access_denied_is_a_client_failure() {
    let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>AccessDenied</Code><Message>Access Denied</Message></Error>"#;
    let server = MockServer::start(vec![Canned::new(403, body)]).await;
    let publisher = Publisher::new(Arc::new(s3(&server.url, 3)), "bucket", "blog-output");

    match publisher.publish("cats", "120000", "text").await {
        PublishOutcome::Failed {
            error: PublishError::Client { status, code, .. },
            ..
        } => {
            assert_eq!(status, 403);
            assert_eq!(code, "AccessDenied");
        }
        other => panic!("expected client failure, got {other:?}"),
    }
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn s3_non_200_success_is_unexpected_status() {
    let server = MockServer::start(vec![Canned::new(202, "")]).await;
    let publisher = Publisher::new(Arc::new(s3(&server.url, 3)), "bucket", "blog-output");

    let outcome = publisher.publish("cats", "120000", "text").await;
    assert!(matches!(outcome, PublishOutcome::UnexpectedStatus { status: 202, .. }));
}

#[tokio::test]
async fn s3_unreachable_is_unexpected_failure() {
    let url = closed_url().await;
    let publisher = Publisher::new(Arc::new(s3(&url, 1)), "bucket", "blog-output");

    let outcome = publisher.publish("cats", "120000", "text").await;
    assert!(matches!(
        outcome,
        PublishOutcome::Failed {
            error: PublishError::Unexpected(_),
            ..
        }
    ));
}

#[tokio::test]
async fn pipeline_end_to_end_over_http() {
    let bedrock = MockServer::start(vec![Canned::new(200, generation("All about cats."))]).await;
    let storage = MockServer::start(vec![Canned::new(200, "")]).await;

    let pipeline = Pipeline::new(
        Generator::from_settings(Arc::new(runtime(&bedrock.url, 3)), &GenerationSettings::default()),
        Publisher::from_settings(Arc::new(s3(&storage.url, 3)), &StorageSettings::default()),
        Arc::new(FixedClock::at(9, 15, 0)),
    );

    let resp = pipeline.handle(&InvocationEvent::for_topic("cats")).await.unwrap();
    assert_eq!(resp, Response::acknowledged());

    let puts = storage.requests();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].path, "/aws-bedrock-content-generation/blog-output/cats_091500.txt");
    assert_eq!(puts[0].body, b"All about cats.");
}

#[tokio::test]
async fn pipeline_acknowledges_when_bedrock_is_down() {
    let bedrock_url = closed_url().await;
    let storage = MockServer::start(vec![Canned::new(200, "")]).await;

    let pipeline = Pipeline::new(
        Generator::from_settings(Arc::new(runtime(&bedrock_url, 1)), &GenerationSettings::default()),
        Publisher::from_settings(Arc::new(s3(&storage.url, 3)), &StorageSettings::default()),
        Arc::new(FixedClock::at(9, 15, 0)),
    );

    let resp = pipeline.handle(&InvocationEvent::for_topic("cats")).await.unwrap();
    assert_eq!(resp, Response::acknowledged());
    assert!(storage.requests().is_empty());
}
