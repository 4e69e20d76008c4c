use sadbot_core::{SentimentConfig, SentimentError, SentimentSource};
use sadbot_reasoning::{OpenAiSentiment, RelaySentiment, RetryConfig};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        backoff_factor: 2.0,
    }
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
}

fn openai_for(server: &MockServer) -> OpenAiSentiment {
    OpenAiSentiment::from_config(&SentimentConfig::default())
        .unwrap()
        .with_api_key("test-key")
        .with_base_url(&server.uri())
        .with_retry(fast_retry(2))
}

fn relay_for(server: &MockServer) -> RelaySentiment {
    let cfg = SentimentConfig {
        provider: "relay".into(),
        base_url: Some(server.uri()),
        ..SentimentConfig::default()
    };
    RelaySentiment::from_config(&cfg)
        .unwrap()
        .with_retry(fast_retry(2))
}

#[tokio::test]
async fn test_openai_scores_numeric_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini-2024-07-18",
            "max_tokens": 10
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("0.6")))
        .expect(1)
        .mount(&server)
        .await;

    let score = openai_for(&server).score_text("I feel great").await.unwrap();
    assert!((score - 0.6).abs() < 1e-6);
}

#[tokio::test]
async fn test_openai_out_of_range_is_clamped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("1.7")))
        .mount(&server)
        .await;

    let score = openai_for(&server).score_text("wow").await.unwrap();
    assert_eq!(score, 1.0);
}

#[tokio::test]
async fn test_openai_non_numeric_reply_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("positive")))
        .mount(&server)
        .await;

    let err = openai_for(&server).score_text("hi").await.unwrap_err();
    assert!(matches!(err, SentimentError::Parse(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_openai_unauthorized_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    let err = openai_for(&server).score_text("hi").await.unwrap_err();
    match err {
        SentimentError::Http { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "bad key");
        }
        other => panic!("expected Http error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_openai_retries_unavailable_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("-0.4")))
        .mount(&server)
        .await;

    let score = openai_for(&server).score_text("meh").await.unwrap();
    assert!((score + 0.4).abs() < 1e-6);
}

#[tokio::test]
async fn test_openai_gives_up_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let err = openai_for(&server).score_text("meh").await.unwrap_err();
    assert!(matches!(err, SentimentError::Http { status: 500, .. }));
}

#[tokio::test]
async fn test_relay_reads_sentiment_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/analyze-sentiment"))
        .and(body_partial_json(json!({ "text": "thank you" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sentiment": 0.8 })))
        .mount(&server)
        .await;

    let score = relay_for(&server).score_text("thank you").await.unwrap();
    assert!((score - 0.8).abs() < 1e-6);
}

#[tokio::test]
async fn test_relay_error_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/analyze-sentiment"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "error": "Failed to analyze sentiment" })),
        )
        .mount(&server)
        .await;

    let err = relay_for(&server).score_text("hello").await.unwrap_err();
    assert!(matches!(err, SentimentError::Http { status: 500, .. }));
}

#[tokio::test]
async fn test_relay_missing_field_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let err = relay_for(&server).score_text("hello").await.unwrap_err();
    assert!(matches!(err, SentimentError::Parse(_)));
}

#[tokio::test]
async fn test_unreachable_service_is_network_error() {
    let cfg = SentimentConfig {
        provider: "relay".into(),
        base_url: Some("http://127.0.0.1:9".into()),
        ..SentimentConfig::default()
    };
    let relay = RelaySentiment::from_config(&cfg)
        .unwrap()
        .with_retry(RetryConfig::none());
    let err = relay.score_text("hello").await.unwrap_err();
    assert!(matches!(err, SentimentError::Network(_)));
}
