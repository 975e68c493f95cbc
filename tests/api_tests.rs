use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use smart_summary::ai::{LlmClient, Summarizer, SummaryStream};
use smart_summary::api::SummaryServer;
use smart_summary::core::config::AppConfig;
use smart_summary::errors::SummaryError;
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Summarizer stand-in that replays fixed chunks and records its inputs.
struct MockSummarizer {
    chunks: Vec<Result<String, String>>,
    fail_on_call: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl MockSummarizer {
    fn yielding(chunks: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            chunks: chunks.iter().map(|c| Ok((*c).to_string())).collect(),
            fail_on_call: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn with_chunks(chunks: Vec<Result<String, String>>) -> Arc<Self> {
        Arc::new(Self {
            chunks,
            fail_on_call: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            chunks: Vec::new(),
            fail_on_call: Some(message.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummaryError> {
        self.calls.lock().unwrap().push(text.to_string());
        Ok(self
            .chunks
            .iter()
            .filter_map(|c| c.as_ref().ok().cloned())
            .collect())
    }

    async fn summarize_stream(&self, text: &str) -> Result<SummaryStream, SummaryError> {
        self.calls.lock().unwrap().push(text.to_string());
        if let Some(message) = &self.fail_on_call {
            return Err(SummaryError::OpenAIError(message.clone()));
        }

        let items: Vec<Result<String, SummaryError>> = self
            .chunks
            .iter()
            .map(|c| c.clone().map_err(SummaryError::OpenAIError))
            .collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

async fn spawn_app(summarizer: Arc<dyn Summarizer>) -> String {
    spawn_with_config(AppConfig::default(), summarizer).await
}

async fn spawn_with_config(config: AppConfig, summarizer: Arc<dyn Summarizer>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = SummaryServer::with_summarizer(config, summarizer).router();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn test_healthcheck() {
    let base = spawn_app(MockSummarizer::yielding(&[])).await;

    let response = reqwest::get(format!("{base}/health")).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.json::<Value>().await.unwrap(),
        json!({ "status": "healthy" })
    );
}

#[tokio::test]
async fn test_summarize_streams_mock_summary() {
    let summarizer = MockSummarizer::yielding(&["This is a mock summary."]);
    let base = spawn_app(summarizer.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/v1/summarize"))
        .json(&json!({ "text": "Test input text." }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );
    assert!(
        response
            .text()
            .await
            .unwrap()
            .contains("This is a mock summary.")
    );
    assert_eq!(summarizer.calls(), vec!["Test input text.".to_string()]);
}

#[tokio::test]
async fn test_summarize_preserves_chunk_order() {
    let base = spawn_app(MockSummarizer::yielding(&["The ", "summary ", "is..."])).await;

    let body = reqwest::Client::new()
        .post(format!("{base}/v1/summarize"))
        .json(&json!({ "text": "Some long article." }))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert_eq!(body, "The summary is...");
}

#[tokio::test]
async fn test_empty_text_is_rejected_by_validation() {
    let summarizer = MockSummarizer::yielding(&["unused"]);
    let base = spawn_app(summarizer.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/v1/summarize"))
        .json(&json!({ "text": "" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("text"));
    assert!(summarizer.calls().is_empty());
}

#[tokio::test]
async fn test_missing_text_is_rejected_by_validation() {
    let summarizer = MockSummarizer::yielding(&["unused"]);
    let base = spawn_app(summarizer.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/v1/summarize"))
        .json(&json!({ "content": "wrong field" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 422);
    assert!(summarizer.calls().is_empty());
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let base = spawn_app(MockSummarizer::yielding(&["unused"])).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/v1/summarize"))
        .header("content-type", "application/json")
        .body("{\"text\": ")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 422);
}

#[tokio::test]
async fn test_upstream_error_maps_to_bad_gateway() {
    let base = spawn_app(MockSummarizer::failing("invalid api key")).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/v1/summarize"))
        .json(&json!({ "text": "Test input text." }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 502);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["type"], "upstream_error");
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("invalid api key")
    );
}

#[tokio::test]
async fn test_error_before_first_chunk_sends_no_summary_text() {
    let summarizer = MockSummarizer::with_chunks(vec![
        Err("stream reset".to_string()),
        Ok("never sent".to_string()),
    ]);
    let base = spawn_app(summarizer).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/v1/summarize"))
        .json(&json!({ "text": "Test input text." }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 502);
    assert!(!response.text().await.unwrap().contains("never sent"));
}

#[tokio::test]
async fn test_summarizer_without_output_is_bad_gateway() {
    let base = spawn_app(MockSummarizer::yielding(&[])).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/v1/summarize"))
        .json(&json!({ "text": "Test input text." }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 502);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["type"], "upstream_error");
}

#[tokio::test]
async fn test_unsupported_model_is_server_error() {
    let config = AppConfig {
        openai_model: "not-a-real-model".to_string(),
        ..AppConfig::default()
    };
    let summarizer = MockSummarizer::yielding(&["unused"]);
    let base = spawn_with_config(config, summarizer.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/v1/summarize"))
        .json(&json!({ "text": "Test input text." }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    assert!(summarizer.calls().is_empty());
}

#[tokio::test]
async fn test_docs_and_openapi_document() {
    let base = spawn_app(MockSummarizer::yielding(&[])).await;

    let docs = reqwest::get(format!("{base}/docs")).await.unwrap();
    assert_eq!(docs.status(), 200);
    assert!(
        docs.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );
    assert!(docs.text().await.unwrap().contains("swagger-ui"));

    let openapi: Value = reqwest::get(format!("{base}/openapi.json"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(openapi["info"]["title"], "Smart Summary App Backend");
    assert!(openapi["paths"]["/v1/summarize"]["post"].is_object());
}

#[tokio::test]
async fn test_cors_preflight_mirrors_origin() {
    let base = spawn_app(MockSummarizer::yielding(&[])).await;

    let response = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, format!("{base}/v1/summarize"))
        .header("origin", "http://frontend.example")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    let headers = response.headers();
    assert_eq!(
        headers["access-control-allow-origin"],
        "http://frontend.example"
    );
    assert_eq!(headers["access-control-allow-credentials"], "true");
}

#[tokio::test]
async fn test_summarize_end_to_end_against_mock_openai() {
    let upstream = MockServer::start().await;
    let sse = concat!(
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Rust is \"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"fast.\"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n"
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse.as_bytes().to_vec(), "text/event-stream"),
        )
        .expect(1)
        .mount(&upstream)
        .await;

    let config = AppConfig {
        openai_api_key: "test-api-key".to_string(),
        openai_base_url: format!("{}/v1", upstream.uri()),
        ..AppConfig::default()
    };
    let client = LlmClient::from_config(&config).unwrap();
    let base = spawn_with_config(config, Arc::new(client)).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/v1/summarize"))
        .json(&json!({ "text": "Rust is a fast language with a strong type system." }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "Rust is fast.");
}

#[tokio::test]
async fn test_upstream_unauthorized_end_to_end() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" }
        })))
        .mount(&upstream)
        .await;

    let config = AppConfig {
        openai_api_key: "bad-key".to_string(),
        openai_base_url: format!("{}/v1", upstream.uri()),
        ..AppConfig::default()
    };
    let client = LlmClient::from_config(&config).unwrap();
    let base = spawn_with_config(config, Arc::new(client)).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/v1/summarize"))
        .json(&json!({ "text": "Test input text." }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 502);
    let body: Value = response.json().await.unwrap();
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Incorrect API key provided")
    );
}

#[tokio::test]
async fn test_filtered_completion_without_text_end_to_end() {
    let upstream = MockServer::start().await;
    let sse = concat!(
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"content_filter\"}]}\n\n",
        "data: [DONE]\n\n"
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse.as_bytes().to_vec(), "text/event-stream"),
        )
        .mount(&upstream)
        .await;

    let config = AppConfig {
        openai_api_key: "test-api-key".to_string(),
        openai_base_url: format!("{}/v1", upstream.uri()),
        ..AppConfig::default()
    };
    let client = LlmClient::from_config(&config).unwrap();
    let base = spawn_with_config(config, Arc::new(client)).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/v1/summarize"))
        .json(&json!({ "text": "Test input text." }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 502);
    let body: Value = response.json().await.unwrap();
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("content_filter")
    );
}
