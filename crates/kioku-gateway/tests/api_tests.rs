// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end router tests with in-process requests.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use kioku_agent::Orchestrator;
use kioku_analysis::TimeProvider;
use kioku_config::model::KiokuConfig;
use kioku_d1::SessionStore;
use kioku_gateway::{AppContext, build_router};
use kioku_llm::OpenAiClient;
use kioku_vector::VectorMemoryStore;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BOUNDARY: &str = "kioku-test-boundary";

fn context_with(config: KiokuConfig, openai_base: Option<&str>) -> AppContext {
    let mut llm = OpenAiClient::new(&config.openai).unwrap();
    if let Some(base) = openai_base {
        llm = llm.with_base_url(base.to_string());
    }
    let vector = VectorMemoryStore::new(&config.milvus, &config.memory).unwrap();
    let sessions = SessionStore::new(&config.d1).unwrap();
    let time = TimeProvider::new(&config.time.timezone);
    let orchestrator = Orchestrator::new(
        llm.clone(),
        vector.clone(),
        sessions.clone(),
        time.clone(),
        &config.memory,
    );
    AppContext {
        orchestrator,
        sessions,
        vector,
        llm,
        time,
        config,
    }
}

fn default_context() -> AppContext {
    context_with(KiokuConfig::default(), None)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn multipart_body(filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(uri: &str, filename: &str, content: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(filename, content)))
        .unwrap()
}

#[tokio::test]
async fn root_and_health_are_public() {
    let mut config = KiokuConfig::default();
    config.server.bearer_token = Some("secret".into());
    let app = build_router(context_with(config, None));

    let response = app
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "running");

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["services"]["d1"], false);
}

#[tokio::test]
async fn api_routes_require_bearer_token() {
    let mut config = KiokuConfig::default();
    config.server.bearer_token = Some("secret".into());
    let app = build_router(context_with(config, None));

    let response = app
        .clone()
        .oneshot(
            Request::get("/api/chat/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::get("/api/chat/stats")
                .header(header::AUTHORIZATION, "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::get("/api/chat/stats")
                .header(header::AUTHORIZATION, "Bearer secret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn chat_rejects_empty_message() {
    let app = build_router(default_context());
    let response = app
        .oneshot(
            Request::post("/api/chat")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "message": "   " }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn chat_returns_reply_with_degraded_stores() {
    let openai = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"embedding": [0.1, 0.2], "index": 0}]
        })))
        .mount(&openai)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "Hi Ada."}}]
        })))
        .mount(&openai)
        .await;

    let mut config = KiokuConfig::default();
    config.openai.api_key = Some("sk-test".into());
    let app = build_router(context_with(config, Some(&openai.uri())));

    let response = app
        .oneshot(
            Request::post("/api/chat")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "message": "hello, I'm Ada",
                        "history": [{"role": "user", "content": "earlier turn"}],
                        "session_id": "s-1"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["response"], "Hi Ada.");
    assert_eq!(body["session_id"], "s-1");
    assert_eq!(body["memory_stored"], false);
    assert!(body["memories"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn sessions_return_503_when_store_unconfigured() {
    let app = build_router(default_context());
    let response = app
        .oneshot(
            Request::get("/api/chat/sessions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("not configured"));
}

#[tokio::test]
async fn search_rejects_short_queries() {
    let app = build_router(default_context());
    let response = app
        .oneshot(
            Request::get("/api/chat/search?q=a")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stats_report_disabled_store() {
    let app = build_router(default_context());
    let response = app
        .oneshot(
            Request::get("/api/chat/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["stats"]["enabled"], false);
    assert_eq!(body["stats"]["session_count"], 0);
}

#[tokio::test]
async fn upload_stores_file_with_uuid_name() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = KiokuConfig::default();
    config.upload.dir = dir.path().to_string_lossy().into_owned();
    let app = build_router(context_with(config, None));

    let response = app
        .oneshot(multipart_request("/api/upload", "photo.png", b"not-a-real-png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["type"], "image");
    assert_eq!(body["filename"], "photo.png");
    assert_eq!(body["size"], 14);

    let stored: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(stored.len(), 1);
    let name = stored[0].as_ref().unwrap().file_name();
    assert!(name.to_string_lossy().ends_with(".png"));
    assert_ne!(name.to_string_lossy(), "photo.png");
}

#[tokio::test]
async fn upload_rejects_unsupported_extension() {
    let app = build_router(default_context());
    let response = app
        .oneshot(multipart_request("/api/upload", "payload.exe", b"MZ"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn upload_rejects_oversize_file() {
    let mut config = KiokuConfig::default();
    config.upload.max_file_bytes = 8;
    let app = build_router(context_with(config, None));

    let response = app
        .oneshot(multipart_request(
            "/api/upload",
            "big.png",
            b"way more than eight bytes",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn transcribe_rejects_non_audio() {
    let app = build_router(default_context());
    let response = app
        .oneshot(multipart_request("/api/transcribe", "notes.pdf", b"%PDF"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn transcribe_forwards_audio_to_llm() {
    let openai = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "hello from the clip"
        })))
        .mount(&openai)
        .await;

    let mut config = KiokuConfig::default();
    config.openai.api_key = Some("sk-test".into());
    let app = build_router(context_with(config, Some(&openai.uri())));

    let response = app
        .oneshot(multipart_request("/api/transcribe", "clip.wav", b"RIFF"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["text"], "hello from the clip");
    assert_eq!(body["success"], true);
}
