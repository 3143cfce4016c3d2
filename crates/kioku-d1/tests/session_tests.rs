// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session store behavior against a mocked D1 query endpoint.

use kioku_config::model::D1Config;
use kioku_core::{KiokuError, Role};
use kioku_d1::{D1Client, FALLBACK_SESSION_TITLE, SessionStore};
use serde_json::{Value, json};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn d1_config() -> D1Config {
    D1Config {
        account_id: Some("acct".into()),
        database_id: Some("db".into()),
        api_token: Some("cf-token".into()),
        ..D1Config::default()
    }
}

fn store_for(server: &MockServer) -> SessionStore {
    let config = d1_config();
    let client = D1Client::new(&config)
        .unwrap()
        .with_query_url(format!("{}/query", server.uri()));
    SessionStore::new(&config).unwrap().with_client(client)
}

fn d1_ok(results: Value) -> Value {
    json!({
        "success": true,
        "errors": [],
        "result": [{"success": true, "results": results, "meta": {"duration": 1}}]
    })
}

fn session_row(id: &str, title: &str) -> Value {
    json!({"id": id, "title": title, "created_at": 1_700_000_000_000i64,
           "updated_at": 1_700_000_000_500i64})
}

#[tokio::test]
async fn create_then_get_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(header("authorization", "Bearer cf-token"))
        .and(body_string_contains("INSERT INTO chat_sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(d1_ok(json!([]))))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let session = store.create_session("Trip planning").await.unwrap();
    assert_eq!(session.title, "Trip planning");
    assert!(session.updated_at >= session.created_at);

    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_string_contains("SELECT id, title"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(d1_ok(json!([session_row(&session.id, "Trip planning")]))),
        )
        .mount(&server)
        .await;

    let fetched = store.get_session(&session.id).await.unwrap().unwrap();
    assert_eq!(fetched.id, session.id);
    assert_eq!(fetched.title, "Trip planning");
}

#[tokio::test]
async fn get_session_returns_none_for_unknown_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(d1_ok(json!([]))))
        .mount(&server)
        .await;

    assert!(store_for(&server).get_session("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn list_sessions_handles_columnar_result_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(d1_ok(json!({
            "columns": ["id", "title", "created_at", "updated_at"],
            "rows": [["s1", "First", 1_700_000_000_000i64, 1_700_000_002_000i64],
                     ["s2", "Second", 1_700_000_001_000i64, 1_700_000_001_000i64]]
        }))))
        .mount(&server)
        .await;

    let sessions = store_for(&server).list_sessions(None).await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].id, "s1");
    assert_eq!(sessions[1].title, "Second");
}

#[tokio::test]
async fn update_session_reports_missing_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_string_contains("SELECT id, title"))
        .respond_with(ResponseTemplate::new(200).set_body_json(d1_ok(json!([]))))
        .mount(&server)
        .await;

    let updated = store_for(&server)
        .update_session("ghost", Some("New title"))
        .await
        .unwrap();
    assert!(!updated);
}

#[tokio::test]
async fn delete_session_removes_messages_before_session_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_string_contains("SELECT id, title"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(d1_ok(json!([session_row("s1", "Chat")]))),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_string_contains("DELETE FROM chat_messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(d1_ok(json!([]))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_string_contains("DELETE FROM chat_sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(d1_ok(json!([]))))
        .expect(1)
        .mount(&server)
        .await;

    assert!(store_for(&server).delete_session("s1").await.unwrap());
}

#[tokio::test]
async fn add_message_creates_fallback_session_for_unknown_id() {
    let server = MockServer::start().await;
    // Lookup of the provided id finds nothing.
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_string_contains("SELECT id, title"))
        .respond_with(ResponseTemplate::new(200).set_body_json(d1_ok(json!([]))))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_string_contains("INSERT INTO chat_sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(d1_ok(json!([]))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_string_contains("INSERT INTO chat_messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(d1_ok(json!([]))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_string_contains("UPDATE chat_sessions SET updated_at"))
        .respond_with(ResponseTemplate::new(200).set_body_json(d1_ok(json!([]))))
        .expect(1)
        .mount(&server)
        .await;

    let (message, created) = store_for(&server)
        .add_message(Some("ghost"), Role::User, "hello")
        .await
        .unwrap();
    let created = created.expect("a fallback session should have been created");
    assert_eq!(created.title, FALLBACK_SESSION_TITLE);
    assert_eq!(message.session_id, created.id);
    assert_eq!(message.role, Role::User);
}

#[tokio::test]
async fn add_message_attaches_to_existing_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_string_contains("SELECT id, title"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(d1_ok(json!([session_row("s1", "Chat")]))),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_string_contains("INSERT INTO chat_messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(d1_ok(json!([]))))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_string_contains("UPDATE chat_sessions SET updated_at"))
        .respond_with(ResponseTemplate::new(200).set_body_json(d1_ok(json!([]))))
        .expect(1)
        .mount(&server)
        .await;

    let (message, created) = store_for(&server)
        .add_message(Some("s1"), Role::Assistant, "hi")
        .await
        .unwrap();
    assert!(created.is_none());
    assert_eq!(message.session_id, "s1");
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(d1_ok(json!([session_row("s1", "Chat")]))),
        )
        .mount(&server)
        .await;

    let session = store_for(&server).get_session("s1").await.unwrap();
    assert!(session.is_some());
}

#[tokio::test]
async fn search_messages_carries_session_title() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_string_contains("LIKE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(d1_ok(json!([{
            "id": "m1", "session_id": "s1", "role": "user",
            "content": "remember the milk", "timestamp": 1_700_000_000_000i64,
            "title": "Groceries"
        }]))))
        .mount(&server)
        .await;

    let matches = store_for(&server).search_messages("milk", None).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].session_title, "Groceries");
    assert_eq!(matches[0].message.content, "remember the milk");
}

#[tokio::test]
async fn unconfigured_store_is_unavailable() {
    let store = SessionStore::new(&D1Config::default()).unwrap();
    assert!(!store.is_enabled());

    let err = store.get_session("s1").await.unwrap_err();
    assert!(matches!(err, KiokuError::Unavailable { .. }));

    let stats = store.stats().await.unwrap();
    assert!(!stats.enabled);
    assert_eq!(stats.session_count, 0);
}
