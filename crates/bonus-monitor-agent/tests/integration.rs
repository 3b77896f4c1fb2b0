//! Integration tests for the Bonus Monitor Agent

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bonus_monitor_agent::{create_router, PageObserver, TelegramNotifier};
use bonus_monitor_core::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "123456:test-token";
const CHAT: &str = "-100200300";

const AVAILABLE_PAGE: &str = r#"<html><body>
    <h1>Bonus veicoli elettrici</h1>
    <p>Le prenotazioni sono aperte.</p>
</body></html>"#;

const EXHAUSTED_PAGE: &str = r#"<html><body>
    <h1>Bonus veicoli elettrici</h1>
    <div class="avviso"><strong>Tutte le risorse</strong> risultano al momento prenotate.</div>
</body></html>"#;

fn page_config(server: &MockServer) -> MonitorConfig {
    MonitorConfig::default().with_url(format!("{}/index.html", server.uri()))
}

fn telegram_config(server: &MockServer) -> TelegramConfig {
    TelegramConfig {
        api_base: server.uri(),
        bot_token: TOKEN.to_string(),
        chat_id: CHAT.to_string(),
    }
}

async fn mount_page(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/index.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_observer_classifies_available_page() {
    let server = MockServer::start().await;
    mount_page(&server, AVAILABLE_PAGE).await;

    let observer = PageObserver::new(&page_config(&server)).unwrap();
    assert_eq!(observer.observe().await.unwrap(), Status::Available);
}

#[tokio::test]
async fn test_observer_classifies_exhausted_page() {
    let server = MockServer::start().await;
    mount_page(&server, EXHAUSTED_PAGE).await;

    let observer = PageObserver::new(&page_config(&server)).unwrap();
    assert_eq!(observer.observe().await.unwrap(), Status::Exhausted);
}

#[tokio::test]
async fn test_observer_server_error_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let observer = PageObserver::new(&page_config(&server)).unwrap();
    let err = observer.observe().await.unwrap_err();
    assert!(matches!(err, MonitorError::Observation(_)));
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_observer_request_timeout_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(AVAILABLE_PAGE)
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = MonitorConfig {
        observe_timeout: Duration::from_millis(200),
        ..page_config(&server)
    };
    let observer = PageObserver::new(&config).unwrap();

    assert!(matches!(
        observer.observe().await,
        Err(MonitorError::Observation(_))
    ));
}

#[tokio::test]
async fn test_telegram_send_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendMessage", TOKEN)))
        .and(body_json(json!({ "chat_id": CHAT, "text": "hello" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = TelegramNotifier::new(&telegram_config(&server), Duration::from_secs(2));
    notifier.send("hello").await.unwrap();
}

#[tokio::test]
async fn test_telegram_unauthorized_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "ok": false,
            "error_code": 401,
            "description": "Unauthorized"
        })))
        .mount(&server)
        .await;

    let notifier = TelegramNotifier::new(&telegram_config(&server), Duration::from_secs(2));
    let err = notifier.send("hello").await.unwrap_err();

    assert!(matches!(err, MonitorError::Notification(_)));
    assert!(err.to_string().contains("Unauthorized"));
    assert!(!err.to_string().contains(TOKEN));
}

#[tokio::test]
async fn test_telegram_ok_false_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": false,
            "description": "Bad Request: chat not found"
        })))
        .mount(&server)
        .await;

    let notifier = TelegramNotifier::new(&telegram_config(&server), Duration::from_secs(2));
    let err = notifier.send("hello").await.unwrap_err();
    assert!(err.to_string().contains("chat not found"));
}

#[tokio::test]
async fn test_telegram_unreachable_hides_token() {
    let config = TelegramConfig {
        api_base: "http://127.0.0.1:1".to_string(),
        bot_token: TOKEN.to_string(),
        chat_id: CHAT.to_string(),
    };

    let notifier = TelegramNotifier::new(&config, Duration::from_secs(2));
    let err = notifier.send("hello").await.unwrap_err();

    assert!(matches!(err, MonitorError::Notification(_)));
    assert!(!err.to_string().contains(TOKEN));
}

#[tokio::test]
async fn test_full_cycle_notifies_once() {
    let page = MockServer::start().await;
    mount_page(&page, EXHAUSTED_PAGE).await;

    let telegram = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendMessage", TOKEN)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": {} })))
        .expect(1)
        .mount(&telegram)
        .await;

    let dir = TempDir::new().unwrap();
    let config = page_config(&page)
        .with_state_path(dir.path().join("status_bonus.json"))
        .with_telegram(telegram_config(&telegram));

    let store = Arc::new(JsonFileStore::new(&config.state_path));
    let observer = Arc::new(PageObserver::new(&config).unwrap());
    let notifier = Arc::new(TelegramNotifier::new(&config.telegram, config.notify_timeout));
    let engine = TransitionEngine::new(store.clone(), notifier, &config);
    let mut scheduler = PollScheduler::new(observer, engine, &config);

    assert!(scheduler.tick().await.unwrap().is_transition());
    assert_eq!(scheduler.tick().await.unwrap(), Action::None);
    assert_eq!(store.read(), Some(Status::Exhausted));

    let requests = telegram.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let text = body["text"].as_str().unwrap();
    assert!(text.contains("unknown → EXHAUSTED"));
    assert!(text.contains("/index.html"));
}

#[tokio::test]
async fn test_full_cycle_with_page_down_keeps_state() {
    let page = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&page)
        .await;

    let telegram = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(0)
        .mount(&telegram)
        .await;

    let dir = TempDir::new().unwrap();
    let config = page_config(&page)
        .with_state_path(dir.path().join("status_bonus.json"))
        .with_telegram(telegram_config(&telegram));

    let store = Arc::new(JsonFileStore::new(&config.state_path));
    store.write(Status::Available, chrono::Utc::now()).unwrap();

    let engine = TransitionEngine::new(
        store.clone(),
        Arc::new(TelegramNotifier::new(&config.telegram, config.notify_timeout)),
        &config,
    );
    let mut scheduler = PollScheduler::new(Arc::new(PageObserver::new(&config).unwrap()), engine, &config);

    assert_eq!(scheduler.tick().await.unwrap(), Action::None);
    assert_eq!(store.read(), Some(Status::Available));
    assert_eq!(scheduler.stats().unknown_observations, 1);
}

#[tokio::test]
async fn test_liveness_route() {
    let response = create_router()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("Monitor active"));
    assert!(html.contains("Current time:"));
}

#[tokio::test]
async fn test_no_other_routes() {
    let response = create_router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
