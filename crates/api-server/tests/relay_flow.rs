//! End-to-end relay flow against local stand-ins for the destination APIs.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::routing::post;
use axum::{Form, Json, Router};
use http_body_util::BodyExt;
use relay_analytics::EventLog;
use relay_api::{ApiServer, AppState};
use relay_core::config::AppConfig;
use relay_core::hashing::sha256_normalized;
use relay_destinations::DestinationRouter;
use serde_json::{json, Value};
use tower::ServiceExt;

const PEER: ([u8; 4], u16) = ([10, 1, 2, 3], 54321);

/// Form fields of every request the fake primary destination received.
type Captured = Arc<Mutex<Vec<HashMap<String, String>>>>;

async fn spawn_destinations() -> (String, Captured) {
    let captured: Captured = Arc::default();

    let app = Router::new()
        .route(
            "/meta/:pixel/events",
            post(
                |State(captured): State<Captured>,
                 Form(fields): Form<HashMap<String, String>>| async move {
                    captured.lock().unwrap().push(fields);
                    Json(json!({"events_received": 1, "fbtrace_id": "trace"}))
                },
            ),
        )
        .route(
            "/meta-rejecting/:pixel/events",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": {"message": "Invalid OAuth access token"}})),
                )
            }),
        )
        .route(
            "/tiktok/track",
            post(|| async { Json(json!({"code": 0, "message": "OK"})) }),
        )
        .route(
            "/reddit/:account",
            post(|| async { Json(json!({"message": "Successfully processed"})) }),
        )
        .with_state(captured.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), captured)
}

fn config(base: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.dispatch.timeout_ms = 2_000;
    config.meta.access_token = "EAAB-token".into();
    config.meta.pixel_id = "123".into();
    config.meta.graph_api_url = format!("{base}/meta");
    config.tiktok.access_token = "tt-token".into();
    config.tiktok.pixel_id = "CPIXEL01".into();
    config.tiktok.events_api_url = format!("{base}/tiktok/track");
    config.reddit.access_token = "rdt-token".into();
    config.reddit.pixel_id = "a2_account".into();
    config.reddit.conversions_api_url = format!("{base}/reddit");
    config
}

fn relay(config: &AppConfig) -> (Router, Arc<EventLog>) {
    let router = Arc::new(DestinationRouter::new(config).unwrap());
    let log = Arc::new(EventLog::new(config.event_log.capacity));
    let app = ApiServer::app(AppState::new(router, log.clone()))
        .layer(MockConnectInfo(SocketAddr::from(PEER)));
    (app, log)
}

async fn post_event(app: &Router, body: &str, forwarded_for: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method("POST")
        .uri("/event")
        .header("content-type", "application/json");
    if let Some(xff) = forwarded_for {
        request = request.header("x-forwarded-for", xff);
    }
    let response = app
        .clone()
        .oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

const PURCHASE: &str =
    r#"{"event_name":"Purchase","custom_data":{"content_ids":["1"],"value":10.0,"currency":"USD"}}"#;

#[tokio::test]
async fn test_purchase_is_relayed_and_logged() {
    let (base, _) = spawn_destinations().await;
    let (app, log) = relay(&config(&base));

    let (status, body) = post_event(&app, PURCHASE, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["events_received"], 1);

    let entries = log.snapshot();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.payload_sent.event_name.as_str(), "Purchase");
    assert_eq!(entry.payload_sent.user_data.client_ip_address, "10.1.2.3");
    assert_eq!(entry.meta_status_code, Some(200));
    assert_eq!(entry.tiktok_status_code, Some(200));
    assert_eq!(entry.reddit_status_code, Some(200));
}

#[tokio::test]
async fn test_forwarded_for_takes_precedence_over_peer() {
    let (base, _) = spawn_destinations().await;
    let (app, log) = relay(&config(&base));

    let (status, _) = post_event(&app, PURCHASE, Some("203.0.113.7, 10.0.0.1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        log.snapshot()[0].payload_sent.user_data.client_ip_address,
        "203.0.113.7"
    );
}

#[tokio::test]
async fn test_body_ip_is_ignored() {
    let (base, _) = spawn_destinations().await;
    let (app, log) = relay(&config(&base));

    let body = r#"{"event_name":"Lead","user_data":{"client_ip_address":"1.1.1.1"}}"#;
    post_event(&app, body, None).await;
    assert_eq!(
        log.snapshot()[0].payload_sent.user_data.client_ip_address,
        "10.1.2.3"
    );
}

#[tokio::test]
async fn test_plaintext_email_never_reaches_primary() {
    let (base, captured) = spawn_destinations().await;
    let (app, log) = relay(&config(&base));

    let body = r#"{
        "event_name": "Lead",
        "event_id": "lead-1",
        "user_data": {"email": "Priya.Patel@example.com", "phone": "+15550100"}
    }"#;
    let (status, _) = post_event(&app, body, None).await;
    assert_eq!(status, StatusCode::OK);

    let received = captured.lock().unwrap().clone();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["access_token"], "EAAB-token");
    let data = &received[0]["data"];
    assert!(!data.contains("Priya.Patel@example.com"));
    assert!(!data.contains("+15550100"));

    let events: Value = serde_json::from_str(data).unwrap();
    assert_eq!(
        events[0]["user_data"]["em"][0],
        sha256_normalized("priya.patel@example.com").as_str()
    );

    // The audit snapshot keeps what the caller sent.
    assert_eq!(
        log.snapshot()[0].payload_sent.user_data.email.as_deref(),
        Some("Priya.Patel@example.com")
    );
}

#[tokio::test]
async fn test_invalid_json_is_rejected_before_dispatch() {
    let (base, captured) = spawn_destinations().await;
    let (app, log) = relay(&config(&base));

    for body in ["not json", "[1,2,3]", ""] {
        let (status, response) = post_event(&app, body, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response, json!({"error": "Invalid JSON"}));
    }
    assert!(log.is_empty());
    assert!(captured.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_event_name_is_rejected() {
    let (base, _) = spawn_destinations().await;
    let (app, log) = relay(&config(&base));

    for body in [r#"{}"#, r#"{"event_name":""}"#, r#"{"event_name":42}"#] {
        let (status, response) = post_event(&app, body, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response, json!({"error": "event_name is required"}));
    }
    assert!(log.is_empty());
}

#[tokio::test]
async fn test_wrong_shaped_user_data_is_rejected() {
    let (base, _) = spawn_destinations().await;
    let (app, log) = relay(&config(&base));

    let (status, response) =
        post_event(&app, r#"{"event_name":"Lead","user_data":"alex"}"#, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"].as_str().unwrap().starts_with("invalid event body"));
    assert!(log.is_empty());
}

#[tokio::test]
async fn test_unset_secondary_leaves_no_keys_in_log() {
    let (base, _) = spawn_destinations().await;
    let mut config = config(&base);
    config.tiktok.access_token.clear();
    let (app, _) = relay(&config);

    post_event(&app, PURCHASE, None).await;

    let (status, entries) = get_json(&app, "/event-log").await;
    assert_eq!(status, StatusCode::OK);
    let entry = &entries[0];
    assert!(entry.get("tiktok_status_code").is_none());
    assert!(entry.get("tiktok_response").is_none());
    assert_eq!(entry["meta_status_code"], 200);
    assert_eq!(entry["reddit_status_code"], 200);
}

#[tokio::test]
async fn test_primary_outage_surfaces_as_500() {
    let (base, _) = spawn_destinations().await;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = listener.local_addr().unwrap();
    drop(listener);

    let mut config = config(&base);
    config.meta.graph_api_url = format!("http://{dead}");
    let (app, log) = relay(&config);

    let (status, body) = post_event(&app, PURCHASE, None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());

    let entry = &log.snapshot()[0];
    assert_eq!(entry.meta_status_code, Some(500));
    assert_eq!(entry.tiktok_status_code, Some(200));
}

#[tokio::test]
async fn test_primary_error_status_is_mirrored() {
    let (base, _) = spawn_destinations().await;
    let mut config = config(&base);
    config.meta.graph_api_url = format!("{base}/meta-rejecting");
    let (app, _) = relay(&config);

    let (status, body) = post_event(&app, PURCHASE, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Invalid OAuth access token");
}

#[tokio::test]
async fn test_secondary_outage_does_not_change_response() {
    let (base, _) = spawn_destinations().await;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = listener.local_addr().unwrap();
    drop(listener);

    let mut config = config(&base);
    config.tiktok.events_api_url = format!("http://{dead}/track");
    config.reddit.conversions_api_url = format!("http://{dead}");
    let (app, log) = relay(&config);

    let (status, body) = post_event(&app, PURCHASE, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["events_received"], 1);

    let entry = &log.snapshot()[0];
    assert_eq!(entry.tiktok_status_code, Some(500));
    assert_eq!(entry.reddit_status_code, Some(500));
}

#[tokio::test]
async fn test_event_log_is_newest_first() {
    let (base, _) = spawn_destinations().await;
    let (app, _) = relay(&config(&base));

    for name in ["ViewContent", "AddToCart", "Purchase"] {
        let body = format!(r#"{{"event_name":"{name}"}}"#);
        post_event(&app, &body, None).await;
    }

    let (_, entries) = get_json(&app, "/event-log").await;
    let names: Vec<_> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["payload_sent"]["event_name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Purchase", "AddToCart", "ViewContent"]);
}

#[tokio::test]
async fn test_health_reports_log_size() {
    let (base, _) = spawn_destinations().await;
    let (app, _) = relay(&config(&base));
    post_event(&app, PURCHASE, None).await;

    let (status, health) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["log_entries"], 1);
    assert_eq!(health["log_capacity"], 100);
}
