//! HTTP API module
//!
//! This module contains the webhook, callback and health endpoints.

pub mod handlers;
pub mod responses;
pub mod webhook;

use std::sync::Arc;
use axum::{
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::state::{app_state::CRON_PATH, AppState};
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/whatsapp", get(verify_handler).post(webhook_handler))
        .route(CRON_PATH, get(cron_handler).post(cron_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        state::{Resolution, TimerStatus},
        tasks::inbound::{REPLY_ALERT_SENT, REPLY_HELP, REPLY_SAFE},
        testing::{Harness, CONTACT, VERIFY_TOKEN},
    };
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };
    use std::time::Duration;
    use tower::ServiceExt;

    async fn call(h: &Harness, request: Request<Body>) -> (StatusCode, String) {
        let response = create_router(Arc::clone(&h.state)).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn message(from: &str, text: &str) -> Request<Body> {
        message_with_host(from, text, Some("bot.example.com"))
    }

    fn message_with_host(from: &str, text: &str, host: Option<&str>) -> Request<Body> {
        let payload = serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "changes": [{
                    "value": {
                        "messages": [{ "from": from, "type": "text", "text": { "body": text } }]
                    }
                }]
            }]
        });
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/whatsapp")
            .header("content-type", "application/json");
        if let Some(host) = host {
            builder = builder.header("host", host);
        }
        builder.body(Body::from(payload.to_string())).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_verification_echoes_challenge() {
        let h = Harness::new();
        let uri = format!(
            "/api/whatsapp?hub.mode=subscribe&hub.verify_token={}&hub.challenge=12345",
            VERIFY_TOKEN
        );
        assert_eq!(call(&h, get_request(&uri)).await, (StatusCode::OK, "12345".to_string()));
    }

    #[tokio::test]
    async fn test_verification_rejects_wrong_token() {
        let h = Harness::new();
        let (status, body) = call(&h, get_request("/api/whatsapp?hub.verify_token=nope&hub.challenge=1")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, "Forbidden");

        let (status, _) = call(&h, get_request("/api/whatsapp?hub.challenge=1")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unsupported_method() {
        let h = Harness::new();
        let request = Request::builder()
            .method(Method::PUT)
            .uri("/api/whatsapp")
            .body(Body::empty())
            .unwrap();
        let (status, _) = call(&h, request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_start_and_safe_over_http() {
        let h = Harness::new();

        let (status, body) = call(&h, message("1555", "Start showing 15")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());

        let record = h.timers().get_timer("1555").await.unwrap().unwrap();
        assert_eq!(record.status, TimerStatus::Active);
        assert_eq!(record.minutes, 15);
        assert_eq!(h.scheduler.scheduled()[0].0, "https://bot.example.com/api/cron");

        call(&h, message("1555", "I am safe")).await;
        let record = h.timers().get_timer("1555").await.unwrap().unwrap();
        assert_eq!(record.status, TimerStatus::Resolved);
        assert_eq!(record.resolution, Some(Resolution::Safe));
        assert_eq!(h.messenger.sent_to("1555").last().map(String::as_str), Some(REPLY_SAFE));
    }

    #[tokio::test]
    async fn test_help_without_host_header_alerts_contact() {
        let h = Harness::new();
        let (status, _) = call(&h, message_with_host("1555", "help", None)).await;
        assert_eq!(status, StatusCode::OK);

        let alerts = h.messenger.sent_to(CONTACT);
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].contains("Reason: manual"));
        assert_eq!(h.messenger.sent_to("1555"), vec![REPLY_ALERT_SENT.to_string()]);
    }

    #[tokio::test]
    async fn test_safe_without_host_header_resolves() {
        let h = Harness::new();
        call(&h, message("1555", "start showing 15")).await;
        call(&h, message_with_host("1555", "i am safe", None)).await;

        let record = h.timers().get_timer("1555").await.unwrap().unwrap();
        assert_eq!(record.resolution, Some(Resolution::Safe));
    }

    #[tokio::test]
    async fn test_unknown_command_over_http() {
        let h = Harness::new();
        call(&h, message("1555", "what now")).await;
        assert_eq!(h.messenger.sent_to("1555"), vec![REPLY_HELP.to_string()]);
    }

    #[tokio::test]
    async fn test_malformed_body_is_acknowledged() {
        let h = Harness::new();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/whatsapp")
            .body(Body::from("not json"))
            .unwrap();
        assert_eq!(call(&h, request).await.0, StatusCode::OK);
        assert!(h.messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn test_notification_without_message_is_noop() {
        let h = Harness::new();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/whatsapp")
            .body(Body::from(r#"{"entry":[{"changes":[{"value":{"statuses":[]}}]}]}"#))
            .unwrap();
        assert_eq!(call(&h, request).await.0, StatusCode::OK);
        assert!(h.messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn test_processing_failure_is_acknowledged() {
        let h = Harness::new();
        h.messenger.set_failing(true);
        let (status, _) = call(&h, message("1555", "help")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cron_expires_lapsed_timer() {
        let h = Harness::new();
        call(&h, message("1555", "start showing 1")).await;
        h.clock.advance(Duration::from_secs(61));

        assert_eq!(call(&h, get_request("/api/cron")).await, (StatusCode::OK, "ok".to_string()));

        let alerts = h.messenger.sent_to(CONTACT);
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].contains("missed check in"));
        let record = h.timers().get_timer("1555").await.unwrap().unwrap();
        assert_eq!(record.resolution, Some(Resolution::Alert));
    }

    #[tokio::test]
    async fn test_cron_accepts_post_with_nothing_due() {
        let h = Harness::new();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/cron")
            .body(Body::empty())
            .unwrap();
        assert_eq!(call(&h, request).await, (StatusCode::OK, "ok".to_string()));
    }

    #[tokio::test]
    async fn test_health() {
        let h = Harness::new();
        let (status, body) = call(&h, get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }
}
