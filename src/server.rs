//! The webhook HTTP server.
//!
//! Three routes: a health check, the Cloud API webhook (GET verification + POST
//! deliveries) and the Twilio-style form webhook. Both message routes acknowledge
//! every delivery with a success status; a non-2xx would make the provider
//! redeliver the same message in a loop, so failures are logged instead.

use crate::api::{twilio, Sender, WebhookPayload};
use crate::ingest;
use crate::model::Source;
use crate::{Config, Result};
use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

/// Shared state for the webhook handlers.
#[derive(Clone)]
pub(crate) struct AppState {
    config: Config,
    sender: Arc<dyn Sender>,
    verify_token: String,
}

impl AppState {
    pub(crate) fn new(config: Config, sender: Arc<dyn Sender>, verify_token: String) -> Self {
        Self {
            config,
            sender,
            verify_token,
        }
    }
}

/// Builds the application router.
pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/webhook", get(verify_webhook).post(cloud_webhook))
        .route("/twilio", post(twilio_webhook))
        .with_state(state)
}

/// Binds the listener and runs the server until the process is stopped.
pub(crate) async fn serve(state: AppState, port: u16) -> Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Unable to bind {addr}"))?;
    info!("Listening on http://{addr}");
    axum::serve(listener, router(state))
        .await
        .context("The server stopped unexpectedly")
}

/// GET / - liveness probe.
async fn health() -> &'static str {
    "OK - wa-gastos"
}

/// The `hub.*` query parameters Meta sends to verify a webhook subscription.
#[derive(Debug, Deserialize)]
struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// GET /webhook - answers the subscription handshake with the challenge when the
/// verify token matches, 403 otherwise.
async fn verify_webhook(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let subscribed = params.mode.as_deref() == Some("subscribe")
        && params.verify_token.as_deref() == Some(state.verify_token.as_str());
    if subscribed {
        info!("Webhook subscription verified");
        (StatusCode::OK, params.challenge.unwrap_or_default()).into_response()
    } else {
        StatusCode::FORBIDDEN.into_response()
    }
}

/// POST /webhook - one Cloud API delivery. Replies are sent out-of-band through
/// the [`Sender`]; the HTTP response is always 200.
async fn cloud_webhook(
    State(state): State<AppState>,
    Json(payload): Json<WebhookPayload>,
) -> StatusCode {
    // Status updates and other no-message events are acknowledged and dropped.
    let Some(message) = payload.first_message() else {
        return StatusCode::OK;
    };

    let from = message.from_wa_id();
    match ingest::handle_message(
        &state.config,
        from,
        message.text_body(),
        Source::WhatsappCloud,
    )
    .await
    {
        Ok(reply) => {
            if let Err(e) = state.sender.send_text(from, &reply).await {
                error!("Failed to deliver reply to {from}: {e:#}");
            }
        }
        Err(e) => error!("Failed to handle message from {from}: {e:#}"),
    }
    StatusCode::OK
}

/// POST /twilio - one form-encoded delivery; the reply travels back inline as
/// TwiML.
async fn twilio_webhook(
    State(state): State<AppState>,
    Form(message): Form<twilio::TwilioMessage>,
) -> Response {
    let from = message.from_wa_id();
    let twiml = match ingest::handle_message(
        &state.config,
        from,
        message.text_body(),
        Source::WhatsappTwilio,
    )
    .await
    {
        Ok(reply) => twilio::twiml_reply(&reply),
        Err(e) => {
            error!("Failed to handle message from {from}: {e:#}");
            twilio::twiml_empty()
        }
    };
    ([(header::CONTENT_TYPE, "text/xml")], twiml).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestSender;
    use axum::body::Body;
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const VERIFY_TOKEN: &str = "secret-verify-token";

    struct TestApp {
        _dir: TempDir,
        config: Config,
        sender: Arc<TestSender>,
        router: Router,
    }

    async fn test_app() -> TestApp {
        let dir = TempDir::new().unwrap();
        let config = Config::create(dir.path().join("home"), "12345", Some("PAB"), None, None)
            .await
            .unwrap();
        let sender = Arc::new(TestSender::default());
        let state = AppState::new(
            config.clone(),
            sender.clone(),
            VERIFY_TOKEN.to_string(),
        );
        TestApp {
            _dir: dir,
            config,
            sender,
            router: router(state),
        }
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn cloud_delivery(from: &str, body: &str) -> String {
        serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "changes": [{
                    "value": {
                        "messages": [{
                            "from": from,
                            "id": "wamid.TEST",
                            "type": "text",
                            "text": { "body": body }
                        }]
                    }
                }]
            }]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app().await;
        let response = app
            .router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "OK - wa-gastos");
    }

    #[tokio::test]
    async fn test_webhook_verification_succeeds() {
        let app = test_app().await;
        let uri = format!(
            "/webhook?hub.mode=subscribe&hub.verify_token={VERIFY_TOKEN}&hub.challenge=12345678"
        );
        let response = app
            .router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "12345678");
    }

    #[tokio::test]
    async fn test_webhook_verification_rejects_bad_token() {
        let app = test_app().await;
        let response = app
            .router
            .oneshot(
                Request::builder()
                    .uri("/webhook?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_cloud_webhook_records_and_replies() {
        let app = test_app().await;
        let response = app
            .router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(cloud_delivery("50761234567", "super 23.50 USD")))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let sent = app.sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "50761234567");
        assert_eq!(sent[0].body, "✅ Guardado: super – 23.50 USD");

        assert_eq!(app.config.db().count_expenses().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cloud_webhook_invalid_format_replies_without_recording() {
        let app = test_app().await;
        let response = app
            .router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(cloud_delivery("50761234567", "5 USD")))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let sent = app.sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body, ingest::INVALID_FORMAT_REPLY);
        assert_eq!(app.config.db().count_expenses().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cloud_webhook_ignores_status_events() {
        let app = test_app().await;
        let payload = serde_json::json!({
            "entry": [{ "changes": [{ "value": { "statuses": [{ "status": "delivered" }] } }] }]
        })
        .to_string();
        let response = app
            .router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(app.sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_twilio_webhook_replies_with_twiml() {
        let app = test_app().await;
        let response = app
            .router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/twilio")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(
                        "From=whatsapp%3A%2B50761234567&Body=farmacia+12%2C30",
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/xml"
        );

        let twiml = body_string(response).await;
        assert!(twiml.contains("✅ Guardado: farmacia – 12.30 PAB"));

        // The record belongs to the prefix-stripped sender id and carries its source.
        let stored = app.config.db().recent_expenses(None, 10).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].user_wa_id(), "+50761234567");
        assert_eq!(stored[0].source(), Source::WhatsappTwilio);

        // Nothing goes through the out-of-band sender for this transport.
        assert!(app.sender.sent().is_empty());
    }
}
