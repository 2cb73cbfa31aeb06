//! HTTP surface — webhook verification, webhook intake, customer lookup and
//! health.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};
use futures::future::join_all;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use super::WhatsAppConfig;
use super::signature::{SIGNATURE_HEADER, verify_signature};
use super::webhook::{WebhookPayload, parse_payload};
use crate::conversation::InboundEnvelope;
use crate::service::ConversationService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ConversationService>,
    pub config: Arc<WhatsAppConfig>,
}

/// Build the Axum router with the webhook and status routes.
pub fn webhook_routes(state: AppState) -> Router {
    if state.config.app_secret.is_none() {
        warn!("META_APP_SECRET not set; webhook signatures will not be checked");
    }

    Router::new()
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        .route("/api/customers/{identifier}", get(get_customer))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "order-assist",
        "transport": state.service.transport_name(),
    }))
}

// ── Verification handshake ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

async fn verify_webhook(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> impl IntoResponse {
    let token_ok = params.verify_token.as_deref()
        == Some(state.config.verify_token.expose_secret());

    match (params.mode.as_deref(), params.challenge) {
        (Some("subscribe"), Some(challenge)) if token_ok => {
            info!("Webhook verified");
            (StatusCode::OK, challenge)
        }
        _ => {
            warn!(mode = ?params.mode, "Webhook verification rejected");
            (StatusCode::FORBIDDEN, String::new())
        }
    }
}

// ── Intake ──────────────────────────────────────────────────────────

async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if let Some(secret) = &state.config.app_secret {
        let header = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok());
        if !verify_signature(secret.expose_secret().as_bytes(), header, &body) {
            warn!("Webhook signature mismatch");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let raw: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "Unparseable webhook body");
            return StatusCode::BAD_REQUEST;
        }
    };
    // Valid JSON in a shape we don't know is acknowledged, not retried.
    let payload = match WebhookPayload::deserialize(&raw) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "Ignoring webhook with unexpected shape");
            return StatusCode::OK;
        }
    };

    let envelopes = parse_payload(&payload);
    debug!(
        messages = envelopes.len(),
        statuses = payload.status_count(),
        "Webhook received"
    );

    if process_all(&state.service, envelopes).await {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Process envelopes in order per sender, senders in parallel. Returns
/// `false` if any envelope failed.
async fn process_all(service: &ConversationService, envelopes: Vec<InboundEnvelope>) -> bool {
    let mut order: Vec<String> = Vec::new();
    let mut by_sender: HashMap<String, Vec<InboundEnvelope>> = HashMap::new();
    for envelope in envelopes {
        if !by_sender.contains_key(&envelope.identifier) {
            order.push(envelope.identifier.clone());
        }
        by_sender
            .entry(envelope.identifier.clone())
            .or_default()
            .push(envelope);
    }

    let runs = order
        .into_iter()
        .filter_map(|id| by_sender.remove(&id))
        .map(|batch| async move {
            let mut ok = true;
            for envelope in &batch {
                if let Err(e) = service.process(envelope).await {
                    error!(identifier = %envelope.identifier, error = %e, "Failed to process message");
                    ok = false;
                }
            }
            ok
        });

    join_all(runs).await.into_iter().all(|ok| ok)
}

// ── Status ──────────────────────────────────────────────────────────

async fn get_customer(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> impl IntoResponse {
    match state.service.gateway().get(&identifier).await {
        Ok(Some(snapshot)) => (StatusCode::OK, Json(serde_json::json!(snapshot))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "Customer not found"})),
        ),
        Err(e) => {
            error!(%identifier, error = %e, "Customer lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Storage unavailable"})),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use secrecy::SecretString;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::channels::whatsapp::{RecordingTransport, sign};
    use crate::conversation::{ConversationEngine, EngineConfig};
    use crate::delivery::{DeliveryEligibility, EligibilityConfig, StaticZoneCatalog};
    use crate::gateway::CustomerStateGateway;
    use crate::geocode::OfflineGeocoder;
    use crate::store::InMemoryStore;

    fn app(app_secret: Option<&str>) -> (Router, Arc<RecordingTransport>) {
        let eligibility = DeliveryEligibility::new(
            Arc::new(StaticZoneCatalog::default_zones()),
            Arc::new(OfflineGeocoder),
            EligibilityConfig::default(),
        );
        let transport = Arc::new(RecordingTransport::new());
        let service = ConversationService::new(
            ConversationEngine::new(Arc::new(eligibility), EngineConfig::default()),
            CustomerStateGateway::new(Arc::new(InMemoryStore::new())),
            transport.clone(),
            Duration::ZERO,
        );
        let mut config = WhatsAppConfig::for_tests();
        config.app_secret = app_secret.map(SecretString::from);
        let router = webhook_routes(AppState {
            service: Arc::new(service),
            config: Arc::new(config),
        });
        (router, transport)
    }

    fn text_message(from: &str, id: &str, body: &str) -> Value {
        json!({
            "object": "whatsapp_business_account",
            "entry": [{"changes": [{"field": "messages", "value": {
                "contacts": [{"profile": {"name": "Asha"}, "wa_id": from}],
                "messages": [{"from": from, "id": id, "type": "text", "text": {"body": body}}]
            }}]}]
        })
    }

    fn post(body: Vec<u8>, signature: Option<String>) -> Request<Body> {
        let mut req = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json");
        if let Some(sig) = signature {
            req = req.header(SIGNATURE_HEADER, sig);
        }
        req.body(Body::from(body)).unwrap()
    }

    async fn body_string(resp: axum::response::Response) -> String {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn verification_echoes_challenge() {
        let (app, _) = app(None);
        let resp = app
            .oneshot(
                Request::get("/webhook?hub.mode=subscribe&hub.verify_token=verify-me&hub.challenge=42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "42");
    }

    #[tokio::test]
    async fn verification_rejects_wrong_token() {
        let (app, _) = app(None);
        let resp = app
            .oneshot(
                Request::get("/webhook?hub.mode=subscribe&hub.verify_token=nope&hub.challenge=42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn signed_message_is_processed() {
        let (app, transport) = app(Some("shh"));
        let body = serde_json::to_vec(&text_message("15550001111", "wamid.1", "hi")).unwrap();
        let sig = sign(b"shh", &body);

        let resp = app.oneshot(post(body, Some(sig))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let sent = transport.deliveries_to("15550001111").await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body().starts_with("Welcome Asha!"));
    }

    #[tokio::test]
    async fn bad_signature_is_rejected() {
        let (app, transport) = app(Some("shh"));
        let body = serde_json::to_vec(&text_message("15550001111", "wamid.1", "hi")).unwrap();
        let sig = sign(b"other", &body);

        let resp = app.clone().oneshot(post(body.clone(), Some(sig))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let resp = app.oneshot(post(body, None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(transport.deliveries().await.is_empty());
    }

    #[tokio::test]
    async fn unparseable_body_is_bad_request() {
        let (app, _) = app(None);
        let resp = app.oneshot(post(b"{not json".to_vec(), None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_message_is_dropped_alone() {
        let (app, transport) = app(None);
        let payload = json!({
            "object": "whatsapp_business_account",
            "entry": [{"changes": [{"field": "messages", "value": {
                "messages": [
                    {"from": "1", "id": "a", "type": "text", "text": {"body": "hi"}},
                    {"from": "2", "id": "b", "type": "text", "text": {}}
                ]
            }}]}]
        });
        let resp = app
            .oneshot(post(serde_json::to_vec(&payload).unwrap(), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(transport.deliveries_to("1").await.len(), 1);
        assert!(transport.deliveries_to("2").await.is_empty());
    }

    #[tokio::test]
    async fn unexpected_shape_is_acknowledged() {
        let (app, transport) = app(None);
        let resp = app
            .oneshot(post(br#"{"entry": "nope"}"#.to_vec(), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(transport.deliveries().await.is_empty());
    }

    #[tokio::test]
    async fn batch_keeps_per_sender_order() {
        let (app, transport) = app(None);
        let payload = json!({
            "object": "whatsapp_business_account",
            "entry": [{"changes": [{"field": "messages", "value": {
                "contacts": [{"profile": {"name": "Asha"}, "wa_id": "1"}],
                "messages": [
                    {"from": "1", "id": "a", "type": "text", "text": {"body": "hi"}},
                    {"from": "2", "id": "b", "type": "text", "text": {"body": "hello"}},
                    {"from": "1", "id": "c", "type": "text", "text": {"body": "Asha Rao"}}
                ]
            }}]}]
        });
        let resp = app
            .oneshot(post(serde_json::to_vec(&payload).unwrap(), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let first = transport.deliveries_to("1").await;
        assert_eq!(first.len(), 2);
        assert!(first[0].body().starts_with("Welcome"));
        assert!(first[1].body().starts_with("Nice to meet you, Asha Rao!"));
        assert_eq!(transport.deliveries_to("2").await.len(), 1);
    }

    #[tokio::test]
    async fn redelivered_webhook_is_not_reapplied() {
        let (app, transport) = app(None);
        let body = serde_json::to_vec(&text_message("15550001111", "wamid.1", "hi")).unwrap();
        for _ in 0..2 {
            let resp = app.clone().oneshot(post(body.clone(), None)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }
        assert_eq!(transport.deliveries_to("15550001111").await.len(), 1);

        let resp = app
            .oneshot(Request::get("/api/customers/15550001111").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let v: Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(v["registration_phase"], "awaiting_name");
        assert!(v.get("name").is_none());
    }

    #[tokio::test]
    async fn customer_lookup() {
        let (app, _) = app(None);
        let body = serde_json::to_vec(&text_message("15550001111", "wamid.1", "hi")).unwrap();
        app.clone().oneshot(post(body, None)).await.unwrap();

        let resp = app
            .clone()
            .oneshot(Request::get("/api/customers/15550001111").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let v: Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(v["registration_phase"], "awaiting_name");

        let resp = app
            .oneshot(Request::get("/api/customers/999").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
