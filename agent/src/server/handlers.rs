//! HTTP request handlers

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::authn::webhook::{verify_signature, SIGNATURE_HEADER};
use crate::models::push::PushEvent;
use crate::server::state::ServerState;
use crate::utils::version_info;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "jeeves".to_string(),
        version: version.version,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    Json(version_info())
}

/// Running revision handler
pub async fn revision_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(state.revision.clone())
}

/// Webhook response
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub accepted: bool,
    pub message: String,
}

fn webhook_response(
    status: StatusCode,
    accepted: bool,
    message: impl Into<String>,
) -> (StatusCode, Json<WebhookResponse>) {
    (
        status,
        Json(WebhookResponse {
            accepted,
            message: message.into(),
        }),
    )
}

/// GitHub webhook handler
pub async fn webhook_handler(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let event = headers
        .get("x-github-event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let delivery = headers
        .get("x-github-delivery")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    if let Err(e) = verify_signature(&state.webhook_secret, signature, &body) {
        warn!("Rejected delivery {}: {}", delivery, e);
        return webhook_response(StatusCode::UNAUTHORIZED, false, "invalid signature");
    }

    match event {
        "push" => {}
        "ping" => {
            info!("Received ping (delivery {})", delivery);
            return webhook_response(StatusCode::OK, true, "pong");
        }
        "" => {
            return webhook_response(
                StatusCode::BAD_REQUEST,
                false,
                "missing X-GitHub-Event header",
            );
        }
        other => {
            debug!("Ignoring {} event (delivery {})", other, delivery);
            return webhook_response(StatusCode::OK, false, "event ignored");
        }
    }

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Malformed push payload (delivery {}): {}", delivery, e);
            return webhook_response(
                StatusCode::BAD_REQUEST,
                false,
                format!("malformed payload: {}", e),
            );
        }
    };

    let push = match PushEvent::from_payload(payload) {
        Ok(Some(push)) => push,
        Ok(None) => {
            debug!("Push without head commit ignored (delivery {})", delivery);
            return webhook_response(StatusCode::ACCEPTED, false, "push has no head commit");
        }
        Err(e) => {
            warn!("Rejected push (delivery {}): {}", delivery, e);
            return webhook_response(StatusCode::BAD_REQUEST, false, e.to_string());
        }
    };

    info!(
        "Received push for {}@{} (delivery {})",
        push.full_name(),
        push.head_sha,
        delivery
    );

    match state.push_tx.try_send(push) {
        Ok(()) => webhook_response(StatusCode::ACCEPTED, true, "push queued"),
        Err(e) => {
            warn!("Unable to queue push (delivery {}): {}", delivery, e);
            webhook_response(
                StatusCode::SERVICE_UNAVAILABLE,
                false,
                "deploy queue unavailable",
            )
        }
    }
}
