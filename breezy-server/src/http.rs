//! Breezy HTTP REST API
//!
//! Axum-based HTTP server exposing the CRM gateway and the insight pipeline
//! to the admin client. Listens on port 3001 by default (configurable).
//!
//! Architecture: each endpoint has a thin axum handler that delegates to a pure
//! inner function returning `(StatusCode, serde_json::Value)`. The inner
//! functions are directly testable without axum dispatch machinery.
//!
//! Endpoints:
//! - GET  /health                          — liveness + timestamp
//! - GET  /version                         — server version info
//! - GET  /api/contacts                    — list contacts
//! - POST /api/contacts                    — create contact
//! - GET  /api/deals                       — list deals
//! - POST /api/deals                       — create deal (optionally linked to a contact)
//! - GET  /api/contacts/:contact_id/deals  — deals associated with a contact
//! - POST /api/insights                    — insight from a caller-supplied contact + deals
//! - POST /api/contacts/:contact_id/insights — resolve deals, then generate an insight

use std::sync::Arc;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use breezy_core::models::{ListEnvelope, Properties};
use breezy_core::{insight, resolver, BreezyConfig, BreezyError, CrmBackend, InsightService};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// Shared state for all HTTP handlers. Immutable; every request is independent.
pub struct AppState {
    pub crm: Arc<dyn CrmBackend>,
    pub insights: InsightService,
    pub config: BreezyConfig,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route(
            "/api/contacts",
            get(list_contacts_handler).post(create_contact_handler),
        )
        .route("/api/deals", get(list_deals_handler).post(create_deal_handler))
        .route("/api/contacts/:contact_id/deals", get(contact_deals_handler))
        .route(
            "/api/contacts/:contact_id/insights",
            post(contact_insight_handler),
        )
        .route("/api/insights", post(insights_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: Arc<AppState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Breezy HTTP API listening on http://{}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    tracing::info!("HTTP server closed");
    Ok(())
}

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateContactRequest {
    pub properties: Option<Properties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDealRequest {
    pub deal_properties: Option<Properties>,
    #[serde(default)]
    pub contact_id: Option<String>,
}

// ============================================================================
// Error envelope
// ============================================================================

/// `{ error, details? }` with the upstream status passed through when known.
///
/// Client-facing errors (bad input, missing credential) keep their own
/// message; remote failures are reported under `context` with the provider
/// body in `details`.
pub fn error_reply(context: &str, err: &BreezyError) -> (StatusCode, Value) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if err.is_client_facing() {
        return (status, json!({ "error": err.to_string() }));
    }

    tracing::error!(status = status.as_u16(), error = %err, "{}", context);
    let details = err
        .details()
        .cloned()
        .unwrap_or_else(|| Value::String(err.to_string()));
    (status, json!({ "error": context, "details": details }))
}

/// Decode a JSON request body. An absent body reads as `{}` so that missing
/// fields surface as field-level messages.
pub fn decode_body<T: DeserializeOwned>(context: &str, body: &[u8]) -> Result<T, (StatusCode, Value)> {
    let value = if body.iter().all(u8::is_ascii_whitespace) {
        json!({})
    } else {
        serde_json::from_slice::<Value>(body).map_err(|e| {
            error_reply(
                context,
                &BreezyError::InvalidInput(format!("Invalid JSON in request body: {e}")),
            )
        })?
    };
    serde_json::from_value(value).map_err(|e| {
        error_reply(
            context,
            &BreezyError::InvalidInput(format!("Invalid request body: {e}")),
        )
    })
}

fn to_body<T: serde::Serialize>(context: &str, value: &T) -> (StatusCode, Value) {
    match serde_json::to_value(value) {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => error_reply(context, &BreezyError::from(e)),
    }
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner health — process liveness only; upstreams are not probed.
pub fn health_inner() -> Value {
    json!({
        "status": "Server is running",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })
}

/// Inner version — returns version info (pure, no IO).
pub fn version_inner() -> Value {
    json!({
        "version": env!("CARGO_PKG_VERSION"),
        "service": "breezy",
    })
}

pub async fn list_contacts_inner(state: &AppState) -> (StatusCode, Value) {
    const CONTEXT: &str = "Failed to fetch contacts";
    match state.crm.list_contacts().await {
        Ok(list) => to_body(CONTEXT, &list),
        Err(e) => error_reply(CONTEXT, &e),
    }
}

const CREATE_CONTACT_CONTEXT: &str = "Failed to create contact";
const CREATE_DEAL_CONTEXT: &str = "Failed to create deal";
const INSIGHT_CONTEXT: &str = "AI insight generation failed";

pub async fn create_contact_inner(
    state: &AppState,
    req: CreateContactRequest,
) -> (StatusCode, Value) {
    const CONTEXT: &str = CREATE_CONTACT_CONTEXT;
    let Some(properties) = req.properties else {
        return error_reply(
            CONTEXT,
            &BreezyError::InvalidInput("Missing 'properties' in request body.".to_string()),
        );
    };
    match state.crm.create_contact(properties).await {
        Ok(contact) => {
            tracing::info!(contact_id = %contact.id, "Contact created");
            to_body(CONTEXT, &contact)
        }
        Err(e) => error_reply(CONTEXT, &e),
    }
}

pub async fn list_deals_inner(state: &AppState) -> (StatusCode, Value) {
    const CONTEXT: &str = "Failed to fetch deals";
    match state.crm.list_deals().await {
        Ok(list) => to_body(CONTEXT, &list),
        Err(e) => error_reply(CONTEXT, &e),
    }
}

pub async fn create_deal_inner(state: &AppState, req: CreateDealRequest) -> (StatusCode, Value) {
    const CONTEXT: &str = CREATE_DEAL_CONTEXT;
    let Some(properties) = req.deal_properties else {
        return error_reply(
            CONTEXT,
            &BreezyError::InvalidInput("Missing 'dealProperties' in request body.".to_string()),
        );
    };
    match state
        .crm
        .create_deal(properties, req.contact_id.as_deref())
        .await
    {
        Ok(deal) => {
            tracing::info!(deal_id = %deal.id, contact_id = ?req.contact_id, "Deal created");
            to_body(CONTEXT, &deal)
        }
        Err(e) => error_reply(CONTEXT, &e),
    }
}

pub async fn contact_deals_inner(state: &AppState, contact_id: &str) -> (StatusCode, Value) {
    const CONTEXT: &str = "Failed to fetch deals for contact";
    match resolver::resolve_deals_for_contact(
        state.crm.as_ref(),
        contact_id,
        &state.config.crm.deal_properties,
    )
    .await
    {
        Ok(deals) => to_body(CONTEXT, &ListEnvelope::new(deals)),
        Err(e) => error_reply(CONTEXT, &e),
    }
}

pub async fn insights_inner(state: &AppState, body: Value) -> (StatusCode, Value) {
    const CONTEXT: &str = INSIGHT_CONTEXT;
    let (contact, deals) = match insight::parse_insight_request(&body) {
        Ok(parsed) => parsed,
        Err(e) => return error_reply(CONTEXT, &e),
    };
    match state.insights.generate_insight(&contact, &deals).await {
        Ok(insight) => to_body(CONTEXT, &insight),
        Err(e) => error_reply(CONTEXT, &e),
    }
}

pub async fn contact_insight_inner(state: &AppState, contact_id: &str) -> (StatusCode, Value) {
    const CONTEXT: &str = INSIGHT_CONTEXT;
    match state
        .insights
        .insight_for_contact(
            state.crm.as_ref(),
            contact_id,
            &state.config.crm.deal_properties,
        )
        .await
    {
        Ok(insight) => to_body(CONTEXT, &insight),
        Err(e) => error_reply(CONTEXT, &e),
    }
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
// ============================================================================

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(health_inner()))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn list_contacts_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, body) = list_contacts_inner(&state).await;
    (status, Json(body))
}

pub async fn create_contact_handler(
    State(state): State<Arc<AppState>>,
    raw: Bytes,
) -> impl IntoResponse {
    let (status, body) = match decode_body(CREATE_CONTACT_CONTEXT, &raw) {
        Ok(req) => create_contact_inner(&state, req).await,
        Err(reply) => reply,
    };
    (status, Json(body))
}

pub async fn list_deals_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, body) = list_deals_inner(&state).await;
    (status, Json(body))
}

pub async fn create_deal_handler(
    State(state): State<Arc<AppState>>,
    raw: Bytes,
) -> impl IntoResponse {
    let (status, body) = match decode_body(CREATE_DEAL_CONTEXT, &raw) {
        Ok(req) => create_deal_inner(&state, req).await,
        Err(reply) => reply,
    };
    (status, Json(body))
}

pub async fn contact_deals_handler(
    State(state): State<Arc<AppState>>,
    Path(contact_id): Path<String>,
) -> impl IntoResponse {
    let (status, body) = contact_deals_inner(&state, &contact_id).await;
    (status, Json(body))
}

pub async fn insights_handler(
    State(state): State<Arc<AppState>>,
    raw: Bytes,
) -> impl IntoResponse {
    let (status, body) = match decode_body(INSIGHT_CONTEXT, &raw) {
        Ok(payload) => insights_inner(&state, payload).await,
        Err(reply) => reply,
    };
    (status, Json(body))
}

pub async fn contact_insight_handler(
    State(state): State<Arc<AppState>>,
    Path(contact_id): Path<String>,
) -> impl IntoResponse {
    let (status, body) = contact_insight_inner(&state, &contact_id).await;
    (status, Json(body))
}

// ============================================================================
// Unit Tests — call inner functions directly
// ============================================================================
