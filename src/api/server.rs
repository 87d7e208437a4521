//! HTTP server exposing the gateway routes

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use super::gateway::{GatewayEvent, GatewayResponse};
use super::handlers::ApiHandlers;

impl IntoResponse for GatewayResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, [(header::CONTENT_TYPE, "application/json")], self.body).into_response()
    }
}

pub struct ApiServer {
    handlers: Arc<ApiHandlers>,
    bind: String,
}

impl ApiServer {
    pub fn new(handlers: Arc<ApiHandlers>, bind: impl Into<String>) -> Self {
        Self {
            handlers,
            bind: bind.into(),
        }
    }

    pub async fn start(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.bind).await?;
        info!("Listening on {}", self.bind);
        axum::serve(listener, router(self.handlers)).await?;
        Ok(())
    }
}

/// Routes of the recipe service
pub fn router(handlers: Arc<ApiHandlers>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sessions", post(create_session))
        .route("/sessions/process", post(process))
        .route("/sessions/{id}/status", get(session_status))
        .route("/sessions/{id}/profile", put(update_profile))
        .route("/sessions/{id}/result", get(session_result))
        .route("/price", post(price))
        .route("/nutrition", post(nutrition))
        .route("/combine", post(combine))
        .layer(CorsLayer::permissive())
        .with_state(handlers)
}

fn event(method: &str, path: &str, body: String) -> GatewayEvent {
    GatewayEvent::http(method, path).with_body(Value::String(body))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn create_session(State(api): State<Arc<ApiHandlers>>, body: String) -> GatewayResponse {
    api.create_session(&event("POST", "/sessions", body)).await
}

async fn process(State(api): State<Arc<ApiHandlers>>, body: String) -> GatewayResponse {
    api.process(&event("POST", "/sessions/process", body)).await
}

async fn session_status(
    State(api): State<Arc<ApiHandlers>>,
    Path(id): Path<String>,
) -> GatewayResponse {
    let event = GatewayEvent::http("GET", "/sessions/{id}/status").with_path_param("sessionId", &id);
    api.session_status(&event).await
}

async fn update_profile(
    State(api): State<Arc<ApiHandlers>>,
    Path(id): Path<String>,
    body: String,
) -> GatewayResponse {
    let event = event("PUT", "/sessions/{id}/profile", body).with_path_param("sessionId", &id);
    api.update_profile(&event).await
}

async fn session_result(
    State(api): State<Arc<ApiHandlers>>,
    Path(id): Path<String>,
) -> GatewayResponse {
    let event = GatewayEvent::http("GET", "/sessions/{id}/result").with_path_param("sessionId", &id);
    api.session_result(&event).await
}

async fn price(State(api): State<Arc<ApiHandlers>>, body: String) -> GatewayResponse {
    api.price(&event("POST", "/price", body)).await
}

async fn nutrition(State(api): State<Arc<ApiHandlers>>, body: String) -> GatewayResponse {
    api.nutrition(&event("POST", "/nutrition", body)).await
}

async fn combine(State(api): State<Arc<ApiHandlers>>, body: String) -> GatewayResponse {
    api.dispatch(super::Function::Combine, &event("POST", "/combine", body))
        .await
}
