use crate::auth;
use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::logging::SharedLogger;
use crate::models::ModelsResponse;
use crate::proxy::{self, UpstreamResponse};
use crate::translate::openai_types::ChatCompletionRequest;
use crate::translate::{openai_to_anthropic, ImageFetcher};

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub config: ProxyConfig,
    pub client: reqwest::Client,
    pub images: ImageFetcher,
    pub logger: SharedLogger,
    /// Bearer token clients must present. `None` rejects every request.
    pub expected_token: Option<String>,
    /// Sent upstream as `x-api-key`.
    pub upstream_key: Option<String>,
}

impl AppState {
    /// Build state around one shared HTTP client used for both image fetches
    /// and upstream dispatch.
    ///
    /// # Errors
    /// Fails when the configured upstream key variable is not set.
    pub fn new(
        config: ProxyConfig,
        client: reqwest::Client,
        logger: SharedLogger,
        expected_token: Option<String>,
    ) -> crate::Result<Self> {
        let upstream_key = config.resolve_upstream_key(expected_token.as_deref())?;
        let images = ImageFetcher::new(client.clone())
            .with_max_concurrent(config.images.max_concurrent_fetches);

        Ok(Self {
            config,
            client,
            images,
            logger,
            expected_token,
            upstream_key,
        })
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/v1/messages", post(handle_messages))
        .route("/v1/chat/completions", post(handle_messages))
        .route("/v1/models", get(handle_models))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_messages(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let log = state.logger.for_request(Uuid::new_v4().to_string());

    if let Err(e) = auth::authorize(&headers, state.expected_token.as_deref()) {
        log.warn("auth", "Rejected request without a valid bearer token");
        return e.into_response();
    }

    let req: ChatCompletionRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            log.error("server", format!("Failed to parse request: {}", e));
            return ProxyError::from(e).into_response();
        }
    };

    log.info(
        "server",
        format!("Request: model={} messages={}", req.model, req.messages.len()),
    );
    if req.stream == Some(true) {
        log.debug("server", "Ignoring stream=true; response is relayed in one piece");
    }

    let translated = match openai_to_anthropic(&req, &state.images).await {
        Ok(t) => t,
        Err(e) => {
            log.warn("translate", format!("Translation failed: {}", e));
            tracing::warn!(request_id = log.request_id(), error = %e, "Translation failed");
            return e.into_response();
        }
    };

    match proxy::forward_messages(
        &translated,
        &state.config,
        &state.client,
        state.upstream_key.as_deref(),
        &log,
    )
    .await
    {
        Ok(upstream) => relay(upstream),
        Err(e) => {
            log.error("server", format!("Proxy error: {}", e));
            e.into_response()
        }
    }
}

/// Return the upstream status and body verbatim.
fn relay(upstream: UpstreamResponse) -> Response {
    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = upstream
        .content_type
        .unwrap_or_else(|| "application/json".to_string());

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(upstream.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

async fn handle_models(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Err(e) = auth::authorize(&headers, state.expected_token.as_deref()) {
        return e.into_response();
    }

    Json(ModelsResponse {
        data: state.config.models.clone(),
    })
    .into_response()
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
