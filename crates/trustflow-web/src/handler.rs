//! The `POST /webhook/:provider` route and its middleware stack
//! (spec.md §6.6), grounded on the gateway's `run_server`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use tokio::sync::watch;
use tower::{timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::warn;

use crate::error::WebError;
use crate::service::WebhookService;

const SIGNATURE_HEADER: &str = "x-hub-signature-256";
const EVENT_HEADER: &str = "x-github-event";
const DELIVERY_HEADER: &str = "x-github-delivery";

const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

#[derive(Clone)]
struct WebState {
    service: Arc<WebhookService>,
}

/// `POST /webhook/:provider` (spec.md §6.6). The provider path segment is
/// currently unused beyond routing — every payload is treated as a GitHub
/// style `issues` event until additional providers are added.
async fn webhook_handler(
    State(state): State<WebState>,
    Path(_provider): Path<String>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Response, WebError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    state.service.verify(&body, signature)?;

    let event_type = headers
        .get(EVENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let delivery_id = headers
        .get(DELIVERY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    // ACK immediately; classification, the exists check, and enqueueing
    // all happen off the request path (spec.md §4.7 step 3-4).
    let service = Arc::clone(&state.service);
    tokio::spawn(async move {
        service.process(&body, &event_type, &delivery_id).await;
    });

    Ok((
        StatusCode::OK,
        [("cache-control", "no-store")],
        "accepted",
    )
        .into_response())
}

async fn map_middleware_error(err: tower::BoxError) -> Response {
    if err.is::<tower::timeout::error::Elapsed>() {
        warn!("webhook request timed out");
        return (StatusCode::REQUEST_TIMEOUT, "request timed out").into_response();
    }
    warn!(error = %err, "unhandled middleware error");
    (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
}

pub fn router(service: Arc<WebhookService>, body_limit_bytes: usize) -> Router {
    let state = WebState { service };
    Router::new()
        .route("/webhook/:provider", post(webhook_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(axum::error_handling::HandleErrorLayer::new(
                    map_middleware_error,
                ))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    DEFAULT_REQUEST_TIMEOUT_SECS,
                ))),
        )
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(body_limit_bytes))
}

/// Binds and serves the webhook front door until `shutdown_rx` fires,
/// matching `http-rpc-gateway`'s `run_server` shutdown idiom.
pub async fn run_server(
    listen_addr: &str,
    service: Arc<WebhookService>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), std::io::Error> {
    let app = router(service, DEFAULT_BODY_LIMIT_BYTES);
    let addr: SocketAddr = listen_addr
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    tracing::info!(%addr, "webhook front door listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_rx.changed().await.ok();
            tracing::info!("webhook front door shutting down gracefully");
        })
        .await
}
