use axum::extract::DefaultBodyLimit;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tower_http::trace::{DefaultOnFailure, DefaultOnResponse};
use tower_http::LatencyUnit;

pub mod api;
mod config;
mod handlers;
mod health;
pub mod node;

pub use config::Config;

use crate::ServiceState;

const API_PREFIX: &str = "/api";
const STATUS_PREFIX: &str = "/_status";

/// Maximum request body size in bytes (16 MB)
pub const MAX_BODY_SIZE_BYTES: usize = 16 * 1024 * 1024;

fn with_tracing(router: Router, log_level: tracing::Level) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .on_response(
            DefaultOnResponse::new()
                .include_headers(false)
                .level(log_level)
                .latency_unit(LatencyUnit::Micros),
        )
        .on_failure(DefaultOnFailure::new().latency_unit(LatencyUnit::Micros));
    router.layer(trace_layer)
}

/// Client API: /_status + /api routes. Meant for local applications only.
pub fn client_router(state: ServiceState, config: &Config) -> Router {
    let router = Router::new()
        .nest(STATUS_PREFIX, health::router(state.clone()))
        .nest(API_PREFIX, api::router(state.clone()))
        .fallback(handlers::not_found_handler)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE_BYTES))
        .with_state(state);
    with_tracing(router, config.log_level)
}

/// Node API: discovery and push routes reachable by peers, plus /_status.
pub fn node_router(state: ServiceState, config: &Config) -> Router {
    let router = Router::new()
        .merge(node::router(state.clone()))
        .nest(STATUS_PREFIX, health::router(state.clone()))
        .fallback(handlers::not_found_handler)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE_BYTES))
        .with_state(state);
    with_tracing(router, config.log_level)
}

/// Serve `router` on an already bound listener until `shutdown_rx` fires.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    mut shutdown_rx: watch::Receiver<()>,
) -> Result<(), HttpServerError> {
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .await?;
    Ok(())
}

/// Run the client API HTTP server.
pub async fn run_api(
    config: Config,
    state: ServiceState,
    shutdown_rx: watch::Receiver<()>,
) -> Result<(), HttpServerError> {
    let router = client_router(state, &config);
    let listener = TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = ?config.listen_addr, "client API listening");
    serve(listener, router, shutdown_rx).await
}

/// Run the peer-facing node HTTP server.
pub async fn run_node(
    config: Config,
    state: ServiceState,
    shutdown_rx: watch::Receiver<()>,
) -> Result<(), HttpServerError> {
    let router = node_router(state, &config);
    let listener = TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = ?config.listen_addr, "node API listening");
    serve(listener, router, shutdown_rx).await
}

#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("an error occurred running the HTTP server: {0}")]
    ServingFailed(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use common::crypto::SecretKey;
    use common::node::NoopPushProvider;
    use common::storage::StorageConfig;
    use tower::ServiceExt;

    use super::*;

    async fn state() -> ServiceState {
        let (_tx, rx) = watch::channel(());
        ServiceState::builder(vec![SecretKey::generate().unwrap()])
            .storage(StorageConfig::Memory)
            .build(Arc::new(NoopPushProvider), rx)
            .await
            .unwrap()
    }

    fn config() -> Config {
        Config::new(std::net::SocketAddr::from(([127, 0, 0, 1], 0)))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_client_send_then_receive() {
        let state = state().await;
        let router = client_router(state, &config());

        let response = router
            .clone()
            .oneshot(
                Request::post("/api/v0/send")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"payload":"aGVsbG8="}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let sent = body_json(response).await;
        let key = sent["key"].as_str().unwrap().to_string();

        let response = router
            .oneshot(
                Request::post("/api/v0/receive")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::json!({ "key": key }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let received = body_json(response).await;
        assert_eq!(received["payload"], "aGVsbG8=");
        assert_eq!(received["privacy_group_id"], sent["privacy_group_id"]);
    }

    #[tokio::test]
    async fn test_receive_unknown_key_is_not_found() {
        let router = client_router(state().await, &config());
        let key = common::crypto::StorageKey::of(b"never stored");
        let response = router
            .oneshot(
                Request::post("/api/v0/receive")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::json!({ "key": key }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "PayloadNotFound");
    }

    #[tokio::test]
    async fn test_conflicting_recipients_rejected() {
        let router = client_router(state().await, &config());
        let group = common::enclave::PrivacyGroupPayload::implied([SecretKey::generate()
            .unwrap()
            .public()])
        .id();
        let to = SecretKey::generate().unwrap().public();
        let body = serde_json::json!({
            "payload": "eA==",
            "to": [to],
            "privacy_group_id": group,
        });
        let response = router
            .oneshot(
                Request::post("/api/v0/send")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_node_routes() {
        let router = node_router(state().await, &config());

        let response = router
            .clone()
            .oneshot(Request::get("/upcheck").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .clone()
            .oneshot(Request::get("/_status/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(
                Request::get("/api/v0/keys")
                    .header("accept", "application/json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
