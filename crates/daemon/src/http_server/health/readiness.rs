use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::time::timeout;

use super::data_source::{DataSourceError, StateDataSource};

const READINESS_TIMEOUT: Duration = Duration::from_secs(10);

#[tracing::instrument]
pub async fn handler(data_src: StateDataSource) -> Response {
    let failure = match timeout(READINESS_TIMEOUT, data_src.is_ready()).await {
        Ok(Ok(())) => {
            let msg = serde_json::json!({"status": "ok"});
            return (StatusCode::OK, Json(msg)).into_response();
        }
        Ok(Err(DataSourceError::DependencyFailure)) => "storage backend is not answering",
        Ok(Err(DataSourceError::ShuttingDown)) => "node is shutting down",
        Err(_) => "readiness check timed out",
    };
    let msg = serde_json::json!({"status": "failure", "message": failure});
    (StatusCode::SERVICE_UNAVAILABLE, Json(msg)).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    use crate::http_server::health::data_source::tests::*;

    #[tokio::test]
    async fn test_handler_direct() {
        let response = handler(StateDataSource::new(Arc::new(MockReadiness::Ready))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = handler(StateDataSource::new(Arc::new(
            MockReadiness::DependencyFailure,
        )))
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = handler(StateDataSource::new(Arc::new(MockReadiness::ShuttingDown))).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
