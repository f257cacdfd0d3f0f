use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Fallback for unknown routes. Answers JSON when the caller accepts it.
pub async fn not_found_handler(uri: Uri, headers: HeaderMap) -> Response {
    let wants_json = headers
        .get(axum::http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"));

    tracing::debug!(path = %uri.path(), "no route");
    if wants_json {
        let body = serde_json::json!({"error": "NotFound", "message": format!("no route for {}", uri.path())});
        (StatusCode::NOT_FOUND, Json(body)).into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            [(axum::http::header::CONTENT_TYPE, "text/plain")],
            "not found",
        )
            .into_response()
    }
}
