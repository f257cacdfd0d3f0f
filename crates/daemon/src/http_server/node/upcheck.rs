use axum::response::IntoResponse;
use http::StatusCode;

pub const UPCHECK_BODY: &str = "I'm up!";

pub async fn handler() -> impl IntoResponse {
    (StatusCode::OK, UPCHECK_BODY)
}
