use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;

use common::enclave::EnclaveError;
use common::node::NodeError;
use common::storage::StorageError;
use common::store::StoreError;

/// Status code and stable error kind for a node failure.
pub fn classify(err: &NodeError) -> (StatusCode, &'static str) {
    match err {
        NodeError::Enclave(e) => match e {
            EnclaveError::NotARecipient(_) => (StatusCode::FORBIDDEN, "NotARecipient"),
            EnclaveError::UnknownKey(_) => (StatusCode::BAD_REQUEST, "UnknownKey"),
            EnclaveError::NoRecipients => (StatusCode::BAD_REQUEST, "NoRecipients"),
            EnclaveError::DecryptionFailed => {
                (StatusCode::UNPROCESSABLE_ENTITY, "DecryptionFailed")
            }
            EnclaveError::NoKeys | EnclaveError::Crypto(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "EnclaveError")
            }
        },
        NodeError::Store(e) => match e {
            StoreError::Storage(StorageError::Unavailable(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "StorageUnavailable")
            }
            StoreError::Deserialization(_) | StoreError::Serialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "DeserializationError")
            }
            StoreError::MethodUnimplemented => {
                (StatusCode::NOT_IMPLEMENTED, "MethodUnimplemented")
            }
        },
        NodeError::Crypto(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CryptoError"),
        NodeError::PayloadNotFound(_) => (StatusCode::NOT_FOUND, "PayloadNotFound"),
        NodeError::GroupNotFound(_) => (StatusCode::NOT_FOUND, "PrivacyGroupNotFound"),
        NodeError::GroupDeleted(_) => (StatusCode::CONFLICT, "PrivacyGroupDeleted"),
        NodeError::NotAMember { .. } => (StatusCode::FORBIDDEN, "NotAMember"),
        NodeError::DigestMismatch { .. } => (StatusCode::BAD_REQUEST, "DigestMismatch"),
    }
}

pub fn node_error_response(err: NodeError) -> Response {
    let (status, kind) = classify(&err);
    if status.is_server_error() {
        tracing::error!(kind, "{}", err);
    } else {
        tracing::debug!(kind, "{}", err);
    }
    error_response(status, kind, err.to_string())
}

pub fn error_response(status: StatusCode, kind: &str, message: String) -> Response {
    let body = serde_json::json!({"error": kind, "message": message});
    (status, Json(body)).into_response()
}
