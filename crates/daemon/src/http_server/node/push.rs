use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use common::crypto::StorageKey;
use common::enclave::SealedEnvelope;
use common::node::NodeError;

use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::http_server::api::v0::error::node_error_response;
use crate::ServiceState;

/// A sealed payload pushed by the sender's node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushRequest {
    pub key: StorageKey,
    pub envelope: SealedEnvelope,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushResponse {
    pub key: StorageKey,
}

#[tracing::instrument(skip_all)]
pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<PushRequest>,
) -> Result<impl IntoResponse, PushError> {
    let key = state.node().store_pushed(&req.key, &req.envelope).await?;
    Ok(Json(PushResponse { key }))
}

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error(transparent)]
    Node(#[from] NodeError),
}

impl IntoResponse for PushError {
    fn into_response(self) -> Response {
        match self {
            PushError::Node(e) => node_error_response(e),
        }
    }
}

impl ApiRequest for PushRequest {
    type Response = PushResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/push")?;
        Ok(client.post(full_url).json(&self))
    }
}
