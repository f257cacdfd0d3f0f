use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};
use url::Url;

use common::crypto::{PublicKey, StorageKey};
use common::enclave::PrivacyGroupId;
use common::node::NodeError;

use super::error::node_error_response;
use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct ReceiveRequest {
    /// Storage key returned by send
    #[arg(long)]
    pub key: StorageKey,

    /// Key to unseal as (defaults to the node's default key)
    #[arg(long)]
    #[serde(default)]
    pub to: Option<PublicKey>,
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveResponse {
    #[serde_as(as = "Base64")]
    pub payload: Vec<u8>,
    pub privacy_group_id: Option<PrivacyGroupId>,
}

#[tracing::instrument(skip_all)]
pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<ReceiveRequest>,
) -> Result<impl IntoResponse, ReceiveError> {
    tracing::debug!(key = %req.key, "receive request");
    let received = state.node().receive(&req.key, req.to).await?;
    Ok((
        http::StatusCode::OK,
        Json(ReceiveResponse {
            payload: received.payload,
            privacy_group_id: received.privacy_group_id,
        }),
    ))
}

#[derive(Debug, thiserror::Error)]
pub enum ReceiveError {
    #[error(transparent)]
    Node(#[from] NodeError),
}

impl IntoResponse for ReceiveError {
    fn into_response(self) -> Response {
        match self {
            ReceiveError::Node(e) => node_error_response(e),
        }
    }
}

impl ApiRequest for ReceiveRequest {
    type Response = ReceiveResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/api/v0/receive")?;
        Ok(client.post(full_url).json(&self))
    }
}
