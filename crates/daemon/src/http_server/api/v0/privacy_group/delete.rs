use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use common::crypto::PublicKey;
use common::enclave::PrivacyGroupId;
use common::node::NodeError;

use super::PrivacyGroupResponse;
use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::http_server::api::v0::error::node_error_response;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct DeleteRequest {
    #[arg(long)]
    pub privacy_group_id: PrivacyGroupId,

    /// Member key requesting the deletion (defaults to the node's default key)
    #[arg(long)]
    #[serde(default)]
    pub from: Option<PublicKey>,
}

#[tracing::instrument(skip_all)]
pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<DeleteRequest>,
) -> Result<impl IntoResponse, DeleteError> {
    let group = state
        .node()
        .delete_privacy_group(&req.privacy_group_id, req.from)
        .await?;
    Ok(Json(PrivacyGroupResponse::from(group)))
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteError {
    #[error(transparent)]
    Node(#[from] NodeError),
}

impl IntoResponse for DeleteError {
    fn into_response(self) -> Response {
        match self {
            DeleteError::Node(e) => node_error_response(e),
        }
    }
}

impl ApiRequest for DeleteRequest {
    type Response = PrivacyGroupResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/api/v0/privacy-group/delete")?;
        Ok(client.post(full_url).json(&self))
    }
}
