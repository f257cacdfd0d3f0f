use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use common::enclave::PrivacyGroupId;
use common::node::NodeError;

use super::PrivacyGroupResponse;
use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::http_server::api::v0::error::node_error_response;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct FindRequest {
    #[arg(long)]
    pub privacy_group_id: PrivacyGroupId,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<FindRequest>,
) -> Result<impl IntoResponse, FindError> {
    let group = state
        .node()
        .find_privacy_group(&req.privacy_group_id)
        .await?
        .ok_or(NodeError::GroupNotFound(req.privacy_group_id))?;
    Ok(Json(PrivacyGroupResponse::from(group)))
}

#[derive(Debug, thiserror::Error)]
pub enum FindError {
    #[error(transparent)]
    Node(#[from] NodeError),
}

impl IntoResponse for FindError {
    fn into_response(self) -> Response {
        match self {
            FindError::Node(e) => node_error_response(e),
        }
    }
}

impl ApiRequest for FindRequest {
    type Response = PrivacyGroupResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/api/v0/privacy-group/find")?;
        Ok(client.post(full_url).json(&self))
    }
}
