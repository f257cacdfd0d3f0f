use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use common::enclave::{PrivacyGroupId, PrivacyGroupPayload};
use common::node::NodeError;

use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::http_server::api::v0::error::node_error_response;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PushPrivacyGroupRequest(pub PrivacyGroupPayload);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushPrivacyGroupResponse {
    pub privacy_group_id: PrivacyGroupId,
}

#[tracing::instrument(skip_all)]
pub async fn handler(
    State(state): State<ServiceState>,
    Json(PushPrivacyGroupRequest(group)): Json<PushPrivacyGroupRequest>,
) -> Result<impl IntoResponse, PushPrivacyGroupError> {
    let privacy_group_id = state.node().store_pushed_privacy_group(&group).await?;
    Ok(Json(PushPrivacyGroupResponse { privacy_group_id }))
}

#[derive(Debug, thiserror::Error)]
pub enum PushPrivacyGroupError {
    #[error(transparent)]
    Node(#[from] NodeError),
}

impl IntoResponse for PushPrivacyGroupError {
    fn into_response(self) -> Response {
        match self {
            PushPrivacyGroupError::Node(e) => node_error_response(e),
        }
    }
}

impl ApiRequest for PushPrivacyGroupRequest {
    type Response = PushPrivacyGroupResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/push-privacy-group")?;
        Ok(client.post(full_url).json(&self))
    }
}
