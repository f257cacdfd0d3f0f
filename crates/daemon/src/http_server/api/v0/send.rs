use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};
use url::Url;

use common::crypto::{PublicKey, StorageKey};
use common::enclave::PrivacyGroupId;
use common::node::{self, NodeError, Recipients};

use super::error::{error_response, node_error_response};
use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::ServiceState;

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest {
    /// Raw payload bytes, base64 encoded
    #[serde_as(as = "Base64")]
    pub payload: Vec<u8>,
    /// Sending key. Defaults to the node's default key.
    #[serde(default)]
    pub from: Option<PublicKey>,
    /// Explicit recipients
    #[serde(default)]
    pub to: Vec<PublicKey>,
    /// Send to the members of this group instead of `to`
    #[serde(default)]
    pub privacy_group_id: Option<PrivacyGroupId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResponse {
    pub key: StorageKey,
    pub privacy_group_id: PrivacyGroupId,
}

#[tracing::instrument(skip_all)]
pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<SendRequest>,
) -> Result<impl IntoResponse, SendError> {
    tracing::debug!(
        to = req.to.len(),
        group = ?req.privacy_group_id,
        bytes = req.payload.len(),
        "send request"
    );
    let to = match (req.privacy_group_id, req.to.is_empty()) {
        (Some(_), false) => return Err(SendError::ConflictingRecipients),
        (Some(id), true) => Recipients::PrivacyGroup(id),
        (None, _) => Recipients::Keys(req.to),
    };

    let sent = state
        .node()
        .send(node::SendRequest {
            payload: req.payload,
            from: req.from,
            to,
        })
        .await?;

    Ok((
        http::StatusCode::OK,
        Json(SendResponse {
            key: sent.key,
            privacy_group_id: sent.privacy_group_id,
        }),
    ))
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("give either recipients or a privacy group id, not both")]
    ConflictingRecipients,
    #[error(transparent)]
    Node(#[from] NodeError),
}

impl IntoResponse for SendError {
    fn into_response(self) -> Response {
        match self {
            SendError::ConflictingRecipients => error_response(
                http::StatusCode::BAD_REQUEST,
                "ConflictingRecipients",
                self.to_string(),
            ),
            SendError::Node(e) => node_error_response(e),
        }
    }
}

// Client implementation - builds request for this operation
impl ApiRequest for SendRequest {
    type Response = SendResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/api/v0/send")?;
        Ok(client.post(full_url).json(&self))
    }
}
