use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use base64::Engine;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use common::crypto::PublicKey;
use common::enclave::{GroupType, PrivacyGroupId, PrivacyGroupPayload};
use common::node::{CreatePrivacyGroup, NodeError};

use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::http_server::api::v0::error::{error_response, node_error_response};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct CreateRequest {
    /// Member public key (repeatable). The creator is always a member.
    #[arg(long = "address")]
    pub addresses: Vec<PublicKey>,

    /// Creating key (defaults to the node's default key)
    #[arg(long)]
    #[serde(default)]
    pub from: Option<PublicKey>,

    #[arg(long, default_value = "")]
    #[serde(default)]
    pub name: String,

    #[arg(long, default_value = "")]
    #[serde(default)]
    pub description: String,

    /// LEGACY or ONCHAIN
    #[arg(long = "type", default_value = "LEGACY")]
    #[serde(rename = "type")]
    pub group_type: GroupType,

    /// Base64 seed for LEGACY groups. A random seed is drawn when absent.
    #[arg(long)]
    #[serde(default)]
    pub random_seed: Option<String>,
}

/// A group together with its derived id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacyGroupResponse {
    pub privacy_group_id: PrivacyGroupId,
    #[serde(flatten)]
    pub group: PrivacyGroupPayload,
}

impl From<PrivacyGroupPayload> for PrivacyGroupResponse {
    fn from(group: PrivacyGroupPayload) -> Self {
        Self {
            privacy_group_id: group.id(),
            group,
        }
    }
}

#[tracing::instrument(skip_all)]
pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<CreateRequest>,
) -> Result<impl IntoResponse, CreateError> {
    let random_seed = req
        .random_seed
        .as_deref()
        .map(|seed| base64::engine::general_purpose::STANDARD.decode(seed))
        .transpose()?;

    let group = state
        .node()
        .create_privacy_group(CreatePrivacyGroup {
            from: req.from,
            addresses: req.addresses,
            name: req.name,
            description: req.description,
            group_type: req.group_type,
            random_seed,
        })
        .await?;

    Ok((
        http::StatusCode::CREATED,
        Json(PrivacyGroupResponse::from(group)),
    ))
}

#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    #[error("invalid random seed: {0}")]
    InvalidSeed(#[from] base64::DecodeError),
    #[error(transparent)]
    Node(#[from] NodeError),
}

impl IntoResponse for CreateError {
    fn into_response(self) -> Response {
        match self {
            CreateError::InvalidSeed(_) => error_response(
                http::StatusCode::BAD_REQUEST,
                "InvalidSeed",
                self.to_string(),
            ),
            CreateError::Node(e) => node_error_response(e),
        }
    }
}

impl ApiRequest for CreateRequest {
    type Response = PrivacyGroupResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/api/v0/privacy-group/create")?;
        Ok(client.post(full_url).json(&self))
    }
}
