use axum::extract::{Json, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use common::network::PartyInfo;

use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::ServiceState;

/// Discovery exchange: the caller sends its registry snapshot and gets ours
/// back. Both sides merge what they receive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyInfoRequest(pub PartyInfo);

#[tracing::instrument(skip_all)]
pub async fn handler(
    State(state): State<ServiceState>,
    Json(PartyInfoRequest(info)): Json<PartyInfoRequest>,
) -> impl IntoResponse {
    let registry = state.node().registry();
    if registry.merge_party_info(&info) {
        tracing::debug!(from = ?info.url, keys = info.keys.len(), "registry grew from party info");
    }
    Json(registry.snapshot())
}

impl ApiRequest for PartyInfoRequest {
    type Response = PartyInfo;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/partyinfo")?;
        Ok(client.post(full_url).json(&self))
    }
}
