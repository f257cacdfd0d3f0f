use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use common::crypto::PublicKey;

use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct KeysRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysResponse {
    pub default_key: PublicKey,
    pub keys: Vec<PublicKey>,
}

pub async fn handler(State(state): State<ServiceState>) -> impl IntoResponse {
    let enclave = state.node().enclave();
    Json(KeysResponse {
        default_key: enclave.default_key(),
        keys: enclave.public_keys(),
    })
}

impl ApiRequest for KeysRequest {
    type Response = KeysResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/api/v0/keys")?;
        Ok(client.get(full_url))
    }
}
