use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

#[allow(clippy::module_inception)]
mod client;
mod error;

pub use client::ApiClient;
pub use error::ApiError;

/// A request type that knows how to build its own HTTP call.
///
/// Implemented next to the handler that serves it, so the route and the
/// body shape are defined in one place.
pub trait ApiRequest {
    type Response: DeserializeOwned;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError>;
}
