use axum::routing::{get, post};
use axum::Router;

pub mod error;
pub mod keys;
pub mod privacy_group;
pub mod receive;
pub mod send;

use crate::ServiceState;

pub use keys::{KeysRequest, KeysResponse};
pub use receive::{ReceiveRequest, ReceiveResponse};
pub use send::{SendRequest, SendResponse};

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/send", post(send::handler))
        .route("/receive", post(receive::handler))
        .route("/keys", get(keys::handler))
        .nest("/privacy-group", privacy_group::router(state.clone()))
        .with_state(state)
}
