//! Peer-facing routes. Only other nodes talk to these.

use axum::routing::{get, post};
use axum::Router;

pub mod partyinfo;
pub mod push;
pub mod push_privacy_group;
pub mod upcheck;

pub use partyinfo::PartyInfoRequest;
pub use push::{PushRequest, PushResponse};
pub use push_privacy_group::{PushPrivacyGroupRequest, PushPrivacyGroupResponse};

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/upcheck", get(upcheck::handler))
        .route("/partyinfo", post(partyinfo::handler))
        .route("/push", post(push::handler))
        .route("/push-privacy-group", post(push_privacy_group::handler))
        .with_state(state)
}
