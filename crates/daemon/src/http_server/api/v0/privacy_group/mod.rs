use axum::routing::post;
use axum::Router;

use crate::ServiceState;

pub mod create;
pub mod delete;
pub mod find;

pub use create::{CreateRequest, PrivacyGroupResponse};
pub use delete::DeleteRequest;
pub use find::FindRequest;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/create", post(create::handler))
        .route("/find", post(find::handler))
        .route("/delete", post(delete::handler))
        .with_state(state)
}
