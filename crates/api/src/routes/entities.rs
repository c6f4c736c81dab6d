//! Route definitions for the entity registry.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::entities;
use crate::state::AppState;

/// Entity routes mounted at `/entities`.
///
/// ```text
/// POST   /                    -> register
/// GET    /                    -> list
/// GET    /parents             -> list_parents
/// GET    /{id}                -> get_by_id
/// PUT    /{id}                -> update
/// DELETE /{id}                -> deactivate (cascades to descendants)
/// POST   /{id}/approve        -> approve
/// POST   /{id}/reject         -> reject
/// GET    /{id}/children       -> list_children
/// GET    /{id}/audit-trail    -> audit_trail
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(entities::register).get(entities::list))
        .route("/parents", get(entities::list_parents))
        .route(
            "/{id}",
            get(entities::get_by_id)
                .put(entities::update)
                .delete(entities::deactivate),
        )
        .route("/{id}/approve", post(entities::approve))
        .route("/{id}/reject", post(entities::reject))
        .route("/{id}/children", get(entities::list_children))
        .route("/{id}/audit-trail", get(entities::audit_trail))
}
