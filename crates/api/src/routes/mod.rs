pub mod entities;
pub mod health;
pub mod ledger;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /entities                        register (POST), list (GET)
/// /entities/parents                eligible parents for a kind (GET)
/// /entities/{id}                   get, update, cascade deactivate
/// /entities/{id}/approve           approve (POST)
/// /entities/{id}/reject            reject (POST)
/// /entities/{id}/audit-trail       audit trail (GET)
///
/// /ledger/records                  create (POST), list (GET)
/// /ledger/summary                  aggregated totals (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/entities", entities::router())
        .nest("/ledger", ledger::router())
}
