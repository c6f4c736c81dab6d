//! Route definitions for the financial ledger.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::ledger;
use crate::state::AppState;

/// Ledger routes mounted at `/ledger`.
///
/// ```text
/// POST /records   -> create_record
/// GET  /records   -> list_records
/// GET  /summary   -> summary
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/records", post(ledger::create_record).get(ledger::list_records))
        .route("/summary", get(ledger::summary))
}
