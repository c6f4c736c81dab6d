//! Handlers for the `/ledger` resource.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use miqat_db::models::financial::{
    CreateFinancialRecord, FinancialRecord, LedgerFilter, LedgerSummary,
};
use miqat_db::repositories::FinancialRecordRepo;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/ledger/records
pub async fn create_record(
    State(state): State<AppState>,
    Json(input): Json<CreateFinancialRecord>,
) -> AppResult<(StatusCode, Json<DataResponse<FinancialRecord>>)> {
    let record = FinancialRecordRepo::create(&state.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: record })))
}

/// GET /api/v1/ledger/records
///
/// Optional query filters: `organization_id`, `date_from`, `date_to`,
/// `service_type`.
pub async fn list_records(
    State(state): State<AppState>,
    Query(filter): Query<LedgerFilter>,
) -> AppResult<Json<DataResponse<Vec<FinancialRecord>>>> {
    let records = FinancialRecordRepo::list(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: records }))
}

/// GET /api/v1/ledger/summary
///
/// Aggregated totals plus a per-service-type breakdown over the same
/// optional filters as the record listing.
pub async fn summary(
    State(state): State<AppState>,
    Query(filter): Query<LedgerFilter>,
) -> AppResult<Json<DataResponse<LedgerSummary>>> {
    let summary = FinancialRecordRepo::summarize(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: summary }))
}
