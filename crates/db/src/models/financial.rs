//! Financial record model, ledger filter, and summary DTOs.

use miqat_core::types::{DbId, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A financial record row from the `financial_records` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FinancialRecord {
    pub id: DbId,
    pub booking_id: String,
    pub service_type: String,
    pub income_amount: Decimal,
    pub expenses_amount: Decimal,
    pub purchase_cost: Decimal,
    /// Derived at write time as income - expenses; the schema CHECK keeps
    /// it consistent, so summaries may trust this column.
    pub profit_loss: Decimal,
    pub agent_id: Option<String>,
    pub organization_id: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for creating a financial record. `profit_loss` is never accepted
/// from callers; the repository derives it.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFinancialRecord {
    pub booking_id: String,
    pub service_type: String,
    pub income_amount: Decimal,
    pub expenses_amount: Decimal,
    #[serde(default)]
    pub purchase_cost: Option<Decimal>,
    pub agent_id: Option<String>,
    /// Defaults to the agent's organization when omitted.
    pub organization_id: Option<String>,
}

/// Filter for ledger queries and summaries. All fields optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerFilter {
    pub organization_id: Option<String>,
    pub date_from: Option<Timestamp>,
    pub date_to: Option<Timestamp>,
    pub service_type: Option<String>,
}

/// Aggregated sums for one service type. Only service types with at least
/// one matching row appear in a summary.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ModuleBreakdown {
    pub service_type: String,
    pub total_income: Decimal,
    pub total_purchase: Decimal,
    pub total_expenses: Decimal,
    pub total_profit: Decimal,
}

/// Top-level ledger summary: overall totals plus the per-module breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerSummary {
    pub total_income: Decimal,
    pub total_purchase: Decimal,
    pub total_expenses: Decimal,
    pub total_profit: Decimal,
    pub breakdown_by_module: Vec<ModuleBreakdown>,
}
