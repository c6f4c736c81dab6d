//! Repository for the `financial_records` ledger table.

use miqat_core::error::CoreError;
use miqat_core::ledger::{derive_profit, round_money, validate_amount, ServiceType};
use miqat_core::types::Timestamp;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::error::StoreError;
use crate::models::financial::{
    CreateFinancialRecord, FinancialRecord, LedgerFilter, LedgerSummary, ModuleBreakdown,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, booking_id, service_type, income_amount, expenses_amount, \
    purchase_cost, profit_loss, agent_id, organization_id, created_at";

/// Sum expressions shared by the totals and breakdown queries.
const SUMS: &str = "\
    COALESCE(SUM(income_amount), 0)   AS total_income, \
    COALESCE(SUM(purchase_cost), 0)   AS total_purchase, \
    COALESCE(SUM(expenses_amount), 0) AS total_expenses, \
    COALESCE(SUM(profit_loss), 0)     AS total_profit";

/// Provides insert and aggregation operations for financial records.
pub struct FinancialRecordRepo;

impl FinancialRecordRepo {
    /// Insert a financial record.
    ///
    /// Amounts are rounded to two places and `profit_loss` is derived here
    /// (income minus expenses); the schema CHECK enforces the same relation
    /// so no write path can store a drifted value. When `organization_id`
    /// is omitted it is denormalized from the agent, mirroring how entity
    /// ancestry is inherited at creation time.
    pub async fn create(
        pool: &PgPool,
        input: &CreateFinancialRecord,
    ) -> Result<FinancialRecord, StoreError> {
        let service_type = ServiceType::parse(&input.service_type)?;
        if input.booking_id.trim().is_empty() {
            return Err(CoreError::Validation("booking_id must not be blank".into()).into());
        }
        validate_amount("income_amount", input.income_amount)?;
        validate_amount("expenses_amount", input.expenses_amount)?;
        let purchase_cost = input.purchase_cost.unwrap_or(Decimal::ZERO);
        validate_amount("purchase_cost", purchase_cost)?;

        let income = round_money(input.income_amount);
        let expenses = round_money(input.expenses_amount);
        let profit = derive_profit(input.income_amount, input.expenses_amount);

        let organization_id = match (&input.organization_id, &input.agent_id) {
            (Some(org), _) => Some(org.clone()),
            (None, Some(agent_id)) => {
                sqlx::query_scalar::<_, Option<String>>(
                    "SELECT organization_id FROM entities WHERE id = $1",
                )
                .bind(agent_id)
                .fetch_optional(pool)
                .await?
                .ok_or_else(|| CoreError::NotFound {
                    entity: "Entity",
                    id: agent_id.clone(),
                })?
            }
            (None, None) => None,
        };

        let query = format!(
            "INSERT INTO financial_records \
                 (booking_id, service_type, income_amount, expenses_amount, \
                  purchase_cost, profit_loss, agent_id, organization_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        let record = sqlx::query_as::<_, FinancialRecord>(&query)
            .bind(&input.booking_id)
            .bind(service_type.as_str())
            .bind(income)
            .bind(expenses)
            .bind(round_money(purchase_cost))
            .bind(profit)
            .bind(&input.agent_id)
            .bind(&organization_id)
            .fetch_one(pool)
            .await?;

        Ok(record)
    }

    /// List records matching the filter, most recent first.
    pub async fn list(
        pool: &PgPool,
        filter: &LedgerFilter,
    ) -> Result<Vec<FinancialRecord>, StoreError> {
        let (where_clause, binds) = build_ledger_filter(filter)?;
        let query = format!(
            "SELECT {COLUMNS} FROM financial_records {where_clause} ORDER BY created_at DESC, id DESC"
        );
        let records = bind_values(sqlx::query_as::<_, FinancialRecord>(&query), &binds)
            .fetch_all(pool)
            .await?;
        Ok(records)
    }

    /// Aggregate totals and the per-service-type breakdown for records
    /// matching the filter.
    ///
    /// Sums the stored decimal columns directly; no caching, every call
    /// recomputes from the full matching row set. Service types with zero
    /// matching rows are omitted from the breakdown.
    pub async fn summarize(
        pool: &PgPool,
        filter: &LedgerFilter,
    ) -> Result<LedgerSummary, StoreError> {
        let (where_clause, binds) = build_ledger_filter(filter)?;

        let totals_query =
            format!("SELECT {SUMS} FROM financial_records {where_clause}");
        let totals = bind_values(sqlx::query_as::<_, LedgerTotalsRow>(&totals_query), &binds)
            .fetch_one(pool)
            .await?;

        let breakdown_query = format!(
            "SELECT service_type, {SUMS} \
             FROM financial_records {where_clause} \
             GROUP BY service_type \
             ORDER BY service_type"
        );
        let breakdown = bind_values(
            sqlx::query_as::<_, ModuleBreakdown>(&breakdown_query),
            &binds,
        )
        .fetch_all(pool)
        .await?;

        Ok(LedgerSummary {
            total_income: totals.total_income,
            total_purchase: totals.total_purchase,
            total_expenses: totals.total_expenses,
            total_profit: totals.total_profit,
            breakdown_by_module: breakdown,
        })
    }
}

// ---------------------------------------------------------------------------
// Internal helpers for dynamic query building
// ---------------------------------------------------------------------------

/// Totals row shared by the summary queries.
#[derive(Debug, sqlx::FromRow)]
struct LedgerTotalsRow {
    total_income: Decimal,
    total_purchase: Decimal,
    total_expenses: Decimal,
    total_profit: Decimal,
}

/// Typed bind value for dynamically-built ledger queries.
enum BindValue {
    Text(String),
    Timestamp(Timestamp),
}

/// Build a WHERE clause and bind values from the ledger filter.
///
/// The clause is empty when no filters are active, or starts with `WHERE `.
/// An unknown `service_type` is a validation error, not an empty result.
fn build_ledger_filter(filter: &LedgerFilter) -> Result<(String, Vec<BindValue>), CoreError> {
    let mut conditions: Vec<String> = Vec::new();
    let mut binds: Vec<BindValue> = Vec::new();
    let mut bind_idx = 1u32;

    if let Some(ref org) = filter.organization_id {
        conditions.push(format!("organization_id = ${bind_idx}"));
        bind_idx += 1;
        binds.push(BindValue::Text(org.clone()));
    }

    if let Some(from) = filter.date_from {
        conditions.push(format!("created_at >= ${bind_idx}"));
        bind_idx += 1;
        binds.push(BindValue::Timestamp(from));
    }

    if let Some(to) = filter.date_to {
        conditions.push(format!("created_at <= ${bind_idx}"));
        bind_idx += 1;
        binds.push(BindValue::Timestamp(to));
    }

    if let Some(ref service_type) = filter.service_type {
        ServiceType::parse(service_type)?;
        conditions.push(format!("service_type = ${bind_idx}"));
        binds.push(BindValue::Text(service_type.clone()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    Ok((where_clause, binds))
}

/// Bind a slice of `BindValue` to a sqlx `QueryAs`.
fn bind_values<'q, O>(
    mut q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    binds: &'q [BindValue],
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
    for val in binds {
        match val {
            BindValue::Text(v) => q = q.bind(v.as_str()),
            BindValue::Timestamp(v) => q = q.bind(*v),
        }
    }
    q
}
