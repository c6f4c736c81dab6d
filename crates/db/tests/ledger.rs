//! Integration tests for financial records and ledger aggregation.

use assert_matches::assert_matches;
use miqat_core::error::CoreError;
use miqat_db::models::entity::RegisterEntity;
use miqat_db::models::financial::{CreateFinancialRecord, LedgerFilter};
use miqat_db::repositories::{EntityRepo, FinancialRecordRepo};
use miqat_db::StoreError;
use rust_decimal::Decimal;
use std::str::FromStr;

use sqlx::PgPool;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn new_entity(entity_type: &str, name: &str, parent_id: Option<&str>) -> RegisterEntity {
    RegisterEntity {
        entity_type: entity_type.to_string(),
        parent_id: parent_id.map(String::from),
        name: Some(name.to_string()),
        owner_name: None,
        email: None,
        contact_no: None,
        address: None,
        city: None,
        country: None,
        license_no: None,
        tax_no: None,
        document_path: None,
        created_by: Some("tester".to_string()),
    }
}

fn new_record(booking: &str, service: &str, income: &str, expenses: &str) -> CreateFinancialRecord {
    CreateFinancialRecord {
        booking_id: booking.to_string(),
        service_type: service.to_string(),
        income_amount: dec(income),
        expenses_amount: dec(expenses),
        purchase_cost: None,
        agent_id: None,
        organization_id: None,
    }
}

/// Returns (org_id, agent_id) for records that need entity references.
async fn seed_agent(pool: &PgPool) -> (String, String) {
    let org = EntityRepo::register(pool, &new_entity("organization", "Acme", None))
        .await
        .unwrap();
    let branch = EntityRepo::register(pool, &new_entity("branch", "Lahore", Some(&org.id)))
        .await
        .unwrap();
    let agent = EntityRepo::register(pool, &new_entity("agent", "Ali", Some(&branch.id)))
        .await
        .unwrap();
    (org.id, agent.id)
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_profit_derived_and_rounded(pool: PgPool) {
    let record = FinancialRecordRepo::create(
        &pool,
        &new_record("BK-1", "hotel", "100.005", "30.004"),
    )
    .await
    .unwrap();

    // Half-away-from-zero rounding of each side before the subtraction.
    assert_eq!(record.income_amount, dec("100.01"));
    assert_eq!(record.expenses_amount, dec("30.00"));
    assert_eq!(record.profit_loss, dec("70.01"));
    assert_eq!(record.purchase_cost, dec("0"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_negative_amounts_rejected(pool: PgPool) {
    let err = FinancialRecordRepo::create(&pool, &new_record("BK-1", "visa", "-5.00", "0"))
        .await
        .unwrap_err();
    assert_matches!(err, StoreError::Core(CoreError::Validation(_)));

    let err = FinancialRecordRepo::create(&pool, &new_record("BK-2", "visa", "5.00", "-1"))
        .await
        .unwrap_err();
    assert_matches!(err, StoreError::Core(CoreError::Validation(_)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_unknown_service_type_rejected(pool: PgPool) {
    let err = FinancialRecordRepo::create(&pool, &new_record("BK-1", "cruise", "10", "0"))
        .await
        .unwrap_err();
    assert_matches!(err, StoreError::Core(CoreError::Validation(_)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_unknown_service_type_in_filter_rejected(pool: PgPool) {
    FinancialRecordRepo::create(&pool, &new_record("BK-1", "hotel", "100.00", "40.00"))
        .await
        .unwrap();

    let filter = LedgerFilter {
        service_type: Some("cruise".to_string()),
        ..Default::default()
    };
    let err = FinancialRecordRepo::list(&pool, &filter).await.unwrap_err();
    assert_matches!(err, StoreError::Core(CoreError::Validation(_)));

    let err = FinancialRecordRepo::summarize(&pool, &filter).await.unwrap_err();
    assert_matches!(err, StoreError::Core(CoreError::Validation(_)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_organization_defaults_from_agent(pool: PgPool) {
    let (org_id, agent_id) = seed_agent(&pool).await;

    let mut input = new_record("BK-1", "umrah", "500", "200");
    input.agent_id = Some(agent_id.clone());
    let record = FinancialRecordRepo::create(&pool, &input).await.unwrap();

    assert_eq!(record.agent_id.as_deref(), Some(agent_id.as_str()));
    assert_eq!(record.organization_id.as_deref(), Some(org_id.as_str()));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_missing_agent_is_not_found(pool: PgPool) {
    let mut input = new_record("BK-1", "umrah", "500", "200");
    input.agent_id = Some("AGT-9999".to_string());
    let err = FinancialRecordRepo::create(&pool, &input).await.unwrap_err();
    assert_matches!(err, StoreError::Core(CoreError::NotFound { .. }));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_summary_totals_are_additive(pool: PgPool) {
    FinancialRecordRepo::create(&pool, &new_record("BK-1", "hotel", "100.00", "40.00"))
        .await
        .unwrap();
    FinancialRecordRepo::create(&pool, &new_record("BK-2", "hotel", "50.00", "10.00"))
        .await
        .unwrap();
    FinancialRecordRepo::create(&pool, &new_record("BK-3", "visa", "30.00", "5.00"))
        .await
        .unwrap();

    let summary = FinancialRecordRepo::summarize(&pool, &LedgerFilter::default())
        .await
        .unwrap();
    assert_eq!(summary.total_income, dec("180.00"));
    assert_eq!(summary.total_expenses, dec("55.00"));
    assert_eq!(summary.total_profit, dec("125.00"));

    // Overall totals equal the sum of the per-module rows.
    let breakdown_profit: Decimal = summary
        .breakdown_by_module
        .iter()
        .map(|m| m.total_profit)
        .sum();
    assert_eq!(breakdown_profit, summary.total_profit);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_summary_omits_empty_service_types(pool: PgPool) {
    FinancialRecordRepo::create(&pool, &new_record("BK-1", "hotel", "100.00", "40.00"))
        .await
        .unwrap();
    FinancialRecordRepo::create(&pool, &new_record("BK-2", "visa", "30.00", "5.00"))
        .await
        .unwrap();

    let summary = FinancialRecordRepo::summarize(&pool, &LedgerFilter::default())
        .await
        .unwrap();
    let modules: Vec<&str> = summary
        .breakdown_by_module
        .iter()
        .map(|m| m.service_type.as_str())
        .collect();
    assert_eq!(modules, ["hotel", "visa"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_summary_of_empty_ledger_is_zero(pool: PgPool) {
    let summary = FinancialRecordRepo::summarize(&pool, &LedgerFilter::default())
        .await
        .unwrap();
    assert_eq!(summary.total_income, dec("0"));
    assert_eq!(summary.total_profit, dec("0"));
    assert!(summary.breakdown_by_module.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_filters_restrict_list_and_summary(pool: PgPool) {
    let (org_id, agent_id) = seed_agent(&pool).await;

    let mut with_agent = new_record("BK-1", "hotel", "100.00", "40.00");
    with_agent.agent_id = Some(agent_id);
    FinancialRecordRepo::create(&pool, &with_agent).await.unwrap();
    FinancialRecordRepo::create(&pool, &new_record("BK-2", "visa", "30.00", "5.00"))
        .await
        .unwrap();

    let filter = LedgerFilter {
        organization_id: Some(org_id),
        ..Default::default()
    };
    let records = FinancialRecordRepo::list(&pool, &filter).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].booking_id, "BK-1");

    let summary = FinancialRecordRepo::summarize(&pool, &filter).await.unwrap();
    assert_eq!(summary.total_income, dec("100.00"));
    assert_eq!(summary.breakdown_by_module.len(), 1);

    let filter = LedgerFilter {
        service_type: Some("visa".to_string()),
        ..Default::default()
    };
    let records = FinancialRecordRepo::list(&pool, &filter).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].booking_id, "BK-2");
}
