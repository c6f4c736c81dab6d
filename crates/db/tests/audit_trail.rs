//! Integration tests for the append-only audit log and its hash chain.

use miqat_core::audit;
use miqat_db::models::audit::{AuditLog, CreateAuditLog};
use miqat_db::models::entity::{RegisterEntity, UpdateEntity};
use miqat_db::repositories::{AuditLogRepo, EntityRepo};
use sqlx::PgPool;

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

/// The canonical entry string an appender hashed, rebuilt from the stored row.
fn entry_data(entry: &AuditLog) -> String {
    serde_json::json!({
        "action": entry.action,
        "model_name": entry.model_name,
        "object_id": entry.object_id,
        "performed_by": entry.performed_by,
        "previous_data": entry.previous_data,
        "new_data": entry.new_data,
    })
    .to_string()
}

/// Recompute every hash from the stored fields and the previous link.
fn assert_chain_verifies(entries: &[AuditLog]) {
    let mut prev_hash: Option<String> = None;
    for entry in entries {
        let expected = audit::compute_integrity_hash(prev_hash.as_deref(), &entry_data(entry));
        assert_eq!(entry.integrity_hash, expected, "chain breaks at entry {}", entry.id);
        prev_hash = Some(entry.integrity_hash.clone());
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_every_mutation_leaves_a_trail_entry(pool: PgPool) {
    let org = EntityRepo::register(&pool, &new_entity("organization", "Acme", None))
        .await
        .unwrap();

    let patch = UpdateEntity {
        city: Some("Lahore".to_string()),
        performed_by: Some("tester".to_string()),
        ..Default::default()
    };
    EntityRepo::update(&pool, &org.id, &patch).await.unwrap();
    EntityRepo::approve(&pool, &org.id, Some("admin"), Some("verified"))
        .await
        .unwrap();
    EntityRepo::deactivate_cascade(&pool, &org.id, Some("admin"))
        .await
        .unwrap();

    let trail = AuditLogRepo::list_for_object(&pool, &org.id).await.unwrap();
    let actions: Vec<&str> = trail.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(actions, ["create", "update", "update", "delete"]);

    // The create entry has no prior state; the update carries both sides.
    assert!(trail[0].previous_data.is_none());
    assert_eq!(trail[1].previous_data.as_ref().unwrap()["city"], serde_json::Value::Null);
    assert_eq!(trail[1].new_data.as_ref().unwrap()["city"], "Lahore");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_approval_note_embedded_in_snapshot(pool: PgPool) {
    let org = EntityRepo::register(&pool, &new_entity("organization", "Acme", None))
        .await
        .unwrap();
    EntityRepo::approve(&pool, &org.id, Some("admin"), Some("docs verified"))
        .await
        .unwrap();
    EntityRepo::reject(&pool, &org.id, Some("admin"), Some("license expired"))
        .await
        .unwrap();

    let trail = AuditLogRepo::list_for_object(&pool, &org.id).await.unwrap();
    assert_eq!(
        trail[1].new_data.as_ref().unwrap()["approval_note"],
        "docs verified"
    );
    assert_eq!(
        trail[2].new_data.as_ref().unwrap()["rejection_reason"],
        "license expired"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_hash_chain_links_and_verifies(pool: PgPool) {
    let org = EntityRepo::register(&pool, &new_entity("organization", "Acme", None))
        .await
        .unwrap();
    EntityRepo::register(&pool, &new_entity("branch", "Lahore", Some(&org.id)))
        .await
        .unwrap();
    EntityRepo::approve(&pool, &org.id, Some("admin"), None)
        .await
        .unwrap();

    let entries = AuditLogRepo::fetch_for_integrity_check(&pool, None)
        .await
        .unwrap();
    assert_eq!(entries.len(), 3);
    assert_chain_verifies(&entries);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_chain_stays_linear_under_concurrent_mutations(pool: PgPool) {
    let org = EntityRepo::register(&pool, &new_entity("organization", "Acme", None))
        .await
        .unwrap();

    // Overlapping transactions must serialize through the appender lock;
    // a fork (two entries chained to the same parent) would break the
    // sequential recomputation below.
    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..8 {
        let pool = pool.clone();
        let org_id = org.id.clone();
        tasks.spawn(async move {
            EntityRepo::register(
                &pool,
                &new_entity("branch", &format!("Branch {i}"), Some(&org_id)),
            )
            .await
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    let entries = AuditLogRepo::fetch_for_integrity_check(&pool, None)
        .await
        .unwrap();
    assert_eq!(entries.len(), 9);
    assert_chain_verifies(&entries);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_tampering_breaks_the_chain(pool: PgPool) {
    let org = EntityRepo::register(&pool, &new_entity("organization", "Acme", None))
        .await
        .unwrap();
    EntityRepo::approve(&pool, &org.id, Some("admin"), None)
        .await
        .unwrap();

    // Simulate out-of-band tampering with the first entry.
    sqlx::query("UPDATE audit_logs SET object_id = 'ORG-9999' WHERE id = (SELECT MIN(id) FROM audit_logs)")
        .execute(&pool)
        .await
        .unwrap();

    let entries = AuditLogRepo::fetch_for_integrity_check(&pool, None)
        .await
        .unwrap();
    let first = &entries[0];
    let recomputed = audit::compute_integrity_hash(None, &entry_data(first));
    assert_ne!(first.integrity_hash, recomputed);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_manual_append_and_count(pool: PgPool) {
    let before = AuditLogRepo::count(&pool).await.unwrap();
    assert_eq!(before, 0);

    let mut tx = pool.begin().await.unwrap();
    let entry = AuditLogRepo::append(
        &mut tx,
        &CreateAuditLog {
            action: "create",
            model_name: "entity",
            object_id: "ORG-0001".to_string(),
            performed_by: Some("tester".to_string()),
            previous_data: None,
            new_data: Some(serde_json::json!({"name": "Acme"})),
        },
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();
    assert_eq!(entry.integrity_hash.len(), 64);

    assert_eq!(AuditLogRepo::count(&pool).await.unwrap(), before + 1);
}
