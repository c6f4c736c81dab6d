//! Repository for the append-only `audit_logs` table.

use miqat_core::audit;
use miqat_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::audit::{AuditLog, CreateAuditLog};

/// Column list for `audit_logs` SELECT queries.
const COLUMNS: &str = "\
    id, action, model_name, object_id, performed_by, \
    previous_data, new_data, integrity_hash, created_at";

/// Advisory lock key shared by all audit appenders. Arbitrary constant;
/// only has to be distinct from other advisory locks in this database.
const CHAIN_LOCK_KEY: i64 = 0x4d49_5141_5400;

/// Provides append and query operations for audit logs.
///
/// There is deliberately no update or delete method: the table is
/// append-only and the integrity hash chain depends on it staying that way.
pub struct AuditLogRepo;

impl AuditLogRepo {
    /// Append one audit entry, chaining its integrity hash to the previous
    /// entry.
    ///
    /// Must be called inside an open transaction: the append is then part
    /// of the same unit of work as the mutation it records (if the append
    /// fails, both roll back), and the advisory lock below is held to
    /// commit so the chain stays linear.
    pub async fn append(
        conn: &mut PgConnection,
        entry: &CreateAuditLog,
    ) -> Result<AuditLog, sqlx::Error> {
        // Serialize appenders for the rest of the transaction. Without the
        // lock, two concurrent mutations can both read the same last hash
        // and fork the chain.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(CHAIN_LOCK_KEY)
            .execute(&mut *conn)
            .await?;

        let prev_hash: Option<String> = sqlx::query_scalar(
            "SELECT integrity_hash FROM audit_logs ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&mut *conn)
        .await?;

        let entry_data = serde_json::json!({
            "action": entry.action,
            "model_name": entry.model_name,
            "object_id": entry.object_id,
            "performed_by": entry.performed_by,
            "previous_data": entry.previous_data,
            "new_data": entry.new_data,
        })
        .to_string();
        let hash = audit::compute_integrity_hash(prev_hash.as_deref(), &entry_data);

        let query = format!(
            "INSERT INTO audit_logs \
                 (action, model_name, object_id, performed_by, previous_data, new_data, integrity_hash) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AuditLog>(&query)
            .bind(entry.action)
            .bind(entry.model_name)
            .bind(&entry.object_id)
            .bind(&entry.performed_by)
            .bind(&entry.previous_data)
            .bind(&entry.new_data)
            .bind(&hash)
            .fetch_one(&mut *conn)
            .await
    }

    /// The audit trail for one object, oldest first.
    pub async fn list_for_object(
        pool: &PgPool,
        object_id: &str,
    ) -> Result<Vec<AuditLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM audit_logs WHERE object_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, AuditLog>(&query)
            .bind(object_id)
            .fetch_all(pool)
            .await
    }

    /// Total number of audit entries. Non-decreasing by construction.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*)::BIGINT FROM audit_logs")
            .fetch_one(pool)
            .await
    }

    /// Fetch entries ordered by id for sequential hash chain verification.
    pub async fn fetch_for_integrity_check(
        pool: &PgPool,
        from_id: Option<DbId>,
    ) -> Result<Vec<AuditLog>, sqlx::Error> {
        let query = match from_id {
            Some(_) => {
                format!("SELECT {COLUMNS} FROM audit_logs WHERE id >= $1 ORDER BY id ASC")
            }
            None => format!("SELECT {COLUMNS} FROM audit_logs ORDER BY id ASC"),
        };
        match from_id {
            Some(f) => {
                sqlx::query_as::<_, AuditLog>(&query)
                    .bind(f)
                    .fetch_all(pool)
                    .await
            }
            None => sqlx::query_as::<_, AuditLog>(&query).fetch_all(pool).await,
        }
    }
}
