//! Repository for the `id_sequences` counter table.

use miqat_core::entity::EntityKind;
use sqlx::PgConnection;

/// Provides the locked per-kind counter behind entity id generation.
pub struct IdSequenceRepo;

impl IdSequenceRepo {
    /// Increment and return the counter for `kind`.
    ///
    /// Must be called inside an open transaction: the counter row is taken
    /// under `FOR UPDATE`, so concurrent registrations of the same kind
    /// serialize through the row lock and can never observe the same value.
    /// If the surrounding transaction rolls back, the increment rolls back
    /// with it (gaps are acceptable, duplicates are not).
    pub async fn next_value(conn: &mut PgConnection, kind: EntityKind) -> Result<i64, sqlx::Error> {
        // First use of a kind seeds its row at zero.
        sqlx::query(
            "INSERT INTO id_sequences (entity_type, last_value) VALUES ($1, 0)
             ON CONFLICT (entity_type) DO NOTHING",
        )
        .bind(kind.as_str())
        .execute(&mut *conn)
        .await?;

        let current: i64 = sqlx::query_scalar(
            "SELECT last_value FROM id_sequences WHERE entity_type = $1 FOR UPDATE",
        )
        .bind(kind.as_str())
        .fetch_one(&mut *conn)
        .await?;

        let next = current + 1;
        sqlx::query("UPDATE id_sequences SET last_value = $2 WHERE entity_type = $1")
            .bind(kind.as_str())
            .bind(next)
            .execute(&mut *conn)
            .await?;

        Ok(next)
    }
}
