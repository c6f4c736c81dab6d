//! Audit log model and DTOs.

use miqat_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// An audit log row. Append-only; never updated or deleted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditLog {
    pub id: DbId,
    /// One of `create`, `update`, `delete`.
    pub action: String,
    pub model_name: String,
    pub object_id: String,
    pub performed_by: Option<String>,
    /// Snapshot of the row before the mutation, or `None` on create.
    pub previous_data: Option<serde_json::Value>,
    /// Snapshot of the row after the mutation, or `None` on delete-style
    /// entries with no surviving state to record.
    pub new_data: Option<serde_json::Value>,
    /// SHA-256 hash chained to the previous entry.
    pub integrity_hash: String,
    pub created_at: Timestamp,
}

/// DTO for appending an audit log entry.
#[derive(Debug, Clone)]
pub struct CreateAuditLog {
    pub action: &'static str,
    pub model_name: &'static str,
    pub object_id: String,
    pub performed_by: Option<String>,
    pub previous_data: Option<serde_json::Value>,
    pub new_data: Option<serde_json::Value>,
}
