//! Registered entity model and DTOs.

use miqat_core::entity::EntityKind;
use miqat_core::error::CoreError;
use miqat_core::status::{effective_status, EntityStatus};
use miqat_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An entity row from the polymorphic `entities` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Entity {
    /// Generated prefixed id, e.g. `ORG-0001`. Immutable once assigned.
    pub id: String,
    pub entity_type: String,
    pub parent_id: Option<String>,
    /// Inherited from the parent chain at creation time.
    pub organization_id: Option<String>,
    pub branch_id: Option<String>,
    pub name: String,
    pub owner_name: Option<String>,
    pub email: Option<String>,
    pub contact_no: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub license_no: Option<String>,
    pub tax_no: Option<String>,
    /// Stored path of the uploaded identification document, never binary.
    pub document_path: Option<String>,
    pub status: String,
    pub is_active: bool,
    pub created_by: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Entity {
    /// Typed view of the `entity_type` column.
    pub fn kind(&self) -> Result<EntityKind, CoreError> {
        EntityKind::parse(&self.entity_type)
    }

    /// Status normalized against the authoritative `is_active` flag.
    pub fn effective_status(&self) -> Result<EntityStatus, CoreError> {
        Ok(effective_status(
            EntityStatus::parse(&self.status)?,
            self.is_active,
        ))
    }

    /// Rewrite `status` to the normalized value for read responses. Audit
    /// snapshots serialize the stored value, not this one.
    pub fn normalized(mut self) -> Result<Entity, CoreError> {
        self.status = self.effective_status()?.as_str().to_string();
        Ok(self)
    }
}

/// DTO for registering a new entity.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterEntity {
    pub entity_type: String,
    pub parent_id: Option<String>,
    pub name: Option<String>,
    pub owner_name: Option<String>,
    pub email: Option<String>,
    pub contact_no: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub license_no: Option<String>,
    pub tax_no: Option<String>,
    pub document_path: Option<String>,
    pub created_by: Option<String>,
}

/// DTO for updating an existing entity. All fields are optional.
///
/// `entity_type` is immutable and deliberately absent. Changing `parent_id`
/// re-derives the inherited `organization_id`/`branch_id` unless they are
/// explicitly provided in the same patch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEntity {
    pub parent_id: Option<String>,
    pub organization_id: Option<String>,
    pub branch_id: Option<String>,
    pub name: Option<String>,
    pub owner_name: Option<String>,
    pub email: Option<String>,
    pub contact_no: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub license_no: Option<String>,
    pub tax_no: Option<String>,
    pub document_path: Option<String>,
    pub performed_by: Option<String>,
}

/// Slim row for the "available parents" listing.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ParentCandidate {
    pub id: String,
    pub entity_type: String,
    pub name: String,
    pub organization_id: Option<String>,
    pub branch_id: Option<String>,
    pub is_active: bool,
}

/// Result of a cascade deactivation: the soft-deleted root.
#[derive(Debug, Clone, Serialize)]
pub struct DeactivatedEntity {
    pub id: String,
    pub entity_type: String,
    pub name: String,
    /// Total entities deactivated, the root included.
    pub affected: u64,
}
