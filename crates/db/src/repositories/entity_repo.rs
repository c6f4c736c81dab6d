//! Repository for the polymorphic `entities` table.
//!
//! Registration, updates, approval, and cascade deactivation are each one
//! transaction: the entity mutation and its audit entry commit together or
//! not at all.

use miqat_core::audit::actions;
use miqat_core::entity::{
    format_entity_code, normalize_email, validate_parent_kind, validate_registration,
    valid_parent_kinds, EntityKind, RegistrationFields,
};
use miqat_core::error::CoreError;
use miqat_core::status::{can_transition, EntityStatus};
use sqlx::{PgConnection, PgPool};

use crate::error::StoreError;
use crate::models::audit::CreateAuditLog;
use crate::models::entity::{
    DeactivatedEntity, Entity, ParentCandidate, RegisterEntity, UpdateEntity,
};
use crate::repositories::{AuditLogRepo, IdSequenceRepo};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, entity_type, parent_id, organization_id, branch_id, \
    name, owner_name, email, contact_no, address, city, country, \
    license_no, tax_no, document_path, status, is_active, \
    created_by, created_at, updated_at";

/// Audit `model_name` for entity rows.
const MODEL_NAME: &str = "entity";

/// Provides registration, lifecycle, and hierarchy operations for entities.
pub struct EntityRepo;

impl EntityRepo {
    /// Register a new entity.
    ///
    /// Validates the kind, required fields, parent constraint, and global
    /// email uniqueness; generates the prefixed id under the sequence row
    /// lock; inherits `organization_id`/`branch_id` from the parent chain;
    /// inserts with `status = pending`; and appends a `create` audit entry.
    /// All inside one transaction.
    pub async fn register(pool: &PgPool, input: &RegisterEntity) -> Result<Entity, StoreError> {
        let kind = EntityKind::parse(&input.entity_type)?;
        validate_registration(
            kind,
            &RegistrationFields {
                name: input.name.as_deref(),
                parent_id: input.parent_id.as_deref(),
                email: input.email.as_deref(),
            },
        )?;

        let mut tx = pool.begin().await?;

        let parent = match &input.parent_id {
            Some(parent_id) => {
                let parent = find_by_id_conn(&mut tx, parent_id)
                    .await?
                    .ok_or_else(|| CoreError::NotFound {
                        entity: "Entity",
                        id: parent_id.clone(),
                    })?;
                validate_parent_kind(kind, Some(parent.kind()?))?;
                Some(parent)
            }
            None => {
                validate_parent_kind(kind, None)?;
                None
            }
        };

        if let Some(email) = &input.email {
            ensure_email_available(&mut tx, email, None).await?;
        }

        let value = IdSequenceRepo::next_value(&mut tx, kind).await?;
        let id = format_entity_code(kind, value);

        let (organization_id, branch_id) = match &parent {
            Some(p) => inherited_ids(kind, p)?,
            None => (None, None),
        };

        let query = format!(
            "INSERT INTO entities \
                 (id, entity_type, parent_id, organization_id, branch_id, \
                  name, owner_name, email, contact_no, address, city, country, \
                  license_no, tax_no, document_path, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING {COLUMNS}"
        );
        let entity = sqlx::query_as::<_, Entity>(&query)
            .bind(&id)
            .bind(kind.as_str())
            .bind(&input.parent_id)
            .bind(&organization_id)
            .bind(&branch_id)
            .bind(input.name.as_deref().map(str::trim))
            .bind(&input.owner_name)
            .bind(&input.email)
            .bind(&input.contact_no)
            .bind(&input.address)
            .bind(&input.city)
            .bind(&input.country)
            .bind(&input.license_no)
            .bind(&input.tax_no)
            .bind(&input.document_path)
            .bind(&input.created_by)
            .fetch_one(&mut *tx)
            .await?;

        AuditLogRepo::append(
            &mut tx,
            &CreateAuditLog {
                action: actions::CREATE,
                model_name: MODEL_NAME,
                object_id: entity.id.clone(),
                performed_by: input.created_by.clone(),
                previous_data: None,
                new_data: Some(snapshot(&entity)?),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(id = %entity.id, kind = %kind, "Entity registered");
        Ok(entity)
    }

    /// Update an entity's profile fields.
    ///
    /// When `parent_id` changes, the new parent is validated against the
    /// constraint table and the inherited `organization_id`/`branch_id` are
    /// re-derived from it, except where the patch provides them explicitly.
    pub async fn update(
        pool: &PgPool,
        id: &str,
        input: &UpdateEntity,
    ) -> Result<Entity, StoreError> {
        let mut tx = pool.begin().await?;

        let current = lock_by_id(&mut tx, id).await?;
        let kind = current.kind()?;

        if let Some(name) = &input.name {
            if name.trim().is_empty() {
                return Err(CoreError::Validation("name must not be blank".into()).into());
            }
        }

        if let Some(email) = &input.email {
            if current.email.as_deref().map(normalize_email) != Some(normalize_email(email)) {
                validate_registration(
                    kind,
                    &RegistrationFields {
                        name: Some(&current.name),
                        parent_id: current.parent_id.as_deref(),
                        email: Some(email),
                    },
                )?;
                ensure_email_available(&mut tx, email, Some(id)).await?;
            }
        }

        let changed_parent = input
            .parent_id
            .clone()
            .filter(|p| current.parent_id.as_deref() != Some(p.as_str()));

        let (parent_id, organization_id, branch_id) = match changed_parent {
            Some(new_parent_id) => {
                let parent = find_by_id_conn(&mut tx, &new_parent_id)
                    .await?
                    .ok_or_else(|| CoreError::NotFound {
                        entity: "Entity",
                        id: new_parent_id.clone(),
                    })?;
                validate_parent_kind(kind, Some(parent.kind()?))?;
                let (derived_org, derived_branch) = inherited_ids(kind, &parent)?;
                (
                    Some(new_parent_id),
                    // Explicitly provided values win over re-derivation.
                    input.organization_id.clone().or(derived_org),
                    input.branch_id.clone().or(derived_branch),
                )
            }
            None => (
                current.parent_id.clone(),
                input
                    .organization_id
                    .clone()
                    .or_else(|| current.organization_id.clone()),
                input.branch_id.clone().or_else(|| current.branch_id.clone()),
            ),
        };

        let query = format!(
            "UPDATE entities SET \
                parent_id = $2, organization_id = $3, branch_id = $4, \
                name = $5, owner_name = $6, email = $7, contact_no = $8, \
                address = $9, city = $10, country = $11, license_no = $12, \
                tax_no = $13, document_path = $14 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Entity>(&query)
            .bind(id)
            .bind(&parent_id)
            .bind(&organization_id)
            .bind(&branch_id)
            .bind(
                input
                    .name
                    .as_deref()
                    .map(str::trim)
                    .unwrap_or(current.name.as_str()),
            )
            .bind(input.owner_name.as_ref().or(current.owner_name.as_ref()))
            .bind(input.email.as_ref().or(current.email.as_ref()))
            .bind(input.contact_no.as_ref().or(current.contact_no.as_ref()))
            .bind(input.address.as_ref().or(current.address.as_ref()))
            .bind(input.city.as_ref().or(current.city.as_ref()))
            .bind(input.country.as_ref().or(current.country.as_ref()))
            .bind(input.license_no.as_ref().or(current.license_no.as_ref()))
            .bind(input.tax_no.as_ref().or(current.tax_no.as_ref()))
            .bind(
                input
                    .document_path
                    .as_ref()
                    .or(current.document_path.as_ref()),
            )
            .fetch_one(&mut *tx)
            .await?;

        AuditLogRepo::append(
            &mut tx,
            &CreateAuditLog {
                action: actions::UPDATE,
                model_name: MODEL_NAME,
                object_id: updated.id.clone(),
                performed_by: input.performed_by.clone(),
                previous_data: Some(snapshot(&current)?),
                new_data: Some(snapshot(&updated)?),
            },
        )
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Approve an entity: `is_active = true`, `status = active`.
    ///
    /// No dedup guard: re-approving re-sets the same fields and emits
    /// another audit entry.
    pub async fn approve(
        pool: &PgPool,
        id: &str,
        performed_by: Option<&str>,
        note: Option<&str>,
    ) -> Result<Entity, StoreError> {
        Self::transition(pool, id, EntityStatus::Active, true, performed_by, "approval_note", note)
            .await
    }

    /// Reject (or deactivate) an entity: `is_active = false`,
    /// `status = inactive`. The reason is embedded in the new-state
    /// snapshot of the audit entry.
    pub async fn reject(
        pool: &PgPool,
        id: &str,
        performed_by: Option<&str>,
        reason: Option<&str>,
    ) -> Result<Entity, StoreError> {
        Self::transition(
            pool,
            id,
            EntityStatus::Inactive,
            false,
            performed_by,
            "rejection_reason",
            reason,
        )
        .await
    }

    async fn transition(
        pool: &PgPool,
        id: &str,
        to: EntityStatus,
        active: bool,
        performed_by: Option<&str>,
        note_key: &str,
        note: Option<&str>,
    ) -> Result<Entity, StoreError> {
        let mut tx = pool.begin().await?;

        let current = lock_by_id(&mut tx, id).await?;
        let from = EntityStatus::parse(&current.status)?;
        if !can_transition(from, to) {
            return Err(CoreError::Validation(format!(
                "Cannot move entity {id} from {from} to {to}"
            ))
            .into());
        }

        let query = format!(
            "UPDATE entities SET status = $2, is_active = $3 WHERE id = $1 RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Entity>(&query)
            .bind(id)
            .bind(to.as_str())
            .bind(active)
            .fetch_one(&mut *tx)
            .await?;

        let mut new_data = snapshot(&updated)?;
        if let Some(note) = note {
            new_data[note_key] = serde_json::Value::String(note.to_string());
        }

        AuditLogRepo::append(
            &mut tx,
            &CreateAuditLog {
                action: actions::UPDATE,
                model_name: MODEL_NAME,
                object_id: updated.id.clone(),
                performed_by: performed_by.map(String::from),
                previous_data: Some(snapshot(&current)?),
                new_data: Some(new_data),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(id = %updated.id, status = %to, "Entity status changed");
        Ok(updated)
    }

    /// Soft-delete an entity and every descendant, recursively.
    ///
    /// Walks the parent graph with a recursive CTE, deactivates the whole
    /// subtree, and appends one `delete` audit entry per node, all in one
    /// transaction. Rows are never physically deleted. Re-running over an
    /// already-inactive subtree is a state no-op that still emits audit
    /// rows.
    pub async fn deactivate_cascade(
        pool: &PgPool,
        id: &str,
        performed_by: Option<&str>,
    ) -> Result<DeactivatedEntity, StoreError> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "WITH RECURSIVE subtree AS (
                SELECT {COLUMNS}
                FROM entities
                WHERE id = $1
                UNION ALL
                SELECT e.id, e.entity_type, e.parent_id, e.organization_id, e.branch_id,
                       e.name, e.owner_name, e.email, e.contact_no, e.address, e.city,
                       e.country, e.license_no, e.tax_no, e.document_path, e.status,
                       e.is_active, e.created_by, e.created_at, e.updated_at
                FROM entities e
                INNER JOIN subtree s ON e.parent_id = s.id
            )
            SELECT * FROM subtree"
        );
        let nodes = sqlx::query_as::<_, Entity>(&query)
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

        let root = nodes
            .first()
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                entity: "Entity",
                id: id.to_string(),
            })?;

        let ids: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
        sqlx::query(
            "UPDATE entities SET is_active = FALSE, status = 'inactive' WHERE id = ANY($1)",
        )
        .bind(&ids)
        .execute(&mut *tx)
        .await?;

        for node in &nodes {
            let mut after = node.clone();
            after.is_active = false;
            after.status = EntityStatus::Inactive.as_str().to_string();

            AuditLogRepo::append(
                &mut tx,
                &CreateAuditLog {
                    action: actions::DELETE,
                    model_name: MODEL_NAME,
                    object_id: node.id.clone(),
                    performed_by: performed_by.map(String::from),
                    previous_data: Some(snapshot(node)?),
                    new_data: Some(snapshot(&after)?),
                },
            )
            .await?;
        }

        tx.commit().await?;

        let affected = nodes.len() as u64;
        tracing::info!(id = %root.id, affected, "Entity subtree deactivated");
        Ok(DeactivatedEntity {
            id: root.id,
            entity_type: root.entity_type,
            name: root.name,
            affected,
        })
    }

    /// The active entities a new child of `child_kind` may attach to.
    pub async fn list_available_parents(
        pool: &PgPool,
        child_kind: EntityKind,
    ) -> Result<Vec<ParentCandidate>, sqlx::Error> {
        let allowed = valid_parent_kinds(child_kind);
        if allowed.is_empty() {
            return Ok(Vec::new());
        }
        let kinds: Vec<String> = allowed.iter().map(|k| k.as_str().to_string()).collect();

        sqlx::query_as::<_, ParentCandidate>(
            "SELECT id, entity_type, name, organization_id, branch_id, is_active
             FROM entities
             WHERE entity_type = ANY($1) AND is_active = TRUE
             ORDER BY id",
        )
        .bind(&kinds)
        .fetch_all(pool)
        .await
    }

    /// Find an entity by its generated id.
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Entity>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM entities WHERE id = $1");
        sqlx::query_as::<_, Entity>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all entities, most recently created first.
    pub async fn list(pool: &PgPool) -> Result<Vec<Entity>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM entities ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, Entity>(&query).fetch_all(pool).await
    }

    /// Direct children of an entity.
    pub async fn list_children(pool: &PgPool, id: &str) -> Result<Vec<Entity>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM entities WHERE parent_id = $1 ORDER BY id");
        sqlx::query_as::<_, Entity>(&query)
            .bind(id)
            .fetch_all(pool)
            .await
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

async fn find_by_id_conn(
    conn: &mut PgConnection,
    id: &str,
) -> Result<Option<Entity>, sqlx::Error> {
    let query = format!("SELECT {COLUMNS} FROM entities WHERE id = $1");
    sqlx::query_as::<_, Entity>(&query)
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Fetch an entity under `FOR UPDATE`, or fail with `NotFound`.
async fn lock_by_id(conn: &mut PgConnection, id: &str) -> Result<Entity, StoreError> {
    let query = format!("SELECT {COLUMNS} FROM entities WHERE id = $1 FOR UPDATE");
    sqlx::query_as::<_, Entity>(&query)
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| {
            CoreError::NotFound {
                entity: "Entity",
                id: id.to_string(),
            }
            .into()
        })
}

/// Fail if `email` is already registered to a different entity.
async fn ensure_email_available(
    conn: &mut PgConnection,
    email: &str,
    exclude_id: Option<&str>,
) -> Result<(), StoreError> {
    let normalized = normalize_email(email);
    let existing: Option<String> = match exclude_id {
        Some(id) => {
            sqlx::query_scalar(
                "SELECT id FROM entities WHERE LOWER(email) = $1 AND id <> $2 LIMIT 1",
            )
            .bind(&normalized)
            .bind(id)
            .fetch_optional(conn)
            .await?
        }
        None => {
            sqlx::query_scalar("SELECT id FROM entities WHERE LOWER(email) = $1 LIMIT 1")
                .bind(&normalized)
                .fetch_optional(conn)
                .await?
        }
    };

    match existing {
        Some(other) => Err(CoreError::Validation(format!(
            "Email {email} is already registered to entity {other}"
        ))
        .into()),
        None => Ok(()),
    }
}

/// `organization_id` / `branch_id` a new child inherits from its parent.
fn inherited_ids(
    kind: EntityKind,
    parent: &Entity,
) -> Result<(Option<String>, Option<String>), CoreError> {
    let parent_kind = parent.kind()?;
    Ok(match kind {
        EntityKind::Organization => (None, None),
        // A branch belongs directly to its organization parent.
        EntityKind::Branch => (Some(parent.id.clone()), None),
        // An agent inherits its branch parent's organization.
        EntityKind::Agent => (parent.organization_id.clone(), Some(parent.id.clone())),
        // An employee inherits whichever ancestry its direct parent carries.
        EntityKind::Employee => match parent_kind {
            EntityKind::Organization => (Some(parent.id.clone()), None),
            EntityKind::Branch => (parent.organization_id.clone(), Some(parent.id.clone())),
            _ => (parent.organization_id.clone(), parent.branch_id.clone()),
        },
    })
}

/// JSON snapshot of an entity for audit entries. File-valued fields appear
/// as their stored path, never binary content.
fn snapshot(entity: &Entity) -> Result<serde_json::Value, CoreError> {
    serde_json::to_value(entity)
        .map_err(|e| CoreError::Internal(format!("Failed to serialize entity snapshot: {e}")))
}
