//! Entity kinds, identifier formatting, and registration validation.
//!
//! The four registration kinds share one polymorphic table, so the
//! kind-dependent rules (parent constraints, id prefixes, required fields)
//! live here as pure functions used by both the repository layer and the
//! parent-listing endpoint. Keeping a single constraint table avoids the
//! classic "serializer and admin form each re-implement the mapping" drift.

use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Entity kinds
// ---------------------------------------------------------------------------

/// The four registration kinds stored in the polymorphic `entities` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Organization,
    Branch,
    Agent,
    Employee,
}

/// All valid entity kinds, in hierarchy order.
pub const ALL_KINDS: &[EntityKind] = &[
    EntityKind::Organization,
    EntityKind::Branch,
    EntityKind::Agent,
    EntityKind::Employee,
];

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Organization => "organization",
            EntityKind::Branch => "branch",
            EntityKind::Agent => "agent",
            EntityKind::Employee => "employee",
        }
    }

    /// Three-letter code prefixed to generated entity ids.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            EntityKind::Organization => "ORG",
            EntityKind::Branch => "BRN",
            EntityKind::Agent => "AGT",
            EntityKind::Employee => "EMP",
        }
    }

    /// Parse a kind from its wire representation.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "organization" => Ok(EntityKind::Organization),
            "branch" => Ok(EntityKind::Branch),
            "agent" => Ok(EntityKind::Agent),
            "employee" => Ok(EntityKind::Employee),
            other => Err(CoreError::Validation(format!(
                "Unknown entity type '{other}'. Must be one of: organization, branch, agent, employee"
            ))),
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Identifier formatting
// ---------------------------------------------------------------------------

/// Format a generated entity identifier: `{PREFIX}-{value:04}`.
///
/// Values beyond 9999 widen naturally (`ORG-10000`); the four-digit pad is a
/// floor, not a ceiling.
pub fn format_entity_code(kind: EntityKind, value: i64) -> String {
    format!("{}-{:04}", kind.id_prefix(), value)
}

// ---------------------------------------------------------------------------
// Parent constraint table
// ---------------------------------------------------------------------------

/// The kinds a given child kind may attach to.
///
/// Single source of truth for the parent-type constraint: registration
/// validation and the "list available parents" endpoint both call this.
/// Organizations are roots and return an empty slice.
pub fn valid_parent_kinds(child: EntityKind) -> &'static [EntityKind] {
    match child {
        EntityKind::Organization => &[],
        EntityKind::Branch => &[EntityKind::Organization],
        EntityKind::Agent => &[EntityKind::Branch],
        EntityKind::Employee => &[EntityKind::Organization, EntityKind::Branch],
    }
}

/// Validate that `parent` (if any) is an acceptable parent kind for `child`.
///
/// A missing parent for a non-root kind, a present parent for an
/// organization, and a wrong-kinded parent are all validation errors naming
/// the expected kind(s).
pub fn validate_parent_kind(child: EntityKind, parent: Option<EntityKind>) -> Result<(), CoreError> {
    let allowed = valid_parent_kinds(child);
    match (allowed.is_empty(), parent) {
        (true, None) => Ok(()),
        (true, Some(_)) => Err(CoreError::Validation(
            "An organization cannot have a parent".to_string(),
        )),
        (false, None) => Err(CoreError::Validation(format!(
            "A {child} requires a parent of type: {}",
            kinds_list(allowed)
        ))),
        (false, Some(p)) if allowed.contains(&p) => Ok(()),
        (false, Some(p)) => Err(CoreError::Validation(format!(
            "Invalid parent type '{p}' for {child}. Parent must be: {}",
            kinds_list(allowed)
        ))),
    }
}

fn kinds_list(kinds: &[EntityKind]) -> String {
    kinds
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(" or ")
}

// ---------------------------------------------------------------------------
// Registration field validation
// ---------------------------------------------------------------------------

/// The registration fields subject to presence/syntax validation.
///
/// The repository layer maps its create DTO into this before insert.
#[derive(Debug, Default)]
pub struct RegistrationFields<'a> {
    pub name: Option<&'a str>,
    pub parent_id: Option<&'a str>,
    pub email: Option<&'a str>,
}

/// Validate required-field presence and email syntax for a registration.
///
/// Collects every missing field into a single error so the caller sees the
/// full list at once rather than one field per round trip.
pub fn validate_registration(
    kind: EntityKind,
    fields: &RegistrationFields<'_>,
) -> Result<(), CoreError> {
    let mut missing: Vec<&str> = Vec::new();

    if fields.name.map_or(true, |n| n.trim().is_empty()) {
        missing.push("name");
    }
    if !valid_parent_kinds(kind).is_empty()
        && fields.parent_id.map_or(true, |p| p.trim().is_empty())
    {
        missing.push("parent_id");
    }

    if !missing.is_empty() {
        return Err(CoreError::Validation(format!(
            "Missing required fields for {kind}: {}",
            missing.join(", ")
        )));
    }

    if let Some(email) = fields.email {
        if !email.validate_email() {
            return Err(CoreError::Validation(format!(
                "Invalid email address: {email}"
            )));
        }
    }

    Ok(())
}

/// Canonical form of an email for the global-uniqueness check.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
