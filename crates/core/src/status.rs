//! Entity lifecycle statuses and the read-time normalization rule.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lifecycle status of a registered entity.
///
/// New registrations start `Pending`; an administrator moves them to
/// `Active` (approve) or `Inactive` (reject). Active entities may later be
/// suspended or deactivated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    Pending,
    Active,
    Inactive,
    Suspended,
}

impl EntityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityStatus::Pending => "pending",
            EntityStatus::Active => "active",
            EntityStatus::Inactive => "inactive",
            EntityStatus::Suspended => "suspended",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(EntityStatus::Pending),
            "active" => Ok(EntityStatus::Active),
            "inactive" => Ok(EntityStatus::Inactive),
            "suspended" => Ok(EntityStatus::Suspended),
            other => Err(CoreError::Internal(format!(
                "Unknown entity status '{other}' in storage"
            ))),
        }
    }
}

impl std::fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize the stored status against the authoritative `is_active` flag.
///
/// `is_active = true` always reads as `Active` unless the stored status is
/// explicitly `Inactive` or `Suspended`. `is_active = false` reads as the
/// stored status, except a stale `Active` reads as `Inactive`.
pub fn effective_status(stored: EntityStatus, is_active: bool) -> EntityStatus {
    match (is_active, stored) {
        (true, EntityStatus::Inactive) => EntityStatus::Inactive,
        (true, EntityStatus::Suspended) => EntityStatus::Suspended,
        (true, _) => EntityStatus::Active,
        (false, EntityStatus::Active) => EntityStatus::Inactive,
        (false, other) => other,
    }
}

/// Administrative transitions permitted by the approval workflow.
///
/// `pending -> {active, inactive}`; `active <-> {inactive, suspended}`.
/// Re-applying the current state is allowed (approve/reject carry no dedup
/// guard; each call re-sets fields and emits a fresh audit row).
pub fn can_transition(from: EntityStatus, to: EntityStatus) -> bool {
    use EntityStatus::{Active, Inactive, Pending, Suspended};
    if from == to {
        return true;
    }
    matches!(
        (from, to),
        (Pending, Active)
            | (Pending, Inactive)
            | (Active, Inactive)
            | (Active, Suspended)
            | (Inactive, Active)
            | (Suspended, Active)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_flag_wins_over_pending() {
        assert_eq!(
            effective_status(EntityStatus::Pending, true),
            EntityStatus::Active
        );
    }

    #[test]
    fn explicit_inactive_survives_active_flag() {
        assert_eq!(
            effective_status(EntityStatus::Inactive, true),
            EntityStatus::Inactive
        );
        assert_eq!(
            effective_status(EntityStatus::Suspended, true),
            EntityStatus::Suspended
        );
    }

    #[test]
    fn stale_active_reads_as_inactive() {
        assert_eq!(
            effective_status(EntityStatus::Active, false),
            EntityStatus::Inactive
        );
    }

    #[test]
    fn pending_and_suspended_survive_inactive_flag() {
        assert_eq!(
            effective_status(EntityStatus::Pending, false),
            EntityStatus::Pending
        );
        assert_eq!(
            effective_status(EntityStatus::Suspended, false),
            EntityStatus::Suspended
        );
    }

    #[test]
    fn pending_can_be_approved_or_rejected() {
        assert!(can_transition(EntityStatus::Pending, EntityStatus::Active));
        assert!(can_transition(EntityStatus::Pending, EntityStatus::Inactive));
    }

    #[test]
    fn pending_cannot_be_suspended() {
        assert!(!can_transition(EntityStatus::Pending, EntityStatus::Suspended));
    }

    #[test]
    fn active_round_trips_with_inactive_and_suspended() {
        assert!(can_transition(EntityStatus::Active, EntityStatus::Inactive));
        assert!(can_transition(EntityStatus::Active, EntityStatus::Suspended));
        assert!(can_transition(EntityStatus::Inactive, EntityStatus::Active));
        assert!(can_transition(EntityStatus::Suspended, EntityStatus::Active));
    }

    #[test]
    fn reapplying_current_state_is_allowed() {
        assert!(can_transition(EntityStatus::Active, EntityStatus::Active));
    }

    #[test]
    fn parse_round_trips() {
        for status in [
            EntityStatus::Pending,
            EntityStatus::Active,
            EntityStatus::Inactive,
            EntityStatus::Suspended,
        ] {
            assert_eq!(EntityStatus::parse(status.as_str()).unwrap(), status);
        }
    }
}
