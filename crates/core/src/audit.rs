//! Audit trail constants and integrity hashing.
//!
//! Lives in `core` (zero internal deps) so the repository layer and any
//! verification tooling share the same action vocabulary and hash chain.

use crate::hashing;

// ---------------------------------------------------------------------------
// Action constants
// ---------------------------------------------------------------------------

/// Known action values for audit log entries.
pub mod actions {
    /// Entity registration.
    pub const CREATE: &str = "create";
    /// Field update, approval, or rejection.
    pub const UPDATE: &str = "update";
    /// Soft-delete (cascade deactivation). Rows are never physically removed.
    pub const DELETE: &str = "delete";
}

/// All valid audit actions.
pub const VALID_ACTIONS: &[&str] = &[actions::CREATE, actions::UPDATE, actions::DELETE];

/// Validate that an action string is one of the accepted values.
pub fn validate_action(action: &str) -> Result<(), String> {
    if VALID_ACTIONS.contains(&action) {
        Ok(())
    } else {
        Err(format!(
            "Invalid audit action '{action}'. Must be one of: {}",
            VALID_ACTIONS.join(", ")
        ))
    }
}

// ---------------------------------------------------------------------------
// Integrity hash chain
// ---------------------------------------------------------------------------

/// Known seed value for the first entry in the hash chain.
const CHAIN_SEED: &str = "MIQAT_AUDIT_CHAIN_SEED_V1";

/// Compute the SHA-256 integrity hash for an audit log entry.
///
/// `prev_hash` is the integrity hash of the previous entry, or `None` for
/// the first entry in the chain (which uses a known seed value).
/// `entry_data` is a canonical string representation of the entry content
/// (the JSON-serialized action, object id, and snapshots).
pub fn compute_integrity_hash(prev_hash: Option<&str>, entry_data: &str) -> String {
    let prev = prev_hash.unwrap_or(CHAIN_SEED);
    let combined = format!("{prev}|{entry_data}");
    hashing::sha256_hex(combined.as_bytes())
}
