use miqat_core::error::CoreError;

/// Error type for repository operations that mix domain validation with
/// database access (registration, approval, cascade deactivation).
///
/// Plain single-statement repositories return `sqlx::Error` directly; this
/// wrapper exists for the transactional multi-step paths where a domain
/// rule can fail mid-transaction.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
