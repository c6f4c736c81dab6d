//! Miqat domain core.
//!
//! Pure domain logic with zero internal dependencies so it can be used by
//! the repository layer, the API layer, and any future CLI tooling.

pub mod audit;
pub mod entity;
pub mod error;
pub mod hashing;
pub mod ledger;
pub mod status;
pub mod types;
