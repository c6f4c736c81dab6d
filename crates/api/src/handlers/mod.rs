//! Request handlers for the entity registry and ledger resources.
//!
//! Handlers delegate to the corresponding repository in `miqat_db` and map
//! errors via [`AppError`](crate::error::AppError).

pub mod entities;
pub mod ledger;
