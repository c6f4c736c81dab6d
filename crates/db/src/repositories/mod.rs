//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or an open transaction for multi-step units of work)
//! as the first argument.

pub mod audit_repo;
pub mod entity_repo;
pub mod financial_record_repo;
pub mod id_sequence_repo;

pub use audit_repo::AuditLogRepo;
pub use entity_repo::EntityRepo;
pub use financial_record_repo::FinancialRecordRepo;
pub use id_sequence_repo::IdSequenceRepo;
