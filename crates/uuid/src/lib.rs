//! Record identifiers and sharded-path utilities.
//!
//! Laudo stores every record (patients, templates, reports, profiles) in its own directory
//! derived from a UUID.
//!
//! To keep path derivation deterministic, identifiers use a *canonical* UUID representation:
//! **32 lowercase hexadecimal characters** (no hyphens).
//!
//! ## Canonical UUID form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Identifiers supplied from outside (CLI arguments, HTTP paths) must already be canonical.
//! Use [`ShardableUuid::parse`] to validate them.
//!
//! ## Sharded directory layout
//! For a canonical UUID `u`, a record lives under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Example:
//! `laudo_data/reports/55/0e/550e8400e29b41d4a716446655440000/`

mod service;

pub use service::ShardableUuid;

/// Error type for UUID operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for UUID operations.
pub type UuidResult<T> = Result<T, UuidError>;
