//! File-backed record tables.
//!
//! Each service wraps one [`shared::RecordRepository`] and scopes every operation to the
//! owning user.

pub mod patients;
pub mod profiles;
pub mod reports;
pub mod shared;
pub mod templates;
