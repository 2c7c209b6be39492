//! # Laudo Core
//!
//! Core logic for producing medical authorization-request letters.
//!
//! This crate contains pure data operations and file management:
//! - Brazilian identifier validation and input masks ([`validation`])
//! - CID-10 / TUSS reference lists and suggestion state ([`codes`], [`autocomplete`])
//! - Letter rendering ([`report`]) and per-letter editing state ([`session`])
//! - Patients, templates, reports and profiles in a sharded YAML store ([`repositories`])
//!
//! **No API concerns**: HTTP servers and command-line handling belong in `api-rest` and `cli`.

pub mod autocomplete;
pub mod codes;
pub mod config;
pub mod constants;
pub mod error;
pub mod form;
pub mod records;
pub mod report;
pub mod repositories;
pub mod session;
pub mod validation;

pub use autocomplete::{Autocomplete, CodeSlots, Key};
pub use codes::{CodeEntry, CodeKind, CodeList};
pub use config::{CodeLists, CoreConfig};
pub use constants::RecordKind;
pub use error::{LaudoError, LaudoResult};
pub use form::{DoctorProfile, PatientFormData, ReportDraft, ReportForm};
pub use records::{PatientRecord, ProfileRecord, ReportRecord, StoredRecord, TemplateRecord};
pub use report::ReportBuilder;
pub use repositories::patients::{PatientInput, PatientService};
pub use repositories::profiles::{ProfileInput, ProfileService};
pub use repositories::reports::{DashboardStats, ReportService};
pub use repositories::templates::TemplateService;
pub use session::ReportSession;

pub use laudo_types::NonEmptyText;
pub use laudo_uuid::ShardableUuid;
