//! Constants used throughout the Laudo core crate.
//!
//! Directory names, file names and the fixed strings of the authorization letter live here so
//! storage layout and rendered output stay consistent across the codebase.

use std::fmt;

/// Default directory for record storage when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "laudo_data";

/// Default location of the CID-10 reference list.
pub const DEFAULT_CID_CODES_PATH: &str = "data/cid10.json";

/// Default location of the TUSS reference list.
pub const DEFAULT_TUSS_CODES_PATH: &str = "data/tuss.json";

/// Filename of the YAML document inside every record directory.
pub const RECORD_FILENAME: &str = "record.yaml";

/// Queries shorter than this (after trimming) produce no suggestions.
pub const MIN_QUERY_CHARS: usize = 2;

/// Upper bound on suggestions returned for one query.
pub const MAX_SUGGESTIONS: usize = 10;

/// Fixed title line of the letter.
pub const REPORT_TITLE: &str = "SOLICITAÇÃO DE AUTORIZAÇÃO PARA PROCEDIMENTO MÉDICO";

/// Signature placeholder when the profile has no doctor name.
pub const DOCTOR_NAME_PLACEHOLDER: &str = "Dr. _________________________";

/// Signature placeholder when the profile has no CRM number.
pub const CRM_PLACEHOLDER: &str = "_______________________";

/// Report name used when the form has no patient.
pub const UNNAMED_PATIENT: &str = "Sem paciente";

/// Month names used by the extensive date format.
pub const MONTHS_PT_BR: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

/// The record tables kept by the store.
///
/// Closed on purpose: each variant owns one directory under the data dir.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Patient,
    Template,
    Report,
    Profile,
}

impl RecordKind {
    /// Directory name for this table under the data dir.
    pub fn dir_name(&self) -> &'static str {
        match self {
            RecordKind::Patient => "patients",
            RecordKind::Template => "templates",
            RecordKind::Report => "reports",
            RecordKind::Profile => "profiles",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Patient => "patient",
            RecordKind::Template => "template",
            RecordKind::Report => "report",
            RecordKind::Profile => "profile",
        };
        f.write_str(name)
    }
}
