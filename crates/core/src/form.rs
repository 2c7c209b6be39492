//! Form data carried into the letter and stored in drafts.
//!
//! Optional free-text fields are `Option<String>`; a value holding only whitespace counts as
//! missing everywhere it is read (see [`laudo_types::non_blank`]).

use crate::codes::CodeEntry;
use chrono::NaiveDate;
use laudo_types::non_blank;
use serde::{Deserialize, Serialize};

/// Patient identification as typed into the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatientFormData {
    /// Always printed; may be blank while a template is being prepared.
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub care_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_number: Option<String>,
}

impl PatientFormData {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn cpf(&self) -> Option<&str> {
        non_blank(self.cpf.as_deref())
    }
}

/// Everything on the letter form besides the code selections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportForm {
    /// Letter date; today when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_date: Option<NaiveDate>,
    #[serde(default)]
    pub patient: PatientFormData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinical_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materials: Option<String>,
}

/// Clinician details used for the signature block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DoctorProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crm_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crm_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rqe_number: Option<String>,
}

/// Saved state of a letter: the form plus the selected codes in slot order.
///
/// Templates and saved reports both store one of these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportDraft {
    #[serde(default)]
    pub form: ReportForm,
    #[serde(default)]
    pub cid_codes: Vec<CodeEntry>,
    #[serde(default)]
    pub tuss_codes: Vec<CodeEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_cpf_is_treated_as_missing() {
        let mut patient = PatientFormData::named("Ana");
        patient.cpf = Some("   ".into());
        assert_eq!(patient.cpf(), None);

        patient.cpf = Some(" 529.982.247-25 ".into());
        assert_eq!(patient.cpf(), Some("529.982.247-25"));
    }

    #[test]
    fn draft_accepts_sparse_json() {
        let draft: ReportDraft = serde_json::from_str(
            r#"{"form": {"patient": {"name": "Ana", "birth_date": "1980-05-17"}}}"#,
        )
        .expect("sparse draft");

        assert_eq!(draft.form.patient.name, "Ana");
        assert_eq!(
            draft.form.patient.birth_date,
            NaiveDate::from_ymd_opt(1980, 5, 17)
        );
        assert!(draft.cid_codes.is_empty());
        assert!(draft.form.report_date.is_none());
    }

    #[test]
    fn draft_rejects_unknown_fields() {
        let err = serde_json::from_str::<ReportDraft>(r#"{"form": {}, "selectedCidCodes": []}"#)
            .expect_err("unknown key");
        assert!(err.to_string().contains("selectedCidCodes"));
    }
}
