//! Stored record models.
//!
//! Each table of the store has one record type here. Records are persisted as a single YAML
//! document (`record.yaml`) inside a sharded directory named after the record id:
//!
//! ```text
//! <data_dir>/<table>/<s1>/<s2>/<uuid>/record.yaml
//! ```
//!
//! Parsing is strict: unknown keys are rejected and errors name the failing field path
//! (e.g. `report_data.form.patient.birth_date`).

use crate::constants::RecordKind;
use crate::error::{LaudoError, LaudoResult};
use crate::form::{DoctorProfile, PatientFormData, ReportDraft};
use crate::NonEmptyText;
use crate::ShardableUuid;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A record that lives in one table of the store and belongs to one user.
pub trait StoredRecord: Serialize + DeserializeOwned {
    /// Table this record type is kept in.
    const KIND: RecordKind;

    fn id(&self) -> &ShardableUuid;

    /// Owning user. Reads through another user's id report the record as missing.
    fn user_id(&self) -> &ShardableUuid;
}

/// A patient saved for reuse in later letters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatientRecord {
    pub id: ShardableUuid,
    pub user_id: ShardableUuid,
    pub name: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_number: Option<String>,
    /// Copied into the form's care number when the patient is picked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_care_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PatientRecord {
    /// The patient as it appears on the letter form.
    pub fn to_form_data(&self) -> PatientFormData {
        PatientFormData {
            name: self.name.as_str().to_string(),
            birth_date: self.date_of_birth,
            cpf: self.cpf.clone(),
            phone: self.phone.clone(),
            care_number: self.default_care_number.clone(),
            insurance_provider: self.insurance_provider.clone(),
            insurance_number: self.insurance_number.clone(),
        }
    }
}

impl StoredRecord for PatientRecord {
    const KIND: RecordKind = RecordKind::Patient;

    fn id(&self) -> &ShardableUuid {
        &self.id
    }

    fn user_id(&self) -> &ShardableUuid {
        &self.user_id
    }
}

/// A reusable letter: form fields and code selections without a generated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateRecord {
    pub id: ShardableUuid,
    pub user_id: ShardableUuid,
    pub name: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub template_data: ReportDraft,
    pub created_at: DateTime<Utc>,
}

impl StoredRecord for TemplateRecord {
    const KIND: RecordKind = RecordKind::Template;

    fn id(&self) -> &ShardableUuid {
        &self.id
    }

    fn user_id(&self) -> &ShardableUuid {
        &self.user_id
    }
}

/// A generated letter together with the draft it was rendered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportRecord {
    pub id: ShardableUuid,
    pub user_id: ShardableUuid,
    pub name: String,
    pub patient_name: String,
    pub report_data: ReportDraft,
    pub generated_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredRecord for ReportRecord {
    const KIND: RecordKind = RecordKind::Report;

    fn id(&self) -> &ShardableUuid {
        &self.id
    }

    fn user_id(&self) -> &ShardableUuid {
        &self.user_id
    }
}

/// Account details and the signature block of one user. The id is the user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileRecord {
    pub id: ShardableUuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub doctor: DoctorProfile,
    pub updated_at: DateTime<Utc>,
}

impl StoredRecord for ProfileRecord {
    const KIND: RecordKind = RecordKind::Profile;

    fn id(&self) -> &ShardableUuid {
        &self.id
    }

    fn user_id(&self) -> &ShardableUuid {
        &self.id
    }
}

/// Parses a record document.
///
/// # Errors
///
/// Returns [`LaudoError::Translation`] with the failing field path when the YAML does not
/// match the record schema.
pub fn parse_record<T: StoredRecord>(yaml_text: &str) -> LaudoResult<T> {
    let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
    match serde_path_to_error::deserialize::<_, T>(deserializer) {
        Ok(record) => Ok(record),
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() || path == "." {
                "<root>"
            } else {
                path.as_str()
            };
            Err(LaudoError::Translation(format!(
                "{} record schema mismatch at {path}: {source}",
                T::KIND
            )))
        }
    }
}

/// Renders a record document.
pub fn render_record<T: StoredRecord>(record: &T) -> LaudoResult<String> {
    serde_yaml::to_string(record).map_err(LaudoError::YamlSerialization)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::CodeEntry;
    use crate::form::ReportForm;

    fn report() -> ReportRecord {
        let now = Utc::now();
        ReportRecord {
            id: ShardableUuid::new(),
            user_id: ShardableUuid::new(),
            name: "Maria - 17/05/2025".into(),
            patient_name: "Maria".into(),
            report_data: ReportDraft {
                form: ReportForm {
                    patient: PatientFormData::named("Maria"),
                    ..ReportForm::default()
                },
                cid_codes: vec![CodeEntry::new("M17.1", "M17.1 - Gonartrose")],
                tuss_codes: vec![],
            },
            generated_text: "17 de maio de 2025\n\n...".into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn report_survives_yaml() {
        let original = report();
        let yaml = render_record(&original).expect("render");
        let parsed: ReportRecord = parse_record(&yaml).expect("parse");
        assert_eq!(parsed, original);
    }

    #[test]
    fn parse_names_failing_field() {
        let mut yaml = render_record(&report()).expect("render");
        yaml.push_str("unexpected: 1\n");

        let err = parse_record::<ReportRecord>(&yaml).expect_err("unknown key");
        match err {
            LaudoError::Translation(msg) => {
                assert!(msg.starts_with("report record schema mismatch"), "{msg}");
                assert!(msg.contains("unexpected"), "{msg}");
            }
            other => panic!("expected Translation, got {other:?}"),
        }
    }

    #[test]
    fn parse_rejects_invalid_id() {
        let yaml = "id: not-a-uuid\nupdated_at: 2025-01-01T00:00:00Z\n";
        let err = parse_record::<ProfileRecord>(yaml).expect_err("bad id");
        match err {
            LaudoError::Translation(msg) => assert!(msg.contains("id"), "{msg}"),
            other => panic!("expected Translation, got {other:?}"),
        }
    }

    #[test]
    fn patient_fills_form_with_default_care_number() {
        let patient = PatientRecord {
            id: ShardableUuid::new(),
            user_id: ShardableUuid::new(),
            name: NonEmptyText::new("João Lima").unwrap(),
            date_of_birth: NaiveDate::from_ymd_opt(1970, 1, 2),
            cpf: Some("529.982.247-25".into()),
            phone: None,
            insurance_provider: Some("Unimed".into()),
            insurance_number: None,
            default_care_number: Some("AT-1".into()),
            created_at: Utc::now(),
        };

        let form = patient.to_form_data();
        assert_eq!(form.name, "João Lima");
        assert_eq!(form.care_number.as_deref(), Some("AT-1"));
        assert_eq!(form.insurance_provider.as_deref(), Some("Unimed"));
    }
}
