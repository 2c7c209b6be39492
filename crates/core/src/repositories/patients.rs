//! Saved patients.
//!
//! A user keeps a list of patients so their identification can be copied into a new letter
//! instead of being typed again.

use super::shared::RecordRepository;
use crate::config::CoreConfig;
use crate::error::{LaudoError, LaudoResult};
use crate::records::PatientRecord;
use crate::validation::{only_digits, validate_cpf};
use crate::NonEmptyText;
use crate::ShardableUuid;
use chrono::{NaiveDate, Utc};
use laudo_types::non_blank;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Editable fields of a patient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatientInput {
    pub name: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub cpf: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub insurance_provider: Option<String>,
    #[serde(default)]
    pub insurance_number: Option<String>,
    #[serde(default)]
    pub default_care_number: Option<String>,
}

impl PatientInput {
    /// Checks the input and returns the trimmed name.
    ///
    /// # Errors
    ///
    /// - [`LaudoError::Text`] when the name is blank
    /// - [`LaudoError::InvalidCpf`] when a CPF is given and fails its check digits
    fn validate(&self) -> LaudoResult<NonEmptyText> {
        let name = NonEmptyText::new(&self.name)?;
        if let Some(cpf) = non_blank(self.cpf.as_deref()) {
            if !validate_cpf(cpf) {
                return Err(LaudoError::InvalidCpf);
            }
        }
        Ok(name)
    }
}

/// Trims optional text and drops it when blank.
fn cleaned(value: &Option<String>) -> Option<String> {
    non_blank(value.as_deref()).map(str::to_string)
}

/// Service for a user's saved patients.
#[derive(Clone, Debug)]
pub struct PatientService {
    repo: RecordRepository<PatientRecord>,
}

impl PatientService {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self {
            repo: RecordRepository::new(&cfg),
        }
    }

    /// Stores a new patient for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error for a blank name, an invalid CPF, or a storage failure.
    pub fn create(&self, user_id: &ShardableUuid, input: &PatientInput) -> LaudoResult<PatientRecord> {
        let name = input.validate()?;
        self.repo.create(|id| PatientRecord {
            id,
            user_id: user_id.clone(),
            name,
            date_of_birth: input.date_of_birth,
            cpf: cleaned(&input.cpf),
            phone: cleaned(&input.phone),
            insurance_provider: cleaned(&input.insurance_provider),
            insurance_number: cleaned(&input.insurance_number),
            default_care_number: cleaned(&input.default_care_number),
            created_at: Utc::now(),
        })
    }

    pub fn get(&self, user_id: &ShardableUuid, id: &ShardableUuid) -> LaudoResult<PatientRecord> {
        self.repo.read_owned(user_id, id)
    }

    /// Replaces the editable fields of an existing patient. Id and creation time are kept.
    pub fn update(
        &self,
        user_id: &ShardableUuid,
        id: &ShardableUuid,
        input: &PatientInput,
    ) -> LaudoResult<PatientRecord> {
        let name = input.validate()?;
        let existing = self.repo.read_owned(user_id, id)?;

        let updated = PatientRecord {
            name,
            date_of_birth: input.date_of_birth,
            cpf: cleaned(&input.cpf),
            phone: cleaned(&input.phone),
            insurance_provider: cleaned(&input.insurance_provider),
            insurance_number: cleaned(&input.insurance_number),
            default_care_number: cleaned(&input.default_care_number),
            ..existing
        };
        self.repo.write(&updated)?;
        Ok(updated)
    }

    /// The user's patients ordered by name, case-insensitively.
    pub fn list(&self, user_id: &ShardableUuid) -> Vec<PatientRecord> {
        let mut patients = self.repo.list_owned(user_id);
        patients.sort_by_cached_key(|p| p.name.as_str().to_lowercase());
        patients
    }

    /// Patients whose name contains `query` (case-insensitive). A query made only of digits
    /// and CPF punctuation also matches against the CPF digits. A blank query returns the
    /// full list.
    pub fn search(&self, user_id: &ShardableUuid, query: &str) -> Vec<PatientRecord> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.list(user_id);
        }
        let looks_like_cpf = needle
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | ' '));
        let digits = if looks_like_cpf {
            only_digits(&needle)
        } else {
            String::new()
        };

        self.list(user_id)
            .into_iter()
            .filter(|p| {
                p.name.as_str().to_lowercase().contains(&needle)
                    || (!digits.is_empty()
                        && p.cpf
                            .as_deref()
                            .is_some_and(|cpf| only_digits(cpf).contains(&digits)))
            })
            .collect()
    }
}
