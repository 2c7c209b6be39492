//! Clinician profile: account details plus the letter's signature block.

use super::shared::RecordRepository;
use crate::config::CoreConfig;
use crate::error::{LaudoError, LaudoResult};
use crate::form::DoctorProfile;
use crate::records::ProfileRecord;
use crate::validation::format_profile_number;
use crate::ShardableUuid;
use chrono::Utc;
use laudo_types::non_blank;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Editable profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileInput {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub doctor: DoctorProfile,
}

/// Service for clinician profiles. One profile per user, stored under the user's id.
#[derive(Clone, Debug)]
pub struct ProfileService {
    repo: RecordRepository<ProfileRecord>,
}

impl ProfileService {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self {
            repo: RecordRepository::new(&cfg),
        }
    }

    /// The user's profile, or `None` if it was never saved.
    pub fn get(&self, user_id: &ShardableUuid) -> LaudoResult<Option<ProfileRecord>> {
        match self.repo.read(user_id) {
            Ok(profile) => Ok(Some(profile)),
            Err(LaudoError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Creates or replaces the user's profile.
    ///
    /// Text is trimmed and blanks dropped. CRM and RQE numbers are stored in their
    /// `NNN.NNN` form and the CRM state upper-cased.
    pub fn upsert(&self, user_id: &ShardableUuid, input: &ProfileInput) -> LaudoResult<ProfileRecord> {
        let text = |value: &Option<String>| non_blank(value.as_deref()).map(str::to_string);
        let number = |value: &Option<String>| {
            non_blank(value.as_deref())
                .map(format_profile_number)
                .filter(|n| !n.is_empty())
        };

        let record = ProfileRecord {
            id: user_id.clone(),
            email: text(&input.email),
            full_name: text(&input.full_name),
            doctor: DoctorProfile {
                doctor_name: text(&input.doctor.doctor_name),
                crm_number: number(&input.doctor.crm_number),
                crm_state: text(&input.doctor.crm_state).map(|s| s.to_uppercase()),
                rqe_number: number(&input.doctor.rqe_number),
            },
            updated_at: Utc::now(),
        };

        self.repo.write(&record)?;
        tracing::info!("saved profile {}", user_id);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> ProfileService {
        let cfg = CoreConfig::new(dir.path().to_path_buf(), None, None).expect("cfg");
        ProfileService::new(Arc::new(cfg))
    }

    #[test]
    fn absent_profile_is_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(service(&dir).get(&ShardableUuid::new()).expect("get"), None);
    }

    #[test]
    fn upsert_normalises_fields() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let user = ShardableUuid::new();

        let input = ProfileInput {
            email: Some("dra@example.com".into()),
            full_name: Some("  ".into()),
            doctor: DoctorProfile {
                doctor_name: Some(" Dra. Helena Costa ".into()),
                crm_number: Some("123456".into()),
                crm_state: Some("sp".into()),
                rqe_number: Some("abc".into()),
            },
        };
        let saved = svc.upsert(&user, &input).expect("upsert");

        assert_eq!(saved.full_name, None);
        assert_eq!(saved.doctor.doctor_name.as_deref(), Some("Dra. Helena Costa"));
        assert_eq!(saved.doctor.crm_number.as_deref(), Some("123.456"));
        assert_eq!(saved.doctor.crm_state.as_deref(), Some("SP"));
        assert_eq!(saved.doctor.rqe_number, None);
        assert_eq!(svc.get(&user).unwrap(), Some(saved));
    }

    #[test]
    fn upsert_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let user = ShardableUuid::new();

        svc.upsert(&user, &ProfileInput {
            full_name: Some("Antes".into()),
            ..ProfileInput::default()
        })
        .unwrap();
        svc.upsert(&user, &ProfileInput {
            full_name: Some("Depois".into()),
            ..ProfileInput::default()
        })
        .unwrap();

        let profile = svc.get(&user).unwrap().expect("saved");
        assert_eq!(profile.full_name.as_deref(), Some("Depois"));
    }
}
