//! Letter templates: a saved form and code selection that new letters start from.

use super::shared::RecordRepository;
use crate::config::CoreConfig;
use crate::error::LaudoResult;
use crate::form::ReportDraft;
use crate::records::TemplateRecord;
use crate::report::template_description;
use crate::NonEmptyText;
use crate::ShardableUuid;
use chrono::{Local, Utc};
use laudo_types::non_blank;
use std::sync::Arc;

/// Service for a user's templates.
#[derive(Clone, Debug)]
pub struct TemplateService {
    repo: RecordRepository<TemplateRecord>,
}

impl TemplateService {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self {
            repo: RecordRepository::new(&cfg),
        }
    }

    /// Saves `draft` as a template named `name`.
    ///
    /// Without a description, `"Template criado em DD/MM/YYYY"` is used.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LaudoError::Text`] when the name is blank.
    pub fn create(
        &self,
        user_id: &ShardableUuid,
        name: &str,
        description: Option<&str>,
        draft: ReportDraft,
    ) -> LaudoResult<TemplateRecord> {
        let name = NonEmptyText::new(name)?;
        let description = non_blank(description)
            .map(str::to_string)
            .unwrap_or_else(|| template_description(Local::now().date_naive()));

        self.repo.create(|id| TemplateRecord {
            id,
            user_id: user_id.clone(),
            name,
            description: Some(description),
            template_data: draft,
            created_at: Utc::now(),
        })
    }

    pub fn get(&self, user_id: &ShardableUuid, id: &ShardableUuid) -> LaudoResult<TemplateRecord> {
        self.repo.read_owned(user_id, id)
    }

    /// The user's templates, newest first.
    pub fn list(&self, user_id: &ShardableUuid) -> Vec<TemplateRecord> {
        let mut templates = self.repo.list_owned(user_id);
        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        templates
    }

    pub fn delete(&self, user_id: &ShardableUuid, id: &ShardableUuid) -> LaudoResult<()> {
        self.repo.read_owned(user_id, id)?;
        self.repo.delete(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::CodeEntry;
    use crate::error::LaudoError;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> TemplateService {
        let cfg = CoreConfig::new(dir.path().to_path_buf(), None, None).expect("cfg");
        TemplateService::new(Arc::new(cfg))
    }

    fn draft() -> ReportDraft {
        ReportDraft {
            cid_codes: vec![CodeEntry::new("M17.1", "M17.1 - Gonartrose")],
            ..ReportDraft::default()
        }
    }

    #[test]
    fn create_with_default_description() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let user = ShardableUuid::new();

        let template = svc.create(&user, " Joelho ", None, draft()).expect("create");
        assert_eq!(template.name.as_str(), "Joelho");
        assert!(template
            .description
            .as_deref()
            .is_some_and(|d| d.starts_with("Template criado em ")));
        assert_eq!(svc.get(&user, &template.id).unwrap().template_data, draft());
    }

    #[test]
    fn blank_name_is_rejected() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let err = svc
            .create(&ShardableUuid::new(), "   ", None, draft())
            .expect_err("blank name");
        assert!(matches!(err, LaudoError::Text(_)));
    }

    #[test]
    fn list_newest_first() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let user = ShardableUuid::new();

        let first = svc.create(&user, "Primeiro", Some("a"), draft()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = svc.create(&user, "Segundo", Some("b"), draft()).unwrap();

        let ids: Vec<ShardableUuid> = svc.list(&user).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn delete_is_scoped_to_owner() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let owner = ShardableUuid::new();
        let template = svc.create(&owner, "Joelho", None, draft()).unwrap();

        let err = svc
            .delete(&ShardableUuid::new(), &template.id)
            .expect_err("not owner");
        assert!(matches!(err, LaudoError::NotFound { .. }));

        svc.delete(&owner, &template.id).expect("delete");
        assert!(svc.list(&owner).is_empty());
    }
}
