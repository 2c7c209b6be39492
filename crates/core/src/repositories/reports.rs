//! Generated letters and the dashboard counters built from them.

use super::shared::RecordRepository;
use crate::config::CoreConfig;
use crate::constants::UNNAMED_PATIENT;
use crate::error::LaudoResult;
use crate::form::ReportDraft;
use crate::records::{ReportRecord, TemplateRecord};
use crate::report::{report_name, timestamped_report_name};
use crate::ShardableUuid;
use chrono::{Datelike, Local, NaiveDate, Utc};
use laudo_types::non_blank;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Counters shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub template_count: usize,
    pub report_count: usize,
    /// Reports created since the first day of the current month (local time).
    pub reports_this_month: usize,
}

/// Service for a user's saved letters.
#[derive(Clone, Debug)]
pub struct ReportService {
    reports: RecordRepository<ReportRecord>,
    templates: RecordRepository<TemplateRecord>,
}

impl ReportService {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self {
            reports: RecordRepository::new(&cfg),
            templates: RecordRepository::new(&cfg),
        }
    }

    /// Saves a letter named `"<patient> - DD/MM/YYYY"` after the draft's patient and date.
    pub fn save(
        &self,
        user_id: &ShardableUuid,
        draft: ReportDraft,
        generated_text: String,
    ) -> LaudoResult<ReportRecord> {
        let name = report_name(&draft.form.patient.name, report_date(&draft));
        self.insert(user_id, name, draft, generated_text)
    }

    /// Saves a copy whose name also carries the current time, so repeated saves of the same
    /// patient and date stay distinguishable.
    pub fn save_as_new(
        &self,
        user_id: &ShardableUuid,
        draft: ReportDraft,
        generated_text: String,
    ) -> LaudoResult<ReportRecord> {
        let name = timestamped_report_name(
            &draft.form.patient.name,
            report_date(&draft),
            Local::now().time(),
        );
        self.insert(user_id, name, draft, generated_text)
    }

    /// Replaces the draft and text of a saved letter and renames it after the new patient data.
    pub fn update(
        &self,
        user_id: &ShardableUuid,
        id: &ShardableUuid,
        draft: ReportDraft,
        generated_text: String,
    ) -> LaudoResult<ReportRecord> {
        let existing = self.reports.read_owned(user_id, id)?;

        let updated = ReportRecord {
            name: report_name(&draft.form.patient.name, report_date(&draft)),
            patient_name: patient_name(&draft),
            report_data: draft,
            generated_text,
            updated_at: Utc::now(),
            ..existing
        };
        self.reports.write(&updated)?;
        Ok(updated)
    }

    pub fn get(&self, user_id: &ShardableUuid, id: &ShardableUuid) -> LaudoResult<ReportRecord> {
        self.reports.read_owned(user_id, id)
    }

    /// The user's letters, newest first, optionally only the first `limit`.
    pub fn list(&self, user_id: &ShardableUuid, limit: Option<usize>) -> Vec<ReportRecord> {
        let mut reports = self.reports.list_owned(user_id);
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            reports.truncate(limit);
        }
        reports
    }

    pub fn delete(&self, user_id: &ShardableUuid, id: &ShardableUuid) -> LaudoResult<()> {
        self.reports.read_owned(user_id, id)?;
        self.reports.delete(id)
    }

    /// Dashboard counters as of today's local date.
    pub fn stats(&self, user_id: &ShardableUuid) -> DashboardStats {
        self.stats_on(user_id, Local::now().date_naive())
    }

    pub fn stats_on(&self, user_id: &ShardableUuid, today: NaiveDate) -> DashboardStats {
        let reports = self.reports.list_owned(user_id);
        let month_start = today.with_day(1).unwrap_or(today);

        let reports_this_month = reports
            .iter()
            .filter(|r| r.created_at.with_timezone(&Local).date_naive() >= month_start)
            .count();

        DashboardStats {
            template_count: self.templates.list_owned(user_id).len(),
            report_count: reports.len(),
            reports_this_month,
        }
    }

    fn insert(
        &self,
        user_id: &ShardableUuid,
        name: String,
        draft: ReportDraft,
        generated_text: String,
    ) -> LaudoResult<ReportRecord> {
        let now = Utc::now();
        self.reports.create(|id| ReportRecord {
            id,
            user_id: user_id.clone(),
            name,
            patient_name: patient_name(&draft),
            report_data: draft,
            generated_text,
            created_at: now,
            updated_at: now,
        })
    }
}

fn report_date(draft: &ReportDraft) -> NaiveDate {
    draft
        .form
        .report_date
        .unwrap_or_else(|| Local::now().date_naive())
}

fn patient_name(draft: &ReportDraft) -> String {
    non_blank(Some(&draft.form.patient.name))
        .unwrap_or(UNNAMED_PATIENT)
        .to_string()
}
