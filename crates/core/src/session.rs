//! Editing state of one letter.
//!
//! A [`ReportSession`] holds the form and the two slot lists while a letter is being put
//! together, and turns them into text on request. Templates and saved reports are replayed
//! into it with [`ReportSession::load_draft`] and snapshotted with [`ReportSession::draft`].

use crate::autocomplete::CodeSlots;
use crate::codes::{CodeEntry, CodeKind};
use crate::error::{LaudoError, LaudoResult};
use crate::form::{DoctorProfile, ReportDraft, ReportForm};
use crate::records::PatientRecord;
use crate::report::ReportBuilder;
use crate::validation::validate_cpf;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSession {
    pub form: ReportForm,
    cid: CodeSlots,
    tuss: CodeSlots,
}

impl ReportSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a saved draft.
    pub fn from_draft(draft: ReportDraft) -> Self {
        let mut session = Self::new();
        session.load_draft(draft);
        session
    }

    pub fn slots(&self, kind: CodeKind) -> &CodeSlots {
        match kind {
            CodeKind::Cid => &self.cid,
            CodeKind::Tuss => &self.tuss,
        }
    }

    /// Records a committed suggestion in slot `slot` of the `kind` list.
    ///
    /// Returns the index of the slot opened as a result, if any.
    pub fn commit(&mut self, kind: CodeKind, slot: usize, entry: CodeEntry) -> LaudoResult<Option<usize>> {
        let slots = match kind {
            CodeKind::Cid => &mut self.cid,
            CodeKind::Tuss => &mut self.tuss,
        };
        slots.select(slot, entry)
    }

    /// Replaces the whole state with a saved draft.
    pub fn load_draft(&mut self, draft: ReportDraft) {
        self.form = draft.form;
        self.cid = CodeSlots::restore(draft.cid_codes);
        self.tuss = CodeSlots::restore(draft.tuss_codes);
    }

    /// Snapshot of the current state for saving.
    pub fn draft(&self) -> ReportDraft {
        ReportDraft {
            form: self.form.clone(),
            cid_codes: self.cid.to_vec(),
            tuss_codes: self.tuss.to_vec(),
        }
    }

    /// Copies a saved patient into the form, replacing the patient fields.
    pub fn fill_patient(&mut self, patient: &PatientRecord) {
        self.form.patient = patient.to_form_data();
    }

    /// True when either list has nothing selected. Generating anyway is allowed.
    pub fn missing_codes(&self) -> bool {
        !self.cid.has_selection() || !self.tuss.has_selection()
    }

    /// Renders the letter.
    ///
    /// # Errors
    ///
    /// Returns [`LaudoError::InvalidCpf`] when a CPF was typed and fails its check digits.
    pub fn generate(&self, builder: &ReportBuilder, profile: Option<&DoctorProfile>) -> LaudoResult<String> {
        if let Some(cpf) = self.form.patient.cpf() {
            if !validate_cpf(cpf) {
                return Err(LaudoError::InvalidCpf);
            }
        }

        let age = self.form.patient.birth_date.map(|birth| builder.age_of(birth));
        let cid = self.cid.to_vec();
        let tuss = self.tuss.to_vec();

        let text = builder.render(&self.form, &cid, &tuss, age, profile);
        tracing::debug!(
            "generated letter with {} CID and {} TUSS codes",
            cid.len(),
            tuss.len()
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::PatientFormData;
    use crate::ShardableUuid;
    use crate::NonEmptyText;
    use chrono::{NaiveDate, Utc};

    fn builder() -> ReportBuilder {
        ReportBuilder::with_today(NaiveDate::from_ymd_opt(2025, 5, 17).unwrap())
    }

    fn cid(code: &str) -> CodeEntry {
        CodeEntry::new(code, format!("{code} - descrição"))
    }

    #[test]
    fn commit_grows_slots_per_list() {
        let mut session = ReportSession::new();
        assert_eq!(session.commit(CodeKind::Cid, 0, cid("A00")).unwrap(), Some(1));
        assert_eq!(session.commit(CodeKind::Cid, 1, cid("B00")).unwrap(), Some(2));

        assert_eq!(session.slots(CodeKind::Cid).len(), 3);
        assert_eq!(session.slots(CodeKind::Tuss).len(), 1);
        assert!(session.missing_codes());

        session.commit(CodeKind::Tuss, 0, cid("30727138")).unwrap();
        assert!(!session.missing_codes());
    }

    #[test]
    fn draft_round_trips_through_load() {
        let mut session = ReportSession::new();
        session.form.patient = PatientFormData::named("Maria");
        session.commit(CodeKind::Cid, 0, cid("A00")).unwrap();
        session.commit(CodeKind::Tuss, 0, cid("30727138")).unwrap();

        let restored = ReportSession::from_draft(session.draft());
        assert_eq!(restored.draft(), session.draft());
        assert_eq!(restored.slots(CodeKind::Cid).len(), 2);
    }

    #[test]
    fn generate_rejects_invalid_cpf() {
        let mut session = ReportSession::new();
        session.form.patient = PatientFormData {
            name: "Maria".into(),
            cpf: Some("529.982.247-26".into()),
            ..PatientFormData::default()
        };

        let err = session.generate(&builder(), None).expect_err("bad cpf");
        assert!(matches!(err, LaudoError::InvalidCpf));
        assert_eq!(err.to_string(), "CPF informado é inválido");
    }

    #[test]
    fn generate_ignores_blank_cpf_and_computes_age() {
        let mut session = ReportSession::new();
        session.form.patient = PatientFormData {
            name: "Maria".into(),
            birth_date: NaiveDate::from_ymd_opt(1980, 5, 18),
            cpf: Some("  ".into()),
            ..PatientFormData::default()
        };

        let text = session.generate(&builder(), None).expect("generate");
        assert!(text.contains("Data de Nascimento: 18/05/1980\nIdade: 44 anos\n"));
        assert!(!text.contains("CPF"));
    }

    #[test]
    fn generate_lists_codes_in_slot_order() {
        let mut session = ReportSession::new();
        session.commit(CodeKind::Cid, 0, cid("A00")).unwrap();
        session.commit(CodeKind::Cid, 1, cid("B00")).unwrap();
        session.commit(CodeKind::Cid, 0, cid("C00")).unwrap();

        let text = session.generate(&builder(), None).expect("generate");
        assert!(text.contains("CID: C00 - descrição\nCID: B00 - descrição\n"));
    }

    #[test]
    fn fill_patient_copies_care_number() {
        let patient = PatientRecord {
            id: ShardableUuid::new(),
            user_id: ShardableUuid::new(),
            name: NonEmptyText::new("João").unwrap(),
            date_of_birth: None,
            cpf: None,
            phone: Some("(11) 98765-4321".into()),
            insurance_provider: None,
            insurance_number: None,
            default_care_number: Some("AT-3".into()),
            created_at: Utc::now(),
        };

        let mut session = ReportSession::new();
        session.form.clinical_summary = Some("kept".into());
        session.fill_patient(&patient);

        assert_eq!(session.form.patient.name, "João");
        assert_eq!(session.form.patient.care_number.as_deref(), Some("AT-3"));
        assert_eq!(session.form.clinical_summary.as_deref(), Some("kept"));
    }
}
