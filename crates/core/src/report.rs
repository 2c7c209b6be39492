//! Rendering of the authorization-request letter.
//!
//! The letter is a pure function of its inputs: the same form, codes, age, profile and date
//! always produce the same bytes. "Today" is held by [`ReportBuilder`] so callers and tests can
//! fix it.
//!
//! Letter layout:
//!
//! ```text
//! 17 de maio de 2025
//!
//! SOLICITAÇÃO DE AUTORIZAÇÃO PARA PROCEDIMENTO MÉDICO
//!
//! IDENTIFICAÇÃO DO PACIENTE:
//! Nome: ...
//! Data de Nascimento: DD/MM/YYYY        (optional lines, no gaps)
//! ...
//!
//! DIAGNÓSTICO(S):
//! CID: <description>
//!
//! PROCEDIMENTO(S) SOLICITADO(S):
//! TUSS: <description>
//!
//! JUSTIFICATIVA CLÍNICA:                 (optional)
//! MATERIAIS NECESSÁRIOS:                 (optional)
//!
//! Atenciosamente,
//! <doctor>
//! CRM: <number>/<state>
//! RQE: <rqe>                             (optional)
//! ```

use crate::codes::{CodeEntry, CodeKind};
use crate::constants::{
    CRM_PLACEHOLDER, DOCTOR_NAME_PLACEHOLDER, MONTHS_PT_BR, REPORT_TITLE, UNNAMED_PATIENT,
};
use crate::error::{LaudoError, LaudoResult};
use crate::form::{DoctorProfile, PatientFormData, ReportForm};
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime};
use laudo_types::non_blank;

/// Anchors a calendar date at 12:00.
///
/// Dates typed into the form carry no time. Reading calendar fields from a midday instant
/// keeps the day stable whatever offset is later applied to it.
pub fn pin_to_noon(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default())
}

/// Parses a form date (`YYYY-MM-DD`).
pub fn parse_form_date(text: &str) -> LaudoResult<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|e| LaudoError::InvalidInput(format!("invalid date '{}': {}", text, e)))
}

/// Whole years between `birth_date` and `today`.
///
/// One year is taken off when today's month/day falls before the birthday in the current
/// year.
pub fn compute_age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let birth = pin_to_noon(birth_date);
    let today = pin_to_noon(today);

    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

/// [`compute_age_on`] against the local calendar date.
pub fn compute_age(birth_date: NaiveDate) -> i32 {
    compute_age_on(birth_date, Local::now().date_naive())
}

/// `"DD de <mês> de YYYY"`, e.g. `"05 de março de 2024"`.
pub fn format_date_extensive(date: NaiveDate) -> String {
    let date = pin_to_noon(date);
    let month = MONTHS_PT_BR[date.month0() as usize];
    format!("{:02} de {} de {}", date.day(), month, date.year())
}

/// `"DD/MM/YYYY"`.
pub fn format_date_br(date: NaiveDate) -> String {
    pin_to_noon(date).format("%d/%m/%Y").to_string()
}

/// Name given to a saved report: `"<patient> - DD/MM/YYYY"`.
pub fn report_name(patient_name: &str, report_date: NaiveDate) -> String {
    let patient = non_blank(Some(patient_name)).unwrap_or(UNNAMED_PATIENT);
    format!("{} - {}", patient, format_date_br(report_date))
}

/// [`report_name`] with the save time appended, used when saving a copy: `"... (HH:MM)"`.
pub fn timestamped_report_name(patient_name: &str, report_date: NaiveDate, at: NaiveTime) -> String {
    format!(
        "{} ({})",
        report_name(patient_name, report_date),
        at.format("%H:%M")
    )
}

/// Default description of a template saved from the form.
pub fn template_description(created_on: NaiveDate) -> String {
    format!("Template criado em {}", format_date_br(created_on))
}

/// Renders letters against a fixed "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportBuilder {
    today: NaiveDate,
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportBuilder {
    /// Uses the local calendar date as today.
    pub fn new() -> Self {
        Self::with_today(Local::now().date_naive())
    }

    pub fn with_today(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn age_of(&self, birth_date: NaiveDate) -> i32 {
        compute_age_on(birth_date, self.today)
    }

    /// Renders the letter.
    ///
    /// `cid_codes` and `tuss_codes` are printed one per line in the order given. `age` is
    /// printed only together with a birth date. Missing profile fields become blank
    /// signature lines.
    pub fn render(
        &self,
        form: &ReportForm,
        cid_codes: &[CodeEntry],
        tuss_codes: &[CodeEntry],
        age: Option<i32>,
        profile: Option<&DoctorProfile>,
    ) -> String {
        let report_date = format_date_extensive(form.report_date.unwrap_or(self.today));
        let patient_info = patient_lines(&form.patient, age).join("\n");
        let cid_list = code_lines(CodeKind::Cid, cid_codes);
        let tuss_list = code_lines(CodeKind::Tuss, tuss_codes);

        let clinical_section = optional_section("JUSTIFICATIVA CLÍNICA", form.clinical_summary.as_deref());
        let materials_section = optional_section("MATERIAIS NECESSÁRIOS", form.materials.as_deref());

        format!(
            "{report_date}\n\n{REPORT_TITLE}\n\nIDENTIFICAÇÃO DO PACIENTE:\n{patient_info}\n\n\
             DIAGNÓSTICO(S):\n{cid_list}\n\nPROCEDIMENTO(S) SOLICITADO(S):\n{tuss_list}\
             {clinical_section}{materials_section}\n\nAtenciosamente,\n{signature}",
            signature = signature_block(profile),
        )
    }
}

/// [`ReportBuilder::render`] with today's local date.
pub fn render_report(
    form: &ReportForm,
    cid_codes: &[CodeEntry],
    tuss_codes: &[CodeEntry],
    age: Option<i32>,
    profile: Option<&DoctorProfile>,
) -> String {
    ReportBuilder::new().render(form, cid_codes, tuss_codes, age, profile)
}

fn patient_lines(patient: &PatientFormData, age: Option<i32>) -> Vec<String> {
    let mut lines = vec![format!("Nome: {}", patient.name.trim())];

    if let Some(birth_date) = patient.birth_date {
        lines.push(format!("Data de Nascimento: {}", format_date_br(birth_date)));
        if let Some(age) = age {
            lines.push(format!("Idade: {} anos", age));
        }
    }

    let optional = [
        ("CPF", &patient.cpf),
        ("Telefone", &patient.phone),
        ("Número do Atendimento", &patient.care_number),
        ("Convênio", &patient.insurance_provider),
        ("Número da Carteirinha", &patient.insurance_number),
    ];
    for (label, value) in optional {
        if let Some(value) = non_blank(value.as_deref()) {
            lines.push(format!("{}: {}", label, value));
        }
    }

    lines
}

fn code_lines(kind: CodeKind, codes: &[CodeEntry]) -> String {
    codes
        .iter()
        .map(|code| format!("{}: {}", kind.label(), code.description))
        .collect::<Vec<_>>()
        .join("\n")
}

fn optional_section(heading: &str, body: Option<&str>) -> String {
    match non_blank(body) {
        Some(text) => format!("\n\n{}:\n{}", heading, text),
        None => String::new(),
    }
}

fn signature_block(profile: Option<&DoctorProfile>) -> String {
    let blank = DoctorProfile::default();
    let profile = profile.unwrap_or(&blank);

    let doctor_name = non_blank(profile.doctor_name.as_deref()).unwrap_or(DOCTOR_NAME_PLACEHOLDER);

    let crm = match non_blank(profile.crm_number.as_deref()) {
        Some(number) => match non_blank(profile.crm_state.as_deref()) {
            Some(state) => format!("{}/{}", number, state),
            None => number.to_string(),
        },
        None => CRM_PLACEHOLDER.to_string(),
    };

    let mut block = format!("{}\nCRM: {}", doctor_name, crm);
    if let Some(rqe) = non_blank(profile.rqe_number.as_deref()) {
        block.push_str(&format!("\nRQE: {}", rqe));
    }
    block
}
