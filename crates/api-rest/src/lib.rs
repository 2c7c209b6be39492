//! # API REST
//!
//! REST API for Laudo.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON bodies, status codes, CORS)
//!
//! Every handler is a thin wrapper over `laudo-core`; no letter or storage logic lives here.
//! There is no authentication: the owning user is the `user_id` path segment.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use laudo_core::{
    validation::{check_cpf_input, format_cpf, format_phone, format_profile_number, CpfCheck},
    CodeKind, CodeLists, CoreConfig, DashboardStats, DoctorProfile, LaudoError, PatientInput,
    PatientRecord, PatientService, ProfileInput, ProfileRecord, ProfileService, ReportBuilder,
    ReportDraft, ReportRecord, ReportService, ReportSession, ShardableUuid, TemplateRecord,
    TemplateService,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    codes: CodeLists,
    patients: Arc<PatientService>,
    templates: Arc<TemplateService>,
    reports: Arc<ReportService>,
    profiles: Arc<ProfileService>,
}

impl AppState {
    pub fn new(cfg: Arc<CoreConfig>, codes: CodeLists) -> Self {
        Self {
            codes,
            patients: Arc::new(PatientService::new(cfg.clone())),
            templates: Arc::new(TemplateService::new(cfg.clone())),
            reports: Arc::new(ReportService::new(cfg.clone())),
            profiles: Arc::new(ProfileService::new(cfg)),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        check_cpf,
        format_phone_number,
        format_registration_number,
        search_codes,
        render_report,
        list_patients,
        create_patient,
        get_patient,
        update_patient,
        list_templates,
        create_template,
        get_template,
        delete_template,
        list_reports,
        save_report,
        get_report,
        update_report,
        delete_report,
        get_profile,
        put_profile,
        get_stats,
    ),
    components(schemas(
        HealthRes,
        CpfCheckReq,
        CpfCheckRes,
        CpfStatus,
        FormatReq,
        FormatRes,
        CodeMatch,
        CodeSearchRes,
        RenderReq,
        RenderRes,
        PatientReq,
        PatientRes,
        PatientListRes,
        CreateTemplateReq,
        TemplateRes,
        TemplateListRes,
        SaveReportReq,
        UpdateReportReq,
        ReportRes,
        ReportListRes,
        ProfileReq,
        ProfileRes,
        StatsRes,
    ))
)]
pub struct ApiDoc;

/// Builds the full router: API routes, Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/cpf/check", post(check_cpf))
        .route("/format/phone", post(format_phone_number))
        .route("/format/profile-number", post(format_registration_number))
        .route("/codes/:kind/search", get(search_codes))
        .route("/reports/render", post(render_report))
        .route(
            "/users/:user_id/patients",
            get(list_patients).post(create_patient),
        )
        .route(
            "/users/:user_id/patients/:id",
            get(get_patient).put(update_patient),
        )
        .route(
            "/users/:user_id/templates",
            get(list_templates).post(create_template),
        )
        .route(
            "/users/:user_id/templates/:id",
            get(get_template).delete(delete_template),
        )
        .route(
            "/users/:user_id/reports",
            get(list_reports).post(save_report),
        )
        .route(
            "/users/:user_id/reports/:id",
            get(get_report).put(update_report).delete(delete_report),
        )
        .route("/users/:user_id/profile", get(get_profile).put(put_profile))
        .route("/users/:user_id/stats", get(get_stats))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// ERRORS
// ============================================================================

type ApiError = (StatusCode, String);
type ApiResult<T> = Result<T, ApiError>;

/// Maps a core error to a status code. Server-side failures are logged and not echoed.
fn api_error(context: &str, err: LaudoError) -> ApiError {
    match err {
        LaudoError::InvalidInput(_)
        | LaudoError::InvalidCpf
        | LaudoError::SlotOutOfRange { .. }
        | LaudoError::Uuid(_)
        | LaudoError::Text(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        LaudoError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        other => {
            tracing::error!("{} error: {:?}", context, other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
        }
    }
}

fn parse_id(raw: &str) -> ApiResult<ShardableUuid> {
    ShardableUuid::parse(raw).map_err(|e| api_error("parse id", e.into()))
}

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CpfCheckReq {
    pub cpf: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CpfStatus {
    Incomplete,
    Valid,
    Invalid,
}

impl From<CpfCheck> for CpfStatus {
    fn from(check: CpfCheck) -> Self {
        match check {
            CpfCheck::Incomplete => CpfStatus::Incomplete,
            CpfCheck::Valid => CpfStatus::Valid,
            CpfCheck::Invalid => CpfStatus::Invalid,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CpfCheckRes {
    /// Input with the CPF mask applied.
    pub formatted: String,
    pub status: CpfStatus,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FormatReq {
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FormatRes {
    pub formatted: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Text typed so far. Fewer than 2 characters return no matches.
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CodeMatch {
    pub code: String,
    pub description: String,
    pub short_description: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CodeSearchRes {
    pub matches: Vec<CodeMatch>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RenderReq {
    #[schema(value_type = Object)]
    pub draft: ReportDraft,
    /// Signature block to use. When absent and `user_id` is given, the saved profile is used.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub profile: Option<DoctorProfile>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Overrides today's date for age and default letter date.
    #[serde(default)]
    #[schema(value_type = Option<String>, format = Date)]
    pub today: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RenderRes {
    pub text: String,
    /// True when either code list is empty.
    pub missing_codes: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientReq {
    pub name: String,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = Date)]
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

impl From<PatientReq> for PatientInput {
    fn from(req: PatientReq) -> Self {
        Self {
            name: req.name,
            date_of_birth: req.date_of_birth,
            cpf: req.cpf,
            phone: req.phone,
            insurance_provider: req.insurance_provider,
            insurance_number: req.insurance_number,
            default_care_number: req.default_care_number,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientRes {
    #[schema(value_type = Object)]
    pub patient: PatientRecord,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientListRes {
    #[schema(value_type = Vec<Object>)]
    pub patients: Vec<PatientRecord>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateTemplateReq {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[schema(value_type = Object)]
    pub draft: ReportDraft,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TemplateRes {
    #[schema(value_type = Object)]
    pub template: TemplateRecord,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TemplateListRes {
    #[schema(value_type = Vec<Object>)]
    pub templates: Vec<TemplateRecord>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportListQuery {
    /// Return only the newest `limit` reports.
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SaveReportReq {
    #[schema(value_type = Object)]
    pub draft: ReportDraft,
    pub generated_text: String,
    /// Save as a separate copy with the current time in its name.
    #[serde(default)]
    pub as_new: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateReportReq {
    #[schema(value_type = Object)]
    pub draft: ReportDraft,
    pub generated_text: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReportRes {
    #[schema(value_type = Object)]
    pub report: ReportRecord,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReportListRes {
    #[schema(value_type = Vec<Object>)]
    pub reports: Vec<ReportRecord>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ProfileReq {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub doctor_name: Option<String>,
    #[serde(default)]
    pub crm_number: Option<String>,
    #[serde(default)]
    pub crm_state: Option<String>,
    #[serde(default)]
    pub rqe_number: Option<String>,
}

impl From<ProfileReq> for ProfileInput {
    fn from(req: ProfileReq) -> Self {
        Self {
            email: req.email,
            full_name: req.full_name,
            doctor: DoctorProfile {
                doctor_name: req.doctor_name,
                crm_number: req.crm_number,
                crm_state: req.crm_state,
                rqe_number: req.rqe_number,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileRes {
    #[schema(value_type = Option<Object>)]
    pub profile: Option<ProfileRecord>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsRes {
    pub template_count: usize,
    pub report_count: usize,
    pub reports_this_month: usize,
}

impl From<DashboardStats> for StatsRes {
    fn from(stats: DashboardStats) -> Self {
        Self {
            template_count: stats.template_count,
            report_count: stats.report_count,
            reports_this_month: stats.reports_this_month,
        }
    }
}

// ============================================================================
// STATELESS HANDLERS
// ============================================================================

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint used by monitoring and load balancers.
#[axum::debug_handler]
async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Laudo REST API is alive".into(),
    })
}

#[utoipa::path(
    post,
    path = "/cpf/check",
    request_body = CpfCheckReq,
    responses(
        (status = 200, description = "Masked CPF and verdict", body = CpfCheckRes)
    )
)]
/// Masks a CPF as typed and reports whether it is complete and valid.
#[axum::debug_handler]
async fn check_cpf(Json(req): Json<CpfCheckReq>) -> Json<CpfCheckRes> {
    Json(CpfCheckRes {
        formatted: format_cpf(&req.cpf),
        status: check_cpf_input(&req.cpf).into(),
    })
}

#[utoipa::path(
    post,
    path = "/format/phone",
    request_body = FormatReq,
    responses(
        (status = 200, description = "Formatted phone number", body = FormatRes)
    )
)]
/// Formats a phone number as typed.
#[axum::debug_handler]
async fn format_phone_number(Json(req): Json<FormatReq>) -> Json<FormatRes> {
    Json(FormatRes {
        formatted: format_phone(&req.value),
    })
}

#[utoipa::path(
    post,
    path = "/format/profile-number",
    request_body = FormatReq,
    responses(
        (status = 200, description = "Formatted CRM/RQE number", body = FormatRes)
    )
)]
/// Formats a CRM or RQE number as typed.
#[axum::debug_handler]
async fn format_registration_number(Json(req): Json<FormatReq>) -> Json<FormatRes> {
    Json(FormatRes {
        formatted: format_profile_number(&req.value),
    })
}

#[utoipa::path(
    get,
    path = "/codes/{kind}/search",
    params(
        ("kind" = String, Path, description = "Reference list: `cid` or `tuss`"),
        SearchQuery
    ),
    responses(
        (status = 200, description = "Up to 10 matches in list order", body = CodeSearchRes),
        (status = 400, description = "Unknown list")
    )
)]
/// Autocomplete suggestions for a CID or TUSS field.
#[axum::debug_handler]
async fn search_codes(
    State(state): State<AppState>,
    AxumPath(kind): AxumPath<String>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<CodeSearchRes>> {
    let kind: CodeKind = kind.parse().map_err(|e| api_error("search codes", e))?;
    let q = query.q.unwrap_or_default();

    let matches = state
        .codes
        .get(kind)
        .search(&q)
        .into_iter()
        .map(|entry| CodeMatch {
            code: entry.code.clone(),
            description: entry.description.clone(),
            short_description: entry.short_description().to_string(),
        })
        .collect();

    Ok(Json(CodeSearchRes { matches }))
}

#[utoipa::path(
    post,
    path = "/reports/render",
    request_body = RenderReq,
    responses(
        (status = 200, description = "Rendered letter", body = RenderRes),
        (status = 400, description = "Invalid CPF or user id")
    )
)]
/// Renders a letter from a draft without saving anything.
#[axum::debug_handler]
async fn render_report(
    State(state): State<AppState>,
    Json(req): Json<RenderReq>,
) -> ApiResult<Json<RenderRes>> {
    let profile = match (req.profile, req.user_id.as_deref()) {
        (Some(profile), _) => Some(profile),
        (None, Some(user_id)) => {
            let user_id = parse_id(user_id)?;
            state
                .profiles
                .get(&user_id)
                .map_err(|e| api_error("load profile", e))?
                .map(|record| record.doctor)
        }
        (None, None) => None,
    };

    let builder = req
        .today
        .map(ReportBuilder::with_today)
        .unwrap_or_default();
    let session = ReportSession::from_draft(req.draft);
    let text = session
        .generate(&builder, profile.as_ref())
        .map_err(|e| api_error("render report", e))?;

    Ok(Json(RenderRes {
        text,
        missing_codes: session.missing_codes(),
    }))
}

// ============================================================================
// PATIENTS
// ============================================================================

#[utoipa::path(
    get,
    path = "/users/{user_id}/patients",
    params(("user_id" = String, Path, description = "Owning user"), SearchQuery),
    responses(
        (status = 200, description = "Patients ordered by name", body = PatientListRes),
        (status = 400, description = "Invalid user id")
    )
)]
/// Lists the user's patients, filtered by name or CPF when `q` is given.
#[axum::debug_handler]
async fn list_patients(
    State(state): State<AppState>,
    AxumPath(user_id): AxumPath<String>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<PatientListRes>> {
    let user_id = parse_id(&user_id)?;
    let patients = match query.q.as_deref() {
        Some(q) => state.patients.search(&user_id, q),
        None => state.patients.list(&user_id),
    };
    Ok(Json(PatientListRes { patients }))
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/patients",
    params(("user_id" = String, Path, description = "Owning user")),
    request_body = PatientReq,
    responses(
        (status = 201, description = "Patient created", body = PatientRes),
        (status = 400, description = "Blank name or invalid CPF"),
        (status = 500, description = "Internal server error")
    )
)]
/// Creates a patient for the user
///
/// The name is trimmed and a non-blank CPF must pass the check-digit test. Blank optional
/// fields are stored as absent.
///
/// # Returns
/// * `201 Created` with the stored patient
///
/// # Errors
/// Returns `400 Bad Request` if:
/// - the user id is not canonical,
/// - the name is blank, or
/// - the CPF is invalid.
///
/// Returns `500 Internal Server Error` if the record cannot be written.
#[axum::debug_handler]
async fn create_patient(
    State(state): State<AppState>,
    AxumPath(user_id): AxumPath<String>,
    Json(req): Json<PatientReq>,
) -> ApiResult<(StatusCode, Json<PatientRes>)> {
    let user_id = parse_id(&user_id)?;
    let input = PatientInput::from(req);
    let patient = state
        .patients
        .create(&user_id, &input)
        .map_err(|e| api_error("create patient", e))?;
    Ok((StatusCode::CREATED, Json(PatientRes { patient })))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/patients/{id}",
    params(
        ("user_id" = String, Path, description = "Owning user"),
        ("id" = String, Path, description = "Patient id")
    ),
    responses(
        (status = 200, description = "Patient", body = PatientRes),
        (status = 404, description = "Not found")
    )
)]
/// Fetches one of the user's patients.
#[axum::debug_handler]
async fn get_patient(
    State(state): State<AppState>,
    AxumPath((user_id, id)): AxumPath<(String, String)>,
) -> ApiResult<Json<PatientRes>> {
    let (user_id, id) = (parse_id(&user_id)?, parse_id(&id)?);
    let patient = state
        .patients
        .get(&user_id, &id)
        .map_err(|e| api_error("get patient", e))?;
    Ok(Json(PatientRes { patient }))
}

#[utoipa::path(
    put,
    path = "/users/{user_id}/patients/{id}",
    params(
        ("user_id" = String, Path, description = "Owning user"),
        ("id" = String, Path, description = "Patient id")
    ),
    request_body = PatientReq,
    responses(
        (status = 200, description = "Patient updated", body = PatientRes),
        (status = 400, description = "Blank name or invalid CPF"),
        (status = 404, description = "Not found")
    )
)]
/// Replaces a patient's fields, keeping its id and creation time
///
/// # Errors
/// Returns `400 Bad Request` for a non-canonical id, a blank name or an invalid CPF.
/// Returns `404 Not Found` if the patient does not exist or belongs to another user.
/// Returns `500 Internal Server Error` if the record cannot be written.
#[axum::debug_handler]
async fn update_patient(
    State(state): State<AppState>,
    AxumPath((user_id, id)): AxumPath<(String, String)>,
    Json(req): Json<PatientReq>,
) -> ApiResult<Json<PatientRes>> {
    let (user_id, id) = (parse_id(&user_id)?, parse_id(&id)?);
    let input = PatientInput::from(req);
    let patient = state
        .patients
        .update(&user_id, &id, &input)
        .map_err(|e| api_error("update patient", e))?;
    Ok(Json(PatientRes { patient }))
}

// ============================================================================
// TEMPLATES
// ============================================================================

#[utoipa::path(
    get,
    path = "/users/{user_id}/templates",
    params(("user_id" = String, Path, description = "Owning user")),
    responses(
        (status = 200, description = "Templates, newest first", body = TemplateListRes),
        (status = 400, description = "Invalid user id")
    )
)]
/// Lists the user's templates, newest first.
#[axum::debug_handler]
async fn list_templates(
    State(state): State<AppState>,
    AxumPath(user_id): AxumPath<String>,
) -> ApiResult<Json<TemplateListRes>> {
    let user_id = parse_id(&user_id)?;
    Ok(Json(TemplateListRes {
        templates: state.templates.list(&user_id),
    }))
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/templates",
    params(("user_id" = String, Path, description = "Owning user")),
    request_body = CreateTemplateReq,
    responses(
        (status = 201, description = "Template created", body = TemplateRes),
        (status = 400, description = "Blank name")
    )
)]
/// Saves the current form and code selections as a template
///
/// When no description is given one is derived from today's date.
///
/// # Errors
/// Returns `400 Bad Request` if the user id is not canonical or the name is blank.
/// Returns `500 Internal Server Error` if the record cannot be written.
#[axum::debug_handler]
async fn create_template(
    State(state): State<AppState>,
    AxumPath(user_id): AxumPath<String>,
    Json(req): Json<CreateTemplateReq>,
) -> ApiResult<(StatusCode, Json<TemplateRes>)> {
    let user_id = parse_id(&user_id)?;
    let template = state
        .templates
        .create(&user_id, &req.name, req.description.as_deref(), req.draft)
        .map_err(|e| api_error("create template", e))?;
    Ok((StatusCode::CREATED, Json(TemplateRes { template })))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/templates/{id}",
    params(
        ("user_id" = String, Path, description = "Owning user"),
        ("id" = String, Path, description = "Template id")
    ),
    responses(
        (status = 200, description = "Template", body = TemplateRes),
        (status = 404, description = "Not found")
    )
)]
/// Fetches a template to load into the form.
#[axum::debug_handler]
async fn get_template(
    State(state): State<AppState>,
    AxumPath((user_id, id)): AxumPath<(String, String)>,
) -> ApiResult<Json<TemplateRes>> {
    let (user_id, id) = (parse_id(&user_id)?, parse_id(&id)?);
    let template = state
        .templates
        .get(&user_id, &id)
        .map_err(|e| api_error("get template", e))?;
    Ok(Json(TemplateRes { template }))
}

#[utoipa::path(
    delete,
    path = "/users/{user_id}/templates/{id}",
    params(
        ("user_id" = String, Path, description = "Owning user"),
        ("id" = String, Path, description = "Template id")
    ),
    responses(
        (status = 204, description = "Template deleted"),
        (status = 404, description = "Not found")
    )
)]
/// Deletes a template
///
/// # Errors
/// Returns `404 Not Found` if the template does not exist or belongs to another user.
/// Returns `500 Internal Server Error` if the record directory cannot be removed.
#[axum::debug_handler]
async fn delete_template(
    State(state): State<AppState>,
    AxumPath((user_id, id)): AxumPath<(String, String)>,
) -> ApiResult<StatusCode> {
    let (user_id, id) = (parse_id(&user_id)?, parse_id(&id)?);
    state
        .templates
        .delete(&user_id, &id)
        .map_err(|e| api_error("delete template", e))?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// REPORTS
// ============================================================================

#[utoipa::path(
    get,
    path = "/users/{user_id}/reports",
    params(("user_id" = String, Path, description = "Owning user"), ReportListQuery),
    responses(
        (status = 200, description = "Reports, newest first", body = ReportListRes),
        (status = 400, description = "Invalid user id")
    )
)]
/// Lists saved reports, newest first, optionally capped by `limit`.
#[axum::debug_handler]
async fn list_reports(
    State(state): State<AppState>,
    AxumPath(user_id): AxumPath<String>,
    Query(query): Query<ReportListQuery>,
) -> ApiResult<Json<ReportListRes>> {
    let user_id = parse_id(&user_id)?;
    Ok(Json(ReportListRes {
        reports: state.reports.list(&user_id, query.limit),
    }))
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/reports",
    params(("user_id" = String, Path, description = "Owning user")),
    request_body = SaveReportReq,
    responses(
        (status = 201, description = "Report saved", body = ReportRes),
        (status = 400, description = "Invalid user id")
    )
)]
/// Saves a generated letter, named after the patient and date
///
/// With `as_new` the save time is appended to the name so the copy can be told apart.
///
/// # Errors
/// Returns `400 Bad Request` if the user id is not canonical.
/// Returns `500 Internal Server Error` if the record cannot be written.
#[axum::debug_handler]
async fn save_report(
    State(state): State<AppState>,
    AxumPath(user_id): AxumPath<String>,
    Json(req): Json<SaveReportReq>,
) -> ApiResult<(StatusCode, Json<ReportRes>)> {
    let user_id = parse_id(&user_id)?;
    let saved = if req.as_new {
        state
            .reports
            .save_as_new(&user_id, req.draft, req.generated_text)
    } else {
        state.reports.save(&user_id, req.draft, req.generated_text)
    };
    let report = saved.map_err(|e| api_error("save report", e))?;
    Ok((StatusCode::CREATED, Json(ReportRes { report })))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/reports/{id}",
    params(
        ("user_id" = String, Path, description = "Owning user"),
        ("id" = String, Path, description = "Report id")
    ),
    responses(
        (status = 200, description = "Report", body = ReportRes),
        (status = 404, description = "Not found")
    )
)]
/// Fetches a saved report with its draft and generated text.
#[axum::debug_handler]
async fn get_report(
    State(state): State<AppState>,
    AxumPath((user_id, id)): AxumPath<(String, String)>,
) -> ApiResult<Json<ReportRes>> {
    let (user_id, id) = (parse_id(&user_id)?, parse_id(&id)?);
    let report = state
        .reports
        .get(&user_id, &id)
        .map_err(|e| api_error("get report", e))?;
    Ok(Json(ReportRes { report }))
}

#[utoipa::path(
    put,
    path = "/users/{user_id}/reports/{id}",
    params(
        ("user_id" = String, Path, description = "Owning user"),
        ("id" = String, Path, description = "Report id")
    ),
    request_body = UpdateReportReq,
    responses(
        (status = 200, description = "Report updated", body = ReportRes),
        (status = 404, description = "Not found")
    )
)]
/// Overwrites a saved report with a new draft and text
///
/// The report is renamed after the draft's patient and date.
///
/// # Errors
/// Returns `400 Bad Request` for a non-canonical id.
/// Returns `404 Not Found` if the report does not exist or belongs to another user.
/// Returns `500 Internal Server Error` if the record cannot be written.
#[axum::debug_handler]
async fn update_report(
    State(state): State<AppState>,
    AxumPath((user_id, id)): AxumPath<(String, String)>,
    Json(req): Json<UpdateReportReq>,
) -> ApiResult<Json<ReportRes>> {
    let (user_id, id) = (parse_id(&user_id)?, parse_id(&id)?);
    let report = state
        .reports
        .update(&user_id, &id, req.draft, req.generated_text)
        .map_err(|e| api_error("update report", e))?;
    Ok(Json(ReportRes { report }))
}

#[utoipa::path(
    delete,
    path = "/users/{user_id}/reports/{id}",
    params(
        ("user_id" = String, Path, description = "Owning user"),
        ("id" = String, Path, description = "Report id")
    ),
    responses(
        (status = 204, description = "Report deleted"),
        (status = 404, description = "Not found")
    )
)]
/// Deletes a saved report
///
/// # Errors
/// Returns `404 Not Found` if the report does not exist or belongs to another user.
/// Returns `500 Internal Server Error` if the record directory cannot be removed.
#[axum::debug_handler]
async fn delete_report(
    State(state): State<AppState>,
    AxumPath((user_id, id)): AxumPath<(String, String)>,
) -> ApiResult<StatusCode> {
    let (user_id, id) = (parse_id(&user_id)?, parse_id(&id)?);
    state
        .reports
        .delete(&user_id, &id)
        .map_err(|e| api_error("delete report", e))?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// PROFILE & DASHBOARD
// ============================================================================

#[utoipa::path(
    get,
    path = "/users/{user_id}/profile",
    params(("user_id" = String, Path, description = "Owning user")),
    responses(
        (status = 200, description = "Profile, or null when never saved", body = ProfileRes),
        (status = 400, description = "Invalid user id")
    )
)]
/// The user's doctor profile, or `null` before the first save.
#[axum::debug_handler]
async fn get_profile(
    State(state): State<AppState>,
    AxumPath(user_id): AxumPath<String>,
) -> ApiResult<Json<ProfileRes>> {
    let user_id = parse_id(&user_id)?;
    let profile = state
        .profiles
        .get(&user_id)
        .map_err(|e| api_error("get profile", e))?;
    Ok(Json(ProfileRes { profile }))
}

#[utoipa::path(
    put,
    path = "/users/{user_id}/profile",
    params(("user_id" = String, Path, description = "Owning user")),
    request_body = ProfileReq,
    responses(
        (status = 200, description = "Profile saved", body = ProfileRes),
        (status = 400, description = "Invalid user id")
    )
)]
/// Creates or replaces the user's doctor profile
///
/// CRM and RQE numbers are normalised and the CRM state is uppercased before storing.
///
/// # Errors
/// Returns `400 Bad Request` if the user id is not canonical.
/// Returns `500 Internal Server Error` if the record cannot be written.
#[axum::debug_handler]
async fn put_profile(
    State(state): State<AppState>,
    AxumPath(user_id): AxumPath<String>,
    Json(req): Json<ProfileReq>,
) -> ApiResult<Json<ProfileRes>> {
    let user_id = parse_id(&user_id)?;
    let input = ProfileInput::from(req);
    let profile = state
        .profiles
        .upsert(&user_id, &input)
        .map_err(|e| api_error("save profile", e))?;
    Ok(Json(ProfileRes {
        profile: Some(profile),
    }))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/stats",
    params(("user_id" = String, Path, description = "Owning user")),
    responses(
        (status = 200, description = "Dashboard counters", body = StatsRes),
        (status = 400, description = "Invalid user id")
    )
)]
/// Dashboard counters for the user.
#[axum::debug_handler]
async fn get_stats(
    State(state): State<AppState>,
    AxumPath(user_id): AxumPath<String>,
) -> ApiResult<Json<StatsRes>> {
    let user_id = parse_id(&user_id)?;
    Ok(Json(state.reports.stats(&user_id).into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use laudo_core::{CodeEntry, CodeList};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_app(dir: &TempDir) -> Router {
        let cfg = Arc::new(CoreConfig::new(dir.path().to_path_buf(), None, None).expect("cfg"));
        let codes = CodeLists::new(
            CodeList::new(vec![
                CodeEntry::new("M17.1", "M17.1 - Outras gonartroses primárias"),
                CodeEntry::new("M17.9", "M17.9 - Gonartrose não especificada"),
            ]),
            CodeList::new(vec![CodeEntry::new(
                "30727138",
                "30727138 - Artroplastia total do joelho",
            )]),
        );
        router(AppState::new(cfg, codes))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn user() -> String {
        ShardableUuid::new().to_string()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(&test_app(&dir), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn cpf_check_reports_status() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir);

        let (_, body) = send(&app, "POST", "/cpf/check", Some(json!({"cpf": "52998224725"}))).await;
        assert_eq!(body["formatted"], "529.982.247-25");
        assert_eq!(body["status"], "valid");

        let (_, body) = send(&app, "POST", "/cpf/check", Some(json!({"cpf": "5299"}))).await;
        assert_eq!(body["status"], "incomplete");
    }

    #[tokio::test]
    async fn formatters() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir);

        let (_, body) = send(&app, "POST", "/format/phone", Some(json!({"value": "11987654321"}))).await;
        assert_eq!(body["formatted"], "(11) 98765-4321");

        let (_, body) = send(
            &app,
            "POST",
            "/format/profile-number",
            Some(json!({"value": "1234567"})),
        )
        .await;
        assert_eq!(body["formatted"], "123.456");
    }

    #[tokio::test]
    async fn code_search_and_unknown_list() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir);

        let (status, body) = send(&app, "GET", "/codes/cid/search?q=gonartrose", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["matches"].as_array().unwrap().len(), 2);
        assert_eq!(body["matches"][0]["short_description"], "Outras gonartroses primárias");

        let (status, _) = send(&app, "GET", "/codes/icd/search?q=xx", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn render_rejects_invalid_cpf() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir);
        let draft = json!({"form": {"patient": {"name": "Maria", "cpf": "529.982.247-26"}}});

        let (status, body) = send(&app, "POST", "/reports/render", Some(json!({"draft": draft}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn render_uses_saved_profile() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir);
        let user = user();

        let (status, _) = send(
            &app,
            "PUT",
            &format!("/users/{user}/profile"),
            Some(json!({"doctor_name": "Dra. Helena", "crm_number": "123456", "crm_state": "sp"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let req = json!({
            "draft": {
                "form": {"report_date": "2025-05-17", "patient": {"name": "Maria"}},
                "cid_codes": [{"code": "M17.1", "description": "M17.1 - Outras gonartroses primárias"}]
            },
            "user_id": user,
            "today": "2025-05-17"
        });
        let (status, body) = send(&app, "POST", "/reports/render", Some(req)).await;
        assert_eq!(status, StatusCode::OK);
        let text = body["text"].as_str().unwrap();
        assert!(text.starts_with("17 de maio de 2025\n\n"));
        assert!(text.ends_with("Dra. Helena\nCRM: 123.456/SP"));
        assert_eq!(body["missing_codes"], true);
    }

    #[tokio::test]
    async fn patient_lifecycle_and_scoping() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir);
        let owner = user();

        let (status, body) = send(
            &app,
            "POST",
            &format!("/users/{owner}/patients"),
            Some(json!({"name": "Ana Souza", "cpf": "529.982.247-25"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["patient"]["id"].as_str().unwrap().to_string();

        let (status, _) = send(&app, "GET", &format!("/users/{owner}/patients/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, "GET", &format!("/users/{}/patients/{id}", user()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = send(&app, "GET", &format!("/users/{owner}/patients?q=souza"), None).await;
        assert_eq!(body["patients"].as_array().unwrap().len(), 1);

        let (status, _) = send(
            &app,
            "POST",
            &format!("/users/{owner}/patients"),
            Some(json!({"name": "Bad", "cpf": "111.111.111-11"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bad_user_id_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let (status, _) = send(&test_app(&dir), "GET", "/users/not-a-uuid/reports", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn reports_templates_and_stats() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir);
        let owner = user();
        let draft = json!({"form": {"report_date": "2025-05-17", "patient": {"name": "Maria"}}});

        let (status, body) = send(
            &app,
            "POST",
            &format!("/users/{owner}/reports"),
            Some(json!({"draft": draft, "generated_text": "texto"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["report"]["name"], "Maria - 17/05/2025");
        let report_id = body["report"]["id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            "POST",
            &format!("/users/{owner}/templates"),
            Some(json!({"name": "Joelho", "draft": draft})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, stats) = send(&app, "GET", &format!("/users/{owner}/stats"), None).await;
        assert_eq!(stats["template_count"], 1);
        assert_eq!(stats["report_count"], 1);
        assert_eq!(stats["reports_this_month"], 1);

        let (status, _) = send(
            &app,
            "DELETE",
            &format!("/users/{owner}/reports/{report_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(
            &app,
            "GET",
            &format!("/users/{owner}/reports/{report_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn openapi_lists_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/reports/render"));
        assert!(doc.paths.paths.contains_key("/users/{user_id}/reports/{id}"));
    }
}
