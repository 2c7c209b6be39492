use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use laudo_core::{
    report::{format_date_br, parse_form_date},
    validation::{check_cpf_input, format_cpf, format_phone, format_profile_number, CpfCheck},
    CodeKind, CodeLists, CoreConfig, DoctorProfile, PatientService, ProfileService, ReportBuilder,
    ReportDraft, ReportService, ReportSession, ShardableUuid, TemplateService,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "laudo")]
#[command(about = "Authorization-request letter generator CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check and mask a CPF
    Cpf {
        /// CPF, with or without punctuation
        value: String,
    },
    /// Format a phone number
    Phone { value: String },
    /// Format a CRM or RQE number
    ProfileNumber { value: String },
    /// Search a reference list
    Search {
        /// `cid` or `tuss`
        kind: CodeKind,
        /// Text to look for in codes and descriptions
        query: String,
    },
    /// Render a letter from a draft file
    Render {
        /// YAML draft (form, cid_codes, tuss_codes)
        draft: PathBuf,
        /// YAML doctor profile used for the signature
        #[arg(long)]
        profile: Option<PathBuf>,
        /// Use the saved profile of this user when --profile is not given
        #[arg(long)]
        user: Option<ShardableUuid>,
        /// Date to treat as today (YYYY-MM-DD)
        #[arg(long, value_parser = parse_form_date)]
        today: Option<NaiveDate>,
    },
    /// List a user's saved patients
    Patients {
        user: ShardableUuid,
        /// Filter by name or CPF
        #[arg(long)]
        search: Option<String>,
    },
    /// List a user's templates
    Templates { user: ShardableUuid },
    /// List a user's saved reports
    Reports {
        user: ShardableUuid,
        /// Show only the newest N
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show dashboard counters for a user
    Stats { user: ShardableUuid },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("laudo_core=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = Arc::new(CoreConfig::from_env_values(
        std::env::var("LAUDO_DATA_DIR").ok(),
        std::env::var("LAUDO_CID_CODES").ok(),
        std::env::var("LAUDO_TUSS_CODES").ok(),
    )?);

    match cli.command {
        Some(Commands::Cpf { value }) => {
            let verdict = match check_cpf_input(&value) {
                CpfCheck::Valid => "válido",
                CpfCheck::Invalid => "inválido",
                CpfCheck::Incomplete => "incompleto",
            };
            println!("{} ({})", format_cpf(&value), verdict);
        }
        Some(Commands::Phone { value }) => println!("{}", format_phone(&value)),
        Some(Commands::ProfileNumber { value }) => println!("{}", format_profile_number(&value)),
        Some(Commands::Search { kind, query }) => {
            let codes = CodeLists::load(&cfg)?;
            let matches = codes.get(kind).search(&query);
            if matches.is_empty() {
                println!("No codes found.");
            }
            for entry in matches {
                println!("{}\t{}", entry.code, entry.short_description());
            }
        }
        Some(Commands::Render {
            draft,
            profile,
            user,
            today,
        }) => {
            let draft: ReportDraft = read_yaml(&draft)?;
            let profile = match (profile, user) {
                (Some(path), _) => Some(read_yaml::<DoctorProfile>(&path)?),
                (None, Some(user)) => ProfileService::new(cfg.clone())
                    .get(&user)?
                    .map(|record| record.doctor),
                (None, None) => None,
            };

            let builder = today.map(ReportBuilder::with_today).unwrap_or_default();
            let session = ReportSession::from_draft(draft);
            if session.missing_codes() {
                eprintln!("Warning: no CID or TUSS code selected.");
            }
            println!("{}", session.generate(&builder, profile.as_ref())?);
        }
        Some(Commands::Patients { user, search }) => {
            let service = PatientService::new(cfg);
            let patients = match search {
                Some(q) => service.search(&user, &q),
                None => service.list(&user),
            };
            if patients.is_empty() {
                println!("No patients found.");
            }
            for patient in patients {
                println!(
                    "ID: {}, Name: {}, CPF: {}, Born: {}",
                    patient.id,
                    patient.name,
                    patient.cpf.as_deref().unwrap_or("-"),
                    patient
                        .date_of_birth
                        .map(format_date_br)
                        .unwrap_or_else(|| "-".into())
                );
            }
        }
        Some(Commands::Templates { user }) => {
            let templates = TemplateService::new(cfg).list(&user);
            if templates.is_empty() {
                println!("No templates found.");
            }
            for template in templates {
                println!(
                    "ID: {}, Name: {}, Description: {}",
                    template.id,
                    template.name,
                    template.description.as_deref().unwrap_or("")
                );
            }
        }
        Some(Commands::Reports { user, limit }) => {
            let reports = ReportService::new(cfg).list(&user, limit);
            if reports.is_empty() {
                println!("No reports found.");
            }
            for report in reports {
                println!(
                    "ID: {}, Name: {}, Created: {}",
                    report.id,
                    report.name,
                    report.created_at.to_rfc3339()
                );
            }
        }
        Some(Commands::Stats { user }) => {
            let stats = ReportService::new(cfg).stats(&user);
            println!("Templates: {}", stats.template_count);
            println!("Reports: {}", stats.report_count);
            println!("Reports this month: {}", stats.reports_this_month);
        }
        None => {
            println!("No command given. Use --help for usage.");
        }
    }

    Ok(())
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}
