use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use laudo_api_rest::{router, AppState};
use laudo_core::{CodeKind, CodeLists, CoreConfig};

/// Main entry point for the Laudo application
///
/// Resolves configuration once, loads the CID-10 and TUSS reference lists and serves the
/// REST API.
///
/// # Environment Variables
/// - `LAUDO_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `LAUDO_DATA_DIR`: Directory for record storage (default: "laudo_data")
/// - `LAUDO_CID_CODES`: CID-10 reference list (default: "data/cid10.json")
/// - `LAUDO_TUSS_CODES`: TUSS reference list (default: "data/tuss.json")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid or a configured code list cannot be loaded,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("laudo_run=info".parse()?)
                .add_directive("laudo_core=info".parse()?)
                .add_directive("laudo_api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("LAUDO_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(CoreConfig::from_env_values(
        std::env::var("LAUDO_DATA_DIR").ok(),
        std::env::var("LAUDO_CID_CODES").ok(),
        std::env::var("LAUDO_TUSS_CODES").ok(),
    )?);
    std::fs::create_dir_all(cfg.data_dir())?;

    let codes = CodeLists::load(&cfg)?;
    tracing::info!(
        "Loaded {} CID and {} TUSS codes",
        codes.get(CodeKind::Cid).len(),
        codes.get(CodeKind::Tuss).len()
    );
    tracing::info!("Record storage at {}", cfg.data_dir().display());

    let app = router(AppState::new(cfg, codes));

    tracing::info!("-- Starting Laudo REST API on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
