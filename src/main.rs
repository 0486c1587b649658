use clap::Parser;
use miette::{IntoDiagnostic, Result};
use psd2_orchestrator::application::acs_client::AcsNotificationClient;
use psd2_orchestrator::application::orchestrator::AuthenticationOrchestrator;
use psd2_orchestrator::config::OrchestratorConfig;
use psd2_orchestrator::domain::ports::{AcsTransportBox, SessionStoreBox};
use psd2_orchestrator::infrastructure::http::ReqwestTransport;
use psd2_orchestrator::infrastructure::in_memory::InMemorySessionStore;
use psd2_orchestrator::infrastructure::loopback::LoopbackAcs;
use psd2_orchestrator::interfaces::batch::run_scenario;
use psd2_orchestrator::interfaces::csv::outcome_writer::OutcomeWriter;
use psd2_orchestrator::interfaces::csv::scenario_reader::ScenarioReader;
use psd2_orchestrator::telemetry::init_tracing;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input scenarios CSV file
    input: PathBuf,

    /// Path to persistent session database (optional). Requires the `storage-rocksdb` feature.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// ACS base URL. Without it, status updates go to an in-process loopback ACS.
    #[arg(long)]
    acs_base_url: Option<String>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

#[cfg(feature = "storage-rocksdb")]
fn session_store(db_path: Option<PathBuf>) -> Result<SessionStoreBox> {
    use psd2_orchestrator::infrastructure::rocksdb::RocksDbSessionStore;

    match db_path {
        Some(path) => {
            info!(path = %path.display(), "using RocksDB session store");
            Ok(Box::new(RocksDbSessionStore::open(path).into_diagnostic()?))
        }
        None => Ok(Box::new(InMemorySessionStore::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn session_store(db_path: Option<PathBuf>) -> Result<SessionStoreBox> {
    if let Some(path) = db_path {
        tracing::warn!(
            path = %path.display(),
            "--db-path ignored: built without storage-rocksdb, using in-memory store"
        );
    }
    Ok(Box::new(InMemorySessionStore::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => OrchestratorConfig::load(path).into_diagnostic()?,
        None => OrchestratorConfig::default(),
    };

    let transport: AcsTransportBox = match cli.acs_base_url {
        Some(url) => {
            config.acs_base_url = url;
            Box::new(ReqwestTransport::with_default_client().into_diagnostic()?)
        }
        None => {
            info!("no ACS URL given, using loopback ACS");
            Box::new(LoopbackAcs::new())
        }
    };

    let acs_client = AcsNotificationClient::new(transport, config.retry_policy());
    let orchestrator =
        AuthenticationOrchestrator::new(&config, session_store(cli.db_path)?, acs_client)
            .into_diagnostic()?;

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = ScenarioReader::new(file);
    let stdout = io::stdout();
    let mut writer = OutcomeWriter::new(stdout.lock());

    for row in reader.scenarios() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                error!(error = %e, "skipping unreadable scenario row");
                continue;
            }
        };

        let reference = row.reference.clone();
        match run_scenario(&orchestrator, row).await {
            Ok(record) => writer.write(&record).into_diagnostic()?,
            Err(e) => error!(%reference, error = %e, "scenario failed"),
        }
    }

    writer.flush().into_diagnostic()?;
    Ok(())
}
