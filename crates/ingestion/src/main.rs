//! Grafka Ingestion CLI
//!
//! Extracts triples from files or inline text, stores them in the graph
//! engine and indexes one vector per subject. Prints one JSON report per
//! input.

use clap::Parser;
use grafka_common::{
    config::AppConfig,
    errors::AppError,
    extraction::{ExtractInput, InputKind},
    graph::GraphStore,
    ingest::IngestReport,
    metrics, Services, TenantContext, VERSION,
};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ingestion", version, about = "Ingest files into the Grafka knowledge graph")]
struct Args {
    /// Files to ingest (.csv, .md, .json, .txt)
    files: Vec<PathBuf>,

    /// Inline text to ingest in addition to the files
    #[arg(long)]
    text: Option<String>,

    /// Tenant the data belongs to
    #[arg(long, env = "GRAFKA_TENANT")]
    tenant: Option<String>,

    /// Force an input kind (tabular, document, keyed_object, free_text)
    /// instead of inferring it from the extension
    #[arg(long)]
    kind: Option<InputKind>,

    /// Delete the tenant's graph data before ingesting. The vector
    /// collection is kept; re-ingested subjects overwrite their vectors.
    #[arg(long)]
    purge: bool,
}

impl Args {
    fn inputs(&self) -> Vec<ExtractInput> {
        self.files
            .iter()
            .cloned()
            .map(ExtractInput::FilePath)
            .chain(self.text.clone().map(ExtractInput::RawText))
            .collect()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = AppConfig::load()?;

    // Initialize tracing; reports go to stdout, logs to stderr
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .json()
        .init();

    info!("Starting Grafka Ingestion v{}", VERSION);
    metrics::register_metrics();

    let inputs = args.inputs();
    if inputs.is_empty() {
        return Err(AppError::input("nothing to ingest: pass files or --text").into());
    }

    let services = Services::from_config(&config)?;
    if config.graph.endpoint.is_none() || config.vector.url.is_none() {
        warn!("No graph endpoint or vector URL configured, data is kept in process only");
    }

    let tenant = TenantContext::new(
        args.tenant
            .clone()
            .unwrap_or_else(|| config.tenant.default_tenant.clone()),
    )?;

    if args.purge {
        let outcome = services.graph.delete_tenant(&tenant).await?;
        info!(tenant = %tenant, success = outcome.success, message = %outcome.message, "Tenant purge");
    }

    let kind = args.kind;
    let mut failures = 0usize;
    for input in &inputs {
        match services.ingestion.run(input, kind, &tenant).await {
            Ok(report) => println!("{}", render(&report)?),
            Err(e) => {
                failures += 1;
                error!(error = %e, "Ingestion failed");
            }
        }
    }

    info!(
        inputs = inputs.len(),
        failures,
        "Ingestion finished"
    );

    if failures > 0 {
        return Err(AppError::input(format!("{failures} of {} inputs failed", inputs.len())).into());
    }
    Ok(())
}

fn render(report: &IngestReport) -> Result<String, AppError> {
    Ok(serde_json::to_string(report)?)
}
