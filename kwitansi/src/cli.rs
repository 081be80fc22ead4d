///
/// This module implements the CLI interface for kwitansi: command parsing,
/// wiring the configured collaborators into the core pipeline, and printing
/// the structured result.
///
/// All business logic (reading, rendering, packaging, publishing) lives in
/// `kwitansi-core`. This module is strictly glue.
///
/// ## Subcommands
/// - `process`: turn one spreadsheet in the store into a download link
/// - `fetch`: resolve a previously issued download link to a local copy
///
/// For programmatic/integration use, call [`run`] with a constructed [`Cli`].
use crate::load_config::{load_config, CliConfig};
use crate::store::LocalObjectStore;
use anyhow::Result;
use clap::{Parser, Subcommand};
use kwitansi_core::layout::LayoutSettings;
use kwitansi_core::render::PdfReceiptRenderer;
use kwitansi_core::{process_spreadsheet, CallerIdentity, PipelineContext, ProcessRequest};
use std::path::PathBuf;
use std::time::Duration;

pub const CALLER_UID_VAR: &str = "KWITANSI_CALLER_UID";

/// CLI for kwitansi: render a spreadsheet of receipts into downloadable PDFs.
#[derive(Parser)]
#[clap(
    name = "kwitansi",
    version,
    about = "Render spreadsheet rows into receipt PDFs and publish them for download"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process a spreadsheet stored in the bucket and print a download URL
    Process {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Object name of the spreadsheet inside the bucket
        #[clap(long)]
        file_path: Option<String>,
        /// Verified caller uid (falls back to KWITANSI_CALLER_UID)
        #[clap(long)]
        uid: Option<String>,
    },
    /// Copy the object behind a download URL to a local file
    Fetch {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// URL printed by `process`
        #[clap(long)]
        url: String,
        /// Where to write the file
        #[clap(long)]
        output: PathBuf,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Process {
            config,
            file_path,
            uid,
        } => {
            let config = load_config(config)?;
            tracing::info!(command = "process", "Starting receipt processing");
            let ctx = build_context(&config)?;

            let caller = uid
                .or_else(|| std::env::var(CALLER_UID_VAR).ok())
                .filter(|u| !u.trim().is_empty())
                .map(CallerIdentity::new);
            let request = ProcessRequest { file_path };

            match process_spreadsheet(&ctx, caller.as_ref(), &request).await {
                Ok(response) => {
                    tracing::info!(command = "process", "Processing complete");
                    println!("{}", serde_json::to_string(&response)?);
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "process", code = %e.code, error = %e.message, "Processing failed");
                    eprintln!("{}", serde_json::to_string(&e)?);
                    Err(anyhow::Error::new(e))
                }
            }
        }
        Commands::Fetch {
            config,
            url,
            output,
        } => {
            let config = load_config(config)?;
            let store = LocalObjectStore::new(&config.storage.root, config.signing_key.clone())
                .map_err(|e| anyhow::anyhow!("Failed to open storage root: {e}"))?;
            let source = store
                .verify_signed_url(&url, chrono::Utc::now())
                .map_err(|e| anyhow::anyhow!("Download URL rejected: {e}"))?;
            let bytes = tokio::fs::copy(&source, &output).await?;
            tracing::info!(command = "fetch", bytes, output = %output.display(), "Fetched object");
            Ok(())
        }
    }
}

/// Construct the long-lived collaborators once per process.
pub fn build_context(config: &CliConfig) -> Result<PipelineContext<LocalObjectStore, PdfReceiptRenderer>> {
    let store = LocalObjectStore::new(&config.storage.root, config.signing_key.clone())
        .map_err(|e| anyhow::anyhow!("Failed to open storage root: {e}"))?;
    let renderer = PdfReceiptRenderer::new(
        LayoutSettings {
            city: config.render.city.clone(),
        },
        Duration::from_secs(config.render.timeout_secs),
    );
    Ok(PipelineContext::new(store, renderer).with_link_ttl(config.link_ttl))
}
