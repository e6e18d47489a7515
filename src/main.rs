#![forbid(unsafe_code)]

use blobsync_config::Config;
use blobsync_storage::backend::AzureBackend;
use blobsync_sync::Synchronizer;
use clap::Parser;
use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Upload build artifacts to an Azure blob container when they changed.
///
/// Every option can also be set in a configuration file or through
/// `BLOBSYNC_*` environment variables; flags take precedence.
#[derive(Debug, Parser)]
#[command(name = "blobsync", version)]
struct Cli {
    /// Configuration file to read instead of the discovered one.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Destination container name.
    #[arg(long, value_name = "NAME")]
    container: Option<String>,
    /// Storage account connection string.
    #[arg(long, value_name = "CONNECTION")]
    connection_string: Option<String>,
    /// MIME type assigned to every uploaded blob.
    #[arg(long, value_name = "MIME")]
    content_type: Option<String>,
    /// Content encoding assigned to every uploaded blob.
    #[arg(long, value_name = "ENCODING")]
    content_encoding: Option<String>,
    /// Public access level of the container: private, blob or container.
    #[arg(long, value_name = "LEVEL")]
    container_permission: Option<String>,
    /// Log every decision without changing anything remotely.
    #[arg(long)]
    dry_run: bool,
    /// Files to upload; replaces the configured list when given.
    files: Vec<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> Config {
        Config {
            connection_string: self.connection_string.clone(),
            container_name: self.container.clone(),
            container_permission: self.container_permission.clone(),
            content_type: self.content_type.clone(),
            content_encoding: self.content_encoding.clone(),
            files: self.files.clone(),
            dry_run: self.dry_run.then_some(true),
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn fail(message: &str, error: impl fmt::Debug) -> ExitCode {
    tracing::error!(error = ?error, "{message}");
    ExitCode::from(2)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let config = match Config::load(cli.config.as_deref(), &cli.overrides()) {
        Ok(config) => config,
        Err(err) => return fail("Configuration could not be loaded", err),
    };
    tracing::debug!(?config, "Configuration loaded");
    let request = match config.into_request() {
        Ok(request) => request,
        Err(err) => return fail("Configuration is incomplete", err),
    };

    match Synchronizer::new(request, AzureBackend::connect).execute().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => fail("Sync aborted", err),
    }
}
