//! Command-line interface for the naginator binary.
//!
//! A single invocation regenerates every `auto_*.cfg` file in the output
//! directory from the current PuppetDB contents.

use std::{path::PathBuf, process};

use clap::{ArgAction, Parser};
use naginator::{
    Config, Error, Pipeline, PuppetDbClient, RunSummary, clean_output_dir, load_config,
    validate_api_version,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command line interface for generating Nagios configuration from PuppetDB.
#[derive(Debug, Parser,)]
#[command(name = "naginator", about = "Generate Nagios configuration from PuppetDB resources")]
struct Cli
{
    /// Directory that receives the generated `auto_*.cfg` files.
    #[arg(long = "output-dir", value_name = "DIR", env = "NAGINATOR_OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Path to the YAML configuration file.
    #[arg(short = 'c', long = "config", value_name = "PATH", env = "NAGINATOR_CONFIG")]
    config: Option<PathBuf,>,

    /// PuppetDB host, overriding the configuration.
    #[arg(long = "host", value_name = "HOST", env = "PUPPETDB_HOST")]
    host: Option<String,>,

    /// PuppetDB port, overriding the configuration.
    #[arg(long = "port", value_name = "PORT", env = "PUPPETDB_PORT")]
    port: Option<u16,>,

    /// PuppetDB query API version (3 or 4), overriding the configuration.
    #[arg(short = 'V', long = "api-version", value_name = "VERSION")]
    api_version: Option<u8,>,

    /// Remove existing `auto_*.cfg` files before generating.
    #[arg(long = "clean", action = ArgAction::SetTrue)]
    clean: bool,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

/// Entry point that reports errors and sets the appropriate exit status.
#[tokio::main(flavor = "current_thread")]
async fn main()
{
    let cli = Cli::parse();
    init_tracing(cli.verbose,);

    if let Err(error,) = run(cli,).await {
        eprintln!("{}", error.to_display_string());
        process::exit(1,);
    }
}

fn init_tracing(verbose: u8,)
{
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,naginator={level}"),),);
    tracing_subscriber::fmt().with_env_filter(filter,).with_writer(std::io::stderr,).init();
}

/// Executes one generation run using parsed arguments.
///
/// # Errors
///
/// Propagates configuration, CMDB, write and template errors.
async fn run(cli: Cli,) -> Result<RunSummary, Error,>
{
    let config = resolve_config(&cli,)?;

    if !cli.output_dir.is_dir() {
        return Err(Error::validation(format!(
            "output directory {} does not exist",
            cli.output_dir.display()
        ),),);
    }
    if cli.clean {
        let removed = clean_output_dir(&cli.output_dir,)?;
        info!("Removed {removed} previously generated files");
    }

    let client = PuppetDbClient::new(&config.puppetdb,)?;
    info!("Querying PuppetDB at {}", client.base_url());
    Pipeline::new(client, config, cli.output_dir,).run().await
}

/// Loads the configuration file, if any, and applies command line overrides.
///
/// # Errors
///
/// Returns an [`Error`] when the file cannot be loaded or an override is
/// invalid.
fn resolve_config(cli: &Cli,) -> Result<Config, Error,>
{
    let mut config = match cli.config.as_deref() {
        Some(path,) => load_config(path,)?,
        None => Config::default(),
    };

    if let Some(host,) = &cli.host {
        config.puppetdb.host = host.clone();
    }
    if let Some(port,) = cli.port {
        config.puppetdb.port = port;
    }
    if let Some(version,) = cli.api_version {
        validate_api_version(version,)?;
        config.puppetdb.api_version = version;
    }

    Ok(config,)
}
