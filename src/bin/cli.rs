//! Crawl gateway CLI
//!
//! Local execution entry point. For AWS Lambda, use `crawl-gateway-lambda`.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use crawl_gateway::{
    config,
    error::{AppError, Result},
    gateway::{Gateway, usage},
    logging::facade,
    models::{BATCH_OPERATION, GatewayEvent, Params},
};
use serde_json::Value;

/// Dispatch crawl, search and extraction operations from the command line
#[derive(Parser, Debug)]
#[command(name = "crawl-gateway", version, about = "Crawl operation gateway")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one event through the gateway and print the response
    Invoke {
        /// File holding a full platform event, or `-` for stdin
        #[arg(long, conflicts_with_all = ["operation", "params"])]
        event: Option<PathBuf>,

        /// Operation name (uses the configured default when omitted)
        #[arg(short, long)]
        operation: Option<String>,

        /// Operation parameters as a JSON object
        #[arg(short, long)]
        params: Option<String>,

        /// Print compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// List the registered operations
    Operations,

    /// Print a sample request body
    Example {
        /// Operation to show; lists the available samples when omitted
        name: Option<String>,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Read the event from a file or stdin.
fn read_event(path: &Path) -> Result<Value> {
    let content = if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(path)?
    };
    Ok(serde_json::from_str(&content)?)
}

/// Build an event from `--operation` and `--params`.
fn build_event(operation: Option<String>, params: Option<String>) -> Result<Value> {
    let params: Params = match params {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| AppError::malformed(format!("--params is not a JSON object: {e}")))?,
        None => Params::new(),
    };
    let event = GatewayEvent::single(operation.unwrap_or_default(), params);
    Ok(serde_json::to_value(event)?)
}

/// Main entry point for the CLI application.
///
/// Runs without an ambient async runtime, so every operation goes through
/// the bridge's inline path.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = config::load_config(&cli.config)?;
    log::debug!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Invoke {
            event,
            operation,
            params,
            compact,
        } => {
            let event = match event {
                Some(path) => read_event(&path)?,
                None => build_event(operation, params)?,
            };

            let gateway = Gateway::from_config(&config, facade())?;
            let response = gateway.handle_event(&event).to_value();
            let rendered = if compact {
                serde_json::to_string(&response)?
            } else {
                serde_json::to_string_pretty(&response)?
            };
            println!("{rendered}");

            let ledger = gateway.bridge().ledger();
            log::debug!(
                "Bridge ledger: {} runtimes, {} threads, {} slow teardowns, balanced={}",
                ledger.runtimes_created,
                ledger.threads_spawned,
                ledger.teardowns_overran,
                ledger.is_balanced()
            );
        }

        Command::Operations => {
            let gateway = Gateway::from_config(&config, facade())?;
            for entry in gateway.registry().entries() {
                println!("{:<36} {:?}", entry.name.as_str(), entry.mode);
            }
            println!("{BATCH_OPERATION:<36} Batch");
        }

        Command::Example { name } => match name {
            Some(name) => {
                let example = usage::example(&name)
                    .ok_or_else(|| AppError::validation(format!("No example for '{name}'")))?;
                println!("{}", serde_json::to_string_pretty(&example)?);
            }
            None => {
                for (name, _) in usage::examples() {
                    println!("{name}");
                }
            }
        },

        Command::Validate => {
            log::info!("Validating configuration...");
            config.validate()?;
            log::info!(
                "Config OK (default operation: {}, upstream: {})",
                config.gateway.default_operation,
                config.upstream.endpoint.as_deref().unwrap_or("none")
            );
        }
    }

    Ok(())
}
