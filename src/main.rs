//! sodalite-k8s - Kubernetes resources from Ansible-style parameters
//!
//! This is the main entry point for the sodalite-k8s CLI.

mod cli;

use anyhow::Result;
use cli::commands::{self, CommandContext};
use cli::{Cli, Commands};
use sodalite_k8s::config::{Config, LogFormat};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration; an explicit --config must load
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) if cli.config.is_some() => {
            eprintln!("ERROR: {:#}", e);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Warning: Failed to load config: {:#}", e);
            Config::default()
        }
    };

    init_logging(
        cli.verbosity(),
        &config.logging.level,
        cli.log_format.unwrap_or(config.logging.format),
    );

    let ctx = CommandContext::new(&cli, config);

    // Execute the appropriate command
    let exit_code = match &cli.command {
        Commands::Render(args) => commands::render::render(args, &ctx)?,
        Commands::Validate(args) => commands::render::validate(args, &ctx)?,
        Commands::Apply(args) => args.execute(&ctx)?,
        Commands::List => commands::list::list(&ctx)?,
    };

    std::process::exit(exit_code);
}

/// Initialize logging based on verbosity level
///
/// `-v` flags win over the configured level; `RUST_LOG` wins over both.
fn init_logging(verbosity: u8, configured_level: &str, format: LogFormat) {
    let filter = match verbosity {
        0 => configured_level,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(verbosity >= 3)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}
