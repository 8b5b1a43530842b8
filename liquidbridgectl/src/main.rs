//! liquidbridge CLI
//!
//! Command-line interface for driving liquidctl devices through the
//! bridge backend: initialization, status dumps, pump and fan duty.

use anyhow::Result;
use clap::Parser;
use liquidbridge_backend::LiquidctlBackend;
use liquidbridgectl::cli::{
    generate_completion, handle_info, handle_initialize, handle_list, handle_set_fan,
    handle_set_pump, handle_status, Cli, CliOutputFormat, Commands,
};
use liquidbridgectl::config::CliConfig;
use liquidbridgectl::format::OutputFormat;

fn init_logging(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configuration priority chain: defaults → file → env → CLI args
    let mut config = if cli.no_config {
        CliConfig::default()
    } else {
        match CliConfig::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Configuration error: {}", e);
                std::process::exit(1);
            }
        }
    };
    config.apply_env_overrides();

    if let Some(ref exe) = cli.exe {
        config.exe = exe.clone();
    }
    if let Some(ref format) = cli.format {
        config.output_format = match format {
            CliOutputFormat::Table => "table".to_string(),
            CliOutputFormat::Json => "json".to_string(),
        };
    }
    if let Some(verbose) = cli.verbose {
        config.verbose = verbose;
    }

    init_logging(config.verbose);

    let output_format = match config.output_format.as_str() {
        "json" => OutputFormat::Json,
        _ => OutputFormat::Table,
    };

    let backend = LiquidctlBackend::new(&config.exe);

    match cli.command {
        Commands::Initialize => handle_initialize(&backend),
        Commands::List => handle_list(&backend, &output_format),
        Commands::Status { address } => handle_status(&backend, &address, &output_format),
        Commands::Info { address } => handle_info(&backend, &address),
        Commands::SetPump { address, percent } => handle_set_pump(&backend, &address, percent),
        Commands::SetFan {
            address,
            index,
            percent,
        } => handle_set_fan(&backend, &address, index, percent),
        Commands::Completion { shell } => {
            generate_completion(shell);
            Ok(())
        }
    }
}
