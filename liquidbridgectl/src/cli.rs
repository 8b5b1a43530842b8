//! CLI command definitions and handlers

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use liquidbridge_backend::{Device, DeviceIo, LiquidctlBackend, ProcessLauncher, ProcessRunner};
use liquidbridge_core::DeviceAddress;

use crate::format::{format_record, format_records, OutputFormat};

type Backend = LiquidctlBackend<ProcessLauncher, ProcessRunner>;

/// liquidctl bridge CLI
#[derive(Parser, Debug)]
#[command(name = "liquidbridgectl")]
#[command(version, about = "liquidctl bridge CLI", long_about = None)]
pub struct Cli {
    /// Path to the liquidctl executable (overrides config file)
    #[arg(short, long)]
    pub exe: Option<String>,

    /// Output format (overrides config file)
    #[arg(short, long, value_enum)]
    pub format: Option<CliOutputFormat>,

    /// Enable verbose logging (overrides config file)
    #[arg(short, long)]
    pub verbose: Option<bool>,

    /// Don't load config file
    #[arg(long)]
    pub no_config: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum CliOutputFormat {
    /// Pretty table output
    Table,
    /// JSON output
    Json,
}

impl From<&CliOutputFormat> for OutputFormat {
    fn from(format: &CliOutputFormat) -> Self {
        match format {
            CliOutputFormat::Table => OutputFormat::Table,
            CliOutputFormat::Json => OutputFormat::Json,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize all connected devices
    Initialize,

    /// List all devices and their readings (one-shot status dump)
    List,

    /// Show one device's readings via its interactive session
    Status {
        /// Device address (usb:<bus>:<port> or a HID address)
        address: String,
    },

    /// Show a one-line summary of a device's sensors and controls
    Info {
        /// Device address
        address: String,
    },

    /// Set the pump duty percentage
    SetPump {
        /// Device address
        address: String,
        /// Duty percentage (0-100)
        percent: u8,
    },

    /// Set a fan's duty percentage
    SetFan {
        /// Device address
        address: String,
        /// Fan slot (1-20)
        index: usize,
        /// Duty percentage (0-100)
        percent: u8,
    },

    /// Generate shell completion script
    Completion {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

fn parse_address(raw: &str) -> Result<DeviceAddress> {
    DeviceAddress::parse(raw).with_context(|| format!("invalid device address: {}", raw))
}

/// `initialize` command
pub fn handle_initialize(backend: &Backend) -> Result<()> {
    backend.initialize()?;
    println!("Initialized all devices");
    Ok(())
}

/// `list` command: one-shot multi-device status dump
pub fn handle_list(backend: &Backend, format: &OutputFormat) -> Result<()> {
    let records = backend.read_all_status()?;
    println!("{}", format_records(&records, format)?);
    Ok(())
}

/// `status` command: single device over its interactive session
pub fn handle_status(backend: &Backend, address: &str, format: &OutputFormat) -> Result<()> {
    let address = parse_address(address)?;
    let records = backend.read_status(&address)?;
    let record = records
        .first()
        .with_context(|| format!("Device {} not showing up", address))?;
    println!("{}", format_record(record, format)?);
    Ok(())
}

/// `info` command: facade summary line
pub fn handle_info(backend: &Backend, address: &str) -> Result<()> {
    let address = parse_address(address)?;
    let records = backend.read_status(&address)?;
    let record = records
        .first()
        .with_context(|| format!("Device {} not showing up", address))?;
    let device = Device::from_record(record)?;
    println!("{}", device.device_info());
    Ok(())
}

/// `set-pump` command
pub fn handle_set_pump(backend: &Backend, address: &str, percent: u8) -> Result<()> {
    let address = parse_address(address)?;
    backend.set_pump(&address, percent)?;
    println!("Pump duty set to {}%", percent);
    Ok(())
}

/// `set-fan` command
pub fn handle_set_fan(backend: &Backend, address: &str, index: usize, percent: u8) -> Result<()> {
    let address = parse_address(address)?;
    backend.set_fan(&address, index, percent)?;
    println!("Fan {} duty set to {}%", index, percent);
    Ok(())
}

/// Generate shell completion script
pub fn generate_completion(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_set_fan() {
        let cli = Cli::parse_from([
            "liquidbridgectl",
            "set-fan",
            "/dev/hidraw3",
            "2",
            "60",
        ]);
        match cli.command {
            Commands::SetFan {
                address,
                index,
                percent,
            } => {
                assert_eq!(address, "/dev/hidraw3");
                assert_eq!(index, 2);
                assert_eq!(percent, 60);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_exe_override() {
        let cli = Cli::parse_from(["liquidbridgectl", "--exe", "/opt/liquidctl", "list"]);
        assert_eq!(cli.exe.as_deref(), Some("/opt/liquidctl"));
        assert!(matches!(cli.command, Commands::List));
    }

    #[test]
    fn test_parse_address_rejects_empty() {
        assert!(parse_address("").is_err());
        assert!(parse_address("usb:1:4").is_ok());
    }
}
