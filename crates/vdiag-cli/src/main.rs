//! vdiag - Command-line tool for read-only OBD-II diagnostics
//!
//! Reads parameters, trouble codes and discovery sweeps through an ELM327
//! adapter. Every result is a JSON document on stdout unless `-o table`
//! is given.

mod commands;
mod config;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vdiag_conv::load_vehicle;
use vdiag_obd::{Connection, VehicleProfile};

use crate::config::{ArgOverrides, Config, MergedConfig};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "vdiag")]
#[command(author, version, about = "Read-only OBD-II vehicle diagnostics")]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "VDIAG_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Vehicle profile name
    #[arg(long, env = "VDIAG_VEHICLE", global = true)]
    vehicle: Option<String>,

    /// Directory holding vehicle profiles
    #[arg(long, env = "VDIAG_VEHICLES_DIR", global = true)]
    vehicles_dir: Option<PathBuf>,

    /// Serial port of the adapter ("auto" probes every port)
    #[arg(short, long, env = "VDIAG_PORT", global = true)]
    port: Option<String>,

    /// Baud rate (probes common rates when unset)
    #[arg(short, long, env = "VDIAG_BAUD", global = true)]
    baud: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(short, long, env = "VDIAG_TIMEOUT", global = true)]
    timeout: Option<u64>,

    /// Use the in-memory mock adapter
    #[arg(long, global = true)]
    mock: bool,

    /// Output format
    #[arg(short, long, value_enum, global = true)]
    output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Adapter state and basic vitals
    Status,

    /// Read every parameter in a group
    Group {
        /// Group name (e.g. status, health)
        name: String,
    },

    /// Read one parameter
    Pid {
        /// Parameter key from the vehicle profile
        name: String,
    },

    /// Read stored and pending trouble codes
    Dtc,

    /// Send a raw read request
    Raw {
        /// Hex command (e.g. 0902, 2101)
        command: String,

        /// Target header
        #[arg(long, default_value = "7E0")]
        header: String,
    },

    /// Probe the configured address ranges
    Scan {
        /// Only sweep this header
        #[arg(long)]
        ecu: Option<String>,
    },

    /// List configured parameters
    List,
}

impl Cli {
    fn overrides(&self) -> ArgOverrides {
        ArgOverrides {
            vehicle: self.vehicle.clone(),
            vehicles_dir: self.vehicles_dir.clone(),
            port: self.port.clone(),
            baud: self.baud,
            timeout: self.timeout,
            mock: self.mock,
            output: self.output,
            no_color: self.no_color,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays a clean JSON document
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let merged = match load_config(&cli) {
        Ok(merged) => merged,
        Err(e) => {
            let format = cli.output.unwrap_or_default();
            OutputContext::new(format, cli.no_color).error(&format!("{:#}", e));
            return ExitCode::FAILURE;
        }
    };

    let ctx = OutputContext::new(merged.output, merged.no_color);
    match run(&cli.command, &merged, &ctx).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ctx.error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<MergedConfig> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.merge_with_args(&cli.overrides())
}

async fn run(command: &Commands, merged: &MergedConfig, ctx: &OutputContext) -> Result<()> {
    let profile = load_vehicle(&merged.vehicles_dir, &merged.vehicle).with_context(|| {
        format!(
            "Failed to load vehicle '{}' from {}",
            merged.vehicle,
            merged.vehicles_dir.display()
        )
    })?;

    if let Commands::List = command {
        return commands::list(&profile, ctx);
    }

    let conn = vdiag_obd::connect(&merged.transport).await?;
    let result = dispatch(command, &conn, &profile, ctx).await;
    conn.close().await;
    result
}

async fn dispatch(
    command: &Commands,
    conn: &Connection,
    profile: &VehicleProfile,
    ctx: &OutputContext,
) -> Result<()> {
    match command {
        Commands::Status => commands::status(conn, profile, ctx).await,
        Commands::Group { name } => commands::group(conn, profile, name, ctx).await,
        Commands::Pid { name } => commands::pid(conn, profile, name, ctx).await,
        Commands::Dtc => commands::dtc(conn, ctx).await,
        Commands::Raw { command, header } => commands::raw(conn, command, header, ctx).await,
        Commands::Scan { ecu } => commands::scan(conn, profile, ecu.as_deref(), ctx).await,
        Commands::List => commands::list(profile, ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_raw_defaults() {
        let cli = Cli::parse_from(["vdiag", "raw", "0902"]);
        match cli.command {
            Commands::Raw { command, header } => {
                assert_eq!(command, "0902");
                assert_eq!(header, "7E0");
            }
            _ => panic!("expected raw"),
        }
    }

    #[test]
    fn test_malformed_config_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "vehicle = [broken").unwrap();

        let cli = Cli::parse_from([
            "vdiag",
            "--config",
            path.to_str().unwrap(),
            "list",
        ]);
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["vdiag", "group", "status", "--mock", "-o", "table"]);
        assert!(cli.mock);
        assert_eq!(cli.output, Some(OutputFormat::Table));
        let overrides = cli.overrides();
        assert!(overrides.mock);
        assert_eq!(overrides.output, Some(OutputFormat::Table));
    }
}
