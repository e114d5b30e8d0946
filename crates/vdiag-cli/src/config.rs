//! Configuration file handling for vdiag
//!
//! ```toml
//! vehicle = "rav4_xa50"
//! vehicles_dir = "/home/me/.config/vdiag/vehicles"
//! output = "json"
//!
//! [transport]
//! type = "elm327"
//! port = "/dev/ttyUSB0"
//! baud_rate = 38400
//! timeout_secs = 10
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use vdiag_obd::{Elm327Config, MockConfig, TransportConfig};

use crate::output::OutputFormat;

/// Profile used when nothing else is configured
pub const DEFAULT_VEHICLE: &str = "rav4_xa50";

/// Configuration for the CLI tool
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default vehicle profile name
    pub vehicle: Option<String>,
    /// Directory holding `<vehicle>.json` profiles
    pub vehicles_dir: Option<PathBuf>,
    /// Default output format
    pub output: Option<String>,
    /// Disable colored output
    pub no_color: Option<bool>,
    /// Adapter settings
    pub transport: Option<TransportConfig>,
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ArgOverrides {
    pub vehicle: Option<String>,
    pub vehicles_dir: Option<PathBuf>,
    pub port: Option<String>,
    pub baud: Option<u32>,
    pub timeout: Option<u64>,
    pub mock: bool,
    pub output: Option<OutputFormat>,
    pub no_color: bool,
}

impl Config {
    /// Load configuration from the default config file, if there is one
    ///
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Ok(path) => Self::load_or_default(&path),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Load `path`, or the defaults when it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(config_dir()?.join("config.toml"))
    }

    /// Merge command-line values over config file values
    pub fn merge_with_args(&self, args: &ArgOverrides) -> Result<MergedConfig> {
        let output = match (args.output, &self.output) {
            (Some(format), _) => format,
            (None, Some(name)) => OutputFormat::from_str(name, true)
                .map_err(|e| anyhow::anyhow!("Invalid output format '{}': {}", name, e))?,
            (None, None) => OutputFormat::default(),
        };

        Ok(MergedConfig {
            vehicle: args
                .vehicle
                .clone()
                .or_else(|| self.vehicle.clone())
                .unwrap_or_else(|| DEFAULT_VEHICLE.to_string()),
            vehicles_dir: args
                .vehicles_dir
                .clone()
                .or_else(|| self.vehicles_dir.clone())
                .unwrap_or_else(default_vehicles_dir),
            output,
            no_color: args.no_color || self.no_color.unwrap_or(false),
            transport: self.merge_transport(args),
        })
    }

    fn merge_transport(&self, args: &ArgOverrides) -> TransportConfig {
        let configured = self.transport.clone().unwrap_or_default();

        if args.mock {
            let mut mock = match configured {
                TransportConfig::Mock(cfg) => cfg,
                TransportConfig::Elm327(_) => MockConfig::default(),
            };
            if let Some(timeout) = args.timeout {
                mock.timeout_secs = timeout;
            }
            return TransportConfig::Mock(mock);
        }

        let mut elm = match configured {
            TransportConfig::Elm327(cfg) => cfg,
            TransportConfig::Mock(mut cfg) if args.port.is_none() => {
                if let Some(timeout) = args.timeout {
                    cfg.timeout_secs = timeout;
                }
                return TransportConfig::Mock(cfg);
            }
            TransportConfig::Mock(_) => Elm327Config::default(),
        };
        if let Some(port) = &args.port {
            elm.port = port.clone();
        }
        if let Some(baud) = args.baud {
            elm.baud_rate = Some(baud);
        }
        if let Some(timeout) = args.timeout {
            elm.timeout_secs = timeout;
        }
        TransportConfig::Elm327(elm)
    }
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub vehicle: String,
    pub vehicles_dir: PathBuf,
    pub output: OutputFormat,
    pub no_color: bool,
    pub transport: TransportConfig,
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Could not determine config directory")?
        .join("vdiag"))
}

/// `<config_dir>/vdiag/vehicles` when it exists, otherwise `./vehicles`
fn default_vehicles_dir() -> PathBuf {
    config_dir()
        .map(|dir| dir.join("vehicles"))
        .ok()
        .filter(|dir| dir.is_dir())
        .unwrap_or_else(|| PathBuf::from("vehicles"))
}
