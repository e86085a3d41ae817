//! CLI argument definitions for the ESG assistant server.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use esg_core::EsgConfig;

/// ESG assistant - answers sustainability reporting questions over HTTP.
#[derive(Parser, Debug)]
#[command(name = "esg-assistant", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Serve the demo catalog with fictitious figures.
    #[arg(long = "demo")]
    pub demo: bool,

    /// Answer from local rules only, without calling the NLU service.
    #[arg(long = "offline")]
    pub offline: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > ESG_ASSISTANT_CONFIG env var > ~/.esg-assistant/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("ESG_ASSISTANT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the API server port.
    ///
    /// Priority: --port flag > ESG_ASSISTANT_PORT env var > config file value > 3040.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        if let Ok(val) = std::env::var("ESG_ASSISTANT_PORT") {
            if let Ok(p) = val.parse::<u16>() {
                return p;
            }
        }
        if config_port != 0 {
            return config_port;
        }
        3040
    }

    /// Fold the command-line overrides into a loaded config.
    pub fn apply(&self, config: &mut EsgConfig) {
        config.general.port = self.resolve_port(config.general.port);
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
        if self.demo {
            config.chat.demo_mode = true;
        }
        if self.offline {
            config.nlu.enabled = false;
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".esg-assistant").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".esg-assistant").join("config.toml");
    }
    PathBuf::from("config.toml")
}
