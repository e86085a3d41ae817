use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EsgError, Result};

/// Default endpoint of the external NLU webhook.
pub const DEFAULT_NLU_ENDPOINT: &str = "http://localhost:5005/webhooks/rest/webhook";

/// Top-level configuration for the ESG assistant.
///
/// Loaded from `~/.esg-assistant/config.toml` by default. Every section is
/// optional in the file and falls back to its defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EsgConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub nlu: NluConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl EsgConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EsgConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file if one exists.
    ///
    /// A missing file is `Ok(None)`; an unreadable or malformed one is an
    /// error, left to the caller to report.
    pub fn load_if_exists(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| EsgError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// HTTP port the API listens on (localhost only).
    pub port: u16,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            port: 3040,
            log_level: "info".to_string(),
        }
    }
}

/// External NLU webhook settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NluConfig {
    /// When false, every utterance is answered by the local rules.
    pub enabled: bool,
    /// Webhook URL receiving `{ sender, message }`.
    pub endpoint: String,
    /// Value sent as `sender`.
    pub sender: String,
}

impl Default for NluConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_NLU_ENDPOINT.to_string(),
            sender: "user".to_string(),
        }
    }
}

/// Dialogue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// JSON catalog replacing the built-in French one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<String>,
    /// Serve the demo catalog (fictitious figures, no exact-match table).
    pub demo_mode: bool,
    /// Idle sessions older than this are dropped. 0 keeps them forever.
    pub session_timeout_minutes: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            demo_mode: false,
            session_timeout_minutes: 30,
        }
    }
}
