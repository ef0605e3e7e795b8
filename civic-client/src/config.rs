use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "https://api.civic.nz/prod";
pub const SERVER_URL_ENV: &str = "CIVIC_SERVER_URL";

/// Delays the controllers schedule work with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Quiet period after the last keystroke before a search is sent
    pub search_debounce_ms: u64,
    /// Fade-out before a deleted post leaves the list
    pub delete_transition_ms: u64,
    /// Pause on a poll's results before moving to the next poll
    pub auto_advance_ms: u64,
    /// How long the profile success message stays up before the form closes
    pub edit_return_ms: u64,
    /// Abort a pending auto-advance when the user navigates by hand.
    /// Turn off to keep the old always-advance behavior.
    pub cancel_advance_on_navigate: bool,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            search_debounce_ms: 300,
            delete_transition_ms: 300,
            auto_advance_ms: 2000,
            edit_return_ms: 1500,
            cancel_advance_on_navigate: true,
        }
    }
}

impl Timings {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn delete_transition(&self) -> Duration {
        Duration::from_millis(self.delete_transition_ms)
    }

    pub fn auto_advance(&self) -> Duration {
        Duration::from_millis(self.auto_advance_ms)
    }

    pub fn edit_return(&self) -> Duration {
        Duration::from_millis(self.edit_return_ms)
    }

    /// No delays at all, for one-shot command-line use
    pub fn immediate() -> Self {
        Self {
            search_debounce_ms: 0,
            delete_transition_ms: 0,
            auto_advance_ms: 0,
            edit_return_ms: 0,
            cancel_advance_on_navigate: true,
        }
    }
}

/// Client configuration stored locally
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub server_url: String,
    #[serde(default)]
    pub timings: Timings,
    pub last_updated: chrono::DateTime<chrono::Utc>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            timings: Timings::default(),
            last_updated: chrono::Utc::now(),
        }
    }
}

/// Configuration manager for the .civic directory
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a config manager rooted at `~/.civic`
    pub fn new() -> Result<Self> {
        let home_dir = dirs::home_dir().context("Could not determine home directory")?;
        Self::with_dir(home_dir.join(".civic"))
    }

    /// Create a config manager rooted at an explicit directory
    pub fn with_dir(config_dir: PathBuf) -> Result<Self> {
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir).context("Failed to create .civic directory")?;
        }
        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }

    /// Save client configuration
    pub fn save_config(&self, config: &ClientConfig) -> Result<()> {
        let json = serde_json::to_string_pretty(config)
            .context("Failed to serialize client config")?;

        fs::write(self.config_file(), json).context("Failed to write client config file")?;

        Ok(())
    }

    /// Load client configuration, `None` when nothing has been saved yet
    pub fn load_config(&self) -> Result<Option<ClientConfig>> {
        let config_file = self.config_file();

        if !config_file.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&config_file).context("Failed to read client config file")?;

        let config: ClientConfig =
            serde_json::from_str(&json).context("Failed to parse client config")?;

        Ok(Some(config))
    }

    /// Determine the server URL to use based on priority:
    /// 1. CLI argument (highest priority)
    /// 2. Environment variable CIVIC_SERVER_URL
    /// 3. Saved configuration file
    /// 4. Built-in default (lowest priority)
    pub fn determine_server_url(&self, cli_override: Option<String>) -> Result<String> {
        if let Some(url) = cli_override {
            return Ok(url);
        }

        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            if !url.trim().is_empty() {
                return Ok(url);
            }
        }

        if let Some(config) = self.load_config()? {
            return Ok(config.server_url);
        }

        Ok(DEFAULT_SERVER_URL.to_string())
    }

    /// Timings from the saved config, or the defaults
    pub fn timings(&self) -> Result<Timings> {
        Ok(self.load_config()?.map(|c| c.timings).unwrap_or_default())
    }

    /// Persist a server URL, keeping any saved timings
    pub fn save_server_url(&self, server_url: String) -> Result<()> {
        let mut config = self.load_config()?.unwrap_or_default();
        config.server_url = server_url;
        config.last_updated = chrono::Utc::now();
        self.save_config(&config)
    }
}
