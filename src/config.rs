use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub wizard: WizardConfig,
    pub call: CallConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WizardConfig {
    /// Fixed candidate list for location suggestions
    pub location_suggestions: Vec<String>,
    /// Fixed candidate list for contact email suggestions
    pub email_suggestions: Vec<String>,
    /// Simulated backend submission delay
    pub submit_delay_ms: u64,
    /// Delay before navigating back to the landing view after success
    pub redirect_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CallConfig {
    /// Maximum dial-pad digits accepted
    pub max_digits: usize,
    /// Simulated ledger write delay
    pub store_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub log_path: String,
}

impl Config {
    /// Load config from ~/.civicline.toml, creating a default on first run
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default(&config_path).context("failed to create default config")?;
        }

        let contents = fs::read_to_string(&config_path).context("failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("failed to parse config TOML")?;

        Ok(config)
    }

    fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(home).join(".civicline.toml"))
    }

    fn create_default(path: &PathBuf) -> Result<()> {
        let default_config = r#"[wizard]
location_suggestions = [
    "No.36, south alley, chennai",
    "No.36, south alley, coimbatore",
]
email_suggestions = [
    "sairam1203mr@gmail.com",
    "philosanjaychamberline.26c@gmail.com",
    "asd@ad.com",
]
submit_delay_ms = 2000
redirect_delay_ms = 2000

[call]
max_digits = 15
store_delay_ms = 1500

[telemetry]
enabled = true
log_path = "~/.civicline/civicline.log"
"#;
        fs::write(path, default_config).context("failed to write default config")?;
        Ok(())
    }

    /// Expand ~ in paths to home directory
    pub fn expand_path(path: &str) -> Result<PathBuf> {
        if let Some(stripped) = path.strip_prefix("~/") {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            Ok(PathBuf::from(home).join(stripped))
        } else {
            Ok(PathBuf::from(path))
        }
    }
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            location_suggestions: vec![
                "No.36, south alley, chennai".to_owned(),
                "No.36, south alley, coimbatore".to_owned(),
            ],
            email_suggestions: vec![
                "sairam1203mr@gmail.com".to_owned(),
                "philosanjaychamberline.26c@gmail.com".to_owned(),
                "asd@ad.com".to_owned(),
            ],
            submit_delay_ms: 2000,
            redirect_delay_ms: 2000,
        }
    }
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            max_digits: 15,
            store_delay_ms: 1500,
        }
    }
}
