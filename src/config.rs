use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ListerError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "lister.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub driver: DriverConfig,
    pub marketplace: MarketplaceConfig,
    pub workflow: WorkflowConfig,
    pub login: LoginConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub webdriver_url: String,
    pub element_timeout_secs: u64,
    pub window_timeout_secs: u64,
    pub completion_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub assets_dir: PathBuf,
    pub headless: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            element_timeout_secs: 10,
            window_timeout_secs: 30,
            completion_timeout_secs: 2400,
            poll_interval_ms: 250,
            assets_dir: PathBuf::from("assets"),
            headless: false,
        }
    }
}

impl DriverConfig {
    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    pub fn window_timeout(&self) -> Duration {
        Duration::from_secs(self.window_timeout_secs)
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    pub base_url: String,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://opensea.io".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub stage_timeout_secs: u64,
    pub sale_check_cooldown_secs: u64,
    pub known_blockchains: Vec<String>,
    pub max_asset_megabytes: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            stage_timeout_secs: 3600,
            sale_check_cooldown_secs: 600,
            known_blockchains: vec!["Ethereum".to_string(), "Polygon".to_string()],
            max_asset_megabytes: 100,
        }
    }
}

impl WorkflowConfig {
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }

    pub fn sale_check_cooldown(&self) -> Duration {
        Duration::from_secs(self.sale_check_cooldown_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    Fixed,
    Exponential,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Backoff::Exponential,
            base_delay_ms: 2000,
            max_delay_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub listen_addr: Option<String>,
}

impl Config {
    /// Loads the configuration. An explicit path must exist; the default path
    /// falls back to built-in defaults when absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config_path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        if !config_path.exists() {
            if explicit {
                return Err(ListerError::Config(format!(
                    "Config file '{}' does not exist",
                    config_path.display()
                )));
            }
            return Ok(Config::default());
        }

        let config_content = fs::read_to_string(&config_path).map_err(|e| {
            ListerError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;

        Self::from_toml(&config_content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.login.max_attempts == 0 {
            return Err(ListerError::Config(
                "login.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.workflow.known_blockchains.is_empty() {
            return Err(ListerError::Config(
                "workflow.known_blockchains must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let config = Config::from_toml(
            r#"
            [workflow]
            sale_check_cooldown_secs = 5

            [login]
            backoff = "fixed"
            "#,
        )
        .unwrap();

        assert_eq!(config.workflow.sale_check_cooldown_secs, 5);
        assert_eq!(config.workflow.stage_timeout_secs, 3600);
        assert_eq!(config.login.backoff, Backoff::Fixed);
        assert_eq!(config.login.max_attempts, 5);
        assert_eq!(config.driver.webdriver_url, "http://localhost:9515");
    }

    #[test]
    fn zero_login_attempts_is_rejected() {
        let err = Config::from_toml("[login]\nmax_attempts = 0\n").unwrap_err();
        assert!(matches!(err, ListerError::Config(_)));
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let err = Config::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ListerError::Config(_)));
    }
}
