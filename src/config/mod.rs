pub mod cli;
pub mod toml_config;

use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const DEFAULT_CACHE_MINUTES: i64 = 5;
pub const DEFAULT_SEARCH_LIMIT: usize = 50;
pub const DEFAULT_GRID_COLUMNS: u32 = 12;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_DATA_DIR: &str = "./.recruit-desk";

/// Global command line options. Values given here win over a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct CliConfig {
    /// Backend base URL
    #[cfg_attr(feature = "cli", arg(long, global = true, env = "RECRUIT_DESK_API"))]
    pub api_base: Option<String>,

    /// API token sent as `Authorization: Token <value>`
    #[cfg_attr(feature = "cli", arg(long, global = true, env = "RECRUIT_DESK_TOKEN", hide_env_values = true))]
    pub token: Option<String>,

    /// Directory holding the session and layout store
    #[cfg_attr(feature = "cli", arg(long, global = true))]
    pub data_dir: Option<String>,

    /// Minutes before cached collections are considered stale
    #[cfg_attr(feature = "cli", arg(long, global = true))]
    pub cache_minutes: Option<i64>,

    /// Optional TOML configuration file
    #[cfg_attr(feature = "cli", arg(long, global = true))]
    pub config: Option<String>,

    #[cfg_attr(feature = "cli", arg(long, global = true, help = "Enable verbose output"))]
    pub verbose: bool,

    #[cfg_attr(feature = "cli", arg(long, global = true, help = "Emit logs as JSON"))]
    pub log_json: bool,
}

impl ConfigProvider for CliConfig {
    fn api_base_url(&self) -> &str {
        self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    fn auth_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)
    }

    fn cache_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cache_minutes.unwrap_or(DEFAULT_CACHE_MINUTES))
    }

    fn search_limit(&self) -> usize {
        DEFAULT_SEARCH_LIMIT
    }

    fn data_dir(&self) -> &str {
        self.data_dir.as_deref().unwrap_or(DEFAULT_DATA_DIR)
    }

    fn grid_columns(&self) -> u32 {
        DEFAULT_GRID_COLUMNS
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("api_base", self.api_base_url())?;
        validation::validate_path("data_dir", self.data_dir())?;
        if let Some(minutes) = self.cache_minutes {
            validation::validate_positive_number("cache_minutes", minutes.max(0) as usize, 1)?;
        }
        if let Some(token) = &self.token {
            validation::validate_non_empty_string("token", token)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cli_config_is_valid() {
        let config = CliConfig::default();
        assert!(config.api_base.is_none() && config.token.is_none());
        assert!(!config.verbose && !config.log_json);
        assert!(config.validate().is_ok());
        assert_eq!(config.cache_duration(), chrono::Duration::minutes(5));
        assert_eq!(config.search_limit(), 50);
    }

    #[test]
    fn test_rejects_blank_token_and_zero_cache() {
        let config = CliConfig {
            token: Some("  ".to_string()),
            ..CliConfig::default()
        };
        assert!(config.validate().is_err());

        let config = CliConfig {
            cache_minutes: Some(0),
            ..CliConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
