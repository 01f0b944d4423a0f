use crate::config::{
    CliConfig, DEFAULT_API_BASE, DEFAULT_CACHE_MINUTES, DEFAULT_DATA_DIR, DEFAULT_GRID_COLUMNS,
    DEFAULT_SEARCH_LIMIT, DEFAULT_TIMEOUT_SECONDS,
};
use crate::core::layout::GridMetrics;
use crate::core::search::ScoringWeights;
use crate::domain::model::EntityKind;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{DeskError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_seconds: Option<u64>,
    /// Per entity type path overrides, keyed by `EntityKind::as_str()`.
    pub endpoints: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    pub default_limit: Option<usize>,
    pub weights: Option<ScoringWeights>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub columns: Option<u32>,
    pub cell_width: Option<f64>,
    pub row_height: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: Option<String>,
}

impl TomlConfig {
    /// Loads and parses a TOML file, substituting `${VAR}` references first.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DeskError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| DeskError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| DeskError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Command line flags take precedence over file values.
    pub fn apply_overrides(&mut self, cli: &CliConfig) {
        if let Some(api_base) = &cli.api_base {
            tracing::debug!("Overriding backend.base_url from command line");
            self.backend.base_url = api_base.clone();
        }
        if let Some(token) = &cli.token {
            self.backend.token = Some(token.clone());
        }
        if let Some(minutes) = cli.cache_minutes {
            self.cache.duration_minutes = Some(minutes);
        }
        if let Some(data_dir) = &cli.data_dir {
            self.storage.data_dir = Some(data_dir.clone());
        }
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("backend.base_url", &self.backend.base_url)?;

        if let Some(token) = &self.backend.token {
            validation::validate_non_empty_string("backend.token", token)?;
        }

        if let Some(endpoints) = &self.backend.endpoints {
            for (kind, path) in endpoints {
                kind.parse::<EntityKind>()?;
                validation::validate_endpoint_path(&format!("backend.endpoints.{}", kind), path)?;
            }
        }

        if let Some(minutes) = self.cache.duration_minutes {
            validation::validate_positive_number("cache.duration_minutes", minutes.max(0) as usize, 1)?;
        }

        if let Some(limit) = self.search.default_limit {
            validation::validate_positive_number("search.default_limit", limit, 1)?;
        }

        if let Some(columns) = self.dashboard.columns {
            validation::validate_range("dashboard.columns", columns, 1, 48)?;
        }

        if let Some(width) = self.dashboard.cell_width {
            validation::validate_positive_float("dashboard.cell_width", width)?;
        }

        if let Some(height) = self.dashboard.row_height {
            validation::validate_positive_float("dashboard.row_height", height)?;
        }

        validation::validate_path("storage.data_dir", self.data_dir())?;

        Ok(())
    }

    pub fn scoring_weights(&self) -> ScoringWeights {
        self.search.weights.clone().unwrap_or_default()
    }

    pub fn grid_metrics(&self) -> GridMetrics {
        let defaults = GridMetrics::default();
        GridMetrics {
            columns: self.dashboard.columns.unwrap_or(defaults.columns),
            cell_width: self.dashboard.cell_width.unwrap_or(defaults.cell_width),
            row_height: self.dashboard.row_height.unwrap_or(defaults.row_height),
        }
    }
}

impl ConfigProvider for TomlConfig {
    fn api_base_url(&self) -> &str {
        if self.backend.base_url.is_empty() {
            DEFAULT_API_BASE
        } else {
            &self.backend.base_url
        }
    }

    fn auth_token(&self) -> Option<&str> {
        self.backend.token.as_deref()
    }

    fn endpoint_for(&self, kind: EntityKind) -> String {
        self.backend
            .endpoints
            .as_ref()
            .and_then(|endpoints| {
                endpoints
                    .iter()
                    .find(|(name, _)| name.parse::<EntityKind>().ok() == Some(kind))
                    .map(|(_, path)| path.clone())
            })
            .unwrap_or_else(|| kind.default_endpoint().to_string())
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    fn cache_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cache.duration_minutes.unwrap_or(DEFAULT_CACHE_MINUTES))
    }

    fn search_limit(&self) -> usize {
        self.search.default_limit.unwrap_or(DEFAULT_SEARCH_LIMIT)
    }

    fn data_dir(&self) -> &str {
        self.storage.data_dir.as_deref().unwrap_or(DEFAULT_DATA_DIR)
    }

    fn grid_columns(&self) -> u32 {
        self.dashboard.columns.unwrap_or(DEFAULT_GRID_COLUMNS)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
