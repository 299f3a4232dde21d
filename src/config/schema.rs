use serde::{Deserialize, Serialize};

use crate::scoring::ScoringConfig;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_MODEL: &str = "RandomForest";

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,

    /// Model shown on the score card when none is given on the command line
    #[serde(default)]
    pub default_model: Option<String>,

    #[serde(default)]
    pub scoring: Option<ScoringConfig>,
}

impl Config {
    pub fn default_model(&self) -> &str {
        self.default_model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout, humantime format ("30s", "2m"). Default 2m.
    #[serde(default)]
    pub timeout: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: None,
        }
    }
}
