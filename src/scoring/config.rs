use serde::{Deserialize, Serialize};

use super::table::ScoreTable;

/// Named breakpoint scale.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    /// MAE in hundreds of USD, MAPE in single-digit percent
    #[default]
    Crypto,
    /// MAE in tens of thousands, MAPE in low double-digit percent
    Large,
    /// Tables supplied in `mae_table` / `mape_table`
    Custom,
}

impl Scale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scale::Crypto => "crypto",
            Scale::Large => "large",
            Scale::Custom => "custom",
        }
    }
}

/// Main scoring configuration.
///
/// Example YAML:
/// ```yaml
/// scoring:
///   scale: crypto
///   weights: { mae: 0.4, mape: 0.6 }
/// ```
///
/// With `scale: custom`, both `mae_table` and `mape_table` are required
/// (see `ScoreTable` for their format).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    /// Breakpoint scale (default: crypto)
    #[serde(default)]
    pub scale: Option<Scale>,

    /// Weights applied to the two sub-scores (default: 0.4 / 0.6)
    #[serde(default)]
    pub weights: Option<Weights>,

    #[serde(default)]
    pub mae_table: Option<ScoreTable>,

    #[serde(default)]
    pub mape_table: Option<ScoreTable>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            scale: Some(Scale::Crypto),
            weights: Some(Weights::default()),
            mae_table: None,
            mape_table: None,
        }
    }
}

/// Sub-score weights. Must sum to 1.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Weights {
    pub mae: f64,
    pub mape: f64,
}

impl Default for Weights {
    fn default() -> Self {
        // Percentage error matters more than absolute error
        Self { mae: 0.4, mape: 0.6 }
    }
}
