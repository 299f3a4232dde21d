use anyhow::{bail, Result};
use serde::Serialize;

use super::config::{Scale, ScoringConfig, Weights};
use super::grade::{rating, Grade};
use super::metrics::{check, Metric, MetricError, MetricPair};
use super::table::ScoreTable;

#[derive(Debug, Clone, Serialize)]
pub struct FactorContribution {
    pub label: String,       // "MAE" or "MAPE"
    pub value: f64,          // Raw metric value
    pub sub_score: f64,      // Table output, 0-100
    pub weight: f64,
    pub contribution: f64,   // sub_score * weight
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreBreakdown {
    pub scale: Scale,
    pub factors: Vec<FactorContribution>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreResult {
    pub mae_score: f64,
    pub mape_score: f64,
    pub score: f64,
    pub grade: Grade,
    pub breakdown: ScoreBreakdown,
}

/// Stateless scorer built from one pair of breakpoint tables and weights.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreEngine {
    scale: Scale,
    mae_table: ScoreTable,
    mape_table: ScoreTable,
    weights: Weights,
}

impl Default for ScoreEngine {
    fn default() -> Self {
        Self::for_scale(Scale::Crypto, Weights::default())
    }
}

impl ScoreEngine {
    /// Build an engine for a built-in scale. `Scale::Custom` has no built-in
    /// tables and resolves to `Scale::Crypto`; use `from_config` for it.
    pub fn for_scale(scale: Scale, weights: Weights) -> Self {
        let (scale, mae_table, mape_table) = match scale {
            Scale::Large => (Scale::Large, ScoreTable::large_mae(), ScoreTable::large_mape()),
            Scale::Crypto | Scale::Custom => (
                Scale::Crypto,
                ScoreTable::crypto_mae(),
                ScoreTable::crypto_mape(),
            ),
        };
        Self {
            scale,
            mae_table,
            mape_table,
            weights,
        }
    }

    /// Resolve a scoring config into an engine. Run `validate_scoring` first
    /// for complete error reporting; this only rejects a custom scale with
    /// missing tables.
    pub fn from_config(config: &ScoringConfig) -> Result<Self> {
        let scale = config.scale.unwrap_or_default();
        let weights = config.weights.unwrap_or_default();

        match scale {
            Scale::Custom => {
                let (Some(mae_table), Some(mape_table)) = (&config.mae_table, &config.mape_table)
                else {
                    bail!("scoring.scale is custom but mae_table and mape_table are not both set");
                };
                Ok(Self {
                    scale,
                    mae_table: mae_table.clone(),
                    mape_table: mape_table.clone(),
                    weights,
                })
            }
            _ => Ok(Self::for_scale(scale, weights)),
        }
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn weights(&self) -> Weights {
        self.weights
    }

    pub fn score_mae(&self, mae: f64) -> Result<f64, MetricError> {
        Ok(self.mae_table.evaluate(check(Metric::Mae, mae)?))
    }

    pub fn score_mape(&self, mape: f64) -> Result<f64, MetricError> {
        Ok(self.mape_table.evaluate(check(Metric::Mape, mape)?))
    }

    /// Weighted sum of the two sub-scores. Not clamped.
    pub fn final_score(&self, mae: f64, mape: f64) -> Result<f64, MetricError> {
        let pair = MetricPair::new(mae, mape)?;
        Ok(self.calculate(&pair).score)
    }

    /// Score a validated metric pair
    pub fn calculate(&self, pair: &MetricPair) -> ScoreResult {
        let mae_score = self.mae_table.evaluate(pair.mae());
        let mape_score = self.mape_table.evaluate(pair.mape());
        let score = mae_score * self.weights.mae + mape_score * self.weights.mape;

        let factors = vec![
            FactorContribution {
                label: Metric::Mae.to_string(),
                value: pair.mae(),
                sub_score: mae_score,
                weight: self.weights.mae,
                contribution: mae_score * self.weights.mae,
            },
            FactorContribution {
                label: Metric::Mape.to_string(),
                value: pair.mape(),
                sub_score: mape_score,
                weight: self.weights.mape,
                contribution: mape_score * self.weights.mape,
            },
        ];

        ScoreResult {
            mae_score,
            mape_score,
            score,
            grade: rating(score),
            breakdown: ScoreBreakdown {
                scale: self.scale,
                factors,
            },
        }
    }
}

/// Validate raw metrics and score them with `engine`
pub fn calculate_score(
    mae: f64,
    mape: f64,
    engine: &ScoreEngine,
) -> Result<ScoreResult, MetricError> {
    let pair = MetricPair::new(mae, mape)?;
    Ok(engine.calculate(&pair))
}

/// MAE sub-score on the default (crypto) scale
pub fn score_mae(mae: f64) -> Result<f64, MetricError> {
    ScoreEngine::default().score_mae(mae)
}

/// MAPE sub-score on the default (crypto) scale
pub fn score_mape(mape: f64) -> Result<f64, MetricError> {
    ScoreEngine::default().score_mape(mape)
}

/// `0.4 * score_mae(mae) + 0.6 * score_mape(mape)` on the default scale
pub fn final_score(mae: f64, mape: f64) -> Result<f64, MetricError> {
    ScoreEngine::default().final_score(mae, mape)
}
