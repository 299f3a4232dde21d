use super::config::{Scale, ScoringConfig};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Validate scoring configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_scoring(config: &ScoringConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if let Some(weights) = config.weights {
        for (name, weight) in [("mae", weights.mae), ("mape", weights.mape)] {
            if !weight.is_finite() || weight < 0.0 {
                errors.push(format!("scoring.weights.{}: must be a non-negative number", name));
            }
        }
        let sum = weights.mae + weights.mape;
        if sum.is_finite() && (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            errors.push(format!("scoring.weights: mae + mape must equal 1 (got {})", sum));
        }
    }

    let scale = config.scale.unwrap_or_default();
    for (name, table) in [("mae_table", &config.mae_table), ("mape_table", &config.mape_table)] {
        match (scale, table) {
            (Scale::Custom, Some(table)) => {
                if let Err(table_errors) = table.validate(&format!("scoring.{}", name)) {
                    errors.extend(table_errors);
                }
            }
            (Scale::Custom, None) => {
                errors.push(format!("scoring.{}: required when scale is custom", name));
            }
            (_, Some(_)) => {
                errors.push(format!("scoring.{}: only used when scale is custom", name));
            }
            (_, None) => {}
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
