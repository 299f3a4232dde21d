use serde::{Deserialize, Serialize};

/// Sub-score awarded at or below a table's ceiling.
pub const CEILING_SCORE: f64 = 100.0;

/// Piecewise-linear breakpoint table mapping a raw error metric to a sub-score.
///
/// Values at or below `ceiling` score 100. Each band covers
/// `(previous upper, upper]` and interpolates linearly from `start` down to
/// `end`. Past the last band the tail decays from `tail.start` and is floored
/// at zero.
///
/// Example YAML:
/// ```yaml
/// ceiling: 100
/// bands:
///   - { upper: 500, start: 90, end: 80 }
///   - { upper: 1000, start: 80, end: 70 }
/// tail: { start: 70, zero_at: 5000 }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoreTable {
    pub ceiling: f64,
    #[serde(default)]
    pub bands: Vec<Band>,
    pub tail: Tail,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Band {
    pub upper: f64,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Tail {
    pub start: f64,
    /// Metric value at which the tail reaches zero
    pub zero_at: f64,
}

impl Band {
    const fn new(upper: f64, start: f64, end: f64) -> Self {
        Self { upper, start, end }
    }
}

impl ScoreTable {
    /// MAE table used by the Bitcoin dashboard (USD, hundreds scale).
    pub fn crypto_mae() -> Self {
        Self {
            ceiling: 100.0,
            bands: vec![
                Band::new(500.0, 90.0, 80.0),
                Band::new(1000.0, 80.0, 70.0),
                Band::new(2000.0, 70.0, 60.0),
                Band::new(5000.0, 60.0, 40.0),
            ],
            tail: Tail {
                start: 40.0,
                zero_at: 10_000.0,
            },
        }
    }

    /// MAPE table used by the Bitcoin dashboard (percentage points).
    pub fn crypto_mape() -> Self {
        Self {
            ceiling: 1.0,
            bands: vec![
                Band::new(3.0, 90.0, 80.0),
                Band::new(5.0, 80.0, 70.0),
                Band::new(10.0, 70.0, 60.0),
                Band::new(20.0, 60.0, 40.0),
            ],
            tail: Tail {
                start: 40.0,
                zero_at: 40.0,
            },
        }
    }

    /// MAE table for the tens-of-thousands scale.
    pub fn large_mae() -> Self {
        Self {
            ceiling: 1000.0,
            bands: vec![
                Band::new(5000.0, 90.0, 80.0),
                Band::new(10_000.0, 80.0, 70.0),
                Band::new(15_000.0, 70.0, 60.0),
                Band::new(20_000.0, 60.0, 40.0),
            ],
            tail: Tail {
                start: 40.0,
                zero_at: 25_000.0,
            },
        }
    }

    /// MAPE table for the low-double-digit percent scale.
    pub fn large_mape() -> Self {
        Self {
            ceiling: 3.0,
            bands: vec![
                Band::new(5.0, 90.0, 80.0),
                Band::new(8.0, 80.0, 70.0),
                Band::new(10.0, 70.0, 60.0),
                Band::new(20.0, 60.0, 40.0),
            ],
            tail: Tail {
                start: 40.0,
                zero_at: 30.0,
            },
        }
    }

    /// Evaluate the table at `value`. Callers are expected to pass a finite,
    /// non-negative metric (see `MetricPair::new`).
    pub fn evaluate(&self, value: f64) -> f64 {
        if value <= self.ceiling {
            return CEILING_SCORE;
        }

        let mut lower = self.ceiling;
        for band in &self.bands {
            if value <= band.upper {
                let width = band.upper - lower;
                return band.start - (value - lower) * (band.start - band.end) / width;
            }
            lower = band.upper;
        }

        let span = self.tail.zero_at - lower;
        (self.tail.start - (value - lower) * self.tail.start / span).max(0.0)
    }

    /// Upper bound of the last band, or the ceiling when there are no bands
    pub fn last_upper(&self) -> f64 {
        self.bands.last().map(|b| b.upper).unwrap_or(self.ceiling)
    }

    /// Check that the table is well formed and non-increasing.
    /// Returns every problem found, each prefixed with `name`.
    pub fn validate(&self, name: &str) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !self.ceiling.is_finite() || self.ceiling < 0.0 {
            errors.push(format!("{}.ceiling: must be a non-negative number", name));
        }

        let mut lower = self.ceiling;
        let mut previous_score = CEILING_SCORE;
        for (i, band) in self.bands.iter().enumerate() {
            let prefix = format!("{}.bands[{}]", name, i);
            if !band.upper.is_finite() || band.upper <= lower {
                errors.push(format!(
                    "{}.upper: {} must be greater than {}",
                    prefix, band.upper, lower
                ));
            }
            for (field, score) in [("start", band.start), ("end", band.end)] {
                if !(0.0..=CEILING_SCORE).contains(&score) {
                    errors.push(format!("{}.{}: {} is outside 0-100", prefix, field, score));
                }
            }
            if band.end > band.start {
                errors.push(format!(
                    "{}: end ({}) must not exceed start ({})",
                    prefix, band.end, band.start
                ));
            }
            if band.start > previous_score {
                errors.push(format!(
                    "{}.start: {} exceeds the preceding score {}",
                    prefix, band.start, previous_score
                ));
            }
            lower = band.upper;
            previous_score = band.end;
        }

        if !(0.0..=CEILING_SCORE).contains(&self.tail.start) {
            errors.push(format!("{}.tail.start: {} is outside 0-100", name, self.tail.start));
        } else if self.tail.start > previous_score {
            errors.push(format!(
                "{}.tail.start: {} exceeds the preceding score {}",
                name, self.tail.start, previous_score
            ));
        }
        if !self.tail.zero_at.is_finite() || self.tail.zero_at <= lower {
            errors.push(format!(
                "{}.tail.zero_at: {} must be greater than {}",
                name, self.tail.zero_at, lower
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceiling_scores_full() {
        let table = ScoreTable::crypto_mae();
        assert_eq!(table.evaluate(0.0), 100.0);
        assert_eq!(table.evaluate(100.0), 100.0);
    }

    #[test]
    fn test_crypto_mae_breakpoints() {
        let table = ScoreTable::crypto_mae();
        assert_eq!(table.evaluate(500.0), 80.0);
        assert_eq!(table.evaluate(1000.0), 70.0);
        assert_eq!(table.evaluate(2000.0), 60.0);
        assert_eq!(table.evaluate(5000.0), 40.0);
        assert_eq!(table.evaluate(10_000.0), 0.0);
    }

    #[test]
    fn test_discontinuity_above_ceiling() {
        // Just past the ceiling the first band starts at 90, not 100
        let table = ScoreTable::crypto_mae();
        let just_above = table.evaluate(100.0001);
        assert!(just_above < 90.0 && just_above > 89.99);
    }

    #[test]
    fn test_crypto_mape_breakpoints() {
        let table = ScoreTable::crypto_mape();
        assert_eq!(table.evaluate(1.0), 100.0);
        assert_eq!(table.evaluate(3.0), 80.0);
        assert_eq!(table.evaluate(5.0), 70.0);
        assert_eq!(table.evaluate(10.0), 60.0);
        assert_eq!(table.evaluate(20.0), 40.0);
    }

    #[test]
    fn test_tail_floors_at_zero() {
        let table = ScoreTable::crypto_mape();
        assert_eq!(table.evaluate(40.0), 0.0);
        assert_eq!(table.evaluate(1_000.0), 0.0);
        // 40 - (30 - 20) * 2 = 20
        assert!((table.evaluate(30.0) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_large_scale_tails() {
        assert_eq!(ScoreTable::large_mae().evaluate(25_000.0), 0.0);
        assert_eq!(ScoreTable::large_mape().evaluate(35.0), 0.0);
        assert_eq!(ScoreTable::large_mae().evaluate(1000.0), 100.0);
        assert_eq!(ScoreTable::large_mape().evaluate(5.0), 80.0);
    }

    #[test]
    fn test_table_without_bands() {
        let table = ScoreTable {
            ceiling: 10.0,
            bands: vec![],
            tail: Tail {
                start: 50.0,
                zero_at: 20.0,
            },
        };
        assert_eq!(table.evaluate(5.0), 100.0);
        assert!((table.evaluate(15.0) - 25.0).abs() < 1e-9);
        assert_eq!(table.evaluate(25.0), 0.0);
        assert_eq!(table.last_upper(), 10.0);
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(ScoreTable::crypto_mae().validate("mae").is_ok());
        assert!(ScoreTable::crypto_mape().validate("mape").is_ok());
        assert!(ScoreTable::large_mae().validate("mae").is_ok());
        assert!(ScoreTable::large_mape().validate("mape").is_ok());
    }

    #[test]
    fn test_validate_rejects_unordered_uppers() {
        let mut table = ScoreTable::crypto_mae();
        table.bands[1].upper = 400.0;
        let errors = table.validate("mae_table").unwrap_err();
        assert!(errors[0].contains("mae_table.bands[1].upper"));
    }

    #[test]
    fn test_validate_rejects_increasing_band() {
        let mut table = ScoreTable::crypto_mape();
        table.bands[0].end = 95.0;
        let errors = table.validate("mape_table").unwrap_err();
        assert!(errors.iter().any(|e| e.contains("must not exceed start")));
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let table = ScoreTable {
            ceiling: -1.0,
            bands: vec![Band::new(10.0, 120.0, 80.0)],
            tail: Tail {
                start: 90.0,
                zero_at: 5.0,
            },
        };
        let errors = table.validate("t").unwrap_err();
        // ceiling, start out of range, start above ceiling score,
        // tail above preceding score, zero_at not past last upper
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn test_table_yaml_parse() {
        let yaml = r#"
ceiling: 100
bands:
  - { upper: 500, start: 90, end: 80 }
tail: { start: 80, zero_at: 1000 }
"#;
        let table: ScoreTable = serde_saphyr::from_str(yaml).unwrap();
        assert_eq!(table.bands.len(), 1);
        assert_eq!(table.tail.zero_at, 1000.0);
        assert!(table.validate("mae_table").is_ok());
    }
}
