use std::fmt;

/// Which raw metric a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Mae,
    Mape,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Mae => write!(f, "MAE"),
            Metric::Mape => write!(f, "MAPE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricError {
    InvalidMetric { metric: Metric, value: f64 },
}

impl fmt::Display for MetricError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricError::InvalidMetric { metric, value } => write!(
                f,
                "Invalid {}: {} (must be a finite, non-negative number)",
                metric, value
            ),
        }
    }
}

impl std::error::Error for MetricError {}

/// Validated (MAE, MAPE) pair for one model over one date range.
/// MAPE is in percentage points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricPair {
    mae: f64,
    mape: f64,
}

impl MetricPair {
    pub fn new(mae: f64, mape: f64) -> Result<Self, MetricError> {
        Ok(Self {
            mae: check(Metric::Mae, mae)?,
            mape: check(Metric::Mape, mape)?,
        })
    }

    pub fn mae(&self) -> f64 {
        self.mae
    }

    pub fn mape(&self) -> f64 {
        self.mape
    }
}

pub(crate) fn check(metric: Metric, value: f64) -> Result<f64, MetricError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(MetricError::InvalidMetric { metric, value })
    }
}
