use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Inclusive calendar date range for a prediction request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            bail!("End date {} is before start date {}", end, start);
        }
        Ok(Self { start, end })
    }

    /// Parse two `YYYY-MM-DD` strings
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|_| anyhow::anyhow!("Invalid date '{}'. Use YYYY-MM-DD.", s))
        };
        Self::new(parse(start)?, parse(end)?)
    }

    /// Query string understood by the prediction service: Unix seconds at UTC midnight
    pub fn query(&self) -> String {
        format!(
            "startDate={}&endDate={}",
            midnight_timestamp(self.start),
            midnight_timestamp(self.end)
        )
    }

    /// Number of days covered, both ends included
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

fn midnight_timestamp(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start.format("%Y-%m-%d"), self.end.format("%Y-%m-%d"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionPoint {
    #[serde(alias = "Date")]
    pub date: String,
    #[serde(alias = "Predicted_Price")]
    pub price: f64,
}

/// Evaluation metrics the service reports for one model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    pub runtime: f64,
    pub mae: f64,
    /// Percentage points
    pub mape: f64,
    #[serde(default, deserialize_with = "deserialize_pred_list")]
    pub pred_list: Vec<PredictionPoint>,
}

/// Some models report predictions as a `{date: price}` map instead of a list
fn deserialize_pred_list<'de, D>(deserializer: D) -> Result<Vec<PredictionPoint>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PredList {
        Points(Vec<PredictionPoint>),
        ByDate(BTreeMap<String, f64>),
    }

    Ok(match PredList::deserialize(deserializer)? {
        PredList::Points(points) => points,
        PredList::ByDate(map) => map
            .into_iter()
            .map(|(date, price)| PredictionPoint { date, price })
            .collect(),
    })
}

/// Per-model entry in a response. The service reports a failing model inline
/// as `{"error": "..."}` instead of failing the whole request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ModelOutcome {
    Metrics(ModelMetrics),
    Failed { error: String },
    /// Anything else, e.g. `"mae": null` from a NaN on the service side
    Malformed(serde_json::Value),
}

/// Body of `GET /predict`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictResponse {
    pub results: BTreeMap<String, ModelOutcome>,
}

/// Body of `GET /predict_plot`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlotResponse {
    #[serde(default)]
    pub results: BTreeMap<String, ModelOutcome>,
    #[serde(rename = "priceChart", default)]
    pub price_chart: Option<String>,
    #[serde(rename = "MAEChart", default)]
    pub mae_chart: Option<String>,
    #[serde(rename = "RuntimeChart", default)]
    pub runtime_chart: Option<String>,
    #[serde(rename = "MAPEChart", default)]
    pub mape_chart: Option<String>,
}

impl PlotResponse {
    /// Chart paths the service produced, labelled, in display order
    pub fn charts(&self) -> Vec<(&'static str, &str)> {
        [
            ("Price trend", &self.price_chart),
            ("MAE", &self.mae_chart),
            ("Runtime", &self.runtime_chart),
            ("MAPE", &self.mape_chart),
        ]
        .into_iter()
        .filter_map(|(label, path)| path.as_deref().map(|p| (label, p)))
        .collect()
    }
}

/// Error body returned with non-2xx statuses
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
