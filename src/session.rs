use std::fmt;

use chrono::{DateTime, Utc};

use crate::buffered_eprintln;
use crate::fetch::{FetchOutcome, ScoredModel};
use crate::service::DateRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Requesting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A request is already outstanding; the predict action is disabled
    RequestInFlight,
    /// A response or failure arrived with no request outstanding
    NotRequesting,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::RequestInFlight => {
                write!(f, "A prediction request is already in flight")
            }
            SessionError::NotRequesting => write!(f, "No prediction request is in flight"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Dashboard state: selected model, date range, in-flight flag, and the
/// last successfully applied results.
///
/// A failed request leaves the previous results on display.
#[derive(Debug)]
pub struct Session {
    pub selected_model: String,
    range: Option<DateRange>,
    state: RequestState,
    models: Vec<ScoredModel>,
    results_range: Option<DateRange>,
    stale_since: Option<DateTime<Utc>>,
    last_error: Option<String>,
    last_updated: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(selected_model: impl Into<String>) -> Self {
        Self {
            selected_model: selected_model.into(),
            range: None,
            state: RequestState::Idle,
            models: Vec::new(),
            results_range: None,
            stale_since: None,
            last_error: None,
            last_updated: None,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == RequestState::Requesting
    }

    pub fn range(&self) -> Option<&DateRange> {
        self.range.as_ref()
    }

    /// Change the date range. Not allowed while a request is outstanding.
    pub fn set_range(&mut self, range: DateRange) -> Result<(), SessionError> {
        if self.is_loading() {
            return Err(SessionError::RequestInFlight);
        }
        self.range = Some(range);
        Ok(())
    }

    pub fn select_model(&mut self, name: impl Into<String>) {
        self.selected_model = name.into();
    }

    /// `Idle -> Requesting`
    pub fn begin_request(&mut self) -> Result<(), SessionError> {
        if self.is_loading() {
            return Err(SessionError::RequestInFlight);
        }
        self.state = RequestState::Requesting;
        Ok(())
    }

    /// `Requesting -> Idle`, replacing the displayed results
    pub fn apply_response(&mut self, outcome: FetchOutcome) -> Result<(), SessionError> {
        self.finish_request()?;
        self.models = outcome.models;
        self.results_range = Some(outcome.range);
        self.stale_since = outcome.stale_since;
        self.last_error = None;
        self.last_updated = Some(Utc::now());
        Ok(())
    }

    /// `Requesting -> Idle`, logging the error and keeping the previous results
    pub fn apply_failure(&mut self, error: &anyhow::Error) -> Result<(), SessionError> {
        self.finish_request()?;
        buffered_eprintln!("Error fetching predictions: {:#}", error);
        self.last_error = Some(format!("{:#}", error));
        Ok(())
    }

    fn finish_request(&mut self) -> Result<(), SessionError> {
        if !self.is_loading() {
            return Err(SessionError::NotRequesting);
        }
        self.state = RequestState::Idle;
        Ok(())
    }

    /// All scored models from the last applied response, best first
    pub fn models(&self) -> &[ScoredModel] {
        &self.models
    }

    /// The selected model's entry, matched case-insensitively
    pub fn selected(&self) -> Option<&ScoredModel> {
        self.models
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(&self.selected_model))
    }

    /// Date range the displayed results belong to
    pub fn results_range(&self) -> Option<&DateRange> {
        self.results_range.as_ref()
    }

    pub fn stale_since(&self) -> Option<DateTime<Utc>> {
        self.stale_since
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::score_response;
    use crate::scoring::ScoreEngine;
    use crate::service::{ModelMetrics, ModelOutcome, PredictResponse};
    use std::collections::BTreeMap;

    fn outcome(range: DateRange, models: &[(&str, f64, f64)]) -> FetchOutcome {
        let mut results = BTreeMap::new();
        for (name, mae, mape) in models {
            results.insert(
                name.to_string(),
                ModelOutcome::Metrics(ModelMetrics {
                    model_name: None,
                    runtime: 2000.0,
                    mae: *mae,
                    mape: *mape,
                    pred_list: vec![],
                }),
            );
        }
        let response = PredictResponse { results };
        let (models, skipped) = score_response(&response, &ScoreEngine::default());
        FetchOutcome {
            range,
            models,
            skipped,
            stale_since: None,
        }
    }

    fn november() -> DateRange {
        DateRange::parse("2024-11-01", "2024-11-30").unwrap()
    }

    #[test]
    fn test_new_session_is_idle_and_empty() {
        let session = Session::new("RandomForest");
        assert_eq!(session.state(), RequestState::Idle);
        assert!(session.models().is_empty());
        assert!(session.selected().is_none());
        assert!(session.range().is_none());
    }

    #[test]
    fn test_overlapping_request_rejected() {
        let mut session = Session::new("RandomForest");
        session.begin_request().unwrap();
        assert!(session.is_loading());
        assert_eq!(session.begin_request(), Err(SessionError::RequestInFlight));
    }

    #[test]
    fn test_range_locked_while_requesting() {
        let mut session = Session::new("RandomForest");
        session.set_range(november()).unwrap();
        session.begin_request().unwrap();
        let december = DateRange::parse("2024-12-01", "2024-12-31").unwrap();
        assert!(session.set_range(december).is_err());
        assert_eq!(session.range(), Some(&november()));
    }

    #[test]
    fn test_response_returns_to_idle_and_applies() {
        let mut session = Session::new("randomforest");
        session.begin_request().unwrap();
        let models = [("RandomForest", 150.25, 0.12), ("LSTM", 90.0, 0.1)];
        session.apply_response(outcome(november(), &models)).unwrap();

        assert_eq!(session.state(), RequestState::Idle);
        assert_eq!(session.models().len(), 2);
        assert_eq!(session.selected().unwrap().name, "RandomForest");
        assert_eq!(session.results_range(), Some(&november()));
        assert!(session.last_updated().is_some());
    }

    #[test]
    fn test_failure_keeps_previous_results() {
        let mut session = Session::new("LSTM");
        session.begin_request().unwrap();
        session.apply_response(outcome(november(), &[("LSTM", 140.55, 0.10)])).unwrap();
        let score_before = session.selected().unwrap().result.score;

        session.begin_request().unwrap();
        session.apply_failure(&anyhow::anyhow!("connection refused")).unwrap();

        assert_eq!(session.state(), RequestState::Idle);
        assert_eq!(session.selected().unwrap().result.score, score_before);
        assert_eq!(session.last_error(), Some("connection refused"));

        // Next success clears the error
        session.begin_request().unwrap();
        session.apply_response(outcome(november(), &[("LSTM", 140.55, 0.10)])).unwrap();
        assert!(session.last_error().is_none());
    }

    #[test]
    fn test_select_model_switches_card() {
        let mut session = Session::new("LSTM");
        session.begin_request().unwrap();
        let models = [("LSTM", 140.55, 0.10), ("ARIMA", 160.75, 0.13)];
        session.apply_response(outcome(november(), &models)).unwrap();
        session.select_model("ARIMA");
        assert_eq!(session.selected().unwrap().name, "ARIMA");
        session.select_model("SVM");
        assert!(session.selected().is_none());
    }

    #[test]
    fn test_completion_without_request_rejected() {
        let mut session = Session::new("LSTM");
        assert_eq!(
            session.apply_failure(&anyhow::anyhow!("x")),
            Err(SessionError::NotRequesting)
        );
        assert!(session.last_error().is_none());

        let result = session.apply_response(outcome(november(), &[("LSTM", 140.55, 0.10)]));
        assert_eq!(result, Err(SessionError::NotRequesting));
        assert!(session.models().is_empty());
        assert!(session.last_updated().is_none());

        // A completed request cannot be completed twice
        session.begin_request().unwrap();
        session.apply_response(outcome(november(), &[("LSTM", 140.55, 0.10)])).unwrap();
        assert_eq!(
            session.apply_failure(&anyhow::anyhow!("late")),
            Err(SessionError::NotRequesting)
        );
        assert!(session.last_error().is_none());
    }
}
