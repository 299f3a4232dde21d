use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::buffered_eprintln;
use crate::scoring::{calculate_score, ScoreEngine, ScoreResult};
use crate::service::cache::{read_cached_response, write_cached_response, CacheConfig};
use crate::service::{DateRange, ModelMetrics, ModelOutcome, PredictResponse, PredictionClient};

/// One model's metrics with its computed score
#[derive(Debug, Clone)]
pub struct ScoredModel {
    pub name: String,
    pub metrics: ModelMetrics,
    pub result: ScoreResult,
}

/// A model the service could not evaluate, or whose metrics were rejected
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedModel {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub range: DateRange,
    /// Sorted by score descending, then by name
    pub models: Vec<ScoredModel>,
    pub skipped: Vec<SkippedModel>,
    /// Set when the request failed and a cached response was scored instead
    pub stale_since: Option<DateTime<Utc>>,
}

/// Score every model in a response. Failed models and invalid metrics are
/// reported in the second list instead of aborting the whole response.
pub fn score_response(
    response: &PredictResponse,
    engine: &ScoreEngine,
) -> (Vec<ScoredModel>, Vec<SkippedModel>) {
    let mut scored = Vec::new();
    let mut skipped = Vec::new();

    for (name, outcome) in &response.results {
        match outcome {
            ModelOutcome::Metrics(metrics) => {
                match calculate_score(metrics.mae, metrics.mape, engine) {
                    Ok(result) => scored.push(ScoredModel {
                        name: name.clone(),
                        metrics: metrics.clone(),
                        result,
                    }),
                    Err(e) => skipped.push(SkippedModel {
                        name: name.clone(),
                        reason: e.to_string(),
                    }),
                }
            }
            ModelOutcome::Failed { error } => skipped.push(SkippedModel {
                name: name.clone(),
                reason: error.clone(),
            }),
            ModelOutcome::Malformed(_) => skipped.push(SkippedModel {
                name: name.clone(),
                reason: "Malformed metrics (mae, mape and runtime must be numbers)".to_string(),
            }),
        }
    }

    sort_models(&mut scored);
    (scored, skipped)
}

/// Sort by score descending; ties resolve alphabetically for stable output
pub fn sort_models(models: &mut [ScoredModel]) {
    models.sort_by(|a, b| {
        b.result
            .score
            .partial_cmp(&a.result.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// Request predictions for `range`, score them, and keep the result cache
/// current. When the request fails and a cached response for the same range
/// exists, that response is scored and returned with `stale_since` set.
pub async fn fetch_and_score(
    client: &PredictionClient,
    range: &DateRange,
    engine: &ScoreEngine,
    cache_config: &CacheConfig,
    verbose: bool,
) -> Result<FetchOutcome> {
    if verbose {
        let cache_status = if cache_config.enabled {
            "enabled"
        } else {
            "disabled (--no-cache)"
        };
        buffered_eprintln!("Cache: {}", cache_status);
        buffered_eprintln!(
            "Requesting predictions for {} ({} days) from {}",
            range,
            range.days(),
            client.base_url()
        );
    }

    let (response, stale_since) = match client.predict(range).await {
        Ok(response) => {
            if cache_config.enabled {
                if let Err(e) = write_cached_response(&cache_config.path, range, &response) {
                    buffered_eprintln!("Warning: {}", e);
                }
            }
            (response, None)
        }
        Err(e) => {
            let cached = if cache_config.enabled {
                read_cached_response(&cache_config.path, range)
            } else {
                None
            };
            match cached {
                Some(cached) => {
                    buffered_eprintln!("Request failed: {:#}", e);
                    (cached.response, Some(cached.fetched_at))
                }
                None => return Err(e),
            }
        }
    };

    let (models, skipped) = score_response(&response, engine);

    for skip in &skipped {
        buffered_eprintln!("Skipped {}: {}", skip.name, skip.reason);
    }
    if verbose {
        buffered_eprintln!("Scored {} models, skipped {}", models.len(), skipped.len());
    }

    Ok(FetchOutcome {
        range: *range,
        models,
        skipped,
        stale_since,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::scoring::Grade;
    use crate::service::cache::clear_cache;
    use crate::service::create_client;
    use std::collections::BTreeMap;

    fn metrics(mae: f64, mape: f64) -> ModelOutcome {
        ModelOutcome::Metrics(ModelMetrics {
            model_name: None,
            runtime: 1000.0,
            mae,
            mape,
            pred_list: vec![],
        })
    }

    fn response(entries: Vec<(&str, ModelOutcome)>) -> PredictResponse {
        PredictResponse {
            results: entries
                .into_iter()
                .map(|(name, outcome)| (name.to_string(), outcome))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_score_response_sorts_by_score() {
        let resp = response(vec![
            ("ARIMA", metrics(1500.0, 4.0)),
            ("LSTM", metrics(90.0, 0.5)),
            ("Prophet", metrics(600.0, 2.0)),
        ]);
        let (scored, skipped) = score_response(&resp, &ScoreEngine::default());
        assert!(skipped.is_empty());
        let names: Vec<_> = scored.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["LSTM", "Prophet", "ARIMA"]);
        assert_eq!(scored[0].result.grade, Grade::APlus);
    }

    #[test]
    fn test_ties_sorted_by_name() {
        let resp = response(vec![
            ("XGBoost", metrics(50.0, 0.5)),
            ("ARIMA", metrics(50.0, 0.5)),
        ]);
        let (scored, _) = score_response(&resp, &ScoreEngine::default());
        assert_eq!(scored[0].name, "ARIMA");
        assert_eq!(scored[1].name, "XGBoost");
    }

    #[test]
    fn test_failed_and_invalid_models_skipped() {
        let resp = response(vec![
            ("LSTM", metrics(90.0, 0.5)),
            (
                "Prophet",
                ModelOutcome::Failed {
                    error: "timeout".to_string(),
                },
            ),
            ("ARIMA", metrics(-3.0, 1.0)),
        ]);
        let (scored, skipped) = score_response(&resp, &ScoreEngine::default());
        assert_eq!(scored.len(), 1);
        assert_eq!(skipped.len(), 2);
        assert_eq!(skipped[0].name, "ARIMA");
        assert!(skipped[0].reason.contains("Invalid MAE"));
        assert_eq!(
            skipped[1],
            SkippedModel {
                name: "Prophet".to_string(),
                reason: "timeout".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_entry_skipped_with_reason() {
        let resp: PredictResponse = serde_json::from_str(
            r#"{ "results": {
                "LSTM": { "runtime": 3200, "mae": 140.55, "mape": 0.10, "pred_list": [] },
                "ARIMA": { "runtime": 1800, "mae": null, "mape": 0.13, "pred_list": [] }
            } }"#,
        )
        .unwrap();
        let (scored, skipped) = score_response(&resp, &ScoreEngine::default());
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].name, "LSTM");
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].name, "ARIMA");
        assert!(skipped[0].reason.starts_with("Malformed metrics"));
    }

    #[tokio::test]
    async fn test_failed_request_falls_back_to_cache() {
        let cache_path = std::env::temp_dir().join("bitflow_test_fetch_fallback");
        let _ = clear_cache(&cache_path);
        let cache_config = CacheConfig {
            enabled: true,
            path: cache_path.clone(),
        };
        let range = DateRange::parse("2024-11-01", "2024-11-30").unwrap();
        let client = create_client(&ServiceConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Some("5s".to_string()),
        })
        .unwrap();
        let engine = ScoreEngine::default();

        // Nothing cached yet: the error propagates
        assert!(fetch_and_score(&client, &range, &engine, &cache_config, false)
            .await
            .is_err());

        write_cached_response(&cache_path, &range, &response(vec![("LSTM", metrics(140.55, 0.10))]))
            .unwrap();

        let _guard = crate::stderr_buffer::TEST_GUARD
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        crate::stderr_buffer::activate();
        let outcome = fetch_and_score(&client, &range, &engine, &cache_config, false)
            .await
            .unwrap();
        let messages = crate::stderr_buffer::drain();
        assert!(outcome.stale_since.is_some());
        // The stale notice is left to the caller that renders the results
        assert!(messages.iter().any(|m| m.starts_with("Request failed")));
        assert!(!messages.iter().any(|m| m.contains("cached results")));
        assert_eq!(outcome.models.len(), 1);
        assert_eq!(outcome.models[0].name, "LSTM");

        // Disabled cache ignores the stored entry
        let disabled = CacheConfig {
            enabled: false,
            path: cache_path.clone(),
        };
        assert!(fetch_and_score(&client, &range, &engine, &disabled, false)
            .await
            .is_err());

        let _ = clear_cache(&cache_path);
    }
}
