use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::service::types::{DateRange, ErrorBody, PlotResponse, PredictResponse};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP client for the prediction service
#[derive(Debug, Clone)]
pub struct PredictionClient {
    http: reqwest::Client,
    base_url: String,
}

/// Create a client for the configured prediction service
pub fn create_client(config: &ServiceConfig) -> Result<PredictionClient> {
    // rustls 0.23+ needs a process-wide provider; Err means one is already installed
    let _ = rustls::crypto::ring::default_provider().install_default();

    let timeout = match config.timeout.as_deref() {
        Some(t) => humantime::parse_duration(t)
            .with_context(|| format!("Invalid service.timeout '{}'", t))?,
        None => DEFAULT_TIMEOUT,
    };

    let http = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("bitflow/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")?;

    Ok(PredictionClient {
        http,
        base_url: config.base_url.trim_end_matches('/').to_string(),
    })
}

impl PredictionClient {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch metrics and predictions for every model over `range`
    pub async fn predict(&self, range: &DateRange) -> Result<PredictResponse> {
        self.get_json("predict", range).await
    }

    /// Fetch metrics plus the chart paths rendered by the service
    pub async fn predict_plot(&self, range: &DateRange) -> Result<PlotResponse> {
        self.get_json("predict_plot", range).await
    }

    /// Resolve a chart path returned by the service against the base URL
    pub fn chart_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    fn endpoint(&self, route: &str, range: &DateRange) -> String {
        format!("{}/{}?{}", self.base_url, route, range.query())
    }

    async fn get_json<T: DeserializeOwned>(&self, route: &str, range: &DateRange) -> Result<T> {
        let url = self.endpoint(route, range);

        let response = self.http.get(&url).send().await.map_err(|e| {
            if e.is_connect() {
                anyhow!(
                    "Could not reach the prediction service at {}. Is it running?",
                    self.base_url
                )
            } else if e.is_timeout() {
                anyhow!("Prediction service timed out for {}", range)
            } else {
                anyhow!("Request to {} failed: {}", url, e)
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read prediction service response")?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| body.trim().to_string());
            return Err(anyhow!("Prediction service error ({}): {}", status, message));
        }

        serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse /{} response", route))
    }
}
