pub mod cache;
pub mod client;
pub mod types;

pub use client::{create_client, PredictionClient};
pub use types::{
    DateRange, ModelMetrics, ModelOutcome, PlotResponse, PredictResponse, PredictionPoint,
};
