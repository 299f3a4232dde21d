pub mod config;
pub mod engine;
pub mod grade;
pub mod metrics;
pub mod table;
pub mod validation;

pub use config::*;
pub use engine::{calculate_score, final_score, score_mae, score_mape, ScoreEngine, ScoreResult};
pub use grade::{rating, Grade};
pub use metrics::{Metric, MetricError, MetricPair};
pub use table::{Band, ScoreTable, Tail};
pub use validation::validate_scoring;
