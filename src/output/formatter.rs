use std::io::IsTerminal;

use owo_colors::OwoColorize;
use serde::Serialize;

use crate::fetch::ScoredModel;
use crate::scoring::{Grade, ScoreResult};

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Final score with three decimals, as shown on the score card
pub fn format_score(score: f64) -> String {
    format!("{:.3}", score)
}

/// Metric exactly as reported, without a trailing ".0" ("150.25", "2300")
pub fn format_metric(value: f64) -> String {
    value.to_string()
}

/// Color a grade by letter: A green, B cyan, C yellow, D red
fn paint_grade(grade: Grade, text: &str) -> String {
    match grade.letter() {
        'A' => text.green().bold().to_string(),
        'B' => text.cyan().bold().to_string(),
        'C' => text.yellow().bold().to_string(),
        _ => text.red().bold().to_string(),
    }
}

/// Multi-line score card for one model
pub fn format_score_card(model: &ScoredModel, use_colors: bool) -> String {
    let grade = model.result.grade.to_string();
    let score = format!("Overall Score: {}/100", format_score(model.result.score));
    let mae = format_metric(model.metrics.mae);
    let mape = format!("{}%", format_metric(model.metrics.mape));
    let runtime = format_metric(model.metrics.runtime);

    if use_colors {
        format!(
            "{}\n  Grade: {}\n  {}\n  MAE: {}\n  MAPE: {}\n  Runtime: {}",
            model.name.red(),
            paint_grade(model.result.grade, &grade),
            score.dimmed(),
            mae.bold(),
            mape.bold(),
            runtime.bold()
        )
    } else {
        format!(
            "{}\n  Grade: {}\n  {}\n  MAE: {}\n  MAPE: {}\n  Runtime: {}",
            model.name, grade, score, mae, mape, runtime
        )
    }
}

/// Per-metric contribution lines for verbose output
pub fn format_breakdown(result: &ScoreResult) -> String {
    let mut lines = vec![format!("  Scale: {}", result.breakdown.scale.as_str())];
    for factor in &result.breakdown.factors {
        lines.push(format!(
            "  {:<5} {:>10} -> {:>7.3} x {:.2} = {:>7.3}",
            factor.label,
            format_metric(factor.value),
            factor.sub_score,
            factor.weight,
            factor.contribution
        ));
    }
    lines.join("\n")
}

/// Format models as a ranking table with columns: Index, Grade, Score, Model
/// No headers, 1-based index.
pub fn format_ranking_table(models: &[ScoredModel], use_colors: bool) -> String {
    if models.is_empty() {
        return "No model results.".to_string();
    }

    models
        .iter()
        .enumerate()
        .map(|(idx, model)| {
            let index_str = format!("{:>2}.", idx + 1);
            let grade_str = format!("{:<2}", model.result.grade);
            let score_str = format!("{:>7}", format_score(model.result.score));

            if use_colors {
                format!(
                    "{} {}  {}  {}",
                    index_str.dimmed(),
                    paint_grade(model.result.grade, &grade_str),
                    score_str.bold(),
                    model.name
                )
            } else {
                format!("{} {}  {}  {}", index_str, grade_str, score_str, model.name)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format models as tab-separated values for scripting
/// Columns: model, grade, score, mae, mape, runtime (no headers, no colors)
pub fn format_tsv(models: &[ScoredModel]) -> String {
    models
        .iter()
        .map(|m| {
            format!(
                "{}\t{}\t{}\t{}\t{}\t{}",
                m.name,
                m.result.grade,
                format_score(m.result.score),
                m.metrics.mae,
                m.metrics.mape,
                m.metrics.runtime
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Serialize)]
struct JsonModel<'a> {
    model: &'a str,
    grade: Grade,
    score: f64,
    mae_score: f64,
    mape_score: f64,
    mae: f64,
    mape: f64,
    runtime: f64,
}

/// Format models as a pretty JSON array
pub fn format_json(models: &[ScoredModel]) -> anyhow::Result<String> {
    let rows: Vec<JsonModel> = models
        .iter()
        .map(|m| JsonModel {
            model: &m.name,
            grade: m.result.grade,
            score: m.result.score,
            mae_score: m.result.mae_score,
            mape_score: m.result.mape_score,
            mae: m.metrics.mae,
            mape: m.metrics.mape,
            runtime: m.metrics.runtime,
        })
        .collect();
    Ok(serde_json::to_string_pretty(&rows)?)
}
