pub mod formatter;

pub use formatter::{
    format_breakdown, format_json, format_metric, format_ranking_table, format_score,
    format_score_card, format_tsv, should_use_colors,
};
