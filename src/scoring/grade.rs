use serde::{Deserialize, Serialize};
use std::fmt;

/// Letter grade derived from a final score.
///
/// Variants are declared worst-first so the derived ordering ranks a better
/// grade higher (`Grade::APlus > Grade::DMinus`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "D-")]
    DMinus,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "D+")]
    DPlus,
    #[serde(rename = "C-")]
    CMinus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A+")]
    APlus,
}

/// Closed-below thresholds, highest first. Anything below the last is D-.
const THRESHOLDS: [(f64, Grade); 11] = [
    (95.0, Grade::APlus),
    (90.0, Grade::A),
    (85.0, Grade::AMinus),
    (80.0, Grade::BPlus),
    (75.0, Grade::B),
    (70.0, Grade::BMinus),
    (65.0, Grade::CPlus),
    (60.0, Grade::C),
    (55.0, Grade::CMinus),
    (50.0, Grade::DPlus),
    (45.0, Grade::D),
];

/// Map a final score to its grade. The first threshold the score reaches wins.
/// Scores above 100 are A+; negative or NaN scores are D-.
pub fn rating(final_score: f64) -> Grade {
    THRESHOLDS
        .iter()
        .find(|(threshold, _)| final_score >= *threshold)
        .map(|(_, grade)| *grade)
        .unwrap_or(Grade::DMinus)
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::AMinus => "A-",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::BMinus => "B-",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::CMinus => "C-",
            Grade::DPlus => "D+",
            Grade::D => "D",
            Grade::DMinus => "D-",
        }
    }

    /// Letter without modifier ('A'..='D'), used for coloring
    pub fn letter(&self) -> char {
        self.as_str().chars().next().unwrap_or('D')
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // pad() so width/alignment specifiers work in tables
        f.pad(self.as_str())
    }
}
