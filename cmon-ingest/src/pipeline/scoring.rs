//! Keyword scoring, criticality normalization and priority derivation

use cmon_common::db::{clamp_criticality, clamp_priority, SeverityColor, CRITICALITY_MAX};

use super::criteria::CriteriaMap;
use crate::workbook::CellValue;

/// Keyword found in a row, with the weight it contributed
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordMatch {
    pub keyword: String,
    pub weight: f64,
}

/// Raw keyword score of one row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowScore {
    pub score: f64,
    /// Matches in rulebook order
    pub matches: Vec<KeywordMatch>,
}

/// Row text as seen by keyword matching: non-empty cells joined by one space, uppercased
pub fn row_text(row: &[CellValue]) -> String {
    row.iter()
        .filter(|c| !c.is_empty())
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Sum the weights of every keyword occurring in the row
///
/// Plain substring matching: `PUMP` also matches `PUMPS` and `SUMPUMP`.
pub fn score(row: &[CellValue], criteria: &CriteriaMap) -> RowScore {
    let text = row_text(row);
    let mut result = RowScore::default();

    for rule in criteria.iter() {
        if !rule.keyword.is_empty() && text.contains(&rule.keyword) {
            result.score += rule.weight;
            result.matches.push(KeywordMatch {
                keyword: rule.keyword.clone(),
                weight: rule.weight,
            });
        }
    }

    result
}

/// Scales raw scores onto the 0-10 criticality range
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    saturation_matches: f64,
}

impl ScoringEngine {
    /// `saturation_matches`: number of maximum-weight hits that reach criticality 10
    pub fn new(saturation_matches: f64) -> Self {
        Self { saturation_matches }
    }

    /// `round_half_even(score / (max_single * saturation) * 10)`, clamped to 0..=10
    ///
    /// A rulebook without a positive weight gives 0.
    pub fn normalize(&self, score: f64, max_single: f64) -> i64 {
        let denominator = max_single * self.saturation_matches;
        if max_single <= 0.0 || denominator <= 0.0 {
            return 0;
        }

        let scaled = (score / denominator * CRITICALITY_MAX as f64).round_ties_even();
        if scaled.is_nan() {
            return 0;
        }
        clamp_criticality(scaled.clamp(0.0, CRITICALITY_MAX as f64) as i64)
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(3.0)
    }
}

/// Machine priority from criticality, overridden entirely by a detected color
pub fn derive_priority(criticality: i64, color: Option<SeverityColor>) -> i64 {
    match color {
        Some(color) => color.priority(),
        None => clamp_priority(1 + clamp_criticality(criticality) * 4 / 10),
    }
}

/// Weight as text with at least one decimal (`4.0`, `2.5`)
pub fn format_weight(weight: f64) -> String {
    if weight.fract() == 0.0 && weight.abs() < 1e16 {
        format!("{:.1}", weight)
    } else {
        weight.to_string()
    }
}

/// Measurement note listing the matches: `PUMP:4.0;LEAK:2.5`
pub fn format_matches(matches: &[KeywordMatch]) -> String {
    matches
        .iter()
        .map(|m| format!("{}:{}", m.keyword, format_weight(m.weight)))
        .collect::<Vec<_>>()
        .join(";")
}
