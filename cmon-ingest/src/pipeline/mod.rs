//! Row pipeline shared by the importer and the analyzer
//!
//! ```text
//! Sheet ─► header::locate ─► ColumnRoles ─┐
//! Criteria sheet ─► criteria::extract ────┼─► RowPipeline::process ─► ScoredRow
//! Cell fills ─► ColorClassifier ──────────┘
//! ```

pub mod color;
pub mod columns;
pub mod criteria;
pub mod header;
pub mod scoring;

pub use color::{ColorClassifier, ColorSample};
pub use columns::{ColumnRoles, RowFields};
pub use criteria::{CriteriaMap, CriteriaRule};
pub use scoring::{derive_priority, format_matches, KeywordMatch, RowScore, ScoringEngine};

use cmon_common::config::TomlConfig;

use crate::workbook::{CellValue, Sheet};

/// One data row after scoring, ready for reconciliation
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRow {
    pub name: Option<String>,
    pub code: Option<String>,
    pub notes: String,
    pub machine_type: Option<String>,
    pub color: ColorSample,
    pub score: f64,
    /// 0..=10
    pub criticality: i64,
    /// 1..=5
    pub priority: i64,
    pub matches: Vec<KeywordMatch>,
}

impl ScoredRow {
    /// Short label for log lines
    pub fn label(&self) -> &str {
        self.code
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("<unnamed>")
    }

    /// Measurement note: matches as `KEYWORD:weight` joined by `;`
    pub fn match_note(&self) -> String {
        format_matches(&self.matches)
    }
}

/// Scores data rows of one sheet against one rulebook
pub struct RowPipeline<'a> {
    criteria: &'a CriteriaMap,
    max_single: f64,
    classifier: ColorClassifier,
    engine: ScoringEngine,
}

impl<'a> RowPipeline<'a> {
    pub fn new(criteria: &'a CriteriaMap, config: &TomlConfig) -> Self {
        Self {
            criteria,
            max_single: criteria.max_weight(),
            classifier: ColorClassifier::new(config.color.clone()),
            engine: ScoringEngine::new(config.scoring.saturation_matches),
        }
    }

    /// Keyword score of a row, no color or field handling
    pub fn score(&self, row: &[CellValue]) -> RowScore {
        scoring::score(row, self.criteria)
    }

    /// Score data row `row_index` of `sheet`
    ///
    /// Returns `None` for rows without a name or code. The row color comes from the fills
    /// of the same sheet row, across the full sheet width.
    pub fn process(&self, sheet: &Sheet, row_index: usize, roles: &ColumnRoles) -> Option<ScoredRow> {
        let row = sheet.row(row_index)?;
        let fields = RowFields::read(row, roles);
        if !fields.is_identifiable() {
            return None;
        }

        let color = self
            .classifier
            .classify_row((0..sheet.width()).map(|col| sheet.fill(row_index, col)));
        let RowScore { score, matches } = self.score(row);
        let criticality = self.engine.normalize(score, self.max_single);
        let priority = derive_priority(criticality, color.color);

        Some(ScoredRow {
            name: fields.name,
            code: fields.code,
            notes: fields.notes,
            machine_type: fields.machine_type,
            color,
            score,
            criticality,
            priority,
            matches,
        })
    }
}
