//! Keyword rulebook from the criteria sheet
//!
//! The criteria sheet is free-form: each row holds one or more labels and one or more
//! numeric factors in no fixed columns. Every factor is paired with the label closest to
//! it on the same row.

use crate::workbook::{CellValue, Sheet};

/// One keyword and its weight
#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaRule {
    /// Uppercased label text
    pub keyword: String,
    pub weight: f64,
}

/// Keyword → weight mapping in first-seen order
///
/// Re-inserting a keyword replaces its weight but keeps its position, so matches are always
/// reported in rulebook order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CriteriaMap {
    rules: Vec<CriteriaRule>,
}

impl CriteriaMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, keyword: impl Into<String>, weight: f64) {
        let keyword = keyword.into();
        match self.rules.iter_mut().find(|r| r.keyword == keyword) {
            Some(rule) => rule.weight = weight,
            None => self.rules.push(CriteriaRule { keyword, weight }),
        }
    }

    pub fn get(&self, keyword: &str) -> Option<f64> {
        self.rules.iter().find(|r| r.keyword == keyword).map(|r| r.weight)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CriteriaRule> {
        self.rules.iter()
    }

    /// Largest single weight, 0 for an empty rulebook
    pub fn max_weight(&self) -> f64 {
        self.rules
            .iter()
            .map(|r| r.weight)
            .fold(None, |max: Option<f64>, w| Some(max.map_or(w, |m| m.max(w))))
            .unwrap_or(0.0)
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for CriteriaMap {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut map = CriteriaMap::new();
        for (keyword, weight) in iter {
            map.insert(keyword, weight);
        }
        map
    }
}

/// Build the rulebook from the criteria sheet
///
/// Rows without a label or without a factor contribute nothing. When two labels are equally
/// close to a factor, the leftmost wins.
pub fn extract(sheet: &Sheet) -> CriteriaMap {
    let mut map = CriteriaMap::new();

    for row in sheet.rows() {
        let mut texts: Vec<(usize, &str)> = Vec::new();
        let mut factors: Vec<(usize, f64)> = Vec::new();

        for (col, cell) in row.iter().enumerate() {
            match cell {
                CellValue::Empty => {}
                CellValue::Number(n) if n.is_finite() => factors.push((col, *n)),
                CellValue::Number(_) => {}
                CellValue::Text(s) => {
                    let trimmed = s.trim();
                    if !trimmed.is_empty() {
                        texts.push((col, trimmed));
                    }
                }
            }
        }

        for (factor_col, weight) in factors {
            let nearest = texts
                .iter()
                .fold(None::<(usize, &str)>, |best, &(text_col, text)| {
                    let dist = text_col.abs_diff(factor_col);
                    match best {
                        Some((best_dist, _)) if best_dist <= dist => best,
                        _ => Some((dist, text)),
                    }
                });

            if let Some((_, label)) = nearest {
                map.insert(label.to_uppercase(), weight);
            }
        }
    }

    map
}
