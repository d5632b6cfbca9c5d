//! Database models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest machine priority
pub const PRIORITY_MIN: i64 = 1;

/// Highest machine priority
pub const PRIORITY_MAX: i64 = 5;

/// Highest measurement criticality (lowest is 0)
pub const CRITICALITY_MAX: i64 = 10;

/// Sentinel tool tagging measurements created by the spreadsheet import
pub const AUTO_IMPORT_TOOL: &str = "AutoImport";

/// Description stored with the sentinel tool
pub const AUTO_IMPORT_TOOL_DESCRIPTION: &str = "Measurements imported from the condition matrix workbook";

/// Severity recovered from a spreadsheet fill color
///
/// Stored in `machines.color` as its lowercase English name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityColor {
    /// Needs repair
    Red,
    /// Needs review
    Yellow,
    /// Needs attention
    Blue,
    /// Fine
    Green,
}

impl SeverityColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityColor::Red => "red",
            SeverityColor::Yellow => "yellow",
            SeverityColor::Blue => "blue",
            SeverityColor::Green => "green",
        }
    }

    /// Parse the stored column value; unknown text yields `None`
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "red" => Some(SeverityColor::Red),
            "yellow" => Some(SeverityColor::Yellow),
            "blue" => Some(SeverityColor::Blue),
            "green" => Some(SeverityColor::Green),
            _ => None,
        }
    }

    /// Machine priority implied by this color
    pub fn priority(&self) -> i64 {
        match self {
            SeverityColor::Red => 5,
            SeverityColor::Yellow => 4,
            SeverityColor::Blue => 3,
            SeverityColor::Green => 1,
        }
    }
}

impl fmt::Display for SeverityColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    pub id: i64,
    pub name: String,
    pub hac_code: Option<String>,
    pub notes: String,
    pub priority: i64,
    pub machine_group: i64,
    pub color: Option<SeverityColor>,
    pub color_hex: Option<String>,
    pub machine_type: Option<String>,
}

/// Tool record (measurement source)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// Measurement record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub id: i64,
    pub machine_id: i64,
    pub tool_id: i64,
    pub date: String,
    pub criticality: Option<i64>,
    pub note: Option<String>,
    pub severity: Option<String>,
    pub repair_time: Option<String>,
}

/// Clamp a priority into `[PRIORITY_MIN, PRIORITY_MAX]`
pub fn clamp_priority(priority: i64) -> i64 {
    priority.clamp(PRIORITY_MIN, PRIORITY_MAX)
}

/// Clamp a criticality into `[0, CRITICALITY_MAX]`
pub fn clamp_criticality(criticality: i64) -> i64 {
    criticality.clamp(0, CRITICALITY_MAX)
}
