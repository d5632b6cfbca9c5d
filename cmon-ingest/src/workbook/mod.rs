//! Workbook reader
//!
//! Cell values come from calamine. Cell fills are not exposed by calamine, so they are read
//! separately from the OOXML package (see [`fills`]) and attached to each [`Sheet`].
//!
//! Every sheet is stored as an absolute grid: row `r` / column `c` of a [`Sheet`] is sheet row
//! `r + 1` / column `c + 1` in spreadsheet terms, even when the used range starts further down
//! or to the right. Values and fills of one data row therefore always share the same index.

pub mod fills;

use calamine::{open_workbook, Data, Range, Reader, Xlsx, XlsxError};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub use fills::{FillReader, SheetFills};

/// Workbook reading errors
#[derive(Debug, Error)]
pub enum WorkbookError {
    /// Workbook file does not exist
    #[error("Workbook not found: {}", .0.display())]
    NotFound(PathBuf),

    /// File exists but is not a readable .xlsx workbook
    #[error("Failed to open workbook {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },

    /// Requested sheet is not in the workbook
    #[error("Sheet '{0}' not found")]
    MissingSheet(String),

    /// Sheet exists but its cells could not be read
    #[error("Failed to read sheet '{sheet}': {source}")]
    Sheet {
        sheet: String,
        #[source]
        source: XlsxError,
    },

    /// Package (zip container) could not be read
    #[error("Failed to read workbook package: {0}")]
    Package(#[from] zip::result::ZipError),

    /// Package part is not well-formed XML
    #[error("Malformed package part {part}: {message}")]
    Xml { part: String, message: String },

    /// File system operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One spreadsheet cell value
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    /// Convert a calamine cell
    ///
    /// Booleans, dates, durations and error cells keep their display form as text.
    pub fn from_data(data: &Data) -> Self {
        match data {
            Data::Empty => CellValue::Empty,
            Data::String(s) if s.is_empty() => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
            Data::DateTime(_) => CellValue::Text(data.to_string()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
            Data::Error(e) => CellValue::Text(e.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Display text, trimmed; `None` for empty cells and blank text
    pub fn trimmed_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            other => {
                let s = other.to_string();
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
        }
    }
}

impl fmt::Display for CellValue {
    /// Integral numbers print without a fractional part (`12`, not `12.0`)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            CellValue::Number(n) => write!(f, "{}", n),
        }
    }
}

/// One worksheet: rectangular absolute grid of values plus cell fills
#[derive(Debug, Clone)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<CellValue>>,
    width: usize,
    fills: SheetFills,
}

impl Sheet {
    /// Build a sheet from rows; short rows are padded with [`CellValue::Empty`]
    pub fn new(name: impl Into<String>, mut rows: Vec<Vec<CellValue>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, CellValue::Empty);
        }

        Self {
            name: name.into(),
            rows,
            width,
            fills: SheetFills::default(),
        }
    }

    pub fn with_fills(mut self, fills: SheetFills) -> Self {
        self.fills = fills;
        self
    }

    /// Convert a calamine range, padding it back to cell A1
    fn from_range(name: &str, range: &Range<Data>) -> Self {
        let (start_row, start_col) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));

        let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); start_row];
        for source_row in range.rows() {
            let mut row = vec![CellValue::Empty; start_col];
            row.extend(source_row.iter().map(CellValue::from_data));
            rows.push(row);
        }

        Self::new(name, rows)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[CellValue]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Cell at `(row, col)`; out-of-range positions read as empty
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Raw foreground fill color of the cell at `(row, col)`
    pub fn fill(&self, row: usize, col: usize) -> Option<&str> {
        self.fills.get(row, col)
    }
}

/// Open `.xlsx` workbook
pub struct Workbook {
    path: PathBuf,
    values: Xlsx<BufReader<File>>,
    fills: Option<FillReader>,
}

impl Workbook {
    /// Open the workbook at `path`
    ///
    /// Fails when the file is missing or not a workbook. An unreadable style part only
    /// disables fill colors (logged).
    pub fn open(path: &Path) -> Result<Self, WorkbookError> {
        if !path.exists() {
            return Err(WorkbookError::NotFound(path.to_path_buf()));
        }

        let values: Xlsx<_> = open_workbook(path).map_err(|source| WorkbookError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let fills = match FillReader::open(path) {
            Ok(reader) => Some(reader),
            Err(e) => {
                warn!("Cell fills unavailable for {}: {}", path.display(), e);
                None
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            values,
            fills,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.values.sheet_names()
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.values.sheet_names().iter().any(|n| n == name)
    }

    /// Load one sheet with its fills
    pub fn sheet(&mut self, name: &str) -> Result<Sheet, WorkbookError> {
        if !self.has_sheet(name) {
            return Err(WorkbookError::MissingSheet(name.to_string()));
        }

        let range = self
            .values
            .worksheet_range(name)
            .map_err(|source| WorkbookError::Sheet {
                sheet: name.to_string(),
                source,
            })?;

        let fills = match self.fills.as_mut() {
            Some(reader) => reader.sheet_fills(name).unwrap_or_else(|e| {
                warn!("Cell fills unavailable for sheet '{}': {}", name, e);
                SheetFills::default()
            }),
            None => SheetFills::default(),
        };

        let sheet = Sheet::from_range(name, &range).with_fills(fills);
        debug!(
            "Loaded sheet '{}': {} rows x {} columns",
            name,
            sheet.height(),
            sheet.width()
        );

        Ok(sheet)
    }
}
