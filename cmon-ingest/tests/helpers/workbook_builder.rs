//! Condition matrix workbooks generated with rust_xlsxwriter

use rust_xlsxwriter::{Color, Format, Workbook, XlsxError};
use std::path::{Path, PathBuf};

pub const MAIN_SHEET: &str = "CM Matrix equipos principales";
pub const CRITERIA_SHEET: &str = "Criterios";

/// One data row of the main sheet
#[derive(Debug, Clone, Default)]
pub struct MatrixRow {
    pub area: &'static str,
    pub name: Option<&'static str>,
    pub code: Option<&'static str>,
    pub machine_type: Option<&'static str>,
    pub comment: Option<&'static str>,
    /// Solid fill applied to every written cell of the row, as 0xRRGGBB
    pub fill: Option<u32>,
}

impl MatrixRow {
    pub fn new(name: &'static str, code: &'static str) -> Self {
        Self {
            area: "Planta 1",
            name: Some(name),
            code: Some(code),
            ..Default::default()
        }
    }

    pub fn comment(mut self, comment: &'static str) -> Self {
        self.comment = Some(comment);
        self
    }

    pub fn fill(mut self, rgb: u32) -> Self {
        self.fill = Some(rgb);
        self
    }
}

/// Workbook layout
#[derive(Debug, Clone)]
pub struct MatrixLayout {
    /// Title rows written above the header
    pub title_rows: u32,
    /// Column of the AREA header
    pub first_col: u16,
    pub rows: Vec<MatrixRow>,
    /// `None` leaves out the criteria sheet
    pub criteria: Option<Vec<(&'static str, f64)>>,
    /// Name of the main sheet
    pub main_sheet: &'static str,
}

impl Default for MatrixLayout {
    fn default() -> Self {
        Self {
            title_rows: 0,
            first_col: 0,
            rows: Vec::new(),
            criteria: Some(Vec::new()),
            main_sheet: MAIN_SHEET,
        }
    }
}

const HEADERS: [&str; 5] = ["AREA", "DENOMINACIÓN", "CÓDIGO", "TIPO", "COMENTARIOS"];

/// Write `layout` to `dir/matrix.xlsx`
pub fn matrix_workbook(dir: &Path, layout: &MatrixLayout) -> Result<PathBuf, XlsxError> {
    let mut workbook = Workbook::new();

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(layout.main_sheet)?;

        for title in 0..layout.title_rows {
            sheet.write_string(title, layout.first_col, "Matriz de condición de equipos")?;
        }

        let header_row = layout.title_rows;
        for (i, label) in HEADERS.iter().enumerate() {
            sheet.write_string(header_row, layout.first_col + i as u16, *label)?;
        }

        for (offset, row) in layout.rows.iter().enumerate() {
            let r = header_row + 1 + offset as u32;
            let format = match row.fill {
                Some(rgb) => Format::new().set_background_color(Color::RGB(rgb)),
                None => Format::new(),
            };
            let values = [
                Some(row.area),
                row.name,
                row.code,
                row.machine_type,
                row.comment,
            ];
            for (i, value) in values.iter().enumerate() {
                if let Some(value) = value {
                    sheet.write_string_with_format(r, layout.first_col + i as u16, *value, &format)?;
                }
            }
        }
    }

    if let Some(criteria) = &layout.criteria {
        let sheet = workbook.add_worksheet();
        sheet.set_name(CRITERIA_SHEET)?;
        sheet.write_string(0, 0, "Criterio")?;
        sheet.write_string(0, 1, "Factor")?;
        for (i, (keyword, weight)) in criteria.iter().enumerate() {
            let r = 1 + i as u32;
            sheet.write_string(r, 0, *keyword)?;
            sheet.write_number(r, 1, *weight)?;
        }
    }

    let path = dir.join("matrix.xlsx");
    workbook.save(&path)?;
    Ok(path)
}
