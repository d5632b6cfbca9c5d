//! Header row detection
//!
//! The condition matrix has title and legend rows above the real header, and their number
//! varies between revisions of the document.

use crate::workbook::Sheet;

/// Index of the header row among the first `max_scan` rows of `sheet`
///
/// First choice is a row with a cell equal to or starting with `AREA`. Failing that, a row
/// mentioning `CÓDIGO`, `CODIGO` or `DENOMIN`. Defaults to row 0.
///
/// Rows are counted from sheet row 1, blank leading rows included, because [`Sheet`] grids
/// start at cell A1. A workbook with many blank rows above its title block therefore needs
/// a larger `max_scan`.
pub fn locate(sheet: &Sheet, max_scan: usize) -> usize {
    let scan = max_scan.min(sheet.height());

    let rows_upper = || {
        (0..scan).map(|i| {
            let cells: Vec<String> = sheet
                .row(i)
                .unwrap_or_default()
                .iter()
                .filter_map(|c| c.trimmed_text())
                .map(|t| t.to_uppercase())
                .collect();
            (i, cells)
        })
    };

    let area_row = rows_upper().find(|(_, cells)| cells.iter().any(|c| c.starts_with("AREA")));
    if let Some((index, _)) = area_row {
        return index;
    }

    let column_row = rows_upper().find(|(_, cells)| {
        cells
            .iter()
            .any(|c| c.contains("CÓDIGO") || c.contains("CODIGO") || c.contains("DENOMIN"))
    });

    column_row.map(|(index, _)| index).unwrap_or(0)
}
