//! Column roles recognized from header text

use crate::workbook::CellValue;

/// Positions of the columns the importer reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnRoles {
    /// HAC code (`CÓDIGO` / `CODIGO`)
    pub code: Option<usize>,
    /// Equipment name (`DENOMIN...`)
    pub name: Option<usize>,
    /// Equipment type (`TIPO`)
    pub machine_type: Option<usize>,
    /// Free-text remarks (`COMENT...` / `OBSERV...`)
    pub notes: Option<usize>,
}

impl ColumnRoles {
    /// Recognize roles by case-insensitive substring; a later column overrides an earlier one
    pub fn recognize(header: &[CellValue]) -> Self {
        let mut roles = ColumnRoles::default();

        for (index, cell) in header.iter().enumerate() {
            let Some(label) = cell.trimmed_text().map(|t| t.to_uppercase()) else {
                continue;
            };

            if label.contains("CÓDIGO") || label.contains("CODIGO") {
                roles.code = Some(index);
            }
            if label.contains("DENOMIN") {
                roles.name = Some(index);
            }
            if label.contains("TIPO") {
                roles.machine_type = Some(index);
            }
            if label.contains("COMENT") || label.contains("OBSERV") {
                roles.notes = Some(index);
            }
        }

        roles
    }

    /// Neither a name nor a code column: no row can be imported
    pub fn is_unusable(&self) -> bool {
        self.code.is_none() && self.name.is_none()
    }
}

/// Values of the recognized columns in one data row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFields {
    pub name: Option<String>,
    pub code: Option<String>,
    /// Empty when the row has no remark
    pub notes: String,
    pub machine_type: Option<String>,
}

impl RowFields {
    pub fn read(row: &[CellValue], roles: &ColumnRoles) -> Self {
        let field = |col: Option<usize>| col.and_then(|c| row.get(c)).and_then(CellValue::trimmed_text);

        Self {
            name: field(roles.name),
            code: field(roles.code),
            notes: field(roles.notes).unwrap_or_default(),
            machine_type: field(roles.machine_type),
        }
    }

    /// Rows with neither name nor code are skipped
    pub fn is_identifiable(&self) -> bool {
        self.name.is_some() || self.code.is_some()
    }
}
