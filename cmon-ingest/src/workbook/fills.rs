//! Cell fill colors straight from the `.xlsx` package
//!
//! Resolution path for one cell:
//! `xl/workbook.xml` (sheet name → relationship id) → `xl/_rels/workbook.xml.rels`
//! (relationship id → sheet part) → `<c r="B3" s="2">` in the sheet part → `cellXfs[2]`
//! in `xl/styles.xml` → `fills[fillId]` → `patternFill/fgColor/@rgb`.
//!
//! Only explicit `rgb` colors are resolved. Theme and indexed colors, gradients and
//! row/column default styles yield no fill.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

use super::WorkbookError;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const STYLES_PART: &str = "xl/styles.xml";

/// Raw foreground colors of one sheet, keyed by zero-based `(row, col)`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetFills {
    cells: HashMap<(usize, usize), String>,
}

impl SheetFills {
    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.cells.get(&(row, col)).map(String::as_str)
    }

    pub fn insert(&mut self, row: usize, col: usize, rgb: impl Into<String>) {
        self.cells.insert((row, col), rgb.into());
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Fill-relevant subset of `xl/styles.xml`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StylePalette {
    /// `fgColor/@rgb` per entry of `<fills>`
    fill_colors: Vec<Option<String>>,
    /// `@fillId` per entry of `<cellXfs>`
    xf_fill_ids: Vec<usize>,
}

impl StylePalette {
    pub fn parse(content: &str) -> Result<Self, WorkbookError> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);

        let mut palette = StylePalette::default();
        let mut buf = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.local_name().as_ref() {
                    b"fills" => parse_fills(&mut reader, &mut palette.fill_colors)?,
                    b"cellXfs" => parse_cell_xfs(&mut reader, &mut palette.xf_fill_ids)?,
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml_error(STYLES_PART, e)),
                _ => {}
            }
        }

        Ok(palette)
    }

    /// Foreground color of cell style index `style`
    pub fn fill_for_style(&self, style: usize) -> Option<&str> {
        let fill_id = *self.xf_fill_ids.get(style)?;
        self.fill_colors.get(fill_id)?.as_deref()
    }
}

fn xml_error(part: &str, e: impl std::fmt::Display) -> WorkbookError {
    WorkbookError::Xml {
        part: part.to_string(),
        message: e.to_string(),
    }
}

fn attribute(element: &BytesStart, name: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == name)
        .and_then(|attr| attr.unescape_value().ok())
        .map(|value| value.into_owned())
}

fn parse_fills(reader: &mut Reader<&[u8]>, fills: &mut Vec<Option<String>>) -> Result<(), WorkbookError> {
    let mut buf = Vec::with_capacity(512);
    let mut current: Option<Option<String>> = None;

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"fill" => current = Some(None),
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"fill" => fills.push(None),
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"fgColor" => {
                if let Some(slot) = current.as_mut() {
                    *slot = attribute(&e, b"rgb");
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"fill" => {
                fills.push(current.take().flatten());
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"fills" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(STYLES_PART, e)),
            _ => {}
        }
    }

    Ok(())
}

fn parse_cell_xfs(reader: &mut Reader<&[u8]>, xf_fill_ids: &mut Vec<usize>) -> Result<(), WorkbookError> {
    let mut buf = Vec::with_capacity(512);

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"xf" => {
                let fill_id = attribute(&e, b"fillId")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
                xf_fill_ids.push(fill_id);
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"cellXfs" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(STYLES_PART, e)),
            _ => {}
        }
    }

    Ok(())
}

/// Zero-based `(row, col)` of an A1-style reference such as `AB12`
pub fn parse_cell_reference(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let col = letters
        .chars()
        .try_fold(0usize, |acc, c| {
            let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
            acc.checked_mul(26)?.checked_add(digit)
        })?;
    let row: usize = digits.parse().ok()?;

    (row >= 1).then(|| (row - 1, col - 1))
}

/// Map workbook sheet names to their package part paths
fn parse_sheet_parts(workbook_xml: &str, rels_xml: &str) -> Result<HashMap<String, String>, WorkbookError> {
    let mut targets: HashMap<String, String> = HashMap::new();
    let mut reader = Reader::from_str(rels_xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) =
                    (attribute(&e, b"Id"), attribute(&e, b"Target"))
                {
                    targets.insert(id, resolve_target(&target));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(WORKBOOK_RELS_PART, e)),
            _ => {}
        }
    }

    let mut parts = HashMap::new();
    let mut reader = Reader::from_str(workbook_xml);
    reader.config_mut().trim_text(true);
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                // r:id is namespaced; its local name is "id"
                if let (Some(name), Some(rel_id)) =
                    (attribute(&e, b"name"), attribute(&e, b"id"))
                {
                    if let Some(target) = targets.get(&rel_id) {
                        parts.insert(name, target.clone());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(WORKBOOK_PART, e)),
            _ => {}
        }
    }

    Ok(parts)
}

/// Relationship targets are relative to `xl/` unless absolute
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

/// Collect fills of every styled cell in one sheet part
fn parse_sheet_fills(content: &str, part: &str, palette: &StylePalette) -> Result<SheetFills, WorkbookError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut fills = SheetFills::default();
    let mut buf = Vec::with_capacity(1024);
    let mut next_row = 0usize;
    let mut next_col = 0usize;

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"row" => {
                    let row = attribute(&e, b"r")
                        .and_then(|r| r.parse::<usize>().ok())
                        .filter(|r| *r >= 1)
                        .map(|r| r - 1)
                        .unwrap_or(next_row);
                    next_row = row + 1;
                    next_col = 0;
                }
                b"c" => {
                    // Cells without a reference follow the previous one
                    let (row, col) = attribute(&e, b"r")
                        .and_then(|r| parse_cell_reference(&r))
                        .unwrap_or((next_row.saturating_sub(1), next_col));
                    next_col = col + 1;

                    let style = attribute(&e, b"s")
                        .and_then(|s| s.parse::<usize>().ok())
                        .unwrap_or(0);
                    if let Some(rgb) = palette.fill_for_style(style) {
                        fills.insert(row, col, rgb);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(part, e)),
            _ => {}
        }
    }

    Ok(fills)
}

/// Reads fills from an open workbook package
pub struct FillReader {
    archive: ZipArchive<BufReader<File>>,
    palette: StylePalette,
    sheet_parts: HashMap<String, String>,
}

impl FillReader {
    pub fn open(path: &Path) -> Result<Self, WorkbookError> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(BufReader::new(file))?;

        let palette = StylePalette::parse(&read_part(&mut archive, STYLES_PART)?)?;
        let workbook_xml = read_part(&mut archive, WORKBOOK_PART)?;
        let rels_xml = read_part(&mut archive, WORKBOOK_RELS_PART)?;
        let sheet_parts = parse_sheet_parts(&workbook_xml, &rels_xml)?;

        debug!(
            "Style palette: {} fills, {} cell formats, {} sheets",
            palette.fill_colors.len(),
            palette.xf_fill_ids.len(),
            sheet_parts.len()
        );

        Ok(Self {
            archive,
            palette,
            sheet_parts,
        })
    }

    /// Fills of sheet `name`; an unknown sheet has none
    pub fn sheet_fills(&mut self, name: &str) -> Result<SheetFills, WorkbookError> {
        let Some(part) = self.sheet_parts.get(name).cloned() else {
            return Ok(SheetFills::default());
        };

        let content = read_part(&mut self.archive, &part)?;
        parse_sheet_fills(&content, &part, &self.palette)
    }
}

fn read_part(archive: &mut ZipArchive<BufReader<File>>, name: &str) -> Result<String, WorkbookError> {
    let mut entry = archive.by_name(name)?;
    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    Ok(content)
}
