/*!
 * Manifest spreadsheet indexing
 *
 * The manifest lists every archive identifier next to a free-text category.
 * Its header row is not necessarily the first row, so the indexer scans for
 * the first row holding both configured column labels and reads everything
 * below it.
 */

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheet, SheetType, SheetVisible};
use tracing::{debug, info};

use crate::error::{HarvestError, Result};
use crate::sanitize::NameSanitizer;

/// One typed spreadsheet cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Cell {
    /// Cell contents as text, `None` when blank
    pub fn as_text(&self) -> Option<String> {
        let text = self.to_string();
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(text) => f.write_str(text),
            Cell::Int(value) => write!(f, "{}", value),
            // Spreadsheets store most numbers as floats; 1001.0 is "1001"
            Cell::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                write!(f, "{}", *value as i64)
            }
            Cell::Float(value) => write!(f, "{}", value),
            Cell::Bool(true) => f.write_str("TRUE"),
            Cell::Bool(false) => f.write_str("FALSE"),
        }
    }
}

/// One manifest record; `None` is an empty cell
pub type ManifestRow = Vec<Option<Cell>>;

/// Identifier to sanitized category name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryMap {
    entries: HashMap<String, String>,
}

impl CategoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identifier: &str) -> Option<&str> {
        self.entries.get(identifier).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Distinct category names, sorted
    pub fn categories(&self) -> BTreeSet<&str> {
        self.entries.values().map(String::as_str).collect()
    }

    fn insert(&mut self, identifier: String, category: String) -> Option<String> {
        self.entries.insert(identifier, category)
    }
}

/// Where the two columns of interest sit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderPositions {
    /// Index of the header row itself
    pub row: usize,
    pub id_column: usize,
    pub category_column: usize,
}

/// Find the first row with text cells exactly equal to both labels
pub fn locate_header(
    rows: &[ManifestRow],
    id_label: &str,
    category_label: &str,
) -> Option<HeaderPositions> {
    let position = |row: &ManifestRow, label: &str| {
        row.iter()
            .position(|cell| matches!(cell, Some(Cell::Text(text)) if text == label))
    };

    rows.iter().enumerate().find_map(|(idx, row)| {
        Some(HeaderPositions {
            row: idx,
            id_column: position(row, id_label)?,
            category_column: position(row, category_label)?,
        })
    })
}

/// Builds the identifier to category mapping from manifest rows
#[derive(Debug, Clone)]
pub struct CatalogIndexer {
    id_column: String,
    category_column: String,
    sanitizer: NameSanitizer,
}

impl CatalogIndexer {
    pub fn new(
        id_column: impl Into<String>,
        category_column: impl Into<String>,
        sanitizer: NameSanitizer,
    ) -> Self {
        Self {
            id_column: id_column.into(),
            category_column: category_column.into(),
            sanitizer,
        }
    }

    /// Index every row below the header.
    ///
    /// Rows too short to reach either column, or with a blank identifier or
    /// category, are skipped. A repeated identifier keeps the category of
    /// its last row.
    pub fn build_index(&self, rows: &[ManifestRow]) -> Result<CategoryMap> {
        let header = locate_header(rows, &self.id_column, &self.category_column).ok_or_else(
            || HarvestError::ManifestSchema {
                id_column: self.id_column.clone(),
                category_column: self.category_column.clone(),
            },
        )?;
        debug!(?header, "manifest header located");

        let mut map = CategoryMap::new();
        let mut skipped = 0usize;

        for row in &rows[header.row + 1..] {
            let value = |col: usize| row.get(col).and_then(Option::as_ref).and_then(Cell::as_text);

            match (value(header.id_column), value(header.category_column)) {
                (Some(identifier), Some(label)) => {
                    let category = self.sanitizer.sanitize(&label);
                    if let Some(previous) = map.insert(identifier.clone(), category.clone()) {
                        if previous != category {
                            debug!(%identifier, %previous, %category, "duplicate identifier, last row wins");
                        }
                    }
                }
                _ => skipped += 1,
            }
        }

        info!(
            entries = map.len(),
            categories = map.categories().len(),
            skipped,
            "manifest indexed"
        );
        Ok(map)
    }
}

/// Index `rows` with the default folder name bound
pub fn build_index(rows: &[ManifestRow], id_column: &str, category_column: &str) -> Result<CategoryMap> {
    CatalogIndexer::new(id_column, category_column, NameSanitizer::default()).build_index(rows)
}

/// Source of manifest rows
pub trait ManifestReader {
    fn read_rows(&self, path: &Path) -> Result<Vec<ManifestRow>>;
}

/// Reads the first worksheet of an xlsx/xls/ods workbook
#[derive(Debug, Default, Clone, Copy)]
pub struct XlsxManifestReader;

impl ManifestReader for XlsxManifestReader {
    fn read_rows(&self, path: &Path) -> Result<Vec<ManifestRow>> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|e| HarvestError::ManifestRead(format!("{}: {}", path.display(), e)))?;

        let sheet = default_sheet(workbook.sheets_metadata())
            .map(str::to_string)
            .ok_or_else(|| HarvestError::ManifestRead("workbook has no worksheets".to_string()))?;
        debug!(sheet = %sheet, "reading manifest sheet");
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| HarvestError::ManifestRead(format!("{}: {}", sheet, e)))?;

        Ok(range
            .rows()
            .map(|row| row.iter().map(convert_cell).collect())
            .collect())
    }
}

/// First visible worksheet, else the first sheet of any kind
fn default_sheet(sheets: &[Sheet]) -> Option<&str> {
    sheets
        .iter()
        .find(|s| matches!((s.typ, s.visible), (SheetType::WorkSheet, SheetVisible::Visible)))
        .or_else(|| sheets.first())
        .map(|s| s.name.as_str())
}

fn convert_cell(data: &Data) -> Option<Cell> {
    match data {
        Data::Empty => None,
        Data::String(text) => Some(Cell::Text(text.clone())),
        Data::Int(value) => Some(Cell::Int(*value)),
        Data::Float(value) => Some(Cell::Float(*value)),
        Data::Bool(value) => Some(Cell::Bool(*value)),
        other => Some(Cell::Text(other.to_string())),
    }
}
