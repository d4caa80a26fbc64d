//! Reading helpers shared by the spreadsheet importers and export read-back.

use crate::error::{Error, Result};
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

pub const ACCEPTED_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

pub fn ensure_spreadsheet_extension(filename: &str) -> Result<()> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();
    if ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(Error::InvalidFileType(format!(
            "'{}' is not an Excel file; upload a .xlsx or .xls spreadsheet",
            filename
        )))
    }
}

/// The whole file is held in memory; only the first worksheet is read.
pub fn open_first_sheet(bytes: &[u8]) -> Result<Range<Data>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::BadRequest("Spreadsheet has no worksheets".into()))?
        .map_err(Error::from)
}

/// Header name to column index, taken from the first row.
#[derive(Debug, Clone, Default)]
pub struct Header {
    columns: HashMap<String, usize>,
}

impl Header {
    pub fn from_range(range: &Range<Data>) -> Self {
        let columns = range
            .rows()
            .next()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(idx, cell)| (cell_text(cell), idx))
                    .filter(|(name, _)| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Self { columns }
    }

    pub fn index(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }

    pub fn missing<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|name| !self.columns.contains_key(*name))
            .collect()
    }

    pub fn cell<'r>(&self, row: &'r [Data], name: &str) -> Option<&'r Data> {
        self.index(name).and_then(|idx| row.get(idx))
    }

    pub fn text(&self, row: &[Data], name: &str) -> String {
        self.cell(row, name).map(cell_text).unwrap_or_default()
    }

    /// Cell text exactly as stored, for reading back files this service wrote.
    pub fn raw_text(&self, row: &[Data], name: &str) -> String {
        self.cell(row, name).map(cell_raw_text).unwrap_or_default()
    }
}

pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        _ => String::new(),
    }
}

pub fn cell_raw_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        other => cell_text(other),
    }
}

/// Truthy spreadsheet values: TRUE, non-zero numbers, and yes/true/1/x style text.
pub fn cell_flag(cell: &Data) -> bool {
    match cell {
        Data::Bool(b) => *b,
        Data::Int(i) => *i != 0,
        Data::Float(f) => *f != 0.0,
        Data::String(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "yes" | "y" | "1" | "x" | "correct" | "+"
        ),
        _ => false,
    }
}

pub fn cell_number(cell: &Data) -> Option<i32> {
    match cell {
        Data::Int(i) => i32::try_from(*i).ok(),
        Data::Float(f) => Some(f.round() as i32),
        Data::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
