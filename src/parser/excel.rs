//! XLSX workbook import via calamine.
//!
//! One-way conversion: the first worksheet becomes a [`RawTable`] of
//! strings. Formatting, formulas and the remaining sheets are ignored.

use calamine::{Data, Reader, Xlsx};
use std::io::Cursor;

use crate::error::{ParseError, ParserResult};
use crate::models::RawTable;

/// Parse XLSX bytes into a raw table from the first worksheet.
pub fn parse_xlsx_bytes(bytes: &[u8]) -> ParserResult<RawTable> {
    let cursor = Cursor::new(bytes);
    let mut workbook: Xlsx<_> =
        Xlsx::new(cursor).map_err(|e| ParseError::Excel(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ParseError::EmptyFile)?
        .map_err(|e| ParseError::Excel(e.to_string()))?;

    let mut rows = Vec::new();
    for row in range.rows() {
        let cells: Vec<String> = row.iter().map(cell_to_string).collect();
        if cells.iter().all(String::is_empty) {
            continue;
        }
        rows.push(cells);
    }

    if rows.is_empty() {
        return Err(ParseError::EmptyFile);
    }

    Ok(RawTable::new(rows))
}

/// Render one workbook cell as a trimmed string.
///
/// Numbers keep their natural formatting (`30.0` renders as `30`);
/// date cells render as ISO datetimes; error cells become empty so the
/// validators report them as missing rather than as Excel error codes.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Error(_) => String::new(),
    }
}
