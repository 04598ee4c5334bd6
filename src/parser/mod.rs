//! File parsing with encoding and delimiter auto-detection.
//!
//! This is the delegated input boundary of the pipeline: bytes in, a
//! [`RawTable`] of trimmed strings out, or a descriptive
//! [`ParseError`]. CSV decoding goes through the `csv` crate; XLSX
//! workbooks through `calamine` (see [`excel`]). No schema knowledge
//! lives here.

pub mod excel;
pub mod headers;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ParseError, ParserResult};
use crate::models::RawTable;

pub use headers::detect_has_headers;

/// Source file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    Csv,
    Xlsx,
}

/// Parse metadata, kept around for status displays.
#[derive(Debug, Clone, Serialize)]
pub struct SheetInfo {
    /// Detected format.
    pub format: TableFormat,
    /// Detected or assumed encoding.
    pub encoding: String,
    /// Detected delimiter (CSV only).
    pub delimiter: Option<char>,
}

/// Result of parsing with metadata.
#[derive(Debug, Clone)]
pub struct ParsedSheet {
    /// The parsed grid, header row (if any) included.
    pub table: RawTable,
    pub info: SheetInfo,
}

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
pub fn decode_content(bytes: &[u8], encoding: &str) -> ParserResult<String> {
    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => Ok(String::from_utf8(bytes.to_vec())
            .unwrap_or_else(|_| String::from_utf8_lossy(bytes).to_string())),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => {
            Ok(encoding_rs::ISO_8859_15.decode(bytes).0.to_string())
        }
        "windows-1252" | "cp1252" => Ok(encoding_rs::WINDOWS_1252.decode(bytes).0.to_string()),
        _ => {
            // Fallback: UTF-8 with lossy conversion
            Ok(String::from_utf8_lossy(bytes).to_string())
        }
    }
}

/// Detect the delimiter by counting occurrences in the first line.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text with an explicit delimiter.
///
/// Cells are trimmed; blank lines are skipped. Rows keep their ragged
/// widths — the transformer defaults missing cells to `""` later.
pub fn parse_csv_str(content: &str, delimiter: char) -> ParserResult<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Vec<String> = record.iter().map(|cell| cell.trim().to_string()).collect();
        if row.iter().all(String::is_empty) {
            continue;
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(ParseError::EmptyFile);
    }

    Ok(RawTable::new(rows))
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_csv_bytes(bytes: &[u8]) -> ParserResult<ParsedSheet> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    let table = parse_csv_str(&content, delimiter)?;

    Ok(ParsedSheet {
        table,
        info: SheetInfo {
            format: TableFormat::Csv,
            encoding,
            delimiter: Some(delimiter),
        },
    })
}

/// Parse file bytes, dispatching on format.
///
/// XLSX is recognized by the name hint (`.xlsx`) or the ZIP magic
/// bytes; everything else is treated as CSV with auto-detection.
pub fn parse_bytes(bytes: &[u8], name_hint: Option<&str>) -> ParserResult<ParsedSheet> {
    if bytes.is_empty() {
        return Err(ParseError::EmptyFile);
    }

    let looks_like_xlsx = name_hint
        .map(|name| name.to_lowercase().ends_with(".xlsx"))
        .unwrap_or(false)
        || bytes.starts_with(b"PK\x03\x04");

    if looks_like_xlsx {
        let table = excel::parse_xlsx_bytes(bytes)?;
        return Ok(ParsedSheet {
            table,
            info: SheetInfo {
                format: TableFormat::Xlsx,
                encoding: "utf-8".to_string(),
                delimiter: None,
            },
        });
    }

    if let Some(name) = name_hint {
        let lower = name.to_lowercase();
        let known = [".csv", ".tsv", ".txt"];
        if lower.contains('.') && !known.iter().any(|ext| lower.ends_with(ext)) {
            return Err(ParseError::UnsupportedFormat(name.to_string()));
        }
    }

    parse_csv_bytes(bytes)
}

/// Parse a file from disk with auto-detection.
pub fn parse_file<P: AsRef<Path>>(path: P) -> ParserResult<ParsedSheet> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let name = path.file_name().and_then(|n| n.to_str());
    parse_bytes(&bytes, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_simple_csv() {
        let sheet = parse_csv_bytes(b"name,age\nAlice,30\nBob,25").unwrap();

        assert_eq!(sheet.info.format, TableFormat::Csv);
        assert_eq!(sheet.info.delimiter, Some(','));
        assert_eq!(sheet.table.row_count(), 3);
        assert_eq!(sheet.table.rows()[1], vec!["Alice", "30"]);
    }

    #[test]
    fn test_semicolon_delimiter() {
        let sheet = parse_csv_bytes(b"a;b;c\n1;2;3").unwrap();
        assert_eq!(sheet.info.delimiter, Some(';'));
        assert_eq!(sheet.table.rows()[1], vec!["1", "2", "3"]);
    }

    #[test]
    fn test_quoted_values_keep_delimiters() {
        let table = parse_csv_str("name,motto\n\"Doe, Jane\",\"hi\"", ',').unwrap();
        assert_eq!(table.rows()[1][0], "Doe, Jane");
    }

    #[test]
    fn test_cells_trimmed_and_blank_rows_skipped() {
        let table = parse_csv_str("a,b\n 1 , 2 \n,\n3,4\n", ',').unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.rows()[1], vec!["1", "2"]);
    }

    #[test]
    fn test_ragged_rows_preserved() {
        let table = parse_csv_str("a,b,c\n1,2", ',').unwrap();
        assert_eq!(table.rows()[1].len(), 2);
        assert_eq!(table.width(), 3);
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(matches!(parse_csv_str("", ','), Err(ParseError::EmptyFile)));
        assert!(matches!(parse_bytes(b"", None), Err(ParseError::EmptyFile)));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b|c"), '|');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert!(decoded.contains("Soci"));
    }

    #[test]
    fn test_unsupported_extension() {
        let result = parse_bytes(b"not a spreadsheet", Some("report.pdf"));
        assert!(matches!(result, Err(ParseError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_parse_file_round_trip() {
        let mut file = tempfile::NamedTempFile::with_suffix(".csv").unwrap();
        write!(file, "name,age\nAlice,30").unwrap();

        let sheet = parse_file(file.path()).unwrap();
        assert_eq!(sheet.table.row_count(), 2);
        assert_eq!(sheet.table.rows()[0], vec!["name", "age"]);
    }
}
