//! Header row detection.
//!
//! Best-effort heuristic: it cannot distinguish a header from a table
//! whose data rows are uniformly text, so callers expose a manual
//! override (see [`crate::session::ImportSession::set_has_headers`]).

use crate::schema::parse_date_any;

/// How a single cell reads when typed loosely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellClass {
    Number,
    Date,
    Boolean,
    Text,
}

fn classify(cell: &str) -> CellClass {
    let cell = cell.trim();
    if cell.parse::<f64>().is_ok() {
        CellClass::Number
    } else if parse_date_any(cell).is_some() {
        CellClass::Date
    } else if cell.eq_ignore_ascii_case("true") || cell.eq_ignore_ascii_case("false") {
        CellClass::Boolean
    } else {
        CellClass::Text
    }
}

/// Guess whether row 0 is a header row.
///
/// Row 0 qualifies as a header candidate only if every cell is a
/// non-empty string after trimming. If it qualifies, up to the next 3
/// rows are inspected: a row mixing more than one cell classification
/// (number/date/boolean/text) reads as data under a header, and the
/// guess is `true`. Tables with fewer than 2 rows, or whose data rows
/// are uniformly one type, are judged headerless.
pub fn detect_has_headers(rows: &[Vec<String>]) -> bool {
    if rows.len() < 2 {
        return false;
    }

    let first_row = &rows[0];
    if first_row.is_empty() || first_row.iter().any(|cell| cell.trim().is_empty()) {
        return false;
    }

    rows[1..].iter().take(3).any(|row| {
        let mut classes = row.iter().map(|cell| classify(cell));
        match classes.next() {
            Some(first) => classes.any(|class| class != first),
            None => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|row| row.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_header_over_mixed_rows() {
        let table = rows(&[
            &["Name", "Age", "Member"],
            &["Alice", "30", "true"],
            &["Bob", "25", "false"],
        ]);
        assert!(detect_has_headers(&table));
    }

    #[test]
    fn test_uniform_text_rows_read_headerless() {
        let table = rows(&[
            &["Name", "City"],
            &["Alice", "Paris"],
            &["Bob", "Berlin"],
        ]);
        assert!(!detect_has_headers(&table));
    }

    #[test]
    fn test_single_row_is_headerless() {
        assert!(!detect_has_headers(&rows(&[&["Name", "Age"]])));
        assert!(!detect_has_headers(&[]));
    }

    #[test]
    fn test_empty_cell_disqualifies_candidate() {
        let table = rows(&[
            &["Name", ""],
            &["Alice", "30"],
        ]);
        assert!(!detect_has_headers(&table));
    }

    #[test]
    fn test_numeric_first_row_disqualifies() {
        // First row cells are non-empty strings, but so is everything;
        // detection rests on the data rows mixing classes.
        let table = rows(&[
            &["id", "created"],
            &["17", "2024-03-01"],
        ]);
        assert!(detect_has_headers(&table));
    }

    #[test]
    fn test_only_first_three_data_rows_inspected() {
        let table = rows(&[
            &["a", "b"],
            &["x", "y"],
            &["x", "y"],
            &["x", "y"],
            &["1", "word"],
        ]);
        assert!(!detect_has_headers(&table));
    }
}
