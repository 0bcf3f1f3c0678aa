//! Utilities for parsing Excel-style cell references and ranges.
//!
//! Coordinates are 0-indexed. Whole-column (`A:C`) and whole-row (`2:4`)
//! references expand to the full grid extent.

/// Number of columns in an Excel worksheet (A..XFD).
pub const MAX_COLS: u32 = 16_384;
/// Number of rows in an Excel worksheet.
pub const MAX_ROWS: u32 = 1_048_576;

/// Parse a cell reference like "A1" or "$B$2" into (col, row), 0-indexed.
pub fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    let mut col: u32 = 0;
    let mut row: u32 = 0;
    let mut saw_col = false;
    let mut saw_row = false;

    for ch in cell_ref.trim().chars() {
        if ch == '$' {
            continue;
        }
        if ch.is_ascii_alphabetic() {
            // Letters after digits ("1A") are not a reference.
            if saw_row {
                return None;
            }
            let upper = ch.to_ascii_uppercase();
            col = col
                .checked_mul(26)?
                .checked_add(upper as u32 - 'A' as u32 + 1)?;
            saw_col = true;
        } else if ch.is_ascii_digit() {
            row = row.checked_mul(10)?.checked_add(ch as u32 - '0' as u32)?;
            saw_row = true;
        } else {
            return None;
        }
    }

    if !saw_col || !saw_row || row == 0 || col > MAX_COLS || row > MAX_ROWS {
        return None;
    }

    Some((col - 1, row - 1))
}

/// Parse a bare column ("C", "$AA") into a 0-indexed column.
fn parse_col_only(part: &str) -> Option<u32> {
    let part = part.trim().trim_start_matches('$');
    if part.is_empty() || !part.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let mut col: u32 = 0;
    for ch in part.chars() {
        col = col
            .checked_mul(26)?
            .checked_add(ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1)?;
    }
    (col <= MAX_COLS).then(|| col - 1)
}

/// Parse a bare row ("7", "$7") into a 0-indexed row.
fn parse_row_only(part: &str) -> Option<u32> {
    let row: u32 = part.trim().trim_start_matches('$').parse().ok()?;
    (1..=MAX_ROWS).contains(&row).then(|| row - 1)
}

/// Convert a 0-based column index to Excel column letters (A, B, ..., Z, AA, AB, ...)
pub fn col_to_letter(col: u32) -> String {
    let mut result = String::new();
    let mut n = col.saturating_add(1);
    while n > 0 {
        n -= 1;
        let digit = u8::try_from(n % 26).unwrap_or(0);
        result.insert(0, char::from(b'A' + digit));
        n /= 26;
    }
    result
}

/// Format a 0-indexed (col, row) as an A1 reference.
pub fn format_cell_ref(col: u32, row: u32) -> String {
    format!("{}{}", col_to_letter(col), row.saturating_add(1))
}

/// Inclusive rectangular block of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
}

impl CellRange {
    /// Build a range from two corners in any order.
    pub fn new(row_a: u32, col_a: u32, row_b: u32, col_b: u32) -> Self {
        Self {
            start_row: row_a.min(row_b),
            start_col: col_a.min(col_b),
            end_row: row_a.max(row_b),
            end_col: col_a.max(col_b),
        }
    }

    /// Parse "A1", "A1:B10", "A:C" or "2:4".
    pub fn parse(range: &str) -> Option<Self> {
        let range = range.trim();
        let Some((start, end)) = range.split_once(':') else {
            let (col, row) = parse_cell_ref(range)?;
            return Some(Self::new(row, col, row, col));
        };

        if let (Some((c1, r1)), Some((c2, r2))) = (parse_cell_ref(start), parse_cell_ref(end)) {
            return Some(Self::new(r1, c1, r2, c2));
        }
        if let (Some(c1), Some(c2)) = (parse_col_only(start), parse_col_only(end)) {
            return Some(Self::new(0, c1, MAX_ROWS - 1, c2));
        }
        if let (Some(r1), Some(r2)) = (parse_row_only(start), parse_row_only(end)) {
            return Some(Self::new(r1, 0, r2, MAX_COLS - 1));
        }
        None
    }

    pub fn rows(&self) -> u32 {
        self.end_row - self.start_row + 1
    }

    pub fn cols(&self) -> u32 {
        self.end_col - self.start_col + 1
    }

    /// Overlapping block, or `None` when the ranges are disjoint.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let start_row = self.start_row.max(other.start_row);
        let end_row = self.end_row.min(other.end_row);
        let start_col = self.start_col.max(other.start_col);
        let end_col = self.end_col.min(other.end_col);
        (start_row <= end_row && start_col <= end_col).then_some(Self {
            start_row,
            start_col,
            end_row,
            end_col,
        })
    }

    /// A1-style address, collapsed to a single reference for one cell.
    pub fn to_a1(&self) -> String {
        let start = format_cell_ref(self.start_col, self.start_row);
        if self.start_row == self.end_row && self.start_col == self.end_col {
            start
        } else {
            format!("{start}:{}", format_cell_ref(self.end_col, self.end_row))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell_ref_strips_absolute_markers() {
        assert_eq!(parse_cell_ref("A1"), Some((0, 0)));
        assert_eq!(parse_cell_ref("$B$2"), Some((1, 1)));
        assert_eq!(parse_cell_ref("xfd1048576"), Some((16_383, 1_048_575)));
    }

    #[test]
    fn test_parse_cell_ref_rejects_garbage() {
        assert_eq!(parse_cell_ref(""), None);
        assert_eq!(parse_cell_ref("A"), None);
        assert_eq!(parse_cell_ref("12"), None);
        assert_eq!(parse_cell_ref("1A"), None);
        assert_eq!(parse_cell_ref("A0"), None);
        assert_eq!(parse_cell_ref("B-2"), None);
        assert_eq!(parse_cell_ref("XFE1"), None);
        assert_eq!(parse_cell_ref("AAAAAAAAAAAA1"), None);
    }

    #[test]
    fn test_col_to_letter() {
        assert_eq!(col_to_letter(0), "A");
        assert_eq!(col_to_letter(25), "Z");
        assert_eq!(col_to_letter(26), "AA");
        assert_eq!(col_to_letter(16_383), "XFD");
    }

    #[test]
    fn test_range_parse_forms() {
        assert_eq!(CellRange::parse("B2"), Some(CellRange::new(1, 1, 1, 1)));
        assert_eq!(CellRange::parse("C3:A1"), Some(CellRange::new(0, 0, 2, 2)));
        let cols = CellRange::parse("B:C").unwrap();
        assert_eq!((cols.start_col, cols.end_col), (1, 2));
        assert_eq!(cols.rows(), MAX_ROWS);
        let rows = CellRange::parse("$2:$3").unwrap();
        assert_eq!((rows.start_row, rows.end_row), (1, 2));
        assert_eq!(rows.cols(), MAX_COLS);
        assert!(CellRange::parse("A1:").is_none());
    }

    #[test]
    fn test_intersection() {
        let a = CellRange::parse("A1:C3").unwrap();
        let b = CellRange::parse("C3:D4").unwrap();
        assert_eq!(a.intersection(&b).unwrap().to_a1(), "C3");
        let c = CellRange::parse("D1").unwrap();
        assert!(a.intersection(&c).is_none());
        let col = CellRange::parse("B:B").unwrap();
        assert_eq!(a.intersection(&col).unwrap().to_a1(), "B1:B3");
    }
}
