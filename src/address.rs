//! Sheet-qualified addresses and intersection testing.
//!
//! Addresses arrive from several places (selection events, named references,
//! configuration) in slightly different spellings: `Sheet1!B2`,
//! `'My Sheet'!$B$2:$C$4`, `=Sheet1!$B$2`. They are parsed into [`Address`]
//! values whose comparison form ignores case, quoting and `$` markers.

use std::fmt;

use serde::Serialize;

use crate::error::Result;
use crate::host::RangeGeometry;

/// A cell or range reference within one sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Sheet name without quoting; empty when the sheet is unknown.
    pub sheet_name: String,
    /// Range reference with `$` markers and quotes stripped.
    pub cells: String,
}

impl Address {
    pub fn new(sheet_name: &str, cells: &str) -> Self {
        Self {
            sheet_name: unquote_sheet(sheet_name),
            cells: strip_markers(cells),
        }
    }

    pub fn has_sheet(&self) -> bool {
        !self.sheet_name.is_empty()
    }

    /// Case-insensitive sheet comparison. Unknown sheets never match.
    pub fn same_sheet(&self, other: &Self) -> bool {
        self.has_sheet()
            && other.has_sheet()
            && self.sheet_name.to_uppercase() == other.sheet_name.to_uppercase()
    }

    /// Fill in the sheet name when the address was unqualified.
    #[must_use]
    pub fn qualified_with(self, sheet_name: &str) -> Self {
        if self.has_sheet() {
            self
        } else {
            Self {
                sheet_name: unquote_sheet(sheet_name),
                cells: self.cells,
            }
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.has_sheet() {
            return f.write_str(&self.cells);
        }
        let needs_quotes = self
            .sheet_name
            .chars()
            .any(|c| !(c.is_alphanumeric() || c == '_' || c == '.'));
        if needs_quotes {
            write!(f, "'{}'!{}", self.sheet_name.replace('\'', "''"), self.cells)
        } else {
            write!(f, "{}!{}", self.sheet_name, self.cells)
        }
    }
}

/// Parse `Sheet!Ref`, `'Quoted Sheet'!Ref`, `=Sheet!Ref` or a bare `Ref`.
///
/// Splits on the first `!` outside single quotes; `''` inside a quoted name is
/// an escaped quote. Without a separator the sheet is unknown.
pub fn parse_qualified_address(raw: &str) -> Address {
    let raw = raw.trim();
    let raw = raw.strip_prefix('=').unwrap_or(raw).trim();

    let mut in_quotes = false;
    let mut chars = raw.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '\'' => {
                if in_quotes && chars.peek().is_some_and(|&(_, next)| next == '\'') {
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            '!' if !in_quotes => {
                let sheet = raw.get(..idx).unwrap_or_default();
                let cells = raw.get(idx + 1..).unwrap_or_default();
                return Address::new(sheet, cells);
            }
            _ => {}
        }
    }

    Address::new("", raw)
}

/// Upper-cased `SHEET!CELLS` used only for equality tests, never display.
pub fn normalize_for_comparison(addr: &Address) -> String {
    let sheet = addr.sheet_name.replace('\'', "").to_uppercase();
    let cells = strip_markers(&addr.cells).to_uppercase();
    format!("{sheet}!{cells}")
}

/// Whether `a` and `b` share at least one cell.
///
/// Addresses on different (or unknown) sheets never intersect; otherwise the
/// host's range intersection decides.
pub async fn intersects<H: RangeGeometry>(host: &H, a: &Address, b: &Address) -> Result<bool> {
    if !a.same_sheet(b) {
        return Ok(false);
    }
    if normalize_for_comparison(a) == normalize_for_comparison(b) {
        return Ok(true);
    }
    let overlap = host.intersect(&a.sheet_name, &a.cells, &b.cells).await?;
    Ok(overlap.is_some())
}

fn unquote_sheet(sheet: &str) -> String {
    let sheet = sheet.trim();
    match sheet
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    {
        Some(inner) => inner.replace("''", "'"),
        None => sheet.to_string(),
    }
}

fn strip_markers(cells: &str) -> String {
    cells
        .trim()
        .chars()
        .filter(|&c| c != '$' && c != '\'' && c != '"')
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain() {
        let addr = parse_qualified_address("Sheet1!B2");
        assert_eq!(addr.sheet_name, "Sheet1");
        assert_eq!(addr.cells, "B2");
    }

    #[test]
    fn test_parse_strips_markers_and_formula_prefix() {
        let addr = parse_qualified_address("=Sheet1!$B$2:$C$4");
        assert_eq!(addr, Address::new("Sheet1", "B2:C4"));
    }

    #[test]
    fn test_parse_quoted_sheet_with_separator_inside() {
        let addr = parse_qualified_address("'Q1!Plan ''24'!$A$1");
        assert_eq!(addr.sheet_name, "Q1!Plan '24");
        assert_eq!(addr.cells, "A1");
    }

    #[test]
    fn test_parse_without_sheet() {
        let addr = parse_qualified_address("$C$3");
        assert!(!addr.has_sheet());
        assert_eq!(addr.cells, "C3");
        let qualified = addr.qualified_with("'Data'");
        assert_eq!(qualified.sheet_name, "Data");
    }

    #[test]
    fn test_comparison_form() {
        let a = parse_qualified_address("'sheet1'!$b$2");
        let b = parse_qualified_address("SHEET1!B2");
        assert_eq!(normalize_for_comparison(&a), normalize_for_comparison(&b));
        assert_eq!(normalize_for_comparison(&b), "SHEET1!B2");
    }

    #[test]
    fn test_same_sheet_is_case_insensitive() {
        let a = Address::new("Sheet1", "A1");
        assert!(a.same_sheet(&Address::new("sheet1", "Z9")));
        assert!(!a.same_sheet(&Address::new("Sheet2", "A1")));
        assert!(!Address::new("", "A1").same_sheet(&Address::new("", "A1")));
    }

    #[test]
    fn test_display_quotes_when_needed() {
        assert_eq!(Address::new("Sheet1", "B2").to_string(), "Sheet1!B2");
        assert_eq!(
            Address::new("It's Q1", "B2").to_string(),
            "'It''s Q1'!B2"
        );
        let roundtrip = parse_qualified_address(&Address::new("It's Q1", "B2").to_string());
        assert_eq!(roundtrip.sheet_name, "It's Q1");
    }
}
