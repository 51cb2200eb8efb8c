//! Worksheet-qualified range addresses

use super::address::{AddressTranslator, CellAddress};
use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;

/// A rectangular span of cells, optionally qualified with a worksheet name
///
/// After construction `from_row <= to_row` and `from_col <= to_col` always hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangeAddress {
    /// Worksheet name; `None` means "the worksheet of the formula being evaluated"
    pub worksheet: Option<String>,
    pub from_row: u32,
    pub to_row: u32,
    pub from_col: u32,
    pub to_col: u32,
}

impl RangeAddress {
    /// Create a range, normalizing the corners so the first one is top-left
    pub fn new(
        worksheet: Option<String>,
        from_row: u32,
        from_col: u32,
        to_row: u32,
        to_col: u32,
    ) -> Self {
        Self {
            worksheet,
            from_row: from_row.min(to_row),
            to_row: from_row.max(to_row),
            from_col: from_col.min(to_col),
            to_col: from_col.max(to_col),
        }
    }

    /// Create a single-cell range
    pub fn single(worksheet: Option<String>, row: u32, col: u32) -> Self {
        Self::new(worksheet, row, col, row, col)
    }

    /// Same span on another worksheet
    pub fn with_worksheet(mut self, worksheet: impl Into<String>) -> Self {
        self.worksheet = Some(worksheet.into());
        self
    }

    /// Qualify with `worksheet` unless already qualified
    pub fn or_worksheet(mut self, worksheet: &str) -> Self {
        if self.worksheet.is_none() {
            self.worksheet = Some(worksheet.to_string());
        }
        self
    }

    pub fn is_single_cell(&self) -> bool {
        self.from_row == self.to_row && self.from_col == self.to_col
    }

    pub fn row_count(&self) -> u32 {
        self.to_row - self.from_row + 1
    }

    pub fn col_count(&self) -> u32 {
        self.to_col - self.from_col + 1
    }

    pub fn cell_count(&self) -> u64 {
        self.row_count() as u64 * self.col_count() as u64
    }

    /// Whether (row, col) lies inside the span; the worksheet is not considered
    pub fn contains(&self, row: u32, col: u32) -> bool {
        row >= self.from_row && row <= self.to_row && col >= self.from_col && col <= self.to_col
    }

    /// Zero-based (row, col) offset of a cell inside this range
    pub fn offset_of(&self, row: u32, col: u32) -> Option<(usize, usize)> {
        self.contains(row, col).then(|| {
            (
                (row - self.from_row) as usize,
                (col - self.from_col) as usize,
            )
        })
    }

    /// Whether both ranges name the same worksheet (case-insensitive)
    pub fn same_worksheet(&self, other: &RangeAddress) -> bool {
        match (&self.worksheet, &other.worksheet) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Whether the two ranges share at least one cell on the same worksheet.
    ///
    /// Symmetric: `a.collides_with(&b) == b.collides_with(&a)`.
    pub fn collides_with(&self, other: &RangeAddress) -> bool {
        self.same_worksheet(other)
            && self.from_row <= other.to_row
            && self.to_row >= other.from_row
            && self.from_col <= other.to_col
            && self.to_col >= other.from_col
    }

    /// The overlapping span of two colliding ranges
    pub fn intersect(&self, other: &RangeAddress) -> Option<RangeAddress> {
        if !self.collides_with(other) {
            return None;
        }
        Some(RangeAddress::new(
            self.worksheet.clone(),
            self.from_row.max(other.from_row),
            self.from_col.max(other.from_col),
            self.to_row.min(other.to_row),
            self.to_col.min(other.to_col),
        ))
    }

    /// Iterate over every (row, col) pair, row-major
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.from_row..=self.to_row)
            .flat_map(move |row| (self.from_col..=self.to_col).map(move |col| (row, col)))
    }

    /// A1 text without the worksheet prefix (`B2` or `A1:C3`)
    pub fn local_address(&self) -> String {
        let from = format!(
            "{}{}",
            AddressTranslator::column_to_letters(self.from_col),
            self.from_row
        );
        if self.is_single_cell() {
            return from;
        }
        format!(
            "{}:{}{}",
            from,
            AddressTranslator::column_to_letters(self.to_col),
            self.to_row
        )
    }
}

impl fmt::Display for RangeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.worksheet {
            if sheet.chars().all(|c| c.is_alphanumeric() || c == '_') {
                write!(f, "{}!", sheet)?;
            } else {
                write!(f, "'{}'!", sheet.replace('\'', "''"))?;
            }
        }
        write!(f, "{}", self.local_address())
    }
}

/// One side of a `from:to` reference
enum AddressPart {
    Cell(CellAddress),
    Column(u32),
    Row(u32),
}

/// Builds [`RangeAddress`] values from coordinates or A1 text
///
/// Whole-column (`A:B`) and whole-row (`2:5`) references expand to the host's bounds.
#[derive(Debug, Clone, Copy)]
pub struct RangeAddressFactory {
    max_rows: u32,
    max_cols: u32,
}

impl Default for RangeAddressFactory {
    fn default() -> Self {
        Self::new(MAX_ROWS, MAX_COLS)
    }
}

impl RangeAddressFactory {
    pub fn new(max_rows: u32, max_cols: u32) -> Self {
        Self { max_rows, max_cols }
    }

    /// Single cell from explicit coordinates
    pub fn create(&self, worksheet: Option<&str>, row: u32, col: u32) -> Result<RangeAddress> {
        self.create_range(worksheet, row, col, row, col)
    }

    /// Range from explicit coordinates
    pub fn create_range(
        &self,
        worksheet: Option<&str>,
        from_row: u32,
        from_col: u32,
        to_row: u32,
        to_col: u32,
    ) -> Result<RangeAddress> {
        for row in [from_row, to_row] {
            if row == 0 || row > self.max_rows {
                return Err(Error::RowOutOfBounds(row, self.max_rows));
            }
        }
        for col in [from_col, to_col] {
            if col == 0 || col > self.max_cols {
                return Err(Error::ColumnOutOfBounds(col, self.max_cols));
            }
        }
        Ok(RangeAddress::new(
            worksheet.map(str::to_string),
            from_row,
            from_col,
            to_row,
            to_col,
        ))
    }

    /// Parse `A1`, `$A$1:B10`, `Sheet1!A1`, `'My Sheet'!A:A` or `3:5`.
    ///
    /// Unqualified text gets `default_worksheet`.
    pub fn parse(&self, text: &str, default_worksheet: Option<&str>) -> Result<RangeAddress> {
        let text = text.trim();
        let (sheet, local) = split_worksheet(text)?;
        let worksheet = sheet.or_else(|| default_worksheet.map(str::to_string));

        if local.is_empty() || local.contains("#REF!") {
            return Err(Error::InvalidRange(text.to_string()));
        }

        let (from, to) = match local.split_once(':') {
            Some((from, to)) => (parse_part(from)?, parse_part(to)?),
            None => {
                let cell = CellAddress::parse(local)?;
                return self.create_range(
                    worksheet.as_deref(),
                    cell.row,
                    cell.col,
                    cell.row,
                    cell.col,
                );
            }
        };

        let (from_row, from_col, to_row, to_col) = match (from, to) {
            (AddressPart::Cell(a), AddressPart::Cell(b)) => (a.row, a.col, b.row, b.col),
            (AddressPart::Column(a), AddressPart::Column(b)) => (1, a, self.max_rows, b),
            (AddressPart::Row(a), AddressPart::Row(b)) => (a, 1, b, self.max_cols),
            _ => return Err(Error::InvalidRange(text.to_string())),
        };
        self.create_range(worksheet.as_deref(), from_row, from_col, to_row, to_col)
    }

    /// Whether `text` can be parsed as an address by [`RangeAddressFactory::parse`]
    pub fn is_valid_address(&self, text: &str) -> bool {
        self.parse(text, None).is_ok()
    }
}

/// Split `Sheet!A1` into the (unquoted) sheet name and the local part
fn split_worksheet(text: &str) -> Result<(Option<String>, &str)> {
    let Some(bang) = text.rfind('!') else {
        return Ok((None, text));
    };
    let (sheet, local) = (&text[..bang], &text[bang + 1..]);
    if sheet.is_empty() {
        return Err(Error::InvalidAddress(text.to_string()));
    }
    let sheet = if sheet.len() >= 2 && sheet.starts_with('\'') && sheet.ends_with('\'') {
        sheet[1..sheet.len() - 1].replace("''", "'")
    } else {
        sheet.to_string()
    };
    Ok((Some(sheet), local))
}

fn parse_part(part: &str) -> Result<AddressPart> {
    let bare = part.trim().trim_start_matches('$');
    if !bare.is_empty() && bare.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Ok(AddressPart::Column(AddressTranslator::letters_to_column(bare)?));
    }
    if !bare.is_empty() && bare.bytes().all(|b| b.is_ascii_digit()) {
        let row: u32 = bare
            .parse()
            .map_err(|_| Error::InvalidAddress(part.to_string()))?;
        if row == 0 || row > MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS));
        }
        return Ok(AddressPart::Row(row));
    }
    CellAddress::parse(part).map(AddressPart::Cell)
}
