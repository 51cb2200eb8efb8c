//! Workbook type - the main document structure

use crate::cell::RangeAddress;
use crate::error::{Error, Result};
use crate::named_range::{NameScope, NamedRange, NamedRangeCollection};
use crate::table::{Table, TableReference};
use crate::worksheet::Worksheet;
use crate::MAX_SHEET_NAME_LEN;

/// A workbook (spreadsheet document)
///
/// A workbook contains one or more worksheets, defined names and tables.
#[derive(Debug, Clone)]
pub struct Workbook {
    worksheets: Vec<Worksheet>,
    named_ranges: NamedRangeCollection,
    tables: Vec<Table>,
}

impl Workbook {
    /// Create a new empty workbook with one worksheet named `Sheet1`
    pub fn new() -> Self {
        Self {
            worksheets: vec![Worksheet::new("Sheet1")],
            named_ranges: NamedRangeCollection::new(),
            tables: Vec::new(),
        }
    }

    /// Create an empty workbook with no worksheets
    pub fn empty() -> Self {
        Self {
            worksheets: Vec::new(),
            named_ranges: NamedRangeCollection::new(),
            tables: Vec::new(),
        }
    }

    /// Get the number of worksheets
    pub fn sheet_count(&self) -> usize {
        self.worksheets.len()
    }

    /// Get a worksheet by index
    pub fn worksheet(&self, index: usize) -> Option<&Worksheet> {
        self.worksheets.get(index)
    }

    /// Get a mutable worksheet by index
    pub fn worksheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.worksheets.get_mut(index)
    }

    /// Get a worksheet by name (case-insensitive)
    pub fn worksheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.sheet_index(name).map(|i| &self.worksheets[i])
    }

    /// Get a mutable worksheet by name (case-insensitive)
    pub fn worksheet_by_name_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        let index = self.sheet_index(name)?;
        self.worksheets.get_mut(index)
    }

    /// Get the index of a worksheet by name (case-insensitive)
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.worksheets
            .iter()
            .position(|ws| ws.name().eq_ignore_ascii_case(name))
    }

    /// Iterate over all worksheets
    pub fn worksheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.worksheets.iter()
    }

    /// Iterate over all worksheets mutably
    pub fn worksheets_mut(&mut self) -> impl Iterator<Item = &mut Worksheet> {
        self.worksheets.iter_mut()
    }

    /// Add a new worksheet with default name
    pub fn add_worksheet(&mut self) -> Result<usize> {
        let name = self.generate_sheet_name();
        self.add_worksheet_with_name(&name)
    }

    /// Add a new worksheet with specified name
    pub fn add_worksheet_with_name(&mut self, name: &str) -> Result<usize> {
        self.validate_sheet_name(name)?;
        self.worksheets.push(Worksheet::new(name));
        Ok(self.worksheets.len() - 1)
    }

    /// Remove a worksheet by index
    pub fn remove_worksheet(&mut self, index: usize) -> Result<Worksheet> {
        if index >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }
        Ok(self.worksheets.remove(index))
    }

    // ==================== Named Ranges ====================

    /// Define a new workbook-scoped named range
    ///
    /// # Example
    /// ```
    /// use gridcalc_core::Workbook;
    ///
    /// let mut wb = Workbook::new();
    /// wb.define_name("TaxRate", "Sheet1!$B$1").unwrap();
    /// ```
    pub fn define_name(&mut self, name: &str, refers_to: &str) -> Result<()> {
        self.define_name_with_scope(name, refers_to, NameScope::Workbook)
    }

    /// Define a named range with a specific scope
    pub fn define_name_with_scope(
        &mut self,
        name: &str,
        refers_to: &str,
        scope: NameScope,
    ) -> Result<()> {
        self.named_ranges
            .define(NamedRange::new(name, refers_to, scope))
            .map_err(Error::InvalidName)
    }

    /// Get a named range by name, sheet-scoped first, then workbook-scoped
    pub fn get_named_range(&self, name: &str, current_sheet: Option<&str>) -> Option<&NamedRange> {
        let sheet = current_sheet.and_then(|s| self.sheet_index(s));
        self.named_ranges.get(name, sheet)
    }

    /// Get the named range collection (read-only)
    pub fn named_ranges(&self) -> &NamedRangeCollection {
        &self.named_ranges
    }

    // ==================== Tables ====================

    /// Register a table covering `range` (A1 text, header row first)
    ///
    /// Column names are read from the header row when present, otherwise `Column1..n`.
    pub fn add_table(
        &mut self,
        name: &str,
        worksheet: &str,
        range: &str,
        has_header: bool,
        has_totals: bool,
    ) -> Result<()> {
        if self.table(name).is_some() {
            return Err(Error::InvalidTable(format!("table '{}' already exists", name)));
        }
        let sheet = self
            .worksheet_by_name(worksheet)
            .ok_or_else(|| Error::SheetNotFound(worksheet.to_string()))?;
        let range = crate::cell::RangeAddressFactory::default().parse(range, Some(sheet.name()))?;
        if range.row_count() < u32::from(has_header) + u32::from(has_totals) {
            return Err(Error::InvalidTable(format!(
                "range {} is too small for table '{}'",
                range, name
            )));
        }

        let columns = (range.from_col..=range.to_col)
            .enumerate()
            .map(|(i, col)| {
                let header = sheet.get_value_at(range.from_row, col);
                match header.as_string() {
                    Some(text) if has_header && !text.is_empty() => text.to_string(),
                    _ => format!("Column{}", i + 1),
                }
            })
            .collect();

        self.tables.push(Table {
            name: name.to_string(),
            range,
            columns,
            has_header,
            has_totals,
        });
        Ok(())
    }

    /// Find a table by name (case-insensitive)
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Resolve a structured reference such as `Sales[Amount]` to cells
    pub fn table_range(&self, reference: &TableReference) -> Option<RangeAddress> {
        self.table(&reference.table)?.resolve(&reference.specifier)
    }

    fn validate_sheet_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidSheetName("Sheet name cannot be empty".into()));
        }
        if name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name too long (max {} characters)",
                MAX_SHEET_NAME_LEN
            )));
        }

        const INVALID_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name cannot contain '{}'",
                c
            )));
        }

        if self.sheet_index(name).is_some() {
            return Err(Error::DuplicateSheetName(name.into()));
        }
        Ok(())
    }

    fn generate_sheet_name(&self) -> String {
        let mut n = self.worksheets.len() + 1;
        loop {
            let name = format!("Sheet{}", n);
            if self.sheet_index(&name).is_none() {
                return name;
            }
            n += 1;
        }
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TableSpecifier;

    #[test]
    fn test_new_workbook() {
        let wb = Workbook::new();
        assert_eq!(wb.sheet_count(), 1);
        assert_eq!(wb.worksheet(0).unwrap().name(), "Sheet1");
    }

    #[test]
    fn test_add_worksheets() {
        let mut wb = Workbook::new();
        assert_eq!(wb.add_worksheet().unwrap(), 1);
        assert_eq!(wb.add_worksheet_with_name("Data").unwrap(), 2);
        assert_eq!(wb.worksheet(1).unwrap().name(), "Sheet2");
        assert_eq!(wb.sheet_index("data"), Some(2));
    }

    #[test]
    fn test_invalid_sheet_names() {
        let mut wb = Workbook::new();
        assert!(wb.add_worksheet_with_name("SHEET1").is_err());
        assert!(wb.add_worksheet_with_name("").is_err());
        assert!(wb.add_worksheet_with_name("Sheet/1").is_err());
        assert!(wb
            .add_worksheet_with_name(&"A".repeat(MAX_SHEET_NAME_LEN + 1))
            .is_err());
    }

    #[test]
    fn test_sheet_scoped_name_lookup() {
        let mut wb = Workbook::new();
        wb.add_worksheet_with_name("Data").unwrap();
        wb.define_name("Rate", "0.1").unwrap();
        wb.define_name_with_scope("Rate", "Data!$A$1", NameScope::Sheet(1))
            .unwrap();

        assert_eq!(wb.get_named_range("rate", Some("Sheet1")).unwrap().refers_to, "0.1");
        assert_eq!(
            wb.get_named_range("rate", Some("Data")).unwrap().refers_to,
            "Data!$A$1"
        );
    }

    #[test]
    fn test_table_columns_from_header() {
        let mut wb = Workbook::new();
        let ws = wb.worksheet_mut(0).unwrap();
        ws.set_cell_value("A1", "Region").unwrap();
        ws.set_cell_value("B1", "Amount").unwrap();
        wb.add_table("Sales", "Sheet1", "A1:B4", true, false).unwrap();

        let range = wb
            .table_range(&TableReference {
                table: "sales".into(),
                specifier: TableSpecifier::Column("Amount".into()),
            })
            .unwrap();
        assert_eq!(range.to_string(), "Sheet1!B2:B4");
        assert!(wb.add_table("Sales", "Sheet1", "D1:D2", true, false).is_err());
    }
}
