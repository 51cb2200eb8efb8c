//! Host interfaces: where cell values and defined names come from

use gridcalc_core::{CellValue, RangeAddress, TableReference, Workbook, MAX_COLS, MAX_ROWS};

/// A cell as seen by the engine
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExcelCell {
    pub value: CellValue,
    /// The cell's row is hidden
    pub is_hidden: bool,
    /// The cell holds a SUBTOTAL result
    pub is_result_of_subtotal: bool,
}

impl ExcelCell {
    pub fn new(value: CellValue) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }
}

/// Source of defined names
pub trait NameValueProvider {
    /// What `name` refers to, as reference, constant or `=formula` text
    fn get_named_value(&self, name: &str, worksheet: Option<&str>) -> Option<String>;

    fn is_named_value(&self, name: &str, worksheet: Option<&str>) -> bool {
        self.get_named_value(name, worksheet).is_some()
    }
}

/// Knows no names at all. Token streams built against it don't depend on the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyNameValueProvider;

impl NameValueProvider for EmptyNameValueProvider {
    fn get_named_value(&self, _name: &str, _worksheet: Option<&str>) -> Option<String> {
        None
    }
}

/// Cell data the engine evaluates against
///
/// Rows and columns are 1-based.
pub trait ExcelDataProvider: NameValueProvider {
    fn worksheet_exists(&self, worksheet: &str) -> bool;

    /// The cell at a position, `None` when the worksheet doesn't exist
    fn get_cell(&self, worksheet: &str, row: u32, col: u32) -> Option<ExcelCell>;

    fn get_value(&self, worksheet: &str, row: u32, col: u32) -> CellValue {
        self.get_cell(worksheet, row, col)
            .map(|cell| cell.value)
            .unwrap_or_default()
    }

    /// Every cell of `range`, row-major
    fn get_range_values(&self, range: &RangeAddress) -> Vec<ExcelCell> {
        let worksheet = range.worksheet.as_deref().unwrap_or_default();
        range
            .cells()
            .map(|(row, col)| self.get_cell(worksheet, row, col).unwrap_or_default())
            .collect()
    }

    /// Last used (row, column) of a worksheet
    fn get_dimension_end(&self, worksheet: &str) -> Option<(u32, u32)>;

    fn max_rows(&self) -> u32 {
        MAX_ROWS
    }

    fn max_columns(&self) -> u32 {
        MAX_COLS
    }

    /// Cells covered by a structured table reference
    fn get_table_range(&self, _reference: &TableReference) -> Option<RangeAddress> {
        None
    }
}

impl NameValueProvider for Workbook {
    fn get_named_value(&self, name: &str, worksheet: Option<&str>) -> Option<String> {
        self.get_named_range(name, worksheet)
            .map(|named| named.refers_to.clone())
    }
}

impl ExcelDataProvider for Workbook {
    fn worksheet_exists(&self, worksheet: &str) -> bool {
        self.worksheet_by_name(worksheet).is_some()
    }

    fn get_cell(&self, worksheet: &str, row: u32, col: u32) -> Option<ExcelCell> {
        let sheet = self.worksheet_by_name(worksheet)?;
        Some(ExcelCell {
            value: sheet.get_value_at(row, col),
            is_hidden: sheet.is_row_hidden(row),
            is_result_of_subtotal: sheet.is_subtotal_result(row, col),
        })
    }

    fn get_dimension_end(&self, worksheet: &str) -> Option<(u32, u32)> {
        self.worksheet_by_name(worksheet)?.dimension_end()
    }

    fn get_table_range(&self, reference: &TableReference) -> Option<RangeAddress> {
        self.table_range(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workbook_cells_carry_row_metadata() {
        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();
        sheet.set_cell_value("A2", 5.0).unwrap();
        sheet.set_row_hidden(2, true);
        sheet.set_subtotal_result(2, 1, true);

        let cell = workbook.get_cell("Sheet1", 2, 1).unwrap();
        assert_eq!(cell.value, CellValue::Number(5.0));
        assert!(cell.is_hidden);
        assert!(cell.is_result_of_subtotal);
        assert!(workbook.get_cell("Missing", 1, 1).is_none());
    }

    #[test]
    fn test_range_values_are_row_major() {
        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();
        sheet.set_cell_value("A1", 1.0).unwrap();
        sheet.set_cell_value("B1", 2.0).unwrap();
        sheet.set_cell_value("A2", 3.0).unwrap();

        let range = RangeAddress::new(Some("Sheet1".into()), 1, 1, 2, 2);
        let values: Vec<CellValue> = workbook
            .get_range_values(&range)
            .into_iter()
            .map(|c| c.value)
            .collect();
        assert_eq!(
            values,
            vec![
                CellValue::Number(1.0),
                CellValue::Number(2.0),
                CellValue::Number(3.0),
                CellValue::Empty
            ]
        );
    }

    #[test]
    fn test_workbook_names() {
        let mut workbook = Workbook::new();
        workbook.define_name("TaxRate", "0.25").unwrap();
        assert!(workbook.is_named_value("taxrate", Some("Sheet1")));
        assert_eq!(workbook.get_named_value("TaxRate", None).as_deref(), Some("0.25"));
        assert!(!EmptyNameValueProvider.is_named_value("TaxRate", None));
    }
}
