//! Worksheet type

use std::collections::{BTreeMap, BTreeSet};

use crate::cell::{CellAddress, CellValue, RangeAddress};
use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};

/// A worksheet (single sheet in a workbook)
///
/// Cells are stored sparsely, keyed by 1-based `(row, col)`.
#[derive(Debug, Clone)]
pub struct Worksheet {
    /// Sheet name
    name: String,
    cells: BTreeMap<(u32, u32), CellValue>,
    hidden_rows: BTreeSet<u32>,
    /// Rows whose value is itself a SUBTOTAL result
    subtotal_rows: BTreeSet<(u32, u32)>,
}

impl Worksheet {
    /// Create a new worksheet with the given name
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
            hidden_rows: BTreeSet::new(),
            subtotal_rows: BTreeSet::new(),
        }
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the sheet name
    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    // === Cell Access ===

    /// Get cell value (convenience method)
    pub fn get_value(&self, address: &str) -> Result<CellValue> {
        let addr = CellAddress::parse(address)?;
        Ok(self.get_value_at(addr.row, addr.col))
    }

    /// Get cell value by indices
    pub fn get_value_at(&self, row: u32, col: u32) -> CellValue {
        self.cells.get(&(row, col)).cloned().unwrap_or_default()
    }

    /// Borrow the stored cell, if any
    pub fn cell_at(&self, row: u32, col: u32) -> Option<&CellValue> {
        self.cells.get(&(row, col))
    }

    // === Cell Modification ===

    /// Set a cell value by address string
    pub fn set_cell_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_value_at(addr.row, addr.col, value)
    }

    /// Set a cell value by row and column indices
    pub fn set_cell_value_at<V: Into<CellValue>>(
        &mut self,
        row: u32,
        col: u32,
        value: V,
    ) -> Result<()> {
        self.validate_cell_position(row, col)?;
        match value.into() {
            CellValue::Empty => {
                self.cells.remove(&(row, col));
            }
            value => {
                self.cells.insert((row, col), value);
            }
        }
        Ok(())
    }

    /// Set a cell formula by address string
    pub fn set_cell_formula(&mut self, address: &str, formula: &str) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_formula_at(addr.row, addr.col, formula)
    }

    /// Set a cell formula by row and column indices
    pub fn set_cell_formula_at(&mut self, row: u32, col: u32, formula: &str) -> Result<()> {
        self.validate_cell_position(row, col)?;

        let formula = if formula.starts_with('=') {
            formula.to_string()
        } else {
            format!("={}", formula)
        };

        self.cells.insert((row, col), CellValue::formula(formula));
        Ok(())
    }

    /// Clear a cell
    pub fn clear_cell(&mut self, address: &str) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.cells.remove(&(addr.row, addr.col));
        self.subtotal_rows.remove(&(addr.row, addr.col));
        Ok(())
    }

    // === Rows ===

    /// Check if row is hidden
    pub fn is_row_hidden(&self, row: u32) -> bool {
        self.hidden_rows.contains(&row)
    }

    /// Set row hidden state
    pub fn set_row_hidden(&mut self, row: u32, hidden: bool) {
        if hidden {
            self.hidden_rows.insert(row);
        } else {
            self.hidden_rows.remove(&row);
        }
    }

    /// Mark a cell as holding the result of a SUBTOTAL, so enclosing subtotals skip it
    pub fn set_subtotal_result(&mut self, row: u32, col: u32, is_subtotal: bool) {
        if is_subtotal {
            self.subtotal_rows.insert((row, col));
        } else {
            self.subtotal_rows.remove(&(row, col));
        }
    }

    /// Whether the cell holds the result of a SUBTOTAL
    pub fn is_subtotal_result(&self, row: u32, col: u32) -> bool {
        self.subtotal_rows.contains(&(row, col))
    }

    // === Extent ===

    /// Get the used range (bounds of all non-empty cells)
    pub fn used_range(&self) -> Option<RangeAddress> {
        let mut keys = self.cells.keys();
        let &(first_row, first_col) = keys.next()?;
        let (mut min_col, mut max_col, mut max_row) = (first_col, first_col, first_row);
        for &(row, col) in keys {
            min_col = min_col.min(col);
            max_col = max_col.max(col);
            max_row = max_row.max(row);
        }
        Some(RangeAddress::new(
            Some(self.name.clone()),
            first_row,
            min_col,
            max_row,
            max_col,
        ))
    }

    /// Bottom-right corner of the used range as `(row, col)`
    pub fn dimension_end(&self) -> Option<(u32, u32)> {
        self.used_range().map(|r| (r.to_row, r.to_col))
    }

    /// Get the number of non-empty cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Check if the worksheet is empty
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate over all non-empty cells in row-major order
    pub fn iter_cells(&self) -> impl Iterator<Item = (u32, u32, &CellValue)> {
        self.cells.iter().map(|(&(row, col), value)| (row, col, value))
    }

    // === Formula calculation support ===

    /// Iterate over all formula cells: (row, col, formula_text)
    pub fn formula_cells(&self) -> impl Iterator<Item = (u32, u32, &str)> {
        self.iter_cells()
            .filter_map(|(row, col, value)| value.formula_text().map(|text| (row, col, text)))
    }

    /// Get the formula text at a cell position (if it's a formula)
    pub fn get_formula_at(&self, row: u32, col: u32) -> Option<&str> {
        self.cells.get(&(row, col)).and_then(CellValue::formula_text)
    }

    /// Set the cached result value of a formula cell
    ///
    /// Fails if the cell doesn't exist or isn't a formula.
    pub fn set_formula_result(&mut self, row: u32, col: u32, value: CellValue) -> Result<()> {
        let cell = self.cells.get_mut(&(row, col)).ok_or_else(|| {
            Error::InvalidAddress(format!("Cell at ({}, {}) not found", row, col))
        })?;

        match cell {
            CellValue::Formula { cached_value, .. } => {
                *cached_value = Some(Box::new(value));
                Ok(())
            }
            _ => Err(Error::InvalidAddress(format!(
                "Cell at ({}, {}) is not a formula",
                row, col
            ))),
        }
    }

    /// Get the cached value of a formula cell, or the cell value directly if not a formula
    pub fn get_calculated_value_at(&self, row: u32, col: u32) -> Option<&CellValue> {
        self.cells.get(&(row, col)).map(CellValue::effective_value)
    }

    fn validate_cell_position(&self, row: u32, col: u32) -> Result<()> {
        if row == 0 || row > MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS));
        }
        if col == 0 || col > MAX_COLS {
            return Err(Error::ColumnOutOfBounds(col, MAX_COLS));
        }
        Ok(())
    }
}
