//! Workbook calculation
//!
//! One pass evaluates every formula cell through a single engine session:
//! a formula referenced by another is computed on first use and reused for
//! the rest of the pass. Results are written back as the cells' cached values.
//!
//! # Example
//!
//! ```rust
//! use gridcalc::prelude::*;
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//! sheet.set_cell_value("A1", 10.0).unwrap();
//! sheet.set_cell_value("A2", 20.0).unwrap();
//! sheet.set_cell_formula("A3", "=A1+A2").unwrap();
//!
//! let stats = workbook.calculate().unwrap();
//! assert_eq!(stats.cells_calculated, 1);
//! ```

use crate::{CalculationOptions, CellValue, Error, FormulaEngine, FormulaValue, Result, Workbook};

/// Statistics from a calculation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationStats {
    /// Total number of formula cells
    pub formula_count: usize,
    /// Number of cells calculated
    pub cells_calculated: usize,
    /// Number of formula cells that ended in an unresolved circular reference
    pub circular_references: usize,
    /// Number of formula cells whose result is an error value
    pub errors: usize,
    /// Number of formula cells calling a volatile function
    pub volatile_cells: usize,
}

/// Extension trait for Workbook to add calculation methods
pub trait WorkbookCalculationExt {
    /// Calculate all formulas in the workbook with default options
    fn calculate(&mut self) -> Result<CalculationStats>;

    /// Calculate all formulas with custom options
    fn calculate_with_options(&mut self, options: &CalculationOptions) -> Result<CalculationStats>;
}

impl WorkbookCalculationExt for Workbook {
    fn calculate(&mut self) -> Result<CalculationStats> {
        self.calculate_with_options(&CalculationOptions::default())
    }

    fn calculate_with_options(&mut self, options: &CalculationOptions) -> Result<CalculationStats> {
        let engine = FormulaEngine::with_options(options.clone());
        let (results, stats) = evaluate_formulas(&engine, self);

        let sheet_count = self.sheet_count();
        for result in results {
            let sheet = self
                .worksheet_mut(result.sheet)
                .ok_or(Error::SheetOutOfBounds(result.sheet, sheet_count))?;
            sheet.set_formula_result(result.row, result.col, result.value)?;
        }

        tracing::debug!(
            formulas = stats.formula_count,
            calculated = stats.cells_calculated,
            errors = stats.errors,
            "workbook calculated"
        );
        Ok(stats)
    }
}

struct CellResult {
    sheet: usize,
    row: u32,
    col: u32,
    value: CellValue,
}

fn evaluate_formulas(engine: &FormulaEngine, workbook: &Workbook) -> (Vec<CellResult>, CalculationStats) {
    let mut stats = CalculationStats::default();
    let mut results = Vec::new();
    let ctx = engine.session(workbook);

    for (sheet_idx, sheet) in workbook.worksheets().enumerate() {
        for (row, col, formula) in sheet.formula_cells() {
            stats.formula_count += 1;

            let volatile = engine.is_volatile(formula).unwrap_or(false);
            if volatile {
                stats.volatile_cells += 1;
                let has_cached = matches!(
                    sheet.cell_at(row, col),
                    Some(CellValue::Formula { cached_value: Some(_), .. })
                );
                if !engine.options().calculate_volatile && has_cached {
                    continue;
                }
            }

            let value = match ctx.resolve_cell(sheet.name(), row, col) {
                Ok(result) => result.into_value(),
                Err(e) => {
                    if e.is_circular_reference() {
                        stats.circular_references += 1;
                    }
                    tracing::warn!(sheet = sheet.name(), row, col, error = %e, "formula evaluation failed");
                    FormulaValue::Error(e.to_cell_error())
                }
            };
            if value.is_error() {
                stats.errors += 1;
            }

            stats.cells_calculated += 1;
            results.push(CellResult {
                sheet: sheet_idx,
                row,
                col,
                value: value.into(),
            });
        }
    }

    (results, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CellError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_simple_calculation() {
        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();

        sheet.set_cell_value("A1", 10.0).unwrap();
        sheet.set_cell_value("A2", 20.0).unwrap();
        sheet.set_cell_formula("A3", "=A1+A2").unwrap();

        let stats = workbook.calculate().unwrap();

        assert_eq!(stats.formula_count, 1);
        assert_eq!(stats.cells_calculated, 1);
        assert_eq!(stats.errors, 0);

        let sheet = workbook.worksheet(0).unwrap();
        assert_eq!(sheet.get_calculated_value_at(3, 1), Some(&CellValue::Number(30.0)));
    }

    #[test]
    fn test_chain_calculation() {
        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();

        // dependents come before their inputs in cell order
        sheet.set_cell_formula("A1", "=A2*A4").unwrap();
        sheet.set_cell_formula("A2", "=A3+10").unwrap();
        sheet.set_cell_formula("A3", "=A4*2").unwrap();
        sheet.set_cell_value("A4", 5.0).unwrap();

        let stats = workbook.calculate().unwrap();
        assert_eq!(stats.formula_count, 3);
        assert_eq!(stats.cells_calculated, 3);

        let sheet = workbook.worksheet(0).unwrap();
        assert_eq!(sheet.get_calculated_value_at(3, 1), Some(&CellValue::Number(10.0)));
        assert_eq!(sheet.get_calculated_value_at(2, 1), Some(&CellValue::Number(20.0)));
        assert_eq!(sheet.get_calculated_value_at(1, 1), Some(&CellValue::Number(100.0)));
    }

    #[test]
    fn test_circular_reference_detection() {
        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();

        sheet.set_cell_formula("A1", "=B1").unwrap();
        sheet.set_cell_formula("B1", "=A1").unwrap();

        let stats = workbook.calculate().unwrap();

        assert_eq!(stats.circular_references, 2);
        assert_eq!(stats.errors, 2);
        let sheet = workbook.worksheet(0).unwrap();
        assert_eq!(sheet.get_calculated_value_at(1, 1), Some(&CellValue::Error(CellError::Ref)));
    }

    #[test]
    fn test_structural_errors_become_cell_errors() {
        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();
        sheet.set_cell_formula("A1", "=NOSUCHFN(1)").unwrap();
        sheet.set_cell_formula("A2", "=ABS(1,2)").unwrap();
        sheet.set_cell_formula("A3", "=(1+2").unwrap();

        let stats = workbook.calculate().unwrap();
        assert_eq!(stats.errors, 3);
        assert_eq!(stats.circular_references, 0);

        let sheet = workbook.worksheet(0).unwrap();
        assert_eq!(sheet.get_calculated_value_at(1, 1), Some(&CellValue::Error(CellError::Name)));
        assert_eq!(sheet.get_calculated_value_at(2, 1), Some(&CellValue::Error(CellError::Value)));
        assert_eq!(sheet.get_calculated_value_at(3, 1), Some(&CellValue::Error(CellError::Name)));
    }

    #[test]
    fn test_volatile_cells_can_keep_their_values() {
        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();
        sheet.set_cell_formula("A1", "=RAND()").unwrap();
        sheet.set_cell_formula("A2", "=A1*0+1").unwrap();

        let stats = workbook.calculate().unwrap();
        assert_eq!(stats.volatile_cells, 1);
        let first = workbook.worksheet(0).unwrap().get_calculated_value_at(1, 1).cloned();

        let options = CalculationOptions::default().with_calculate_volatile(false);
        let stats = workbook.calculate_with_options(&options).unwrap();
        assert_eq!(stats.cells_calculated, 1);
        assert_eq!(workbook.worksheet(0).unwrap().get_calculated_value_at(1, 1).cloned(), first);
    }

    #[test]
    fn test_precision_applies_to_results() {
        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();
        sheet.set_cell_formula("A1", "=1/3").unwrap();
        sheet.set_cell_formula("A2", "=A1*3").unwrap();

        let options = CalculationOptions::default().with_precision(2);
        workbook.calculate_with_options(&options).unwrap();

        let sheet = workbook.worksheet(0).unwrap();
        assert_eq!(sheet.get_calculated_value_at(1, 1), Some(&CellValue::Number(0.33)));
        assert_eq!(sheet.get_calculated_value_at(2, 1), Some(&CellValue::Number(0.99)));
    }

    #[test]
    fn test_multiple_sheets() {
        let mut workbook = Workbook::new();
        workbook.worksheet_mut(0).unwrap().set_cell_value("A1", 100.0).unwrap();

        workbook.add_worksheet_with_name("Sheet2").unwrap();
        let sheet2 = workbook.worksheet_mut(1).unwrap();
        sheet2.set_cell_value("A1", 50.0).unwrap();
        sheet2.set_cell_formula("A2", "=Sheet1!A1+A1").unwrap();

        let stats = workbook.calculate().unwrap();
        assert_eq!(stats.formula_count, 1);

        let value = workbook.worksheet(1).unwrap().get_calculated_value_at(2, 1);
        assert_eq!(value, Some(&CellValue::Number(150.0)));
    }

    #[test]
    fn test_empty_result_reads_as_zero() {
        let mut workbook = Workbook::new();
        workbook.worksheet_mut(0).unwrap().set_cell_formula("A2", "=A1").unwrap();
        workbook.calculate().unwrap();
        let value = workbook.worksheet(0).unwrap().get_calculated_value_at(2, 1).cloned();
        assert_eq!(value.map(FormulaValue::from), Some(FormulaValue::Number(0.0)));
    }
}
