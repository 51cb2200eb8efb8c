//! # gridcalc
//!
//! Spreadsheet formula evaluation.
//!
//! gridcalc tokenizes and evaluates Excel-style formulas against a cell-data
//! host. It ships an in-memory [`Workbook`] as that host and a calculation
//! pass that evaluates every formula cell and stores the results.
//!
//! ## Example
//!
//! ```rust
//! use gridcalc::prelude::*;
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//! sheet.set_cell_value("A1", 10.0).unwrap();
//! sheet.set_cell_value("A2", 32.0).unwrap();
//! sheet.set_cell_formula("A3", "=SUM(A1:A2)").unwrap();
//!
//! let stats = workbook.calculate().unwrap();
//! assert_eq!(stats.cells_calculated, 1);
//!
//! let sheet = workbook.worksheet(0).unwrap();
//! assert_eq!(sheet.get_calculated_value_at(3, 1), Some(&CellValue::Number(42.0)));
//! ```
//!
//! Single formulas can be evaluated without touching the workbook:
//!
//! ```rust
//! use gridcalc::prelude::*;
//!
//! let workbook = Workbook::new();
//! let engine = FormulaEngine::new();
//! let value = engine.evaluate(&workbook, "Sheet1", "=ROUND(2.675,2)").unwrap();
//! assert_eq!(value, FormulaValue::Number(2.68));
//! ```

pub mod calculation;
pub mod prelude;

// Re-export calculation types
pub use calculation::{CalculationStats, WorkbookCalculationExt};

// Re-export core types
pub use gridcalc_core::{
    AddressTranslator, CellAddress, CellError, CellValue, Error, NameScope, NamedRange, RangeAddress,
    RangeAddressFactory, Result, Table, TableReference, Workbook, Worksheet, MAX_COLS, MAX_ROWS,
    MAX_SHEET_NAME_LEN,
};

// Re-export formula types
pub use gridcalc_formula::{
    CalculationOptions, ExcelDataProvider, FormulaEngine, FormulaError, FormulaResult, FormulaValue,
    FunctionDef, FunctionRepository, NumberFormatInfo, ParsingContext,
};
