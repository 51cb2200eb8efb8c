//! # gridcalc-core
//!
//! Core data structures for the gridcalc formula engine.
//!
//! This crate provides the fundamental types shared by the engine and its hosts:
//! - [`CellValue`] and [`CellError`] - Cell values and the spreadsheet error taxonomy
//! - [`CellAddress`], [`RangeAddress`] - Cell addressing, ranges and collisions
//! - [`AddressTranslator`], [`RangeAddressFactory`] - Text <-> coordinate translation
//! - [`Workbook`], [`Worksheet`] - An in-memory document used as a cell-data host
//!
//! ## Example
//!
//! ```rust
//! use gridcalc_core::{Workbook, CellValue};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//!
//! sheet.set_cell_value("A1", "Hello").unwrap();
//! sheet.set_cell_value("B1", 42.0).unwrap();
//! sheet.set_cell_formula("C1", "=B1*2").unwrap();
//!
//! // Rows and columns are 1-based, as in A1 notation
//! sheet.set_cell_value_at(2, 1, CellValue::Number(2.5)).unwrap();
//! ```

pub mod cell;
pub mod error;
pub mod named_range;
pub mod table;
pub mod workbook;
pub mod worksheet;

pub use cell::{
    AddressTranslator, CellAddress, CellError, CellValue, RangeAddress, RangeAddressFactory,
};
pub use error::{Error, Result};
pub use named_range::{NameScope, NamedRange, NamedRangeCollection};
pub use table::{Table, TableReference, TableSpecifier};
pub use workbook::Workbook;
pub use worksheet::Worksheet;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u32 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
