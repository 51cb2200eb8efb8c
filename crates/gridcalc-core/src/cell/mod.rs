//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellValue`] - The value stored in a cell
//! - [`CellError`] - Spreadsheet error values (`#DIV/0!`, `#N/A`, ...)
//! - [`CellAddress`] - A cell's location (e.g., "A1")
//! - [`RangeAddress`] - A worksheet-qualified rectangular span (e.g., "Sheet1!A1:B10")

mod address;
mod range_address;
mod value;

pub use address::{AddressTranslator, CellAddress};
pub use range_address::{RangeAddress, RangeAddressFactory};
pub use value::{CellError, CellValue};
