//! # gridcalc-formula
//!
//! Formula engine for gridcalc.
//!
//! This crate provides:
//! - Tokenization of formula text into flag-typed tokens
//! - Syntactic validation of the token stream
//! - Expression graph construction with spreadsheet operator precedence
//! - Demand-driven evaluation with circular-reference detection
//! - A function repository with per-function compilation strategies
//!
//! ## Example
//!
//! ```rust
//! use gridcalc_core::Workbook;
//! use gridcalc_formula::{FormulaEngine, FormulaValue};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//! sheet.set_cell_value("A1", 10.0).unwrap();
//! sheet.set_cell_formula("A2", "=A1*2").unwrap();
//!
//! let engine = FormulaEngine::new();
//! let value = engine.parse_at(&workbook, "Sheet1", 2, 1).unwrap();
//! assert_eq!(value, FormulaValue::Number(20.0));
//! ```

pub mod address_cache;
pub mod analyzer;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod functions;
pub mod graph;
pub mod options;
pub mod provider;
pub mod scope;
pub mod session;
pub mod token;
pub mod tokenizer;
pub mod value;

pub use address_cache::ExcelAddressCache;
pub use analyzer::SyntacticAnalyzer;
pub use compiler::{CompileResult, DataType};
pub use engine::{FormulaEngine, ParsedFormula};
pub use error::{FormulaError, FormulaResult};
pub use functions::{FunctionArgument, FunctionDef, FunctionRepository};
pub use graph::{Expression, ExpressionGraph, GraphBuilder, Literal, Operator};
pub use options::{CalculationOptions, NumberFormatInfo};
pub use provider::{EmptyNameValueProvider, ExcelCell, ExcelDataProvider, NameValueProvider};
pub use scope::{ParsingScope, ParsingScopeListener, ParsingScopes};
pub use session::ParsingContext;
pub use token::{Token, TokenKind};
pub use tokenizer::Tokenizer;
pub use value::{FormulaValue, RangeCell, RangeValue};
