//! Formula error types
//!
//! Spreadsheet errors such as `#DIV/0!` are ordinary values ([`crate::FormulaValue::Error`]).
//! [`FormulaError`] is the structural channel: malformed formulas, unresolved circular
//! references, and domain errors raised so that an enclosing function can intercept them.

use gridcalc_core::CellError;
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula parsing or evaluation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Unbalanced parentheses, unterminated string or an unparseable token sequence
    #[error("Format error: {0}")]
    Format(String),

    /// A token the tokenizer could not classify
    #[error("Unrecognized token: '{0}'")]
    UnrecognizedToken(String),

    /// Evaluation reached a cell that is already being evaluated
    #[error("Circular reference detected at {address}")]
    CircularReference { address: String },

    /// Unknown function
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Reference to an invalid cell, range or worksheet
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// A raised spreadsheet-domain error
    #[error("{0}")]
    Value(CellError),
}

impl FormulaError {
    /// The error value a cell shows when its formula fails with this error
    pub fn to_cell_error(&self) -> CellError {
        match self {
            FormulaError::Format(_)
            | FormulaError::UnrecognizedToken(_)
            | FormulaError::UnknownFunction(_) => CellError::Name,
            FormulaError::ArgumentCount { .. } => CellError::Value,
            FormulaError::CircularReference { .. } | FormulaError::InvalidReference(_) => {
                CellError::Ref
            }
            FormulaError::Value(e) => *e,
        }
    }

    /// Whether IFERROR-style functions may intercept this error
    pub fn is_domain_error(&self) -> bool {
        matches!(
            self,
            FormulaError::Value(_)
                | FormulaError::UnknownFunction(_)
                | FormulaError::InvalidReference(_)
        )
    }

    pub fn is_circular_reference(&self) -> bool {
        matches!(self, FormulaError::CircularReference { .. })
    }
}

impl From<CellError> for FormulaError {
    fn from(e: CellError) -> Self {
        FormulaError::Value(e)
    }
}

impl From<gridcalc_core::Error> for FormulaError {
    fn from(e: gridcalc_core::Error) -> Self {
        FormulaError::InvalidReference(e.to_string())
    }
}
