//! Information functions
//!
//! ISERROR, ISERR, ISNA and ERROR.TYPE are error-handling functions: an error
//! raised while compiling their argument goes to the `*_handler` hook.

use super::FunctionArgument;
use crate::error::FormulaResult;
use crate::session::ParsingContext;
use crate::value::FormulaValue;
use gridcalc_core::CellError;

/// ISERROR(value)
pub fn fn_iserror(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(match args[0].scalar(ctx) {
        FormulaValue::Error(e) => iserror_handler(e),
        _ => FormulaValue::Boolean(false),
    })
}

pub fn iserror_handler(_error: CellError) -> FormulaValue {
    FormulaValue::Boolean(true)
}

/// ISERR(value) - any error except `#N/A`
pub fn fn_iserr(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(match args[0].scalar(ctx) {
        FormulaValue::Error(e) => iserr_handler(e),
        _ => FormulaValue::Boolean(false),
    })
}

pub fn iserr_handler(error: CellError) -> FormulaValue {
    FormulaValue::Boolean(error != CellError::Na)
}

/// ISNA(value)
pub fn fn_isna(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(match args[0].scalar(ctx) {
        FormulaValue::Error(e) => isna_handler(e),
        _ => FormulaValue::Boolean(false),
    })
}

pub fn isna_handler(error: CellError) -> FormulaValue {
    FormulaValue::Boolean(error == CellError::Na)
}

/// ERROR.TYPE(error_val) - the error's number, `#N/A` for non-errors
pub fn fn_error_type(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(match args[0].scalar(ctx) {
        FormulaValue::Error(e) => error_type_handler(e),
        _ => FormulaValue::Error(CellError::Na),
    })
}

pub fn error_type_handler(error: CellError) -> FormulaValue {
    FormulaValue::Number(f64::from(error.type_number()))
}

/// ISBLANK(value)
pub fn fn_isblank(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(matches!(args[0].scalar(ctx), FormulaValue::Empty)))
}

/// ISNUMBER(value)
pub fn fn_isnumber(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(matches!(args[0].scalar(ctx), FormulaValue::Number(_))))
}

/// ISTEXT(value)
pub fn fn_istext(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(matches!(args[0].scalar(ctx), FormulaValue::String(_))))
}

/// NA()
pub fn fn_na(_args: &[FunctionArgument], _ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Error(CellError::Na))
}

#[cfg(test)]
mod tests {
    use crate::engine::FormulaEngine;
    use crate::value::FormulaValue;
    use gridcalc_core::{CellError, Workbook};
    use pretty_assertions::assert_eq;

    fn eval(workbook: &Workbook, formula: &str) -> FormulaValue {
        FormulaEngine::new().evaluate(workbook, "Sheet1", formula).unwrap()
    }

    #[test]
    fn test_error_predicates() {
        let workbook = Workbook::new();
        assert_eq!(eval(&workbook, "=ISERROR(1/0)"), FormulaValue::Boolean(true));
        assert_eq!(eval(&workbook, "=ISERROR(1)"), FormulaValue::Boolean(false));
        assert_eq!(eval(&workbook, "=ISERR(NA())"), FormulaValue::Boolean(false));
        assert_eq!(eval(&workbook, "=ISERR(#VALUE!)"), FormulaValue::Boolean(true));
        assert_eq!(eval(&workbook, "=ISNA(NA())"), FormulaValue::Boolean(true));
        assert_eq!(eval(&workbook, "=ERROR.TYPE(1/0)"), FormulaValue::Number(2.0));
        assert_eq!(eval(&workbook, "=ERROR.TYPE(1)"), FormulaValue::Error(CellError::Na));
    }

    #[test]
    fn test_type_predicates() {
        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();
        sheet.set_cell_value("A1", "text").unwrap();
        sheet.set_cell_value("A2", 2.0).unwrap();
        assert_eq!(eval(&workbook, "=ISBLANK(A3)"), FormulaValue::Boolean(true));
        assert_eq!(eval(&workbook, "=ISBLANK(A1)"), FormulaValue::Boolean(false));
        assert_eq!(eval(&workbook, "=ISTEXT(A1)"), FormulaValue::Boolean(true));
        assert_eq!(eval(&workbook, "=ISNUMBER(A2)"), FormulaValue::Boolean(true));
        assert_eq!(eval(&workbook, "=ISNUMBER(\"2\")"), FormulaValue::Boolean(false));
    }
}
