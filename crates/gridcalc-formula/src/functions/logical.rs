//! Logical functions

use super::{ArgumentCell, FunctionArgument};
use crate::error::{FormulaError, FormulaResult};
use crate::session::ParsingContext;
use crate::value::FormulaValue;
use gridcalc_core::CellError;

/// Truth value of an IF condition
pub(crate) fn condition(arg: &FunctionArgument, ctx: &ParsingContext<'_>) -> FormulaResult<bool> {
    arg.boolean(ctx)
}

/// IF(condition, value_if_true, [value_if_false])
///
/// Only the selected branch is compiled; the other arrives as a placeholder.
pub fn fn_if(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    if condition(&args[0], ctx)? {
        Ok(args[1].value.clone())
    } else {
        Ok(args
            .get(2)
            .map_or(FormulaValue::Boolean(false), |arg| arg.value.clone()))
    }
}

/// IFERROR(value, value_if_error)
pub fn fn_iferror(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    match args[0].scalar(ctx) {
        FormulaValue::Error(_) => Ok(args[1].value.clone()),
        _ => Ok(args[0].value.clone()),
    }
}

/// IFNA(value, value_if_na) - like IFERROR but only for `#N/A`
pub fn fn_ifna(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    match args[0].scalar(ctx) {
        FormulaValue::Error(CellError::Na) => Ok(args[1].value.clone()),
        _ => Ok(args[0].value.clone()),
    }
}

/// Logical values across all arguments. Every argument is inspected, so an
/// error anywhere wins over an early FALSE or TRUE.
fn logical_values(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<Vec<bool>> {
    let mut values = Vec::new();
    for arg in args {
        for cell in arg.cells() {
            if let Some(b) = logical_value(&cell, ctx)? {
                values.push(b);
            }
        }
    }
    if values.is_empty() {
        return Err(FormulaError::Value(CellError::Value));
    }
    Ok(values)
}

fn logical_value(cell: &ArgumentCell<'_>, ctx: &ParsingContext<'_>) -> FormulaResult<Option<bool>> {
    match cell.value {
        FormulaValue::Boolean(b) => Ok(Some(*b)),
        FormulaValue::Number(n) => Ok(Some(*n != 0.0)),
        FormulaValue::Error(e) => Err(FormulaError::Value(*e)),
        FormulaValue::Empty => Ok(None),
        FormulaValue::String(_) if cell.from_reference => Ok(None),
        value => FunctionArgument::new(value.clone()).boolean(ctx).map(Some),
    }
}

/// AND(logical1, ...)
pub fn fn_and(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let values = logical_values(args, ctx)?;
    Ok(FormulaValue::Boolean(values.into_iter().all(|b| b)))
}

/// OR(logical1, ...)
pub fn fn_or(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let values = logical_values(args, ctx)?;
    Ok(FormulaValue::Boolean(values.into_iter().any(|b| b)))
}

/// NOT(logical)
pub fn fn_not(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(!args[0].boolean(ctx)?))
}

/// TRUE() - Returns the logical value TRUE
pub fn fn_true(_args: &[FunctionArgument], _ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(true))
}

/// FALSE() - Returns the logical value FALSE
pub fn fn_false(_args: &[FunctionArgument], _ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(false))
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
    fn test_and_or() {
        let workbook = Workbook::new();
        assert_eq!(eval(&workbook, "=AND(TRUE,1,2>1)"), FormulaValue::Boolean(true));
        assert_eq!(eval(&workbook, "=AND(TRUE,0)"), FormulaValue::Boolean(false));
        assert_eq!(eval(&workbook, "=OR(FALSE,0,\"true\")"), FormulaValue::Boolean(true));
        assert_eq!(eval(&workbook, "=OR(FALSE,{0,0})"), FormulaValue::Boolean(false));
    }

    #[test]
    fn test_and_evaluates_every_argument() {
        let workbook = Workbook::new();
        assert_eq!(eval(&workbook, "=AND(FALSE,1/0)"), FormulaValue::Error(CellError::Div0));
        assert_eq!(eval(&workbook, "=OR(TRUE,NA())"), FormulaValue::Error(CellError::Na));
    }

    #[test]
    fn test_references_to_text_are_skipped() {
        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();
        sheet.set_cell_value("A1", "text").unwrap();
        sheet.set_cell_value("A2", true).unwrap();
        assert_eq!(eval(&workbook, "=AND(A1:A2)"), FormulaValue::Boolean(true));
        assert_eq!(eval(&workbook, "=AND(A1)"), FormulaValue::Error(CellError::Value));
    }

    #[test]
    fn test_not() {
        let workbook = Workbook::new();
        assert_eq!(eval(&workbook, "=NOT(0)"), FormulaValue::Boolean(true));
        assert_eq!(eval(&workbook, "=NOT(\"abc\")"), FormulaValue::Error(CellError::Value));
        assert_eq!(eval(&workbook, "=TRUE()"), FormulaValue::Boolean(true));
    }
}
