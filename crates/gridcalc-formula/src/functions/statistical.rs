//! Statistical functions and SUBTOTAL

use super::{aggregate_number, ArgumentCell, FunctionArgument};
use crate::error::{FormulaError, FormulaResult};
use crate::session::ParsingContext;
use crate::value::FormulaValue;
use gridcalc_core::CellError;

fn all_cells(args: &[FunctionArgument]) -> Vec<ArgumentCell<'_>> {
    args.iter().flat_map(FunctionArgument::cells).collect()
}

fn numbers_of(cells: &[ArgumentCell<'_>], ctx: &ParsingContext<'_>) -> FormulaResult<Vec<f64>> {
    let mut numbers = Vec::with_capacity(cells.len());
    for cell in cells {
        if let Some(n) = aggregate_number(cell, ctx)? {
            numbers.push(n);
        }
    }
    Ok(numbers)
}

fn average(numbers: &[f64]) -> FormulaResult<f64> {
    if numbers.is_empty() {
        return Err(FormulaError::Value(CellError::Div0));
    }
    Ok(numbers.iter().sum::<f64>() / numbers.len() as f64)
}

/// Sum of squared deviations divided by `n - ddof`
fn variance(numbers: &[f64], ddof: usize) -> FormulaResult<f64> {
    if numbers.len() <= ddof {
        return Err(FormulaError::Value(CellError::Div0));
    }
    let mean = average(numbers)?;
    let squares: f64 = numbers.iter().map(|n| (n - mean).powi(2)).sum();
    Ok(squares / (numbers.len() - ddof) as f64)
}

fn count_numbers(cells: &[ArgumentCell<'_>], ctx: &ParsingContext<'_>) -> usize {
    cells
        .iter()
        .filter(|cell| matches!(aggregate_number(cell, ctx), Ok(Some(_))))
        .count()
}

fn count_non_empty(cells: &[ArgumentCell<'_>]) -> usize {
    cells
        .iter()
        .filter(|cell| !matches!(cell.value, FormulaValue::Empty))
        .count()
}

fn extreme(numbers: Vec<f64>, pick: fn(f64, f64) -> f64) -> f64 {
    numbers.into_iter().reduce(pick).unwrap_or(0.0)
}

/// AVERAGE function
pub fn fn_average(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let numbers = numbers_of(&all_cells(args), ctx)?;
    Ok(FormulaValue::Number(average(&numbers)?))
}

/// COUNT function - numbers only, errors are not counted
pub fn fn_count(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(count_numbers(&all_cells(args), ctx) as f64))
}

/// COUNTA function - every non-empty value, errors included
pub fn fn_counta(args: &[FunctionArgument], _ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(count_non_empty(&all_cells(args)) as f64))
}

/// COUNTBLANK(range) - empty cells and empty strings
pub fn fn_countblank(args: &[FunctionArgument], _ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let blank = args[0]
        .cells()
        .iter()
        .filter(|cell| match cell.value {
            FormulaValue::Empty => true,
            FormulaValue::String(s) => s.is_empty(),
            _ => false,
        })
        .count();
    Ok(FormulaValue::Number(blank as f64))
}

/// MIN function. No numbers gives 0.
pub fn fn_min(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let numbers = numbers_of(&all_cells(args), ctx)?;
    Ok(FormulaValue::Number(extreme(numbers, f64::min)))
}

/// MAX function. No numbers gives 0.
pub fn fn_max(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let numbers = numbers_of(&all_cells(args), ctx)?;
    Ok(FormulaValue::Number(extreme(numbers, f64::max)))
}

/// SUBTOTAL(function_num, ref1, [ref2], ...)
///
/// Codes 1-11 select AVERAGE, COUNT, COUNTA, MAX, MIN, PRODUCT, STDEV, STDEVP,
/// SUM, VAR and VARP. Adding 100 also skips cells in hidden rows. Cells that
/// hold other SUBTOTAL results are always skipped.
pub fn fn_subtotal(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let code = args[0].number(ctx)?.trunc() as i64;
    let (function, skip_hidden) = match code {
        1..=11 => (code, false),
        101..=111 => (code - 100, true),
        _ => return Err(FormulaError::Value(CellError::Value)),
    };

    let cells: Vec<ArgumentCell<'_>> = all_cells(&args[1..])
        .into_iter()
        .filter(|cell| !cell.is_result_of_subtotal && !(skip_hidden && cell.hidden))
        .collect();
    tracing::trace!(function, cells = cells.len(), "subtotal");

    let result = match function {
        2 => count_numbers(&cells, ctx) as f64,
        3 => count_non_empty(&cells) as f64,
        _ => {
            let numbers = numbers_of(&cells, ctx)?;
            match function {
                1 => average(&numbers)?,
                4 => extreme(numbers, f64::max),
                5 => extreme(numbers, f64::min),
                6 if numbers.is_empty() => 0.0,
                6 => numbers.iter().product(),
                7 => variance(&numbers, 1)?.sqrt(),
                8 => variance(&numbers, 0)?.sqrt(),
                9 => numbers.iter().sum(),
                10 => variance(&numbers, 1)?,
                _ => variance(&numbers, 0)?,
            }
        }
    };
    Ok(FormulaValue::Number(result))
}
