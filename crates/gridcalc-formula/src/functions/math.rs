//! Math functions

use super::{collect_numbers, optional_number, FunctionArgument};
use crate::error::{FormulaError, FormulaResult};
use crate::session::ParsingContext;
use crate::value::FormulaValue;
use gridcalc_core::CellError;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

fn num_error() -> FormulaError {
    FormulaError::Value(CellError::Num)
}

/// SUM function
pub fn fn_sum(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(collect_numbers(args, ctx)?.into_iter().sum()))
}

/// PRODUCT function. No numbers at all gives 0.
pub fn fn_product(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let numbers = collect_numbers(args, ctx)?;
    if numbers.is_empty() {
        return Ok(FormulaValue::Number(0.0));
    }
    Ok(FormulaValue::Number(numbers.into_iter().product()))
}

/// ABS(number)
pub fn fn_abs(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(args[0].number(ctx)?.abs()))
}

/// Round in decimal arithmetic so that `ROUND(2.675, 2)` is 2.68.
///
/// Negative digit counts round to the left of the decimal point.
fn round_with(number: f64, digits: f64, strategy: RoundingStrategy) -> FormulaResult<f64> {
    let Some(value) = Decimal::from_f64(number) else {
        // beyond Decimal's range every f64 is already integral
        return Ok(number);
    };
    let digits = digits.trunc() as i64;
    let rounded = if digits >= 0 {
        value.round_dp_with_strategy(digits.min(28) as u32, strategy)
    } else if digits < -18 {
        Decimal::ZERO
    } else {
        let factor = Decimal::from(10_i64.pow(digits.unsigned_abs() as u32));
        (value / factor).round_dp_with_strategy(0, strategy) * factor
    };
    rounded.to_f64().ok_or_else(num_error)
}

fn round_function(
    args: &[FunctionArgument],
    ctx: &ParsingContext<'_>,
    strategy: RoundingStrategy,
) -> FormulaResult<FormulaValue> {
    let number = args[0].number(ctx)?;
    let digits = optional_number(args, 1, 0.0, ctx)?;
    Ok(FormulaValue::Number(round_with(number, digits, strategy)?))
}

/// ROUND(number, [num_digits]) - half away from zero
pub fn fn_round(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    round_function(args, ctx, RoundingStrategy::MidpointAwayFromZero)
}

/// ROUNDUP(number, [num_digits]) - away from zero
pub fn fn_roundup(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    round_function(args, ctx, RoundingStrategy::AwayFromZero)
}

/// ROUNDDOWN(number, [num_digits]) - toward zero
pub fn fn_rounddown(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    round_function(args, ctx, RoundingStrategy::ToZero)
}

/// INT(number) - rounds down to the nearest integer
pub fn fn_int(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(args[0].number(ctx)?.floor()))
}

/// MOD(number, divisor)
///
/// The result has the sign of the divisor: `number - divisor * floor(number / divisor)`.
pub fn fn_mod(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let number = args[0].number(ctx)?;
    let divisor = args[1].number(ctx)?;
    if divisor == 0.0 {
        return Ok(FormulaValue::Error(CellError::Div0));
    }
    Ok(FormulaValue::Number(number - divisor * (number / divisor).floor()))
}

/// POWER(number, power)
pub fn fn_power(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let base = args[0].number(ctx)?;
    let exponent = args[1].number(ctx)?;
    if base == 0.0 && exponent == 0.0 {
        return Err(num_error());
    }
    if base == 0.0 && exponent < 0.0 {
        return Ok(FormulaValue::Error(CellError::Div0));
    }
    let result = base.powf(exponent);
    if !result.is_finite() {
        return Err(num_error());
    }
    Ok(FormulaValue::Number(result))
}

/// SQRT(number)
pub fn fn_sqrt(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let number = args[0].number(ctx)?;
    if number < 0.0 {
        return Err(num_error());
    }
    Ok(FormulaValue::Number(number.sqrt()))
}

/// SUMPRODUCT(array1, [array2], ...)
///
/// All arrays must have the same dimensions. Non-numeric entries count as 0.
pub fn fn_sumproduct(args: &[FunctionArgument], _ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let mut products: Option<(usize, usize, Vec<f64>)> = None;

    for arg in args {
        let grid = arg.to_grid();
        let rows = grid.len();
        let cols = grid.first().map_or(0, Vec::len);
        let mut values = Vec::with_capacity(rows * cols);
        for value in grid.iter().flatten() {
            match value {
                FormulaValue::Number(n) => values.push(*n),
                FormulaValue::Error(e) => return Err(FormulaError::Value(*e)),
                _ => values.push(0.0),
            }
        }

        products = match products {
            None => Some((rows, cols, values)),
            Some((r, c, _)) if r != rows || c != cols => return Err(FormulaError::Value(CellError::Value)),
            Some((r, c, mut acc)) => {
                acc.iter_mut().zip(values).for_each(|(a, v)| *a *= v);
                Some((r, c, acc))
            }
        };
    }

    Ok(FormulaValue::Number(
        products.map_or(0.0, |(_, _, values)| values.into_iter().sum()),
    ))
}

/// RAND() - Returns a random number between 0 and 1
pub fn fn_rand(_args: &[FunctionArgument], _ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    Ok(FormulaValue::Number(rng.gen::<f64>()))
}

/// RANDBETWEEN(bottom, top) - Returns a random integer between bottom and top (inclusive)
pub fn fn_randbetween(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    use rand::Rng;

    let bottom = args[0].number(ctx)?.ceil() as i64;
    let top = args[1].number(ctx)?.floor() as i64;
    if bottom > top {
        return Err(num_error());
    }

    let mut rng = rand::thread_rng();
    Ok(FormulaValue::Number(rng.gen_range(bottom..=top) as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FormulaEngine;
    use gridcalc_core::Workbook;
    use pretty_assertions::assert_eq;

    fn eval(workbook: &Workbook, formula: &str) -> FormulaValue {
        FormulaEngine::new().evaluate(workbook, "Sheet1", formula).unwrap()
    }

    fn sheet() -> Workbook {
        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();
        sheet.set_cell_value("A1", 1.0).unwrap();
        sheet.set_cell_value("A2", "2").unwrap();
        sheet.set_cell_value("A3", true).unwrap();
        sheet.set_cell_value("A4", 4.0).unwrap();
        workbook
    }

    #[test]
    fn test_sum_skips_text_in_references_only() {
        let workbook = sheet();
        assert_eq!(eval(&workbook, "=SUM(A1:A4)"), FormulaValue::Number(5.0));
        assert_eq!(eval(&workbook, "=SUM(1,\"2\",TRUE)"), FormulaValue::Number(4.0));
        assert_eq!(eval(&workbook, "=SUM(1,\"x\")"), FormulaValue::Error(CellError::Value));
        assert_eq!(eval(&workbook, "=SUM({1,2;3,4})"), FormulaValue::Number(10.0));
        assert_eq!(eval(&workbook, "=PRODUCT(A1:A4,2)"), FormulaValue::Number(8.0));
    }

    #[test]
    fn test_rounding() {
        let workbook = Workbook::new();
        assert_eq!(eval(&workbook, "=ROUND(2.675,2)"), FormulaValue::Number(2.68));
        assert_eq!(eval(&workbook, "=ROUND(-2.5)"), FormulaValue::Number(-3.0));
        assert_eq!(eval(&workbook, "=ROUND(1234.5,-2)"), FormulaValue::Number(1200.0));
        assert_eq!(eval(&workbook, "=ROUNDUP(3.21,1)"), FormulaValue::Number(3.3));
        assert_eq!(eval(&workbook, "=ROUNDDOWN(-3.29,1)"), FormulaValue::Number(-3.2));
        assert_eq!(eval(&workbook, "=INT(-1.5)"), FormulaValue::Number(-2.0));
    }

    #[test]
    fn test_mod_power_sqrt() {
        let workbook = Workbook::new();
        assert_eq!(eval(&workbook, "=MOD(-3,2)"), FormulaValue::Number(1.0));
        assert_eq!(eval(&workbook, "=MOD(3,0)"), FormulaValue::Error(CellError::Div0));
        assert_eq!(eval(&workbook, "=POWER(2,10)"), FormulaValue::Number(1024.0));
        assert_eq!(eval(&workbook, "=SQRT(-1)"), FormulaValue::Error(CellError::Num));
        assert_eq!(eval(&workbook, "=ABS(-4)"), FormulaValue::Number(4.0));
    }

    #[test]
    fn test_sumproduct() {
        let workbook = Workbook::new();
        assert_eq!(eval(&workbook, "=SUMPRODUCT({1,2,3},{4,5,6})"), FormulaValue::Number(32.0));
        assert_eq!(
            eval(&workbook, "=SUMPRODUCT({1,2},{1,2,3})"),
            FormulaValue::Error(CellError::Value)
        );
    }

    #[test]
    fn test_random_functions() {
        let workbook = Workbook::new();
        let FormulaValue::Number(r) = eval(&workbook, "=RAND()") else {
            panic!("RAND should return a number");
        };
        assert!((0.0..1.0).contains(&r));
        let FormulaValue::Number(n) = eval(&workbook, "=RANDBETWEEN(3,5)") else {
            panic!("RANDBETWEEN should return a number");
        };
        assert!((3.0..=5.0).contains(&n) && n.fract() == 0.0);
        assert_eq!(eval(&workbook, "=RANDBETWEEN(5,3)"), FormulaValue::Error(CellError::Num));
    }
}
