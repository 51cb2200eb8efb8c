//! Financial functions: time value of money, NPV and the iterative solvers
//!
//! Sign convention: money paid out is negative, money received is positive.
//! `type` 0 means payments at the end of each period, anything else the start.

use super::{collect_numbers, optional_number, FunctionArgument};
use crate::error::{FormulaError, FormulaResult};
use crate::session::ParsingContext;
use crate::value::FormulaValue;
use gridcalc_core::CellError;

const TOLERANCE: f64 = 1e-7;
const MAX_ITERATIONS: usize = 100;

fn num_error() -> FormulaError {
    FormulaError::Value(CellError::Num)
}

fn finite(value: f64) -> FormulaResult<FormulaValue> {
    if value.is_finite() {
        Ok(FormulaValue::Number(value))
    } else {
        Err(num_error())
    }
}

fn payment_type(args: &[FunctionArgument], index: usize, ctx: &ParsingContext<'_>) -> FormulaResult<f64> {
    Ok(if optional_number(args, index, 0.0, ctx)? != 0.0 { 1.0 } else { 0.0 })
}

/// `((1 + rate)^nper, (1 + rate)^nper - 1)`, the second computed without cancellation
fn growth(rate: f64, nper: f64) -> Option<(f64, f64)> {
    let ln1p = rate.ln_1p();
    if !ln1p.is_finite() {
        return None;
    }
    let g_minus_1 = (nper * ln1p).exp_m1();
    let g = g_minus_1 + 1.0;
    (g.is_finite() && g_minus_1.is_finite()).then_some((g, g_minus_1))
}

/// `pv * g + pmt * (1 + rate * type) * (g - 1) / rate + fv`, zero when the
/// cash flows balance
fn balance(rate: f64, nper: f64, pmt: f64, pv: f64, fv: f64, typ: f64) -> Option<f64> {
    if rate <= -1.0 {
        return None;
    }
    if rate == 0.0 {
        return Some(pv + pmt * nper + fv);
    }
    let (g, g_minus_1) = growth(rate, nper)?;
    Some(pv * g + pmt * (1.0 + rate * typ) * g_minus_1 / rate + fv)
}

/// Newton's method with a central-difference derivative
fn solve(guess: f64, f: impl Fn(f64) -> Option<f64>) -> Option<f64> {
    let mut x = guess;
    for iteration in 0..MAX_ITERATIONS {
        let y = f(x)?;
        if y.abs() < TOLERANCE {
            tracing::trace!(iteration, root = x, "solver converged");
            return Some(x);
        }
        let h = (x.abs() * 1e-6).max(1e-9);
        let slope = (f(x + h)? - f(x - h)?) / (2.0 * h);
        if slope == 0.0 || !slope.is_finite() {
            return None;
        }
        let next = x - y / slope;
        if !next.is_finite() {
            return None;
        }
        if (next - x).abs() < TOLERANCE {
            return Some(next);
        }
        x = next;
    }
    tracing::debug!(guess, "solver did not converge");
    None
}

/// PMT(rate, nper, pv, [fv], [type])
pub fn fn_pmt(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let rate = args[0].number(ctx)?;
    let nper = args[1].number(ctx)?;
    let pv = args[2].number(ctx)?;
    let fv = optional_number(args, 3, 0.0, ctx)?;
    let typ = payment_type(args, 4, ctx)?;

    if nper == 0.0 {
        return Err(FormulaError::Value(CellError::Div0));
    }
    if rate == 0.0 {
        return finite(-(pv + fv) / nper);
    }
    let (g, g_minus_1) = growth(rate, nper).ok_or_else(num_error)?;
    let factor = (1.0 + rate * typ) * g_minus_1 / rate;
    if factor == 0.0 {
        return Err(FormulaError::Value(CellError::Div0));
    }
    finite(-(pv * g + fv) / factor)
}

/// PV(rate, nper, pmt, [fv], [type])
pub fn fn_pv(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let rate = args[0].number(ctx)?;
    let nper = args[1].number(ctx)?;
    let pmt = args[2].number(ctx)?;
    let fv = optional_number(args, 3, 0.0, ctx)?;
    let typ = payment_type(args, 4, ctx)?;

    if rate == 0.0 {
        return finite(-fv - pmt * nper);
    }
    let (g, g_minus_1) = growth(rate, nper).ok_or_else(num_error)?;
    if g == 0.0 {
        return Err(FormulaError::Value(CellError::Div0));
    }
    finite(-(fv + pmt * (1.0 + rate * typ) * g_minus_1 / rate) / g)
}

/// FV(rate, nper, pmt, [pv], [type])
pub fn fn_fv(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let rate = args[0].number(ctx)?;
    let nper = args[1].number(ctx)?;
    let pmt = args[2].number(ctx)?;
    let pv = optional_number(args, 3, 0.0, ctx)?;
    let typ = payment_type(args, 4, ctx)?;

    if rate == 0.0 {
        return finite(-(pv + pmt * nper));
    }
    let (g, g_minus_1) = growth(rate, nper).ok_or_else(num_error)?;
    finite(-(pv * g + pmt * (1.0 + rate * typ) * g_minus_1 / rate))
}

/// NPER(rate, pmt, pv, [fv], [type])
pub fn fn_nper(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let rate = args[0].number(ctx)?;
    let pmt = args[1].number(ctx)?;
    let pv = args[2].number(ctx)?;
    let fv = optional_number(args, 3, 0.0, ctx)?;
    let typ = payment_type(args, 4, ctx)?;

    if rate == 0.0 {
        if pmt == 0.0 {
            return Err(num_error());
        }
        return finite(-(pv + fv) / pmt);
    }

    let ln1p = rate.ln_1p();
    if !ln1p.is_finite() || ln1p == 0.0 {
        return Err(num_error());
    }
    let annuity = pmt * (1.0 + rate * typ) / rate;
    if pv + annuity == 0.0 {
        return Err(num_error());
    }
    let g = (annuity - fv) / (pv + annuity);
    if g <= 0.0 {
        return Err(num_error());
    }
    finite(g.ln() / ln1p)
}

/// NPV(rate, value1, [value2], ...) - the first value is discounted one period
pub fn fn_npv(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let rate = args[0].number(ctx)?;
    if rate == -1.0 {
        return Err(FormulaError::Value(CellError::Div0));
    }
    let values = collect_numbers(&args[1..], ctx)?;
    let npv: f64 = values
        .iter()
        .zip(1..)
        .map(|(value, period)| value / (1.0 + rate).powi(period))
        .sum();
    finite(npv)
}

/// RATE(nper, pmt, pv, [fv], [type], [guess])
pub fn fn_rate(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let nper = args[0].number(ctx)?;
    let pmt = args[1].number(ctx)?;
    let pv = args[2].number(ctx)?;
    let fv = optional_number(args, 3, 0.0, ctx)?;
    let typ = payment_type(args, 4, ctx)?;
    let guess = optional_number(args, 5, 0.1, ctx)?;

    if nper <= 0.0 || guess <= -1.0 {
        return Err(num_error());
    }
    let rate = solve(guess, |r| balance(r, nper, pmt, pv, fv, typ)).ok_or_else(num_error)?;
    finite(rate)
}

/// IRR(values, [guess])
///
/// Needs at least one positive and one negative cash flow.
pub fn fn_irr(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let values = collect_numbers(&args[..1], ctx)?;
    let guess = optional_number(args, 1, 0.1, ctx)?;

    if !values.iter().any(|v| *v > 0.0) || !values.iter().any(|v| *v < 0.0) {
        return Err(num_error());
    }

    let npv = |rate: f64| {
        if rate <= -1.0 {
            return None;
        }
        let total: f64 = values
            .iter()
            .zip(0..)
            .map(|(value, period)| value / (1.0 + rate).powi(period))
            .sum();
        total.is_finite().then_some(total)
    };
    let rate = solve(guess, npv).ok_or_else(num_error)?;
    finite(rate)
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

    fn approx(workbook: &Workbook, formula: &str, expected: f64) {
        match eval(workbook, formula) {
            FormulaValue::Number(n) => assert!((n - expected).abs() < 1e-6, "{formula} = {n}, expected {expected}"),
            other => panic!("{formula} returned {other:?}"),
        }
    }

    #[test]
    fn test_time_value_of_money() {
        let workbook = Workbook::new();
        approx(&workbook, "=PMT(0.08/12,10,10000)", -1037.032_089_36);
        approx(&workbook, "=PMT(0,10,1000)", -100.0);
        approx(&workbook, "=PV(0.08/12,240,500)", -59_777.145_851_2);
        approx(&workbook, "=FV(0.06/12,10,-200,-500,1)", 2581.403_374_06);
        approx(&workbook, "=NPER(0.01,-100,1000)", 10.588_644_459_8);
        assert_eq!(eval(&workbook, "=PMT(0.1,0,1000)"), FormulaValue::Error(CellError::Div0));
    }

    #[test]
    fn test_npv() {
        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();
        sheet.set_cell_value("A1", -10000.0).unwrap();
        sheet.set_cell_value("A2", 3000.0).unwrap();
        sheet.set_cell_value("A3", 4200.0).unwrap();
        sheet.set_cell_value("A4", 6800.0).unwrap();
        approx(&workbook, "=NPV(0.1,A1:A4)", 1188.443_412_34);
    }

    #[test]
    fn test_iterative_solvers() {
        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();
        for (row, value) in [-70000.0, 12000.0, 15000.0, 18000.0, 21000.0, 26000.0].into_iter().enumerate() {
            sheet.set_cell_value_at(row as u32 + 1, 1, value).unwrap();
        }
        approx(&workbook, "=IRR(A1:A6)", 0.086_630_948);
        approx(&workbook, "=RATE(48,-200,8000)", 0.007_701_472_5);
        assert_eq!(eval(&workbook, "=IRR(A2:A6)"), FormulaValue::Error(CellError::Num));
        assert_eq!(eval(&workbook, "=RATE(0,-200,8000)"), FormulaValue::Error(CellError::Num));
    }
}
