//! Conditional aggregation: SUMIF, SUMIFS, COUNTIF, COUNTIFS, AVERAGEIF
//!
//! A formula like `=COUNTIF(A1:A10,">0")` stored in `A5` reads its own cell.
//! Before compiling, the compiler checks whether a criteria range covers the
//! cell being evaluated. If so, the arguments are compiled with that cell
//! reading its last value, and if the cell would satisfy every criterion the
//! call is a circular reference: an error, or 0 when the session allows
//! circular references.

use super::compilers::{compile_arguments, invoke};
use super::criteria::CriteriaMatcher;
use super::{FunctionArgument, FunctionDef, FunctionIdentity};
use crate::compiler::CompileResult;
use crate::error::{FormulaError, FormulaResult};
use crate::graph::Expression;
use crate::session::ParsingContext;
use crate::value::FormulaValue;
use gridcalc_core::CellError;

/// Which arguments are (criteria range, criterion) pairs and which one holds
/// the values to aggregate
#[derive(Debug, Clone, PartialEq, Eq)]
struct Layout {
    pairs: Vec<(usize, usize)>,
    values: Option<usize>,
}

impl Layout {
    fn of(identity: FunctionIdentity, count: usize) -> Self {
        match identity {
            FunctionIdentity::SumIf | FunctionIdentity::AverageIf => Self {
                pairs: vec![(0, 1)],
                values: Some(if count > 2 { 2 } else { 0 }),
            },
            FunctionIdentity::SumIfs => Self {
                pairs: (1..count.saturating_sub(1)).step_by(2).map(|i| (i, i + 1)).collect(),
                values: Some(0),
            },
            FunctionIdentity::CountIfs => Self {
                pairs: (0..count.saturating_sub(1)).step_by(2).map(|i| (i, i + 1)).collect(),
                values: None,
            },
            _ => Self {
                pairs: vec![(0, 1)],
                values: None,
            },
        }
    }
}

pub(crate) fn compile(def: &FunctionDef, args: &[Expression], ctx: &ParsingContext<'_>) -> FormulaResult<CompileResult> {
    let layout = Layout::of(def.identity, args.len());
    let Some(current) = ctx.current_cell() else {
        let arguments = compile_arguments(args, ctx)?;
        return invoke(def, &arguments, ctx);
    };

    let offset = layout.pairs.iter().find_map(|(range_index, _)| {
        let Expression::Address(text) = &args[*range_index] else {
            return None;
        };
        let range = ctx.resolve_address_text(text)?;
        if !range.same_worksheet(&current) {
            return None;
        }
        range.offset_of(current.from_row, current.from_col)
    });
    let Some((row, col)) = offset else {
        let arguments = compile_arguments(args, ctx)?;
        return invoke(def, &arguments, ctx);
    };

    let arguments = {
        let _exclude = ctx.exclude_current_cell();
        compile_arguments(args, ctx)?
    };

    let format = &ctx.options().number_format;
    let matches_itself = layout.pairs.iter().all(|(range_index, criteria_index)| {
        let matcher = CriteriaMatcher::new(&arguments[*criteria_index].scalar(ctx), format);
        value_at(&arguments[*range_index], row, col).is_some_and(|value| matcher.matches(value))
    });

    if !matches_itself {
        return invoke(def, &arguments, ctx);
    }
    if ctx.options().allow_circular_references {
        tracing::debug!(function = def.name, address = %current, "self-referencing criteria resolved to 0");
        return Ok(CompileResult::number(0.0));
    }
    tracing::debug!(function = def.name, address = %current, "self-referencing criteria");
    Err(FormulaError::CircularReference {
        address: current.to_string(),
    })
}

/// Value at a zero-based offset of a range argument
fn value_at(arg: &FunctionArgument, row: usize, col: usize) -> Option<&FormulaValue> {
    match &arg.value {
        FormulaValue::Range(range) => range.get(row, col).map(|cell| &cell.value),
        FormulaValue::Array(rows) => rows.get(row).and_then(|r| r.get(col)),
        value => (row == 0 && col == 0).then_some(value),
    }
}

/// Offsets where every criterion holds. All criteria ranges must share a shape.
fn matching_offsets(
    args: &[FunctionArgument],
    pairs: &[(usize, usize)],
    ctx: &ParsingContext<'_>,
) -> FormulaResult<(usize, usize, Vec<(usize, usize)>)> {
    let format = &ctx.options().number_format;
    let mut shape = None;
    let mut conditions = Vec::with_capacity(pairs.len());
    for (range_index, criteria_index) in pairs {
        let grid = args[*range_index].to_grid();
        let dims = (grid.len(), grid.first().map_or(0, Vec::len));
        if shape.is_some_and(|s| s != dims) {
            return Err(FormulaError::Value(CellError::Value));
        }
        shape = Some(dims);
        conditions.push((grid, CriteriaMatcher::new(&args[*criteria_index].scalar(ctx), format)));
    }

    let (rows, cols) = shape.unwrap_or((0, 0));
    let offsets = (0..rows)
        .flat_map(|r| (0..cols).map(move |c| (r, c)))
        .filter(|&(r, c)| {
            conditions
                .iter()
                .all(|(grid, matcher)| grid.get(r).and_then(|row| row.get(c)).is_some_and(|v| matcher.matches(v)))
        })
        .collect();
    Ok((rows, cols, offsets))
}

/// Numbers at the given offsets of the value argument; errors propagate
fn numbers_at(arg: &FunctionArgument, offsets: &[(usize, usize)]) -> FormulaResult<Vec<f64>> {
    let grid = arg.to_grid();
    let mut numbers = Vec::with_capacity(offsets.len());
    for (r, c) in offsets {
        match grid.get(*r).and_then(|row| row.get(*c)) {
            Some(FormulaValue::Number(n)) => numbers.push(*n),
            Some(FormulaValue::Error(e)) => return Err(FormulaError::Value(*e)),
            _ => {}
        }
    }
    Ok(numbers)
}

fn pair_count_is_valid(args: &[FunctionArgument], first_pair: usize) -> FormulaResult<()> {
    if (args.len() - first_pair) % 2 != 0 {
        return Err(FormulaError::Value(CellError::Value));
    }
    Ok(())
}

/// SUMIF(range, criteria, [sum_range])
pub fn fn_sumif(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let layout = Layout::of(FunctionIdentity::SumIf, args.len());
    let (_, _, offsets) = matching_offsets(args, &layout.pairs, ctx)?;
    let values = layout.values.map_or(&args[0], |index| &args[index]);
    Ok(FormulaValue::Number(numbers_at(values, &offsets)?.into_iter().sum()))
}

/// SUMIFS(sum_range, criteria_range1, criteria1, ...)
pub fn fn_sumifs(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    pair_count_is_valid(args, 1)?;
    let layout = Layout::of(FunctionIdentity::SumIfs, args.len());
    let (rows, cols, offsets) = matching_offsets(args, &layout.pairs, ctx)?;
    let values = layout.values.map_or(&args[0], |index| &args[index]);
    let sum_grid = values.to_grid();
    if sum_grid.len() != rows || sum_grid.first().map_or(0, Vec::len) != cols {
        return Err(FormulaError::Value(CellError::Value));
    }
    Ok(FormulaValue::Number(numbers_at(values, &offsets)?.into_iter().sum()))
}

/// COUNTIF(range, criteria)
pub fn fn_countif(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let (_, _, offsets) = matching_offsets(args, &[(0, 1)], ctx)?;
    Ok(FormulaValue::Number(offsets.len() as f64))
}

/// COUNTIFS(criteria_range1, criteria1, ...)
pub fn fn_countifs(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    pair_count_is_valid(args, 0)?;
    let layout = Layout::of(FunctionIdentity::CountIfs, args.len());
    let (_, _, offsets) = matching_offsets(args, &layout.pairs, ctx)?;
    Ok(FormulaValue::Number(offsets.len() as f64))
}

/// AVERAGEIF(range, criteria, [average_range])
pub fn fn_averageif(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let layout = Layout::of(FunctionIdentity::AverageIf, args.len());
    let (_, _, offsets) = matching_offsets(args, &layout.pairs, ctx)?;
    let values = layout.values.map_or(&args[0], |index| &args[index]);
    let numbers = numbers_at(values, &offsets)?;
    if numbers.is_empty() {
        return Ok(FormulaValue::Error(CellError::Div0));
    }
    Ok(FormulaValue::Number(numbers.iter().sum::<f64>() / numbers.len() as f64))
}
