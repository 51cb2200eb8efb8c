//! Operator semantics: coercion, error propagation, comparison

use super::conversion::text_to_number;
use crate::graph::Operator;
use crate::options::NumberFormatInfo;
use crate::value::FormulaValue;
use gridcalc_core::{CellError, RangeAddress};
use std::cmp::Ordering;

/// What operators need to know about where they are evaluated
#[derive(Debug, Clone, Copy)]
pub(crate) struct OperandContext<'a> {
    pub format: &'a NumberFormatInfo,
    /// The formula cell, for implicit intersection
    pub current_cell: Option<&'a RangeAddress>,
}

/// Reduce a range or array operand to a single value.
///
/// A multi-cell range yields the cell in the formula's own row (for a single
/// column) or column (for a single row); anything else is `#VALUE!`.
pub(crate) fn scalarize(value: &FormulaValue, current_cell: Option<&RangeAddress>) -> FormulaValue {
    match value {
        FormulaValue::Range(range) => {
            if range.cells.len() == 1 {
                return range.cells[0].value.clone();
            }
            let address = &range.address;
            let Some(cell) = current_cell.filter(|c| address.same_worksheet(c)) else {
                return FormulaValue::Error(CellError::Value);
            };
            let hit = if address.from_col == address.to_col
                && (address.from_row..=address.to_row).contains(&cell.from_row)
            {
                range.get((cell.from_row - address.from_row) as usize, 0)
            } else if address.from_row == address.to_row
                && (address.from_col..=address.to_col).contains(&cell.from_col)
            {
                range.get(0, (cell.from_col - address.from_col) as usize)
            } else {
                None
            };
            hit.map_or(FormulaValue::Error(CellError::Value), |c| c.value.clone())
        }
        FormulaValue::Array(rows) => rows
            .first()
            .and_then(|row| row.first())
            .cloned()
            .unwrap_or(FormulaValue::Empty),
        other => other.clone(),
    }
}

/// Coerce a scalar to a number for arithmetic
pub(crate) fn to_number(value: &FormulaValue, format: &NumberFormatInfo) -> Result<f64, CellError> {
    match value {
        FormulaValue::Number(n) => Ok(*n),
        FormulaValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        FormulaValue::Empty => Ok(0.0),
        FormulaValue::String(s) => text_to_number(s, format).ok_or(CellError::Value),
        FormulaValue::Error(e) => Err(*e),
        FormulaValue::Array(_) | FormulaValue::Range(_) => Err(CellError::Value),
    }
}

pub(crate) fn apply_binary(
    op: Operator,
    left: &FormulaValue,
    right: &FormulaValue,
    cx: &OperandContext<'_>,
) -> FormulaValue {
    let left = scalarize(left, cx.current_cell);
    let right = scalarize(right, cx.current_cell);

    if let FormulaValue::Error(e) = left {
        return FormulaValue::Error(e);
    }
    if let FormulaValue::Error(e) = right {
        return FormulaValue::Error(e);
    }

    match op {
        Operator::Concat => FormulaValue::String(left.to_text() + &right.to_text()),
        op if op.is_comparison() => {
            let ordering = compare(&left, &right, cx.format);
            FormulaValue::Boolean(match op {
                Operator::Equal => ordering == Ordering::Equal,
                Operator::NotEqual => ordering != Ordering::Equal,
                Operator::LessThan => ordering == Ordering::Less,
                Operator::LessEqual => ordering != Ordering::Greater,
                Operator::GreaterThan => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            })
        }
        op => arithmetic(op, &left, &right, cx.format),
    }
}

fn arithmetic(op: Operator, left: &FormulaValue, right: &FormulaValue, format: &NumberFormatInfo) -> FormulaValue {
    let (a, b) = match (to_number(left, format), to_number(right, format)) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(e), _) | (_, Err(e)) => return FormulaValue::Error(e),
    };

    let result = match op {
        Operator::Add => a + b,
        Operator::Subtract => a - b,
        Operator::Multiply => a * b,
        Operator::Divide => {
            if b == 0.0 {
                return FormulaValue::Error(CellError::Div0);
            }
            a / b
        }
        Operator::Power => {
            if a == 0.0 && b == 0.0 {
                return FormulaValue::Error(CellError::Num);
            }
            if a == 0.0 && b < 0.0 {
                return FormulaValue::Error(CellError::Div0);
            }
            a.powf(b)
        }
        _ => return FormulaValue::Error(CellError::Value),
    };

    if result.is_finite() {
        FormulaValue::Number(result)
    } else {
        FormulaValue::Error(CellError::Num)
    }
}

pub(crate) fn negate(value: &FormulaValue, cx: &OperandContext<'_>) -> FormulaValue {
    unary(value, cx, |n| -n)
}

pub(crate) fn percent(value: &FormulaValue, cx: &OperandContext<'_>) -> FormulaValue {
    unary(value, cx, |n| n / 100.0)
}

fn unary(value: &FormulaValue, cx: &OperandContext<'_>, f: impl Fn(f64) -> f64) -> FormulaValue {
    let value = scalarize(value, cx.current_cell);
    match to_number(&value, cx.format) {
        Ok(n) => FormulaValue::Number(f(n)),
        Err(e) => FormulaValue::Error(e),
    }
}

/// Ordering used by the comparison operators.
///
/// An empty operand takes the other side's "zero" (`""`, `FALSE` or 0). A
/// number and a numeric-looking string compare as numbers. Otherwise numbers
/// sort before text, text before booleans, and text compares case-insensitively.
pub(crate) fn compare(left: &FormulaValue, right: &FormulaValue, format: &NumberFormatInfo) -> Ordering {
    let (left, right) = (empty_as(left, right), empty_as(right, left));

    match (&left, &right) {
        (FormulaValue::Number(a), FormulaValue::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (FormulaValue::String(a), FormulaValue::String(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        (FormulaValue::Boolean(a), FormulaValue::Boolean(b)) => a.cmp(b),
        (FormulaValue::Number(a), FormulaValue::String(s)) => match text_to_number(s, format) {
            Some(b) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            None => Ordering::Less,
        },
        (FormulaValue::String(s), FormulaValue::Number(b)) => match text_to_number(s, format) {
            Some(a) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            None => Ordering::Greater,
        },
        (a, b) => type_rank(a).cmp(&type_rank(b)),
    }
}

/// `value`, or the counterpart of `other` standing in for an empty value
fn empty_as(value: &FormulaValue, other: &FormulaValue) -> FormulaValue {
    match (value, other) {
        (FormulaValue::Empty, FormulaValue::String(_)) => FormulaValue::String(String::new()),
        (FormulaValue::Empty, FormulaValue::Boolean(_)) => FormulaValue::Boolean(false),
        (FormulaValue::Empty, _) => FormulaValue::Number(0.0),
        (value, _) => value.clone(),
    }
}

fn type_rank(value: &FormulaValue) -> u8 {
    match value {
        FormulaValue::Number(_) | FormulaValue::Empty => 0,
        FormulaValue::String(_) => 1,
        FormulaValue::Boolean(_) => 2,
        _ => 3,
    }
}
