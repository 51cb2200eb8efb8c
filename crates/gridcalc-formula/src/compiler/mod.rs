//! Expression compiler
//!
//! Compiling an [`Expression`] evaluates it against a [`ParsingContext`]. Domain
//! errors (`#DIV/0!`, `#N/A`, ...) come back as ordinary values inside the
//! [`CompileResult`]; the `Err` channel carries structural failures and errors
//! raised for an enclosing IFERROR-style function to intercept.

pub mod conversion;
pub(crate) mod operators;
mod result;

pub use result::{CompileResult, DataType};

use crate::error::FormulaResult;
use crate::graph::{Expression, Literal};
use crate::session::ParsingContext;
use crate::value::FormulaValue;
use gridcalc_core::CellError;
use operators::OperandContext;

impl Literal {
    pub fn to_value(&self) -> FormulaValue {
        match self {
            Literal::Integer(n) | Literal::Decimal(n) => FormulaValue::Number(*n),
            Literal::String(s) => FormulaValue::String(s.clone()),
            Literal::Boolean(b) => FormulaValue::Boolean(*b),
            Literal::Error(e) => FormulaValue::Error(*e),
            Literal::Empty => FormulaValue::Empty,
            Literal::Enumerable(rows) => FormulaValue::Array(
                rows.iter()
                    .map(|row| row.iter().map(Literal::to_value).collect())
                    .collect(),
            ),
        }
    }

    pub fn compile(&self) -> CompileResult {
        let data_type = match self {
            Literal::Integer(_) => DataType::Integer,
            Literal::Decimal(_) => DataType::Decimal,
            Literal::String(_) => DataType::String,
            Literal::Boolean(_) => DataType::Boolean,
            Literal::Error(_) => DataType::ExcelError,
            Literal::Empty => DataType::Empty,
            Literal::Enumerable(_) => DataType::Enumerable,
        };
        CompileResult::with_type(self.to_value(), data_type)
    }
}

impl Expression {
    pub fn compile(&self, ctx: &ParsingContext<'_>) -> FormulaResult<CompileResult> {
        match self {
            Expression::Literal(literal) => Ok(literal.compile()),
            Expression::Address(text) => compile_address(text, ctx),
            Expression::Name(name) => ctx.resolve_name(name),
            Expression::Function { name, args } => crate::functions::compile_function(name, args, ctx),
            Expression::Group(inner) => inner.compile(ctx),
            Expression::Binary { op, left, right } => {
                let left = left.compile(ctx)?;
                let right = right.compile(ctx)?;
                Ok(with_operands(ctx, |cx| {
                    operators::apply_binary(*op, &left.value, &right.value, cx)
                }))
            }
            Expression::Negation(inner) => {
                let operand = inner.compile(ctx)?;
                Ok(with_operands(ctx, |cx| operators::negate(&operand.value, cx)))
            }
            Expression::Percent(inner) => {
                let operand = inner.compile(ctx)?;
                Ok(with_operands(ctx, |cx| operators::percent(&operand.value, cx)))
            }
        }
    }
}

fn with_operands(
    ctx: &ParsingContext<'_>,
    apply: impl FnOnce(&OperandContext<'_>) -> FormulaValue,
) -> CompileResult {
    let current = ctx.current_cell();
    let cx = OperandContext {
        format: &ctx.options().number_format,
        current_cell: current.as_ref(),
    };
    CompileResult::new(apply(&cx))
}

/// Resolve an address (or table reference) to a cell value or a range.
///
/// Unresolvable references, including ones to missing worksheets, are `#REF!`.
pub(crate) fn compile_address(text: &str, ctx: &ParsingContext<'_>) -> FormulaResult<CompileResult> {
    let Some(range) = ctx.resolve_address_text(text) else {
        return Ok(CompileResult::error(CellError::Ref));
    };
    let id = ctx.register_address(&range);

    if range.is_single_cell() {
        let worksheet = range.worksheet.as_deref().unwrap_or_default();
        let result = ctx.resolve_cell(worksheet, range.from_row, range.from_col)?;
        return Ok(result.with_address_id(id));
    }

    let value = ctx.resolve_range(&range)?;
    Ok(CompileResult::new(FormulaValue::Range(value)).with_address_id(id))
}
