//! Text functions

use super::{optional_number, FunctionArgument};
use crate::compiler::conversion::text_to_number;
use crate::error::{FormulaError, FormulaResult};
use crate::session::ParsingContext;
use crate::value::FormulaValue;
use gridcalc_core::CellError;

fn take_left(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn take_right(s: &str, n: usize) -> String {
    let len = s.chars().count();
    if n >= len {
        return s.to_string();
    }
    s.chars().skip(len - n).collect()
}

fn take_mid(s: &str, start_1based: usize, n: usize) -> String {
    s.chars().skip(start_1based - 1).take(n).collect()
}

/// Character count argument; negative counts are a `#VALUE!`
fn char_count(args: &[FunctionArgument], index: usize, ctx: &ParsingContext<'_>) -> FormulaResult<usize> {
    let n = optional_number(args, index, 1.0, ctx)?.trunc();
    if n < 0.0 {
        return Err(FormulaError::Value(CellError::Value));
    }
    Ok(n as usize)
}

/// LEN(text)
pub fn fn_len(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(args[0].text(ctx)?.chars().count() as f64))
}

/// LEFT(text, [num_chars])
pub fn fn_left(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let text = args[0].text(ctx)?;
    Ok(FormulaValue::String(take_left(&text, char_count(args, 1, ctx)?)))
}

/// RIGHT(text, [num_chars])
pub fn fn_right(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let text = args[0].text(ctx)?;
    Ok(FormulaValue::String(take_right(&text, char_count(args, 1, ctx)?)))
}

/// MID(text, start_num, num_chars)
pub fn fn_mid(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let text = args[0].text(ctx)?;
    let start = args[1].number(ctx)?.trunc();
    let count = args[2].number(ctx)?.trunc();
    if start < 1.0 || count < 0.0 {
        return Err(FormulaError::Value(CellError::Value));
    }
    Ok(FormulaValue::String(take_mid(&text, start as usize, count as usize)))
}

/// UPPER(text)
pub fn fn_upper(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::String(args[0].text(ctx)?.to_uppercase()))
}

/// LOWER(text)
pub fn fn_lower(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::String(args[0].text(ctx)?.to_lowercase()))
}

/// TRIM(text) - strips the ends and collapses inner runs of spaces to one
pub fn fn_trim(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let text = args[0].text(ctx)?;
    let trimmed = text.split(' ').filter(|word| !word.is_empty()).collect::<Vec<_>>().join(" ");
    Ok(FormulaValue::String(trimmed))
}

/// CONCATENATE(text1, [text2], ...) - one value per argument
pub fn fn_concatenate(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let mut result = String::new();
    for arg in args {
        result.push_str(&arg.text(ctx)?);
    }
    Ok(FormulaValue::String(result))
}

/// CONCAT(text1, [text2], ...) - ranges contribute every cell
pub fn fn_concat(args: &[FunctionArgument], _ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let mut result = String::new();
    for cell in args.iter().flat_map(FunctionArgument::cells) {
        match cell.value {
            FormulaValue::Error(e) => return Err(FormulaError::Value(*e)),
            value => result.push_str(&value.to_text()),
        }
    }
    Ok(FormulaValue::String(result))
}

/// VALUE(text) - numbers, percentages, dates and times
pub fn fn_value(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    match args[0].scalar(ctx) {
        FormulaValue::Number(n) => Ok(FormulaValue::Number(n)),
        FormulaValue::Empty => Ok(FormulaValue::Number(0.0)),
        FormulaValue::Error(e) => Err(FormulaError::Value(e)),
        FormulaValue::String(s) => text_to_number(&s, &ctx.options().number_format)
            .map(FormulaValue::Number)
            .ok_or(FormulaError::Value(CellError::Value)),
        _ => Err(FormulaError::Value(CellError::Value)),
    }
}
