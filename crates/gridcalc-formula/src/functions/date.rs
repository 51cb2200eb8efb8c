//! Date/time functions
//!
//! Dates are serial numbers (see [`crate::compiler::conversion`]): the integer
//! part counts days, the fraction is the time of day. Serial 60 is the
//! non-existent 1900-02-29 that spreadsheets keep for compatibility.

use super::FunctionArgument;
use crate::compiler::conversion::{date_to_serial, parse_date, parse_time, serial_to_ymd, ymd_to_serial};
use crate::error::{FormulaError, FormulaResult};
use crate::session::ParsingContext;
use crate::value::FormulaValue;
use chrono::{Local, Timelike};
use gridcalc_core::CellError;

const SECONDS_PER_DAY: f64 = 86_400.0;

fn num_error() -> FormulaError {
    FormulaError::Value(CellError::Num)
}

fn to_i32_trunc(arg: &FunctionArgument, ctx: &ParsingContext<'_>) -> FormulaResult<i32> {
    let n = arg.number(ctx)?.trunc();
    if n < f64::from(i32::MIN) || n > f64::from(i32::MAX) {
        return Err(num_error());
    }
    Ok(n as i32)
}

fn date_parts(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<(i32, u32, u32)> {
    let serial = args[0].number(ctx)?;
    serial_to_ymd(serial).ok_or_else(num_error)
}

/// DATE(year, month, day)
///
/// Years below 1900 are offsets from 1900. Months and days outside their
/// usual range roll over into neighbouring months and years.
pub fn fn_date(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let year = to_i32_trunc(&args[0], ctx)?;
    let month = to_i32_trunc(&args[1], ctx)?;
    let day = to_i32_trunc(&args[2], ctx)?;
    if year < 0 {
        return Err(num_error());
    }
    let serial = ymd_to_serial(year, month, day).ok_or_else(num_error)?;
    Ok(FormulaValue::Number(serial))
}

/// YEAR(serial)
pub fn fn_year(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let (year, _, _) = date_parts(args, ctx)?;
    Ok(FormulaValue::Number(f64::from(year)))
}

/// MONTH(serial)
pub fn fn_month(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let (_, month, _) = date_parts(args, ctx)?;
    Ok(FormulaValue::Number(f64::from(month)))
}

/// DAY(serial)
pub fn fn_day(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let (_, _, day) = date_parts(args, ctx)?;
    Ok(FormulaValue::Number(f64::from(day)))
}

/// TIME(hour, minute, second) - a fraction of a day, wrapping past midnight
pub fn fn_time(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let hour = args[0].number(ctx)?.trunc();
    let minute = args[1].number(ctx)?.trunc();
    let second = args[2].number(ctx)?.trunc();
    let total = hour * 3600.0 + minute * 60.0 + second;
    if total < 0.0 {
        return Err(num_error());
    }
    Ok(FormulaValue::Number((total % SECONDS_PER_DAY) / SECONDS_PER_DAY))
}

/// TIMEVALUE(text) - the time part of a time literal
pub fn fn_timevalue(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let text = args[0].text(ctx)?;
    let text = text.trim();
    // a leading date is allowed and ignored: "2024-01-15 6:30 PM"
    let time_part = text
        .split_once(' ')
        .filter(|(date, _)| parse_date(date).is_some())
        .map_or(text, |(_, time)| time);
    parse_time(time_part)
        .map(FormulaValue::Number)
        .ok_or(FormulaError::Value(CellError::Value))
}

/// DATEVALUE(text) - the serial of a date literal
pub fn fn_datevalue(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let text = args[0].text(ctx)?;
    parse_date(&text)
        .map(FormulaValue::Number)
        .ok_or(FormulaError::Value(CellError::Value))
}

/// TODAY() - current date as a serial number
pub fn fn_today(_args: &[FunctionArgument], _ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(date_to_serial(Local::now().date_naive())))
}

/// NOW() - current date and time as a serial number
pub fn fn_now(_args: &[FunctionArgument], _ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let now = Local::now();
    let date_serial = date_to_serial(now.date_naive());
    let time_fraction = f64::from(now.num_seconds_from_midnight()) / SECONDS_PER_DAY;
    Ok(FormulaValue::Number(date_serial + time_fraction))
}
