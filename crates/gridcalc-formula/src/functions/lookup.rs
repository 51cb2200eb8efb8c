//! Lookup functions
//!
//! These run with circular-reference detection suspended: a lookup table may
//! contain the cell being calculated, and only the cells actually read matter.

use super::criteria::wildcard_match;
use super::{optional_number, FunctionArgument};
use crate::compiler::conversion::text_to_number;
use crate::compiler::operators::compare;
use crate::error::{FormulaError, FormulaResult};
use crate::options::NumberFormatInfo;
use crate::session::ParsingContext;
use crate::value::FormulaValue;
use gridcalc_core::CellError;
use std::cmp::Ordering;

type Grid = Vec<Vec<FormulaValue>>;

fn not_available() -> FormulaError {
    FormulaError::Value(CellError::Na)
}

fn values_equal(lookup: &FormulaValue, candidate: &FormulaValue, format: &NumberFormatInfo) -> bool {
    match (lookup, candidate) {
        (FormulaValue::Number(x), FormulaValue::Number(y)) => x == y,
        (FormulaValue::Boolean(x), FormulaValue::Boolean(y)) => x == y,
        (FormulaValue::String(pattern), FormulaValue::String(text)) => {
            wildcard_match(&pattern.to_lowercase(), &text.to_lowercase())
        }

        // numeric text matches the number it spells
        (FormulaValue::Number(x), FormulaValue::String(s)) | (FormulaValue::String(s), FormulaValue::Number(x)) => {
            text_to_number(s, format) == Some(*x)
        }

        (FormulaValue::Empty, FormulaValue::Empty) => true,
        (FormulaValue::Empty, FormulaValue::Number(n)) | (FormulaValue::Number(n), FormulaValue::Empty) => *n == 0.0,
        (FormulaValue::Empty, FormulaValue::String(s)) | (FormulaValue::String(s), FormulaValue::Empty) => s.is_empty(),

        _ => false,
    }
}

/// Approximate matching only compares like with like
fn same_kind(a: &FormulaValue, b: &FormulaValue) -> bool {
    matches!(
        (a, b),
        (FormulaValue::Number(_), FormulaValue::Number(_))
            | (FormulaValue::String(_), FormulaValue::String(_))
            | (FormulaValue::Boolean(_), FormulaValue::Boolean(_))
    )
}

fn exact_position(keys: &[&FormulaValue], lookup: &FormulaValue, format: &NumberFormatInfo) -> Option<usize> {
    keys.iter().position(|key| values_equal(lookup, key, format))
}

/// Last position of a sorted run whose key still satisfies `accept`.
///
/// Keys of another type are stepped over. The scan stops at the first key
/// that fails.
fn sorted_position(
    keys: &[&FormulaValue],
    lookup: &FormulaValue,
    format: &NumberFormatInfo,
    accept: fn(Ordering) -> bool,
) -> Option<usize> {
    let mut found = None;
    for (index, key) in keys.iter().enumerate() {
        if !same_kind(key, lookup) {
            continue;
        }
        if !accept(compare(key, lookup, format)) {
            break;
        }
        found = Some(index);
    }
    found
}

fn grid_of(arg: &FunctionArgument) -> FormulaResult<Grid> {
    if let FormulaValue::Error(e) = &arg.value {
        return Err(FormulaError::Value(*e));
    }
    let grid = arg.to_grid();
    if grid.is_empty() || grid[0].is_empty() {
        return Err(FormulaError::Value(CellError::Ref));
    }
    Ok(grid)
}

fn lookup_value(arg: &FunctionArgument, ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    match arg.scalar(ctx) {
        FormulaValue::Error(e) => Err(FormulaError::Value(e)),
        value => Ok(value),
    }
}

fn range_lookup(args: &[FunctionArgument], index: usize, ctx: &ParsingContext<'_>) -> FormulaResult<bool> {
    match args.get(index) {
        Some(arg) if !arg.value.is_empty() => arg.boolean(ctx),
        _ => Ok(true),
    }
}

/// Shared body of VLOOKUP and HLOOKUP; `lines` are the table's rows for
/// VLOOKUP and its columns for HLOOKUP.
fn table_lookup(lines: Grid, args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let lookup = lookup_value(&args[0], ctx)?;
    let index = args[2].number(ctx)?.trunc();
    if index < 1.0 {
        return Err(FormulaError::Value(CellError::Value));
    }
    let index = index as usize - 1;
    let width = lines.first().map_or(0, Vec::len);
    if index >= width {
        return Err(FormulaError::Value(CellError::Ref));
    }

    let format = &ctx.options().number_format;
    let keys: Vec<&FormulaValue> = lines.iter().map(|line| &line[0]).collect();
    let position = if range_lookup(args, 3, ctx)? {
        sorted_position(&keys, &lookup, format, |o| o != Ordering::Greater)
    } else {
        exact_position(&keys, &lookup, format)
    };

    let position = position.ok_or_else(not_available)?;
    tracing::trace!(position, index, "table lookup hit");
    Ok(lines[position][index].clone())
}

fn transpose(grid: Grid) -> Grid {
    let cols = grid.first().map_or(0, Vec::len);
    (0..cols)
        .map(|c| grid.iter().map(|row| row[c].clone()).collect())
        .collect()
}

/// VLOOKUP(lookup_value, table_array, col_index_num, [range_lookup])
pub fn fn_vlookup(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let table = grid_of(&args[1])?;
    table_lookup(table, args, ctx)
}

/// HLOOKUP(lookup_value, table_array, row_index_num, [range_lookup])
pub fn fn_hlookup(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let table = grid_of(&args[1])?;
    table_lookup(transpose(table), args, ctx)
}

/// INDEX(array, row_num, [column_num])
///
/// A zero row or column selects the whole column or row. For a single-row
/// array the one index given picks a column.
pub fn fn_index(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let grid = grid_of(&args[0])?;
    let (rows, cols) = (grid.len(), grid[0].len());

    let mut row = args[1].number(ctx)?.trunc();
    let mut col = optional_number(args, 2, 0.0, ctx)?.trunc();
    if args.len() < 3 && rows == 1 && cols > 1 {
        (row, col) = (1.0, row);
    }
    if row < 0.0 || col < 0.0 {
        return Err(FormulaError::Value(CellError::Value));
    }
    let (row, col) = (row as usize, col as usize);
    if row > rows || col > cols {
        return Err(FormulaError::Value(CellError::Ref));
    }

    Ok(match (row, col) {
        (0, 0) => FormulaValue::Array(grid),
        (0, c) => FormulaValue::Array(grid.iter().map(|line| vec![line[c - 1].clone()]).collect()),
        (r, 0) if cols > 1 => FormulaValue::Array(vec![grid[r - 1].clone()]),
        (r, 0) => grid[r - 1][0].clone(),
        (r, c) => grid[r - 1][c - 1].clone(),
    })
}

/// MATCH(lookup_value, lookup_array, [match_type])
///
/// `match_type` 1 (default) finds the largest value not above the lookup
/// value in ascending data, -1 the smallest value not below it in
/// descending data, and 0 the first exact match, with wildcards for text.
pub fn fn_match(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let lookup = lookup_value(&args[0], ctx)?;
    let grid = grid_of(&args[1])?;
    let match_type = optional_number(args, 2, 1.0, ctx)?;

    let keys: Vec<&FormulaValue> = match (grid.len(), grid[0].len()) {
        (1, _) => grid[0].iter().collect(),
        (_, 1) => grid.iter().map(|row| &row[0]).collect(),
        _ => return Err(not_available()),
    };

    let format = &ctx.options().number_format;
    let position = if match_type == 0.0 {
        exact_position(&keys, &lookup, format)
    } else if match_type > 0.0 {
        sorted_position(&keys, &lookup, format, |o| o != Ordering::Greater)
    } else {
        sorted_position(&keys, &lookup, format, |o| o != Ordering::Less)
    };

    position
        .map(|p| FormulaValue::Number((p + 1) as f64))
        .ok_or_else(not_available)
}

/// ROW([reference]) - the top row of the reference, or of the calling cell
pub fn fn_row(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let address = match args.first() {
        Some(arg) => arg.address(ctx),
        None => ctx.current_cell(),
    };
    address
        .map(|a| FormulaValue::Number(f64::from(a.from_row)))
        .ok_or(FormulaError::Value(CellError::Value))
}

/// COLUMN([reference]) - the leftmost column of the reference, or of the calling cell
pub fn fn_column(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let address = match args.first() {
        Some(arg) => arg.address(ctx),
        None => ctx.current_cell(),
    };
    address
        .map(|a| FormulaValue::Number(f64::from(a.from_col)))
        .ok_or(FormulaError::Value(CellError::Value))
}

fn dimensions(arg: &FunctionArgument, ctx: &ParsingContext<'_>) -> FormulaResult<(usize, usize)> {
    if let Some(address) = arg.address(ctx) {
        return Ok((address.row_count() as usize, address.col_count() as usize));
    }
    let grid = grid_of(arg)?;
    Ok((grid.len(), grid[0].len()))
}

/// ROWS(array)
pub fn fn_rows(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let (rows, _) = dimensions(&args[0], ctx)?;
    Ok(FormulaValue::Number(rows as f64))
}

/// COLUMNS(array)
pub fn fn_columns(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<FormulaValue> {
    let (_, cols) = dimensions(&args[0], ctx)?;
    Ok(FormulaValue::Number(cols as f64))
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

    fn table() -> Workbook {
        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();
        for (row, (key, name)) in [(10.0, "ten"), (20.0, "twenty"), (30.0, "thirty")].iter().enumerate() {
            let row = row as u32 + 1;
            sheet.set_cell_value_at(row, 1, *key).unwrap();
            sheet.set_cell_value_at(row, 2, *name).unwrap();
        }
        workbook
    }

    #[test]
    fn test_vlookup() {
        let workbook = table();
        assert_eq!(eval(&workbook, "=VLOOKUP(20,A1:B3,2,FALSE)"), FormulaValue::String("twenty".into()));
        assert_eq!(eval(&workbook, "=VLOOKUP(25,A1:B3,2)"), FormulaValue::String("twenty".into()));
        assert_eq!(eval(&workbook, "=VLOOKUP(99,A1:B3,2)"), FormulaValue::String("thirty".into()));
        assert_eq!(eval(&workbook, "=VLOOKUP(5,A1:B3,2)"), FormulaValue::Error(CellError::Na));
        assert_eq!(eval(&workbook, "=VLOOKUP(25,A1:B3,2,FALSE)"), FormulaValue::Error(CellError::Na));
        assert_eq!(eval(&workbook, "=VLOOKUP(20,A1:B3,3,FALSE)"), FormulaValue::Error(CellError::Ref));
        assert_eq!(eval(&workbook, "=VLOOKUP(20,A1:B3,0,FALSE)"), FormulaValue::Error(CellError::Value));
    }

    #[test]
    fn test_vlookup_ignores_cycles_in_unread_cells() {
        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();
        sheet.set_cell_value("A1", 1.0).unwrap();
        sheet.set_cell_value("A2", 2.0).unwrap();
        sheet.set_cell_value("A3", 3.0).unwrap();
        sheet.set_cell_value("B1", "a").unwrap();
        sheet.set_cell_formula("B2", "=B2").unwrap();
        sheet.set_cell_value("B3", "c").unwrap();
        assert_eq!(eval(&workbook, "=VLOOKUP(3,A1:B3,2)"), FormulaValue::String("c".into()));
    }

    #[test]
    fn test_hlookup_and_wildcards() {
        let workbook = Workbook::new();
        assert_eq!(
            eval(&workbook, "=HLOOKUP(\"b*\",{\"apple\",\"banana\";1,2},2,FALSE)"),
            FormulaValue::Number(2.0)
        );
        assert_eq!(eval(&workbook, "=MATCH(\"?pple\",{\"apple\",\"banana\"},0)"), FormulaValue::Number(1.0));
    }

    #[test]
    fn test_match_types() {
        let workbook = table();
        assert_eq!(eval(&workbook, "=MATCH(20,A1:A3,0)"), FormulaValue::Number(2.0));
        assert_eq!(eval(&workbook, "=MATCH(25,A1:A3)"), FormulaValue::Number(2.0));
        assert_eq!(eval(&workbook, "=MATCH(25,{30,20,10},-1)"), FormulaValue::Number(1.0));
        assert_eq!(eval(&workbook, "=MATCH(5,A1:A3,1)"), FormulaValue::Error(CellError::Na));
        assert_eq!(eval(&workbook, "=MATCH(\"twenty\",B1:B3,0)"), FormulaValue::Number(2.0));
        assert_eq!(eval(&workbook, "=MATCH(1,A1:B3,0)"), FormulaValue::Error(CellError::Na));
    }

    #[test]
    fn test_index() {
        let workbook = table();
        assert_eq!(eval(&workbook, "=INDEX(A1:B3,3,2)"), FormulaValue::String("thirty".into()));
        assert_eq!(eval(&workbook, "=INDEX(A1:A3,2)"), FormulaValue::Number(20.0));
        assert_eq!(eval(&workbook, "=INDEX({1,2,3},3)"), FormulaValue::Number(3.0));
        assert_eq!(eval(&workbook, "=INDEX(A1:B3,4,1)"), FormulaValue::Error(CellError::Ref));
        assert_eq!(eval(&workbook, "=INDEX(A1:B3,-1,1)"), FormulaValue::Error(CellError::Value));
        assert_eq!(eval(&workbook, "=SUM(INDEX(A1:B3,0,1))"), FormulaValue::Number(60.0));
    }

    #[test]
    fn test_positions_and_dimensions() {
        let workbook = table();
        assert_eq!(eval(&workbook, "=ROW(C7)"), FormulaValue::Number(7.0));
        assert_eq!(eval(&workbook, "=COLUMN(C7:E9)"), FormulaValue::Number(3.0));
        assert_eq!(eval(&workbook, "=ROWS(A1:B3)"), FormulaValue::Number(3.0));
        assert_eq!(eval(&workbook, "=COLUMNS(A1:B3)"), FormulaValue::Number(2.0));
        assert_eq!(eval(&workbook, "=COLUMNS({1,2,3;4,5,6})"), FormulaValue::Number(3.0));
        assert_eq!(eval(&workbook, "=ROW(5)"), FormulaValue::Error(CellError::Value));
    }
}
