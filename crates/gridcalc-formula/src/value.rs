//! Values produced while evaluating formulas

use gridcalc_core::{CellError, CellValue, RangeAddress};

/// Value types during formula evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),
    /// An empty cell or an omitted argument
    Empty,
    /// Inline array constant (`{1,2;3,4}`), rows of columns
    Array(Vec<Vec<FormulaValue>>),
    /// A resolved multi-cell reference
    Range(RangeValue),
}

/// One cell of a resolved range
#[derive(Debug, Clone, PartialEq)]
pub struct RangeCell {
    pub value: FormulaValue,
    /// The cell's row is hidden
    pub hidden: bool,
    /// The cell holds the result of a SUBTOTAL
    pub is_result_of_subtotal: bool,
}

impl RangeCell {
    pub fn new(value: FormulaValue) -> Self {
        Self {
            value,
            hidden: false,
            is_result_of_subtotal: false,
        }
    }
}

/// A range handle: the address plus its cells in row-major order
#[derive(Debug, Clone, PartialEq)]
pub struct RangeValue {
    pub address: RangeAddress,
    pub cells: Vec<RangeCell>,
}

impl RangeValue {
    pub fn new(address: RangeAddress, cells: Vec<RangeCell>) -> Self {
        debug_assert_eq!(cells.len() as u64, address.cell_count());
        Self { address, cells }
    }

    pub fn rows(&self) -> usize {
        self.address.row_count() as usize
    }

    pub fn cols(&self) -> usize {
        self.address.col_count() as usize
    }

    /// Cell at a zero-based offset from the top-left corner
    pub fn get(&self, row: usize, col: usize) -> Option<&RangeCell> {
        if row >= self.rows() || col >= self.cols() {
            return None;
        }
        self.cells.get(row * self.cols() + col)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RangeCell> {
        self.cells.iter()
    }

    /// Copy the values out as rows of columns
    pub fn to_array(&self) -> Vec<Vec<FormulaValue>> {
        let cols = self.cols().max(1);
        self.cells
            .chunks(cols)
            .map(|row| row.iter().map(|c| c.value.clone()).collect())
            .collect()
    }
}

impl FormulaValue {
    /// Convert to number without parsing text
    ///
    /// Text coercion is locale dependent and lives in [`crate::compiler::conversion`].
    pub fn as_number(&self) -> Option<f64> {
        match self.scalar() {
            FormulaValue::Number(n) => Some(*n),
            FormulaValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            FormulaValue::Empty => Some(0.0),
            _ => None,
        }
    }

    /// Convert to boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self.scalar() {
            FormulaValue::Boolean(b) => Some(*b),
            FormulaValue::Number(n) => Some(*n != 0.0),
            FormulaValue::Empty => Some(false),
            FormulaValue::String(s) => {
                if s.eq_ignore_ascii_case("TRUE") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("FALSE") {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Text form used by concatenation and text functions
    pub fn to_text(&self) -> String {
        match self.scalar() {
            FormulaValue::Number(n) => format_number(*n),
            FormulaValue::String(s) => s.clone(),
            FormulaValue::Boolean(true) => "TRUE".to_string(),
            FormulaValue::Boolean(false) => "FALSE".to_string(),
            FormulaValue::Error(e) => e.to_string(),
            FormulaValue::Empty => String::new(),
            FormulaValue::Array(_) | FormulaValue::Range(_) => CellError::Value.to_string(),
        }
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        self.get_error().is_some()
    }

    /// Get the error if this is one
    pub fn get_error(&self) -> Option<CellError> {
        match self.scalar() {
            FormulaValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.scalar(), FormulaValue::Empty)
    }

    /// Collapse single-cell ranges and 1x1 arrays to their only value
    pub fn scalar(&self) -> &FormulaValue {
        match self {
            FormulaValue::Range(range) if range.cells.len() == 1 => &range.cells[0].value,
            FormulaValue::Array(rows) if rows.len() == 1 && rows[0].len() == 1 => &rows[0][0],
            other => other,
        }
    }
}

/// Format a number the way the general cell format does: integers without a
/// fraction, everything else with at most 15 significant digits.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    if !n.is_finite() {
        return CellError::Num.to_string();
    }
    let magnitude = n.abs().log10().floor() as i32;
    let decimals = (14 - magnitude).clamp(0, 15) as usize;
    let text = format!("{:.*}", decimals, n);
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

impl From<CellValue> for FormulaValue {
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::Empty => FormulaValue::Empty,
            CellValue::Number(n) => FormulaValue::Number(n),
            CellValue::String(s) => FormulaValue::String(s),
            CellValue::Boolean(b) => FormulaValue::Boolean(b),
            CellValue::Error(e) => FormulaValue::Error(e),
            CellValue::Formula { cached_value, .. } => cached_value
                .map(|v| (*v).into())
                .unwrap_or(FormulaValue::Empty),
        }
    }
}

impl From<FormulaValue> for CellValue {
    fn from(value: FormulaValue) -> Self {
        match value {
            FormulaValue::Empty => CellValue::Empty,
            FormulaValue::Number(n) => CellValue::Number(n),
            FormulaValue::String(s) => CellValue::String(s),
            FormulaValue::Boolean(b) => CellValue::Boolean(b),
            FormulaValue::Error(e) => CellValue::Error(e),
            FormulaValue::Range(range) => match range.cells.len() {
                1 => range.cells.into_iter().next().map_or(CellValue::Empty, |c| c.value.into()),
                _ => CellValue::Error(CellError::Value),
            },
            FormulaValue::Array(rows) => rows
                .into_iter()
                .next()
                .and_then(|row| row.into_iter().next())
                .map_or(CellValue::Empty, CellValue::from),
        }
    }
}

impl From<f64> for FormulaValue {
    fn from(n: f64) -> Self {
        FormulaValue::Number(n)
    }
}

impl From<bool> for FormulaValue {
    fn from(b: bool) -> Self {
        FormulaValue::Boolean(b)
    }
}

impl From<&str> for FormulaValue {
    fn from(s: &str) -> Self {
        FormulaValue::String(s.to_string())
    }
}

impl From<String> for FormulaValue {
    fn from(s: String) -> Self {
        FormulaValue::String(s)
    }
}

impl From<CellError> for FormulaValue {
    fn from(e: CellError) -> Self {
        FormulaValue::Error(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(2.5), "2.5");
    }

    #[test]
    fn test_single_cell_range_is_scalar() {
        let range = RangeValue::new(
            RangeAddress::single(Some("Sheet1".into()), 1, 1),
            vec![RangeCell::new(FormulaValue::Number(7.0))],
        );
        let value = FormulaValue::Range(range);
        assert_eq!(value.as_number(), Some(7.0));
        assert_eq!(CellValue::from(value), CellValue::Number(7.0));
    }

    #[test]
    fn test_range_offsets() {
        let cells = (1..=6)
            .map(|n| RangeCell::new(FormulaValue::Number(n as f64)))
            .collect();
        let range = RangeValue::new(RangeAddress::new(None, 1, 1, 3, 2), cells);
        assert_eq!(range.rows(), 3);
        assert_eq!(range.cols(), 2);
        assert_eq!(range.get(2, 1).unwrap().value, FormulaValue::Number(6.0));
        assert!(range.get(3, 0).is_none());
        assert_eq!(range.to_array()[1], vec![3.0.into(), 4.0.into()]);
    }

    #[test]
    fn test_empty_coercions() {
        assert_eq!(FormulaValue::Empty.as_number(), Some(0.0));
        assert_eq!(FormulaValue::Empty.as_bool(), Some(false));
        assert_eq!(FormulaValue::Empty.to_text(), "");
    }
}
