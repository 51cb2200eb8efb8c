//! Typed outcome of compiling one expression

use crate::value::FormulaValue;
use gridcalc_core::CellError;

/// What kind of value a [`CompileResult`] carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Integer,
    Decimal,
    String,
    Boolean,
    Date,
    Time,
    Enumerable,
    ExcelAddress,
    ExcelError,
    Empty,
    Unknown,
}

impl DataType {
    /// Infer the type from a value
    pub fn of(value: &FormulaValue) -> Self {
        match value {
            FormulaValue::Number(n) if n.fract() == 0.0 && n.is_finite() => DataType::Integer,
            FormulaValue::Number(_) => DataType::Decimal,
            FormulaValue::String(_) => DataType::String,
            FormulaValue::Boolean(_) => DataType::Boolean,
            FormulaValue::Error(_) => DataType::ExcelError,
            FormulaValue::Empty => DataType::Empty,
            FormulaValue::Array(_) => DataType::Enumerable,
            FormulaValue::Range(_) => DataType::ExcelAddress,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Integer | DataType::Decimal | DataType::Date | DataType::Time
        )
    }
}

/// The result of compiling an expression node
#[derive(Debug, Clone, PartialEq)]
pub struct CompileResult {
    pub value: FormulaValue,
    pub data_type: DataType,
    /// The value was read from a hidden row
    pub is_hidden_cell: bool,
    /// The value is (or was read from) a SUBTOTAL result
    pub is_result_of_subtotal: bool,
    /// Id of the address this value was read from, in the session's address cache
    pub address_reference_id: Option<u32>,
}

impl CompileResult {
    pub fn new(value: FormulaValue) -> Self {
        let data_type = DataType::of(&value);
        Self::with_type(value, data_type)
    }

    pub fn with_type(value: FormulaValue, data_type: DataType) -> Self {
        Self {
            value,
            data_type,
            is_hidden_cell: false,
            is_result_of_subtotal: false,
            address_reference_id: None,
        }
    }

    pub fn number(n: f64) -> Self {
        Self::new(FormulaValue::Number(n))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::new(FormulaValue::String(s.into()))
    }

    pub fn boolean(b: bool) -> Self {
        Self::new(FormulaValue::Boolean(b))
    }

    pub fn error(e: CellError) -> Self {
        Self::new(FormulaValue::Error(e))
    }

    pub fn empty() -> Self {
        Self::new(FormulaValue::Empty)
    }

    pub fn with_address_id(mut self, id: u32) -> Self {
        self.address_reference_id = Some(id);
        self
    }

    pub fn with_subtotal_flag(mut self, is_result_of_subtotal: bool) -> Self {
        self.is_result_of_subtotal = is_result_of_subtotal;
        self
    }

    pub fn is_error(&self) -> bool {
        self.value.is_error()
    }

    pub fn into_value(self) -> FormulaValue {
        self.value
    }
}

impl From<FormulaValue> for CompileResult {
    fn from(value: FormulaValue) -> Self {
        CompileResult::new(value)
    }
}
