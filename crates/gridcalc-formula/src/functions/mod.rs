//! Built-in spreadsheet functions
//!
//! Every function is a [`FunctionDef`] in the [`FunctionRepository`]. Besides
//! its arity and implementation a definition carries an identity and a set of
//! capability flags; together they select the compiler that prepares the
//! call's arguments (see [`compilers`]).

pub(crate) mod compilers;
pub mod conditional;
pub mod criteria;
pub mod date;
pub mod financial;
pub mod info;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod statistical;
pub mod text;

pub(crate) use compilers::compile_function;

use crate::compiler::conversion::text_to_number;
use crate::compiler::operators::{scalarize, to_number};
use crate::compiler::{CompileResult, DataType};
use crate::error::{FormulaError, FormulaResult};
use crate::session::ParsingContext;
use crate::value::FormulaValue;
use ahash::AHashMap;
use bitflags::bitflags;
use gridcalc_core::{CellError, RangeAddress};

/// Function implementation signature
///
/// Arguments arrive compiled. A domain error returned as
/// `Err(FormulaError::Value(e))` becomes the call's error value, so helpers
/// such as [`FunctionArgument::number`] can be used with `?`.
pub type FunctionImpl = fn(&[FunctionArgument], &ParsingContext<'_>) -> FormulaResult<FormulaValue>;

/// Receives a domain error raised while compiling an argument
pub type ErrorHandler = fn(CellError) -> FormulaValue;

bitflags! {
    /// Declared at registration; selects how arguments are compiled
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FunctionCapabilities: u8 {
        /// Reads positions or table snapshots rather than values
        const LOOKUP = 1 << 0;
        /// Domain errors in arguments go to the function's error handler
        const ERROR_HANDLING = 1 << 1;
        /// Circular references inside arguments resolve to last values
        const IGNORE_CIRCULAR_REFS = 1 << 2;
    }
}

bitflags! {
    /// Where an argument's value came from
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ExcelStateFlags: u8 {
        const HIDDEN_CELL = 1 << 0;
        const IS_RESULT_OF_SUBTOTAL = 1 << 1;
    }
}

/// Functions with a dedicated compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FunctionIdentity {
    #[default]
    Default,
    If,
    IfError,
    IfNa,
    SumIf,
    SumIfs,
    CountIf,
    CountIfs,
    AverageIf,
    Subtotal,
}

/// Function definition
#[derive(Debug, Clone)]
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
    /// Is volatile (recalculates every time)
    pub volatile: bool,
    pub identity: FunctionIdentity,
    pub capabilities: FunctionCapabilities,
    /// Hook for error-handling functions
    pub handle_error: Option<ErrorHandler>,
}

impl FunctionDef {
    pub const fn new(
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        implementation: FunctionImpl,
    ) -> Self {
        Self {
            name,
            min_args,
            max_args,
            implementation,
            volatile: false,
            identity: FunctionIdentity::Default,
            capabilities: FunctionCapabilities::empty(),
            handle_error: None,
        }
    }

    pub const fn volatile(mut self) -> Self {
        self.volatile = true;
        self
    }

    pub const fn with_identity(mut self, identity: FunctionIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub const fn with_capabilities(mut self, capabilities: FunctionCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub const fn with_error_handler(mut self, handler: ErrorHandler) -> Self {
        self.capabilities = self.capabilities.union(FunctionCapabilities::ERROR_HANDLING);
        self.handle_error = Some(handler);
        self
    }

    pub fn is_lookup(&self) -> bool {
        self.capabilities
            .intersects(FunctionCapabilities::LOOKUP | FunctionCapabilities::IGNORE_CIRCULAR_REFS)
    }

    /// Reject a call with the wrong number of arguments
    pub fn check_arity(&self, count: usize) -> FormulaResult<()> {
        let too_many = self.max_args.is_some_and(|max| count > max);
        if count >= self.min_args && !too_many {
            return Ok(());
        }
        let expected = match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{}..{}", self.min_args, max),
            None => format!("at least {}", self.min_args),
        };
        Err(FormulaError::ArgumentCount {
            function: self.name.to_string(),
            expected,
            actual: count,
        })
    }
}

/// Function repository
///
/// One instance per engine, passed to the tokenizer and the compiler.
#[derive(Debug, Clone)]
pub struct FunctionRepository {
    functions: AHashMap<String, FunctionDef>,
}

impl Default for FunctionRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRepository {
    /// Create a new repository with all built-in functions
    pub fn new() -> Self {
        let mut repository = Self {
            functions: AHashMap::new(),
        };

        repository.register_math_functions();
        repository.register_statistical_functions();
        repository.register_logical_functions();
        repository.register_info_functions();
        repository.register_lookup_functions();
        repository.register_conditional_functions();
        repository.register_financial_functions();
        repository.register_text_functions();
        repository.register_date_functions();

        repository
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Register a function, replacing any earlier definition of the same name
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_uppercase(), def);
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    fn register_math_functions(&mut self) {
        self.register(FunctionDef::new("SUM", 1, None, math::fn_sum));
        self.register(FunctionDef::new("PRODUCT", 1, None, math::fn_product));
        self.register(FunctionDef::new("ABS", 1, Some(1), math::fn_abs));
        self.register(FunctionDef::new("ROUND", 1, Some(2), math::fn_round));
        self.register(FunctionDef::new("ROUNDUP", 1, Some(2), math::fn_roundup));
        self.register(FunctionDef::new("ROUNDDOWN", 1, Some(2), math::fn_rounddown));
        self.register(FunctionDef::new("INT", 1, Some(1), math::fn_int));
        self.register(FunctionDef::new("MOD", 2, Some(2), math::fn_mod));
        self.register(FunctionDef::new("POWER", 2, Some(2), math::fn_power));
        self.register(FunctionDef::new("SQRT", 1, Some(1), math::fn_sqrt));
        self.register(FunctionDef::new("SUMPRODUCT", 1, None, math::fn_sumproduct));

        // RAND and RANDBETWEEN (volatile)
        self.register(FunctionDef::new("RAND", 0, Some(0), math::fn_rand).volatile());
        self.register(FunctionDef::new("RANDBETWEEN", 2, Some(2), math::fn_randbetween).volatile());
    }

    fn register_statistical_functions(&mut self) {
        self.register(FunctionDef::new("AVERAGE", 1, None, statistical::fn_average));
        self.register(FunctionDef::new("COUNT", 1, None, statistical::fn_count));
        self.register(FunctionDef::new("COUNTA", 1, None, statistical::fn_counta));
        self.register(FunctionDef::new("COUNTBLANK", 1, Some(1), statistical::fn_countblank));
        self.register(FunctionDef::new("MIN", 1, None, statistical::fn_min));
        self.register(FunctionDef::new("MAX", 1, None, statistical::fn_max));
        self.register(
            FunctionDef::new("SUBTOTAL", 2, None, statistical::fn_subtotal)
                .with_identity(FunctionIdentity::Subtotal),
        );
    }

    fn register_logical_functions(&mut self) {
        self.register(
            FunctionDef::new("IF", 2, Some(3), logical::fn_if).with_identity(FunctionIdentity::If),
        );
        self.register(
            FunctionDef::new("IFERROR", 2, Some(2), logical::fn_iferror)
                .with_identity(FunctionIdentity::IfError),
        );
        self.register(
            FunctionDef::new("IFNA", 2, Some(2), logical::fn_ifna).with_identity(FunctionIdentity::IfNa),
        );
        self.register(FunctionDef::new("AND", 1, None, logical::fn_and));
        self.register(FunctionDef::new("OR", 1, None, logical::fn_or));
        self.register(FunctionDef::new("NOT", 1, Some(1), logical::fn_not));
        self.register(FunctionDef::new("TRUE", 0, Some(0), logical::fn_true));
        self.register(FunctionDef::new("FALSE", 0, Some(0), logical::fn_false));
    }

    fn register_info_functions(&mut self) {
        self.register(
            FunctionDef::new("ISERROR", 1, Some(1), info::fn_iserror).with_error_handler(info::iserror_handler),
        );
        self.register(
            FunctionDef::new("ISERR", 1, Some(1), info::fn_iserr).with_error_handler(info::iserr_handler),
        );
        self.register(FunctionDef::new("ISNA", 1, Some(1), info::fn_isna).with_error_handler(info::isna_handler));
        self.register(
            FunctionDef::new("ERROR.TYPE", 1, Some(1), info::fn_error_type)
                .with_error_handler(info::error_type_handler),
        );
        self.register(FunctionDef::new("ISBLANK", 1, Some(1), info::fn_isblank));
        self.register(FunctionDef::new("ISNUMBER", 1, Some(1), info::fn_isnumber));
        self.register(FunctionDef::new("ISTEXT", 1, Some(1), info::fn_istext));
        self.register(FunctionDef::new("NA", 0, Some(0), info::fn_na));
    }

    fn register_lookup_functions(&mut self) {
        const LOOKUP: FunctionCapabilities =
            FunctionCapabilities::LOOKUP.union(FunctionCapabilities::IGNORE_CIRCULAR_REFS);

        self.register(FunctionDef::new("VLOOKUP", 3, Some(4), lookup::fn_vlookup).with_capabilities(LOOKUP));
        self.register(FunctionDef::new("HLOOKUP", 3, Some(4), lookup::fn_hlookup).with_capabilities(LOOKUP));
        self.register(FunctionDef::new("INDEX", 2, Some(3), lookup::fn_index).with_capabilities(LOOKUP));
        self.register(FunctionDef::new("MATCH", 2, Some(3), lookup::fn_match).with_capabilities(LOOKUP));
        self.register(FunctionDef::new("ROW", 0, Some(1), lookup::fn_row).with_capabilities(LOOKUP));
        self.register(FunctionDef::new("COLUMN", 0, Some(1), lookup::fn_column).with_capabilities(LOOKUP));
        self.register(FunctionDef::new("ROWS", 1, Some(1), lookup::fn_rows).with_capabilities(LOOKUP));
        self.register(FunctionDef::new("COLUMNS", 1, Some(1), lookup::fn_columns).with_capabilities(LOOKUP));
    }

    fn register_conditional_functions(&mut self) {
        self.register(
            FunctionDef::new("SUMIF", 2, Some(3), conditional::fn_sumif).with_identity(FunctionIdentity::SumIf),
        );
        self.register(
            FunctionDef::new("SUMIFS", 3, None, conditional::fn_sumifs).with_identity(FunctionIdentity::SumIfs),
        );
        self.register(
            FunctionDef::new("COUNTIF", 2, Some(2), conditional::fn_countif)
                .with_identity(FunctionIdentity::CountIf),
        );
        self.register(
            FunctionDef::new("COUNTIFS", 2, None, conditional::fn_countifs)
                .with_identity(FunctionIdentity::CountIfs),
        );
        self.register(
            FunctionDef::new("AVERAGEIF", 2, Some(3), conditional::fn_averageif)
                .with_identity(FunctionIdentity::AverageIf),
        );
    }

    fn register_financial_functions(&mut self) {
        self.register(FunctionDef::new("PMT", 3, Some(5), financial::fn_pmt));
        self.register(FunctionDef::new("PV", 3, Some(5), financial::fn_pv));
        self.register(FunctionDef::new("FV", 3, Some(5), financial::fn_fv));
        self.register(FunctionDef::new("NPER", 3, Some(5), financial::fn_nper));
        self.register(FunctionDef::new("NPV", 2, None, financial::fn_npv));
        self.register(FunctionDef::new("RATE", 3, Some(6), financial::fn_rate));
        self.register(FunctionDef::new("IRR", 1, Some(2), financial::fn_irr));
    }

    fn register_text_functions(&mut self) {
        self.register(FunctionDef::new("LEN", 1, Some(1), text::fn_len));
        self.register(FunctionDef::new("LEFT", 1, Some(2), text::fn_left));
        self.register(FunctionDef::new("RIGHT", 1, Some(2), text::fn_right));
        self.register(FunctionDef::new("MID", 3, Some(3), text::fn_mid));
        self.register(FunctionDef::new("UPPER", 1, Some(1), text::fn_upper));
        self.register(FunctionDef::new("LOWER", 1, Some(1), text::fn_lower));
        self.register(FunctionDef::new("TRIM", 1, Some(1), text::fn_trim));
        self.register(FunctionDef::new("CONCATENATE", 1, None, text::fn_concatenate));
        self.register(FunctionDef::new("CONCAT", 1, None, text::fn_concat));
        self.register(FunctionDef::new("VALUE", 1, Some(1), text::fn_value));
    }

    fn register_date_functions(&mut self) {
        self.register(FunctionDef::new("DATE", 3, Some(3), date::fn_date));
        self.register(FunctionDef::new("YEAR", 1, Some(1), date::fn_year));
        self.register(FunctionDef::new("MONTH", 1, Some(1), date::fn_month));
        self.register(FunctionDef::new("DAY", 1, Some(1), date::fn_day));
        self.register(FunctionDef::new("TIME", 3, Some(3), date::fn_time));
        self.register(FunctionDef::new("TIMEVALUE", 1, Some(1), date::fn_timevalue));
        self.register(FunctionDef::new("DATEVALUE", 1, Some(1), date::fn_datevalue));

        // TODAY and NOW (volatile)
        self.register(FunctionDef::new("TODAY", 0, Some(0), date::fn_today).volatile());
        self.register(FunctionDef::new("NOW", 0, Some(0), date::fn_now).volatile());
    }
}

/// A compiled argument as a function implementation sees it
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionArgument {
    pub value: FormulaValue,
    pub data_type: DataType,
    pub state_flags: ExcelStateFlags,
    /// Id of the address the value was read from
    pub address_reference_id: Option<u32>,
}

/// One value reached by flattening an argument
#[derive(Debug, Clone, Copy)]
pub struct ArgumentCell<'a> {
    pub value: &'a FormulaValue,
    pub hidden: bool,
    pub is_result_of_subtotal: bool,
    /// The value came from a reference or an array rather than being typed directly
    pub from_reference: bool,
}

impl From<CompileResult> for FunctionArgument {
    fn from(result: CompileResult) -> Self {
        let mut state_flags = ExcelStateFlags::empty();
        state_flags.set(ExcelStateFlags::HIDDEN_CELL, result.is_hidden_cell);
        state_flags.set(ExcelStateFlags::IS_RESULT_OF_SUBTOTAL, result.is_result_of_subtotal);
        Self {
            value: result.value,
            data_type: result.data_type,
            state_flags,
            address_reference_id: result.address_reference_id,
        }
    }
}

impl FunctionArgument {
    pub fn new(value: FormulaValue) -> Self {
        CompileResult::new(value).into()
    }

    /// Stands in for an argument that was not compiled
    pub fn placeholder() -> Self {
        Self::new(FormulaValue::Empty)
    }

    pub fn is_reference(&self) -> bool {
        self.address_reference_id.is_some() || matches!(self.value, FormulaValue::Range(_))
    }

    pub fn is_hidden(&self) -> bool {
        self.state_flags.contains(ExcelStateFlags::HIDDEN_CELL)
    }

    pub fn is_result_of_subtotal(&self) -> bool {
        self.state_flags.contains(ExcelStateFlags::IS_RESULT_OF_SUBTOTAL)
    }

    /// The referenced range, for positional functions
    pub fn address(&self, ctx: &ParsingContext<'_>) -> Option<RangeAddress> {
        match &self.value {
            FormulaValue::Range(range) => Some(range.address.clone()),
            _ => self.address_reference_id.and_then(|id| ctx.address_by_id(id)),
        }
    }

    /// Single value, applying implicit intersection to ranges
    pub fn scalar(&self, ctx: &ParsingContext<'_>) -> FormulaValue {
        scalarize(&self.value, ctx.current_cell().as_ref())
    }

    pub fn number(&self, ctx: &ParsingContext<'_>) -> FormulaResult<f64> {
        to_number(&self.scalar(ctx), &ctx.options().number_format).map_err(FormulaError::Value)
    }

    pub fn text(&self, ctx: &ParsingContext<'_>) -> FormulaResult<String> {
        match self.scalar(ctx) {
            FormulaValue::Error(e) => Err(FormulaError::Value(e)),
            value => Ok(value.to_text()),
        }
    }

    pub fn boolean(&self, ctx: &ParsingContext<'_>) -> FormulaResult<bool> {
        match self.scalar(ctx) {
            FormulaValue::Error(e) => Err(FormulaError::Value(e)),
            FormulaValue::String(s) => match s.to_uppercase().as_str() {
                "TRUE" => Ok(true),
                "FALSE" => Ok(false),
                _ => text_to_number(&s, &ctx.options().number_format)
                    .map(|n| n != 0.0)
                    .ok_or(FormulaError::Value(CellError::Value)),
            },
            value => value.as_bool().ok_or(FormulaError::Value(CellError::Value)),
        }
    }

    /// Every value the argument holds, row-major for ranges and arrays
    pub fn cells(&self) -> Vec<ArgumentCell<'_>> {
        match &self.value {
            FormulaValue::Range(range) => range
                .iter()
                .map(|cell| ArgumentCell {
                    value: &cell.value,
                    hidden: cell.hidden,
                    is_result_of_subtotal: cell.is_result_of_subtotal,
                    from_reference: true,
                })
                .collect(),
            FormulaValue::Array(rows) => rows
                .iter()
                .flatten()
                .map(|value| ArgumentCell {
                    value,
                    hidden: false,
                    is_result_of_subtotal: false,
                    from_reference: true,
                })
                .collect(),
            value => vec![ArgumentCell {
                value,
                hidden: self.is_hidden(),
                is_result_of_subtotal: self.is_result_of_subtotal(),
                from_reference: self.address_reference_id.is_some(),
            }],
        }
    }

    /// Values as a grid of rows, for lookups
    pub fn to_grid(&self) -> Vec<Vec<FormulaValue>> {
        match &self.value {
            FormulaValue::Range(range) => range.to_array(),
            FormulaValue::Array(rows) => rows.clone(),
            value => vec![vec![value.clone()]],
        }
    }
}

/// A numeric value for aggregation, following the spreadsheet rules: values
/// typed directly are coerced, values read from references count only when
/// they are numbers.
pub(crate) fn aggregate_number(cell: &ArgumentCell<'_>, ctx: &ParsingContext<'_>) -> FormulaResult<Option<f64>> {
    match cell.value {
        FormulaValue::Number(n) => Ok(Some(*n)),
        FormulaValue::Error(e) => Err(FormulaError::Value(*e)),
        _ if cell.from_reference => Ok(None),
        FormulaValue::Empty => Ok(None),
        FormulaValue::Boolean(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
        FormulaValue::String(s) => text_to_number(s, &ctx.options().number_format)
            .map(Some)
            .ok_or(FormulaError::Value(CellError::Value)),
        FormulaValue::Array(_) | FormulaValue::Range(_) => Ok(None),
    }
}

/// Every number across the arguments; the first error wins
pub(crate) fn collect_numbers(args: &[FunctionArgument], ctx: &ParsingContext<'_>) -> FormulaResult<Vec<f64>> {
    let mut numbers = Vec::new();
    for arg in args {
        for cell in arg.cells() {
            if let Some(n) = aggregate_number(&cell, ctx)? {
                numbers.push(n);
            }
        }
    }
    Ok(numbers)
}

/// Optional numeric argument; omitted and empty arguments take `default`
pub(crate) fn optional_number(
    args: &[FunctionArgument],
    index: usize,
    default: f64,
    ctx: &ParsingContext<'_>,
) -> FormulaResult<f64> {
    match args.get(index) {
        Some(arg) if !arg.value.is_empty() => arg.number(ctx),
        _ => Ok(default),
    }
}
