//! Calculation session
//!
//! A [`ParsingContext`] holds everything one calculation pass shares: the
//! scope stack, the address cache, memoized formula results and the flags the
//! function compilers toggle while compiling their arguments.

use crate::address_cache::ExcelAddressCache;
use crate::compiler::{compile_address, operators, CompileResult, DataType};
use crate::engine::FormulaEngine;
use crate::error::{FormulaError, FormulaResult};
use crate::graph::ExpressionGraph;
use crate::options::CalculationOptions;
use crate::provider::{ExcelCell, ExcelDataProvider};
use crate::scope::ParsingScopes;
use crate::value::{FormulaValue, RangeCell, RangeValue};
use ahash::AHashMap;
use gridcalc_core::{CellError, CellValue, RangeAddress, RangeAddressFactory, TableReference};
use std::cell::{Cell, RefCell};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CellKey {
    worksheet: String,
    row: u32,
    col: u32,
}

impl CellKey {
    fn new(worksheet: &str, row: u32, col: u32) -> Self {
        Self {
            worksheet: worksheet.to_lowercase(),
            row,
            col,
        }
    }
}

#[derive(Debug, Clone)]
struct CachedResult {
    value: FormulaValue,
    data_type: DataType,
    is_result_of_subtotal: bool,
}

/// State of one calculation session against one data provider
pub struct ParsingContext<'a> {
    engine: &'a FormulaEngine,
    provider: &'a dyn ExcelDataProvider,
    options: CalculationOptions,
    scopes: ParsingScopes,
    address_cache: RefCell<ExcelAddressCache>,
    results: RefCell<AHashMap<CellKey, CachedResult>>,
    ignore_circular_depth: Cell<u32>,
    /// Scope depth at which the current cell reads as its last value
    excluded_scope_depth: Cell<Option<usize>>,
    names_in_progress: RefCell<Vec<String>>,
    /// Worksheet for formulas evaluated outside any cell
    home_worksheet: RefCell<Option<String>>,
}

impl<'a> ParsingContext<'a> {
    pub fn new(
        engine: &'a FormulaEngine,
        provider: &'a dyn ExcelDataProvider,
        options: CalculationOptions,
    ) -> Self {
        Self {
            engine,
            provider,
            options,
            scopes: ParsingScopes::new(),
            address_cache: RefCell::new(ExcelAddressCache::new()),
            results: RefCell::new(AHashMap::new()),
            ignore_circular_depth: Cell::new(0),
            excluded_scope_depth: Cell::new(None),
            names_in_progress: RefCell::new(Vec::new()),
            home_worksheet: RefCell::new(None),
        }
    }

    /// Use a scope stack with a listener attached
    pub fn with_scopes(mut self, scopes: ParsingScopes) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn engine(&self) -> &'a FormulaEngine {
        self.engine
    }

    pub fn provider(&self) -> &'a dyn ExcelDataProvider {
        self.provider
    }

    pub fn options(&self) -> &CalculationOptions {
        &self.options
    }

    pub fn scopes(&self) -> &ParsingScopes {
        &self.scopes
    }

    /// The formula cell being evaluated
    pub fn current_cell(&self) -> Option<RangeAddress> {
        self.scopes.current().map(|scope| scope.address().clone())
    }

    pub fn current_worksheet(&self) -> Option<String> {
        self.scopes
            .current()
            .and_then(|scope| scope.worksheet().map(str::to_string))
            .or_else(|| self.home_worksheet.borrow().clone())
    }

    /// Address factory bounded by the provider's sheet size
    pub fn address_factory(&self) -> RangeAddressFactory {
        RangeAddressFactory::new(self.provider.max_rows(), self.provider.max_columns())
    }

    /// Drop memoized results and restart address ids
    pub fn clear(&self) {
        self.address_cache.borrow_mut().clear();
        self.results.borrow_mut().clear();
    }

    // === Address cache ===

    pub fn register_address(&self, address: &RangeAddress) -> u32 {
        self.address_cache.borrow_mut().add(address.to_string())
    }

    pub fn address_by_id(&self, id: u32) -> Option<RangeAddress> {
        let text = self.address_cache.borrow().get(id)?.to_string();
        self.address_factory().parse(&text, None).ok()
    }

    // === Compiler switches ===

    /// While the guard lives, reaching a cell under evaluation yields its last
    /// value instead of a circular reference error.
    pub fn ignore_circular_references(&self) -> IgnoreCircularGuard<'_> {
        self.ignore_circular_depth
            .set(self.ignore_circular_depth.get() + 1);
        IgnoreCircularGuard {
            depth: &self.ignore_circular_depth,
        }
    }

    pub fn is_ignoring_circular_references(&self) -> bool {
        self.ignore_circular_depth.get() > 0
    }

    /// While the guard lives, the current cell reads as its last value when
    /// reached directly from its own formula.
    pub fn exclude_current_cell(&self) -> ExclusionGuard<'_> {
        let previous = self.excluded_scope_depth.replace(Some(self.scopes.depth()));
        ExclusionGuard {
            slot: &self.excluded_scope_depth,
            previous,
        }
    }

    fn is_excluded(&self, address: &RangeAddress) -> bool {
        self.excluded_scope_depth.get() == Some(self.scopes.depth())
            && self
                .scopes
                .current()
                .is_some_and(|scope| scope.address().collides_with(address))
    }

    // === Evaluation ===

    /// Evaluate formula text outside any cell; unqualified references go to `worksheet`
    pub fn evaluate(&self, formula: &str, worksheet: &str) -> FormulaResult<CompileResult> {
        let previous = self.home_worksheet.replace(Some(worksheet.to_string()));
        let result = self
            .engine
            .parse(formula)
            .and_then(|parsed| self.evaluate_graph(parsed.graph()));
        self.home_worksheet.replace(previous);
        result
    }

    /// Compile every top-level expression in order; the first one is the result
    pub fn evaluate_graph(&self, graph: &ExpressionGraph) -> FormulaResult<CompileResult> {
        let mut first = None;
        for expression in graph.expressions() {
            let result = expression.compile(self)?;
            first.get_or_insert(result);
        }
        first.ok_or_else(|| FormulaError::Format("empty formula".into()))
    }

    /// Text to a bounded, worksheet-qualified range.
    ///
    /// Whole rows and columns are clamped to the used area. `None` for text that
    /// isn't an address or points at a missing worksheet or table.
    pub fn resolve_address_text(&self, text: &str) -> Option<RangeAddress> {
        let worksheet = self.current_worksheet();
        let range = match TableReference::parse(text) {
            Some(reference) => self.provider.get_table_range(&reference)?,
            None => self.address_factory().parse(text, worksheet.as_deref()).ok()?,
        };
        let range = match &worksheet {
            Some(ws) => range.or_worksheet(ws),
            None => range,
        };
        let sheet = range.worksheet.as_deref()?;
        if !self.provider.worksheet_exists(sheet) {
            return None;
        }
        Some(self.clamp_to_used_area(range))
    }

    fn clamp_to_used_area(&self, mut range: RangeAddress) -> RangeAddress {
        let whole_columns = range.from_row == 1 && range.to_row == self.provider.max_rows();
        let whole_rows = range.from_col == 1 && range.to_col == self.provider.max_columns();
        if !whole_columns && !whole_rows {
            return range;
        }
        let (last_row, last_col) = range
            .worksheet
            .as_deref()
            .and_then(|ws| self.provider.get_dimension_end(ws))
            .unwrap_or((1, 1));
        if whole_columns {
            range.to_row = last_row.max(range.from_row);
        }
        if whole_rows {
            range.to_col = last_col.max(range.from_col);
        }
        range
    }

    /// The value of one cell, evaluating its formula on first use
    pub fn resolve_cell(&self, worksheet: &str, row: u32, col: u32) -> FormulaResult<CompileResult> {
        match self.provider.get_cell(worksheet, row, col) {
            Some(cell) => self.resolve_excel_cell(worksheet, row, col, cell),
            None => Ok(CompileResult::error(CellError::Ref)),
        }
    }

    /// Every cell of a range, formulas evaluated
    pub fn resolve_range(&self, range: &RangeAddress) -> FormulaResult<RangeValue> {
        let worksheet = range.worksheet.as_deref().unwrap_or_default();
        let cells = self.provider.get_range_values(range);
        let mut resolved = Vec::with_capacity(cells.len());
        for ((row, col), cell) in range.cells().zip(cells) {
            let result = self.resolve_excel_cell(worksheet, row, col, cell)?;
            resolved.push(RangeCell {
                value: result.value,
                hidden: result.is_hidden_cell,
                is_result_of_subtotal: result.is_result_of_subtotal,
            });
        }
        Ok(RangeValue::new(range.clone(), resolved))
    }

    fn resolve_excel_cell(
        &self,
        worksheet: &str,
        row: u32,
        col: u32,
        cell: ExcelCell,
    ) -> FormulaResult<CompileResult> {
        let flag = |mut result: CompileResult| {
            result.is_hidden_cell = cell.is_hidden;
            result.is_result_of_subtotal |= cell.is_result_of_subtotal;
            result
        };

        let CellValue::Formula { text, cached_value } = &cell.value else {
            return Ok(flag(CompileResult::new(cell.value.clone().into())));
        };

        let address = RangeAddress::single(Some(worksheet.to_string()), row, col);
        let last_value = || {
            let value = cached_value
                .as_deref()
                .cloned()
                .map(FormulaValue::from)
                .unwrap_or(FormulaValue::Empty);
            CompileResult::new(value)
        };

        if self.is_excluded(&address) {
            return Ok(flag(last_value()));
        }
        // volatile cells keep their last value unless volatile recalculation is on
        if !self.options.calculate_volatile
            && cached_value.is_some()
            && self.engine.is_volatile(text).unwrap_or(false)
        {
            return Ok(flag(last_value()));
        }

        let key = CellKey::new(worksheet, row, col);
        if self.scopes.collides_with(&address) {
            if self.is_ignoring_circular_references() {
                return Ok(flag(last_value()));
            }
            if self.options.allow_circular_references {
                tracing::debug!(address = %address, "circular reference resolved to fallback value");
                let fallback = self
                    .results
                    .borrow()
                    .get(&key)
                    .map(|cached| {
                        CompileResult::with_type(cached.value.clone(), cached.data_type)
                            .with_subtotal_flag(cached.is_result_of_subtotal)
                    })
                    .unwrap_or_else(last_value);
                return Ok(flag(fallback));
            }
            tracing::debug!(address = %address, "circular reference detected");
            return Err(FormulaError::CircularReference {
                address: address.to_string(),
            });
        }

        if let Some(cached) = self.results.borrow().get(&key) {
            let result = CompileResult::with_type(cached.value.clone(), cached.data_type)
                .with_subtotal_flag(cached.is_result_of_subtotal);
            return Ok(flag(result));
        }

        tracing::trace!(address = %address, formula = %text, "evaluating cell");
        let result = {
            let _scope = self.scopes.new_scope(address.clone());
            match self.engine.parse(text).and_then(|parsed| self.evaluate_graph(parsed.graph())) {
                Ok(result) => result,
                Err(e) if e.is_circular_reference() => return Err(e),
                Err(e) => CompileResult::error(e.to_cell_error()),
            }
        };

        let value = match operators::scalarize(&result.value, Some(&address)) {
            FormulaValue::Empty => FormulaValue::Number(0.0),
            FormulaValue::Number(n) => FormulaValue::Number(self.options.apply_precision(n)),
            value => value,
        };
        let data_type = if result.data_type.is_numeric() && matches!(value, FormulaValue::Number(_)) {
            result.data_type
        } else {
            DataType::of(&value)
        };

        if !self.is_ignoring_circular_references() && self.excluded_scope_depth.get().is_none() {
            self.results.borrow_mut().insert(
                key,
                CachedResult {
                    value: value.clone(),
                    data_type,
                    is_result_of_subtotal: result.is_result_of_subtotal,
                },
            );
        }

        Ok(flag(
            CompileResult::with_type(value, data_type).with_subtotal_flag(result.is_result_of_subtotal),
        ))
    }

    /// Evaluate a defined name. Unknown names are `#NAME?`.
    pub fn resolve_name(&self, name: &str) -> FormulaResult<CompileResult> {
        let worksheet = self.current_worksheet();
        let Some(refers_to) = self.provider.get_named_value(name, worksheet.as_deref()) else {
            return Ok(CompileResult::error(CellError::Name));
        };

        let key = name.to_lowercase();
        if self.names_in_progress.borrow().contains(&key) {
            tracing::debug!(name, "name refers to itself");
            return Err(FormulaError::CircularReference {
                address: name.to_string(),
            });
        }

        self.names_in_progress.borrow_mut().push(key);
        let result = self.compile_name_expression(&refers_to);
        self.names_in_progress.borrow_mut().pop();
        result
    }

    fn compile_name_expression(&self, refers_to: &str) -> FormulaResult<CompileResult> {
        let expression = refers_to.trim();
        let expression = expression.strip_prefix('=').unwrap_or(expression);
        if self.resolve_address_text(expression).is_some() {
            return compile_address(expression, self);
        }
        let parsed = self.engine.parse(expression)?;
        self.evaluate_graph(parsed.graph())
    }
}

/// Restores the ignore-circular depth on drop
pub struct IgnoreCircularGuard<'c> {
    depth: &'c Cell<u32>,
}

impl Drop for IgnoreCircularGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

/// Restores the previous exclusion on drop
pub struct ExclusionGuard<'c> {
    slot: &'c Cell<Option<usize>>,
    previous: Option<usize>,
}

impl Drop for ExclusionGuard<'_> {
    fn drop(&mut self) {
        self.slot.set(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcalc_core::Workbook;

    fn workbook() -> Workbook {
        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();
        sheet.set_cell_value("A1", 1.0).unwrap();
        sheet.set_cell_value("A2", 2.0).unwrap();
        sheet.set_cell_formula("A3", "=A1+A2").unwrap();
        sheet.set_cell_formula("B1", "=B1").unwrap();
        workbook
    }

    #[test]
    fn test_formula_cells_are_memoized() {
        let workbook = workbook();
        let engine = FormulaEngine::new();
        let ctx = engine.session(&workbook);
        let first = ctx.resolve_cell("Sheet1", 3, 1).unwrap();
        assert_eq!(first.value, FormulaValue::Number(3.0));
        assert_eq!(ctx.results.borrow().len(), 1);
        let again = ctx.resolve_cell("Sheet1", 3, 1).unwrap();
        assert_eq!(again.value, FormulaValue::Number(3.0));
    }

    #[test]
    fn test_self_reference_is_circular() {
        let workbook = workbook();
        let engine = FormulaEngine::new();
        let ctx = engine.session(&workbook);
        let err = ctx.resolve_cell("Sheet1", 1, 2).unwrap_err();
        assert!(err.is_circular_reference());
        assert!(ctx.scopes().is_empty());
    }

    #[test]
    fn test_ignoring_circular_references_yields_last_value() {
        let workbook = workbook();
        let engine = FormulaEngine::new();
        let ctx = engine.session(&workbook);
        {
            let _guard = ctx.ignore_circular_references();
            let result = ctx.resolve_cell("Sheet1", 1, 2).unwrap();
            assert_eq!(result.value, FormulaValue::Number(0.0));
        }
        assert!(!ctx.is_ignoring_circular_references());
        assert!(ctx.results.borrow().is_empty());
    }

    #[test]
    fn test_whole_column_is_clamped_to_used_area() {
        let workbook = workbook();
        let engine = FormulaEngine::new();
        let ctx = engine.session(&workbook);
        let range = ctx.evaluate("A:A", "Sheet1").unwrap();
        let FormulaValue::Range(range) = range.value else {
            panic!("expected a range");
        };
        assert_eq!(range.address.to_row, 3);
    }

    #[test]
    fn test_missing_sheet_is_ref_error() {
        let workbook = workbook();
        let engine = FormulaEngine::new();
        let ctx = engine.session(&workbook);
        let result = ctx.evaluate("Nope!A1", "Sheet1").unwrap();
        assert_eq!(result.value, FormulaValue::Error(CellError::Ref));
    }

    #[test]
    fn test_address_ids_are_reusable() {
        let workbook = workbook();
        let engine = FormulaEngine::new();
        let ctx = engine.session(&workbook);
        let result = ctx.evaluate("A2", "Sheet1").unwrap();
        let id = result.address_reference_id.unwrap();
        assert_eq!(
            ctx.address_by_id(id),
            Some(RangeAddress::single(Some("Sheet1".into()), 2, 1))
        );
        ctx.clear();
        assert_eq!(ctx.address_by_id(id), None);
    }
}
