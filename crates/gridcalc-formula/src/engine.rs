//! Formula engine
//!
//! Owns the function repository and a cache of parsed formulas. Evaluation
//! happens in a [`ParsingContext`] created per calculation pass.

use crate::analyzer::SyntacticAnalyzer;
use crate::error::FormulaResult;
use crate::functions::FunctionRepository;
use crate::graph::{ExpressionGraph, GraphBuilder};
use crate::options::CalculationOptions;
use crate::provider::{EmptyNameValueProvider, ExcelDataProvider};
use crate::session::ParsingContext;
use crate::token::Token;
use crate::tokenizer::Tokenizer;
use crate::value::FormulaValue;
use ahash::AHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// A formula that passed tokenizing, analysis and graph building
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFormula {
    text: String,
    tokens: Vec<Token>,
    graph: ExpressionGraph,
}

impl ParsedFormula {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn graph(&self) -> &ExpressionGraph {
        &self.graph
    }
}

/// Entry point for parsing and evaluating formulas
#[derive(Debug)]
pub struct FormulaEngine {
    repository: FunctionRepository,
    options: CalculationOptions,
    parsed: RefCell<AHashMap<String, Rc<ParsedFormula>>>,
}

impl Default for FormulaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FormulaEngine {
    pub fn new() -> Self {
        Self::with_options(CalculationOptions::default())
    }

    pub fn with_options(options: CalculationOptions) -> Self {
        Self {
            repository: FunctionRepository::new(),
            options,
            parsed: RefCell::new(AHashMap::new()),
        }
    }

    pub fn repository(&self) -> &FunctionRepository {
        &self.repository
    }

    pub fn options(&self) -> &CalculationOptions {
        &self.options
    }

    /// Tokenize against a host's defined names
    pub fn tokenize(
        &self,
        formula: &str,
        provider: &dyn ExcelDataProvider,
        worksheet: Option<&str>,
    ) -> Vec<Token> {
        Tokenizer::new(&self.repository).tokenize(formula, provider, worksheet)
    }

    /// Parse formula text, reusing an earlier parse of the same text
    pub fn parse(&self, formula: &str) -> FormulaResult<Rc<ParsedFormula>> {
        let text = formula.trim();
        let key = text.strip_prefix('=').unwrap_or(text).trim().to_string();
        if let Some(parsed) = self.parsed.borrow().get(&key) {
            return Ok(Rc::clone(parsed));
        }

        let tokens = Tokenizer::new(&self.repository).tokenize(&key, &EmptyNameValueProvider, None);
        SyntacticAnalyzer::new().analyze(&tokens)?;
        let graph = GraphBuilder::new(&tokens).build()?;
        tracing::trace!(formula = %key, expressions = graph.len(), "parsed formula");

        let parsed = Rc::new(ParsedFormula {
            text: key.clone(),
            tokens,
            graph,
        });
        self.parsed.borrow_mut().insert(key, Rc::clone(&parsed));
        Ok(parsed)
    }

    /// Start a calculation session with the engine's options
    pub fn session<'a>(&'a self, provider: &'a dyn ExcelDataProvider) -> ParsingContext<'a> {
        ParsingContext::new(self, provider, self.options.clone())
    }

    /// Evaluate the formula stored in one cell.
    ///
    /// A non-formula cell yields its own value. Circular references surface as
    /// `#REF!` unless the engine allows them.
    pub fn parse_at(
        &self,
        provider: &dyn ExcelDataProvider,
        worksheet: &str,
        row: u32,
        col: u32,
    ) -> FormulaResult<FormulaValue> {
        let ctx = self.session(provider);
        match ctx.resolve_cell(worksheet, row, col) {
            Ok(result) => Ok(result.into_value()),
            Err(e) if e.is_circular_reference() => Ok(FormulaValue::Error(e.to_cell_error())),
            Err(e) => Err(e),
        }
    }

    /// Evaluate formula text as if it were entered on `worksheet`
    pub fn evaluate(
        &self,
        provider: &dyn ExcelDataProvider,
        worksheet: &str,
        formula: &str,
    ) -> FormulaResult<FormulaValue> {
        let ctx = self.session(provider);
        match ctx.evaluate(formula, worksheet) {
            Ok(result) => Ok(result.into_value()),
            Err(e) if e.is_domain_error() || e.is_circular_reference() => {
                Ok(FormulaValue::Error(e.to_cell_error()))
            }
            Err(e) => Err(e),
        }
    }

    /// Whether the formula calls a volatile function such as NOW or RAND
    pub fn is_volatile(&self, formula: &str) -> FormulaResult<bool> {
        let parsed = self.parse(formula)?;
        Ok(parsed
            .graph()
            .function_names()
            .into_iter()
            .any(|name| self.repository.get(name).is_some_and(|def| def.volatile)))
    }

    /// Forget every cached parse
    pub fn clear_cache(&self) {
        self.parsed.borrow_mut().clear();
    }

    pub fn cached_formulas(&self) -> usize {
        self.parsed.borrow().len()
    }
}
