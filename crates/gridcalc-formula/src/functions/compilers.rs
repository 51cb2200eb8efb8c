//! Function compilers
//!
//! A call is compiled by one of a handful of strategies, picked from the
//! definition's identity first and its capability flags second:
//!
//! - default: compile every argument left to right, then invoke
//! - IF: compile the condition and only the branch it selects
//! - IFERROR/IFNA: compile the fallback only when the value needs it
//! - error handling: domain errors raised by arguments go to the function's hook
//! - lookup: arguments compile with circular references ignored
//! - conditional aggregation: see [`super::conditional`]

use super::{conditional, logical, FunctionArgument, FunctionCapabilities, FunctionDef, FunctionIdentity};
use crate::compiler::CompileResult;
use crate::error::{FormulaError, FormulaResult};
use crate::graph::Expression;
use crate::session::ParsingContext;
use gridcalc_core::CellError;

pub(crate) fn compile_function(
    name: &str,
    args: &[Expression],
    ctx: &ParsingContext<'_>,
) -> FormulaResult<CompileResult> {
    let def = ctx
        .engine()
        .repository()
        .get(name)
        .ok_or_else(|| FormulaError::UnknownFunction(name.to_uppercase()))?;
    def.check_arity(args.len())?;

    match def.identity {
        FunctionIdentity::If => compile_if(def, args, ctx),
        FunctionIdentity::IfError | FunctionIdentity::IfNa => compile_iferror(def, args, ctx),
        FunctionIdentity::SumIf
        | FunctionIdentity::SumIfs
        | FunctionIdentity::CountIf
        | FunctionIdentity::CountIfs
        | FunctionIdentity::AverageIf => conditional::compile(def, args, ctx),
        _ if def.capabilities.contains(FunctionCapabilities::ERROR_HANDLING) => {
            compile_error_handling(def, args, ctx)
        }
        _ if def.is_lookup() => compile_lookup(def, args, ctx),
        _ => compile_default(def, args, ctx),
    }
}

pub(crate) fn compile_arguments(
    args: &[Expression],
    ctx: &ParsingContext<'_>,
) -> FormulaResult<Vec<FunctionArgument>> {
    args.iter()
        .map(|arg| arg.compile(ctx).map(FunctionArgument::from))
        .collect()
}

/// Call the implementation; a raised domain error becomes the call's value
pub(crate) fn invoke(
    def: &FunctionDef,
    arguments: &[FunctionArgument],
    ctx: &ParsingContext<'_>,
) -> FormulaResult<CompileResult> {
    let result = match (def.implementation)(arguments, ctx) {
        Ok(value) => CompileResult::new(value),
        Err(FormulaError::Value(e)) => CompileResult::error(e),
        Err(e) => return Err(e),
    };
    Ok(result.with_subtotal_flag(def.identity == FunctionIdentity::Subtotal))
}

fn compile_default(def: &FunctionDef, args: &[Expression], ctx: &ParsingContext<'_>) -> FormulaResult<CompileResult> {
    let arguments = compile_arguments(args, ctx)?;
    invoke(def, &arguments, ctx)
}

fn compile_if(def: &FunctionDef, args: &[Expression], ctx: &ParsingContext<'_>) -> FormulaResult<CompileResult> {
    let condition = FunctionArgument::from(args[0].compile(ctx)?);
    let taken = match logical::condition(&condition, ctx) {
        Ok(true) => 1,
        Ok(false) => 2,
        Err(FormulaError::Value(e)) => return Ok(CompileResult::error(e)),
        Err(e) => return Err(e),
    };

    let mut arguments = vec![condition];
    for (index, arg) in args.iter().enumerate().skip(1) {
        if index == taken {
            arguments.push(arg.compile(ctx)?.into());
        } else {
            arguments.push(FunctionArgument::placeholder());
        }
    }
    invoke(def, &arguments, ctx)
}

fn compile_iferror(def: &FunctionDef, args: &[Expression], ctx: &ParsingContext<'_>) -> FormulaResult<CompileResult> {
    let value = match args[0].compile(ctx) {
        Ok(result) => FunctionArgument::from(result),
        Err(e) if e.is_domain_error() => {
            tracing::trace!(function = def.name, error = %e, "intercepted error");
            FunctionArgument::from(CompileResult::error(e.to_cell_error()))
        }
        Err(e) => return Err(e),
    };

    let error = value.scalar(ctx).get_error();
    let needs_fallback = match def.identity {
        FunctionIdentity::IfNa => error == Some(CellError::Na),
        _ => error.is_some(),
    };
    let fallback = if needs_fallback {
        args[1].compile(ctx)?.into()
    } else {
        FunctionArgument::placeholder()
    };
    invoke(def, &[value, fallback], ctx)
}

fn compile_error_handling(
    def: &FunctionDef,
    args: &[Expression],
    ctx: &ParsingContext<'_>,
) -> FormulaResult<CompileResult> {
    let mut arguments = Vec::with_capacity(args.len());
    for arg in args {
        match arg.compile(ctx) {
            Ok(result) => arguments.push(result.into()),
            Err(e) if e.is_domain_error() => {
                if let Some(handle_error) = def.handle_error {
                    return Ok(CompileResult::new(handle_error(e.to_cell_error())));
                }
                return Err(e);
            }
            Err(e) => return Err(e),
        }
    }
    invoke(def, &arguments, ctx)
}

fn compile_lookup(def: &FunctionDef, args: &[Expression], ctx: &ParsingContext<'_>) -> FormulaResult<CompileResult> {
    let _ignore = ctx.ignore_circular_references();
    compile_default(def, args, ctx)
}

#[cfg(test)]
mod tests {
    use crate::engine::FormulaEngine;
    use crate::error::FormulaError;
    use crate::value::FormulaValue;
    use gridcalc_core::{CellError, Workbook};
    use pretty_assertions::assert_eq;

    fn eval(workbook: &Workbook, formula: &str) -> FormulaValue {
        FormulaEngine::new().evaluate(workbook, "Sheet1", formula).unwrap()
    }

    #[test]
    fn test_if_skips_untaken_branch() {
        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();
        sheet.set_cell_formula("B2", "=B2").unwrap();
        sheet.set_cell_value("B3", 7.0).unwrap();
        assert_eq!(eval(&workbook, "=IF(1>2,B2,B3)"), FormulaValue::Number(7.0));
        assert_eq!(eval(&workbook, "=IF(TRUE,\"yes\")"), FormulaValue::String("yes".into()));
        assert_eq!(eval(&workbook, "=IF(FALSE,1)"), FormulaValue::Boolean(false));
        assert_eq!(eval(&workbook, "=IF(1/0,1,2)"), FormulaValue::Error(CellError::Div0));
    }

    #[test]
    fn test_iferror_catches_raised_errors() {
        let workbook = Workbook::new();
        assert_eq!(eval(&workbook, "=IFERROR(1/0,5)"), FormulaValue::Number(5.0));
        assert_eq!(eval(&workbook, "=IFERROR(NOSUCHFN(),\"x\")"), FormulaValue::String("x".into()));
        assert_eq!(eval(&workbook, "=IFERROR(3,1/0)"), FormulaValue::Number(3.0));
        assert_eq!(eval(&workbook, "=IFNA(NA(),0)"), FormulaValue::Number(0.0));
        assert_eq!(eval(&workbook, "=IFNA(1/0,0)"), FormulaValue::Error(CellError::Div0));
    }

    #[test]
    fn test_error_handling_functions_see_raised_errors() {
        let workbook = Workbook::new();
        assert_eq!(eval(&workbook, "=ISERROR(NOSUCHFN())"), FormulaValue::Boolean(true));
        assert_eq!(eval(&workbook, "=ERROR.TYPE(NOSUCHFN())"), FormulaValue::Number(5.0));
    }

    #[test]
    fn test_argument_count_is_checked_before_compiling() {
        let workbook = Workbook::new();
        let engine = FormulaEngine::new();
        let err = engine.evaluate(&workbook, "Sheet1", "=ABS(1,2)").unwrap_err();
        assert!(matches!(err, FormulaError::ArgumentCount { .. }));
    }
}
