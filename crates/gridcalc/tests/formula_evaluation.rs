//! Tests for formula evaluation through a whole workbook

use gridcalc::prelude::*;
use gridcalc_formula::{ExcelAddressCache, SyntacticAnalyzer, TokenKind};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn eval(workbook: &Workbook, formula: &str) -> FormulaValue {
    FormulaEngine::new().evaluate(workbook, "Sheet1", formula).unwrap()
}

fn calculated(workbook: &Workbook, cell: &str) -> FormulaValue {
    let sheet = workbook.worksheet(0).unwrap();
    let address = CellAddress::parse(cell).unwrap();
    sheet
        .get_calculated_value_at(address.row, address.col)
        .cloned()
        .map(FormulaValue::from)
        .unwrap_or(FormulaValue::Empty)
}

/// Operator precedence and the arithmetic edge cases
#[test]
fn test_operators() {
    let workbook = Workbook::new();

    assert_eq!(eval(&workbook, "=1+2*3"), FormulaValue::Number(7.0));
    assert_eq!(eval(&workbook, "=(1+2)*3"), FormulaValue::Number(9.0));
    assert_eq!(eval(&workbook, "=-2^2"), FormulaValue::Number(-4.0));
    assert_eq!(eval(&workbook, "=2^3^2"), FormulaValue::Number(64.0));
    assert_eq!(eval(&workbook, "=50%"), FormulaValue::Number(0.5));
    assert_eq!(eval(&workbook, "=\"a\"&1+1"), FormulaValue::String("a2".into()));
    assert_eq!(eval(&workbook, "=5>3"), FormulaValue::Boolean(true));
    assert_eq!(eval(&workbook, "=\"abc\"=\"ABC\""), FormulaValue::Boolean(true));
    assert_eq!(eval(&workbook, "=1/0"), FormulaValue::Error(CellError::Div0));
    assert_eq!(eval(&workbook, "=\"x\"+1"), FormulaValue::Error(CellError::Value));
}

/// Errors in one operand win over the other operand
#[test]
fn test_error_propagation() {
    let mut workbook = Workbook::new();
    let sheet = workbook.worksheet_mut(0).unwrap();
    sheet.set_cell_formula("A1", "=1/0").unwrap();
    sheet.set_cell_formula("A2", "=A1+1").unwrap();
    sheet.set_cell_formula("A3", "=SUM(A1:A2)").unwrap();
    sheet.set_cell_formula("A4", "=IFERROR(A3,-1)").unwrap();

    let stats = workbook.calculate().unwrap();
    assert_eq!(stats.errors, 3);

    assert_eq!(calculated(&workbook, "A2"), FormulaValue::Error(CellError::Div0));
    assert_eq!(calculated(&workbook, "A3"), FormulaValue::Error(CellError::Div0));
    assert_eq!(calculated(&workbook, "A4"), FormulaValue::Number(-1.0));
}

/// Empty cells read as 0, "" or FALSE depending on what they meet
#[test]
fn test_empty_cell_semantics() {
    let mut workbook = Workbook::new();
    let sheet = workbook.worksheet_mut(0).unwrap();
    sheet.set_cell_formula("A2", "=A1").unwrap();
    sheet.set_cell_formula("A3", "=A1+0").unwrap();
    sheet.set_cell_formula("A4", "=A1=\"\"").unwrap();
    sheet.set_cell_formula("A5", "=A1=FALSE").unwrap();
    sheet.set_cell_formula("A6", "=A1=0").unwrap();

    workbook.calculate().unwrap();

    assert_eq!(calculated(&workbook, "A2"), FormulaValue::Number(0.0));
    assert_eq!(calculated(&workbook, "A3"), FormulaValue::Number(0.0));
    assert_eq!(calculated(&workbook, "A4"), FormulaValue::Boolean(true));
    assert_eq!(calculated(&workbook, "A5"), FormulaValue::Boolean(true));
    assert_eq!(calculated(&workbook, "A6"), FormulaValue::Boolean(true));
}

/// IF only compiles the branch it takes
#[test]
fn test_if_is_lazy() {
    let mut workbook = Workbook::new();
    let sheet = workbook.worksheet_mut(0).unwrap();
    sheet.set_cell_value("A1", 2.0).unwrap();
    sheet.set_cell_formula("B2", "=B2").unwrap();
    sheet.set_cell_value("B3", 7.0).unwrap();

    assert_eq!(eval(&workbook, "=IF(A1<>2,B2,B3)"), FormulaValue::Number(7.0));
    assert_eq!(eval(&workbook, "=IF(A1=2,B3,B2)"), FormulaValue::Number(7.0));
    assert_eq!(eval(&workbook, "=IF(A1<>2,B2,B3)+IF(A1=2,1,1/0)"), FormulaValue::Number(8.0));
    assert_eq!(eval(&workbook, "=IF(A1=2,B2,B3)"), FormulaValue::Error(CellError::Ref));
}

#[test]
fn test_lookup_and_conditional_aggregates() {
    let mut workbook = Workbook::new();
    let sheet = workbook.worksheet_mut(0).unwrap();
    for (row, (name, amount)) in [("apple", 3.0), ("pear", 5.0), ("apple", 4.0), ("plum", 1.0)]
        .into_iter()
        .enumerate()
    {
        let row = row as u32 + 1;
        sheet.set_cell_value_at(row, 1, name).unwrap();
        sheet.set_cell_value_at(row, 2, amount).unwrap();
    }
    sheet.set_cell_formula("D1", "=SUMIF(A1:A4,\"apple\",B1:B4)").unwrap();
    sheet.set_cell_formula("D2", "=COUNTIFS(A1:A4,\"p*\",B1:B4,\">2\")").unwrap();
    sheet.set_cell_formula("D3", "=VLOOKUP(\"pear\",A1:B4,2,FALSE)").unwrap();
    sheet.set_cell_formula("D4", "=INDEX(B1:B4,MATCH(\"plum\",A1:A4,0))").unwrap();
    sheet.set_cell_formula("D5", "=AVERAGEIF(A1:A4,\"<>apple\",B1:B4)").unwrap();

    workbook.calculate().unwrap();

    assert_eq!(calculated(&workbook, "D1"), FormulaValue::Number(7.0));
    assert_eq!(calculated(&workbook, "D2"), FormulaValue::Number(1.0));
    assert_eq!(calculated(&workbook, "D3"), FormulaValue::Number(5.0));
    assert_eq!(calculated(&workbook, "D4"), FormulaValue::Number(1.0));
    assert_eq!(calculated(&workbook, "D5"), FormulaValue::Number(3.0));
}

#[test]
fn test_defined_names_and_tables() {
    let mut workbook = Workbook::new();
    let sheet = workbook.worksheet_mut(0).unwrap();
    sheet.set_cell_value("A1", "Item").unwrap();
    sheet.set_cell_value("B1", "Amount").unwrap();
    sheet.set_cell_value("A2", "x").unwrap();
    sheet.set_cell_value("B2", 10.0).unwrap();
    sheet.set_cell_value("A3", "y").unwrap();
    sheet.set_cell_value("B3", 30.0).unwrap();
    sheet.set_cell_value("D1", 0.5).unwrap();
    sheet.set_cell_formula("E1", "=SUM(Sales[Amount])*Rate").unwrap();
    sheet.set_cell_formula("E2", "=Unknown*2").unwrap();

    workbook.define_name("Rate", "Sheet1!$D$1").unwrap();
    workbook.add_table("Sales", "Sheet1", "A1:B3", true, false).unwrap();

    workbook.calculate().unwrap();

    assert_eq!(calculated(&workbook, "E1"), FormulaValue::Number(20.0));
    assert_eq!(calculated(&workbook, "E2"), FormulaValue::Error(CellError::Name));
}

#[test]
fn test_cross_sheet_references() {
    let mut workbook = Workbook::new();
    workbook.add_worksheet_with_name("Data Sheet").unwrap();
    let data = workbook.worksheet_mut(1).unwrap();
    data.set_cell_value("A1", 4.0).unwrap();
    data.set_cell_value("A2", 6.0).unwrap();

    let sheet = workbook.worksheet_mut(0).unwrap();
    sheet.set_cell_formula("A1", "=SUM('Data Sheet'!A1:A2)").unwrap();
    sheet.set_cell_formula("A2", "=Missing!A1").unwrap();

    workbook.calculate().unwrap();

    assert_eq!(calculated(&workbook, "A1"), FormulaValue::Number(10.0));
    assert_eq!(calculated(&workbook, "A2"), FormulaValue::Error(CellError::Ref));
}

/// Parsed formulas are shared between cells with the same text
#[test]
fn test_parse_cache() {
    let engine = FormulaEngine::new();
    let first = engine.parse("=A1+1").unwrap();
    let second = engine.parse("A1+1").unwrap();
    assert!(std::rc::Rc::ptr_eq(&first, &second));
    assert_eq!(engine.cached_formulas(), 1);

    engine.clear_cache();
    assert_eq!(engine.cached_formulas(), 0);
}

#[test]
fn test_address_cache_ids() {
    let mut cache = ExcelAddressCache::new();
    assert_eq!(cache.get_new_id(), 1);
    assert_eq!(cache.get_new_id(), 2);
    let id = cache.add("Sheet1!A1");
    assert_eq!(id, 3);
    assert_eq!(cache.get(id), Some("Sheet1!A1"));

    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.get_new_id(), 1);
}

#[test]
fn test_tokenizer_through_engine() {
    let workbook = Workbook::new();
    let engine = FormulaEngine::new();

    let tokens = engine.tokenize("\"abc123\"", &workbook, Some("Sheet1"));
    let kinds: Vec<_> = tokens.iter().map(|t| t.kind()).collect();
    assert_eq!(kinds, vec![TokenKind::STRING, TokenKind::STRING_CONTENT, TokenKind::STRING]);
    assert_eq!(tokens[1].text(), "abc123");

    let tokens = engine.tokenize("Text(2)", &workbook, Some("Sheet1"));
    assert_eq!(tokens.len(), 4);
    assert!(tokens[0].is(TokenKind::FUNCTION));

    assert_eq!(engine.tokenize("+3-3", &workbook, None).len(), 3);
    assert_eq!(engine.tokenize("--3-3", &workbook, None).len(), 5);
}

fn nested(depth: usize, close: usize) -> String {
    format!("{}1{}", "(".repeat(depth), ")".repeat(close))
}

proptest! {
    #[test]
    fn balanced_parentheses_pass_analysis(depth in 0usize..20) {
        let workbook = Workbook::new();
        let engine = FormulaEngine::new();
        let tokens = engine.tokenize(&nested(depth, depth), &workbook, None);
        prop_assert!(SyntacticAnalyzer::new().analyze(&tokens).is_ok());
    }

    #[test]
    fn unmatched_parentheses_are_format_errors(depth in 1usize..20, missing in 1usize..5) {
        let workbook = Workbook::new();
        let engine = FormulaEngine::new();
        let close = depth.saturating_sub(missing);
        let tokens = engine.tokenize(&nested(depth, close), &workbook, None);
        let result = SyntacticAnalyzer::new().analyze(&tokens);
        prop_assert!(matches!(result, Err(FormulaError::Format(_))), "{:?}", result);
    }

    #[test]
    fn unterminated_strings_are_format_errors(text in "[a-z0-9 ]{0,12}") {
        let workbook = Workbook::new();
        let engine = FormulaEngine::new();
        let tokens = engine.tokenize(&format!("\"{text}"), &workbook, None);
        let result = SyntacticAnalyzer::new().analyze(&tokens);
        prop_assert!(matches!(result, Err(FormulaError::Format(_))), "{:?}", result);
    }

    #[test]
    fn cell_arithmetic_matches_f64(a in -1000i32..1000, b in -1000i32..1000) {
        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();
        sheet.set_cell_value("A1", f64::from(a)).unwrap();
        sheet.set_cell_value("B1", f64::from(b)).unwrap();
        sheet.set_cell_formula("C1", "=A1*B1-A1+(B1-A1)").unwrap();
        workbook.calculate().unwrap();

        let (a, b) = (f64::from(a), f64::from(b));
        prop_assert_eq!(calculated(&workbook, "C1"), FormulaValue::Number(a * b - a + (b - a)));
    }
}
