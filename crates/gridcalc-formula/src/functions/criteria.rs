//! Criteria matching for SUMIF, COUNTIF, AVERAGEIF and related functions
//!
//! Excel criteria can be:
//! - A number: exact match (e.g., 5)
//! - A text string: case-insensitive match (e.g., "apple")
//! - A comparison expression: ">5", ">=10", "<100", "<=50", "<>0", "=5", ">b"
//! - Wildcards: "*" matches any characters, "?" matches single character
//! - Empty string: matches empty cells

use crate::compiler::conversion::parse_number;
use crate::options::NumberFormatInfo;
use crate::value::FormulaValue;
use gridcalc_core::CellError;

/// Criteria matcher for SUMIF/COUNTIF/AVERAGEIF and related functions
#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaMatcher {
    criteria_type: CriteriaType,
}

#[derive(Debug, Clone, PartialEq)]
enum CriteriaType {
    /// Exact number match
    Number(f64),
    Boolean(bool),
    Error(CellError),
    /// Comparison with number (operator, value)
    Comparison(ComparisonOp, f64),
    /// Comparison with text, case-insensitive
    TextComparison(ComparisonOp, String),
    /// Text match (lowercase, with wildcards)
    Text(String),
    /// Match empty values
    Empty,
    /// `<>` alone: anything that isn't empty
    NotEmpty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl ComparisonOp {
    fn holds(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            ComparisonOp::Equal => ordering == Equal,
            ComparisonOp::NotEqual => ordering != Equal,
            ComparisonOp::LessThan => ordering == Less,
            ComparisonOp::LessEqual => ordering != Greater,
            ComparisonOp::GreaterThan => ordering == Greater,
            ComparisonOp::GreaterEqual => ordering != Less,
        }
    }
}

impl CriteriaMatcher {
    /// Create a matcher from a criterion value
    pub fn new(criteria: &FormulaValue, format: &NumberFormatInfo) -> Self {
        let criteria_type = match criteria.scalar() {
            FormulaValue::Number(n) => CriteriaType::Number(*n),
            FormulaValue::Boolean(b) => CriteriaType::Boolean(*b),
            FormulaValue::String(s) => Self::parse_string_criteria(s, format),
            FormulaValue::Error(e) => CriteriaType::Error(*e),
            FormulaValue::Empty | FormulaValue::Array(_) | FormulaValue::Range(_) => CriteriaType::Empty,
        };

        Self { criteria_type }
    }

    fn parse_string_criteria(s: &str, format: &NumberFormatInfo) -> CriteriaType {
        if s.is_empty() {
            return CriteriaType::Empty;
        }

        if let Some(ct) = Self::try_parse_comparison(s, format) {
            return ct;
        }

        if let Some(n) = parse_number(s, format) {
            return CriteriaType::Number(n);
        }
        if s.eq_ignore_ascii_case("TRUE") || s.eq_ignore_ascii_case("FALSE") {
            return CriteriaType::Boolean(s.eq_ignore_ascii_case("TRUE"));
        }

        CriteriaType::Text(s.to_lowercase())
    }

    fn try_parse_comparison(s: &str, format: &NumberFormatInfo) -> Option<CriteriaType> {
        // longer operators first
        let (op, rest) = if let Some(rest) = s.strip_prefix(">=") {
            (ComparisonOp::GreaterEqual, rest)
        } else if let Some(rest) = s.strip_prefix("<=") {
            (ComparisonOp::LessEqual, rest)
        } else if let Some(rest) = s.strip_prefix("<>") {
            (ComparisonOp::NotEqual, rest)
        } else if let Some(rest) = s.strip_prefix('>') {
            (ComparisonOp::GreaterThan, rest)
        } else if let Some(rest) = s.strip_prefix('<') {
            (ComparisonOp::LessThan, rest)
        } else if let Some(rest) = s.strip_prefix('=') {
            (ComparisonOp::Equal, rest)
        } else {
            return None;
        };

        if rest.is_empty() {
            return Some(match op {
                ComparisonOp::NotEqual => CriteriaType::NotEmpty,
                ComparisonOp::Equal => CriteriaType::Empty,
                _ => CriteriaType::TextComparison(op, String::new()),
            });
        }
        if let Some(n) = parse_number(rest, format) {
            return Some(CriteriaType::Comparison(op, n));
        }
        Some(match op {
            ComparisonOp::Equal => CriteriaType::Text(rest.to_lowercase()),
            _ => CriteriaType::TextComparison(op, rest.to_lowercase()),
        })
    }

    /// Check if a value matches the criteria
    pub fn matches(&self, value: &FormulaValue) -> bool {
        match &self.criteria_type {
            // numbers only match numbers: a criterion of 5 doesn't match the text "5"
            CriteriaType::Number(criteria_num) => {
                matches!(value, FormulaValue::Number(n) if (n - criteria_num).abs() < 1e-10)
            }

            CriteriaType::Boolean(b) => matches!(value, FormulaValue::Boolean(v) if v == b),

            CriteriaType::Error(e) => matches!(value, FormulaValue::Error(v) if v == e),

            CriteriaType::Comparison(op, criteria_num) => match value {
                FormulaValue::Number(n) => op.holds(n.partial_cmp(criteria_num).unwrap_or(std::cmp::Ordering::Equal)),
                // `<>5` holds for anything that isn't the number 5
                _ => *op == ComparisonOp::NotEqual,
            },

            CriteriaType::TextComparison(op, criteria_text) => match value {
                FormulaValue::String(s) => op.holds(s.to_lowercase().cmp(criteria_text)),
                _ => *op == ComparisonOp::NotEqual,
            },

            CriteriaType::Text(pattern) => match value {
                FormulaValue::String(s) => wildcard_match(pattern, &s.to_lowercase()),
                _ => false,
            },

            CriteriaType::Empty => {
                matches!(value, FormulaValue::Empty)
                    || matches!(value, FormulaValue::String(s) if s.is_empty())
            }

            CriteriaType::NotEmpty => !matches!(value, FormulaValue::Empty),
        }
    }
}

/// Match with wildcards: * = any characters, ? = single character, ~ escapes
pub(crate) fn wildcard_match(pattern: &str, text: &str) -> bool {
    // If no wildcards, do exact match
    if !pattern.contains(['*', '?', '~']) {
        return pattern == text;
    }

    let pattern_chars = tokenize_pattern(pattern);
    let text_chars: Vec<char> = text.chars().collect();
    wildcard_match_impl(&pattern_chars, &text_chars)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PatternChar {
    Literal(char),
    AnyOne,
    AnyMany,
}

fn tokenize_pattern(pattern: &str) -> Vec<PatternChar> {
    let mut result = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        result.push(match c {
            '~' => PatternChar::Literal(chars.next().unwrap_or('~')),
            '?' => PatternChar::AnyOne,
            '*' => PatternChar::AnyMany,
            c => PatternChar::Literal(c),
        });
    }
    result
}

fn wildcard_match_impl(pattern: &[PatternChar], text: &[char]) -> bool {
    let mut pi = 0; // pattern index
    let mut ti = 0; // text index
    let mut star_pi = None; // position of last * in pattern
    let mut star_ti = 0; // position in text when we matched last *

    while ti < text.len() {
        let single = match pattern.get(pi) {
            Some(PatternChar::AnyOne) => true,
            Some(PatternChar::Literal(c)) => *c == text[ti],
            _ => false,
        };
        if single {
            pi += 1;
            ti += 1;
        } else if pattern.get(pi) == Some(&PatternChar::AnyMany) {
            star_pi = Some(pi);
            star_ti = ti;
            pi += 1;
        } else if let Some(sp) = star_pi {
            // backtrack: let the last * swallow one more character
            pi = sp + 1;
            star_ti += 1;
            ti = star_ti;
        } else {
            return false;
        }
    }

    while pattern.get(pi) == Some(&PatternChar::AnyMany) {
        pi += 1;
    }

    pi == pattern.len()
}
