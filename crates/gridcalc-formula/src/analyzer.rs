//! Structural validation of a token stream

use crate::error::{FormulaError, FormulaResult};
use crate::token::{Token, TokenKind};

/// Checks delimiter balance and rejects unrecognized tokens before a graph is built
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntacticAnalyzer;

impl SyntacticAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, tokens: &[Token]) -> FormulaResult<()> {
        let mut parentheses: i64 = 0;
        let mut braces: i64 = 0;
        let mut quotes = 0usize;

        for token in tokens {
            if token.is(TokenKind::UNRECOGNIZED) {
                return Err(FormulaError::UnrecognizedToken(token.text().to_string()));
            }
            if token.is(TokenKind::OPENING_PARENTHESIS) {
                parentheses += 1;
            } else if token.is(TokenKind::CLOSING_PARENTHESIS) {
                parentheses -= 1;
            } else if token.is(TokenKind::OPENING_ENUMERABLE) {
                braces += 1;
            } else if token.is(TokenKind::CLOSING_ENUMERABLE) {
                braces -= 1;
            } else if token.is(TokenKind::STRING) {
                quotes += 1;
            }
            if parentheses < 0 {
                return Err(FormulaError::Format("unexpected ')'".to_string()));
            }
            if braces < 0 {
                return Err(FormulaError::Format("unexpected '}'".to_string()));
            }
        }

        if parentheses != 0 {
            return Err(FormulaError::Format("number of opening and closing parentheses does not match".to_string()));
        }
        if braces != 0 {
            return Err(FormulaError::Format("number of opening and closing braces does not match".to_string()));
        }
        if quotes % 2 != 0 {
            return Err(FormulaError::Format("unterminated string literal".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::FunctionRepository;
    use crate::provider::EmptyNameValueProvider;
    use crate::tokenizer::Tokenizer;

    fn analyze(formula: &str) -> FormulaResult<()> {
        let repository = FunctionRepository::new();
        let tokens = Tokenizer::new(&repository).tokenize(formula, &EmptyNameValueProvider, None);
        SyntacticAnalyzer::new().analyze(&tokens)
    }

    #[test]
    fn test_balanced_formulas_pass() {
        assert!(analyze("SUM(A1:A3)*(2+3)").is_ok());
        assert!(analyze("{1,2;3,4}").is_ok());
        assert!(analyze("\"a\"&\"b\"").is_ok());
    }

    #[test]
    fn test_unbalanced_parentheses() {
        assert!(matches!(analyze("SUM(A1"), Err(FormulaError::Format(_))));
        assert!(matches!(analyze("1)+(2"), Err(FormulaError::Format(_))));
    }

    #[test]
    fn test_unbalanced_braces_and_quotes() {
        assert!(matches!(analyze("{1,2"), Err(FormulaError::Format(_))));
        assert!(matches!(analyze("\"abc"), Err(FormulaError::Format(_))));
    }

    #[test]
    fn test_unrecognized_token() {
        assert!(matches!(
            analyze("A1:+1"),
            Err(FormulaError::UnrecognizedToken(_))
        ));
    }
}
