//! Lexical tokens

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// What a token means. A set of flags rather than a single tag.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TokenKind: u32 {
        /// Binary operator: `+ - * / ^ & = <> < <= > >=`
        const OPERATOR = 1 << 0;
        const INTEGER = 1 << 1;
        const DECIMAL = 1 << 2;
        /// A `"` delimiter
        const STRING = 1 << 3;
        /// The text between two `"` delimiters
        const STRING_CONTENT = 1 << 4;
        /// Cell, range, whole-row/column or table reference
        const EXCEL_ADDRESS = 1 << 5;
        const FUNCTION = 1 << 6;
        const OPENING_PARENTHESIS = 1 << 7;
        const CLOSING_PARENTHESIS = 1 << 8;
        const COMMA = 1 << 9;
        const SEMICOLON = 1 << 10;
        /// Unary minus
        const NEGATOR = 1 << 11;
        const OPENING_ENUMERABLE = 1 << 12;
        const CLOSING_ENUMERABLE = 1 << 13;
        /// Identifier resolved through defined names at evaluation time
        const NAME_VALUE = 1 << 14;
        /// A reference containing `#REF!`
        const INVALID_REFERENCE = 1 << 15;
        const UNRECOGNIZED = 1 << 16;
        const BOOLEAN = 1 << 17;
        /// Error literal such as `#N/A`
        const EXCEL_ERROR = 1 << 18;
        /// Postfix `%`
        const PERCENT = 1 << 19;

        const NUMERIC = Self::INTEGER.bits() | Self::DECIMAL.bits();
        /// Tokens after which `-` is unary and `+` is dropped
        const NEGATION_CONTEXT = Self::OPERATOR.bits()
            | Self::OPENING_PARENTHESIS.bits()
            | Self::COMMA.bits()
            | Self::SEMICOLON.bits()
            | Self::OPENING_ENUMERABLE.bits()
            | Self::NEGATOR.bits();
        /// Tokens that become a function name when followed by `(`
        const CALLABLE = Self::EXCEL_ADDRESS.bits()
            | Self::NAME_VALUE.bits()
            | Self::BOOLEAN.bits()
            | Self::FUNCTION.bits();
    }
}

/// A lexical token. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    text: String,
    kind: TokenKind,
    is_negated: bool,
}

impl Token {
    pub fn new(text: impl Into<String>, kind: TokenKind) -> Self {
        Self {
            text: text.into(),
            kind,
            is_negated: false,
        }
    }

    /// A numeric literal that absorbed a preceding negator
    pub fn negated(text: impl Into<String>, kind: TokenKind) -> Self {
        Self {
            text: text.into(),
            kind,
            is_negated: true,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn is_negated(&self) -> bool {
        self.is_negated
    }

    /// Whether the token carries any of the given flags
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind.intersects(kind)
    }

    /// The same text with a different meaning
    pub fn reclassified(&self, kind: TokenKind) -> Self {
        Self {
            text: self.text.clone(),
            kind,
            is_negated: self.is_negated,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_groups() {
        let token = Token::new("3", TokenKind::INTEGER);
        assert!(token.is(TokenKind::NUMERIC));
        assert!(!token.is(TokenKind::NEGATION_CONTEXT));

        let call = Token::new("Text", TokenKind::NAME_VALUE).reclassified(TokenKind::FUNCTION);
        assert_eq!(call.kind(), TokenKind::FUNCTION);
        assert_eq!(call.text(), "Text");
    }
}
