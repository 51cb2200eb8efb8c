//! Separator table used by the tokenizer

use crate::token::TokenKind;
use ahash::AHashMap;
use once_cell::sync::Lazy;

const MAX_SEPARATOR_LEN: usize = 2;

static SEPARATORS: Lazy<AHashMap<&'static str, TokenKind>> = Lazy::new(|| {
    let mut table = AHashMap::new();
    for op in ["+", "-", "*", "/", "^", "&", "=", "<", ">", "<=", ">=", "<>"] {
        table.insert(op, TokenKind::OPERATOR);
    }
    table.insert("%", TokenKind::PERCENT);
    table.insert("(", TokenKind::OPENING_PARENTHESIS);
    table.insert(")", TokenKind::CLOSING_PARENTHESIS);
    table.insert("{", TokenKind::OPENING_ENUMERABLE);
    table.insert("}", TokenKind::CLOSING_ENUMERABLE);
    table.insert(",", TokenKind::COMMA);
    table.insert(";", TokenKind::SEMICOLON);
    table
});

/// Longest separator starting at `position`, if any
pub(crate) fn longest_match(chars: &[char], position: usize) -> Option<(&'static str, TokenKind)> {
    (1..=MAX_SEPARATOR_LEN).rev().find_map(|len| {
        let end = position + len;
        if end > chars.len() {
            return None;
        }
        let candidate: String = chars[position..end].iter().collect();
        SEPARATORS
            .get_key_value(candidate.as_str())
            .map(|(text, kind)| (*text, *kind))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_prefers_two_character_operators() {
        assert_eq!(
            longest_match(&chars("<=1"), 0),
            Some(("<=", TokenKind::OPERATOR))
        );
        assert_eq!(
            longest_match(&chars("<1"), 0),
            Some(("<", TokenKind::OPERATOR))
        );
        assert_eq!(
            longest_match(&chars("A1%"), 2),
            Some(("%", TokenKind::PERCENT))
        );
        assert_eq!(longest_match(&chars("A1"), 0), None);
    }
}
