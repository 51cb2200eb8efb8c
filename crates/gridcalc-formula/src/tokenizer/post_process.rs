//! Clean-up passes over a finished token stream

use crate::token::{Token, TokenKind};

/// Inside `{...}` only literals are allowed, so a negator directly in front of a
/// number is folded into it.
pub(crate) fn merge_enumerable_negators(tokens: Vec<Token>) -> Vec<Token> {
    let mut result = Vec::with_capacity(tokens.len());
    let mut depth = 0usize;
    let mut iter = tokens.into_iter().peekable();

    while let Some(token) = iter.next() {
        if token.is(TokenKind::OPENING_ENUMERABLE) {
            depth += 1;
        } else if token.is(TokenKind::CLOSING_ENUMERABLE) {
            depth = depth.saturating_sub(1);
        }

        if depth > 0 && token.is(TokenKind::NEGATOR) {
            if let Some(number) = iter.next_if(|next| next.is(TokenKind::NUMERIC)) {
                result.push(Token::negated(
                    format!("-{}", number.text()),
                    number.kind(),
                ));
                continue;
            }
        }
        result.push(token);
    }
    result
}
