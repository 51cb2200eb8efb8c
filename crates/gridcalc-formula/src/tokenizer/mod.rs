//! Formula text to token stream
//!
//! The tokenizer walks the formula one character at a time, accumulating
//! non-separator characters and handing each finished run to the
//! [`TokenFactory`](factory::TokenFactory) for classification. It never fails:
//! malformed input shows up as `UNRECOGNIZED` tokens or unbalanced delimiters,
//! both of which the [`SyntacticAnalyzer`](crate::SyntacticAnalyzer) rejects.

mod factory;
mod post_process;
mod separators;

use crate::functions::FunctionRepository;
use crate::provider::NameValueProvider;
use crate::token::{Token, TokenKind};
use factory::TokenFactory;
use lazy_regex::regex_is_match;

/// Error literals matched as a whole at `#`, longest first
const ERROR_LITERALS: &[&str] = &[
    "#GETTING_DATA",
    "#DIV/0!",
    "#VALUE!",
    "#SPILL!",
    "#NULL!",
    "#NAME?",
    "#CALC!",
    "#NUM!",
    "#REF!",
    "#N/A",
];

/// Mutable state of a single tokenizer pass
#[derive(Debug)]
pub(crate) struct TokenizerContext {
    chars: Vec<char>,
    position: usize,
    current: String,
    result: Vec<Token>,
    is_in_string: bool,
    is_in_sheet_name: bool,
    bracket_depth: u32,
}

impl TokenizerContext {
    fn new(formula: &str) -> Self {
        Self {
            chars: formula.chars().collect(),
            position: 0,
            current: String::new(),
            result: Vec::new(),
            is_in_string: false,
            is_in_sheet_name: false,
            bracket_depth: 0,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.position + offset).copied()
    }

    fn advance(&mut self, count: usize) {
        self.position += count;
    }

    fn append(&mut self, c: char) {
        self.current.push(c);
    }

    fn has_current(&self) -> bool {
        !self.current.is_empty()
    }

    fn take_current(&mut self) -> String {
        std::mem::take(&mut self.current)
    }

    fn last(&self) -> Option<&Token> {
        self.result.last()
    }

    fn push(&mut self, token: Token) {
        self.result.push(token);
    }

    fn replace_last(&mut self, token: Token) {
        if let Some(last) = self.result.last_mut() {
            *last = token;
        }
    }

    /// Error literal starting at the cursor, compared case-insensitively
    fn error_literal_at_cursor(&self) -> Option<&'static str> {
        ERROR_LITERALS.iter().copied().find(|literal| {
            let len = literal.chars().count();
            self.position + len <= self.chars.len()
                && self.chars[self.position..self.position + len]
                    .iter()
                    .zip(literal.chars())
                    .all(|(a, b)| a.eq_ignore_ascii_case(&b))
        })
    }
}

/// Splits formula text into [`Token`]s
pub struct Tokenizer<'r> {
    repository: &'r FunctionRepository,
}

impl<'r> Tokenizer<'r> {
    pub fn new(repository: &'r FunctionRepository) -> Self {
        Self { repository }
    }

    /// Tokenize a formula, with or without its leading `=`.
    ///
    /// `names` decides whether an identifier is a defined name; `worksheet` is
    /// the sheet those names are looked up from.
    pub fn tokenize<N>(&self, formula: &str, names: &N, worksheet: Option<&str>) -> Vec<Token>
    where
        N: NameValueProvider + ?Sized,
    {
        let text = formula.trim();
        let text = text.strip_prefix('=').unwrap_or(text);
        let factory = TokenFactory::new(self.repository, names, worksheet);
        let mut ctx = TokenizerContext::new(text);

        while let Some(c) = ctx.current_char() {
            if ctx.is_in_string {
                if c == '"' {
                    if ctx.peek(1) == Some('"') {
                        ctx.append('"');
                        ctx.advance(2);
                        continue;
                    }
                    let content = ctx.take_current();
                    ctx.push(Token::new(content, TokenKind::STRING_CONTENT));
                    ctx.push(Token::new("\"", TokenKind::STRING));
                    ctx.is_in_string = false;
                } else {
                    ctx.append(c);
                }
                ctx.advance(1);
                continue;
            }

            if ctx.is_in_sheet_name {
                if c == '\'' {
                    if ctx.peek(1) == Some('\'') {
                        ctx.append('\'');
                        ctx.append('\'');
                        ctx.advance(2);
                        continue;
                    }
                    ctx.is_in_sheet_name = false;
                }
                ctx.append(c);
                ctx.advance(1);
                continue;
            }

            if ctx.bracket_depth > 0 {
                match c {
                    '[' => ctx.bracket_depth += 1,
                    ']' => ctx.bracket_depth -= 1,
                    _ => {}
                }
                ctx.append(c);
                ctx.advance(1);
                continue;
            }

            match c {
                '\'' => {
                    ctx.is_in_sheet_name = true;
                    ctx.append(c);
                    ctx.advance(1);
                    continue;
                }
                '[' => {
                    ctx.bracket_depth = 1;
                    ctx.append(c);
                    ctx.advance(1);
                    continue;
                }
                '"' => {
                    self.finish_current(&mut ctx, &factory);
                    ctx.push(Token::new("\"", TokenKind::STRING));
                    ctx.is_in_string = true;
                    ctx.advance(1);
                    continue;
                }
                '#' if !ctx.has_current() || ctx.current.ends_with('!') => {
                    if let Some(literal) = ctx.error_literal_at_cursor() {
                        let len = literal.chars().count();
                        for i in 0..len {
                            let ch = ctx.chars[ctx.position + i];
                            ctx.append(ch);
                        }
                        ctx.advance(len);
                        continue;
                    }
                }
                c if c.is_whitespace() => {
                    self.finish_current(&mut ctx, &factory);
                    ctx.advance(1);
                    continue;
                }
                '+' | '-' if regex_is_match!(r"^([0-9]+\.?[0-9]*|\.[0-9]+)[eE]$", &ctx.current) => {
                    ctx.append(c);
                    ctx.advance(1);
                    continue;
                }
                _ => {}
            }

            if let Some((separator, kind)) = separators::longest_match(&ctx.chars, ctx.position) {
                self.finish_current(&mut ctx, &factory);
                Self::push_separator(&mut ctx, separator, kind);
                ctx.advance(separator.chars().count());
                continue;
            }

            ctx.append(c);
            ctx.advance(1);
        }

        self.finish_current(&mut ctx, &factory);
        let tokens = post_process::merge_enumerable_negators(ctx.result);
        tracing::trace!(formula = text, tokens = tokens.len(), "tokenized formula");
        tokens
    }

    /// Classify and emit whatever has been accumulated
    fn finish_current<N>(&self, ctx: &mut TokenizerContext, factory: &TokenFactory<'_, N>)
    where
        N: NameValueProvider + ?Sized,
    {
        if !ctx.has_current() {
            return;
        }
        let text = ctx.take_current();
        let token = if ctx.is_in_string {
            Token::new(text, TokenKind::STRING_CONTENT)
        } else {
            factory.create(&text)
        };
        ctx.push(token);
    }

    fn push_separator(ctx: &mut TokenizerContext, separator: &str, kind: TokenKind) {
        let unary_position = ctx
            .last()
            .map_or(true, |last| last.is(TokenKind::NEGATION_CONTEXT));

        match separator {
            "-" if unary_position => {
                ctx.push(Token::new(separator, TokenKind::NEGATOR));
            }
            "+" if unary_position => {}
            "(" => {
                if let Some(last) = ctx.last() {
                    if last.is(TokenKind::CALLABLE) && !last.is(TokenKind::FUNCTION) {
                        let function = last.reclassified(TokenKind::FUNCTION);
                        ctx.replace_last(function);
                    }
                }
                ctx.push(Token::new(separator, kind));
            }
            _ => ctx.push(Token::new(separator, kind)),
        }
    }
}
