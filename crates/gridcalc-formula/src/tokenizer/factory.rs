//! Classification of accumulated token text

use crate::functions::FunctionRepository;
use crate::provider::NameValueProvider;
use crate::token::{Token, TokenKind};
use gridcalc_core::{CellError, RangeAddressFactory, TableReference};
use lazy_regex::regex_is_match;

/// Decides what a run of non-separator characters is
pub(crate) struct TokenFactory<'a, N: ?Sized> {
    repository: &'a FunctionRepository,
    names: &'a N,
    worksheet: Option<&'a str>,
    addresses: RangeAddressFactory,
}

impl<'a, N: NameValueProvider + ?Sized> TokenFactory<'a, N> {
    pub(crate) fn new(
        repository: &'a FunctionRepository,
        names: &'a N,
        worksheet: Option<&'a str>,
    ) -> Self {
        Self {
            repository,
            names,
            worksheet,
            addresses: RangeAddressFactory::default(),
        }
    }

    pub(crate) fn create(&self, text: &str) -> Token {
        Token::new(text, self.classify(text))
    }

    fn classify(&self, text: &str) -> TokenKind {
        if text.eq_ignore_ascii_case("TRUE") || text.eq_ignore_ascii_case("FALSE") {
            return TokenKind::BOOLEAN;
        }
        if text.to_ascii_uppercase().contains("#REF!") {
            return TokenKind::INVALID_REFERENCE;
        }
        if CellError::parse(text).is_some() {
            return TokenKind::EXCEL_ERROR;
        }
        if regex_is_match!(r"^[0-9]+$", text) {
            return TokenKind::INTEGER;
        }
        if regex_is_match!(r"^([0-9]+\.?[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?$", text) {
            return TokenKind::DECIMAL;
        }
        if TableReference::parse(text).is_some() || self.addresses.is_valid_address(text) {
            return TokenKind::EXCEL_ADDRESS;
        }
        if regex_is_match!(r"^[A-Za-z_\\][A-Za-z0-9_.]*$", text) {
            if self.names.is_named_value(text, self.worksheet) {
                return TokenKind::NAME_VALUE;
            }
            if self.repository.contains(text) {
                return TokenKind::FUNCTION;
            }
            return TokenKind::NAME_VALUE;
        }
        TokenKind::UNRECOGNIZED
    }
}
