//! Recursive descent over the token stream
//!
//! Precedence, loosest first: comparison, `&`, `+ -`, `* /`, unary `-`, `^`,
//! postfix `%`. So `-2^2` is `-(2^2)` and `2^-2` is `2^(-2)`.

use super::{Expression, ExpressionGraph, Literal, Operator};
use crate::error::{FormulaError, FormulaResult};
use crate::token::{Token, TokenKind};
use gridcalc_core::CellError;

/// Builds an [`ExpressionGraph`] from analyzed tokens
pub struct GraphBuilder<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> GraphBuilder<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn build(mut self) -> FormulaResult<ExpressionGraph> {
        if self.tokens.is_empty() {
            return Err(FormulaError::Format("empty formula".into()));
        }

        let mut expressions = vec![self.parse_expression()?];
        while self.consume_if(TokenKind::COMMA | TokenKind::SEMICOLON) {
            expressions.push(self.parse_expression()?);
        }

        if let Some(token) = self.current() {
            return Err(FormulaError::Format(format!(
                "unexpected '{}' after expression",
                token
            )));
        }
        Ok(ExpressionGraph::new(expressions))
    }

    // === Token cursor ===

    fn current(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn next_is(&self, kind: TokenKind) -> bool {
        self.current().is_some_and(|t| t.is(kind))
    }

    fn consume(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn consume_if(&mut self, kind: TokenKind) -> bool {
        if self.next_is(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> FormulaResult<&'t Token> {
        match self.consume() {
            Some(token) if token.is(kind) => Ok(token),
            Some(token) => Err(FormulaError::Format(format!(
                "expected {} but found '{}'",
                what, token
            ))),
            None => Err(FormulaError::Format(format!(
                "expected {} at end of formula",
                what
            ))),
        }
    }

    /// The binary operator at the cursor, if it binds at `precedence`
    fn operator_at(&self, precedence: u8) -> Option<Operator> {
        self.current()
            .filter(|t| t.is(TokenKind::OPERATOR))
            .and_then(|t| Operator::from_symbol(t.text()))
            .filter(|op| op.precedence() == precedence)
    }

    // === Precedence levels ===

    fn parse_expression(&mut self) -> FormulaResult<Expression> {
        self.parse_binary_level(0)
    }

    /// Left-associative binary levels 0 through 3
    fn parse_binary_level(&mut self, precedence: u8) -> FormulaResult<Expression> {
        let mut left = self.parse_operand_of(precedence)?;

        while let Some(op) = self.operator_at(precedence) {
            self.pos += 1;
            let right = self.parse_operand_of(precedence)?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_operand_of(&mut self, precedence: u8) -> FormulaResult<Expression> {
        if precedence < Operator::Multiply.precedence() {
            self.parse_binary_level(precedence + 1)
        } else {
            self.parse_negation()
        }
    }

    fn parse_negation(&mut self) -> FormulaResult<Expression> {
        if self.consume_if(TokenKind::NEGATOR) {
            let operand = self.parse_negation()?;
            return Ok(Expression::Negation(Box::new(operand)));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> FormulaResult<Expression> {
        let mut left = self.parse_postfix()?;

        while let Some(op) = self.operator_at(Operator::Power.precedence()) {
            self.pos += 1;
            let right = self.parse_power_operand()?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_power_operand(&mut self) -> FormulaResult<Expression> {
        if self.consume_if(TokenKind::NEGATOR) {
            let operand = self.parse_power_operand()?;
            return Ok(Expression::Negation(Box::new(operand)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> FormulaResult<Expression> {
        let mut expr = self.parse_primary()?;
        while self.consume_if(TokenKind::PERCENT) {
            expr = Expression::Percent(Box::new(expr));
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> FormulaResult<Expression> {
        let Some(token) = self.consume() else {
            return Err(FormulaError::Format("unexpected end of formula".into()));
        };
        let kind = token.kind();

        if kind.intersects(TokenKind::NUMERIC) {
            return Ok(Expression::Literal(number_literal(token)?));
        }
        if kind.contains(TokenKind::STRING) {
            return Ok(Expression::Literal(self.string_literal()?));
        }
        if kind.contains(TokenKind::BOOLEAN) {
            return Ok(Expression::Literal(Literal::Boolean(
                token.text().eq_ignore_ascii_case("TRUE"),
            )));
        }
        if kind.contains(TokenKind::EXCEL_ERROR) {
            return Ok(Expression::Literal(error_literal(token)?));
        }
        if kind.contains(TokenKind::INVALID_REFERENCE) {
            return Ok(Expression::Literal(Literal::Error(CellError::Ref)));
        }
        if kind.contains(TokenKind::EXCEL_ADDRESS) {
            return Ok(Expression::Address(token.text().to_string()));
        }
        if kind.contains(TokenKind::NAME_VALUE) {
            return Ok(Expression::Name(token.text().to_string()));
        }
        if kind.contains(TokenKind::FUNCTION) {
            if self.next_is(TokenKind::OPENING_PARENTHESIS) {
                return self.parse_function_call(token.text());
            }
            return Ok(Expression::Name(token.text().to_string()));
        }
        if kind.contains(TokenKind::OPENING_PARENTHESIS) {
            let inner = self.parse_expression()?;
            self.expect(TokenKind::CLOSING_PARENTHESIS, "')'")?;
            return Ok(Expression::Group(Box::new(inner)));
        }
        if kind.contains(TokenKind::OPENING_ENUMERABLE) {
            return self.parse_enumerable();
        }

        Err(FormulaError::Format(format!("unexpected '{}'", token)))
    }

    /// Called with the opening `"` consumed
    fn string_literal(&mut self) -> FormulaResult<Literal> {
        let content = self.expect(TokenKind::STRING_CONTENT, "string content")?;
        self.expect(TokenKind::STRING, "closing quote")?;
        Ok(Literal::String(content.text().to_string()))
    }

    fn parse_function_call(&mut self, name: &str) -> FormulaResult<Expression> {
        self.expect(TokenKind::OPENING_PARENTHESIS, "'('")?;
        let mut args = Vec::new();

        if self.consume_if(TokenKind::CLOSING_PARENTHESIS) {
            return Ok(Expression::Function {
                name: name.to_string(),
                args,
            });
        }

        loop {
            let separators = TokenKind::COMMA | TokenKind::SEMICOLON | TokenKind::CLOSING_PARENTHESIS;
            if self.next_is(separators) {
                args.push(Expression::Literal(Literal::Empty));
            } else {
                args.push(self.parse_expression()?);
            }

            if self.consume_if(TokenKind::COMMA | TokenKind::SEMICOLON) {
                continue;
            }
            self.expect(TokenKind::CLOSING_PARENTHESIS, "',' or ')'")?;
            break;
        }

        Ok(Expression::Function {
            name: name.to_string(),
            args,
        })
    }

    /// Called with the `{` consumed
    fn parse_enumerable(&mut self) -> FormulaResult<Expression> {
        let mut rows: Vec<Vec<Literal>> = vec![Vec::new()];

        loop {
            let item = self.enumerable_item()?;
            if let Some(row) = rows.last_mut() {
                row.push(item);
            }

            let Some(separator) = self.consume() else {
                return Err(FormulaError::Format("unterminated array constant".into()));
            };
            if separator.is(TokenKind::COMMA) {
                continue;
            }
            if separator.is(TokenKind::SEMICOLON) {
                rows.push(Vec::new());
                continue;
            }
            if separator.is(TokenKind::CLOSING_ENUMERABLE) {
                break;
            }
            return Err(FormulaError::Format(format!(
                "unexpected '{}' in array constant",
                separator
            )));
        }

        let width = rows[0].len();
        if rows.iter().any(|row| row.len() != width) {
            return Err(FormulaError::Format(
                "array constant rows must have the same length".into(),
            ));
        }
        Ok(Expression::Literal(Literal::Enumerable(rows)))
    }

    fn enumerable_item(&mut self) -> FormulaResult<Literal> {
        let Some(token) = self.consume() else {
            return Err(FormulaError::Format("unterminated array constant".into()));
        };
        let kind = token.kind();
        if kind.intersects(TokenKind::NUMERIC) {
            number_literal(token)
        } else if kind.contains(TokenKind::STRING) {
            self.string_literal()
        } else if kind.contains(TokenKind::BOOLEAN) {
            Ok(Literal::Boolean(token.text().eq_ignore_ascii_case("TRUE")))
        } else if kind.contains(TokenKind::EXCEL_ERROR) {
            error_literal(token)
        } else {
            Err(FormulaError::Format(format!(
                "array constants may only contain literals, found '{}'",
                token
            )))
        }
    }
}

fn number_literal(token: &Token) -> FormulaResult<Literal> {
    let value: f64 = token
        .text()
        .parse()
        .map_err(|_| FormulaError::Format(format!("invalid number '{}'", token)))?;
    if token.is(TokenKind::INTEGER) {
        Ok(Literal::Integer(value))
    } else {
        Ok(Literal::Decimal(value))
    }
}

fn error_literal(token: &Token) -> FormulaResult<Literal> {
    CellError::parse(token.text())
        .map(Literal::Error)
        .ok_or_else(|| FormulaError::Format(format!("invalid error literal '{}'", token)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::FunctionRepository;
    use crate::provider::EmptyNameValueProvider;
    use crate::tokenizer::Tokenizer;
    use pretty_assertions::assert_eq;

    fn build(formula: &str) -> FormulaResult<ExpressionGraph> {
        let repository = FunctionRepository::new();
        let tokens = Tokenizer::new(&repository).tokenize(formula, &EmptyNameValueProvider, None);
        GraphBuilder::new(&tokens).build()
    }

    fn single(formula: &str) -> Expression {
        let graph = build(formula).unwrap();
        assert_eq!(graph.len(), 1);
        graph.expressions()[0].clone()
    }

    fn int(n: f64) -> Box<Expression> {
        Box::new(Expression::Literal(Literal::Integer(n)))
    }

    fn binary(op: Operator, left: Box<Expression>, right: Box<Expression>) -> Box<Expression> {
        Box::new(Expression::Binary { op, left, right })
    }

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        assert_eq!(
            single("1+2*3"),
            *binary(Operator::Add, int(1.0), binary(Operator::Multiply, int(2.0), int(3.0)))
        );
    }

    #[test]
    fn test_negation_is_looser_than_power() {
        assert_eq!(
            single("-2^2"),
            Expression::Negation(binary(Operator::Power, int(2.0), int(2.0)))
        );
        assert_eq!(
            single("2^-2"),
            *binary(Operator::Power, int(2.0), Box::new(Expression::Negation(int(2.0))))
        );
    }

    #[test]
    fn test_power_is_left_associative() {
        assert_eq!(
            single("2^3^2"),
            *binary(Operator::Power, binary(Operator::Power, int(2.0), int(3.0)), int(2.0))
        );
    }

    #[test]
    fn test_comparison_is_loosest() {
        let expr = single("A1&\"x\"=B1");
        let Expression::Binary { op, left, .. } = expr else {
            panic!("expected binary expression");
        };
        assert_eq!(op, Operator::Equal);
        assert!(matches!(*left, Expression::Binary { op: Operator::Concat, .. }));
    }

    #[test]
    fn test_percent_binds_tightest() {
        assert_eq!(
            single("-50%"),
            Expression::Negation(Box::new(Expression::Percent(int(50.0))))
        );
    }

    #[test]
    fn test_function_with_empty_arguments() {
        assert_eq!(
            single("IF(A1,,2)"),
            Expression::Function {
                name: "IF".into(),
                args: vec![
                    Expression::Address("A1".into()),
                    Expression::Literal(Literal::Empty),
                    Expression::Literal(Literal::Integer(2.0)),
                ],
            }
        );
        assert_eq!(
            single("NOW()"),
            Expression::Function {
                name: "NOW".into(),
                args: vec![]
            }
        );
    }

    #[test]
    fn test_groups_and_names() {
        assert_eq!(
            single("(TaxRate)"),
            Expression::Group(Box::new(Expression::Name("TaxRate".into())))
        );
    }

    #[test]
    fn test_enumerable() {
        assert_eq!(
            single("{1,-2.5;\"a\",TRUE}"),
            Expression::Literal(Literal::Enumerable(vec![
                vec![Literal::Integer(1.0), Literal::Decimal(-2.5)],
                vec![Literal::String("a".into()), Literal::Boolean(true)],
            ]))
        );
    }

    #[test]
    fn test_ragged_or_non_literal_enumerable_is_rejected() {
        assert!(matches!(build("{1,2;3}"), Err(FormulaError::Format(_))));
        assert!(matches!(build("{A1,2}"), Err(FormulaError::Format(_))));
    }

    #[test]
    fn test_multiple_top_level_expressions() {
        let graph = build("1,2").unwrap();
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_dangling_operator_is_a_format_error() {
        assert!(matches!(build("1+"), Err(FormulaError::Format(_))));
        assert!(matches!(build("SUM(1 2)"), Err(FormulaError::Format(_))));
    }
}
