//! Expression graph
//!
//! A formula's tokens become a tree of [`Expression`] nodes. Each top-level,
//! comma-separated expression is one entry in the [`ExpressionGraph`].

mod builder;

pub use builder::GraphBuilder;

use gridcalc_core::CellError;

/// Formula expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    /// Cell, range, whole-row/column or table reference, as written
    Address(String),
    /// Defined name
    Name(String),
    Function {
        name: String,
        args: Vec<Expression>,
    },
    Binary {
        op: Operator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// Parenthesized sub-expression
    Group(Box<Expression>),
    /// Unary minus
    Negation(Box<Expression>),
    /// Postfix `%`
    Percent(Box<Expression>),
}

/// Literal values as they appear in formula text
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(f64),
    Decimal(f64),
    String(String),
    Boolean(bool),
    Error(CellError),
    /// An omitted function argument
    Empty,
    /// Inline array constant, rows of columns
    Enumerable(Vec<Vec<Literal>>),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,

    // Text
    Concat,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl Operator {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "+" => Operator::Add,
            "-" => Operator::Subtract,
            "*" => Operator::Multiply,
            "/" => Operator::Divide,
            "^" => Operator::Power,
            "&" => Operator::Concat,
            "=" => Operator::Equal,
            "<>" => Operator::NotEqual,
            "<" => Operator::LessThan,
            "<=" => Operator::LessEqual,
            ">" => Operator::GreaterThan,
            ">=" => Operator::GreaterEqual,
            _ => return None,
        })
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Power => "^",
            Operator::Concat => "&",
            Operator::Equal => "=",
            Operator::NotEqual => "<>",
            Operator::LessThan => "<",
            Operator::LessEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterEqual => ">=",
        }
    }

    /// Binding strength; higher binds tighter.
    ///
    /// Unary negation sits between multiplication (3) and power (5).
    pub fn precedence(&self) -> u8 {
        match self {
            Operator::Equal
            | Operator::NotEqual
            | Operator::LessThan
            | Operator::LessEqual
            | Operator::GreaterThan
            | Operator::GreaterEqual => 0,
            Operator::Concat => 1,
            Operator::Add | Operator::Subtract => 2,
            Operator::Multiply | Operator::Divide => 3,
            Operator::Power => 5,
        }
    }

    pub fn is_comparison(&self) -> bool {
        self.precedence() == 0
    }
}

impl Expression {
    /// Visit this node and all of its descendants, parents first
    pub fn walk<'e>(&'e self, visit: &mut impl FnMut(&'e Expression)) {
        visit(self);
        match self {
            Expression::Function { args, .. } => args.iter().for_each(|a| a.walk(visit)),
            Expression::Binary { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Expression::Group(inner) | Expression::Negation(inner) | Expression::Percent(inner) => {
                inner.walk(visit)
            }
            Expression::Literal(_) | Expression::Address(_) | Expression::Name(_) => {}
        }
    }
}

/// The top-level expressions of one formula
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExpressionGraph {
    expressions: Vec<Expression>,
}

impl ExpressionGraph {
    pub fn new(expressions: Vec<Expression>) -> Self {
        Self { expressions }
    }

    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    /// Names of every function called anywhere in the graph, in visit order
    pub fn function_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for expression in &self.expressions {
            expression.walk(&mut |node| {
                if let Expression::Function { name, .. } = node {
                    names.push(name.as_str());
                }
            });
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_symbols_round_trip() {
        for symbol in ["+", "-", "*", "/", "^", "&", "=", "<>", "<", "<=", ">", ">="] {
            let op = Operator::from_symbol(symbol).unwrap();
            assert_eq!(op.symbol(), symbol);
        }
        assert_eq!(Operator::from_symbol("%"), None);
    }

    #[test]
    fn test_function_names_are_collected_from_nested_calls() {
        let graph = ExpressionGraph::new(vec![Expression::Function {
            name: "IF".into(),
            args: vec![
                Expression::Function {
                    name: "NOW".into(),
                    args: vec![],
                },
                Expression::Literal(Literal::Integer(1.0)),
            ],
        }]);
        assert_eq!(graph.function_names(), vec!["IF", "NOW"]);
    }
}
