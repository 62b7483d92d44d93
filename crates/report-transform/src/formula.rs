//! Arithmetic formulas for `calculate` steps.
//!
//! Grammar:
//!
//! ```text
//! expr    := term (("+" | "-") term)*
//! term    := unary (("*" | "/") unary)*
//! unary   := "-" unary | primary
//! primary := number | identifier | "[" any text "]" | "(" expr ")"
//! ```
//!
//! Identifiers may contain letters, digits, `_`, `:` and `.`, so analytics
//! names such as `ym:s:visits` can be written bare. Any other column name goes
//! in square brackets.
//!
//! Formulas are capped in length and parenthesis depth; anything larger is
//! reported as [`TransformError::InvalidFormula`].

use std::fmt;

use chumsky::input::{Input, ValueInput};
use chumsky::prelude::*;

use crate::error::{Result, TransformError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Column(String),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    fn binary(op: BinaryOp, lhs: Self, rhs: Self) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}

/// A parsed formula.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    expr: Expr,
}

impl Formula {
    pub fn parse(text: &str) -> Result<Self> {
        let tokens = lexer().parse(text).into_result().map_err(|errs| {
            let first = errs.into_iter().next();
            invalid(
                text,
                first.as_ref().map_or(0, |err| err.span().start),
                first.map_or_else(|| "unreadable formula".to_string(), |err| err.to_string()),
            )
        })?;
        check_limits(text, &tokens)?;

        let eoi: SimpleSpan = (text.len()..text.len()).into();
        let stream = tokens
            .as_slice()
            .map(eoi, |(token, span): &(Token<'_>, SimpleSpan)| (token, span));
        let expr = parser().parse(stream).into_result().map_err(|errs| {
            let first = errs.into_iter().next();
            invalid(
                text,
                first.as_ref().map_or(text.len(), |err| err.span().start),
                first.map_or_else(|| "unreadable formula".to_string(), |err| err.to_string()),
            )
        })?;
        Ok(Self { expr })
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Referenced column names, first occurrence order.
    pub fn columns(&self) -> Vec<&str> {
        let mut names = Vec::new();
        collect_columns(&self.expr, &mut names);
        names
    }

    /// Evaluate with `lookup` resolving column values.
    ///
    /// A missing operand or a non-finite result (division by zero included)
    /// yields `None`.
    pub fn eval(&self, lookup: &impl Fn(&str) -> Option<f64>) -> Option<f64> {
        eval(&self.expr, lookup).filter(|value| value.is_finite())
    }
}

fn collect_columns<'a>(expr: &'a Expr, names: &mut Vec<&'a str>) {
    match expr {
        Expr::Number(_) => {}
        Expr::Column(name) => {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        Expr::Neg(inner) => collect_columns(inner, names),
        Expr::Binary { lhs, rhs, .. } => {
            collect_columns(lhs, names);
            collect_columns(rhs, names);
        }
    }
}

fn eval(expr: &Expr, lookup: &impl Fn(&str) -> Option<f64>) -> Option<f64> {
    match expr {
        Expr::Number(value) => Some(*value),
        Expr::Column(name) => lookup(name),
        Expr::Neg(inner) => eval(inner, lookup).map(|value| -value),
        Expr::Binary { op, lhs, rhs } => {
            let lhs = eval(lhs, lookup)?;
            let rhs = eval(rhs, lookup)?;
            match op {
                BinaryOp::Add => Some(lhs + rhs),
                BinaryOp::Sub => Some(lhs - rhs),
                BinaryOp::Mul => Some(lhs * rhs),
                BinaryOp::Div if rhs == 0.0 => None,
                BinaryOp::Div => Some(lhs / rhs),
            }
        }
    }
}

/// Longest formula accepted, in tokens.
const MAX_TOKENS: usize = 256;
/// Deepest parenthesis nesting accepted.
const MAX_NESTING: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token<'src> {
    Number(f64),
    Ident(&'src str),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Ident(name) => f.write_str(name),
            Self::Plus => f.write_str("+"),
            Self::Minus => f.write_str("-"),
            Self::Star => f.write_str("*"),
            Self::Slash => f.write_str("/"),
            Self::LParen => f.write_str("("),
            Self::RParen => f.write_str(")"),
        }
    }
}

fn lexer<'src>()
-> impl Parser<'src, &'src str, Vec<(Token<'src>, SimpleSpan)>, extra::Err<Rich<'src, char>>> {
    let number = text::digits(10)
        .then(just('.').then(text::digits(10)).or_not())
        .to_slice()
        .try_map(|literal: &str, span| {
            literal
                .parse()
                .map(Token::Number)
                .map_err(|_| Rich::custom(span, "malformed number"))
        });

    let ident = any()
        .filter(|c: &char| c.is_alphabetic() || *c == '_')
        .then(
            any()
                .filter(|c: &char| c.is_alphanumeric() || matches!(c, '_' | ':' | '.'))
                .repeated(),
        )
        .to_slice()
        .map(Token::Ident);

    // `[any text]` names a column that is not a bare identifier.
    let quoted = none_of(']')
        .repeated()
        .to_slice()
        .delimited_by(just('['), just(']'))
        .try_map(|name: &str, span| match name.trim() {
            "" => Err(Rich::custom(span, "empty column reference")),
            name => Ok(Token::Ident(name)),
        });

    let symbol = choice((
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('*').to(Token::Star),
        just('/').to(Token::Slash),
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
    ));

    choice((number, ident, quoted, symbol))
        .map_with(|token, e| (token, e.span()))
        .padded()
        .repeated()
        .collect()
        .padded()
        .then_ignore(end())
}

fn parser<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, Expr, extra::Err<Rich<'tokens, Token<'src>, SimpleSpan>>>
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SimpleSpan>,
{
    recursive(|expr| {
        let atom = select! {
            Token::Number(value) => Expr::Number(value),
            Token::Ident(name) => Expr::Column(name.to_string()),
        }
        .or(expr.delimited_by(just(Token::LParen), just(Token::RParen)));

        let unary = just(Token::Minus)
            .repeated()
            .foldr(atom, |_, operand| Expr::Neg(Box::new(operand)));

        let product = unary.clone().foldl(
            choice((
                just(Token::Star).to(BinaryOp::Mul),
                just(Token::Slash).to(BinaryOp::Div),
            ))
            .then(unary)
            .repeated(),
            |lhs, (op, rhs)| Expr::binary(op, lhs, rhs),
        );

        product.clone().foldl(
            choice((
                just(Token::Plus).to(BinaryOp::Add),
                just(Token::Minus).to(BinaryOp::Sub),
            ))
            .then(product)
            .repeated(),
            |lhs, (op, rhs)| Expr::binary(op, lhs, rhs),
        )
    })
    .then_ignore(end())
}

/// Reject formulas whose size or nesting would make the expression tree
/// deeper than evaluation can safely recurse.
fn check_limits(text: &str, tokens: &[(Token<'_>, SimpleSpan)]) -> Result<()> {
    if let Some((_, span)) = tokens.get(MAX_TOKENS) {
        return Err(invalid(
            text,
            span.start,
            format!("formula is longer than {MAX_TOKENS} tokens"),
        ));
    }
    let mut depth = 0usize;
    for (token, span) in tokens {
        match token {
            Token::LParen => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(invalid(
                        text,
                        span.start,
                        format!("parentheses nest deeper than {MAX_NESTING} levels"),
                    ));
                }
            }
            Token::RParen => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

fn invalid(text: &str, offset: usize, message: impl Into<String>) -> TransformError {
    TransformError::InvalidFormula {
        formula: text.to_string(),
        offset,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_with(formula: &str, values: &[(&str, f64)]) -> Option<f64> {
        let formula = Formula::parse(formula).unwrap();
        formula.eval(&|name: &str| {
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
        })
    }

    #[test]
    fn precedence_and_parentheses() {
        assert_eq!(eval_with("1 + 2 * 3", &[]), Some(7.0));
        assert_eq!(eval_with("(1 + 2) * 3", &[]), Some(9.0));
        assert_eq!(eval_with("10 - 4 - 3", &[]), Some(3.0));
        assert_eq!(eval_with("-2 * -3", &[]), Some(6.0));
    }

    #[test]
    fn columns_resolve_bare_and_bracketed() {
        let values = [("Cost", 50.0), ("Clicks", 20.0), ("ym:s:visits", 4.0)];
        assert_eq!(eval_with("Cost / Clicks", &values), Some(2.5));
        assert_eq!(eval_with("[Cost] / ym:s:visits", &values), Some(12.5));
    }

    #[test]
    fn null_operands_and_division_by_zero_yield_none() {
        assert_eq!(eval_with("Cost / Clicks", &[("Cost", 1.0)]), None);
        assert_eq!(eval_with("Cost / Clicks", &[("Cost", 1.0), ("Clicks", 0.0)]), None);
    }

    #[test]
    fn columns_are_listed_once() {
        let formula = Formula::parse("a * b + a / [c d]").unwrap();
        assert_eq!(formula.columns(), vec!["a", "b", "c d"]);
    }

    #[test]
    fn malformed_formulas_report_offsets() {
        for (text, offset) in [("(1 + 2", 6), ("1 2", 2), ("a $ b", 2)] {
            match Formula::parse(text) {
                Err(TransformError::InvalidFormula { offset: found, .. }) => {
                    assert_eq!(found, offset, "formula {text:?}");
                }
                other => panic!("expected invalid formula for {text:?}, got {other:?}"),
            }
        }
        for text in ["1 +", "[open", "[ ]", "", "* 2"] {
            assert!(
                matches!(Formula::parse(text), Err(TransformError::InvalidFormula { .. })),
                "formula {text:?}"
            );
        }
    }

    #[test]
    fn repeated_negation() {
        assert_eq!(eval_with("--3", &[]), Some(3.0));
        assert_eq!(eval_with("1 - -x", &[("x", 2.0)]), Some(3.0));
    }

    #[test]
    fn oversized_formulas_are_rejected_not_overflowed() {
        let negations = format!("{}1", "-".repeat(200_000));
        let parens = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        let sums = vec!["1"; 100_000].join(" + ");
        for text in [negations, parens, sums] {
            assert!(matches!(
                Formula::parse(&text),
                Err(TransformError::InvalidFormula { .. })
            ));
        }

        let nested = format!("{}x{}", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        match Formula::parse(&nested) {
            Err(TransformError::InvalidFormula { offset, .. }) => assert_eq!(offset, MAX_NESTING),
            other => panic!("expected nesting error, got {other:?}"),
        }
        let deepest = format!("{}x{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert_eq!(Formula::parse(&deepest).unwrap().columns(), vec!["x"]);
    }
}
