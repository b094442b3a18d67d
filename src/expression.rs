//! The inline expression language.
//!
//! An expression is plain arithmetic (`+ - * / **`, unary signs, parentheses) over
//! numeric literals and names bound by earlier chunks of the same document. A
//! statement may start with `name =`, which binds the result in the [`Environment`].
//! Nothing else can be expressed: there are no calls, no strings and no side effects
//! beyond that single binding. Grammar details live in `expression.pest`.

use std::collections::HashMap;

use pest::error::LineColLocation;
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;
use tracing::debug;

use crate::error::{PierreError, Result};

#[derive(Parser)]
#[grammar = "expression.pest"]
struct ExpressionParser;

// ------------- Environment -------------
/// Run-scoped name to value bindings.
#[derive(Debug, Default, Clone)]
pub struct Environment {
    bindings: HashMap<String, f64>,
}
impl Environment {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn get(&self, name: &str) -> Option<f64> {
        self.bindings.get(name).copied()
    }
    /// Binds or rebinds `name`.
    pub fn bind(&mut self, name: impl Into<String>, value: f64) {
        self.bindings.insert(name.into(), value);
    }
    pub fn len(&self) -> usize {
        self.bindings.len()
    }
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

// ------------- Outcome -------------
/// What evaluating one statement produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Name bound by an assignment, if the statement was one.
    pub target: Option<String>,
    /// Value of the right-hand side.
    pub value: f64,
    /// True when the right-hand side is nothing but a number literal.
    pub literal: bool,
}

/// Evaluates a statement, binding its target (if any) in `environment`.
pub fn evaluate(source: &str, environment: &mut Environment) -> Result<Outcome> {
    let statement = parse(Rule::statement, source)?;
    let mut target = None;
    let mut expression = None;
    for pair in statement.into_inner() {
        match pair.as_rule() {
            Rule::assignment => {
                let mut inner = pair.into_inner();
                target = Some(next(&mut inner)?.as_str().to_string());
                expression = Some(next(&mut inner)?);
            }
            Rule::expression => expression = Some(pair),
            _ => (),
        }
    }
    let expression = expression
        .ok_or_else(|| PierreError::Invariant(format!("no expression in '{source}'")))?;
    let literal = is_literal(expression.as_str());
    let value = Evaluator { environment, source }.expression(expression)?;
    if let Some(name) = &target {
        debug!(name = %name, value, "binding");
        environment.bind(name.clone(), value);
    }
    Ok(Outcome { target, value, literal })
}

/// Evaluates an expression that may not contain an assignment.
pub fn evaluate_expression(source: &str, environment: &Environment) -> Result<f64> {
    let standalone = parse(Rule::standalone, source)?;
    let expression = standalone
        .into_inner()
        .find(|p| p.as_rule() == Rule::expression)
        .ok_or_else(|| PierreError::Invariant(format!("no expression in '{source}'")))?;
    Evaluator { environment, source }.expression(expression)
}

/// True if `source` is an optionally signed number and nothing else.
pub fn is_literal(source: &str) -> bool {
    ExpressionParser::parse(Rule::literal, source).is_ok()
}

/// Rounds to `precision` decimal places.
pub fn round(value: f64, precision: usize) -> f64 {
    format!("{value:.precision$}").parse().unwrap_or(value)
}

fn parse(rule: Rule, source: &str) -> Result<Pair<'_, Rule>> {
    let mut pairs = ExpressionParser::parse(rule, source).map_err(|e| {
        let col = match e.line_col {
            LineColLocation::Pos((_, c)) | LineColLocation::Span((_, c), _) => c,
        };
        PierreError::Parse {
            message: format!("cannot evaluate '{}': {}", source.trim(), e.variant.message()),
            line: None,
            col: Some(col),
        }
    })?;
    next(&mut pairs)
}

fn next<'i>(pairs: &mut Pairs<'i, Rule>) -> Result<Pair<'i, Rule>> {
    pairs
        .next()
        .ok_or_else(|| PierreError::Invariant("truncated expression parse tree".into()))
}

struct Evaluator<'e> {
    environment: &'e Environment,
    source: &'e str,
}
impl<'e> Evaluator<'e> {
    fn expression(&self, pair: Pair<Rule>) -> Result<f64> {
        let mut inner = pair.into_inner();
        let mut value = self.term(next(&mut inner)?)?;
        while let Some(op) = inner.next() {
            let rhs = self.term(next(&mut inner)?)?;
            value = match op.as_str() {
                "+" => value + rhs,
                _ => value - rhs,
            };
        }
        self.finite(value)
    }
    fn term(&self, pair: Pair<Rule>) -> Result<f64> {
        let mut inner = pair.into_inner();
        let mut value = self.unary(next(&mut inner)?)?;
        while let Some(op) = inner.next() {
            let rhs = self.unary(next(&mut inner)?)?;
            value = match op.as_str() {
                "*" => value * rhs,
                _ if rhs == 0.0 => return Err(PierreError::DivisionByZero(self.source.trim().into())),
                _ => value / rhs,
            };
        }
        self.finite(value)
    }
    fn unary(&self, pair: Pair<Rule>) -> Result<f64> {
        let mut negate = false;
        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::sign => negate ^= p.as_str() == "-",
                Rule::power => {
                    let value = self.power(p)?;
                    return Ok(if negate { -value } else { value });
                }
                _ => (),
            }
        }
        Err(PierreError::Invariant("unary without operand".into()))
    }
    fn power(&self, pair: Pair<Rule>) -> Result<f64> {
        let mut inner = pair.into_inner();
        let base = self.primary(next(&mut inner)?)?;
        match inner.next() {
            Some(exponent) => self.finite(base.powf(self.unary(exponent)?)),
            None => Ok(base),
        }
    }
    fn primary(&self, pair: Pair<Rule>) -> Result<f64> {
        match pair.as_rule() {
            Rule::number => pair.as_str().parse::<f64>().map_err(|e| {
                PierreError::parse(format!("bad number '{}': {e}", pair.as_str()))
            }),
            Rule::identifier => self
                .environment
                .get(pair.as_str())
                .ok_or_else(|| PierreError::UnknownName(pair.as_str().to_string())),
            Rule::expression => self.expression(pair),
            other => Err(PierreError::Invariant(format!("unexpected {other:?} in expression"))),
        }
    }
    fn finite(&self, value: f64) -> Result<f64> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(PierreError::NonFinite(self.source.trim().into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str) -> Result<f64> {
        evaluate_expression(source, &Environment::new())
    }

    #[test]
    fn precedence_and_grouping() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), 7.0);
        assert_eq!(eval("(1 + 2) * 3").unwrap(), 9.0);
        assert_eq!(eval("10 - 4 - 3").unwrap(), 3.0);
        assert_eq!(eval("12 / 4 / 3").unwrap(), 1.0);
        assert_eq!(eval("2 ** 3 ** 2").unwrap(), 512.0);
        assert_eq!(eval("-2 ** 2").unwrap(), -4.0);
        assert_eq!(eval("2 ** -1").unwrap(), 0.5);
        assert_eq!(eval("- -3").unwrap(), 3.0);
        assert_eq!(eval(".5 + 1.").unwrap(), 1.5);
        assert_eq!(eval("1e3").unwrap(), 1000.0);
    }

    #[test]
    fn assignment_binds_the_right_hand_side() {
        let mut env = Environment::new();
        let outcome = evaluate("x = 2+2", &mut env).unwrap();
        assert_eq!(outcome, Outcome { target: Some("x".into()), value: 4.0, literal: false });
        assert_eq!(env.get("x"), Some(4.0));
        let outcome = evaluate("x * 0.5", &mut env).unwrap();
        assert_eq!(outcome.value, 2.0);
        assert_eq!(outcome.target, None);
    }

    #[test]
    fn literal_detection() {
        assert!(is_literal("4"));
        assert!(is_literal(" 0.25 "));
        assert!(is_literal("-3"));
        assert!(!is_literal("2+2"));
        assert!(!is_literal("x"));
        assert!(!is_literal("(4)"));
        let mut env = Environment::new();
        assert!(evaluate("y = 5", &mut env).unwrap().literal);
    }

    #[test]
    fn failures() {
        assert!(matches!(eval("nope + 1"), Err(PierreError::UnknownName(n)) if n == "nope"));
        assert!(matches!(eval("1 / (2 - 2)"), Err(PierreError::DivisionByZero(_))));
        assert!(matches!(eval("1 +"), Err(PierreError::Parse { col: Some(_), .. })));
        assert!(matches!(eval("0 ** -1"), Err(PierreError::NonFinite(_))));
        assert!(matches!(eval("a = 1"), Err(PierreError::Parse { .. })));
        assert!(matches!(evaluate("1 = 2", &mut Environment::new()), Err(PierreError::Parse { .. })));
    }

    #[test]
    fn rounding() {
        assert_eq!(round(0.18 / 0.42, 6), 0.428571);
        assert_eq!(round(2.0, 6), 2.0);
    }
}
