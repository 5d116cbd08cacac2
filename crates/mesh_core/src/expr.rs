//! Target expression evaluation
//!
//! Target expressions are small arithmetic formulas over source values:
//!
//! ```text
//! @bananas / (@others + 1)
//! ```
//!
//! Evaluation runs in three steps:
//!
//! 1. [`sanitize`] drops every character outside the arithmetic alphabet
//!    (ASCII letters, digits, `/ + - * ( ) . , @` and whitespace)
//! 2. [`substitute`] rewrites each `@name` that matches a source with the
//!    source's current value. The longest matching name wins and must not be
//!    followed by a letter or digit, so `@bananas2` is left alone when only
//!    `bananas` exists
//! 3. [`eval_arithmetic`] parses and evaluates what is left with a
//!    recursive-descent parser supporting `+ - * /`, unary signs and
//!    parentheses. Commas are ignored.
//!
//! Nothing here executes code: anything that is not arithmetic is an
//! [`EvalError`].
//!
//! # Example
//!
//! ```rust
//! use mesh_core::expr::evaluate;
//! use mesh_core::ValueStore;
//!
//! let values: ValueStore = [("bananas", 6.0), ("others", 2.0)].into_iter().collect();
//! assert_eq!(evaluate("@bananas / (@others + 1)", &values), Ok(2.0));
//! ```

use nom::{
    branch::alt,
    bytes::complete::take_while,
    character::complete::{alphanumeric1, char, one_of},
    combinator::{all_consuming, cut},
    error::{context, ErrorKind, ParseError as NomParseError, VerboseError, VerboseErrorKind},
    multi::{fold_many0, many0},
    sequence::{pair, preceded, terminated},
    Finish, IResult,
};

use crate::error::EvalError;
use crate::numeric::decimal_literal;
use crate::store::ValueStore;

/// Maximum parenthesis nesting accepted by the parser
pub const MAX_DEPTH: usize = 64;

/// Characters kept by [`sanitize`] besides ASCII letters, digits and whitespace
const ALLOWED_SYMBOLS: &str = "/+-*().,@";

type ParseResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

/// An evaluated operand: parsing succeeded, but arithmetic may have failed
type Value = Result<f64, EvalError>;

/// A target expression, sanitized once and evaluated on every update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    raw: String,
    sanitized: String,
}

impl Expression {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let sanitized = sanitize(&raw);
        Self { raw, sanitized }
    }

    /// The expression exactly as it appeared in markup
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The expression after stripping disallowed characters
    pub fn sanitized(&self) -> &str {
        &self.sanitized
    }

    /// Evaluate against the current source values
    pub fn evaluate(&self, values: &ValueStore) -> Result<f64, EvalError> {
        eval_arithmetic(&substitute(&self.sanitized, values))
    }
}

/// Sanitize, substitute and evaluate `raw` in one go
pub fn evaluate(raw: &str, values: &ValueStore) -> Result<f64, EvalError> {
    Expression::new(raw).evaluate(values)
}

/// Remove every character the arithmetic grammar has no use for
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|&c| c.is_ascii_alphanumeric() || c.is_whitespace() || ALLOWED_SYMBOLS.contains(c))
        .collect()
}

/// Replace each `@name` naming a known source with its value
///
/// At every `@` the longest known name (compared case-insensitively) that is
/// not followed by another letter or digit wins, so `@ab` never matches source
/// `a`. Names may contain any character the sanitizer keeps, such as
/// `@my-source`. Unknown references are kept verbatim so the evaluator can
/// report them.
pub fn substitute(expression: &str, values: &ValueStore) -> String {
    let mut out = String::with_capacity(expression.len());
    let mut rest = expression;

    while let Some(at) = rest.find('@') {
        out.push_str(&rest[..at]);
        let after = &rest[at + 1..];

        match longest_reference(after, values) {
            Some((len, value)) => {
                out.push_str(&value.to_string());
                rest = &after[len..];
            }
            None => {
                let len = after
                    .find(|c: char| !c.is_ascii_alphanumeric())
                    .unwrap_or(after.len());
                out.push('@');
                out.push_str(&after[..len]);
                rest = &after[len..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Length and value of the longest source name `text` starts with
fn longest_reference(text: &str, values: &ValueStore) -> Option<(usize, f64)> {
    values
        .iter()
        .filter(|(name, _)| !name.is_empty())
        .filter(|(name, _)| {
            text.get(..name.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(name))
        })
        .filter(|(name, _)| {
            !text[name.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphanumeric())
        })
        .max_by_key(|(name, _)| name.len())
        .map(|(name, value)| (name.len(), value))
}

/// Parse and evaluate a substituted arithmetic expression
///
/// Syntax error columns refer to `source` as given, commas included.
pub fn eval_arithmetic(source: &str) -> Result<f64, EvalError> {
    let text: String = source.chars().filter(|&c| c != ',').collect();
    if text.trim().is_empty() {
        return Err(EvalError::Empty);
    }
    if nesting_depth(&text) > MAX_DEPTH {
        return Err(EvalError::TooDeep(MAX_DEPTH));
    }

    let parsed = all_consuming(terminated(expression, ws))(text.as_str()).finish();
    match parsed {
        Ok((_, value)) => value,
        Err(err) => Err(syntax_error(source, &text, err)),
    }
}

/// Map a byte offset in the comma-free text back to a 1-indexed column in `source`
fn source_column(source: &str, stripped_offset: usize) -> usize {
    let mut seen = 0;
    for (index, c) in source.char_indices() {
        if c == ',' {
            continue;
        }
        if seen == stripped_offset {
            return index + 1;
        }
        seen += c.len_utf8();
    }
    source.len() + 1
}

fn nesting_depth(text: &str) -> usize {
    let mut depth = 0usize;
    let mut max = 0usize;
    for c in text.chars() {
        match c {
            '(' => {
                depth += 1;
                max = max.max(depth);
            }
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max
}

fn syntax_error(source: &str, text: &str, err: VerboseError<&str>) -> EvalError {
    let fragment = err.errors.first().map(|(fragment, _)| *fragment).unwrap_or("");
    let column = source_column(source, text.len() - fragment.len());

    let expected = err.errors.iter().find_map(|(_, kind)| match kind {
        VerboseErrorKind::Context(label) => Some(*label),
        _ => None,
    });
    let found = match fragment.chars().next() {
        Some(c) => format!("`{c}`"),
        None => "end of expression".to_string(),
    };
    let message = match expected {
        Some(label) => format!("expected {label}, found {found}"),
        None => format!("unexpected {found}"),
    };

    EvalError::Syntax { column, message }
}

// =============================================================================
// GRAMMAR
// =============================================================================
//
// expression := term (('+' | '-') term)*
// term       := unary (('*' | '/') unary)*
// unary      := ('+' | '-')* atom
// atom       := number | '@' name | '(' expression ')'

fn ws(input: &str) -> ParseResult<&str> {
    take_while(char::is_whitespace)(input)
}

fn expression(input: &str) -> ParseResult<Value> {
    let (input, first) = term(input)?;
    let mut first = Some(first);
    fold_many0(
        pair(preceded(ws, one_of("+-")), term),
        move || first.take().unwrap_or(Err(EvalError::Empty)),
        |lhs, (op, rhs)| apply(op, lhs, rhs),
    )(input)
}

fn term(input: &str) -> ParseResult<Value> {
    let (input, first) = unary(input)?;
    let mut first = Some(first);
    fold_many0(
        pair(preceded(ws, one_of("*/")), unary),
        move || first.take().unwrap_or(Err(EvalError::Empty)),
        |lhs, (op, rhs)| apply(op, lhs, rhs),
    )(input)
}

fn unary(input: &str) -> ParseResult<Value> {
    let (input, signs) = many0(preceded(ws, one_of("+-")))(input)?;
    let (input, operand) = atom(input)?;
    let negative = signs.iter().filter(|&&sign| sign == '-').count() % 2 == 1;
    Ok((input, operand.map(|value| if negative { -value } else { value })))
}

fn atom(input: &str) -> ParseResult<Value> {
    preceded(ws, context("operand", alt((number, variable, group))))(input)
}

fn number(input: &str) -> ParseResult<Value> {
    let (rest, literal) = decimal_literal(input)?;
    let value: f64 = literal
        .parse()
        .map_err(|_| nom::Err::Error(VerboseError::from_error_kind(input, ErrorKind::Float)))?;
    Ok((rest, finite(value)))
}

fn variable(input: &str) -> ParseResult<Value> {
    let (input, _) = char('@')(input)?;
    let (input, name) = context("variable name", cut(alphanumeric1))(input)?;
    Ok((input, Err(EvalError::UnknownVariable(name.to_string()))))
}

fn group(input: &str) -> ParseResult<Value> {
    let (input, _) = char('(')(input)?;
    let (input, inner) = expression(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = context("closing parenthesis", cut(char(')')))(input)?;
    Ok((input, inner))
}

fn apply(op: char, lhs: Value, rhs: Value) -> Value {
    let (lhs, rhs) = (lhs?, rhs?);
    let value = match op {
        '+' => lhs + rhs,
        '-' => lhs - rhs,
        '*' => lhs * rhs,
        _ => lhs / rhs,
    };
    finite(value)
}

fn finite(value: f64) -> Value {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvalError::NonFinite)
    }
}
