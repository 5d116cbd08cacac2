//! Numeric parsing, rounding and display helpers
//!
//! Markup hands the engine numbers as loose text ("6 bananas", "12.5px") and
//! expects plain decimal text back. These helpers keep that conversion in one
//! place:
//!
//! - [`parse_float`] / [`parse_int`] read the longest numeric prefix of a
//!   string, yielding NaN / `None` when there is none
//! - [`round_to`] rounds half up at a decimal place, deciding on the shortest
//!   decimal representation of the value rather than its binary expansion
//! - [`currency`] renders `<whole>.<cents>`
//! - [`format_number`] renders a value for display

use nom::{
    branch::alt,
    character::complete::{char, digit0, digit1, one_of},
    combinator::{opt, recognize},
    error::ParseError as NomParseError,
    sequence::{pair, tuple},
    IResult,
};

/// Recognize an unsigned decimal literal: `12`, `12.`, `12.5`, `.5`, `1e3`
pub(crate) fn decimal_literal<'a, E: NomParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, &'a str, E> {
    recognize(pair(
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    ))(input)
}

fn signed_decimal(input: &str) -> IResult<&str, &str> {
    recognize(pair(opt(one_of("+-")), decimal_literal))(input)
}

fn signed_integer(input: &str) -> IResult<&str, &str> {
    recognize(pair(opt(one_of("+-")), digit1))(input)
}

/// Parse the leading number of `text`, ignoring anything after it
///
/// Leading whitespace is skipped. `Infinity` (optionally signed) is accepted.
/// Returns NaN when the text does not start with a number.
pub fn parse_float(text: &str) -> f64 {
    let trimmed = text.trim_start();

    if let Ok((_, literal)) = signed_decimal(trimmed) {
        return literal.parse().unwrap_or(f64::NAN);
    }

    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    if rest.starts_with("Infinity") {
        return if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    f64::NAN
}

/// Parse the leading base-10 integer of `text`
pub fn parse_int(text: &str) -> Option<i64> {
    let (_, literal) = signed_integer(text.trim_start()).ok()?;
    literal.parse().ok()
}

/// Round `value` to `places` decimal places, halves rounding toward +∞
///
/// The decimal point is moved in the shortest round-trip text of the value,
/// so `5.005` rounds to `5.01` even though its binary expansion sits just
/// below the half. A value with no more than `places` fraction digits is
/// already rounded and comes back unchanged, however large `places` is.
pub fn round_to(value: f64, places: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }

    // f64's Display never switches to exponent notation
    let repr = value.to_string();
    let (whole, fraction) = repr.split_once('.').unwrap_or((repr.as_str(), ""));
    let places = usize::try_from(places).unwrap_or(usize::MAX);
    if fraction.len() <= places {
        return value;
    }

    let (kept, rest) = fraction.split_at(places);
    let shifted: f64 = match format!("{whole}{kept}.{rest}").parse() {
        Ok(shifted) => shifted,
        Err(_) => return value,
    };
    let rounded = (shifted + 0.5).floor();
    // Let the parser scale back down so the result is the nearest f64
    format!("{rounded}e-{places}").parse().unwrap_or(value)
}

/// Format a value as currency: whole units, a dot, and two-digit cents
///
/// The sign applies to the whole amount, so `-5.1` renders as `-5.10`
/// rather than flooring the units to `-6`.
pub fn currency(value: f64) -> String {
    let rounded = round_to(value, 2);
    if rounded.is_infinite() {
        return format_number(rounded);
    }
    let rounded = if rounded.is_nan() { 0.0 } else { rounded };

    let magnitude = rounded.abs();
    let mut whole = magnitude.trunc();
    let mut cents = ((magnitude - whole) * 100.0).round();
    if cents >= 100.0 {
        whole += 1.0;
        cents = 0.0;
    }

    let sign = if rounded < 0.0 && (whole > 0.0 || cents > 0.0) {
        "-"
    } else {
        ""
    };
    format!("{sign}{whole}.{:02}", cents as u8)
}

/// Render a value as display text; zero and NaN both show as `0`
///
/// Infinities render as `Infinity` so [`parse_float`] reads them back.
pub fn format_number(value: f64) -> String {
    if value == 0.0 || value.is_nan() {
        "0".to_string()
    } else if value == f64::INFINITY {
        "Infinity".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        value.to_string()
    }
}
