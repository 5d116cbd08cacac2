//! Targets: computed displays and their formatting
//!
//! A target's raw result goes through up to three steps, always in this
//! order:
//!
//! 1. round to the target's decimal places, when it has a decimal attribute
//! 2. floor, when it has a floor attribute
//! 3. currency formatting (`<whole>.<cents>`), when it has a currency attribute
//!
//! Floor before currency is kept on purpose: a floored currency target shows
//! `.00` cents.

use crate::error::EvalError;
use crate::expr::Expression;
use crate::numeric::{currency, format_number, parse_int, round_to};
use crate::store::ValueStore;

/// Shown in place of a result when a target's expression fails
pub const FALLBACK_DISPLAY: &str = "0 (an error occurred)";

/// Declaration of a target, as discovered in markup
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSpec {
    /// Arithmetic over `@source` references
    pub expression: String,
    /// Raw value of the decimal attribute, when present
    pub decimal: Option<String>,
    pub floor: bool,
    pub currency: bool,
    /// Text initially displayed by the element
    pub text: String,
}

impl TargetSpec {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            decimal: None,
            floor: false,
            currency: false,
            text: String::new(),
        }
    }

    /// Round to `places`; anything that is not a positive integer falls back
    /// to the configured default
    pub fn decimal(mut self, places: impl Into<String>) -> Self {
        self.decimal = Some(places.into());
        self
    }

    pub fn floor(mut self) -> Self {
        self.floor = true;
        self
    }

    pub fn currency(mut self) -> Self {
        self.currency = true;
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Resolve the formatting flags against the global default places
    pub fn format(&self, default_places: u32) -> TargetFormat {
        let decimal_places = self.decimal.as_deref().map(|raw| {
            parse_int(raw)
                .filter(|places| *places > 0)
                .and_then(|places| u32::try_from(places).ok())
                .unwrap_or(default_places)
        });
        TargetFormat {
            decimal_places,
            floor: self.floor,
            currency: self.currency,
        }
    }
}

/// Resolved formatting policy of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TargetFormat {
    pub decimal_places: Option<u32>,
    pub floor: bool,
    pub currency: bool,
}

impl TargetFormat {
    /// Turn a raw result into display text
    pub fn apply(&self, raw: f64) -> String {
        let mut value = raw;
        if let Some(places) = self.decimal_places {
            value = round_to(value, places);
        }
        if self.floor {
            value = value.floor();
        }
        if self.currency {
            currency(value)
        } else {
            format_number(value)
        }
    }

    /// Display text for an evaluation outcome
    pub fn render(&self, outcome: &Result<f64, EvalError>) -> String {
        match outcome {
            Ok(raw) => self.apply(*raw),
            Err(_) => FALLBACK_DISPLAY.to_string(),
        }
    }
}

/// Handle to a target inside a mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub(crate) usize);

impl TargetId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Live state of a target inside a mesh
#[derive(Debug, Clone)]
pub(crate) struct Target {
    pub(crate) expression: Expression,
    pub(crate) format: TargetFormat,
    pub(crate) display: String,
    pub(crate) last_error: Option<EvalError>,
}

impl Target {
    pub(crate) fn from_spec(spec: &TargetSpec, default_places: u32) -> Self {
        Self {
            expression: Expression::new(spec.expression.as_str()),
            format: spec.format(default_places),
            display: spec.text.clone(),
            last_error: None,
        }
    }

    /// Recompute the display; returns whether the text changed
    pub(crate) fn recompute(&mut self, values: &ValueStore) -> bool {
        let outcome = self.expression.evaluate(values);
        if let Err(err) = &outcome {
            tracing::warn!(
                expression = self.expression.sanitized(),
                error = %err,
                "could not process expression"
            );
        }

        let display = self.format.render(&outcome);
        self.last_error = outcome.err();
        if display == self.display {
            return false;
        }
        self.display = display;
        true
    }
}
