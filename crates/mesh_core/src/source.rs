//! Sources: draggable numeric values and their bounds

use crate::drag::DragSession;
use crate::numeric::{format_number, parse_float};

/// Declaration of a source, as discovered in markup
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpec {
    /// Unique name referenced by `@name` in target expressions
    pub name: String,
    /// Text initially displayed by the element
    pub text: String,
    /// Explicit lower bound
    pub min: Option<f64>,
    /// Explicit upper bound
    pub max: Option<f64>,
    /// Clamp to non-negative values when no explicit min is given
    pub positive: bool,
    /// Allow fractional values while dragging
    pub decimal: bool,
}

impl SourceSpec {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            min: None,
            max: None,
            positive: false,
            decimal: false,
        }
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn positive(mut self) -> Self {
        self.positive = true;
        self
    }

    pub fn decimal(mut self) -> Self {
        self.decimal = true;
        self
    }

    /// Effective bounds after applying defaults
    pub fn bounds(&self) -> Bounds {
        let min = match (self.min, self.positive) {
            (Some(min), _) => min,
            (None, true) => 0.0,
            (None, false) => f64::NEG_INFINITY,
        };
        Bounds {
            min,
            max: self.max.unwrap_or(f64::INFINITY),
        }
    }
}

/// Closed range a source value is kept in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const UNBOUNDED: Bounds = Bounds {
        min: f64::NEG_INFINITY,
        max: f64::INFINITY,
    };

    /// Coerce NaN to 0, then clamp into `[min, max]`
    pub fn clamp(&self, candidate: f64) -> f64 {
        let mut value = if candidate.is_nan() { 0.0 } else { candidate };
        if value < self.min {
            value = self.min;
        }
        if value > self.max {
            value = self.max;
        }
        value
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

/// Live state of a source inside a mesh
#[derive(Debug, Clone)]
pub(crate) struct Source {
    pub(crate) name: String,
    pub(crate) bounds: Bounds,
    pub(crate) decimal: bool,
    /// Value parsed from the markup at load time; what a reset restores
    pub(crate) initial: f64,
    /// Text currently displayed by the element
    pub(crate) display: String,
    pub(crate) drag: DragSession,
}

impl Source {
    pub(crate) fn from_spec(spec: &SourceSpec) -> Self {
        Self {
            name: spec.name.clone(),
            bounds: spec.bounds(),
            decimal: spec.decimal,
            initial: parse_float(&spec.text),
            display: spec.text.clone(),
            drag: DragSession::default(),
        }
    }

    /// The displayed value read back as a number
    pub(crate) fn displayed_value(&self) -> f64 {
        parse_float(&self.display)
    }

    pub(crate) fn show(&mut self, value: f64) {
        self.display = format_number(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_bounds_are_open() {
        assert_eq!(SourceSpec::new("a", "1").bounds(), Bounds::UNBOUNDED);
    }

    #[test]
    fn test_positive_sets_zero_min() {
        let bounds = SourceSpec::new("a", "1").positive().bounds();
        assert_eq!(bounds.min, 0.0);
        assert_eq!(bounds.max, f64::INFINITY);
    }

    #[test]
    fn test_explicit_min_wins_over_positive() {
        let bounds = SourceSpec::new("a", "1").positive().min(-5.0).bounds();
        assert_eq!(bounds.min, -5.0);
    }

    #[test]
    fn test_clamp() {
        let bounds = Bounds { min: 0.0, max: 10.0 };
        assert_eq!(bounds.clamp(-3.0), 0.0);
        assert_eq!(bounds.clamp(13.0), 10.0);
        assert_eq!(bounds.clamp(4.5), 4.5);
        assert_eq!(bounds.clamp(f64::NAN), 0.0);
    }

    #[test]
    fn test_nan_coerces_to_zero_before_clamping() {
        let bounds = Bounds { min: 2.0, max: 10.0 };
        assert_eq!(bounds.clamp(f64::NAN), 2.0);
    }

    #[test]
    fn test_source_tracks_display() {
        let mut source = Source::from_spec(&SourceSpec::new("bananas", "6"));
        assert_eq!(source.initial, 6.0);
        assert_eq!(source.displayed_value(), 6.0);
        source.show(7.5);
        assert_eq!(source.display, "7.5");
        assert_eq!(source.displayed_value(), 7.5);
    }

    proptest! {
        #[test]
        fn prop_clamp_stays_in_bounds(
            a in -1e6f64..1e6,
            b in -1e6f64..1e6,
            candidate in prop::num::f64::ANY,
        ) {
            let bounds = Bounds { min: a.min(b), max: a.max(b) };
            prop_assert!(bounds.contains(bounds.clamp(candidate)));
        }
    }
}
