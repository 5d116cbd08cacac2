//! Drag sessions: vertical pointer movement to source values
//!
//! Each source runs a two-state machine:
//!
//! ```text
//!          start (not already dragging)
//!   Idle ───────────────────────────────▶ Dragging { start_y, start_value }
//!    ▲                                        │
//!    └──────────────── end ───────────────────┘
//! ```
//!
//! While dragging, every move maps the vertical distance travelled since the
//! start to a candidate value with [`drag_candidate`]. Moving up increases the
//! value. The candidate still has to be clamped by the caller.

use crate::numeric::round_to;

/// Pixels of travel per unit of change at `dragSpeed = 1`
pub const PIXELS_PER_UNIT: f64 = 10.0;

/// Drag state of one source
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragSession {
    #[default]
    Idle,
    Dragging {
        /// Pointer y when the drag started
        start_y: f64,
        /// Source value when the drag started
        start_value: f64,
    },
}

impl DragSession {
    /// Enter `Dragging`; ignored (returns `false`) when already dragging
    pub fn begin(&mut self, start_y: f64, start_value: f64) -> bool {
        if self.is_active() {
            return false;
        }
        *self = DragSession::Dragging {
            start_y,
            start_value,
        };
        true
    }

    /// Return to `Idle`; returns whether a drag was in progress
    pub fn end(&mut self) -> bool {
        let was_active = self.is_active();
        *self = DragSession::Idle;
        was_active
    }

    pub fn is_active(&self) -> bool {
        matches!(self, DragSession::Dragging { .. })
    }

    /// Candidate value for a pointer now at `current_y`, if dragging
    pub fn candidate(&self, current_y: f64, drag_speed: f64, decimal: bool) -> Option<f64> {
        match *self {
            DragSession::Idle => None,
            DragSession::Dragging {
                start_y,
                start_value,
            } => Some(drag_candidate(
                start_value,
                start_y,
                current_y,
                drag_speed,
                decimal,
            )),
        }
    }
}

/// Change in value for a vertical move from `start_y` to `current_y`
///
/// Fractional sources round the change to one decimal place; the rest floor it.
pub fn drag_delta(start_y: f64, current_y: f64, drag_speed: f64, decimal: bool) -> f64 {
    let raw = (start_y - current_y) / (PIXELS_PER_UNIT / drag_speed);
    if decimal {
        round_to(raw, 1)
    } else {
        raw.floor()
    }
}

/// Unclamped value after moving from `start_y` to `current_y`
pub fn drag_candidate(
    start_value: f64,
    start_y: f64,
    current_y: f64,
    drag_speed: f64,
    decimal: bool,
) -> f64 {
    round_to(
        start_value + drag_delta(start_y, current_y, drag_speed, decimal),
        1,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_up_thirty_pixels() {
        // Pointer moves from y=200 to y=170
        assert_eq!(drag_delta(200.0, 170.0, 1.0, false), 3.0);
        assert_eq!(drag_candidate(10.0, 200.0, 170.0, 1.0, false), 13.0);
    }

    #[test]
    fn test_moving_down_decreases() {
        assert_eq!(drag_candidate(10.0, 100.0, 125.0, 1.0, false), 7.0);
    }

    #[test]
    fn test_integer_sources_floor_partial_steps() {
        assert_eq!(drag_delta(100.0, 95.0, 1.0, false), 0.0);
        assert_eq!(drag_delta(100.0, 105.0, 1.0, false), -1.0);
    }

    #[test]
    fn test_decimal_sources_keep_one_place() {
        assert_eq!(drag_delta(100.0, 93.0, 1.0, true), 0.7);
        assert_eq!(drag_candidate(2.5, 100.0, 93.0, 1.0, true), 3.2);
    }

    #[test]
    fn test_drag_speed_scales_change() {
        assert_eq!(drag_delta(100.0, 90.0, 5.0, false), 5.0);
        assert_eq!(drag_delta(100.0, 90.0, 0.5, false), 0.0);
        assert_eq!(drag_delta(100.0, 80.0, 0.5, false), 1.0);
    }

    #[test]
    fn test_session_state_machine() {
        let mut session = DragSession::default();
        assert_eq!(session.candidate(0.0, 1.0, false), None);

        assert!(session.begin(200.0, 10.0));
        assert!(session.is_active());
        // Re-entrant starts are ignored and keep the first anchor
        assert!(!session.begin(50.0, 99.0));
        assert_eq!(session.candidate(170.0, 1.0, false), Some(13.0));

        assert!(session.end());
        assert!(!session.is_active());
        assert!(!session.end());
    }
}
