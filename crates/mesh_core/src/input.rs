//! Raw pointer input and its mapping to drag gestures
//!
//! A host forwards the events it receives as [`InputEvent`]s. Which element an
//! event landed on is given as the name of the source under the pointer, if
//! any. The [`GestureMapper`] listens to either the mouse or the touch stream
//! (never both) and produces [`Gesture`]s for the engine.

use smallvec::SmallVec;

/// Input events
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    /// Mouse event
    Mouse(MouseEvent),
    /// Touch event
    Touch(TouchEvent),
    /// Double click or double tap on a source
    DoubleClick {
        /// Source under the pointer
        source: String,
    },
}

// ============================================================================
// Mouse Events
// ============================================================================

/// Mouse events
#[derive(Clone, Debug, PartialEq)]
pub enum MouseEvent {
    /// Button pressed
    ButtonPressed {
        /// Source under the pointer, if any
        source: Option<String>,
        /// Page y coordinate
        y: f64,
    },
    /// Mouse moved
    Moved { y: f64 },
    /// Button released anywhere in the document
    ButtonReleased { y: f64 },
}

// ============================================================================
// Touch Events
// ============================================================================

/// Phase of a touch event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TouchPhase {
    Started,
    Moved,
    Ended,
    Cancelled,
}

/// One finger on the surface
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchPoint {
    /// Platform touch identifier
    pub id: u64,
    /// Page y coordinate
    pub y: f64,
}

/// Touch event
#[derive(Clone, Debug, PartialEq)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    /// Source the touch landed on, if any
    pub source: Option<String>,
    /// Active touch points; only the first one drives a drag
    pub touches: SmallVec<[TouchPoint; 2]>,
}

impl TouchEvent {
    /// Single-finger event
    pub fn single(phase: TouchPhase, source: Option<String>, y: f64) -> Self {
        let mut touches = SmallVec::new();
        touches.push(TouchPoint { id: 0, y });
        Self {
            phase,
            source,
            touches,
        }
    }

    /// Y coordinate of the first touch point
    pub fn primary_y(&self) -> Option<f64> {
        self.touches.first().map(|touch| touch.y)
    }
}

// ============================================================================
// Gestures
// ============================================================================

/// Engine-level gestures
#[derive(Clone, Debug, PartialEq)]
pub enum Gesture {
    /// Start dragging `source` with the pointer at `y`
    Start { source: String, y: f64 },
    /// Pointer moved to `y`; applies to every active drag
    Move { y: f64 },
    /// Pointer released; ends every active drag
    End,
    /// Restore `source` to its load-time value
    Reset { source: String },
}

/// Turns raw input into gestures for one input mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct GestureMapper {
    touch: bool,
}

impl GestureMapper {
    pub fn new(touch: bool) -> Self {
        Self { touch }
    }

    /// Whether the mapper listens to touch rather than mouse events
    pub fn is_touch(&self) -> bool {
        self.touch
    }

    pub fn map(&self, event: &InputEvent) -> Option<Gesture> {
        match event {
            InputEvent::DoubleClick { source } => Some(Gesture::Reset {
                source: source.clone(),
            }),
            InputEvent::Mouse(_) if self.touch => None,
            InputEvent::Touch(_) if !self.touch => None,
            InputEvent::Mouse(mouse) => Some(match mouse {
                MouseEvent::ButtonPressed { source, y } => Gesture::Start {
                    source: source.clone()?,
                    y: *y,
                },
                MouseEvent::Moved { y } => Gesture::Move { y: *y },
                MouseEvent::ButtonReleased { .. } => Gesture::End,
            }),
            InputEvent::Touch(touch) => match touch.phase {
                TouchPhase::Started => Some(Gesture::Start {
                    source: touch.source.clone()?,
                    y: touch.primary_y()?,
                }),
                TouchPhase::Moved => Some(Gesture::Move {
                    y: touch.primary_y()?,
                }),
                TouchPhase::Ended | TouchPhase::Cancelled => Some(Gesture::End),
            },
        }
    }
}
