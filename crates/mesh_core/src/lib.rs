//! Mesh Core Runtime
//!
//! Drag-linked numeric values with live computed displays:
//!
//! - **Sources**: numbers the user changes by dragging vertically, kept inside
//!   their bounds
//! - **Targets**: arithmetic over `@source` references, recomputed and
//!   formatted whenever a source changes
//! - **Debouncing**: recomputation and persistence both wait for a quiet
//!   period, per key
//! - **Persistence**: source values survive across sessions through a
//!   pluggable store
//!
//! # Example
//!
//! ```rust
//! use mesh_core::{evaluate, ValueStore};
//!
//! let values: ValueStore = [("bananas", 6.0), ("others", 2.0)].into_iter().collect();
//! assert_eq!(evaluate("@bananas / (@others + 1)", &values), Ok(2.0));
//! ```
//!
//! See [`Mesh`] for the full engine and [`MeshRuntime`] for running it on
//! tokio.

pub mod config;
pub mod debounce;
pub mod drag;
pub mod error;
pub mod expr;
pub mod input;
pub mod markup;
pub mod mesh;
pub mod numeric;
pub mod persist;
pub mod runtime;
pub mod source;
pub mod store;
pub mod target;

pub use config::{MeshConfig, DEFAULT_PREFIX};
pub use debounce::{Clock, DebounceScheduler, ManualClock, SystemClock, TimerId};
pub use drag::DragSession;
pub use error::{EvalError, MeshError, PersistenceError, Result};
pub use expr::{evaluate, Expression};
pub use input::{
    Gesture, GestureMapper, InputEvent, MouseEvent, TouchEvent, TouchPhase, TouchPoint,
};
pub use markup::{AttributeNames, Attributes};
pub use mesh::{DisplayChange, DisplayObserver, Mesh, MeshBuilder, TickReport};
pub use persist::{JsonFileStore, MemoryStore, PersistenceAdapter};
pub use runtime::{MeshEvent, MeshRuntime, MeshSender, TokioClock};
pub use source::{Bounds, SourceSpec};
pub use store::ValueStore;
pub use target::{TargetFormat, TargetId, TargetSpec, FALLBACK_DISPLAY};
