//! The mesh engine
//!
//! A [`Mesh`] owns every source, every target, the value store and the two
//! debounce tables. It is driven from a single thread through `&mut self`:
//!
//! - gestures ([`Mesh::handle`]) move sources and commit clamped values
//! - commits schedule a shared target recompute (`updateDelay`) and a
//!   per-source save (`saveDelay`)
//! - [`Mesh::tick`] runs whatever has become due, rendering before saving
//!
//! Hosts wake the engine up at [`Mesh::next_deadline`], or let
//! [`MeshRuntime`](crate::runtime::MeshRuntime) do it on tokio.
//!
//! ```rust
//! use mesh_core::debounce::ManualClock;
//! use mesh_core::{Gesture, Mesh, SourceSpec, TargetSpec};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let mut mesh = Mesh::builder()
//!     .clock(Arc::new(clock.clone()))
//!     .source(SourceSpec::new("bananas", "6").positive())
//!     .source(SourceSpec::new("others", "2").positive())
//!     .target(TargetSpec::new("@bananas / (@others + 1)"))
//!     .build()
//!     .unwrap();
//!
//! mesh.handle(Gesture::Start { source: "bananas".into(), y: 200.0 }).unwrap();
//! mesh.handle(Gesture::Move { y: 170.0 }).unwrap();
//! mesh.handle(Gesture::End).unwrap();
//! assert_eq!(mesh.value("bananas"), Some(9.0));
//!
//! clock.advance(Duration::from_millis(50));
//! mesh.tick();
//! assert_eq!(mesh.target_displays().next(), Some("3"));
//! ```

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::MeshConfig;
use crate::debounce::{Clock, DebounceScheduler, SystemClock};
use crate::error::{EvalError, MeshError, Result};
use crate::input::{Gesture, GestureMapper, InputEvent};
use crate::markup::AttributeNames;
use crate::numeric::{format_number, parse_float};
use crate::persist::PersistenceAdapter;
use crate::source::{Bounds, Source, SourceSpec};
use crate::store::ValueStore;
use crate::target::{Target, TargetId, TargetSpec};

/// A visible change the host should reflect
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayChange {
    /// A source shows new text
    Source { name: String, text: String },
    /// A target shows new text
    Target { id: TargetId, text: String },
    /// The document-level drag indicator was raised or cleared
    DragActive(bool),
}

/// Callback receiving display changes
pub type DisplayObserver = Box<dyn FnMut(&DisplayChange) + Send>;

/// What a call to [`Mesh::tick`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    /// Targets were recomputed
    pub rendered: bool,
    /// Number of source values written to persistence
    pub saved: usize,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        !self.rendered && self.saved == 0
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Collects configuration and declarations, then loads a [`Mesh`]
#[must_use]
pub struct MeshBuilder {
    config: MeshConfig,
    clock: Option<Arc<dyn Clock>>,
    persistence: Option<Box<dyn PersistenceAdapter>>,
    touch_capable: bool,
    observer: Option<DisplayObserver>,
    sources: Vec<SourceSpec>,
    targets: Vec<TargetSpec>,
}

impl Default for MeshBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self {
            config: MeshConfig::default(),
            clock: None,
            persistence: None,
            touch_capable: false,
            observer: None,
            sources: Vec::new(),
            targets: Vec::new(),
        }
    }

    pub fn config(mut self, config: MeshConfig) -> Self {
        self.config = config;
        self
    }

    /// Time source for debouncing; defaults to [`SystemClock`]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn persistence(mut self, adapter: impl PersistenceAdapter + 'static) -> Self {
        self.persistence = Some(Box::new(adapter));
        self
    }

    /// Whether the host supports touch; decides the input mode when the
    /// configuration leaves `touch` unset
    pub fn touch_capable(mut self, capable: bool) -> Self {
        self.touch_capable = capable;
        self
    }

    pub fn observer(mut self, observer: impl FnMut(&DisplayChange) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn source(mut self, spec: SourceSpec) -> Self {
        self.sources.push(spec);
        self
    }

    pub fn sources(mut self, specs: impl IntoIterator<Item = SourceSpec>) -> Self {
        self.sources.extend(specs);
        self
    }

    pub fn target(mut self, spec: TargetSpec) -> Self {
        self.targets.push(spec);
        self
    }

    pub fn targets(mut self, specs: impl IntoIterator<Item = TargetSpec>) -> Self {
        self.targets.extend(specs);
        self
    }

    /// Validate everything, seed source values and schedule the first render
    pub fn build(self) -> Result<Mesh> {
        let MeshBuilder {
            config,
            clock,
            persistence,
            touch_capable,
            observer,
            sources: source_specs,
            targets: target_specs,
        } = self;

        config.validate()?;

        let save = config.save.unwrap_or(persistence.is_some());
        if save && persistence.is_none() {
            return Err(MeshError::Config(
                "save is enabled but no persistence adapter was given".to_string(),
            ));
        }
        let touch = config.touch.unwrap_or(touch_capable);
        let clock = clock.unwrap_or_else(|| Arc::new(SystemClock::new()));

        let mut sources = IndexMap::with_capacity(source_specs.len());
        for spec in &source_specs {
            let Bounds { min, max } = spec.bounds();
            if min > max {
                return Err(MeshError::InvalidBounds {
                    name: spec.name.clone(),
                    min,
                    max,
                });
            }
            let key = spec.name.to_lowercase();
            if sources.contains_key(&key) {
                return Err(MeshError::DuplicateSource(spec.name.clone()));
            }
            sources.insert(key, Source::from_spec(spec));
        }

        let targets = target_specs
            .iter()
            .map(|spec| Target::from_spec(spec, config.decimal_places))
            .collect();

        let mut mesh = Mesh {
            names: AttributeNames::new(&config.prefix),
            mapper: GestureMapper::new(touch),
            updates: DebounceScheduler::new(clock.clone()),
            saves: DebounceScheduler::new(clock.clone()),
            persistence: if save { persistence } else { None },
            values: ValueStore::new(),
            drag_active: false,
            config,
            clock,
            sources,
            targets,
            observer,
        };

        mesh.load();
        mesh.schedule_update();

        tracing::debug!(
            sources = mesh.sources.len(),
            targets = mesh.targets.len(),
            save,
            touch,
            "mesh loaded"
        );
        Ok(mesh)
    }
}

// =============================================================================
// MESH
// =============================================================================

/// Sources, targets and the machinery linking them
pub struct Mesh {
    config: MeshConfig,
    names: AttributeNames,
    clock: Arc<dyn Clock>,
    values: ValueStore,
    /// Keyed by lowercased name
    sources: IndexMap<String, Source>,
    targets: Vec<Target>,
    updates: DebounceScheduler<(), ()>,
    /// Keyed by lowercased source name, carrying the value to write
    saves: DebounceScheduler<String, f64>,
    /// Present only when saving is enabled
    persistence: Option<Box<dyn PersistenceAdapter>>,
    mapper: GestureMapper,
    drag_active: bool,
    observer: Option<DisplayObserver>,
}

impl fmt::Debug for Mesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mesh")
            .field("config", &self.config)
            .field("values", &self.values)
            .field("targets", &self.targets.len())
            .field("drag_active", &self.drag_active)
            .field("pending_updates", &self.updates.len())
            .field("pending_saves", &self.saves.len())
            .finish_non_exhaustive()
    }
}

impl Mesh {
    pub fn builder() -> MeshBuilder {
        MeshBuilder::new()
    }

    fn notify(observer: &mut Option<DisplayObserver>, change: DisplayChange) {
        if let Some(observer) = observer {
            observer(&change);
        }
    }

    fn key(name: &str) -> String {
        name.to_lowercase()
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Seed every source from persistence or from its markup text
    fn load(&mut self) {
        let keys: Vec<String> = self.sources.keys().cloned().collect();
        for key in keys {
            let Some(source) = self.sources.get(&key) else {
                continue;
            };
            let initial = source.initial;
            let persisted = self.persistence.as_ref().and_then(|store| {
                let storage_key = self.config.storage_key(&source.name);
                store.get(&storage_key).map(|raw| (storage_key, raw))
            });

            let value = match persisted {
                Some((storage_key, raw)) => {
                    let value = parse_float(&raw);
                    if value.is_nan() {
                        tracing::warn!(
                            key = %storage_key,
                            value = %raw,
                            "ignoring unparsable persisted value"
                        );
                        initial
                    } else {
                        tracing::debug!(key = %storage_key, value, "restored persisted value");
                        value
                    }
                }
                None => initial,
            };
            self.commit_key(&key, value);
        }
    }

    // =========================================================================
    // Committing
    // =========================================================================

    /// Clamp and store a value for `name`, then schedule a render and a save
    ///
    /// Returns the value actually stored.
    pub fn commit(&mut self, name: &str, value: f64) -> Result<f64> {
        let key = Self::key(name);
        if !self.sources.contains_key(&key) {
            return Err(MeshError::UnknownSource(name.to_string()));
        }
        Ok(self.commit_key(&key, value))
    }

    fn commit_key(&mut self, key: &str, candidate: f64) -> f64 {
        let Some(source) = self.sources.get_mut(key) else {
            return candidate;
        };

        let value = source.bounds.clamp(candidate);
        self.values.set(&source.name, value);
        let changed = {
            let previous = std::mem::take(&mut source.display);
            source.show(value);
            previous != source.display
        };
        tracing::debug!(source = %source.name, candidate, value, "committed source value");

        if changed {
            let change = DisplayChange::Source {
                name: source.name.clone(),
                text: source.display.clone(),
            };
            Self::notify(&mut self.observer, change);
        }

        self.schedule_update();
        if self.persistence.is_some() {
            self.saves
                .schedule(key.to_string(), self.config.save_delay(), value);
        }
        value
    }

    fn schedule_update(&mut self) {
        self.updates.schedule((), self.config.update_delay(), ());
    }

    // =========================================================================
    // Gestures
    // =========================================================================

    /// Map a raw input event through the configured input mode and handle it
    ///
    /// Returns whether the event produced a gesture.
    pub fn handle_input(&mut self, event: &InputEvent) -> Result<bool> {
        match self.mapper.map(event) {
            Some(gesture) => {
                self.handle(gesture)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn handle(&mut self, gesture: Gesture) -> Result<()> {
        match gesture {
            Gesture::Start { source, y } => {
                self.begin_drag(&source, y)?;
            }
            Gesture::Move { y } => self.drag_to(y),
            Gesture::End => self.end_drag(),
            Gesture::Reset { source } => {
                self.reset(&source)?;
            }
        }
        Ok(())
    }

    /// Start dragging `name` with the pointer at `y`
    ///
    /// Returns `false` when that source is already being dragged.
    pub fn begin_drag(&mut self, name: &str, y: f64) -> Result<bool> {
        let source = self
            .sources
            .get_mut(&Self::key(name))
            .ok_or_else(|| MeshError::UnknownSource(name.to_string()))?;

        let start_value = source.displayed_value();
        if !source.drag.begin(y, start_value) {
            return Ok(false);
        }
        tracing::debug!(source = %source.name, y, start_value, "drag started");

        if !self.drag_active {
            self.drag_active = true;
            Self::notify(&mut self.observer, DisplayChange::DragActive(true));
        }
        Ok(true)
    }

    /// Move every active drag to pointer position `y`
    pub fn drag_to(&mut self, y: f64) {
        let speed = self.config.drag_speed;
        let moves: Vec<(String, f64)> = self
            .sources
            .iter()
            .filter_map(|(key, source)| {
                source
                    .drag
                    .candidate(y, speed, source.decimal)
                    .map(|candidate| (key.clone(), candidate))
            })
            .collect();

        for (key, candidate) in moves {
            self.commit_key(&key, candidate);
        }
    }

    /// End every active drag
    pub fn end_drag(&mut self) {
        let mut ended = 0;
        for source in self.sources.values_mut() {
            if source.drag.end() {
                ended += 1;
            }
        }
        if ended > 0 {
            tracing::debug!(ended, "drag ended");
        }

        if self.drag_active {
            self.drag_active = false;
            Self::notify(&mut self.observer, DisplayChange::DragActive(false));
        }
    }

    /// Restore `name` to the value its markup showed at load time
    pub fn reset(&mut self, name: &str) -> Result<f64> {
        let key = Self::key(name);
        let initial = self
            .sources
            .get(&key)
            .map(|source| source.initial)
            .ok_or_else(|| MeshError::UnknownSource(name.to_string()))?;
        tracing::debug!(source = name, initial, "source reset");
        Ok(self.commit_key(&key, initial))
    }

    // =========================================================================
    // Timers
    // =========================================================================

    /// Run every debounced action that has become due
    pub fn tick(&mut self) -> TickReport {
        let rendered = !self.updates.take_due().is_empty();
        if rendered {
            self.render_targets();
        }
        let due = self.saves.take_due();
        let saved = self.write_saves(due);
        TickReport { rendered, saved }
    }

    /// Run every pending action now, due or not
    pub fn flush(&mut self) -> TickReport {
        let rendered = !self.updates.drain().is_empty();
        if rendered {
            self.render_targets();
        }
        let pending = self.saves.drain();
        let saved = self.write_saves(pending);
        TickReport { rendered, saved }
    }

    fn write_saves(&mut self, due: Vec<(String, f64)>) -> usize {
        let Some(store) = self.persistence.as_mut() else {
            return 0;
        };
        let mut saved = 0;
        for (key, value) in due {
            let Some(source) = self.sources.get(&key) else {
                continue;
            };
            let storage_key = self.config.storage_key(&source.name);
            store.set(&storage_key, &format_number(value));
            tracing::debug!(key = %storage_key, value, "saved source value");
            saved += 1;
        }
        saved
    }

    /// Recompute every target now
    ///
    /// A failing expression shows the fallback display; the others still
    /// render.
    pub fn render_targets(&mut self) {
        let mut changed = 0;
        for (index, target) in self.targets.iter_mut().enumerate() {
            if target.recompute(&self.values) {
                changed += 1;
                let change = DisplayChange::Target {
                    id: TargetId(index),
                    text: target.display.clone(),
                };
                Self::notify(&mut self.observer, change);
            }
        }
        tracing::debug!(targets = self.targets.len(), changed, "rendered targets");
    }

    /// Earliest moment (on the mesh clock) at which [`tick`](Self::tick) has work
    pub fn next_deadline(&self) -> Option<Duration> {
        match (self.updates.next_deadline(), self.saves.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.updates.is_empty() || !self.saves.is_empty()
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current value of a source
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name)
    }

    pub fn values(&self) -> &ValueStore {
        &self.values
    }

    /// Text a source currently shows
    pub fn source_display(&self, name: &str) -> Option<&str> {
        self.sources
            .get(&Self::key(name))
            .map(|source| source.display.as_str())
    }

    pub fn source_bounds(&self, name: &str) -> Option<Bounds> {
        self.sources.get(&Self::key(name)).map(|source| source.bounds)
    }

    /// Source names in declaration order
    pub fn source_names(&self) -> impl Iterator<Item = &str> {
        self.sources.values().map(|source| source.name.as_str())
    }

    pub fn target_ids(&self) -> impl Iterator<Item = TargetId> {
        (0..self.targets.len()).map(TargetId)
    }

    pub fn target_display(&self, id: TargetId) -> Option<&str> {
        self.targets.get(id.0).map(|target| target.display.as_str())
    }

    /// Target displays in declaration order
    pub fn target_displays(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|target| target.display.as_str())
    }

    pub fn target_expression(&self, id: TargetId) -> Option<&str> {
        self.targets.get(id.0).map(|target| target.expression.raw())
    }

    /// Why the target's last render fell back, if it did
    pub fn target_error(&self, id: TargetId) -> Option<&EvalError> {
        self.targets.get(id.0).and_then(|target| target.last_error.as_ref())
    }

    pub fn is_dragging(&self, name: &str) -> bool {
        self.sources
            .get(&Self::key(name))
            .is_some_and(|source| source.drag.is_active())
    }

    /// Whether the document-level drag indicator is raised
    pub fn is_drag_active(&self) -> bool {
        self.drag_active
    }

    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    pub fn attribute_names(&self) -> &AttributeNames {
        &self.names
    }

    pub fn save_enabled(&self) -> bool {
        self.persistence.is_some()
    }

    pub fn touch_mode(&self) -> bool {
        self.mapper.is_touch()
    }
}
