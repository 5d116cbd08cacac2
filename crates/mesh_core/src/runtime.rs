//! Async driver for a mesh on tokio
//!
//! [`MeshRuntime`] owns a [`Mesh`] and a channel of incoming events. It
//! sleeps until either an event arrives or the next debounce deadline passes,
//! so the engine stays single-threaded while the host sends from anywhere.
//! When every sender is dropped the runtime flushes pending renders and saves
//! and hands the mesh back.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::debounce::Clock;
use crate::error::Result;
use crate::input::{Gesture, InputEvent};
use crate::mesh::{Mesh, MeshBuilder};

/// Tokio time since the clock was created
///
/// Follows tokio's paused clock in tests.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn origin(&self) -> Instant {
        self.origin
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Events accepted by a running mesh
#[derive(Debug, Clone, PartialEq)]
pub enum MeshEvent {
    /// Raw input, mapped through the mesh's input mode
    Input(InputEvent),
    /// An already mapped gesture
    Gesture(Gesture),
}

impl From<InputEvent> for MeshEvent {
    fn from(event: InputEvent) -> Self {
        MeshEvent::Input(event)
    }
}

impl From<Gesture> for MeshEvent {
    fn from(gesture: Gesture) -> Self {
        MeshEvent::Gesture(gesture)
    }
}

pub type MeshSender = mpsc::UnboundedSender<MeshEvent>;

/// A mesh driven by tokio timers
#[derive(Debug)]
pub struct MeshRuntime {
    mesh: Mesh,
    origin: Instant,
    events: mpsc::UnboundedReceiver<MeshEvent>,
}

impl MeshRuntime {
    /// Build the mesh on a [`TokioClock`]
    ///
    /// Must be called from within a tokio runtime. Any clock set on the
    /// builder is replaced.
    pub fn new(builder: MeshBuilder) -> Result<(Self, MeshSender)> {
        let clock = TokioClock::new();
        let mesh = builder.clock(Arc::new(clock)).build()?;
        let (sender, events) = mpsc::unbounded_channel();
        Ok((
            Self {
                mesh,
                origin: clock.origin(),
                events,
            },
            sender,
        ))
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Process events and timers until every sender is dropped
    pub async fn run(mut self) -> Mesh {
        loop {
            let deadline = self.mesh.next_deadline().map(|due| self.origin + due);
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => self.dispatch(event),
                    None => break,
                },
                _ = wait_until(deadline) => {
                    self.mesh.tick();
                }
            }
        }

        let report = self.mesh.flush();
        tracing::debug!(
            rendered = report.rendered,
            saved = report.saved,
            "event channel closed, flushed pending work"
        );
        self.mesh
    }

    fn dispatch(&mut self, event: MeshEvent) {
        let outcome = match event {
            MeshEvent::Input(input) => self.mesh.handle_input(&input).map(|_| ()),
            MeshEvent::Gesture(gesture) => self.mesh.handle(gesture),
        };
        if let Err(err) = outcome {
            tracing::warn!(error = %err, "ignoring event");
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
