//! Scene file handling
//!
//! A scene describes the elements of a document and, optionally, a script of
//! gestures to replay against them:
//!
//! ```toml
//! [config]
//! dragSpeed = 1
//!
//! [[sources]]
//! text = "6"
//! attributes = { data-mesh-source = "bananas", data-mesh-positive = "" }
//!
//! [[targets]]
//! text = "2"
//! attributes = { data-mesh-target = "@bananas / (@others + 1)" }
//!
//! [[script]]
//! at = 0
//! event = "start"
//! source = "bananas"
//! y = 200
//! ```

use anyhow::{Context, Result};
use indexmap::IndexMap;
use mesh_core::{AttributeNames, Gesture, MeshConfig, SourceSpec, TargetSpec};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// A scene file
#[derive(Debug, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub config: MeshConfig,
    #[serde(default)]
    pub sources: Vec<Element>,
    #[serde(default)]
    pub targets: Vec<Element>,
    #[serde(default)]
    pub script: Vec<ScriptStep>,
}

/// One element: its attributes and displayed text
#[derive(Debug, Deserialize)]
pub struct Element {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attributes: IndexMap<String, String>,
}

/// A gesture replayed `at` milliseconds into the session
#[derive(Debug, Deserialize)]
pub struct ScriptStep {
    pub at: u64,
    #[serde(flatten)]
    pub action: ScriptAction,
}

impl ScriptStep {
    pub fn time(&self) -> Duration {
        Duration::from_millis(self.at)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ScriptAction {
    Start { source: String, y: f64 },
    Move { y: f64 },
    End,
    Reset { source: String },
}

impl From<ScriptAction> for Gesture {
    fn from(action: ScriptAction) -> Self {
        match action {
            ScriptAction::Start { source, y } => Gesture::Start { source, y },
            ScriptAction::Move { y } => Gesture::Move { y },
            ScriptAction::End => Gesture::End,
            ScriptAction::Reset { source } => Gesture::Reset { source },
        }
    }
}

impl Scene {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut scene: Scene = toml::from_str(content)?;
        scene.config.validate()?;
        // Replay in time order; steps sharing a time keep file order
        scene.script.sort_by_key(|step| step.at);
        Ok(scene)
    }

    pub fn attribute_names(&self) -> AttributeNames {
        AttributeNames::new(&self.config.prefix)
    }

    pub fn source_specs(&self) -> Result<Vec<SourceSpec>> {
        let names = self.attribute_names();
        self.sources
            .iter()
            .enumerate()
            .map(|(index, element)| {
                SourceSpec::from_attributes(&names, &element.attributes, &element.text)
                    .with_context(|| format!("sources[{index}]"))
            })
            .collect()
    }

    pub fn target_specs(&self) -> Result<Vec<TargetSpec>> {
        let names = self.attribute_names();
        self.targets
            .iter()
            .enumerate()
            .map(|(index, element)| {
                TargetSpec::from_attributes(&names, &element.attributes, &element.text)
                    .with_context(|| format!("targets[{index}]"))
            })
            .collect()
    }
}
