//! Mesh configuration
//!
//! Option names follow the markup-facing API (`dragSpeed`, `saveDelay`, ...)
//! so a configuration can be written in TOML exactly as it is documented:
//!
//! ```toml
//! dragSpeed = 2
//! updateDelay = 50
//! saveDelay = 300
//! decimalPlaces = 2
//! prefix = "data-mesh-"
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{MeshError, Result};

/// Default attribute prefix
pub const DEFAULT_PREFIX: &str = "data-mesh-";

/// User-facing mesh options
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeshConfig {
    /// How fast a dragged source changes; higher is faster
    pub drag_speed: f64,
    /// Quiet period (ms) before a source value is persisted
    pub save_delay: u64,
    /// Quiet period (ms) before targets are recomputed
    pub update_delay: u64,
    /// Places used when a target's decimal attribute has no usable value
    pub decimal_places: u32,
    /// Persist source values; defaults to whether a store is available
    pub save: Option<bool>,
    /// Attribute prefix, including the trailing hyphen
    pub prefix: String,
    /// Listen for touch rather than mouse input; defaults to the host's capability
    pub touch: Option<bool>,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            drag_speed: 1.0,
            save_delay: 300,
            update_delay: 50,
            decimal_places: 2,
            save: None,
            prefix: DEFAULT_PREFIX.to_string(),
            touch: None,
        }
    }
}

impl MeshConfig {
    /// Parse a TOML configuration, filling unspecified options with defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: MeshConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.drag_speed.is_finite() || self.drag_speed <= 0.0 {
            return Err(MeshError::Config(format!(
                "dragSpeed must be a positive number, got {}",
                self.drag_speed
            )));
        }
        if self.prefix.is_empty() {
            return Err(MeshError::Config("prefix must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn save_delay(&self) -> Duration {
        Duration::from_millis(self.save_delay)
    }

    pub fn update_delay(&self) -> Duration {
        Duration::from_millis(self.update_delay)
    }

    /// Persistence key for a source
    pub fn storage_key(&self, source: &str) -> String {
        format!("{}{}", self.prefix, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MeshConfig::default();
        assert_eq!(config.drag_speed, 1.0);
        assert_eq!(config.save_delay(), Duration::from_millis(300));
        assert_eq!(config.update_delay(), Duration::from_millis(50));
        assert_eq!(config.decimal_places, 2);
        assert_eq!(config.prefix, "data-mesh-");
        assert_eq!(config.save, None);
        assert_eq!(config.touch, None);
    }

    #[test]
    fn test_toml_uses_camel_case_names() {
        let config = MeshConfig::from_toml_str(
            r#"
            dragSpeed = 2.5
            saveDelay = 1000
            save = false
            prefix = "data-x-"
            "#,
        )
        .unwrap();

        assert_eq!(config.drag_speed, 2.5);
        assert_eq!(config.save_delay, 1000);
        assert_eq!(config.update_delay, 50);
        assert_eq!(config.save, Some(false));
        assert_eq!(config.storage_key("bananas"), "data-x-bananas");
    }

    #[test]
    fn test_rejects_bad_drag_speed() {
        assert!(matches!(
            MeshConfig::from_toml_str("dragSpeed = 0"),
            Err(MeshError::Config(_))
        ));
        assert!(matches!(
            MeshConfig::from_toml_str("dragSpeed = -1.0"),
            Err(MeshError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(matches!(
            MeshConfig::from_toml_str("dragSpeed = "),
            Err(MeshError::ConfigParse(_))
        ));
    }
}
