//! Markup attribute contract
//!
//! Sources and targets are declared with prefixed attributes:
//!
//! ```html
//! I have <span data-mesh-source="bananas" data-mesh-positive>6</span> bananas
//! to split between me and <span data-mesh-source="others">2</span> others.
//! Each of us gets <span data-mesh-target="@bananas / (@others + 1)">2</span>.
//! ```
//!
//! Scanning a document is the host's job. The host hands each element's
//! attributes to [`SourceSpec::from_attributes`] or
//! [`TargetSpec::from_attributes`], which read them the way browsers read
//! loose numeric text: the longest numeric prefix, with non-numbers meaning
//! "not set". Flags only need to be present.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use crate::config::DEFAULT_PREFIX;
use crate::error::{MeshError, Result};
use crate::numeric::parse_float;
use crate::source::SourceSpec;
use crate::target::TargetSpec;

/// Read access to an element's attributes
pub trait Attributes {
    fn attribute(&self, name: &str) -> Option<&str>;

    fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }
}

impl<S: BuildHasher> Attributes for HashMap<String, String, S> {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl Attributes for BTreeMap<String, String> {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl<S: BuildHasher> Attributes for indexmap::IndexMap<String, String, S> {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl Attributes for [(&str, &str)] {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    }
}

impl<const N: usize> Attributes for [(&str, &str); N] {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.as_slice().attribute(name)
    }
}

/// Attribute names derived from a prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeNames {
    pub source: String,
    pub target: String,
    pub floor: String,
    pub decimal: String,
    pub min: String,
    pub max: String,
    pub positive: String,
    /// Set on the document root while any drag is in progress
    pub active: String,
    pub currency: String,
}

impl AttributeNames {
    pub fn new(prefix: &str) -> Self {
        let name = |suffix: &str| format!("{prefix}{suffix}");
        Self {
            source: name("source"),
            target: name("target"),
            floor: name("floor"),
            decimal: name("decimal"),
            min: name("min"),
            max: name("max"),
            positive: name("positive"),
            active: name("active"),
            currency: name("currency"),
        }
    }
}

impl Default for AttributeNames {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

fn numeric_attribute<A: Attributes + ?Sized>(attrs: &A, name: &str) -> Option<f64> {
    attrs
        .attribute(name)
        .map(parse_float)
        .filter(|value| !value.is_nan())
}

impl SourceSpec {
    /// Build a source from an element's attributes and displayed text
    pub fn from_attributes<A: Attributes + ?Sized>(
        names: &AttributeNames,
        attrs: &A,
        text: &str,
    ) -> Result<Self> {
        let name = attrs
            .attribute(&names.source)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| MeshError::MissingAttribute(names.source.clone()))?;

        Ok(SourceSpec {
            name: name.to_string(),
            text: text.to_string(),
            min: numeric_attribute(attrs, &names.min),
            max: numeric_attribute(attrs, &names.max),
            positive: attrs.has_attribute(&names.positive),
            decimal: attrs.has_attribute(&names.decimal),
        })
    }
}

impl TargetSpec {
    /// Build a target from an element's attributes and displayed text
    pub fn from_attributes<A: Attributes + ?Sized>(
        names: &AttributeNames,
        attrs: &A,
        text: &str,
    ) -> Result<Self> {
        let expression = attrs
            .attribute(&names.target)
            .ok_or_else(|| MeshError::MissingAttribute(names.target.clone()))?;

        Ok(TargetSpec {
            expression: expression.to_string(),
            decimal: attrs.attribute(&names.decimal).map(str::to_string),
            floor: attrs.has_attribute(&names.floor),
            currency: attrs.has_attribute(&names.currency),
            text: text.to_string(),
        })
    }
}
