//! The value store: current value of every source, by name
//!
//! Names are matched case-insensitively, mirroring how expressions refer to
//! sources (`@Bananas` and `@bananas` are the same variable). The store is
//! owned by the [`Mesh`](crate::Mesh); only the drag path and the initial
//! load write to it.

use indexmap::IndexMap;

/// Mapping from source name to its current (clamped) value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueStore {
    values: IndexMap<String, f64>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str) -> String {
        name.to_lowercase()
    }

    /// Current value of a source
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(&Self::key(name)).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(&Self::key(name))
    }

    pub(crate) fn set(&mut self, name: &str, value: f64) {
        self.values.insert(Self::key(name), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(lowercased name, value)` in source order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

impl<S: AsRef<str>> FromIterator<(S, f64)> for ValueStore {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut store = ValueStore::new();
        for (name, value) in iter {
            store.set(name.as_ref(), value);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_case() {
        let store: ValueStore = [("Bananas", 6.0)].into_iter().collect();
        assert_eq!(store.get("bananas"), Some(6.0));
        assert_eq!(store.get("BANANAS"), Some(6.0));
        assert!(store.contains("Bananas"));
        assert_eq!(store.get("apples"), None);
    }

    #[test]
    fn test_set_replaces_single_entry() {
        let mut store = ValueStore::new();
        store.set("others", 2.0);
        store.set("Others", 3.0);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("others"), Some(3.0));
    }

    #[test]
    fn test_iter_keeps_insertion_order() {
        let store: ValueStore = [("b", 1.0), ("a", 2.0)].into_iter().collect();
        let names: Vec<_> = store.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
