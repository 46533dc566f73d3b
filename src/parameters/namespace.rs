//! The lookup namespace and the dependency-aware name resolver.

use std::collections::HashMap;
use strsim::levenshtein;

use super::key::Key;
use super::model::{CapturedOutputs, LockedParameters};
use crate::constants::SIMILARITY_THRESHOLD_PERCENT;

/// Values visible to expansion, keyed by structured [`Key`].
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    values: HashMap<Key, String>,
}

impl Namespace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite.
    pub fn insert(&mut self, key: Key, value: impl Into<String>) {
        self.values.insert(key, value.into());
    }

    /// Insert only when the key is absent.
    pub fn insert_if_absent(&mut self, key: Key, value: impl Into<String>) {
        self.values.entry(key).or_insert_with(|| value.into());
    }

    #[must_use]
    pub fn get(&self, key: &Key) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, key: &Key) -> bool {
        self.values.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.values.keys()
    }

    /// Add every locked parameter under its qualified key.
    pub fn extend_locked(&mut self, locked: &LockedParameters) {
        for (key, parameter) in locked.iter() {
            self.insert(key.clone(), parameter.value.clone());
        }
    }

    /// Add every output under `component:name`.
    pub fn extend_outputs(&mut self, outputs: &CapturedOutputs) {
        for (key, output) in outputs.iter() {
            self.insert(key.clone(), output.value.clone());
        }
    }

    /// Namespace keys closest to `reference`, at most three.
    #[must_use]
    pub fn suggestions(&self, reference: &str) -> Vec<String> {
        let limit = reference.len() * SIMILARITY_THRESHOLD_PERCENT / 100;
        let mut scored: Vec<_> = self
            .values
            .keys()
            .map(ToString::to_string)
            .map(|key| {
                let distance = levenshtein(reference, &key);
                (key, distance)
            })
            .filter(|(_, distance)| *distance <= limit)
            .collect();
        scored.sort_by(|(a, da), (b, db)| da.cmp(db).then_with(|| a.cmp(b)));
        scored.into_iter().take(3).map(|(key, _)| key).collect()
    }
}

/// Resolve `reference` as seen from `owner`, walking its dependencies.
///
/// A qualified reference (`x|c` or `c:x`) is looked up directly. A bare reference
/// tries, first match wins:
///
/// 1. `reference|owner`
/// 2. `dep:reference` for each dependency, in order
/// 3. `reference|dep` for each dependency, in order
/// 4. bare `reference`
///
/// ```
/// use stackhub_cli::parameters::{Key, Namespace, find_value};
///
/// let mut ns = Namespace::new();
/// ns.insert(Key::parameter("x", "db"), "param");
/// ns.insert(Key::output("db", "x"), "output");
/// ns.insert(Key::global("x"), "global");
///
/// let deps = vec!["db".to_string()];
/// assert_eq!(find_value("x", "app", &deps, &ns), Some("output"));
/// ```
#[must_use]
pub fn find_value<'a>(
    reference: &str,
    owner: &str,
    dependencies: &[String],
    namespace: &'a Namespace,
) -> Option<&'a str> {
    let key = Key::parse(reference);
    if !key.is_global() {
        return namespace.get(&key);
    }

    // With an empty owner this is the bare key, so globals bind first.
    if let Some(value) = namespace.get(&Key::parameter(reference, owner)) {
        return Some(value);
    }

    dependencies
        .iter()
        .find_map(|dep| namespace.get(&Key::output(dep.as_str(), reference)))
        .or_else(|| {
            dependencies
                .iter()
                .find_map(|dep| namespace.get(&Key::parameter(reference, dep.as_str())))
        })
        .or_else(|| namespace.get(&key))
}
