//! Parameter and output records.
//!
//! [`Parameter`] and [`RequestedOutput`] arrive from manifest decoding. Locking and
//! expansion turn parameters into immutable [`LockedParameter`] snapshots; component
//! runs publish [`CapturedOutput`]s. The collection types are keyed by [`Key`] and
//! serialise with the qualified string form.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::key::Key;

/// How a parameter takes part in locking and expansion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    /// Regular parameter
    #[default]
    Plain,
    /// Value is asked from the user when empty
    User,
    /// Value is kept verbatim; the consumer resolves it later
    Link,
}

/// What to do when a component parameter resolves to nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyPolicy {
    /// An empty value is an unresolved-parameter error
    #[default]
    Deny,
    /// An empty value is accepted
    Allow,
}

/// A parameter as declared in a stack or component manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub component: String,
    #[serde(default)]
    pub kind: ParameterKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default: String,
    #[serde(default)]
    pub value: String,
    /// Environment variable the locked value is exported as
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub env: String,
    /// Environment variable to read the value from
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub from_env: String,
    #[serde(default)]
    pub empty: EmptyPolicy,
    #[serde(default, rename = "parameters", skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Parameter>,
    /// Set by flattening on a parameter that had children
    #[serde(skip)]
    pub group: bool,
}

impl Parameter {
    /// Shorthand for a plain parameter with a value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = component.into();
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: ParameterKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = default.into();
        self
    }

    #[must_use]
    pub fn key(&self) -> Key {
        Key::parameter(&self.name, &self.component)
    }

    /// `name` or `name|component`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        self.key().to_string()
    }

    #[must_use]
    pub fn is_user(&self) -> bool {
        self.kind == ParameterKind::User
    }

    #[must_use]
    pub fn is_link(&self) -> bool {
        self.kind == ParameterKind::Link
    }

    #[must_use]
    pub fn to_locked(&self) -> LockedParameter {
        LockedParameter {
            name: self.name.clone(),
            component: self.component.clone(),
            value: self.value.clone(),
            env: self.env.clone(),
        }
    }
}

/// Flatten nested parameters into dotted names.
///
/// A child `b` of `a` becomes `a.b`, inheriting `a`'s component when it has none.
/// Parents are kept before their children.
#[must_use]
pub fn flatten_parameters(parameters: &[Parameter]) -> Vec<Parameter> {
    fn walk(prefix: Option<&Parameter>, parameters: &[Parameter], out: &mut Vec<Parameter>) {
        for parameter in parameters {
            let mut flat = parameter.clone();
            if let Some(parent) = prefix {
                flat.name = format!("{}.{}", parent.name, parameter.name);
                if flat.component.is_empty() {
                    flat.component = parent.component.clone();
                }
            }
            let children = std::mem::take(&mut flat.children);
            flat.group = !children.is_empty();
            out.push(flat.clone());
            walk(Some(&flat), &children, out);
        }
    }

    let mut out = Vec::new();
    walk(None, parameters, &mut out);
    out
}

/// Immutable resolved parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedParameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub component: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub env: String,
}

impl LockedParameter {
    #[must_use]
    pub fn key(&self) -> Key {
        Key::parameter(&self.name, &self.component)
    }

    #[must_use]
    pub fn qualified_name(&self) -> String {
        self.key().to_string()
    }
}

/// Locked parameters keyed by qualified name.
///
/// A snapshot is never mutated after a pass produces it; combine snapshots with
/// [`LockedParameters::merged`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockedParameters(BTreeMap<Key, LockedParameter>);

impl LockedParameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &Key) -> Option<&LockedParameter> {
        self.0.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &LockedParameter)> {
        self.0.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &LockedParameter> {
        self.0.values()
    }

    /// New snapshot with `other` layered on top; `other` wins on collision.
    #[must_use]
    pub fn merged(&self, other: &LockedParameters) -> Self {
        let mut map = self.0.clone();
        map.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self(map)
    }
}

impl FromIterator<LockedParameter> for LockedParameters {
    /// Later entries overwrite earlier ones with the same qualified name.
    fn from_iter<I: IntoIterator<Item = LockedParameter>>(iter: I) -> Self {
        Self(iter.into_iter().map(|p| (p.key(), p)).collect())
    }
}

/// A value published by a component after it ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedOutput {
    pub component: String,
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub brief: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

impl CapturedOutput {
    pub fn new(
        component: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            component: component.into(),
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn key(&self) -> Key {
        Key::output(&self.component, &self.name)
    }

    /// `component:name`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        self.key().to_string()
    }
}

/// Captured outputs keyed by qualified name. Entries are added or overwritten,
/// never removed; see [`merge_output`](super::outputs::merge_output).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapturedOutputs(pub(crate) BTreeMap<Key, CapturedOutput>);

impl CapturedOutputs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &Key) -> Option<&CapturedOutput> {
        self.0.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &CapturedOutput)> {
        self.0.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &CapturedOutput> {
        self.0.values()
    }
}

/// A stack-level output as requested in the stack manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedOutput {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub brief: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

impl RequestedOutput {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }
}

/// A stack-level output after substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandedOutput {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub brief: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
}
