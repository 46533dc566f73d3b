//! Qualified names for parameters and outputs.
//!
//! Parameters qualify as `name|component` (name first) and outputs as
//! `component:name` (component first). The two separators and orderings keep the
//! namespaces from colliding. In memory a key is a structured [`Key`]; the string
//! form is only produced for diagnostics and persisted snapshots.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Separator between parameter name and component.
pub const PARAMETER_SEPARATOR: char = '|';

/// Separator between component and output name.
pub const OUTPUT_SEPARATOR: char = ':';

/// A namespace key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// Unqualified name, visible to every component
    Global(String),
    /// `name|component`
    Parameter { name: String, component: String },
    /// `component:name`
    Output { component: String, name: String },
}

impl Key {
    /// Key for a parameter; an empty component yields the bare name.
    pub fn parameter(name: impl Into<String>, component: impl Into<String>) -> Self {
        let name = name.into();
        let component = component.into();
        if component.is_empty() {
            Self::Global(name)
        } else {
            Self::Parameter {
                name,
                component,
            }
        }
    }

    /// Key for a component output; an empty component yields the bare name.
    pub fn output(component: impl Into<String>, name: impl Into<String>) -> Self {
        let component = component.into();
        let name = name.into();
        if component.is_empty() {
            Self::Global(name)
        } else {
            Self::Output {
                component,
                name,
            }
        }
    }

    pub fn global(name: impl Into<String>) -> Self {
        Self::Global(name.into())
    }

    /// Parse the wire form. Never fails: anything without a separator is global.
    ///
    /// ```
    /// use stackhub_cli::parameters::Key;
    ///
    /// assert_eq!(Key::parse("size|db"), Key::parameter("size", "db"));
    /// assert_eq!(Key::parse("db:endpoint"), Key::output("db", "endpoint"));
    /// assert_eq!(Key::parse("dns.domain"), Key::global("dns.domain"));
    /// ```
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if let Some((name, component)) = s.split_once(PARAMETER_SEPARATOR) {
            return Self::parameter(name, component);
        }
        if let Some((component, name)) = s.split_once(OUTPUT_SEPARATOR) {
            return Self::output(component, name);
        }
        Self::Global(s.to_string())
    }

    /// The unqualified name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Global(name)
            | Self::Parameter {
                name,
                ..
            }
            | Self::Output {
                name,
                ..
            } => name,
        }
    }

    /// The owning component, if qualified.
    #[must_use]
    pub fn component(&self) -> Option<&str> {
        match self {
            Self::Global(_) => None,
            Self::Parameter {
                component,
                ..
            }
            | Self::Output {
                component,
                ..
            } => Some(component),
        }
    }

    #[must_use]
    pub const fn is_global(&self) -> bool {
        matches!(self, Self::Global(_))
    }

    /// The wire form as an owned string.
    #[must_use]
    pub fn qualified(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global(name) => f.write_str(name),
            Self::Parameter {
                name,
                component,
            } => write!(f, "{name}{PARAMETER_SEPARATOR}{component}"),
            Self::Output {
                component,
                name,
            } => write!(f, "{component}{OUTPUT_SEPARATOR}{name}"),
        }
    }
}

impl FromStr for Key {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// Qualified parameter name: `name` or `name|component`.
#[must_use]
pub fn parameter_qname(name: &str, component: &str) -> String {
    Key::parameter(name, component).to_string()
}

/// Qualified output name: `component:name` or `name`.
#[must_use]
pub fn output_qname(component: &str, name: &str) -> String {
    Key::output(component, name).to_string()
}
