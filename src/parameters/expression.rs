//! Expression evaluation for `#{...}` markers.
//!
//! The expansion engine only depends on the narrow [`ExpressionEvaluator`]
//! capability. [`TeraEvaluator`] is the default implementation: it binds every
//! name the expression mentions into a Tera context and renders `{{ expr }}`.

use anyhow::{Context as _, Result};
use regex::Regex;
use serde_json::{Map, Value};
use tera::{Context as TeraContext, Tera};

/// Name lookup handed to an evaluator.
pub type Resolve<'a> = dyn Fn(&str) -> Option<String> + 'a;

/// Evaluates the text inside a `#{...}` marker to a string.
pub trait ExpressionEvaluator {
    /// Evaluate `expression`, looking up names through `resolve`.
    fn evaluate(&self, expression: &str, resolve: &Resolve<'_>) -> Result<String>;
}

/// Tera-backed evaluator.
///
/// Identifiers, including dotted paths such as `dns.domain`, are resolved through
/// the callback and nested into the context (`{"dns": {"domain": ..}}`). Values that
/// parse as numbers or booleans are bound as such so arithmetic and comparisons work.
///
/// ```
/// use stackhub_cli::parameters::{ExpressionEvaluator, TeraEvaluator};
///
/// let eval = TeraEvaluator::new();
/// let resolve = |name: &str| match name {
///     "dns.domain" => Some("example.com".to_string()),
///     "port" => Some("8080".to_string()),
///     _ => None,
/// };
/// assert_eq!(eval.evaluate("dns.domain | upper", &resolve).unwrap(), "EXAMPLE.COM");
/// assert_eq!(eval.evaluate("port + 1", &resolve).unwrap(), "8081");
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct TeraEvaluator;

impl TeraEvaluator {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Build the context object from every identifier the callback knows.
    fn bind_identifiers(expression: &str, resolve: &Resolve<'_>) -> Result<Value> {
        let literals = Regex::new(r#""[^"]*"|'[^']*'|`[^`]*`"#)?;
        let identifiers = Regex::new(r"[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*")?;

        let code = literals.replace_all(expression, " ");
        let mut root = Map::new();

        for m in identifiers.find_iter(&code) {
            let path = m.as_str();
            let Some(value) = resolve(path) else {
                tracing::trace!("Expression identifier '{}' not bound", path);
                continue;
            };
            insert_path(&mut root, path, typed_value(&value));
        }

        Ok(Value::Object(root))
    }
}

impl ExpressionEvaluator for TeraEvaluator {
    fn evaluate(&self, expression: &str, resolve: &Resolve<'_>) -> Result<String> {
        let bindings = Self::bind_identifiers(expression, resolve)?;
        let context = TeraContext::from_value(bindings)
            .context("Failed to build expression context")?;

        let template = format!("{{{{ {expression} }}}}");
        Tera::one_off(&template, &context, false).map_err(|e| {
            let mut message = e.to_string();
            let mut source = std::error::Error::source(&e);
            while let Some(inner) = source {
                message = format!("{message}: {inner}");
                source = inner.source();
            }
            anyhow::anyhow!(message.replace("'__tera_one_off'", "expression"))
        })
    }
}

/// Insert `value` at a dotted `path`.
///
/// When a name and a dotted name below it are both bound (`dns` and
/// `dns.domain`), the first binding wins and the other is dropped.
fn insert_path(root: &mut Map<String, Value>, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = root;

    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            if current.contains_key(segment) {
                tracing::debug!("Expression binding '{}' shadowed by a nested binding", path);
            } else {
                current.insert(segment.to_string(), value);
            }
            return;
        }
        let entry = current.entry(segment.to_string()).or_insert_with(|| Value::Object(Map::new()));
        match entry {
            Value::Object(map) => current = map,
            _ => {
                tracing::debug!(
                    "Expression binding '{}' dropped: '{}' is already bound to a value",
                    path,
                    segment
                );
                return;
            }
        }
    }
}

/// Bind numbers and booleans as such only when their text form is preserved
/// exactly; everything else stays a string.
fn typed_value(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        if i.to_string() == raw {
            return Value::from(i);
        }
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() && f.to_string() == raw {
            return Value::from(f);
        }
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}
