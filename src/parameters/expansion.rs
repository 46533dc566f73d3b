//! Recursive substitution of `${ref}` and `#{expr}` markers.
//!
//! Each marker is resolved against a [`Scope`] (owner component, dependency list,
//! namespace). When the substituted text itself contains markers it is expanded
//! first, one level deeper, and then spliced in. Misses become a visible
//! `(unknown)` placeholder and an error in the [`Diagnostics`]; reaching the depth
//! bound abandons the value as `(loop)`. Nothing here aborts a batch.

use super::expression::ExpressionEvaluator;
use super::namespace::{Namespace, find_value};
use super::scanner::{MarkerKind, MarkerScanner, contains_markers};
use crate::constants::{LOOP_PLACEHOLDER, MAX_EXPANSION_DEPTH, UNKNOWN_PLACEHOLDER};
use crate::core::{Diagnostics, HubError};

/// Where references are resolved from.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    /// Component owning the value; empty for stack-level parameters
    pub owner: &'a str,
    /// Declared dependencies, in precedence order
    pub dependencies: &'a [String],
    pub namespace: &'a Namespace,
}

impl<'a> Scope<'a> {
    #[must_use]
    pub const fn new(owner: &'a str, dependencies: &'a [String], namespace: &'a Namespace) -> Self {
        Self {
            owner,
            dependencies,
            namespace,
        }
    }

    /// Stack-level scope: no owner, no dependencies.
    #[must_use]
    pub const fn global(namespace: &'a Namespace) -> Self {
        Self {
            owner: "",
            dependencies: &[],
            namespace,
        }
    }

    fn lookup(&self, reference: &str) -> Option<&'a str> {
        find_value(reference, self.owner, self.dependencies, self.namespace)
    }
}

/// Template expansion engine.
pub struct Expander<'e> {
    evaluator: &'e dyn ExpressionEvaluator,
    max_depth: usize,
}

impl<'e> Expander<'e> {
    #[must_use]
    pub fn new(evaluator: &'e dyn ExpressionEvaluator) -> Self {
        Self {
            evaluator,
            max_depth: MAX_EXPANSION_DEPTH,
        }
    }

    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Expand `value` for the parameter qualified as `name`.
    ///
    /// Returns the fully substituted string; problems are recorded in `diagnostics`.
    /// A value without markers comes back unchanged.
    pub fn expand(
        &self,
        name: &str,
        value: &str,
        scope: Scope<'_>,
        diagnostics: &mut Diagnostics,
    ) -> String {
        self.expand_at(name, value, scope, 0, diagnostics)
    }

    fn expand_at(
        &self,
        name: &str,
        value: &str,
        scope: Scope<'_>,
        depth: usize,
        diagnostics: &mut Diagnostics,
    ) -> String {
        if depth >= self.max_depth {
            diagnostics.error(HubError::ProbableLoop {
                name: name.to_string(),
                value: value.to_string(),
                depth,
            });
            return LOOP_PLACEHOLDER.to_string();
        }

        let mut out = String::with_capacity(value.len());
        let mut last = 0;

        for marker in MarkerScanner::new(value) {
            out.push_str(&value[last..marker.start]);
            last = marker.end;

            let substituted = match marker.kind {
                MarkerKind::Plain => match scope.lookup(marker.content) {
                    Some(found) => found.to_string(),
                    None => {
                        diagnostics.error(HubError::UnknownReference {
                            reference: marker.content.to_string(),
                            owner: name.to_string(),
                            suggestions: scope.namespace.suggestions(marker.content),
                        });
                        UNKNOWN_PLACEHOLDER.to_string()
                    }
                },
                MarkerKind::Expression => {
                    let resolve = |n: &str| scope.lookup(n).map(str::to_string);
                    match self.evaluator.evaluate(marker.content, &resolve) {
                        Ok(result) => result,
                        Err(e) => {
                            diagnostics.error(HubError::Expression {
                                expression: marker.content.to_string(),
                                owner: name.to_string(),
                                message: format!("{e:#}"),
                            });
                            UNKNOWN_PLACEHOLDER.to_string()
                        }
                    }
                }
            };

            if contains_markers(&substituted) {
                let nested = self.expand_at(name, &substituted, scope, depth + 1, diagnostics);
                out.push_str(&nested);
            } else {
                out.push_str(&substituted);
            }
        }

        out.push_str(&value[last..]);

        if depth == 0 && last > 0 {
            tracing::debug!("Expanded {} = {}", name, out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::Key;
    use crate::parameters::expression::TeraEvaluator;

    fn namespace(entries: &[(&str, &str)]) -> Namespace {
        let mut ns = Namespace::new();
        for (k, v) in entries {
            ns.insert(Key::parse(k), *v);
        }
        ns
    }

    #[test]
    fn test_identity_without_markers() {
        let eval = TeraEvaluator::new();
        let expander = Expander::new(&eval);
        let ns = Namespace::new();
        let mut diags = Diagnostics::new();
        for value in ["", "plain", "cost $5 {x}", "#hash"] {
            assert_eq!(expander.expand("p", value, Scope::global(&ns), &mut diags), value);
        }
        assert!(diags.is_empty());
    }

    #[test]
    fn test_three_hop_chain() {
        let eval = TeraEvaluator::new();
        let expander = Expander::new(&eval);
        let ns = namespace(&[("a", "${b}"), ("b", "${c}"), ("c", "x")]);
        let mut diags = Diagnostics::new();

        let out = expander.expand("a", "${b}", Scope::global(&ns), &mut diags);
        assert_eq!(out, "x");
        assert!(!diags.has_errors());
    }

    #[test]
    fn test_self_reference_is_a_loop() {
        let eval = TeraEvaluator::new();
        let expander = Expander::new(&eval);
        let ns = namespace(&[("a", "${a}")]);
        let mut diags = Diagnostics::new();

        let out = expander.expand("a", "${a}", Scope::global(&ns), &mut diags);
        assert_eq!(out, "(loop)");
        assert_eq!(diags.errors().len(), 1);
        assert!(diags.errors()[0].to_string().contains("loop"));
    }

    #[test]
    fn test_mutual_reference_is_a_loop() {
        let eval = TeraEvaluator::new();
        let expander = Expander::new(&eval);
        let ns = namespace(&[("a", "${b}"), ("b", "${a}")]);
        let mut diags = Diagnostics::new();

        let out = expander.expand("a", "pre-${b}", Scope::global(&ns), &mut diags);
        assert_eq!(out, "pre-(loop)");
        assert!(matches!(diags.errors()[0], HubError::ProbableLoop { depth: 10, .. }));
    }

    #[test]
    fn test_unknown_reference_keeps_scanning() {
        let eval = TeraEvaluator::new();
        let expander = Expander::new(&eval);
        let ns = namespace(&[("known", "k")]);
        let mut diags = Diagnostics::new();

        let out =
            expander.expand("p", "${missing}/${known}/${other}", Scope::global(&ns), &mut diags);
        assert_eq!(out, "(unknown)/k/(unknown)");
        assert_eq!(diags.errors().len(), 2);
    }

    #[test]
    fn test_expression_marker() {
        let eval = TeraEvaluator::new();
        let expander = Expander::new(&eval);
        let ns = namespace(&[("replicas", "2"), ("name", "${prefix}-api"), ("prefix", "prod")]);
        let mut diags = Diagnostics::new();

        let out = expander.expand("p", "n=#{replicas + 1}", Scope::global(&ns), &mut diags);
        assert_eq!(out, "n=3");

        // A name bound to a template is expanded after evaluation.
        let out = expander.expand("p", "#{name}", Scope::global(&ns), &mut diags);
        assert_eq!(out, "prod-api");
        assert!(!diags.has_errors());
    }

    #[test]
    fn test_failed_expression_is_unknown() {
        let eval = TeraEvaluator::new();
        let expander = Expander::new(&eval);
        let ns = Namespace::new();
        let mut diags = Diagnostics::new();

        let out = expander.expand("p", "#{nope.nothing}", Scope::global(&ns), &mut diags);
        assert_eq!(out, "(unknown)");
        assert!(matches!(diags.errors()[0], HubError::Expression { .. }));
    }

    #[test]
    fn test_component_scope_uses_dependencies() {
        let eval = TeraEvaluator::new();
        let expander = Expander::new(&eval);
        let ns = namespace(&[("db:endpoint", "db.internal"), ("port|db", "5432")]);
        let deps = vec!["db".to_string()];
        let mut diags = Diagnostics::new();

        let out = expander.expand(
            "url|app",
            "postgres://${endpoint}:${port}",
            Scope::new("app", &deps, &ns),
            &mut diags,
        );
        assert_eq!(out, "postgres://db.internal:5432");
    }

    #[test]
    fn test_custom_depth_bound() {
        let eval = TeraEvaluator::new();
        let expander = Expander::new(&eval).with_max_depth(1);
        let ns = namespace(&[("a", "${b}"), ("b", "${c}"), ("c", "x")]);
        let mut diags = Diagnostics::new();

        let out = expander.expand("a", "${b}", Scope::global(&ns), &mut diags);
        assert_eq!(out, "(loop)");
    }
}
