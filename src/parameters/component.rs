//! Per-component parameter expansion.
//!
//! A component's declared parameters are resolved against the stack's locked
//! parameters plus every captured output, walking the component's dependencies.
//! Each resolved value is pushed back into the namespace so parameters declared
//! later in the same component can reference it.

use super::expansion::{Expander, Scope};
use super::key::Key;
use super::model::{CapturedOutputs, EmptyPolicy, LockedParameter, LockedParameters, Parameter};
use super::namespace::{Namespace, find_value};
use super::scanner::contains_markers;
use crate::constants::{COMPONENT_NAME_BINDING, UNKNOWN_PLACEHOLDER};
use crate::core::{Diagnostics, HubError};

/// Build the namespace a component's parameters resolve against.
///
/// Locked parameters and qualified outputs go in first. Outputs are also bound
/// under their bare name unless a bare stack parameter already holds it. The
/// synthetic `hub.componentName` binding is always set to `component`.
#[must_use]
pub fn component_namespace(
    component: &str,
    locked: &LockedParameters,
    outputs: &CapturedOutputs,
) -> Namespace {
    let mut namespace = Namespace::new();
    namespace.extend_locked(locked);
    namespace.extend_outputs(outputs);
    for output in outputs.values() {
        namespace.insert_if_absent(Key::global(&output.name), output.value.clone());
    }
    namespace.insert(Key::global(COMPONENT_NAME_BINDING), component);
    namespace
}

/// Resolve and expand the parameters a component declares.
///
/// For each parameter, in order:
/// - a value found through [`find_value`] is adopted, then expanded if templated
///   (link parameters stay verbatim);
/// - otherwise the declared value, then the default, is used; a `kind: user`
///   parameter missing from the stack is warned about;
/// - a value that is still empty is accepted under `empty: allow`, else recorded
///   as [`HubError::UnresolvedParameter`] with the `(unknown)` placeholder.
///
/// Errors never stop the remaining parameters; the caller applies its force
/// policy to the collected diagnostics.
pub fn expand_parameters(
    component: &str,
    dependencies: &[String],
    parameters: &[Parameter],
    locked: &LockedParameters,
    outputs: &CapturedOutputs,
    expander: &Expander<'_>,
    diagnostics: &mut Diagnostics,
) -> Vec<LockedParameter> {
    let mut namespace = component_namespace(component, locked, outputs);
    let mut expanded = Vec::with_capacity(parameters.len());

    for parameter in parameters {
        let key = Key::parameter(&parameter.name, component);
        let qualified = key.to_string();

        let found = find_value(&parameter.name, component, dependencies, &namespace)
            .map(str::to_string);

        let mut value = match found {
            Some(value) => value,
            None => {
                if parameter.is_user() {
                    diagnostics.warn(
                        &qualified,
                        "user parameter is not set at stack level; declare it in the stack manifest",
                    );
                }
                if parameter.value.is_empty() {
                    parameter.default.clone()
                } else {
                    parameter.value.clone()
                }
            }
        };

        if value.is_empty() {
            if parameter.empty != EmptyPolicy::Allow {
                diagnostics.error(HubError::UnresolvedParameter {
                    name: qualified.clone(),
                });
                value = UNKNOWN_PLACEHOLDER.to_string();
            }
        } else if !parameter.is_link() && contains_markers(&value) {
            value = expander.expand(
                &qualified,
                &value,
                Scope::new(component, dependencies, &namespace),
                diagnostics,
            );
        }

        namespace.insert(key, value.clone());
        expanded.push(LockedParameter {
            name: parameter.name.clone(),
            component: component.to_string(),
            value,
            env: parameter.env.clone(),
        });
    }

    tracing::debug!("Expanded {} parameter(s) for component {}", expanded.len(), component);
    expanded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::outputs::merge_output;
    use crate::parameters::{CapturedOutput, ParameterKind, TeraEvaluator};

    fn locked(entries: &[(&str, &str, &str)]) -> LockedParameters {
        entries
            .iter()
            .map(|(name, component, value)| {
                Parameter::new(*name, *value).with_component(*component).to_locked()
            })
            .collect()
    }

    fn outputs(entries: &[(&str, &str, &str)]) -> CapturedOutputs {
        let mut outputs = CapturedOutputs::new();
        let mut diags = Diagnostics::new();
        for (component, name, value) in entries {
            merge_output(&mut outputs, CapturedOutput::new(*component, *name, *value), &mut diags);
        }
        outputs
    }

    fn value<'a>(expanded: &'a [LockedParameter], name: &str) -> &'a str {
        expanded
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
            .unwrap_or_default()
    }

    #[test]
    fn test_resolves_from_stack_and_dependency_outputs() {
        let eval = TeraEvaluator::new();
        let expander = Expander::new(&eval);
        let stack = locked(&[("dns.domain", "", "example.com"), ("replicas", "app", "3")]);
        let outs = outputs(&[("db", "endpoint", "db.internal")]);
        let deps = vec!["db".to_string()];
        let params = vec![
            Parameter::new("dns.domain", ""),
            Parameter::new("replicas", ""),
            Parameter::new("endpoint", ""),
            Parameter::new("url", "https://${dns.domain}/${hub.componentName}"),
        ];
        let mut diags = Diagnostics::new();

        let expanded =
            expand_parameters("app", &deps, &params, &stack, &outs, &expander, &mut diags);

        assert_eq!(value(&expanded, "dns.domain"), "example.com");
        assert_eq!(value(&expanded, "replicas"), "3");
        assert_eq!(value(&expanded, "endpoint"), "db.internal");
        assert_eq!(value(&expanded, "url"), "https://example.com/app");
        assert!(expanded.iter().all(|p| p.component == "app"));
        assert!(!diags.has_errors());
    }

    #[test]
    fn test_later_parameters_see_earlier_ones() {
        let eval = TeraEvaluator::new();
        let expander = Expander::new(&eval);
        let params = vec![
            Parameter::new("host", "").with_default("db.local"),
            Parameter::new("dsn", "postgres://${host}:5432"),
        ];
        let mut diags = Diagnostics::new();

        let expanded = expand_parameters(
            "app",
            &[],
            &params,
            &LockedParameters::new(),
            &CapturedOutputs::new(),
            &expander,
            &mut diags,
        );

        assert_eq!(value(&expanded, "dsn"), "postgres://db.local:5432");
    }

    #[test]
    fn test_unresolved_parameters() {
        let eval = TeraEvaluator::new();
        let expander = Expander::new(&eval);
        let mut optional = Parameter::new("optional", "");
        optional.empty = EmptyPolicy::Allow;
        let params = vec![
            Parameter::new("required", ""),
            optional,
            Parameter::new("after", "still-processed"),
        ];
        let mut diags = Diagnostics::new();

        let expanded = expand_parameters(
            "app",
            &[],
            &params,
            &LockedParameters::new(),
            &CapturedOutputs::new(),
            &expander,
            &mut diags,
        );

        assert_eq!(value(&expanded, "required"), "(unknown)");
        assert_eq!(value(&expanded, "optional"), "");
        assert_eq!(value(&expanded, "after"), "still-processed");
        assert_eq!(
            diags.errors(),
            &[HubError::UnresolvedParameter {
                name: "required|app".to_string()
            }]
        );
    }

    #[test]
    fn test_user_parameter_outside_stack_warns() {
        let eval = TeraEvaluator::new();
        let expander = Expander::new(&eval);
        let params =
            vec![Parameter::new("password", "").with_kind(ParameterKind::User).with_default("pw")];
        let mut diags = Diagnostics::new();

        let expanded = expand_parameters(
            "app",
            &[],
            &params,
            &LockedParameters::new(),
            &CapturedOutputs::new(),
            &expander,
            &mut diags,
        );

        assert_eq!(value(&expanded, "password"), "pw");
        assert_eq!(diags.warnings().count(), 1);
    }

    #[test]
    fn test_link_parameter_not_expanded() {
        let eval = TeraEvaluator::new();
        let expander = Expander::new(&eval);
        let params =
            vec![Parameter::new("kubeconfig", "${kube:config}").with_kind(ParameterKind::Link)];
        let mut diags = Diagnostics::new();

        let expanded = expand_parameters(
            "app",
            &[],
            &params,
            &LockedParameters::new(),
            &CapturedOutputs::new(),
            &expander,
            &mut diags,
        );

        assert_eq!(value(&expanded, "kubeconfig"), "${kube:config}");
        assert!(diags.is_empty());
    }

    #[test]
    fn test_bare_output_does_not_shadow_stack_parameter() {
        let stack = locked(&[("endpoint", "", "from-stack")]);
        let outs = outputs(&[("db", "endpoint", "from-output")]);
        let ns = component_namespace("app", &stack, &outs);

        assert_eq!(ns.get(&Key::global("endpoint")), Some("from-stack"));
        assert_eq!(ns.get(&Key::output("db", "endpoint")), Some("from-output"));
        assert_eq!(ns.get(&Key::global("hub.componentName")), Some("app"));
    }
}
