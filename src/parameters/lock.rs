//! Stack-level parameter locking.
//!
//! Locking fills user-supplied values, builds the initial namespace and expands
//! every templated parameter once, in declaration order. The pass is a single
//! forward sweep: a parameter sees the already-expanded values of the ones
//! declared before it, never the other way round.

use anyhow::Result;

use super::expansion::{Expander, Scope};
use super::model::{LockedParameters, Parameter};
use super::namespace::Namespace;
use super::scanner::contains_markers;
use crate::core::{Diagnostics, HubError};

/// Environment lookup used for `fromEnv` parameters.
pub type EnvLookup<'a> = dyn Fn(&str) -> Option<String> + 'a;

/// Callback asked for the value of an empty `kind: user` parameter.
pub type AskFn<'a> = dyn FnMut(&mut Parameter) -> Result<()> + 'a;

/// Parameter locking pass with an injectable environment.
pub struct ParameterLocker<'a> {
    expander: &'a Expander<'a>,
    environment: Box<EnvLookup<'a>>,
}

impl<'a> ParameterLocker<'a> {
    /// Locker reading `fromEnv` variables from the process environment.
    #[must_use]
    pub fn new(expander: &'a Expander<'a>) -> Self {
        Self {
            expander,
            environment: Box::new(|name| std::env::var(name).ok()),
        }
    }

    #[must_use]
    pub fn with_environment(mut self, environment: impl Fn(&str) -> Option<String> + 'a) -> Self {
        self.environment = Box::new(environment);
        self
    }

    /// Lock `parameters`, mutating their values in place.
    ///
    /// `extra_values` seed the namespace; parameters override them on collision.
    /// Link parameters are never expanded. Every problem is recorded in
    /// `diagnostics` and processing continues.
    pub fn lock(
        &self,
        parameters: &mut [Parameter],
        extra_values: &LockedParameters,
        ask: &mut AskFn<'_>,
        diagnostics: &mut Diagnostics,
    ) -> LockedParameters {
        for parameter in parameters.iter() {
            if !parameter.default.is_empty() && !parameter.is_user() {
                diagnostics.warn(
                    parameter.qualified_name(),
                    format!(
                        "default '{}' is ignored: defaults only apply to `kind: user` parameters",
                        parameter.default
                    ),
                );
            }
        }

        for parameter in parameters.iter_mut() {
            self.fill_value(parameter, ask, diagnostics);
        }

        let mut namespace = Namespace::new();
        namespace.extend_locked(extra_values);
        for parameter in parameters.iter() {
            namespace.insert(parameter.key(), parameter.value.clone());
        }

        for parameter in parameters.iter_mut() {
            if parameter.is_link() || !contains_markers(&parameter.value) {
                continue;
            }
            let qualified = parameter.qualified_name();
            let expanded = self.expander.expand(
                &qualified,
                &parameter.value,
                Scope::new(&parameter.component, &[], &namespace),
                diagnostics,
            );
            namespace.insert(parameter.key(), expanded.clone());
            parameter.value = expanded;
        }

        tracing::debug!("Locked {} parameter(s)", parameters.len());
        parameters.iter().map(Parameter::to_locked).collect()
    }

    fn fill_value(
        &self,
        parameter: &mut Parameter,
        ask: &mut AskFn<'_>,
        diagnostics: &mut Diagnostics,
    ) {
        if !parameter.value.is_empty() {
            return;
        }

        if !parameter.from_env.is_empty() {
            match (self.environment)(&parameter.from_env) {
                Some(value) if !value.is_empty() => {
                    tracing::debug!(
                        "Parameter {} set from ${}",
                        parameter.qualified_name(),
                        parameter.from_env
                    );
                    parameter.value = value;
                    return;
                }
                _ => diagnostics.info(
                    parameter.qualified_name(),
                    format!("environment variable {} is not set", parameter.from_env),
                ),
            }
        }

        if parameter.is_user() && parameter.children.is_empty() && !parameter.group {
            if let Err(e) = ask(parameter) {
                diagnostics.error(HubError::Prompt {
                    name: parameter.qualified_name(),
                    message: format!("{e:#}"),
                });
            }
        }
    }
}

/// Lock `parameters` using the process environment for `fromEnv`.
pub fn lock_parameters(
    parameters: &mut [Parameter],
    extra_values: &LockedParameters,
    ask: &mut AskFn<'_>,
    expander: &Expander<'_>,
    diagnostics: &mut Diagnostics,
) -> LockedParameters {
    ParameterLocker::new(expander).lock(parameters, extra_values, ask, diagnostics)
}
