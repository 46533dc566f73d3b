//! Captured output merging and stack-level output expansion.

use super::key::{Key, OUTPUT_SEPARATOR};
use super::model::{CapturedOutput, CapturedOutputs, ExpandedOutput, LockedParameters, RequestedOutput};
use super::namespace::Namespace;
use super::scanner::{MarkerKind, MarkerScanner, contains_markers};
use crate::core::{Diagnostics, HubError};

/// Insert `output`, overwriting any previous value for the same `component:name`.
///
/// Replacing a non-empty value with a different one is reported as a warning.
/// Merging an identical value is silent.
pub fn merge_output(outputs: &mut CapturedOutputs, output: CapturedOutput, diagnostics: &mut Diagnostics) {
    let key = output.key();
    if let Some(existing) = outputs.0.get(&key) {
        if !existing.value.is_empty() && existing.value != output.value {
            diagnostics.warn(
                key.to_string(),
                format!("output value '{}' replaced by '{}'", existing.value, output.value),
            );
        }
    }
    outputs.0.insert(key, output);
}

/// Merge every output in order, last write wins.
pub fn merge_outputs(
    outputs: &mut CapturedOutputs,
    incoming: impl IntoIterator<Item = CapturedOutput>,
    diagnostics: &mut Diagnostics,
) {
    for output in incoming {
        merge_output(outputs, output, diagnostics);
    }
}

/// Derive stack-level outputs from locked parameters and captured outputs.
///
/// Each requested output is handled in exactly one mode:
///
/// - **Reference**: the name contains `:` and is looked up as `component:name`.
///   The result is named after the output part. A miss is omitted, with a warning
///   when `must_exist` is set.
/// - **Template**: the value contains markers. One substitution pass runs against
///   parameters and qualified outputs, with no recursion and no expression
///   evaluation. A reference that misses is omitted like above. Markers left after
///   the pass (from substituted values or `#{}` markers) fail the whole call with
///   [`HubError::UnresolvedOutput`]: stack outputs must resolve to leaf values.
/// - **Literal**: copied as-is.
///
/// # Errors
///
/// Returns [`HubError::UnresolvedOutput`] for a template that does not reduce to a
/// leaf value in one pass.
pub fn expand_requested_outputs(
    parameters: &LockedParameters,
    outputs: &CapturedOutputs,
    requested: &[RequestedOutput],
    must_exist: bool,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<ExpandedOutput>, HubError> {
    let mut namespace = Namespace::new();
    namespace.extend_locked(parameters);
    namespace.extend_outputs(outputs);

    let mut expanded = Vec::with_capacity(requested.len());

    for request in requested {
        if request.name.contains(OUTPUT_SEPARATOR) {
            let key = Key::parse(&request.name);
            match outputs.get(&key) {
                Some(output) => expanded.push(ExpandedOutput {
                    name: key.name().to_string(),
                    value: output.value.clone(),
                    brief: pick(&request.brief, &output.brief),
                    kind: pick(&request.kind, &output.kind),
                }),
                None => report_missing(&request.name, &request.name, must_exist, diagnostics),
            }
            continue;
        }

        if contains_markers(&request.value) {
            let Some(value) = substitute_once(request, &namespace, must_exist, diagnostics) else {
                continue;
            };
            if contains_markers(&value) {
                return Err(HubError::UnresolvedOutput {
                    name: request.name.clone(),
                    value,
                });
            }
            expanded.push(ExpandedOutput {
                name: request.name.clone(),
                value,
                brief: request.brief.clone(),
                kind: request.kind.clone(),
            });
            continue;
        }

        expanded.push(ExpandedOutput {
            name: request.name.clone(),
            value: request.value.clone(),
            brief: request.brief.clone(),
            kind: request.kind.clone(),
        });
    }

    Ok(expanded)
}

/// One pass of `${}` substitution. `None` when a reference is missing.
fn substitute_once(
    request: &RequestedOutput,
    namespace: &Namespace,
    must_exist: bool,
    diagnostics: &mut Diagnostics,
) -> Option<String> {
    let template = &request.value;
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for marker in MarkerScanner::new(template) {
        out.push_str(&template[last..marker.start]);
        last = marker.end;

        if marker.kind == MarkerKind::Expression {
            out.push_str(&template[marker.start..marker.end]);
            continue;
        }
        match namespace.get(&Key::parse(marker.content)) {
            Some(value) => out.push_str(value),
            None => {
                report_missing(&request.name, marker.content, must_exist, diagnostics);
                return None;
            }
        }
    }

    out.push_str(&template[last..]);
    Some(out)
}

fn report_missing(name: &str, reference: &str, must_exist: bool, diagnostics: &mut Diagnostics) {
    if must_exist {
        diagnostics.warn(name, format!("requested output '{reference}' not found"));
    } else {
        tracing::debug!("Skipping output {}: '{}' not found", name, reference);
    }
}

fn pick(preferred: &str, fallback: &str) -> String {
    if preferred.is_empty() { fallback } else { preferred }.to_string()
}
