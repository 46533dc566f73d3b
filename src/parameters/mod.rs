//! Parameter and output resolution engine.
//!
//! Values flow through three stages:
//!
//! 1. **Locking** ([`lock_parameters`]): stack-level parameters get their final
//!    values. Empty user parameters are filled from the environment or a prompt
//!    callback, then every templated value is expanded once, in order.
//! 2. **Component expansion** ([`expand_parameters`]): each component's declared
//!    parameters are resolved against the locked parameters and the outputs
//!    captured from previously deployed components, walking its dependencies.
//! 3. **Output expansion** ([`merge_output`], [`expand_requested_outputs`]):
//!    outputs captured after a deploy are merged, and the stack's requested outputs
//!    are derived from everything known.
//!
//! # Naming
//!
//! Every value lives in a [`Namespace`] under a [`Key`]:
//!
//! | Form | Meaning |
//! |------|---------|
//! | `name` | stack-level parameter |
//! | `name\|component` | parameter scoped to a component |
//! | `component:name` | output captured from a component |
//!
//! # Templates
//!
//! A value may embed `${ref}` markers, replaced by the value `ref` resolves to,
//! and `#{expr}` markers, evaluated by an [`ExpressionEvaluator`]. Substituted
//! values are expanded recursively up to a depth bound.
//!
//! # Faults
//!
//! Nothing in this module aborts a batch because of one bad value. Misses, loops
//! and failed expressions leave a visible placeholder in the value and a
//! [`HubError`](crate::core::HubError) in the caller's
//! [`Diagnostics`](crate::core::Diagnostics); the caller then applies its force
//! policy with [`Diagnostics::escalate`](crate::core::Diagnostics::escalate).

mod component;
mod expansion;
mod expression;
mod key;
mod lock;
mod model;
mod namespace;
pub mod outputs;
mod scanner;

pub use component::{component_namespace, expand_parameters};
pub use expansion::{Expander, Scope};
pub use expression::{ExpressionEvaluator, Resolve, TeraEvaluator};
pub use key::{Key, OUTPUT_SEPARATOR, PARAMETER_SEPARATOR, output_qname, parameter_qname};
pub use lock::{AskFn, EnvLookup, ParameterLocker, lock_parameters};
pub use model::{
    CapturedOutput, CapturedOutputs, EmptyPolicy, ExpandedOutput, LockedParameter,
    LockedParameters, Parameter, ParameterKind, RequestedOutput, flatten_parameters,
};
pub use namespace::{Namespace, find_value};
pub use outputs::{expand_requested_outputs, merge_output, merge_outputs};
pub use scanner::{
    Marker, MarkerKind, MarkerScanner, contains_expression_markers, contains_markers,
};
