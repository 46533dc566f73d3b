//! stackhub - parameter resolution and replicated state for infrastructure stacks
//!
//! A stack is an ordered set of components, each deployed by its own tool. Before
//! and between component runs, stackhub works out what every component sees and
//! where the results are kept:
//!
//! - stack parameters are **locked** once, filling user input and expanding
//!   `${name}` references and `#{expression}` markers in declaration order;
//! - each component gets its own **namespace** of parameters and the outputs its
//!   dependencies published, resolved through a fixed fallback chain;
//! - requested stack outputs are **expanded** from parameters and captured outputs;
//! - the resulting state is written to **replicas** on the local filesystem and the
//!   S3, GCS and Azure object stores, and read back from whichever replica is
//!   authoritative.
//!
//! # Core Modules
//!
//! - [`parameters`] - keys, namespaces, locking, expansion and requested outputs
//! - [`storage`] - location classification, replica selection, codec and fan-out writes
//! - [`state`] - the persisted [`state::StackState`] document
//! - [`core`] - [`core::HubError`] and the [`core::Diagnostics`] sink
//! - [`config`] - global configuration (`~/.stackhub/config.toml`)
//! - [`cli`] - the `stackhub` command-line interface
//! - [`utils`] - filesystem helpers
//!
//! # Reference Syntax
//!
//! | Form | Meaning |
//! |------|---------|
//! | `name` | stack-level parameter |
//! | `name\|component` | parameter scoped to a component |
//! | `component:output` | output published by a component |
//! | `${ref}` | substituted with the value of `ref` |
//! | `#{expr}` | evaluated by the expression engine |
//!
//! # Command-Line Usage
//!
//! ```bash
//! # Lock parameters and save them into stack state
//! stackhub lock parameters.yaml --state hub.state --state s3://states/dev/hub.state
//!
//! # Which replica is authoritative?
//! stackhub check hub.state s3://states/dev/hub.state
//!
//! # Expand stack outputs from the saved state
//! stackhub outputs outputs.yaml --state hub.state --state s3://states/dev/hub.state --save
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod parameters;
pub mod state;
pub mod storage;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
