//! Error handling for stackhub
//!
//! This module provides the strongly-typed [`HubError`] enum used by the parameter
//! engine and the storage layer, together with [`ErrorContext`] for user-friendly
//! reporting in the CLI.
//!
//! # Error Categories
//!
//! - **Classification**: [`HubError::UnsupportedScheme`], [`HubError::InvalidLocation`].
//!   Fatal for the one location only.
//! - **Not found**: [`HubError::NotFound`]. Kept distinct from every other read error
//!   (see [`HubError::is_not_found`]) so callers can create the file on first write.
//! - **Resolution**: [`HubError::UnknownReference`], [`HubError::ProbableLoop`],
//!   [`HubError::UnresolvedParameter`], [`HubError::UnresolvedOutput`],
//!   [`HubError::Expression`]. Collected in a [`Diagnostics`](super::Diagnostics)
//!   sink, never aborting a batch.
//! - **Storage**: [`HubError::Locked`], [`HubError::Throttled`], [`HubError::Timeout`],
//!   [`HubError::Backend`], [`HubError::Codec`], [`HubError::NoReplicas`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use stackhub_cli::core::{HubError, user_friendly_error};
//!
//! let error = HubError::NotFound {
//!     kind: "state".to_string(),
//!     locations: vec!["s3://bucket/stack/hub.state".to_string()],
//! };
//! assert!(error.is_not_found());
//!
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for stackhub operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    /// Location has a `://` but is not a valid URL
    #[error("Invalid location '{location}': {reason}")]
    InvalidLocation {
        /// The raw location string
        location: String,
        /// Why parsing failed
        reason: String,
    },

    /// Location URL uses a scheme no backend serves
    #[error("Unsupported storage scheme '{scheme}' in '{location}'")]
    UnsupportedScheme {
        /// The scheme found in the URL
        scheme: String,
        /// The raw location string
        location: String,
    },

    /// No replica of a logical file exists
    #[error("No {kind} file found at any of: {}", locations.join(", "))]
    NotFound {
        /// Logical file kind (`state`, `parameters`, ...)
        kind: String,
        /// Every location that was checked
        locations: Vec<String>,
    },

    /// None of the given locations could be classified
    #[error("No usable {kind} locations given")]
    NoReplicas {
        /// Logical file kind
        kind: String,
    },

    /// A `<path>.lock` sentinel guards the replica
    #[error("Replica '{path}' is locked by '{path}.lock'")]
    Locked {
        /// Replica location
        path: String,
    },

    /// The backend rejected the call because of request rate
    #[error("Backend throttled {operation} of '{path}': {message}")]
    Throttled {
        /// Operation attempted (`write`, `read`, `stat`)
        operation: String,
        /// Replica location
        path: String,
        /// Backend message
        message: String,
    },

    /// A network call did not complete in time
    #[error("Timed out after {seconds}s during {operation} of '{path}'")]
    Timeout {
        /// Operation attempted
        operation: String,
        /// Replica location
        path: String,
        /// Configured timeout
        seconds: u64,
    },

    /// Any other backend failure
    #[error("Failed to {operation} '{path}': {message}")]
    Backend {
        /// Operation attempted
        operation: String,
        /// Replica location
        path: String,
        /// Underlying error message
        message: String,
    },

    /// Compression or encryption failure
    #[error("Codec error: {message}")]
    Codec {
        /// Description of the failure
        message: String,
    },

    /// A reference did not resolve in the namespace
    #[error("Unknown reference '{reference}' in '{owner}'{}", format_suggestions(suggestions))]
    UnknownReference {
        /// The reference as written inside the marker
        reference: String,
        /// Qualified name of the value being expanded
        owner: String,
        /// Similar namespace keys
        suggestions: Vec<String>,
    },

    /// Expansion recursed past the depth bound
    #[error("Probable loop expanding '{name}' at depth {depth}: value '{value}'")]
    ProbableLoop {
        /// Qualified name of the parameter
        name: String,
        /// Value being expanded when the bound was hit
        value: String,
        /// Depth reached
        depth: usize,
    },

    /// A component parameter has no value, default, or stack binding
    #[error("Parameter '{name}' has no value")]
    UnresolvedParameter {
        /// Qualified parameter name
        name: String,
    },

    /// A requested output still contains markers after substitution
    #[error("Output '{name}' did not resolve to a value: '{value}'")]
    UnresolvedOutput {
        /// Output name
        name: String,
        /// Partially substituted value
        value: String,
    },

    /// The expression evaluator rejected an expression
    #[error("Failed to evaluate '#{{{expression}}}' in '{owner}': {message}")]
    Expression {
        /// Expression text
        expression: String,
        /// Qualified name of the value being expanded
        owner: String,
        /// Evaluator message
        message: String,
    },

    /// Failure asking the user for a parameter value
    #[error("Failed to obtain value for '{name}': {message}")]
    Prompt {
        /// Qualified parameter name
        name: String,
        /// Callback error
        message: String,
    },

    /// Local filesystem error outside of a replica operation
    #[error("I/O error on '{path}': {message}")]
    Io {
        /// Path involved
        path: String,
        /// Underlying message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error
        message: String,
    },

    /// Several independent errors escalated together
    #[error("{} error(s):\n  {}", errors.len(), errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n  "))]
    Multiple {
        /// The collected errors
        errors: Vec<HubError>,
    },
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean {}?)", suggestions.join(", "))
    }
}

impl HubError {
    /// Whether this is the "no replica exists" condition.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this error is a transient throttling rejection.
    #[must_use]
    pub const fn is_throttling(&self) -> bool {
        matches!(self, Self::Throttled { .. })
    }

    /// Whether this error comes from reference resolution.
    #[must_use]
    pub const fn is_resolution(&self) -> bool {
        matches!(
            self,
            Self::UnknownReference { .. }
                | Self::ProbableLoop { .. }
                | Self::UnresolvedParameter { .. }
                | Self::UnresolvedOutput { .. }
                | Self::Expression { .. }
        )
    }
}

/// Error wrapper with a suggestion and details for CLI display.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error message
    pub error: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub fn new(error: impl fmt::Display) -> Self {
        Self {
            error: error.to_string(),
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with a suggestion where one is known.
///
/// Walks the `anyhow` chain looking for a [`HubError`]; context messages added
/// with `.context(..)` are kept as details.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let hub_error = error.chain().find_map(|e| e.downcast_ref::<HubError>());

    let Some(hub_error) = hub_error else {
        return ErrorContext::new(format!("{error:#}"));
    };

    let mut ctx = ErrorContext::new(hub_error);
    if error.to_string() != hub_error.to_string() {
        ctx = ctx.with_details(error.to_string());
    }

    match hub_error {
        HubError::NotFound { .. } => ctx.with_suggestion(
            "Check the locations, or write the file first; a missing file is created on first write",
        ),
        HubError::UnsupportedScheme { .. } => {
            ctx.with_suggestion("Use s3://, gs://, az:// or a plain filesystem path")
        }
        HubError::Locked { .. } => ctx.with_suggestion(
            "Another run may be in progress; remove the .lock file or pass --force",
        ),
        HubError::Throttled { .. } | HubError::Timeout { .. } => {
            ctx.with_suggestion("Retry the command; the backend may be temporarily unavailable")
        }
        HubError::Codec { .. } => ctx.with_suggestion(
            "Check that the encryption key matches the one used to write the file",
        ),
        HubError::Multiple { .. } => {
            ctx.with_suggestion("Pass --force to downgrade resolution errors to warnings")
        }
        _ => ctx,
    }
}
