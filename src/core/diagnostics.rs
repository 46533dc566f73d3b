//! Diagnostics collected alongside results.
//!
//! Resolution and storage passes never abort on a per-item fault. Instead they
//! record warnings and errors here, and the orchestrating caller decides with
//! [`Diagnostics::escalate`] whether the batch fails. Every entry is also emitted
//! through `tracing`.

use super::error::HubError;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational, never affects control flow
    Info,
    /// Something suspicious that processing tolerated
    Warning,
}

/// A non-error diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Qualified name, location, or other subject the message is about
    pub subject: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.subject, self.message)
    }
}

/// Sink for warnings and collected errors.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    notes: Vec<Diagnostic>,
    errors: Vec<HubError>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an informational note.
    pub fn info(&mut self, subject: impl Into<String>, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            severity: Severity::Info,
            subject: subject.into(),
            message: message.into(),
        };
        tracing::debug!("{}", diagnostic);
        self.notes.push(diagnostic);
    }

    /// Record a warning.
    pub fn warn(&mut self, subject: impl Into<String>, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            severity: Severity::Warning,
            subject: subject.into(),
            message: message.into(),
        };
        tracing::warn!("{}", diagnostic);
        self.notes.push(diagnostic);
    }

    /// Record an error without interrupting the caller.
    pub fn error(&mut self, error: HubError) {
        tracing::error!("{}", error);
        self.errors.push(error);
    }

    /// Warnings only.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.notes.iter().filter(|d| d.severity == Severity::Warning)
    }

    /// All notes, including informational ones.
    #[must_use]
    pub fn notes(&self) -> &[Diagnostic] {
        &self.notes
    }

    #[must_use]
    pub fn errors(&self) -> &[HubError] {
        &self.errors
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.errors.is_empty()
    }

    /// Move everything from `other` into `self`.
    pub fn absorb(&mut self, other: Diagnostics) {
        self.notes.extend(other.notes);
        self.errors.extend(other.errors);
    }

    /// Apply the caller's fatality policy to the collected errors.
    ///
    /// Without errors this is `Ok`. With errors, returns [`HubError::Multiple`]
    /// unless `force` is set, in which case every error is downgraded to a
    /// warning and the collection is cleared.
    pub fn escalate(&mut self, force: bool) -> Result<(), HubError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        if force {
            for error in std::mem::take(&mut self.errors) {
                self.warn("force", error.to_string());
            }
            return Ok(());
        }
        Err(HubError::Multiple {
            errors: std::mem::take(&mut self.errors),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unresolved(name: &str) -> HubError {
        HubError::UnresolvedParameter {
            name: name.to_string(),
        }
    }

    #[test]
    fn test_escalate_without_errors() {
        let mut diags = Diagnostics::new();
        diags.warn("x", "stale default");
        assert!(diags.escalate(false).is_ok());
        assert_eq!(diags.warnings().count(), 1);
    }

    #[test]
    fn test_escalate_fails_with_all_errors() {
        let mut diags = Diagnostics::new();
        diags.error(unresolved("a"));
        diags.error(unresolved("b|c"));

        match diags.escalate(false) {
            Err(HubError::Multiple {
                errors,
            }) => assert_eq!(errors, vec![unresolved("a"), unresolved("b|c")]),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!diags.has_errors());
    }

    #[test]
    fn test_escalate_force_downgrades() {
        let mut diags = Diagnostics::new();
        diags.error(unresolved("a"));

        assert!(diags.escalate(true).is_ok());
        assert!(!diags.has_errors());
        let warnings: Vec<_> = diags.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("'a'"));
    }

    #[test]
    fn test_absorb() {
        let mut a = Diagnostics::new();
        a.info("k", "note");
        let mut b = Diagnostics::new();
        b.error(unresolved("z"));
        a.absorb(b);
        assert_eq!(a.notes().len(), 1);
        assert_eq!(a.errors().len(), 1);
        assert!(!a.is_empty());
    }
}
