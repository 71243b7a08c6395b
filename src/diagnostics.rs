// ABOUTME: Diagnostics accumulator for non-fatal warnings during a replay.
// ABOUTME: Collects rejected steps and undelivered events without failing the run.

/// Collects non-fatal warnings during a replay.
#[derive(Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A non-fatal warning collected during a replay.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Create a rejected step warning.
    pub fn rejected_step(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::RejectedStep,
            message: message.into(),
        }
    }

    /// Create a warning for events still in flight when the settle time ran out.
    pub fn unsettled(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Unsettled,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during a replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A step was rejected by the process and skipped.
    RejectedStep,
    /// Event delivery did not finish within the settle time.
    Unsettled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_starts_empty() {
        let diag = Diagnostics::default();
        assert!(!diag.has_warnings());
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn diagnostics_collects_warnings() {
        let mut diag = Diagnostics::default();

        diag.warn(Warning::rejected_step("configuration datasource/main not present"));
        diag.warn(Warning::unsettled("2 events undelivered"));

        assert!(diag.has_warnings());
        assert_eq!(diag.warnings().len(), 2);
    }

    #[test]
    fn warning_constructors_set_correct_kind() {
        let rejected = Warning::rejected_step("test");
        assert_eq!(rejected.kind, WarningKind::RejectedStep);

        let unsettled = Warning::unsettled("test");
        assert_eq!(unsettled.kind, WarningKind::Unsettled);
    }
}
