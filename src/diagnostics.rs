// ABOUTME: Diagnostics accumulator for non-fatal warnings during a container run.
// ABOUTME: Collects engine warnings and cleanup failures that must not mask the real error.

/// Collects non-fatal warnings during container lifecycle operations.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

/// A non-fatal warning collected during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// A warning the engine attached to a create response.
    pub fn engine(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::EngineWarning,
            message: message.into(),
        }
    }

    /// A cleanup step failed after an earlier error was already recorded.
    pub fn cleanup_failed(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::CleanupFailed,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Reported by the engine when creating a container.
    EngineWarning,
    /// A hook, kill, or removal failed after the run had already failed.
    CleanupFailed,
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
    fn diagnostics_collects_warnings_in_order() {
        let mut diag = Diagnostics::default();

        diag.warn(Warning::engine("kernel does not support swap limit"));
        diag.warn(Warning::cleanup_failed("remove failed"));

        let warnings = diag.into_warnings();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].kind, WarningKind::EngineWarning);
        assert_eq!(warnings[1].kind, WarningKind::CleanupFailed);
    }
}
