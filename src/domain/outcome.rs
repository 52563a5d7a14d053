//! Aggregate export verdict

use std::fmt;

/// Aggregate verdict over all attempted submissions of one form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Every submission was exported (also reported when there was nothing
    /// to export).
    AllExported,
    /// At least one submission was exported and at least one skipped.
    SomeSkipped,
    /// There were submissions but none could be exported.
    AllSkipped,
}

impl ExportOutcome {
    /// Computes the outcome from the final tracker counters.
    pub fn from_counts(total: usize, exported: usize, skipped: usize) -> Self {
        if total == 0 {
            return ExportOutcome::AllExported;
        }
        if skipped == 0 && exported > 0 {
            ExportOutcome::AllExported
        } else if exported == 0 {
            ExportOutcome::AllSkipped
        } else {
            ExportOutcome::SomeSkipped
        }
    }
}

impl fmt::Display for ExportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExportOutcome::AllExported => "all exported",
            ExportOutcome::SomeSkipped => "some skipped",
            ExportOutcome::AllSkipped => "all skipped",
        };
        write!(f, "{label}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_counts() {
        assert_eq!(
            ExportOutcome::from_counts(0, 0, 0),
            ExportOutcome::AllExported
        );
        assert_eq!(
            ExportOutcome::from_counts(3, 3, 0),
            ExportOutcome::AllExported
        );
        assert_eq!(
            ExportOutcome::from_counts(3, 2, 1),
            ExportOutcome::SomeSkipped
        );
        assert_eq!(
            ExportOutcome::from_counts(3, 0, 3),
            ExportOutcome::AllSkipped
        );
    }
}
