//! Domain errors raised by the diagnostic engine.
//!
//! Field-level parse problems never show up here: they are normalized to
//! zero and tallied in the missing counters instead.

use thiserror::Error;

/// Errors produced while diagnosing a record set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagnosticError {
    /// The input table contained no data rows. Fatal for the whole run.
    #[error("the input table contains no records")]
    EmptyDataset,

    /// A business filter matched zero records. Only that audience is skipped.
    #[error("no records found for business '{business}'")]
    NoMatchingRecords { business: String },
}

impl DiagnosticError {
    /// Whether the run can continue with the remaining audiences.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DiagnosticError::NoMatchingRecords { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        assert!(!DiagnosticError::EmptyDataset.is_recoverable());
        assert!(DiagnosticError::NoMatchingRecords {
            business: "Retail".to_string()
        }
        .is_recoverable());
    }

    #[test]
    fn test_error_messages() {
        let err = DiagnosticError::NoMatchingRecords {
            business: "Retail".to_string(),
        };
        assert_eq!(err.to_string(), "no records found for business 'Retail'");
    }
}
