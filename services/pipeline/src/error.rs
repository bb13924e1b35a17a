//! Ingestion error taxonomy
//!
//! Each variant maps to one user-visible failure mode. The HTTP layer
//! translates variants into structured JSON with enough context for a
//! non-engineer operator to fix the source sheet.

use serde::Serialize;
use thiserror::Error;

/// Why no period columns were found, with enough detail to correct the
/// sheet: every column label seen plus the ones that look like they
/// were meant to be periods.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodDiagnostic {
    pub columns: Vec<String>,
    pub candidates: Vec<PeriodCandidate>,
}

/// A column that carries a slash and a digit but failed validation.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodCandidate {
    pub label: String,
    pub sample_values: Vec<String>,
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("upstream source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("source contained no rows")]
    EmptySource,

    #[error("no valid period columns among {} columns", .0.columns.len())]
    NoValidPeriods(PeriodDiagnostic),

    #[error("storage backend failure: {0}")]
    BackendWrite(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_readable() {
        let err = IngestError::SourceUnavailable("timeout after 30s".to_string());
        assert_eq!(err.to_string(), "upstream source unavailable: timeout after 30s");

        let err = IngestError::NoValidPeriods(PeriodDiagnostic {
            columns: vec!["Indicador".to_string(), "Valores".to_string()],
            candidates: vec![],
        });
        assert!(err.to_string().contains("2 columns"));
    }

    #[test]
    fn test_diagnostic_serializes_for_response_bodies() {
        let diag = PeriodDiagnostic {
            columns: vec!["Indicador".to_string()],
            candidates: vec![PeriodCandidate {
                label: "32/13 a 35/14".to_string(),
                sample_values: vec!["95000".to_string()],
            }],
        };
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["candidates"][0]["label"], "32/13 a 35/14");
    }
}
