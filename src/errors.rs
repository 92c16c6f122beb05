use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EbmError {
    #[error("Required input file(s) missing from the input directory: {}", .files.join(", "))]
    MissingInput { files: Vec<String> },
    #[error("Input tables failed validation with {} violation(s):\n{}", .0.len(), format_violations(.0))]
    SchemaViolations(Vec<SchemaViolation>),
    #[error(transparent)]
    AmbiguousData(#[from] AmbiguousDataError),
    #[error("Invariant breached: {description}\n{}", .offending.join("\n"))]
    InvariantBreach {
        description: String,
        offending: Vec<String>,
    },
    #[error("Value {value} is outside the permitted domain for {context}")]
    NumericDomain { context: String, value: f64 },
    #[error("Output file {0:?} already exists (use --force to overwrite)")]
    OutputExists(PathBuf),
    #[error("Output location {0:?} is not writable: {1}")]
    OutputNotWritable(PathBuf, #[source] std::io::Error),
    #[error("Error identified during EBM calculation: {0}")]
    FailureInCalculation(#[from] anyhow::Error),
}

impl EbmError {
    /// Process exit code reported by the command-line front-end for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            EbmError::OutputExists(_) => 1,
            EbmError::OutputNotWritable(..) => 2,
            EbmError::MissingInput { .. } | EbmError::SchemaViolations(_) => 3,
            _ => 4,
        }
    }

    pub(crate) fn numeric_domain(context: impl Into<String>, value: f64) -> Self {
        EbmError::NumericDomain {
            context: context.into(),
            value,
        }
    }
}

/// A single problem found while validating an input table.
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaViolation {
    pub file: String,
    /// 1-based data row (the header is row 0), when the violation belongs to a row.
    pub row: Option<usize>,
    pub message: String,
}

impl SchemaViolation {
    pub(crate) fn new(file: &str, row: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            file: file.to_string(),
            row,
            message: message.into(),
        }
    }
}

impl Display for SchemaViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.row {
            Some(row) => write!(f, "{} row {}: {}", self.file, row, self.message),
            None => write!(f, "{}: {}", self.file, self.message),
        }
    }
}

fn format_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(|violation| format!("  {violation}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Two configuration rows apply to the same key at identical precedence but carry different values.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("Ambiguous data in {table} for {key}: rows {rows:?} share the same priority but differ in value")]
pub struct AmbiguousDataError {
    pub table: String,
    pub key: String,
    pub rows: Vec<usize>,
}
