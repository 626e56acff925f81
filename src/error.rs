//! Error types for session analysis.
//!
//! Only malformed input or configuration is an error. An empty session is a
//! recognized terminal state (see [`crate::analysis::AnalysisStatus`]).

use crate::signal::types::Modality;
use std::fmt;

/// Errors that fail the analysis of a whole session.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Malformed sample, segment or duration.
    InvalidInput { context: String, reason: String },
    /// Category outside the modality's vocabulary under the reject policy.
    UnknownCategory { modality: Modality, category: String },
    /// Configuration values outside their domain.
    InvalidConfig(String),
}

impl AnalysisError {
    pub(crate) fn invalid(context: impl Into<String>, reason: impl Into<String>) -> Self {
        AnalysisError::InvalidInput {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InvalidInput { context, reason } => {
                write!(f, "invalid input ({context}): {reason}")
            }
            AnalysisError::UnknownCategory { modality, category } => {
                write!(f, "unknown {modality} category: {category}")
            }
            AnalysisError::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for AnalysisError {}

pub type Result<T> = std::result::Result<T, AnalysisError>;
