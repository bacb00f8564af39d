//! Structured error types shared across the moment crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`MomError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (bin, stage, sizes, spectra, ...).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type of the moment extraction engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum MomError {
    /// Malformed quantum numbers, mismatched index sets or mismatched array shapes.
    #[error("index error: {0}")]
    Index(ErrorInfo),
    /// Singular or ill-conditioned acceptance integral matrix.
    #[error("conditioning error: {0}")]
    Conditioning(ErrorInfo),
    /// Sample too small for the requested statistic.
    #[error("sample error: {0}")]
    Sample(ErrorInfo),
    /// Reference moment unusable for normalization.
    #[error("normalization error: {0}")]
    Normalization(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl MomError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            MomError::Index(info)
            | MomError::Conditioning(info)
            | MomError::Sample(info)
            | MomError::Normalization(info)
            | MomError::Serde(info) => info,
        }
    }

    /// Returns the same error with one more context entry attached.
    ///
    /// Used by the per-bin drivers to tag errors raised deep inside a stage with
    /// the kinematic bin they belong to.
    pub fn with_context(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        match self {
            MomError::Index(info) => MomError::Index(info.with_context(key, value)),
            MomError::Conditioning(info) => MomError::Conditioning(info.with_context(key, value)),
            MomError::Sample(info) => MomError::Sample(info.with_context(key, value)),
            MomError::Normalization(info) => {
                MomError::Normalization(info.with_context(key, value))
            }
            MomError::Serde(info) => MomError::Serde(info.with_context(key, value)),
        }
    }
}
