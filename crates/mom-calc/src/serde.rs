//! JSON helpers mapping serde failures onto [`MomError::Serde`].

use mom_core::{ErrorInfo, MomError};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serialises any moment record (results, integral matrices, options) into indented JSON.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, MomError> {
    serde_json::to_string_pretty(value)
        .map_err(|err| MomError::Serde(ErrorInfo::new("json-serialize", err.to_string())))
}

/// Deserialises a moment record from JSON text.
pub fn from_json<T: DeserializeOwned>(json: &str) -> Result<T, MomError> {
    serde_json::from_str(json).map_err(|err| {
        MomError::Serde(
            ErrorInfo::new("json-deserialize", err.to_string())
                .with_context("line", err.line().to_string())
                .with_context("column", err.column().to_string()),
        )
    })
}
