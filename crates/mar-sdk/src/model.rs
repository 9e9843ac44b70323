//! The scoreable-model capability
//!
//! A `Model` is the polymorphic unit a loader reconstructs from an archive.
//! The archive machinery never interprets model internals; it only hands the
//! finished object back to the caller.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single scoring record: field name to JSON value.
///
/// Both the input to `score` and its output use this shape. Which fields are
/// meaningful is described by the model's own `input()` / `output()` schemas.
pub type Record = HashMap<String, serde_json::Value>;

/// Field value types a model schema can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    /// Boolean value
    Boolean,
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    Long,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// UTF-8 string
    String,
}

/// One named, typed field in a model's input or output schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field name, unique within one schema
    pub name: String,
    /// Declared value type
    pub data_type: DataType,
}

impl Field {
    /// Create a field
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Errors a model can raise while scoring
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    /// A field declared by `input()` is absent from the record
    #[error("Missing input field: {name}")]
    MissingField {
        /// Name of the absent field
        name: String,
    },

    /// A field is present but its value has the wrong type
    #[error("Type mismatch for field {field}: expected {expected}, got {got}")]
    TypeMismatch {
        /// Field name
        field: String,
        /// Declared type name
        expected: String,
        /// Actual value type name
        got: String,
    },

    /// Model-specific scoring failure
    #[error("Scoring error: {0}")]
    Scoring(String),
}

impl From<String> for ModelError {
    fn from(s: String) -> Self {
        ModelError::Scoring(s)
    }
}

impl From<&str> for ModelError {
    fn from(s: &str) -> Self {
        ModelError::Scoring(s.to_string())
    }
}

/// The scoreable-model capability.
///
/// Implementations live outside the archive machinery; consumers only rely on
/// these four operations.
pub trait Model: Send + Sync {
    /// Score one record, producing an output record
    fn score(&self, record: &Record) -> Result<Record, ModelError>;

    /// Ordered input schema
    fn input(&self) -> Vec<Field>;

    /// Ordered output schema
    fn output(&self) -> Vec<Field>;

    /// Free-form model metadata
    fn metadata(&self) -> HashMap<String, String>;
}
