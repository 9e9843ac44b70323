//! Descriptor codec
//!
//! The descriptor is the one mandatory archive entry. It names the loader
//! responsible for reconstructing the model and may carry free-form extras.
//!
//! Two encodings exist on disk:
//! - Canonical: a UTF-8 JSON object with the fixed key `modelLoaderClassName`
//!   plus optional extra string pairs.
//! - Legacy: raw UTF-8 text holding only the loader identifier, produced by
//!   an older writer. Decoding falls back to it when the payload is not a
//!   JSON object.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed base filename of the descriptor entry inside an archive
pub const DESCRIPTOR_ENTRY_NAME: &str = "model.meta";

/// Fixed JSON key naming the loader in the canonical encoding
pub const LOADER_CLASS_KEY: &str = "modelLoaderClassName";

/// Errors that can occur while encoding or decoding a descriptor
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The archive contains no descriptor entry
    #[error("Archive contains no {DESCRIPTOR_ENTRY_NAME} entry")]
    Missing,

    /// Structured payload parsed as JSON but lacks the loader key
    #[error("Descriptor is missing the {LOADER_CLASS_KEY} key")]
    MissingLoaderKey,

    /// Payload matches neither the canonical nor the legacy shape
    #[error("Malformed descriptor: {0}")]
    Malformed(String),

    /// JSON serialization failure
    #[error("Descriptor JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The metadata record naming the loader for an archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Fully-qualified identifier of the loader to instantiate
    #[serde(rename = "modelLoaderClassName")]
    pub loader_class_name: String,

    /// Free-form key/value pairs, opaque to the archive machinery
    #[serde(flatten, default, skip_serializing_if = "HashMap::is_empty")]
    pub extras: HashMap<String, String>,
}

impl Descriptor {
    /// Create a descriptor with no extras
    pub fn new(loader_class_name: impl Into<String>) -> Self {
        Self {
            loader_class_name: loader_class_name.into(),
            extras: HashMap::new(),
        }
    }

    /// Attach an extra key/value pair
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    /// Encode in the canonical JSON shape
    pub fn to_bytes(&self) -> Result<Vec<u8>, DescriptorError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a descriptor payload, canonical shape first, legacy second.
    ///
    /// A payload that parses as a JSON object must carry the loader key; a
    /// structured payload without it is an error, not a legacy candidate.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DescriptorError> {
        if let Ok(serde_json::Value::Object(map)) = serde_json::from_slice(bytes) {
            if !map.contains_key(LOADER_CLASS_KEY) {
                return Err(DescriptorError::MissingLoaderKey);
            }
            return Ok(serde_json::from_value(serde_json::Value::Object(map))?);
        }

        // Legacy shape: the loader identifier as bare text
        let text = std::str::from_utf8(bytes)
            .map_err(|_| DescriptorError::Malformed("payload is not UTF-8".to_string()))?;
        let identifier = text.trim();
        if identifier.is_empty() || identifier.chars().any(char::is_whitespace) {
            return Err(DescriptorError::Malformed(format!(
                "payload is not a loader identifier: {:?}",
                text
            )));
        }

        Ok(Descriptor::new(identifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_round_trip() {
        let descriptor = Descriptor::new("com.example.TreeLoader")
            .with_extra("framework", "gbm")
            .with_extra("schemaVersion", "2");

        let bytes = descriptor.to_bytes().unwrap();
        let decoded = Descriptor::from_bytes(&bytes).unwrap();

        assert_eq!(decoded, descriptor);
    }

    #[test]
    fn test_canonical_key_name_on_the_wire() {
        let bytes = Descriptor::new("X.Loader").to_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["modelLoaderClassName"], "X.Loader");
    }

    #[test]
    fn test_legacy_text_decodes_like_canonical() {
        let legacy = Descriptor::from_bytes(b"X.Loader").unwrap();
        let canonical =
            Descriptor::from_bytes(br#"{"modelLoaderClassName": "X.Loader"}"#).unwrap();
        assert_eq!(legacy, canonical);
    }

    #[test]
    fn test_legacy_text_is_trimmed() {
        let decoded = Descriptor::from_bytes(b"  com.example.Loader\n").unwrap();
        assert_eq!(decoded.loader_class_name, "com.example.Loader");
        assert!(decoded.extras.is_empty());
    }

    #[test]
    fn test_structured_payload_without_key_is_an_error() {
        let result = Descriptor::from_bytes(br#"{"loader": "X.Loader"}"#);
        assert!(matches!(result, Err(DescriptorError::MissingLoaderKey)));
    }

    #[test]
    fn test_empty_payload_is_malformed() {
        assert!(matches!(
            Descriptor::from_bytes(b"   \n"),
            Err(DescriptorError::Malformed(_))
        ));
    }

    #[test]
    fn test_multiword_text_is_malformed() {
        assert!(matches!(
            Descriptor::from_bytes(b"not a loader identifier"),
            Err(DescriptorError::Malformed(_))
        ));
    }

    #[test]
    fn test_non_utf8_is_malformed() {
        assert!(matches!(
            Descriptor::from_bytes(&[0xff, 0xfe, 0x00]),
            Err(DescriptorError::Malformed(_))
        ));
    }

    #[test]
    fn test_extra_values_must_be_strings() {
        let result = Descriptor::from_bytes(br#"{"modelLoaderClassName": "X", "n": 3}"#);
        assert!(matches!(result, Err(DescriptorError::Json(_))));
    }
}
