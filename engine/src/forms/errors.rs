//! Error types for the form engine.
//!
//! Two very different things are called "errors" here:
//!
//! - [`ValidationErrors`] are data. They hang off a control and are shown
//!   next to the field. Producing them is the normal, expected outcome of
//!   validating bad input.
//! - [`FormError`] is a real failure: a missing registration, a model that
//!   can't be converted, or a remote failure nobody knows how to classify.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use shared::{api_message_key, ApiErrorResponse};
use thiserror::Error;

/// Named validation errors of one control, e.g. `{"required": true}` or
/// `{"min": {"min": 1, "actual": 0}}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Value>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single error with a detail payload
    pub fn single(name: impl Into<String>, detail: Value) -> Self {
        let mut errors = Self::new();
        errors.insert(name, detail);
        errors
    }

    /// A single error whose detail is just `true`
    pub fn flag(name: impl Into<String>) -> Self {
        Self::single(name, Value::Bool(true))
    }

    pub fn insert(&mut self, name: impl Into<String>, detail: Value) {
        self.0.insert(name.into(), detail);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Add every error of `other`; later entries win on name clashes
    pub fn merge(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    /// Conjunction of validator results: `None` only when every result is `None`
    pub fn combine(
        acc: Option<ValidationErrors>,
        next: Option<ValidationErrors>,
    ) -> Option<ValidationErrors> {
        match (acc, next) {
            (None, next) => next.filter(|e| !e.is_empty()),
            (acc, None) => acc,
            (Some(mut acc), Some(next)) => {
                acc.merge(next);
                Some(acc)
            }
        }
    }
}

/// Why a remote call failed.
#[derive(Debug)]
pub enum RemoteFailure {
    /// The backend answered with an error body (possibly a structured API error)
    Payload(Value),
    /// The call itself failed (connection, timeout, decoding, ...)
    Transport(anyhow::Error),
}

impl RemoteFailure {
    /// The structured API error, if the payload is one
    pub fn api_error(&self) -> Option<ApiErrorResponse> {
        match self {
            RemoteFailure::Payload(payload) => ApiErrorResponse::from_payload(payload),
            RemoteFailure::Transport(_) => None,
        }
    }

    /// Message key of a structured API error, even when the rest of the
    /// envelope does not parse
    pub fn message_key(&self) -> Option<&str> {
        match self {
            RemoteFailure::Payload(payload) => api_message_key(payload),
            RemoteFailure::Transport(_) => None,
        }
    }
}

impl fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteFailure::Payload(payload) => match ApiErrorResponse::from_payload(payload) {
                Some(api_error) => write!(f, "{}", api_error),
                None => match api_message_key(payload) {
                    Some(key) => write!(f, "{}", key),
                    None => write!(f, "unstructured error payload: {}", payload),
                },
            },
            RemoteFailure::Transport(err) => write!(f, "transport failure: {}", err),
        }
    }
}

/// Failures of the form engine itself
#[derive(Debug, Error)]
pub enum FormError {
    /// A type name was looked up that no module registered. Programmer error.
    #[error("no form creator registered for type '{0}'")]
    UnregisteredType(String),

    #[error("form has no control named '{0}'")]
    NoSuchControl(String),

    #[error("control '{name}' is not a {expected}")]
    WrongControlKind { name: String, expected: &'static str },

    #[error("model must serialize to an object, got {0}")]
    ModelShape(&'static str),

    #[error("failed to convert model: {0}")]
    Model(#[from] serde_json::Error),

    #[error("a validation group needs at least two controls")]
    ValidationGroupTooSmall,

    /// A remote failure that could not be classified into a field error
    #[error("unrecognized remote failure: {0}")]
    UnmappedRemote(RemoteFailure),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_combine_is_conjunction() {
        assert_eq!(ValidationErrors::combine(None, None), None);

        let required = Some(ValidationErrors::flag("required"));
        let combined = ValidationErrors::combine(required.clone(), None);
        assert_eq!(combined, required);

        let combined = ValidationErrors::combine(
            Some(ValidationErrors::flag("required")),
            Some(ValidationErrors::single("min", json!({"min": 1, "actual": 0}))),
        )
        .unwrap();
        assert!(combined.contains("required"));
        assert!(combined.contains("min"));
        assert_eq!(combined.len(), 2);
    }

    #[test]
    fn test_empty_errors_count_as_none() {
        assert_eq!(ValidationErrors::combine(None, Some(ValidationErrors::new())), None);
    }

    #[test]
    fn test_validation_errors_serialize_as_plain_map() {
        let errors = ValidationErrors::flag("oneOfRequired");
        assert_eq!(serde_json::to_value(&errors).unwrap(), json!({"oneOfRequired": true}));
    }

    #[test]
    fn test_remote_failure_display() {
        let structured = RemoteFailure::Payload(json!({
            "apiVersion": "1",
            "error": { "status": 404, "messageKey": "error.x", "developerMessage": "gone" }
        }));
        assert_eq!(structured.to_string(), "error.x (404): gone");
        assert!(structured.api_error().is_some());

        let transport = RemoteFailure::Transport(anyhow::anyhow!("connection reset"));
        assert!(transport.to_string().contains("connection reset"));
        assert!(transport.api_error().is_none());
    }
}
