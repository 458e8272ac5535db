use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::Validation;

/// Form-level error projection, keyed by dot-path.
pub type ErrorMap = BTreeMap<String, FieldError>;

/// The error recorded on a field when one of its rules fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub message: String,
    /// The failing rule's kind: `"required"`, `"custom"`, ...
    #[serde(rename = "type")]
    pub kind: String,
    /// The value that produced the error.
    pub value: Value,
}

impl FieldError {
    pub fn new(message: impl Into<String>, kind: impl Into<String>, value: Value) -> Self {
        Self {
            message: message.into(),
            kind: kind.into(),
            value,
        }
    }

    pub(crate) fn from_rule(rule: &Validation, value: Value) -> Self {
        Self::new(rule.message(), rule.kind(), value)
    }
}

/// Per-field status.
///
/// Serializes without `validations`, so a snapshot reads like
/// `{"touched":true,"dirty":false,"error":{...}}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FieldMeta {
    pub touched: bool,
    pub dirty: bool,
    #[serde(skip)]
    pub validations: Vec<Validation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FieldError>,
}

impl FieldMeta {
    pub fn has_validations(&self) -> bool {
        !self.validations.is_empty()
    }

    /// Rules to run, or a leftover error that re-running would clear.
    pub fn needs_validation(&self) -> bool {
        self.has_validations() || self.error.is_some()
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Partial metadata for `set_meta`. Unset fields are left alone.
///
/// `validations` replaces the whole rule list when given.
#[derive(Debug, Clone, Default)]
pub struct MetaPatch {
    pub touched: Option<bool>,
    pub dirty: Option<bool>,
    pub validations: Option<Vec<Validation>>,
    /// `Some(None)` clears the error, `Some(Some(e))` sets it.
    pub error: Option<Option<FieldError>>,
}

impl MetaPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touched(mut self, touched: bool) -> Self {
        self.touched = Some(touched);
        self
    }

    pub fn dirty(mut self, dirty: bool) -> Self {
        self.dirty = Some(dirty);
        self
    }

    pub fn validations(mut self, validations: Vec<Validation>) -> Self {
        self.validations = Some(validations);
        self
    }

    pub fn error(mut self, error: FieldError) -> Self {
        self.error = Some(Some(error));
        self
    }

    pub fn clear_error(mut self) -> Self {
        self.error = Some(None);
        self
    }

    /// Shallow-merge into `meta`.
    pub fn apply(self, meta: &mut FieldMeta) {
        if let Some(touched) = self.touched {
            meta.touched = touched;
        }
        if let Some(dirty) = self.dirty {
            meta.dirty = dirty;
        }
        if let Some(validations) = self.validations {
            meta.validations = validations;
        }
        if let Some(error) = self.error {
            meta.error = error;
        }
    }
}

/// A field value together with its metadata.
#[derive(Debug, Clone)]
pub struct StoreItem {
    pub value: Value,
    pub meta: FieldMeta,
}

impl StoreItem {
    /// Wrap a raw value with empty metadata.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            meta: FieldMeta::default(),
        }
    }

    /// The raw value, independent of the metadata layout.
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}
