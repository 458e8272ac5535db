use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::item::FieldError;

/// Cross-field predicate: `(field value, whole store) -> valid`.
pub type Evaluator = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// A rule attached to a field.
///
/// Rules are evaluated in declared order and the first failing one wins;
/// its `message` and [`kind`](Validation::kind) become the field error.
#[derive(Clone)]
pub enum Validation {
    /// Fails when the value is empty (see [`is_empty`]).
    Required { message: String },
    /// Fails when a non-empty string has fewer than `min` characters, or a
    /// non-empty array fewer than `min` elements.
    MinLength { message: String, min: usize },
    /// Fails when a string has more than `max` characters, or an array more
    /// than `max` elements.
    MaxLength { message: String, max: usize },
    /// Fails when `evaluate` returns false. Receives the whole store.
    Custom { message: String, evaluate: Evaluator },
}

impl Validation {
    pub fn required(message: impl Into<String>) -> Self {
        Validation::Required {
            message: message.into(),
        }
    }

    pub fn min_length(message: impl Into<String>, min: usize) -> Self {
        Validation::MinLength {
            message: message.into(),
            min,
        }
    }

    pub fn max_length(message: impl Into<String>, max: usize) -> Self {
        Validation::MaxLength {
            message: message.into(),
            max,
        }
    }

    pub fn custom<F>(message: impl Into<String>, evaluate: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        Validation::Custom {
            message: message.into(),
            evaluate: Arc::new(evaluate),
        }
    }

    /// The error `type` recorded when this rule fails.
    pub fn kind(&self) -> &'static str {
        match self {
            Validation::Required { .. } => "required",
            Validation::MinLength { .. } => "minLength",
            Validation::MaxLength { .. } => "maxLength",
            Validation::Custom { .. } => "custom",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Validation::Required { message }
            | Validation::MinLength { message, .. }
            | Validation::MaxLength { message, .. }
            | Validation::Custom { message, .. } => message,
        }
    }

    /// Whether `value` passes this rule.
    pub fn check(&self, value: Option<&Value>, store: &Value) -> bool {
        match self {
            Validation::Required { .. } => !is_empty(value),
            Validation::MinLength { min, .. } => {
                is_empty(value) || value.and_then(length).is_none_or(|len| len >= *min)
            }
            Validation::MaxLength { max, .. } => {
                value.and_then(length).is_none_or(|len| len <= *max)
            }
            Validation::Custom { evaluate, .. } => evaluate(value.unwrap_or(&Value::Null), store),
        }
    }
}

impl fmt::Debug for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validation::Required { message } => f
                .debug_struct("Required")
                .field("message", message)
                .finish(),
            Validation::MinLength { message, min } => f
                .debug_struct("MinLength")
                .field("message", message)
                .field("min", min)
                .finish(),
            Validation::MaxLength { message, max } => f
                .debug_struct("MaxLength")
                .field("message", message)
                .field("max", max)
                .finish(),
            Validation::Custom { message, .. } => f
                .debug_struct("Custom")
                .field("message", message)
                .finish_non_exhaustive(),
        }
    }
}

/// The emptiness rule shared by `Required` and the read-with-default
/// fallback: absent, `null`, `""`, `[]` and `{}` are empty.
pub fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Bool(_)) | Some(Value::Number(_)) => false,
    }
}

/// Loose truthiness for cross-field rules reading other store values:
/// `null`, `false`, `0` and `""` are falsy, everything else is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

/// Run `rules` against `value` in order, stopping at the first failure.
///
/// Returns the error to record, or `None` when every rule passes.
pub fn validate(value: Option<&Value>, rules: &[Validation], store: &Value) -> Option<FieldError> {
    rules
        .iter()
        .find(|rule| !rule.check(value, store))
        .map(|rule| FieldError::from_rule(rule, value.cloned().unwrap_or(Value::Null)))
}
