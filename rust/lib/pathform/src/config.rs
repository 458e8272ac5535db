use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FormError;

/// When the validation pipeline runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    /// Only when the form is submitted.
    #[default]
    OnSubmit,
    /// After every value write on a field holding rules, and on submit.
    OnChange,
}

/// Options recognised at form creation.
///
/// Parsed from JSON with camelCase keys; unknown keys are ignored:
///
/// ```json
/// {"initialValues": {"nested": {"items": [{"name": "Joe"}]}}, "mode": "onChange"}
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormConfig {
    /// Starting document. Must be an object (or null for empty).
    pub initial_values: Value,
    pub mode: Mode,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            initial_values: Value::Object(Map::new()),
            mode: Mode::default(),
        }
    }
}

impl FormConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_initial_values(mut self, initial_values: Value) -> Self {
        self.initial_values = initial_values;
        self
    }

    /// Parse a JSON config document.
    pub fn from_json(text: &str) -> Result<Self, FormError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| FormError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FormError> {
        match &self.initial_values {
            Value::Object(_) | Value::Null => Ok(()),
            other => Err(FormError::Config(format!(
                "initialValues must be an object, got {}",
                type_name(other)
            ))),
        }
    }

    /// Split into the seed document and the mode.
    pub(crate) fn into_parts(self) -> Result<(Map<String, Value>, Mode), FormError> {
        self.validate()?;
        let initial = match self.initial_values {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Ok((initial, self.mode))
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_is_on_submit_and_empty() {
        let config = FormConfig::default();
        assert_eq!(config.mode, Mode::OnSubmit);
        assert_eq!(config.initial_values, json!({}));
    }

    #[test]
    fn from_json_reads_camel_case_keys() {
        let config = FormConfig::from_json(
            r#"{"initialValues": {"nested": {"items": [{"name": "Joe"}]}}, "mode": "onChange"}"#,
        )
        .unwrap();
        assert_eq!(config.mode, Mode::OnChange);
        assert_eq!(config.initial_values["nested"]["items"][0]["name"], "Joe");
    }

    #[test]
    fn from_json_ignores_unknown_keys() {
        let config = FormConfig::from_json(r#"{"mode": "onSubmit", "theme": "dark"}"#).unwrap();
        assert_eq!(config.mode, Mode::OnSubmit);
        assert_eq!(config.initial_values, json!({}));
    }

    #[test]
    fn from_json_rejects_unknown_mode() {
        assert!(matches!(
            FormConfig::from_json(r#"{"mode": "onBlur"}"#),
            Err(FormError::Config(_))
        ));
    }

    #[test]
    fn non_object_initial_values_rejected() {
        let err = FormConfig::from_json(r#"{"initialValues": [1, 2]}"#).unwrap_err();
        assert_eq!(
            err,
            FormError::Config("initialValues must be an object, got array".to_string())
        );
    }

    #[test]
    fn null_initial_values_means_empty() {
        let (initial, mode) = FormConfig::new()
            .with_initial_values(Value::Null)
            .with_mode(Mode::OnChange)
            .into_parts()
            .unwrap();
        assert!(initial.is_empty());
        assert_eq!(mode, Mode::OnChange);
    }

    #[test]
    fn mode_serializes_camel_case() {
        assert_eq!(serde_json::to_value(Mode::OnChange).unwrap(), json!("onChange"));
        assert_eq!(serde_json::to_value(Mode::OnSubmit).unwrap(), json!("onSubmit"));
    }
}
