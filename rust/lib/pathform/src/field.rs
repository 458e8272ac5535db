use serde_json::Value;

use crate::config::Mode;
use crate::error::FormError;
use crate::form::{FieldState, Form};
use crate::item::MetaPatch;
use crate::path::Path;
use crate::validation::Validation;

/// Headless binding between one input and the form.
///
/// Carries what an input needs (path, default, rules, optional publish
/// path) and translates input events into form calls. Rendering is left to
/// the caller, who subscribes to [`Field::path`] and re-reads
/// [`Field::state`] on notification.
#[derive(Debug, Clone)]
pub struct Field {
    path: Path,
    name: String,
    default: Value,
    validations: Option<Vec<Validation>>,
    publish: Option<Path>,
}

impl Field {
    pub fn new(path: Path, default: Value) -> Self {
        let name = path.to_dot_path();
        Self {
            path,
            name,
            default,
            validations: None,
            publish: None,
        }
    }

    pub fn with_validations(mut self, validations: Vec<Validation>) -> Self {
        self.validations = Some(validations);
        self
    }

    /// Also notify watchers of `path` whenever this field changes.
    pub fn publish_to(mut self, path: Path) -> Self {
        self.publish = Some(path);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The input name: the field's dot-path.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Initialize the field in `form` and register its rules.
    pub fn attach(&self, form: &Form) -> Result<FieldState, FormError> {
        form.read(&self.path, self.default.clone())?;
        if let Some(validations) = &self.validations {
            form.set_meta(&self.path, MetaPatch::new().validations(validations.clone()))?;
        }
        self.state(form)
    }

    /// Swap the rule set. The old rules are discarded, not merged.
    pub fn replace_validations(
        &mut self,
        form: &Form,
        validations: Vec<Validation>,
    ) -> Result<(), FormError> {
        form.set_meta(&self.path, MetaPatch::new().validations(validations.clone()))?;
        self.validations = Some(validations);
        Ok(())
    }

    /// The input's value changed.
    pub fn change(&self, form: &Form, value: Value) -> Result<(), FormError> {
        form.set_value(&self.path, value)?;
        if let Some(publish) = &self.publish {
            form.notify(publish);
        }
        Ok(())
    }

    /// The input lost focus with `value` in it.
    ///
    /// Outside [`Mode::OnChange`], an error is dropped when the value differs
    /// from the one that produced it; no rule is re-run. The field is then
    /// marked touched.
    pub fn blur(&self, form: &Form, value: &Value) -> Result<(), FormError> {
        let meta = form.meta(&self.path);
        if let Some(error) = &meta.error {
            if &error.value != value && form.mode() != Mode::OnChange {
                form.clear_error(&self.path)?;
            }
        }
        if !meta.touched {
            form.set_meta(&self.path, MetaPatch::new().touched(true))?;
        }
        Ok(())
    }

    pub fn state(&self, form: &Form) -> Result<FieldState, FormError> {
        form.read(&self.path, self.default.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormConfig;
    use crate::item::FieldError;
    use crate::path;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn form(mode: Mode) -> Form {
        Form::new(FormConfig::new().with_mode(mode)).unwrap()
    }

    fn with_error(form: &Form, field: &Field, value: Value) {
        form.set_meta(
            field.path(),
            MetaPatch::new().error(FieldError::new("bad", "custom", value)),
        )
        .unwrap();
    }

    #[test]
    fn name_is_dot_path() {
        let field = Field::new(path!["nested", "items", 0, "name"], json!(""));
        assert_eq!(field.name(), "nested.items.0.name");
    }

    #[test]
    fn attach_initializes_default_and_rules() {
        let form = form(Mode::OnSubmit);
        let field = Field::new(path!["name"], json!("default"))
            .with_validations(vec![Validation::required("req")]);

        let state = field.attach(&form).unwrap();
        assert_eq!(state.value, json!("default"));
        assert_eq!(form.value(&path!["name"]), Some(json!("default")));
        assert!(state.meta.has_validations());
    }

    #[test]
    fn attach_without_rules_leaves_meta_alone() {
        let form = form(Mode::OnSubmit);
        let field = Field::new(path!["name"], json!("x"));
        field.attach(&form).unwrap();
        assert!(!form.meta(&path!["name"]).has_validations());
    }

    #[test]
    fn change_writes_value() {
        let form = form(Mode::OnSubmit);
        let field = Field::new(path!["name"], json!(""));
        field.change(&form, json!("Joe")).unwrap();
        assert_eq!(field.state(&form).unwrap().value, json!("Joe"));
    }

    #[test]
    fn change_notifies_publish_path() {
        let form = form(Mode::OnSubmit);
        let field = Field::new(path!["name"], json!("")).publish_to(path!["summary"]);

        let count = Arc::new(AtomicU64::new(0));
        let count_c = count.clone();
        let _sub = form.subscribe(&path!["summary"], move |_, _| {
            count_c.fetch_add(1, Ordering::Relaxed);
        });

        field.change(&form, json!("J")).unwrap();
        field.change(&form, json!("Jo")).unwrap();
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }

    // ====================================================================
    // blur
    // ====================================================================

    #[test]
    fn blur_marks_touched() {
        let form = form(Mode::OnSubmit);
        let field = Field::new(path!["name"], json!(""));
        field.attach(&form).unwrap();

        field.blur(&form, &json!("")).unwrap();
        assert!(form.meta(field.path()).touched);
    }

    #[test]
    fn blur_touched_field_does_not_emit_again() {
        let form = form(Mode::OnSubmit);
        let field = Field::new(path!["name"], json!(""));
        field.blur(&form, &json!("")).unwrap();

        let count = Arc::new(AtomicU64::new(0));
        let count_c = count.clone();
        let _sub = form.subscribe(field.path(), move |_, _| {
            count_c.fetch_add(1, Ordering::Relaxed);
        });
        field.blur(&form, &json!("")).unwrap();
        assert_eq!(count.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn blur_with_different_value_clears_error() {
        let form = form(Mode::OnSubmit);
        let field = Field::new(path!["name"], json!(""));
        with_error(&form, &field, json!("bad value"));

        field.blur(&form, &json!("fixed value")).unwrap();
        assert!(form.meta(field.path()).error.is_none());
    }

    #[test]
    fn blur_with_same_value_keeps_error() {
        let form = form(Mode::OnSubmit);
        let field = Field::new(path!["name"], json!(""));
        with_error(&form, &field, json!("bad value"));

        field.blur(&form, &json!("bad value")).unwrap();
        assert!(form.meta(field.path()).error.is_some());
        assert!(form.meta(field.path()).touched);
    }

    #[test]
    fn blur_in_on_change_mode_keeps_error() {
        let form = form(Mode::OnChange);
        let field = Field::new(path!["name"], json!(""));
        with_error(&form, &field, json!("bad value"));

        field.blur(&form, &json!("other")).unwrap();
        assert!(form.meta(field.path()).error.is_some());
    }

    #[test]
    fn replace_validations_discards_old_rules() {
        let form = form(Mode::OnSubmit);
        let mut field = Field::new(path!["name"], json!(""))
            .with_validations(vec![Validation::required("a"), Validation::required("b")]);
        field.attach(&form).unwrap();

        field
            .replace_validations(&form, vec![Validation::max_length("c", 2)])
            .unwrap();
        let meta = form.meta(field.path());
        assert_eq!(meta.validations.len(), 1);
        assert_eq!(meta.validations[0].kind(), "maxLength");
    }
}
