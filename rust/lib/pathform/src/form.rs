use std::sync::RwLock;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::{FormConfig, Mode};
use crate::error::FormError;
use crate::item::{ErrorMap, FieldError, FieldMeta, MetaPatch, StoreItem};
use crate::path::Path;
use crate::store::Store;
use crate::validation::{self, is_empty};
use crate::watchers::{Subscription, Watchers};

const ERRORS_CHANNEL: &str = "errors";

/// Value and metadata of one field, as handed to a renderer.
#[derive(Debug, Clone)]
pub struct FieldState {
    pub value: Value,
    pub meta: FieldMeta,
}

/// Result of [`Form::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome<R> {
    /// No field had an error; carries what the submit callback returned.
    Submitted(R),
    /// The callback was not invoked. Errors by dot-path.
    Invalid(ErrorMap),
}

impl<R> SubmitOutcome<R> {
    pub fn is_submitted(&self) -> bool {
        matches!(self, SubmitOutcome::Submitted(_))
    }

    pub fn errors(&self) -> Option<&ErrorMap> {
        match self {
            SubmitOutcome::Submitted(_) => None,
            SubmitOutcome::Invalid(errors) => Some(errors),
        }
    }
}

/// Form controller: owns the store and the watcher registry of one form.
///
/// Every mutation goes through this type. A write follows a fixed order:
/// mutate the store, run validation when the mode asks for it, then emit on
/// the field's dot-path, so watchers always see post-validation metadata.
///
/// Watchers are called after internal locks are released and may read the
/// form. A watcher that writes the path it is watching recurses; that is
/// the caller's problem to avoid.
///
/// ```ignore
/// let form = Form::new(FormConfig::new().with_mode(Mode::OnChange))?;
/// let name = path!["user", "name"];
///
/// form.set_meta(&name, MetaPatch::new().validations(vec![Validation::required("required")]))?;
/// let _sub = form.subscribe(&name, |dot_path, value| println!("{dot_path} = {value}"));
///
/// form.set_value(&name, json!(""))?;   // error recorded, then notified
/// match form.submit(|values| values.clone()) {
///     SubmitOutcome::Submitted(values) => save(values),
///     SubmitOutcome::Invalid(errors) => show(errors),
/// }
/// ```
pub struct Form {
    mode: Mode,
    store: RwLock<Store>,
    watchers: Watchers,
    /// Form-level channel for the aggregate error map.
    error_watchers: Watchers,
}

impl Form {
    pub fn new(config: FormConfig) -> Result<Self, FormError> {
        let (initial, mode) = config.into_parts()?;
        Ok(Self {
            mode,
            store: RwLock::new(Store::new(initial)),
            watchers: Watchers::new(),
            error_watchers: Watchers::new(),
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    // ====================================================================
    // Reads
    // ====================================================================

    /// Current value (or `default` when it is empty) and metadata.
    ///
    /// The first read of a never-written path stores `default` there, so
    /// later reads are stable even if they pass a different default.
    /// Initialization does not notify watchers.
    pub fn read(&self, path: &Path, default: Value) -> Result<FieldState, FormError> {
        path.validate()?;
        {
            let store = self.store.read().unwrap();
            if store.contains(path) {
                return Ok(field_state(&store, path, default));
            }
        }

        let mut store = self.store.write().unwrap();
        if !store.contains(path) {
            trace!(path = %path, "initializing field with default");
            store.write(path, default.clone())?;
        }
        Ok(field_state(&store, path, default))
    }

    /// Raw value at `path`, without initialization.
    pub fn value(&self, path: &Path) -> Option<Value> {
        self.store.read().unwrap().value(path).cloned()
    }

    pub fn meta(&self, path: &Path) -> FieldMeta {
        self.store
            .read()
            .unwrap()
            .meta(path)
            .cloned()
            .unwrap_or_default()
    }

    pub fn item(&self, path: &Path) -> Option<StoreItem> {
        self.store.read().unwrap().item(path)
    }

    /// Snapshot of the whole value document.
    pub fn values(&self) -> Value {
        self.store.read().unwrap().document().clone()
    }

    /// Current errors by dot-path.
    pub fn errors(&self) -> ErrorMap {
        self.store.read().unwrap().errors()
    }

    // ====================================================================
    // Subscriptions
    // ====================================================================

    /// Watch one field. The callback receives the dot-path and the field's
    /// current value (`null` when absent).
    pub fn subscribe<F>(&self, path: &Path, callback: F) -> Subscription
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        self.watchers.on(&path.to_dot_path(), callback)
    }

    /// Watch the aggregate error map. The payload is the map serialized as
    /// a JSON object keyed by dot-path.
    pub fn subscribe_errors<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.error_watchers
            .on(ERRORS_CHANNEL, move |_, payload| callback(payload))
    }

    /// Emit on `path` without changing anything. Used to invalidate
    /// watchers of a field whose validity depends on another field.
    pub fn notify(&self, path: &Path) -> usize {
        let payload = self.value(path).unwrap_or(Value::Null);
        self.watchers.emit(&path.to_dot_path(), &payload)
    }

    // ====================================================================
    // Writes
    // ====================================================================

    /// Write a value, keeping the field's metadata.
    ///
    /// In [`Mode::OnChange`] a field holding rules (or an error left by rules
    /// since removed) is validated before the notification goes out.
    pub fn set_value(&self, path: &Path, value: Value) -> Result<(), FormError> {
        path.validate()?;
        let (payload, errors_changed) = {
            let mut store = self.store.write().unwrap();
            if let Err(e) = store.write(path, value) {
                warn!(path = %path, error = %e, "rejected write");
                return Err(e);
            }
            trace!(path = %path, "value written");

            let needs_validation = store.meta(path).is_some_and(FieldMeta::needs_validation);
            let changed =
                self.mode == Mode::OnChange && needs_validation && revalidate(&mut store, path);
            (current_value(&store, path), changed)
        };

        self.watchers.emit(&path.to_dot_path(), &payload);
        if errors_changed {
            self.emit_errors();
        }
        Ok(())
    }

    /// Shallow-merge `patch` into the field's metadata and notify.
    ///
    /// Metadata can be set before the field has a value.
    pub fn set_meta(&self, path: &Path, patch: MetaPatch) -> Result<(), FormError> {
        path.validate()?;
        let (payload, errors_changed) = {
            let mut store = self.store.write().unwrap();
            let meta = store.meta_mut(path);
            let before = meta.error.clone();
            patch.apply(meta);
            let changed = meta.error != before;
            (current_value(&store, path), changed)
        };

        self.watchers.emit(&path.to_dot_path(), &payload);
        if errors_changed {
            self.emit_errors();
        }
        Ok(())
    }

    /// Drop the field's error. Returns `false`, without notifying anyone,
    /// when there was none.
    pub fn clear_error(&self, path: &Path) -> Result<bool, FormError> {
        path.validate()?;
        let payload = {
            let mut store = self.store.write().unwrap();
            if !store.meta(path).is_some_and(|meta| meta.error.is_some()) {
                return Ok(false);
            }
            store.meta_mut(path).error = None;
            current_value(&store, path)
        };

        self.watchers.emit(&path.to_dot_path(), &payload);
        self.emit_errors();
        Ok(true)
    }

    /// Remove the value at `path` along with the metadata of `path` and every
    /// field below it, then notify `path` with `null`.
    pub fn remove(&self, path: &Path) -> Result<Option<Value>, FormError> {
        path.validate()?;
        if path.is_root() {
            return Err(FormError::MalformedPath(
                "the store root cannot be removed".to_string(),
            ));
        }
        let (old, had_error) = {
            let mut store = self.store.write().unwrap();
            let had_error = store.has_error_within(path);
            (store.remove(path), had_error)
        };

        self.watchers.emit(&path.to_dot_path(), &Value::Null);
        if had_error {
            self.emit_errors();
        }
        Ok(old)
    }

    // ====================================================================
    // Validation
    // ====================================================================

    /// Run the field's rules now, whatever the mode, and notify.
    pub fn validate_field(&self, path: &Path) -> Result<Option<FieldError>, FormError> {
        path.validate()?;
        let (payload, error, changed) = {
            let mut store = self.store.write().unwrap();
            let changed = revalidate(&mut store, path);
            let error = store.meta(path).and_then(|meta| meta.error.clone());
            (current_value(&store, path), error, changed)
        };
        debug!(path = %path, valid = error.is_none(), "field validated");

        self.watchers.emit(&path.to_dot_path(), &payload);
        if changed {
            self.emit_errors();
        }
        Ok(error)
    }

    /// Validate every field holding rules and, if none fails, hand the
    /// document to `on_submit`.
    ///
    /// Fields whose error appeared, changed or cleared are notified. Fields
    /// that lost all their rules but still carry an old error are cleared.
    pub fn submit<F, R>(&self, on_submit: F) -> SubmitOutcome<R>
    where
        F: FnOnce(&Value) -> R,
    {
        let (changed, errors, document) = {
            let mut store = self.store.write().unwrap();
            let mut changed = Vec::new();
            for path in store.validated_paths() {
                if revalidate(&mut store, &path) {
                    changed.push((path.to_dot_path(), current_value(&store, &path)));
                }
            }
            (changed, store.errors(), store.document().clone())
        };

        for (dot_path, payload) in &changed {
            self.watchers.emit(dot_path, payload);
        }
        if !changed.is_empty() {
            self.emit_errors();
        }

        if errors.is_empty() {
            debug!("form submitted");
            SubmitOutcome::Submitted(on_submit(&document))
        } else {
            debug!(errors = errors.len(), "form submission rejected");
            SubmitOutcome::Invalid(errors)
        }
    }

    fn emit_errors(&self) {
        let payload = serde_json::to_value(self.errors()).unwrap_or(Value::Null);
        self.error_watchers.emit(ERRORS_CHANNEL, &payload);
    }
}

fn field_state(store: &Store, path: &Path, default: Value) -> FieldState {
    let value = match store.value(path) {
        Some(value) if !is_empty(Some(value)) => value.clone(),
        _ => default,
    };
    FieldState {
        value,
        meta: store.meta(path).cloned().unwrap_or_default(),
    }
}

fn current_value(store: &Store, path: &Path) -> Value {
    store.value(path).cloned().unwrap_or(Value::Null)
}

/// Re-run the rules at `path` and store the outcome. Returns whether the
/// recorded error changed.
fn revalidate(store: &mut Store, path: &Path) -> bool {
    let next = match store.meta(path) {
        Some(meta) => validation::validate(store.value(path), &meta.validations, store.document()),
        None => return false,
    };
    let meta = store.meta_mut(path);
    if meta.error == next {
        return false;
    }
    trace!(path = %path, failed = next.is_some(), "field error changed");
    meta.error = next;
    true
}
