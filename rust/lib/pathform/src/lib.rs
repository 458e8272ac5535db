//! Pathform: path-addressed form state engine.
//!
//! Holds a nested document of field values, tracks per-field metadata
//! (touched, dirty, rules, error), validates, and notifies watchers of
//! individual fields. A renderer only needs four things from it:
//!
//! - `read(path, default)`: current value and metadata of one field
//! - `set_value(path, value)` / `set_meta(path, patch)` / `clear_error(path)`
//! - `subscribe(path, callback)`: change notifications for one field
//! - `submit(on_submit)`: validate everything, then hand over the values
//!
//! # Path Addressing
//!
//! A [`Path`] is a list of object keys and array indices. Its dot-path
//! (`nested.items.0.name`) is the key for subscriptions and metadata.
//! Notifications are exact: a write to `a.b.c` reaches watchers of `a.b.c`
//! only, never `a.b` or `a`.
//!
//! # Validation Modes
//!
//! - [`Mode::OnSubmit`]: rules run only inside `submit`
//! - [`Mode::OnChange`]: rules also run on every `set_value` of a field
//!   that has them, before its watchers are notified
//!
//! Rules run in declared order and stop at the first failure. Custom rules
//! see the whole document, so one field can depend on another.
//!
//! # Example
//!
//! ```ignore
//! use openerp_pathform::{Form, FormConfig, MetaPatch, Mode, Validation, path};
//! use serde_json::json;
//!
//! let form = Form::new(
//!     FormConfig::new()
//!         .with_mode(Mode::OnChange)
//!         .with_initial_values(json!({"nested": {"items": [{"name": "Joe"}]}})),
//! )?;
//! let name = path!["nested", "items", 0, "name"];
//!
//! form.set_meta(&name, MetaPatch::new().validations(vec![
//!     Validation::required("Field is required"),
//! ]))?;
//!
//! let _sub = form.subscribe(&name, |dot_path, value| {
//!     println!("{} changed to {}", dot_path, value);
//! });
//!
//! form.set_value(&name, json!(""))?;
//! assert_eq!(form.meta(&name).error.unwrap().kind, "required");
//! ```

pub mod accessor;
pub mod config;
pub mod error;
pub mod field;
pub mod form;
pub mod item;
pub mod path;
pub mod store;
pub mod validation;
pub mod watchers;

// Re-export primary types at crate root.
pub use config::{FormConfig, Mode};
pub use error::FormError;
pub use field::Field;
pub use form::{FieldState, Form, SubmitOutcome};
pub use item::{ErrorMap, FieldError, FieldMeta, MetaPatch, StoreItem};
pub use path::{Path, Segment};
pub use store::Store;
pub use validation::{Evaluator, Validation, is_empty, is_truthy};
pub use watchers::{Subscription, SubscriptionId, WatchCallback, Watchers};
