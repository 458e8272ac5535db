use thiserror::Error;

/// Misuse of the form API.
///
/// Validation failures are not errors: they are recorded as
/// [`FieldError`](crate::item::FieldError) data in field metadata.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("malformed path: {0}")]
    MalformedPath(String),

    #[error("cannot write through non-container value at '{at}' (writing '{path}')")]
    NotAContainer { path: String, at: String },

    #[error("index {index} is too far past the end of the array (writing '{path}')")]
    IndexOutOfRange { path: String, index: usize },

    #[error("invalid form config: {0}")]
    Config(String),
}
