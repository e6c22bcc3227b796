//! Construction and configuration errors

/// Errors raised while attaching a validator to a form.
///
/// These describe programming mistakes in the markup or in how the
/// validator is wired up. Field validation failures are never reported
/// through this type; they live in the error registry as data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    /// The form's document has been dropped.
    #[error("Form element is no longer attached to a document")]
    Detached,

    /// The element handed to the validator is not a `<form>`.
    #[error("Element '{id}' is not a form")]
    NotAForm { id: String },

    /// Another validator is still attached to the form.
    #[error("Form '{id}' already has a validator attached")]
    AlreadyAttached { id: String },

    /// Two fields resolved to the same identity key.
    #[error("Field key '{key}' is used by more than one field")]
    DuplicateFieldKey { key: String },

    /// A field element has neither a `name` nor an `id`.
    #[error("Field element has neither a name nor an id")]
    MissingFieldKey,

    /// A constraint attribute could not be parsed.
    #[error("Field '{key}' has an invalid '{attribute}' attribute: {value:?}")]
    InvalidAttribute {
        key: String,
        attribute: &'static str,
        value: String,
    },

    /// A `pattern` attribute is not a valid regular expression.
    #[error("Field '{key}' has an invalid pattern: {message}")]
    InvalidPattern { key: String, message: String },

    /// No field is registered under the key.
    #[error("No field with key '{key}'")]
    UnknownField { key: String },
}

impl FormError {
    /// Creates an invalid attribute error.
    pub fn invalid_attribute(key: impl Into<String>, attribute: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            key: key.into(),
            attribute,
            value: value.into(),
        }
    }

    /// Creates an unknown field error.
    pub fn unknown_field(key: impl Into<String>) -> Self {
        Self::UnknownField { key: key.into() }
    }
}
