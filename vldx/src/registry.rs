//! The error registry and the reporting capability handed to fields.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::field::FieldKey;
use crate::rule::RuleError;

/// Active error per field, plus the derived validity flag.
///
/// A key is present only while its field violates at least one rule.
/// `valid` is recomputed after every mutation and never set directly.
#[derive(Debug, Clone)]
pub struct ErrorRegistry {
    errors: HashMap<FieldKey, RuleError>,
    valid: bool,
}

impl Default for ErrorRegistry {
    fn default() -> Self {
        Self {
            errors: HashMap::new(),
            valid: true,
        }
    }
}

impl ErrorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (`Some`) or clear (`None`) the active error for `key`.
    ///
    /// Setting overwrites any previous entry. Clearing an absent key is a
    /// no-op. Never fails.
    pub fn update(&mut self, key: FieldKey, error: Option<RuleError>) {
        match error {
            Some(error) => {
                self.errors.insert(key, error);
            }
            None => {
                self.errors.remove(&key);
            }
        }
        self.valid = self.errors.is_empty();
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn get(&self, key: &str) -> Option<&RuleError> {
        self.errors.get(key)
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, &RuleError)> {
        self.errors.iter()
    }
}

/// Shared handle to a validator's registry.
///
/// Fields get a clone of this instead of a handle to the validator, so the
/// only thing they can do is report their own state.
#[derive(Debug, Clone, Default)]
pub struct ErrorReporter {
    registry: Arc<RwLock<ErrorRegistry>>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of evaluating `key`. Idempotent.
    pub fn update_errors(&self, key: impl Into<FieldKey>, error: Option<RuleError>) {
        let key = key.into();
        if let Ok(mut guard) = self.registry.write() {
            match &error {
                Some(e) => log::debug!("field '{}' invalid: {}", key, e.message),
                None => log::trace!("field '{}' clear", key),
            }
            guard.update(key, error);
        }
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.registry
            .read()
            .map(|guard| guard.is_valid())
            .unwrap_or(false)
    }

    pub(crate) fn error(&self, key: &str) -> Option<RuleError> {
        self.registry
            .read()
            .ok()
            .and_then(|guard| guard.get(key).cloned())
    }

    pub(crate) fn snapshot(&self) -> ErrorRegistry {
        self.registry
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}
