//! Validation rules and the errors they describe.

use std::sync::Arc;

use serde::Serialize;

use crate::field::FieldSnapshot;

/// Default priorities of the built-in rules. Higher wins.
pub mod priority {
    pub const REQUIRED: i32 = 100;
    pub const FORMAT: i32 = 50;
    pub const RANGE: i32 = 40;
    pub const PATTERN: i32 = 30;
    pub const CUSTOM: i32 = 0;
}

/// What a violated rule reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleError {
    /// Ordering key when several rules of one field fail at once.
    pub priority: i32,
    /// Human-readable message.
    pub message: String,
}

impl RuleError {
    pub fn new(priority: i32, message: impl Into<String>) -> Self {
        Self {
            priority,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RuleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (priority {})", self.message, self.priority)
    }
}

type Predicate = Arc<dyn Fn(&FieldSnapshot) -> bool + Send + Sync>;

/// A predicate over a field's state plus the error it raises when false.
///
/// Predicates must be pure: the same snapshot always gives the same answer.
/// Cloning a rule shares the predicate.
#[derive(Clone)]
pub struct Rule {
    validator: Predicate,
    error: RuleError,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("error", &self.error).finish()
    }
}

impl Rule {
    /// Create a custom rule.
    pub fn new<F>(validator: F, error: RuleError) -> Self
    where
        F: Fn(&FieldSnapshot) -> bool + Send + Sync + 'static,
    {
        Self {
            validator: Arc::new(validator),
            error,
        }
    }

    /// Create a rule that looks only at the field's text value.
    pub fn on_value<F>(f: F, priority: i32, msg: impl Into<String>) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::new(move |field| f(&field.value), RuleError::new(priority, msg))
    }

    /// Replace the priority. Only meaningful before the rule is attached.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.error.priority = priority;
        self
    }

    pub fn error(&self) -> &RuleError {
        &self.error
    }

    pub fn is_satisfied(&self, field: &FieldSnapshot) -> bool {
        (self.validator)(field)
    }

    // -------------------------------------------------------------------------
    // Built-in rules
    //
    // Everything except `required` and `checked` accepts an empty value;
    // combine with `required` to demand input.
    // -------------------------------------------------------------------------

    /// Require a non-blank value.
    pub fn required(msg: impl Into<String>) -> Self {
        Self::on_value(|v| !v.trim().is_empty(), priority::REQUIRED, msg)
    }

    /// Require a checkable input to be checked.
    pub fn checked(msg: impl Into<String>) -> Self {
        Self::new(|field| field.checked, RuleError::new(priority::REQUIRED, msg))
    }

    /// Require minimum length (in characters).
    pub fn min_length(min: usize, msg: impl Into<String>) -> Self {
        Self::on_value(
            move |v| v.is_empty() || v.chars().count() >= min,
            priority::RANGE,
            msg,
        )
    }

    /// Require maximum length (in characters).
    pub fn max_length(max: usize, msg: impl Into<String>) -> Self {
        Self::on_value(move |v| v.chars().count() <= max, priority::RANGE, msg)
    }

    /// Require the value to match a regex pattern.
    pub fn pattern(pattern: &str, msg: impl Into<String>) -> Result<Self, regex::Error> {
        let re = regex::Regex::new(pattern)?;
        Ok(Self::on_value(
            move |v| v.is_empty() || re.is_match(v),
            priority::PATTERN,
            msg,
        ))
    }

    /// Require a valid email address.
    pub fn email(msg: impl Into<String>) -> Self {
        Self::on_value(
            |v| v.is_empty() || email_address::EmailAddress::is_valid(v.trim()),
            priority::FORMAT,
            msg,
        )
    }

    /// Require a finite number.
    pub fn numeric(msg: impl Into<String>) -> Self {
        Self::on_value(
            |v| v.is_empty() || parse_number(v).is_some(),
            priority::FORMAT,
            msg,
        )
    }

    /// Require a number no smaller than `min`. Non-numbers pass; see `numeric`.
    pub fn min_value(min: f64, msg: impl Into<String>) -> Self {
        Self::on_value(
            move |v| parse_number(v).is_none_or(|n| n >= min),
            priority::RANGE,
            msg,
        )
    }

    /// Require a number no larger than `max`. Non-numbers pass; see `numeric`.
    pub fn max_value(max: f64, msg: impl Into<String>) -> Self {
        Self::on_value(
            move |v| parse_number(v).is_none_or(|n| n <= max),
            priority::RANGE,
            msg,
        )
    }

    /// Require the value to equal another value.
    pub fn equals(other: impl Into<String>, msg: impl Into<String>) -> Self {
        let other = other.into();
        Self::on_value(move |v| v == other, priority::CUSTOM, msg)
    }

    /// Require the value to contain a substring.
    pub fn contains(substr: impl Into<String>, msg: impl Into<String>) -> Self {
        let substr = substr.into();
        Self::on_value(move |v| v.contains(&substr), priority::CUSTOM, msg)
    }
}

fn parse_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// Evaluate `rules` against one snapshot and pick the error to report.
///
/// The highest priority violation wins; among equal priorities the rule
/// declared first wins. `None` means every rule holds.
pub fn select_error(rules: &[Rule], field: &FieldSnapshot) -> Option<RuleError> {
    let mut winner: Option<&RuleError> = None;
    for rule in rules {
        if rule.is_satisfied(field) {
            continue;
        }
        match winner {
            Some(current) if current.priority >= rule.error.priority => {}
            _ => winner = Some(&rule.error),
        }
    }
    winner.cloned()
}
