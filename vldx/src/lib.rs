//! Form validation orchestrator.
//!
//! A [`FormValidator`] attaches to a form in a [`formdom::Document`],
//! discovers its fields by marker class, keeps one active error per field,
//! and gates submission on field validity plus optional bot checks (a
//! honeypot input and a human-verification score).
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vldx::prelude::*;
//!
//! let validator = FormValidator::builder(&form)
//!     .verification_key("site-key")
//!     .score_oracle(Arc::new(HttpScoreOracle::new(endpoint)))
//!     .build()?;
//!
//! match validator.attempt_submission().await {
//!     SubmissionDecision::Allowed => {}
//!     SubmissionDecision::Invalid(errors) => render(errors),
//!     _ => {}
//! }
//! ```

pub mod config;
pub mod error;
pub mod field;
pub mod registry;
pub mod rule;
pub mod submission;
pub mod verification;

mod validator;

pub use validator::{
    FormValidator, FormValidatorBuilder, ATTACHED_ATTRIBUTE, FIELD_MARKER, HONEYPOT_MARKER, NOVALIDATE_ATTRIBUTE,
    SUBMIT_MARKER,
};

pub mod prelude {
    pub use crate::config::{ValidatorConfig, VerificationConfig};
    pub use crate::error::{FormError, VerificationError};
    pub use crate::field::{Field, FieldKey, FieldSnapshot};
    pub use crate::registry::{ErrorRegistry, ErrorReporter};
    pub use crate::rule::{priority, Rule, RuleError};
    pub use crate::submission::{SubmissionDecision, SubmissionStrategy, SubmitAction};
    pub use crate::verification::{FixedScore, HttpScoreOracle, ScoreOracle};
    pub use crate::{FormValidator, FormValidatorBuilder};
}
