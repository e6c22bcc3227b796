//! Rendering submission outcomes.

use serde::Serialize;
use vldx::field::FieldKey;
use vldx::rule::RuleError;
use vldx::submission::SubmissionDecision;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldReport {
    pub field: FieldKey,
    pub priority: i32,
    pub message: String,
}

/// Serializable summary of one submission attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub decision: &'static str,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub errors: Vec<FieldReport>,
}

impl Report {
    pub fn new(decision: &SubmissionDecision, errors: Vec<(FieldKey, RuleError)>) -> Self {
        let reason = match decision {
            SubmissionDecision::VerificationFailed(e) => Some(e.to_string()),
            _ => None,
        };
        Self {
            decision: decision.label(),
            allowed: decision.is_allowed(),
            reason,
            errors: errors
                .into_iter()
                .map(|(field, error)| FieldReport {
                    field,
                    priority: error.priority,
                    message: error.message,
                })
                .collect(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        if self.allowed { 0 } else { 1 }
    }

    pub fn to_text(&self) -> String {
        let mut out = match &self.reason {
            Some(reason) => format!("{}: {reason}", self.decision),
            None => self.decision.to_string(),
        };
        for error in &self.errors {
            out.push_str(&format!(
                "\n  {}: {} (priority {})",
                error.field, error.message, error.priority
            ));
        }
        out
    }
}
