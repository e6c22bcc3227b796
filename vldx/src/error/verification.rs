//! Human-verification error types

use std::time::Duration;

/// Reasons a human-verification check did not pass.
///
/// Every variant blocks submission; there is no "passed by default".
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    /// The oracle answered, but the score is under the configured threshold.
    #[error("Score {score} is below threshold {threshold}")]
    BelowThreshold { score: f64, threshold: f64 },

    /// A verification key is configured but nothing can produce a score.
    #[error("No score oracle configured")]
    NoOracle,

    /// The lookup did not finish within the configured timeout.
    #[error("Verification lookup timed out after {0:?}")]
    Timeout(Duration),

    /// The service reported the request as unsuccessful.
    #[error("Verification rejected by service: {}", .codes.join(", "))]
    Rejected { codes: Vec<String> },

    /// The service scored a different action than the one requested.
    #[error("Verification action mismatch: expected {expected}, got {actual}")]
    ActionMismatch { expected: String, actual: String },

    /// Non-success HTTP status from the scoring endpoint.
    #[error("Verification service returned status {status}")]
    Status { status: u16 },

    /// Network error while talking to the scoring endpoint.
    #[error("Network error during verification: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to parse the scoring response.
    #[error("Verification response parse error: {0}")]
    Parse(String),

    /// Any other oracle-specific failure.
    #[error("Verification failed: {0}")]
    Other(String),
}
