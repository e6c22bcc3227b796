//! Human-verification scoring.
//!
//! The scoring service is opaque: anything that can turn a verification key
//! and an action label into a score implements [`ScoreOracle`]. Lookups that
//! fail for any reason count as "not verified".

mod http;

use std::sync::Arc;

use async_trait::async_trait;

pub use http::HttpScoreOracle;

use crate::config::VerificationConfig;
use crate::error::VerificationError;

/// Asynchronous source of human-likelihood scores.
#[async_trait]
pub trait ScoreOracle: Send + Sync {
    /// Score the current interaction for `action` under `key`.
    async fn score(&self, key: &str, action: &str) -> Result<f64, VerificationError>;
}

/// An oracle that always answers with the same score.
///
/// Useful for local development and fixtures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedScore(pub f64);

#[async_trait]
impl ScoreOracle for FixedScore {
    async fn score(&self, _key: &str, _action: &str) -> Result<f64, VerificationError> {
        Ok(self.0)
    }
}

/// Run one verification lookup and apply the threshold.
///
/// Returns the score when it passes.
pub async fn verify(
    oracle: Option<Arc<dyn ScoreOracle>>,
    config: &VerificationConfig,
) -> Result<f64, VerificationError> {
    let Some(oracle) = oracle else {
        return Err(VerificationError::NoOracle);
    };

    let lookup = oracle.score(&config.key, &config.action);
    let score = match config.timeout {
        Some(limit) => tokio::time::timeout(limit, lookup)
            .await
            .map_err(|_| VerificationError::Timeout(limit))??,
        None => lookup.await?,
    };

    // NaN never passes, as a score or as a threshold.
    if score.is_nan() || config.threshold.is_nan() || score < config.threshold {
        return Err(VerificationError::BelowThreshold {
            score,
            threshold: config.threshold,
        });
    }

    log::debug!("verification passed with score {score}");
    Ok(score)
}
