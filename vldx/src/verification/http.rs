//! Scoring over HTTP.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::ScoreOracle;
use crate::error::VerificationError;

/// Score response in the shape of a reCAPTCHA v3 `siteverify` reply.
#[derive(Debug, Deserialize)]
struct ScoreResponse {
    success: bool,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

impl ScoreResponse {
    fn into_score(self, expected_action: &str) -> Result<f64, VerificationError> {
        if !self.success {
            return Err(VerificationError::Rejected {
                codes: self.error_codes,
            });
        }
        match self.action {
            Some(actual) if actual != expected_action => {
                return Err(VerificationError::ActionMismatch {
                    expected: expected_action.to_string(),
                    actual,
                });
            }
            _ => {}
        }
        self.score
            .ok_or_else(|| VerificationError::Parse("response carried no score".to_string()))
    }
}

/// Oracle backed by a scoring endpoint.
///
/// Sends `sitekey` and `action` as form parameters and expects a
/// siteverify-shaped JSON body back.
///
/// # Example
///
/// ```ignore
/// use vldx::verification::HttpScoreOracle;
///
/// let oracle = HttpScoreOracle::new("https://example.com/api/score".parse()?);
/// let score = oracle.score("site-key", "submit").await?;
/// ```
#[derive(Debug, Clone)]
pub struct HttpScoreOracle {
    endpoint: Url,
    http_client: reqwest::Client,
}

impl HttpScoreOracle {
    pub fn new(endpoint: Url) -> Self {
        Self::with_client(endpoint, reqwest::Client::new())
    }

    /// Use a preconfigured client (proxies, default headers, ...).
    pub fn with_client(endpoint: Url, http_client: reqwest::Client) -> Self {
        Self {
            endpoint,
            http_client,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ScoreOracle for HttpScoreOracle {
    async fn score(&self, key: &str, action: &str) -> Result<f64, VerificationError> {
        let params = [("sitekey", key), ("action", action)];

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(VerificationError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let parsed: ScoreResponse =
            serde_json::from_str(&body).map_err(|e| VerificationError::Parse(e.to_string()))?;
        parsed.into_score(action)
    }
}
