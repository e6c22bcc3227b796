//! Validator configuration

use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Default minimum score for a submission to count as human.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Default action name sent to the scoring service.
pub const DEFAULT_ACTION: &str = "submit";

/// Settings for the human-verification check.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use vldx::config::VerificationConfig;
///
/// let config = VerificationConfig::new("site-key")
///     .with_threshold(0.7)
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(config.action, "submit");
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Key identifying this site to the scoring service.
    pub key: String,

    /// Scores strictly below this block submission.
    ///
    /// Default: 0.5
    pub threshold: f64,

    /// Action label the score is requested for.
    ///
    /// Default: `"submit"`
    pub action: String,

    /// Upper bound on the score lookup. `None` waits indefinitely.
    #[serde(rename = "timeout_ms", deserialize_with = "deserialize_millis")]
    pub timeout: Option<Duration>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            threshold: DEFAULT_THRESHOLD,
            action: DEFAULT_ACTION.to_string(),
            timeout: None,
        }
    }
}

impl VerificationConfig {
    /// Creates a config for the given key with default values.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// Sets the minimum passing score.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the action label.
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    /// Sets the lookup timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

fn deserialize_millis<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
}

/// Per-form validator configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Enables the human-verification check when set.
    pub verification: Option<VerificationConfig>,

    /// Re-validate a field on every input event, not only on submission.
    pub live_validation: bool,
}

impl ValidatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables verification with default settings for `key`.
    pub fn with_verification_key(mut self, key: impl Into<String>) -> Self {
        self.verification = Some(VerificationConfig::new(key));
        self
    }

    pub fn with_verification(mut self, verification: VerificationConfig) -> Self {
        self.verification = Some(verification);
        self
    }

    pub fn with_live_validation(mut self, enabled: bool) -> Self {
        self.live_validation = enabled;
        self
    }
}
