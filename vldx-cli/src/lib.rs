//! Command line harness for the `vldx` form validator.

pub mod fixture;
pub mod report;

use std::sync::Arc;

use url::Url;
use vldx::prelude::*;

use crate::fixture::{Fixture, FixtureError};
use crate::report::Report;

/// Score source chosen on the command line, overriding the fixture's.
#[derive(Debug, Clone, Default)]
pub struct OracleOverride {
    pub score: Option<f64>,
    pub endpoint: Option<Url>,
}

fn select_oracle(
    fixture: &Fixture,
    overrides: OracleOverride,
) -> Result<Option<Arc<dyn ScoreOracle>>, FixtureError> {
    if let Some(score) = overrides.score {
        return Ok(Some(Arc::new(FixedScore(score))));
    }
    if let Some(endpoint) = overrides.endpoint {
        return Ok(Some(Arc::new(HttpScoreOracle::new(endpoint))));
    }
    if let Some(score) = fixture.score {
        return Ok(Some(Arc::new(FixedScore(score))));
    }
    Ok(fixture
        .endpoint_url()?
        .map(|endpoint| Arc::new(HttpScoreOracle::new(endpoint)) as Arc<dyn ScoreOracle>))
}

/// Mount the fixture, attach a validator and run one submission attempt.
pub async fn check(fixture: &Fixture, overrides: OracleOverride) -> Result<Report, FixtureError> {
    let (document, form) = fixture.mount()?;

    let mut builder = FormValidator::builder(&form).config(fixture.config.clone());
    if let Some(oracle) = select_oracle(fixture, overrides)? {
        builder = builder.score_oracle(oracle);
    }
    let validator = builder.build()?;

    let decision = validator.attempt_submission().await;
    log::info!(
        "form '{}': {} ({} submission(s) recorded)",
        form.id(),
        decision.label(),
        document.submissions().len()
    );
    Ok(Report::new(&decision, validator.errors()))
}
