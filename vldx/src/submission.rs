//! The submission protocol: the checks a submission attempt goes through.
//!
//! Order per attempt:
//!
//! 1. honeypot: a filled decoy drops the attempt silently, before any field
//!    is touched, so a bot learns nothing from error output;
//! 2. fields: every field is re-validated and reports into the registry;
//! 3. verification: only with a key configured, and only once the fields
//!    pass, the score oracle is consulted;
//! 4. delivery: native form submission, or the configured [`SubmitAction`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use formdom::{Event, EventListener, NodeRef};

use crate::error::VerificationError;
use crate::field::FieldKey;
use crate::rule::RuleError;
use crate::validator::ValidatorInner;
use crate::verification::verify;

/// How clicks on the submit control are handled. Chosen once per binding.
#[derive(Clone)]
pub enum SubmissionStrategy {
    /// Run the built-in honeypot, field and verification checks.
    DefaultChecks,
    /// Hand the click to the caller's listener and run nothing else.
    Custom(Arc<dyn EventListener>),
}

impl SubmissionStrategy {
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl std::fmt::Debug for SubmissionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DefaultChecks => write!(f, "DefaultChecks"),
            Self::Custom(_) => write!(f, "Custom(...)"),
        }
    }
}

/// Outcome of one submission attempt.
#[derive(Debug)]
pub enum SubmissionDecision {
    /// All checks passed and the form was handed off.
    Allowed,
    /// One or more fields are invalid. Errors are in field order.
    Invalid(Vec<(FieldKey, RuleError)>),
    /// The honeypot was filled in.
    SpamDetected,
    /// The human-verification check did not pass.
    VerificationFailed(VerificationError),
    /// Another attempt was still running.
    InFlight,
}

impl SubmissionDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Short label for logs and machine-readable output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Invalid(_) => "invalid",
            Self::SpamDetected => "spam",
            Self::VerificationFailed(_) => "verification_failed",
            Self::InFlight => "in_flight",
        }
    }
}

/// Replacement for native form submission (e.g. sending the data yourself).
#[async_trait]
pub trait SubmitAction: Send + Sync {
    async fn submit(&self, form: &NodeRef);
}

/// Marks an attempt as running; cleared on drop.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Run one attempt against a validator's state.
pub(crate) async fn run(inner: &ValidatorInner) -> SubmissionDecision {
    let Some(_running) = InFlight::acquire(&inner.in_flight) else {
        log::debug!("submission already in flight, ignoring");
        return SubmissionDecision::InFlight;
    };

    if inner.honeypot_tripped() {
        log::debug!("honeypot filled, dropping submission");
        return SubmissionDecision::SpamDetected;
    }

    if !inner.validate_all() {
        let errors = inner.errors();
        log::info!("submission blocked: {} invalid field(s)", errors.len());
        return SubmissionDecision::Invalid(errors);
    }

    let verified = match &inner.verification {
        Some(config) => verify(inner.oracle.clone(), config).await.map(|_| ()),
        None => Ok(()),
    };
    if let Err(e) = verified {
        log::warn!("submission blocked: {e}");
        return SubmissionDecision::VerificationFailed(e);
    }

    match &inner.submit_action {
        Some(action) => action.submit(&inner.form).await,
        None => {
            if inner.form.submit().is_none() {
                log::warn!("form is detached; nothing was submitted");
            }
        }
    }

    log::info!("submission allowed");
    SubmissionDecision::Allowed
}

/// The default click listener: suppress the native action, then run the checks.
pub(crate) struct SubmissionGate {
    inner: Weak<ValidatorInner>,
}

impl SubmissionGate {
    pub(crate) fn new(inner: Weak<ValidatorInner>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl EventListener for SubmissionGate {
    async fn handle_event(&self, event: &mut Event) {
        event.prevent_default();
        let Some(inner) = self.inner.upgrade() else {
            log::warn!("submit click on '{}' after its validator was dropped", event.target().id());
            return;
        };
        let decision = run(&inner).await;
        log::debug!("submit click on '{}': {}", event.target().id(), decision.label());
    }
}
