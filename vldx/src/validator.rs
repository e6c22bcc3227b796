//! The form validator: discovery, fields, error state and submission wiring.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock, Weak};

use async_trait::async_trait;
use formdom::{Event, EventKind, EventListener, ListenerId, NodeRef, Tag};

use crate::config::{ValidatorConfig, VerificationConfig};
use crate::error::FormError;
use crate::field::{Field, FieldKey};
use crate::registry::ErrorReporter;
use crate::rule::{Rule, RuleError};
use crate::submission::{self, SubmissionDecision, SubmissionGate, SubmissionStrategy, SubmitAction};
use crate::verification::ScoreOracle;

/// Class marking inputs to validate.
pub const FIELD_MARKER: &str = "vldx-field";
/// Class marking the decoy input.
pub const HONEYPOT_MARKER: &str = "vldx-honeypot";
/// Class marking the default submit control.
pub const SUBMIT_MARKER: &str = "vldx-submit";
/// Attribute that turns off the host's own constraint validation.
pub const NOVALIDATE_ATTRIBUTE: &str = "novalidate";
/// Attribute present on a form while a validator is attached to it.
pub const ATTACHED_ATTRIBUTE: &str = "data-vldx-attached";

fn class_selector(marker: &str) -> String {
    format!(".{marker}")
}

struct Binding {
    control: NodeRef,
    listener: ListenerId,
    custom: bool,
}

/// State shared between the validator handle and the listeners it installs.
pub(crate) struct ValidatorInner {
    pub(crate) form: NodeRef,
    pub(crate) verification: Option<VerificationConfig>,
    pub(crate) oracle: Option<Arc<dyn ScoreOracle>>,
    pub(crate) submit_action: Option<Arc<dyn SubmitAction>>,
    pub(crate) in_flight: AtomicBool,
    honeypot: RwLock<Option<NodeRef>>,
    binding: RwLock<Option<Binding>>,
    live_listeners: RwLock<Vec<(NodeRef, ListenerId)>>,
    fields: RwLock<Vec<Field>>,
    reporter: ErrorReporter,
    added_novalidate: bool,
}

impl ValidatorInner {
    /// Re-run every field, reporting each result. Returns overall validity.
    pub(crate) fn validate_all(&self) -> bool {
        if let Ok(fields) = self.fields.read() {
            for field in fields.iter() {
                field.validate();
            }
        }
        self.reporter.is_valid()
    }

    pub(crate) fn validate_field(&self, key: &str) -> Result<bool, FormError> {
        let fields = self
            .fields
            .read()
            .map_err(|_| FormError::unknown_field(key))?;
        fields
            .iter()
            .find(|f| f.key().as_str() == key)
            .map(Field::validate)
            .ok_or_else(|| FormError::unknown_field(key))
    }

    /// A filled-in honeypot means a bot filled the form. No honeypot never trips.
    pub(crate) fn honeypot_tripped(&self) -> bool {
        self.honeypot
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|node| !node.value().is_empty()))
            .unwrap_or(false)
    }

    /// Active errors, in field order; errors reported under other keys follow, sorted.
    pub(crate) fn errors(&self) -> Vec<(FieldKey, RuleError)> {
        let registry = self.reporter.snapshot();
        let mut remaining: HashMap<FieldKey, RuleError> = registry
            .iter()
            .map(|(k, e)| (k.clone(), e.clone()))
            .collect();

        let mut ordered = Vec::with_capacity(remaining.len());
        if let Ok(fields) = self.fields.read() {
            for field in fields.iter() {
                if let Some(error) = remaining.remove(field.key()) {
                    ordered.push((field.key().clone(), error));
                }
            }
        }

        let mut rest: Vec<_> = remaining.into_iter().collect();
        rest.sort_by(|a, b| a.0.cmp(&b.0));
        ordered.extend(rest);
        ordered
    }
}

impl Drop for ValidatorInner {
    fn drop(&mut self) {
        if let Ok(Some(binding)) = self.binding.get_mut().map(Option::take) {
            binding.control.remove_event_listener(binding.listener);
        }
        if let Ok(listeners) = self.live_listeners.get_mut() {
            for (node, id) in listeners.drain(..) {
                node.remove_event_listener(id);
            }
        }
        if self.added_novalidate {
            self.form.remove_attribute(NOVALIDATE_ATTRIBUTE);
        }
        self.form.remove_attribute(ATTACHED_ATTRIBUTE);
        log::debug!("validator detached from form '{}'", self.form.id());
    }
}

/// Re-validates one field whenever its input changes.
struct LiveValidation {
    inner: Weak<ValidatorInner>,
    key: FieldKey,
}

#[async_trait]
impl EventListener for LiveValidation {
    async fn handle_event(&self, _event: &mut Event) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        if let Err(e) = inner.validate_field(self.key.as_str()) {
            log::warn!("live validation skipped: {e}");
        }
    }
}

/// Validation orchestrator for one form.
///
/// Attaching a validator marks the form `novalidate`, finds the honeypot
/// (`.vldx-honeypot`), wraps every `.vldx-field` in a [`Field`] in document
/// order, and binds the default submission checks to `.vldx-submit`.
///
/// Handles are cheap clones of one shared state. Dropping the last handle
/// detaches the validator: every listener it installed is removed and the
/// form's `novalidate` and attached markers are taken back off. Only one
/// validator can be attached to a form at a time.
///
/// # Example
///
/// ```ignore
/// use vldx::FormValidator;
///
/// let validator = FormValidator::new(&form, None)?;
/// document.click(&submit).await;
/// if !validator.is_valid() {
///     for (key, error) in validator.errors() {
///         println!("{key}: {}", error.message);
///     }
/// }
/// ```
#[derive(Clone)]
pub struct FormValidator {
    inner: Arc<ValidatorInner>,
}

impl std::fmt::Debug for FormValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormValidator")
            .field("form", &self.inner.form)
            .field("fields", &self.fields().len())
            .field("valid", &self.is_valid())
            .finish()
    }
}

impl FormValidator {
    /// Attach to `form`, optionally enabling human verification under `verification_key`.
    ///
    /// Without an oracle (see [`FormValidator::builder`]) a configured key
    /// blocks every submission.
    pub fn new(form: &NodeRef, verification_key: Option<&str>) -> Result<Self, FormError> {
        let mut builder = Self::builder(form);
        if let Some(key) = verification_key {
            builder = builder.verification_key(key);
        }
        builder.build()
    }

    pub fn builder(form: &NodeRef) -> FormValidatorBuilder {
        FormValidatorBuilder {
            form: form.clone(),
            config: ValidatorConfig::default(),
            oracle: None,
            submit_action: None,
        }
    }

    // -------------------------------------------------------------------------
    // Submission control
    // -------------------------------------------------------------------------

    /// Make `control` the submission trigger.
    ///
    /// With a custom listener none of the built-in checks run on click; the
    /// listener is fully responsible. The previous trigger is unbound.
    pub fn add_submission_button(
        &self,
        control: &NodeRef,
        custom_listener: Option<Arc<dyn EventListener>>,
    ) -> Result<(), FormError> {
        let strategy = match custom_listener {
            Some(listener) => SubmissionStrategy::Custom(listener),
            None => SubmissionStrategy::DefaultChecks,
        };
        self.bind_submission(control, strategy)
    }

    pub fn bind_submission(&self, control: &NodeRef, strategy: SubmissionStrategy) -> Result<(), FormError> {
        let custom = strategy.is_custom();
        let listener: Arc<dyn EventListener> = match strategy {
            SubmissionStrategy::DefaultChecks => Arc::new(SubmissionGate::new(Arc::downgrade(&self.inner))),
            SubmissionStrategy::Custom(listener) => listener,
        };
        let id = control
            .add_event_listener(EventKind::Click, listener)
            .ok_or(FormError::Detached)?;

        if let Ok(mut guard) = self.inner.binding.write() {
            if let Some(previous) = guard.take() {
                previous.control.remove_event_listener(previous.listener);
            }
            *guard = Some(Binding {
                control: control.clone(),
                listener: id,
                custom,
            });
        }

        log::debug!(
            "submission bound to '{}' ({})",
            control.id(),
            if custom { "custom listener" } else { "default checks" }
        );
        Ok(())
    }

    pub fn submit_control(&self) -> Option<NodeRef> {
        self.inner
            .binding
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|b| b.control.clone()))
    }

    /// Whether clicks on the submit control run the built-in checks.
    pub fn uses_default_checks(&self) -> bool {
        self.inner
            .binding
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|b| !b.custom))
            .unwrap_or(false)
    }

    /// Run the submission checks now, as a click on the submit control would.
    pub async fn attempt_submission(&self) -> SubmissionDecision {
        submission::run(&self.inner).await
    }

    // -------------------------------------------------------------------------
    // Honeypot
    // -------------------------------------------------------------------------

    pub fn honeypot(&self) -> Option<NodeRef> {
        self.inner.honeypot.read().ok().and_then(|guard| guard.clone())
    }

    /// Replace the honeypot, for decoys injected after attaching.
    pub fn set_honeypot(&self, honeypot: NodeRef) {
        if let Ok(mut guard) = self.inner.honeypot.write() {
            *guard = Some(honeypot);
        }
    }

    // -------------------------------------------------------------------------
    // Fields and errors
    // -------------------------------------------------------------------------

    pub fn fields(&self) -> Vec<Field> {
        self.inner
            .fields
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn field(&self, key: &str) -> Option<Field> {
        self.inner
            .fields
            .read()
            .ok()
            .and_then(|guard| guard.iter().find(|f| f.key().as_str() == key).cloned())
    }

    /// Append a rule to a field's rule set.
    pub fn add_rule(&self, key: &str, rule: Rule) -> Result<(), FormError> {
        let mut fields = self
            .inner
            .fields
            .write()
            .map_err(|_| FormError::unknown_field(key))?;
        let field = fields
            .iter_mut()
            .find(|f| f.key().as_str() == key)
            .ok_or_else(|| FormError::unknown_field(key))?;
        field.push_rule(rule);
        Ok(())
    }

    /// Re-validate every field. Returns overall validity.
    pub fn validate(&self) -> bool {
        self.inner.validate_all()
    }

    /// Re-validate one field. Returns whether it is valid.
    pub fn validate_field(&self, key: &str) -> Result<bool, FormError> {
        self.inner.validate_field(key)
    }

    /// Set or clear the active error for `key`, then recompute validity.
    pub fn update_errors(&self, key: impl Into<FieldKey>, error: Option<RuleError>) {
        self.inner.reporter.update_errors(key, error);
    }

    /// A reporting handle for components outside the discovered fields.
    pub fn reporter(&self) -> ErrorReporter {
        self.inner.reporter.clone()
    }

    pub fn is_valid(&self) -> bool {
        self.inner.reporter.is_valid()
    }

    pub fn errors(&self) -> Vec<(FieldKey, RuleError)> {
        self.inner.errors()
    }

    pub fn error(&self, key: &str) -> Option<RuleError> {
        self.inner.reporter.error(key)
    }

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------

    pub fn form(&self) -> &NodeRef {
        &self.inner.form
    }

    pub fn verification_key(&self) -> Option<&str> {
        self.inner.verification.as_ref().map(|v| v.key.as_str())
    }

    pub fn verification(&self) -> Option<&VerificationConfig> {
        self.inner.verification.as_ref()
    }
}

/// Builder for [`FormValidator`].
pub struct FormValidatorBuilder {
    form: NodeRef,
    config: ValidatorConfig,
    oracle: Option<Arc<dyn ScoreOracle>>,
    submit_action: Option<Arc<dyn SubmitAction>>,
}

impl FormValidatorBuilder {
    /// Replace the whole configuration.
    pub fn config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable verification with default settings.
    pub fn verification_key(mut self, key: impl Into<String>) -> Self {
        self.config = self.config.with_verification_key(key);
        self
    }

    pub fn verification(mut self, verification: VerificationConfig) -> Self {
        self.config = self.config.with_verification(verification);
        self
    }

    pub fn live_validation(mut self, enabled: bool) -> Self {
        self.config = self.config.with_live_validation(enabled);
        self
    }

    pub fn score_oracle(mut self, oracle: Arc<dyn ScoreOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Run `action` instead of native submission once all checks pass.
    pub fn submit_action(mut self, action: Arc<dyn SubmitAction>) -> Self {
        self.submit_action = Some(action);
        self
    }

    pub fn build(self) -> Result<FormValidator, FormError> {
        let form = self.form;
        match form.tag() {
            None => return Err(FormError::Detached),
            Some(Tag::Form) => {}
            Some(_) => return Err(FormError::NotAForm { id: form.id() }),
        }
        if form.has_attribute(ATTACHED_ATTRIBUTE) {
            return Err(FormError::AlreadyAttached { id: form.id() });
        }

        let reporter = ErrorReporter::new();
        let mut fields = Vec::new();
        let mut seen = HashSet::new();
        for node in form.query_selector_all(&class_selector(FIELD_MARKER)) {
            let field = Field::from_node(node, reporter.clone())?;
            if !seen.insert(field.key().clone()) {
                return Err(FormError::DuplicateFieldKey {
                    key: field.key().to_string(),
                });
            }
            fields.push(field);
        }

        let added_novalidate = !form.has_attribute(NOVALIDATE_ATTRIBUTE);
        form.set_attribute(NOVALIDATE_ATTRIBUTE, "true");
        form.set_attribute(ATTACHED_ATTRIBUTE, "true");
        let honeypot = form.query_selector(&class_selector(HONEYPOT_MARKER));

        if self.config.verification.is_some() && self.oracle.is_none() {
            log::warn!(
                "form '{}' has a verification key but no score oracle; submissions will be blocked",
                form.id()
            );
        }

        let validator = FormValidator {
            inner: Arc::new(ValidatorInner {
                form: form.clone(),
                verification: self.config.verification,
                oracle: self.oracle,
                submit_action: self.submit_action,
                in_flight: AtomicBool::new(false),
                honeypot: RwLock::new(honeypot),
                binding: RwLock::new(None),
                live_listeners: RwLock::new(Vec::new()),
                fields: RwLock::new(fields),
                reporter,
                added_novalidate,
            }),
        };

        if self.config.live_validation {
            let mut installed = Vec::new();
            for field in validator.fields() {
                let listener = Arc::new(LiveValidation {
                    inner: Arc::downgrade(&validator.inner),
                    key: field.key().clone(),
                });
                if let Some(id) = field.node().add_event_listener(EventKind::Input, listener) {
                    installed.push((field.node().clone(), id));
                }
            }
            if let Ok(mut guard) = validator.inner.live_listeners.write() {
                *guard = installed;
            }
        }

        match form.query_selector(&class_selector(SUBMIT_MARKER)) {
            Some(control) => validator.add_submission_button(&control, None)?,
            None => log::debug!("form '{}' has no submit control yet", form.id()),
        }

        log::info!(
            "validator attached to form '{}' with {} field(s)",
            form.id(),
            validator.fields().len()
        );
        Ok(validator)
    }
}
