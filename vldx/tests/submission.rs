use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use formdom::{listener_fn, Document, Element, EventKind, InputType, NodeRef};
use vldx::prelude::*;
use vldx::{ATTACHED_ATTRIBUTE, FIELD_MARKER, HONEYPOT_MARKER, SUBMIT_MARKER};

fn contact_form(with_honeypot: bool) -> Document {
    let mut form = Element::form()
        .id("contact")
        .child(
            Element::input(InputType::Text)
                .id("name")
                .name("name")
                .class(FIELD_MARKER)
                .required(),
        )
        .child(
            Element::input(InputType::Email)
                .id("email")
                .name("email")
                .class(FIELD_MARKER)
                .required(),
        );
    if with_honeypot {
        form = form.child(
            Element::input(InputType::Text)
                .id("website")
                .name("website")
                .class(HONEYPOT_MARKER),
        );
    }
    form = form
        .child(Element::button("Send").id("send").class(SUBMIT_MARKER))
        .child(Element::button("Other").id("other"));
    Document::new(form)
}

fn node(doc: &Document, id: &str) -> NodeRef {
    doc.get_element_by_id(id).unwrap()
}

fn fill_valid(doc: &Document) {
    node(doc, "name").set_value("Ada Lovelace");
    node(doc, "email").set_value("ada@example.com");
}

struct CountingOracle {
    score: f64,
    calls: AtomicUsize,
    seen: Mutex<Vec<(String, String)>>,
}

impl CountingOracle {
    fn new(score: f64) -> Arc<Self> {
        Arc::new(Self {
            score,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScoreOracle for CountingOracle {
    async fn score(&self, key: &str, action: &str) -> Result<f64, VerificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((key.to_string(), action.to_string()));
        Ok(self.score)
    }
}

struct FailingOracle;

#[async_trait]
impl ScoreOracle for FailingOracle {
    async fn score(&self, _key: &str, _action: &str) -> Result<f64, VerificationError> {
        Err(VerificationError::Status { status: 503 })
    }
}

struct SlowOracle;

#[async_trait]
impl ScoreOracle for SlowOracle {
    async fn score(&self, _key: &str, _action: &str) -> Result<f64, VerificationError> {
        tokio::time::sleep(Duration::from_secs(1)).await;
        Ok(0.9)
    }
}

#[derive(Default)]
struct RecordingAction {
    forms: Mutex<Vec<String>>,
}

#[async_trait]
impl SubmitAction for RecordingAction {
    async fn submit(&self, form: &NodeRef) {
        self.forms.lock().unwrap().push(form.id());
    }
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_construction_marks_form_novalidate() {
    let doc = contact_form(false);
    let form = doc.root();
    let _validator = FormValidator::new(&form, None).unwrap();
    assert_eq!(form.attribute("novalidate").as_deref(), Some("true"));
}

#[test]
fn test_fields_discovered_in_document_order() {
    let doc = Document::new(
        Element::form()
            .child(Element::box_().child(Element::input(InputType::Text).name("first").class(FIELD_MARKER)))
            .child(Element::input(InputType::Text).name("second").class(FIELD_MARKER))
            .child(Element::input(InputType::Text).name("ignored"))
            .child(Element::box_().child(Element::textarea().name("third").class(FIELD_MARKER))),
    );
    let validator = FormValidator::new(&doc.root(), None).unwrap();
    let keys: Vec<String> = validator.fields().iter().map(|f| f.key().to_string()).collect();
    assert_eq!(keys, vec!["first", "second", "third"]);
}

#[test]
fn test_accessors_reflect_configuration() {
    let doc = contact_form(true);
    let validator = FormValidator::new(&doc.root(), Some("site-key")).unwrap();
    assert_eq!(validator.form(), &doc.root());
    assert_eq!(validator.verification_key(), Some("site-key"));
    assert_eq!(validator.honeypot(), Some(node(&doc, "website")));
    assert_eq!(validator.submit_control(), Some(node(&doc, "send")));
    assert!(validator.uses_default_checks());
    assert!(validator.is_valid());

    let plain = contact_form(false);
    let validator = FormValidator::new(&plain.root(), None).unwrap();
    assert_eq!(validator.verification_key(), None);
    assert_eq!(validator.honeypot(), None);
}

#[test]
fn test_duplicate_field_keys_rejected() {
    let doc = Document::new(
        Element::form()
            .child(Element::input(InputType::Text).name("email").class(FIELD_MARKER))
            .child(Element::input(InputType::Email).name("email").class(FIELD_MARKER)),
    );
    assert_eq!(
        FormValidator::new(&doc.root(), None).unwrap_err(),
        FormError::DuplicateFieldKey {
            key: "email".to_string()
        }
    );
    // Nothing was annotated on failure.
    assert!(!doc.root().has_attribute("novalidate"));
}

#[test]
fn test_non_form_and_detached_rejected() {
    let doc = contact_form(false);
    assert!(matches!(
        FormValidator::new(&node(&doc, "name"), None),
        Err(FormError::NotAForm { .. })
    ));

    let root = doc.root();
    drop(doc);
    assert_eq!(FormValidator::new(&root, None).unwrap_err(), FormError::Detached);
}

// ============================================================================
// Error state
// ============================================================================

#[test]
fn test_highest_priority_error_is_reported() {
    let doc = Document::new(Element::form().child(Element::input(InputType::Text).name("email").class(FIELD_MARKER)));
    let validator = FormValidator::new(&doc.root(), None).unwrap();
    validator
        .add_rule("email", Rule::new(|_| false, RuleError::new(1, "invalid format")))
        .unwrap();
    validator
        .add_rule("email", Rule::new(|_| false, RuleError::new(5, "required")))
        .unwrap();

    assert!(!validator.validate());
    assert_eq!(validator.error("email"), Some(RuleError::new(5, "required")));
    assert_eq!(validator.errors().len(), 1);
}

#[test]
fn test_add_rule_to_unknown_field() {
    let doc = contact_form(false);
    let validator = FormValidator::new(&doc.root(), None).unwrap();
    assert_eq!(
        validator.add_rule("phone", Rule::required("x")).unwrap_err(),
        FormError::unknown_field("phone")
    );
}

#[test]
fn test_update_errors_from_external_source() {
    let doc = contact_form(false);
    let validator = FormValidator::new(&doc.root(), None).unwrap();

    validator.update_errors("consent", Some(RuleError::new(10, "please confirm")));
    validator.update_errors("consent", Some(RuleError::new(10, "please confirm")));
    assert!(!validator.is_valid());
    assert_eq!(validator.errors().len(), 1);

    validator.update_errors("unknown", None);
    assert!(!validator.is_valid());

    validator.update_errors("consent", None);
    assert!(validator.is_valid());

    let reporter = validator.reporter();
    reporter.update_errors("consent", Some(RuleError::new(10, "please confirm")));
    assert_eq!(validator.error("consent").map(|e| e.priority), Some(10));
    reporter.update_errors("consent", None);
    assert!(validator.is_valid());
}

#[test]
fn test_errors_follow_field_order() {
    let doc = contact_form(false);
    let validator = FormValidator::new(&doc.root(), None).unwrap();
    validator.update_errors("zzz", Some(RuleError::new(1, "external")));
    assert!(!validator.validate());

    let keys: Vec<String> = validator.errors().iter().map(|(k, _)| k.to_string()).collect();
    assert_eq!(keys, vec!["name", "email", "zzz"]);
}

#[tokio::test]
async fn test_live_validation_on_input() {
    let doc = contact_form(false);
    let validator = FormValidator::builder(&doc.root())
        .live_validation(true)
        .build()
        .unwrap();
    let email = node(&doc, "email");

    doc.input(&email, "not-an-email").await;
    assert_eq!(
        validator.error("email").map(|e| e.message),
        Some("Please enter a valid email address".to_string())
    );
    assert!(validator.error("name").is_none());

    doc.input(&email, "ada@example.com").await;
    assert!(validator.error("email").is_none());
    assert!(validator.is_valid());
}

// ============================================================================
// Submission: fields
// ============================================================================

#[tokio::test]
async fn test_invalid_fields_block_submission() {
    let doc = contact_form(false);
    let validator = FormValidator::new(&doc.root(), None).unwrap();

    let event = doc.click(&node(&doc, "send")).await;
    assert!(event.default_prevented());
    assert!(doc.submissions().is_empty());
    assert!(!validator.is_valid());
    assert_eq!(
        validator.error("name"),
        Some(RuleError::new(priority::REQUIRED, "This field is required"))
    );
}

#[tokio::test]
async fn test_valid_fields_submit_natively() {
    let doc = contact_form(false);
    let validator = FormValidator::new(&doc.root(), None).unwrap();

    doc.click(&node(&doc, "send")).await;
    assert!(doc.submissions().is_empty());

    fill_valid(&doc);
    doc.click(&node(&doc, "send")).await;
    assert!(validator.is_valid());

    let submissions = doc.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].get("email"), Some("ada@example.com"));
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_dropping_last_handle_detaches() {
    let doc = contact_form(false);
    let form = doc.root();
    let send = node(&doc, "send");
    let validator = FormValidator::new(&form, None).unwrap();
    let clone = validator.clone();

    drop(validator);
    assert_eq!(send.listener_count(EventKind::Click), 1);
    assert!(form.has_attribute(ATTACHED_ATTRIBUTE));

    drop(clone);
    assert_eq!(send.listener_count(EventKind::Click), 0);
    assert!(!form.has_attribute(ATTACHED_ATTRIBUTE));
    assert!(!form.has_attribute("novalidate"));

    // Native constraint validation is back in charge.
    doc.click(&send).await;
    assert!(doc.submissions().is_empty());
}

#[test]
fn test_detach_keeps_existing_novalidate() {
    let doc = Document::new(
        Element::form()
            .attr("novalidate", "")
            .child(Element::input(InputType::Text).name("q").class(FIELD_MARKER)),
    );
    drop(FormValidator::new(&doc.root(), None).unwrap());
    assert!(doc.root().has_attribute("novalidate"));
}

#[test]
fn test_live_listeners_removed_on_drop() {
    let doc = contact_form(false);
    let email = node(&doc, "email");
    let validator = FormValidator::builder(&doc.root())
        .live_validation(true)
        .build()
        .unwrap();
    assert_eq!(email.listener_count(EventKind::Input), 1);

    drop(validator);
    assert_eq!(email.listener_count(EventKind::Input), 0);
}

#[test]
fn test_second_attach_is_rejected() {
    let doc = contact_form(false);
    let form = doc.root();
    let _first = FormValidator::new(&form, None).unwrap();
    assert_eq!(
        FormValidator::new(&form, Some("site-key")).unwrap_err(),
        FormError::AlreadyAttached {
            id: "contact".to_string()
        }
    );
    assert_eq!(node(&doc, "send").listener_count(EventKind::Click), 1);
}

#[tokio::test]
async fn test_reattach_after_drop_enforces_new_verification() {
    let doc = contact_form(false);
    let form = doc.root();
    let send = node(&doc, "send");
    drop(FormValidator::new(&form, None).unwrap());

    let validator = FormValidator::builder(&form)
        .verification_key("site-key")
        .score_oracle(Arc::new(FixedScore(0.0)))
        .build()
        .unwrap();
    fill_valid(&doc);

    assert_eq!(send.listener_count(EventKind::Click), 1);
    doc.click(&send).await;
    assert!(doc.submissions().is_empty());
    assert!(matches!(
        validator.attempt_submission().await,
        SubmissionDecision::VerificationFailed(VerificationError::BelowThreshold { .. })
    ));
}

// ============================================================================
// Submission: honeypot
// ============================================================================

#[tokio::test]
async fn test_filled_honeypot_blocks_valid_form() {
    let doc = contact_form(true);
    let validator = FormValidator::new(&doc.root(), None).unwrap();
    fill_valid(&doc);
    node(&doc, "website").set_value("x");

    let decision = validator.attempt_submission().await;
    assert!(matches!(decision, SubmissionDecision::SpamDetected));
    assert!(doc.submissions().is_empty());
    // Silent: no error state is produced.
    assert!(validator.is_valid());
    assert!(validator.errors().is_empty());
}

#[tokio::test]
async fn test_filled_honeypot_does_not_reveal_field_errors() {
    let doc = contact_form(true);
    let validator = FormValidator::new(&doc.root(), None).unwrap();
    node(&doc, "website").set_value("x");

    doc.click(&node(&doc, "send")).await;
    assert!(validator.errors().is_empty());
    assert!(doc.submissions().is_empty());
}

#[tokio::test]
async fn test_absent_honeypot_never_blocks() {
    let doc = contact_form(false);
    let validator = FormValidator::new(&doc.root(), None).unwrap();
    fill_valid(&doc);

    assert!(validator.honeypot().is_none());
    assert!(validator.attempt_submission().await.is_allowed());
    assert_eq!(doc.submissions().len(), 1);
}

#[tokio::test]
async fn test_honeypot_set_after_construction() {
    let doc = Document::new(
        Element::form()
            .child(Element::input(InputType::Text).name("name").class(FIELD_MARKER))
            .child(Element::input(InputType::Text).id("decoy").name("fax")),
    );
    let validator = FormValidator::new(&doc.root(), None).unwrap();
    node(&doc, "decoy").set_value("555-1234");
    assert!(validator.attempt_submission().await.is_allowed());

    validator.set_honeypot(node(&doc, "decoy"));
    assert!(matches!(
        validator.attempt_submission().await,
        SubmissionDecision::SpamDetected
    ));
    assert_eq!(doc.submissions().len(), 1);
}

// ============================================================================
// Submission: verification
// ============================================================================

#[tokio::test]
async fn test_below_threshold_blocks_valid_form() {
    let doc = contact_form(true);
    let oracle = CountingOracle::new(0.1);
    let validator = FormValidator::builder(&doc.root())
        .verification_key("site-key")
        .score_oracle(oracle.clone())
        .build()
        .unwrap();
    fill_valid(&doc);

    let decision = validator.attempt_submission().await;
    assert!(matches!(
        decision,
        SubmissionDecision::VerificationFailed(VerificationError::BelowThreshold { .. })
    ));
    assert!(validator.is_valid());
    assert!(doc.submissions().is_empty());
    assert_eq!(oracle.calls(), 1);
}

#[tokio::test]
async fn test_passing_score_submits() {
    let doc = contact_form(true);
    let oracle = CountingOracle::new(0.9);
    let validator = FormValidator::builder(&doc.root())
        .verification(VerificationConfig::new("site-key").with_action("contact"))
        .score_oracle(oracle.clone())
        .build()
        .unwrap();
    assert_eq!(validator.verification().map(|v| v.action.as_str()), Some("contact"));
    fill_valid(&doc);

    doc.click(&node(&doc, "send")).await;
    assert_eq!(doc.submissions().len(), 1);
    assert_eq!(
        *oracle.seen.lock().unwrap(),
        vec![("site-key".to_string(), "contact".to_string())]
    );
}

#[tokio::test]
async fn test_key_without_oracle_blocks() {
    let doc = contact_form(false);
    let validator = FormValidator::new(&doc.root(), Some("site-key")).unwrap();
    fill_valid(&doc);

    assert!(matches!(
        validator.attempt_submission().await,
        SubmissionDecision::VerificationFailed(VerificationError::NoOracle)
    ));
    assert!(doc.submissions().is_empty());
}

#[tokio::test]
async fn test_oracle_failure_blocks() {
    let doc = contact_form(false);
    let validator = FormValidator::builder(&doc.root())
        .verification_key("site-key")
        .score_oracle(Arc::new(FailingOracle))
        .build()
        .unwrap();
    fill_valid(&doc);

    doc.click(&node(&doc, "send")).await;
    assert!(doc.submissions().is_empty());
    assert!(matches!(
        validator.attempt_submission().await,
        SubmissionDecision::VerificationFailed(VerificationError::Status { status: 503 })
    ));
}

#[tokio::test]
async fn test_verification_skipped_while_fields_invalid() {
    let doc = contact_form(false);
    let oracle = CountingOracle::new(0.9);
    let validator = FormValidator::builder(&doc.root())
        .verification_key("site-key")
        .score_oracle(oracle.clone())
        .build()
        .unwrap();

    assert!(matches!(
        validator.attempt_submission().await,
        SubmissionDecision::Invalid(_)
    ));
    assert_eq!(oracle.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_attempt_is_suppressed() {
    let doc = contact_form(false);
    let validator = FormValidator::builder(&doc.root())
        .verification_key("site-key")
        .score_oracle(Arc::new(SlowOracle))
        .build()
        .unwrap();
    fill_valid(&doc);

    let (first, second) = tokio::join!(validator.attempt_submission(), validator.attempt_submission());
    assert!(first.is_allowed());
    assert!(matches!(second, SubmissionDecision::InFlight));

    assert!(validator.attempt_submission().await.is_allowed());
    assert_eq!(doc.submissions().len(), 2);
}

// ============================================================================
// Submission: control binding
// ============================================================================

#[tokio::test]
async fn test_custom_listener_runs_alone() {
    let doc = contact_form(true);
    let oracle = CountingOracle::new(0.0);
    let validator = FormValidator::builder(&doc.root())
        .verification_key("site-key")
        .score_oracle(oracle.clone())
        .build()
        .unwrap();
    node(&doc, "website").set_value("x");

    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let custom = listener_fn(move |event| {
        counter.fetch_add(1, Ordering::SeqCst);
        event.prevent_default();
    });
    let other = node(&doc, "other");
    validator.add_submission_button(&other, Some(custom)).unwrap();
    assert!(!validator.uses_default_checks());

    doc.click(&other).await;
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(oracle.calls(), 0);
    assert!(validator.errors().is_empty());
    assert!(doc.submissions().is_empty());
}

#[tokio::test]
async fn test_custom_listener_owns_submission() {
    let doc = contact_form(false);
    let validator = FormValidator::new(&doc.root(), None).unwrap();
    let send = node(&doc, "send");
    validator
        .add_submission_button(&send, Some(listener_fn(|_| {})))
        .unwrap();

    // Fields are invalid, but nothing checks them and nothing prevents the
    // native action.
    doc.click(&send).await;
    assert_eq!(doc.submissions().len(), 1);
    assert!(validator.is_valid());
}

#[tokio::test]
async fn test_rebinding_moves_the_default_checks() {
    let doc = contact_form(false);
    let validator = FormValidator::new(&doc.root(), None).unwrap();
    let send = node(&doc, "send");
    let other = node(&doc, "other");
    assert_eq!(send.listener_count(EventKind::Click), 1);

    validator.add_submission_button(&other, None).unwrap();
    assert_eq!(send.listener_count(EventKind::Click), 0);
    assert_eq!(other.listener_count(EventKind::Click), 1);
    assert_eq!(validator.submit_control(), Some(other.clone()));

    doc.click(&other).await;
    assert!(!validator.is_valid());
    assert!(doc.submissions().is_empty());
}

#[tokio::test]
async fn test_submit_action_replaces_native_submission() {
    let doc = contact_form(false);
    let action = Arc::new(RecordingAction::default());
    let validator = FormValidator::builder(&doc.root())
        .submit_action(action.clone())
        .build()
        .unwrap();
    fill_valid(&doc);

    assert!(validator.attempt_submission().await.is_allowed());
    assert!(doc.submissions().is_empty());
    assert_eq!(*action.forms.lock().unwrap(), vec!["contact".to_string()]);
}

#[tokio::test]
async fn test_forms_are_independent() {
    let doc = Document::new(
        Element::box_()
            .child(
                Element::form()
                    .id("a")
                    .child(Element::input(InputType::Text).name("q").class(FIELD_MARKER).required())
                    .child(Element::button("Go").id("go-a").class(SUBMIT_MARKER)),
            )
            .child(
                Element::form()
                    .id("b")
                    .child(Element::input(InputType::Text).name("q").class(FIELD_MARKER))
                    .child(Element::button("Go").id("go-b").class(SUBMIT_MARKER)),
            ),
    );
    let a = FormValidator::new(&node(&doc, "a"), None).unwrap();
    let b = FormValidator::new(&node(&doc, "b"), None).unwrap();

    doc.click(&node(&doc, "go-a")).await;
    doc.click(&node(&doc, "go-b")).await;

    assert!(!a.is_valid());
    assert!(b.is_valid());
    let submitted: Vec<String> = doc.submissions().into_iter().map(|s| s.form_id).collect();
    assert_eq!(submitted, vec!["b"]);
}
