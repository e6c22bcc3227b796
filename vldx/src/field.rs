//! Fields: one validated input each.

use std::borrow::Borrow;
use std::collections::HashMap;

use formdom::{InputType, NodeRef};
use serde::Serialize;

use crate::error::FormError;
use crate::registry::ErrorReporter;
use crate::rule::{select_error, Rule, RuleError};

/// Stable identity of a field within one validator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(transparent)]
pub struct FieldKey(String);

impl FieldKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the key for an element: its `name`, falling back to its id.
    pub fn for_node(node: &NodeRef) -> Option<Self> {
        node.attribute("name")
            .filter(|name| !name.is_empty())
            .or_else(|| Some(node.id()).filter(|id| !id.is_empty()))
            .map(Self)
    }
}

impl std::fmt::Display for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FieldKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for FieldKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&FieldKey> for FieldKey {
    fn from(key: &FieldKey) -> Self {
        key.clone()
    }
}

/// The state of a field as seen by its rules during one evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSnapshot {
    pub key: FieldKey,
    pub input_type: InputType,
    pub value: String,
    pub checked: bool,
    pub attributes: HashMap<String, String>,
}

impl FieldSnapshot {
    pub fn new(key: impl Into<FieldKey>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, input_type: InputType) -> Self {
        self.input_type = input_type;
        self
    }

    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn capture(key: &FieldKey, node: &NodeRef) -> Self {
        Self {
            key: key.clone(),
            input_type: node.input_type(),
            value: node.value(),
            checked: node.checked(),
            attributes: node.attributes(),
        }
    }
}

/// A form input wrapped with its rules.
///
/// A field reports into the validator only through its [`ErrorReporter`];
/// it cannot see sibling fields.
#[derive(Debug, Clone)]
pub struct Field {
    key: FieldKey,
    node: NodeRef,
    rules: Vec<Rule>,
    reporter: ErrorReporter,
}

impl Field {
    /// Wrap a discovered element, deriving rules from its attributes.
    pub(crate) fn from_node(node: NodeRef, reporter: ErrorReporter) -> Result<Self, FormError> {
        let key = FieldKey::for_node(&node).ok_or(FormError::MissingFieldKey)?;
        let rules = rules_from_attributes(&key, &node)?;
        log::debug!("field '{}' registered with {} rule(s)", key, rules.len());
        Ok(Self {
            key,
            node,
            rules,
            reporter,
        })
    }

    pub fn key(&self) -> &FieldKey {
        &self.key
    }

    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn input_type(&self) -> InputType {
        self.node.input_type()
    }

    pub(crate) fn push_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Current state of the underlying input.
    pub fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot::capture(&self.key, &self.node)
    }

    /// Evaluate the rules without touching the registry.
    pub fn check(&self) -> Option<RuleError> {
        select_error(&self.rules, &self.snapshot())
    }

    /// Evaluate the rules and report the outcome. Returns true if valid.
    pub fn validate(&self) -> bool {
        let error = self.check();
        let valid = error.is_none();
        self.reporter.update_errors(&self.key, error);
        valid
    }
}

/// Message for a rule kind: `data-vldx-<kind>` if present, else the default.
fn message(node: &NodeRef, kind: &str, default: &str) -> String {
    node.attribute(&format!("data-vldx-{kind}"))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_attr<T: std::str::FromStr>(
    key: &FieldKey,
    node: &NodeRef,
    attribute: &'static str,
) -> Result<Option<T>, FormError> {
    match node.attribute(attribute) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| FormError::invalid_attribute(key.as_str(), attribute, raw)),
    }
}

fn rules_from_attributes(key: &FieldKey, node: &NodeRef) -> Result<Vec<Rule>, FormError> {
    let input_type = node.input_type();
    let mut rules = Vec::new();

    if node.has_attribute("required") {
        let msg = message(node, "required", "This field is required");
        rules.push(if input_type.is_checkable() {
            Rule::checked(msg)
        } else {
            Rule::required(msg)
        });
    }

    match input_type {
        InputType::Email => {
            rules.push(Rule::email(message(node, "email", "Please enter a valid email address")));
        }
        InputType::Number => {
            rules.push(Rule::numeric(message(node, "numeric", "Please enter a number")));
            if let Some(min) = parse_attr::<f64>(key, node, "min")? {
                let msg = message(node, "min", &format!("Value must be at least {min}"));
                rules.push(Rule::min_value(min, msg));
            }
            if let Some(max) = parse_attr::<f64>(key, node, "max")? {
                let msg = message(node, "max", &format!("Value must be at most {max}"));
                rules.push(Rule::max_value(max, msg));
            }
        }
        _ => {}
    }

    if let Some(min) = parse_attr::<usize>(key, node, "minlength")? {
        let msg = message(node, "minlength", &format!("Please use at least {min} characters"));
        rules.push(Rule::min_length(min, msg));
    }
    if let Some(max) = parse_attr::<usize>(key, node, "maxlength")? {
        let msg = message(node, "maxlength", &format!("Please use at most {max} characters"));
        rules.push(Rule::max_length(max, msg));
    }

    if let Some(pattern) = node.attribute("pattern") {
        // Like the HTML attribute, the pattern must match the whole value.
        let anchored = format!("^(?:{pattern})$");
        let msg = message(node, "pattern", "Please match the requested format");
        let rule = Rule::pattern(&anchored, msg).map_err(|e| FormError::InvalidPattern {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        rules.push(rule);
    }

    Ok(rules)
}

#[cfg(test)]
mod tests {
    use formdom::{Document, Element};

    use super::*;

    fn mount(input: Element) -> (Document, NodeRef) {
        let doc = Document::new(Element::form().child(input.id("target")));
        let node = doc.get_element_by_id("target").unwrap();
        (doc, node)
    }

    #[test]
    fn test_key_prefers_name_over_id() {
        let (_doc, node) = mount(Element::input(InputType::Text).name("email"));
        assert_eq!(FieldKey::for_node(&node), Some(FieldKey::from("email")));

        let (_doc, node) = mount(Element::input(InputType::Text));
        assert_eq!(FieldKey::for_node(&node), Some(FieldKey::from("target")));
    }

    #[test]
    fn test_no_constraints_means_no_rules() {
        let (_doc, node) = mount(Element::input(InputType::Text).name("free"));
        let field = Field::from_node(node, ErrorReporter::default()).unwrap();
        assert!(field.rules().is_empty());
        assert!(field.validate());
    }

    #[test]
    fn test_required_email_prefers_required_message() {
        let (_doc, node) = mount(
            Element::input(InputType::Email)
                .name("email")
                .required()
                .attr("data-vldx-required", "We need your email"),
        );
        let reporter = ErrorReporter::default();
        let field = Field::from_node(node.clone(), reporter.clone()).unwrap();

        assert!(!field.validate());
        assert_eq!(
            reporter.error("email").map(|e| e.message),
            Some("We need your email".to_string())
        );

        node.set_value("nope");
        assert!(!field.validate());
        assert_eq!(
            reporter.error("email").map(|e| e.message),
            Some("Please enter a valid email address".to_string())
        );

        node.set_value("ada@example.com");
        assert!(field.validate());
        assert!(reporter.is_valid());
    }

    #[test]
    fn test_required_checkbox_uses_checked_state() {
        let (_doc, node) = mount(Element::input(InputType::Checkbox).name("terms").required());
        let field = Field::from_node(node.clone(), ErrorReporter::default()).unwrap();
        assert!(field.check().is_some());
        node.set_checked(true);
        assert!(field.check().is_none());
    }

    #[test]
    fn test_number_range_attributes() {
        let (_doc, node) = mount(
            Element::input(InputType::Number)
                .name("age")
                .attr("min", "18")
                .attr("max", "130"),
        );
        let field = Field::from_node(node.clone(), ErrorReporter::default()).unwrap();

        node.set_value("12");
        assert_eq!(field.check().unwrap().message, "Value must be at least 18");
        node.set_value("abc");
        assert_eq!(field.check().unwrap().message, "Please enter a number");
        node.set_value("30");
        assert!(field.check().is_none());
    }

    #[test]
    fn test_pattern_attribute_is_anchored() {
        let (_doc, node) = mount(Element::input(InputType::Text).name("zip").attr("pattern", r"\d{4}"));
        let field = Field::from_node(node.clone(), ErrorReporter::default()).unwrap();
        node.set_value("12345");
        assert!(field.check().is_some());
        node.set_value("1234");
        assert!(field.check().is_none());
    }

    #[test]
    fn test_bad_constraint_attributes_are_rejected() {
        let (_doc, node) = mount(Element::input(InputType::Text).name("x").attr("minlength", "many"));
        assert_eq!(
            Field::from_node(node, ErrorReporter::default()).unwrap_err(),
            FormError::invalid_attribute("x", "minlength", "many")
        );

        let (_doc, node) = mount(Element::input(InputType::Text).name("y").attr("pattern", "("));
        assert!(matches!(
            Field::from_node(node, ErrorReporter::default()),
            Err(FormError::InvalidPattern { .. })
        ));
    }
}
