//! JSON form fixtures.
//!
//! A fixture describes one form as a tree of nodes, the validator
//! configuration to attach with, and optionally where verification scores
//! come from:
//!
//! ```json
//! {
//!   "form": {
//!     "tag": "form",
//!     "id": "contact",
//!     "children": [
//!       { "tag": "input", "type": "email", "name": "email",
//!         "class": ["vldx-field"], "attributes": { "required": "" },
//!         "value": "ada@example.com" },
//!       { "tag": "button", "class": ["vldx-submit"], "text": "Send" }
//!     ]
//!   },
//!   "config": { "verification": { "key": "site-key", "threshold": 0.5 } },
//!   "score": 0.9
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use formdom::element::Content;
use formdom::{Document, Element, InputType, NodeRef, Tag};
use serde::Deserialize;
use url::Url;
use vldx::config::ValidatorConfig;
use vldx::error::FormError;

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("Failed to read fixture {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid fixture JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown tag '{0}'")]
    UnknownTag(String),

    #[error("Fixture contains no form")]
    NoForm,

    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error(transparent)]
    Form(#[from] FormError),
}

/// One node of a fixture tree.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NodeSpec {
    pub tag: String,
    pub id: Option<String>,
    #[serde(rename = "class")]
    pub classes: Vec<String>,
    #[serde(rename = "type")]
    pub input_type: Option<String>,
    pub name: Option<String>,
    pub attributes: HashMap<String, String>,
    pub value: Option<String>,
    pub checked: bool,
    pub disabled: bool,
    pub text: Option<String>,
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    /// Convert into an element tree, rejecting unknown tags.
    pub fn into_element(self) -> Result<Element, FixtureError> {
        let tag = Tag::parse(&self.tag).ok_or_else(|| FixtureError::UnknownTag(self.tag.clone()))?;
        let mut element = match tag {
            Tag::Input => Element::input(
                self.input_type
                    .as_deref()
                    .map(InputType::parse)
                    .unwrap_or_default(),
            ),
            other => Element::from_tag(other),
        };

        if let Some(id) = self.id {
            element = element.id(id);
        }
        for class in self.classes {
            element = element.class(class);
        }
        if let Some(name) = self.name {
            element = element.name(name);
        }
        for (name, value) in self.attributes {
            element = element.attr(name, value);
        }
        if let Some(value) = self.value {
            element = element.value(value);
        }
        element = element.checked(self.checked).disabled(self.disabled);

        if self.children.is_empty() {
            if let Some(text) = self.text {
                element.content = Content::Text(text);
            }
        } else {
            let children = self
                .children
                .into_iter()
                .map(NodeSpec::into_element)
                .collect::<Result<Vec<_>, _>>()?;
            element = element.children(children);
        }

        Ok(element)
    }
}

/// A parsed fixture file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub form: NodeSpec,
    pub config: ValidatorConfig,
    /// Fixed verification score.
    pub score: Option<f64>,
    /// Scoring service to query instead of a fixed score.
    pub endpoint: Option<String>,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let raw = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn endpoint_url(&self) -> Result<Option<Url>, FixtureError> {
        self.endpoint
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(FixtureError::from)
    }

    /// Mount the form tree. Returns the document and its first form.
    pub fn mount(&self) -> Result<(Document, NodeRef), FixtureError> {
        let document = Document::new(self.form.clone().into_element()?);
        let form = document
            .query_selector(Tag::Form.as_str())
            .ok_or(FixtureError::NoForm)?;
        Ok((document, form))
    }
}
