use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::Content;
use crate::types::{InputType, Tag};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

fn generate_id(prefix: &str) -> String {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{id}")
}

/// Owned element description used to build a [`Document`](crate::Document).
///
/// Elements are plain data; once mounted into a document they are addressed
/// through [`NodeRef`](crate::NodeRef) handles instead.
#[derive(Debug, Clone)]
pub struct Element {
    // Identity
    pub id: String,
    pub tag: Tag,
    pub classes: Vec<String>,

    // Content
    pub content: Content,

    // Attributes (`name`, `type`, `required`, `data-*`, ...)
    pub attributes: HashMap<String, String>,

    // Control state
    pub value: String,
    pub checked: bool,
    pub disabled: bool,
}

impl Default for Element {
    fn default() -> Self {
        Self {
            id: generate_id("el"),
            tag: Tag::Div,
            classes: Vec::new(),
            content: Content::None,
            attributes: HashMap::new(),
            value: String::new(),
            checked: false,
            disabled: false,
        }
    }
}

impl Element {
    pub fn box_() -> Self {
        Self {
            id: generate_id("box"),
            ..Default::default()
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self {
            id: generate_id("text"),
            tag: Tag::Span,
            content: Content::Text(content.into()),
            ..Default::default()
        }
    }

    pub fn form() -> Self {
        Self {
            id: generate_id("form"),
            tag: Tag::Form,
            ..Default::default()
        }
    }

    /// Create an input control of the given type.
    pub fn input(input_type: InputType) -> Self {
        let mut attributes = HashMap::new();
        attributes.insert("type".to_string(), input_type.as_str().to_string());
        Self {
            id: generate_id("input"),
            tag: Tag::Input,
            attributes,
            ..Default::default()
        }
    }

    pub fn textarea() -> Self {
        Self {
            id: generate_id("textarea"),
            tag: Tag::TextArea,
            ..Default::default()
        }
    }

    /// Create a button. Buttons default to `type="submit"` like in HTML.
    pub fn button(label: impl Into<String>) -> Self {
        Self {
            id: generate_id("button"),
            tag: Tag::Button,
            content: Content::Text(label.into()),
            ..Default::default()
        }
    }

    /// Create a bare element of the given kind.
    pub fn from_tag(tag: Tag) -> Self {
        Self {
            id: generate_id(tag.as_str()),
            tag,
            ..Default::default()
        }
    }

    // Identity
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        let class = class.into();
        if !self.classes.contains(&class) {
            self.classes.push(class);
        }
        self
    }

    // Attributes
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn name(self, name: impl Into<String>) -> Self {
        self.attr("name", name)
    }

    /// Mark the control as required (boolean attribute).
    pub fn required(self) -> Self {
        self.attr("required", "")
    }

    // Control state
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    // Children
    pub fn child(mut self, child: Element) -> Self {
        match &mut self.content {
            Content::Children(children) => children.push(child),
            _ => self.content = Content::Children(vec![child]),
        }
        self
    }

    pub fn children(mut self, new_children: impl IntoIterator<Item = Element>) -> Self {
        for child in new_children {
            self = self.child(child);
        }
        self
    }
}
