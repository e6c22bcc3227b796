use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

use crate::element::{Content, Element};
use crate::event::{Event, EventKind, EventListener, ListenerId};
use crate::selector::Selector;
use crate::types::{InputType, Tag};

struct Registration {
    id: ListenerId,
    kind: EventKind,
    listener: Arc<dyn EventListener>,
}

struct NodeData {
    id: String,
    tag: Tag,
    classes: Vec<String>,
    attributes: HashMap<String, String>,
    text: Option<String>,
    value: String,
    checked: bool,
    disabled: bool,
    parent: Option<usize>,
    children: Vec<usize>,
    listeners: Vec<Registration>,
}

impl NodeData {
    fn input_type(&self) -> InputType {
        self.attributes
            .get("type")
            .map(|t| InputType::parse(t))
            .unwrap_or_default()
    }

    /// Whether activating this node submits its form.
    fn is_submitter(&self) -> bool {
        match self.tag {
            Tag::Button => !matches!(
                self.attributes.get("type").map(String::as_str),
                Some("button") | Some("reset")
            ),
            Tag::Input => self.input_type() == InputType::Submit,
            _ => false,
        }
    }
}

#[derive(Default)]
struct DocumentInner {
    // Nodes are stored in document (pre-order) order.
    nodes: Vec<NodeData>,
    submissions: Vec<FormSubmission>,
    next_listener: u64,
}

impl DocumentInner {
    fn mount(&mut self, element: Element, parent: Option<usize>) -> usize {
        let index = self.nodes.len();
        let (text, children) = match element.content {
            Content::None => (None, Vec::new()),
            Content::Text(text) => (Some(text), Vec::new()),
            Content::Children(children) => (None, children),
        };

        self.nodes.push(NodeData {
            id: element.id,
            tag: element.tag,
            classes: element.classes,
            attributes: element.attributes,
            text,
            value: element.value,
            checked: element.checked,
            disabled: element.disabled,
            parent,
            children: Vec::new(),
            listeners: Vec::new(),
        });

        for child in children {
            let child_index = self.mount(child, Some(index));
            self.nodes[index].children.push(child_index);
        }

        index
    }

    /// Descendants of `index` in document order, excluding `index` itself.
    fn descendants(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.nodes[index].children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next].children.iter().rev().copied());
        }
        out
    }

    fn matches(&self, index: usize, selector: &Selector) -> bool {
        let node = &self.nodes[index];
        selector.matches(&node.id, node.tag.as_str(), &node.classes)
    }

    fn closest(&self, index: usize, tag: Tag) -> Option<usize> {
        let mut current = Some(index);
        while let Some(i) = current {
            if self.nodes[i].tag == tag {
                return Some(i);
            }
            current = self.nodes[i].parent;
        }
        None
    }

    /// Collect the name/value pairs a form would send.
    fn form_entries(&self, form: usize) -> Vec<(String, String)> {
        let mut entries = Vec::new();
        for i in self.descendants(form) {
            let node = &self.nodes[i];
            if !node.tag.is_control() || node.disabled {
                continue;
            }
            let Some(name) = node.attributes.get("name") else {
                continue;
            };
            let input_type = node.input_type();
            if matches!(input_type, InputType::Submit | InputType::Button) {
                continue;
            }
            if input_type.is_checkable() {
                if node.checked {
                    let value = if node.value.is_empty() { "on" } else { &node.value };
                    entries.push((name.clone(), value.to_string()));
                }
                continue;
            }
            entries.push((name.clone(), node.value.clone()));
        }
        entries
    }

    /// The host's built-in constraint check: every enabled `required`
    /// control must be filled in (or checked).
    fn native_constraints_ok(&self, form: usize) -> bool {
        self.descendants(form).into_iter().all(|i| {
            let node = &self.nodes[i];
            if !node.tag.is_control() || node.disabled || !node.attributes.contains_key("required") {
                return true;
            }
            if node.input_type().is_checkable() {
                node.checked
            } else {
                !node.value.is_empty()
            }
        })
    }

    fn submit(&mut self, form: usize) -> FormSubmission {
        let submission = FormSubmission {
            form_id: self.nodes[form].id.clone(),
            entries: self.form_entries(form),
        };
        log::debug!("form '{}' submitted", submission.form_id);
        self.submissions.push(submission.clone());
        submission
    }
}

/// A completed native form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmission {
    pub form_id: String,
    pub entries: Vec<(String, String)>,
}

impl FormSubmission {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A mounted element tree.
///
/// The document owns every node. [`NodeRef`] handles are non-owning: they
/// stop resolving once the last `Document` clone is dropped.
#[derive(Clone)]
pub struct Document {
    inner: Arc<RwLock<DocumentInner>>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let nodes = self.inner.read().map(|guard| guard.nodes.len()).unwrap_or(0);
        f.debug_struct("Document").field("nodes", &nodes).finish()
    }
}

impl Document {
    /// Mount an element tree.
    pub fn new(root: Element) -> Self {
        let mut inner = DocumentInner::default();
        inner.mount(root, None);
        Self {
            inner: Arc::new(RwLock::new(inner)),
        }
    }

    pub fn root(&self) -> NodeRef {
        self.node(0)
    }

    fn node(&self, index: usize) -> NodeRef {
        NodeRef {
            doc: Arc::downgrade(&self.inner),
            index,
        }
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeRef> {
        let index = self
            .inner
            .read()
            .ok()?
            .nodes
            .iter()
            .position(|node| node.id == id)?;
        Some(self.node(index))
    }

    pub fn query_selector(&self, selector: &str) -> Option<NodeRef> {
        let root = self.root();
        if root.matches(selector) {
            return Some(root);
        }
        root.query_selector(selector)
    }

    /// Dispatch an event to the target's listeners, then run the host's
    /// default action unless a listener prevented it.
    pub async fn dispatch(&self, target: &NodeRef, kind: EventKind) -> Event {
        let listeners: Vec<Arc<dyn EventListener>> = self
            .inner
            .read()
            .ok()
            .and_then(|guard| {
                guard.nodes.get(target.index).map(|node| {
                    node.listeners
                        .iter()
                        .filter(|r| r.kind == kind)
                        .map(|r| Arc::clone(&r.listener))
                        .collect()
                })
            })
            .unwrap_or_default();

        let mut event = Event::new(kind, target.clone());
        for listener in listeners {
            listener.handle_event(&mut event).await;
        }

        if !event.default_prevented() {
            self.default_action(&event);
        }

        event
    }

    /// Click a node.
    pub async fn click(&self, target: &NodeRef) -> Event {
        self.dispatch(target, EventKind::Click).await
    }

    /// Simulate user input: set the value, then dispatch an `Input` event.
    pub async fn input(&self, target: &NodeRef, value: impl Into<String>) -> Event {
        target.set_value(value);
        self.dispatch(target, EventKind::Input).await
    }

    fn default_action(&self, event: &Event) {
        if event.kind() != EventKind::Click {
            return;
        }
        let Ok(mut guard) = self.inner.write() else {
            return;
        };
        let index = event.target().index;
        let Some(node) = guard.nodes.get(index) else {
            return;
        };
        if !node.is_submitter() || node.disabled {
            return;
        }
        let Some(form) = guard.closest(index, Tag::Form) else {
            return;
        };
        let novalidate = guard.nodes[form].attributes.contains_key("novalidate");
        if !novalidate && !guard.native_constraints_ok(form) {
            log::debug!(
                "native validation blocked submission of '{}'",
                guard.nodes[form].id
            );
            return;
        }
        guard.submit(form);
    }

    /// All submissions that reached the host so far.
    pub fn submissions(&self) -> Vec<FormSubmission> {
        self.inner
            .read()
            .map(|guard| guard.submissions.clone())
            .unwrap_or_default()
    }
}

/// Non-owning handle to a node inside a [`Document`].
#[derive(Clone)]
pub struct NodeRef {
    doc: Weak<RwLock<DocumentInner>>,
    index: usize,
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && Weak::ptr_eq(&self.doc, &other.doc)
    }
}

impl Eq for NodeRef {}

impl std::fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.with(|node| node.id.clone()) {
            Some(id) => write!(f, "NodeRef({id})"),
            None => write!(f, "NodeRef(<detached>)"),
        }
    }
}

impl NodeRef {
    fn with<R>(&self, f: impl FnOnce(&NodeData) -> R) -> Option<R> {
        let doc = self.doc.upgrade()?;
        let guard = doc.read().ok()?;
        guard.nodes.get(self.index).map(f)
    }

    fn with_mut<R>(&self, f: impl FnOnce(&mut NodeData) -> R) -> Option<R> {
        let doc = self.doc.upgrade()?;
        let mut guard = doc.write().ok()?;
        guard.nodes.get_mut(self.index).map(f)
    }

    fn sibling(&self, index: usize) -> NodeRef {
        NodeRef {
            doc: self.doc.clone(),
            index,
        }
    }

    /// The owning document, if it is still alive.
    pub fn document(&self) -> Option<Document> {
        self.doc.upgrade().map(|inner| Document { inner })
    }

    pub fn is_attached(&self) -> bool {
        self.with(|_| ()).is_some()
    }

    // -------------------------------------------------------------------------
    // Identity
    // -------------------------------------------------------------------------

    pub fn id(&self) -> String {
        self.with(|node| node.id.clone()).unwrap_or_default()
    }

    pub fn tag(&self) -> Option<Tag> {
        self.with(|node| node.tag)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.with(|node| node.classes.iter().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn matches(&self, selector: &str) -> bool {
        let selector = Selector::parse(selector);
        self.with(|node| selector.matches(&node.id, node.tag.as_str(), &node.classes))
            .unwrap_or(false)
    }

    pub fn text(&self) -> Option<String> {
        self.with(|node| node.text.clone()).flatten()
    }

    // -------------------------------------------------------------------------
    // Attributes
    // -------------------------------------------------------------------------

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.with(|node| node.attributes.get(name).cloned()).flatten()
    }

    pub fn attributes(&self) -> HashMap<String, String> {
        self.with(|node| node.attributes.clone()).unwrap_or_default()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.with(|node| node.attributes.contains_key(name))
            .unwrap_or(false)
    }

    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        self.with_mut(|node| {
            node.attributes.insert(name, value);
        });
    }

    pub fn remove_attribute(&self, name: &str) {
        self.with_mut(|node| {
            node.attributes.remove(name);
        });
    }

    pub fn input_type(&self) -> InputType {
        self.with(NodeData::input_type).unwrap_or_default()
    }

    // -------------------------------------------------------------------------
    // Control state
    // -------------------------------------------------------------------------

    pub fn value(&self) -> String {
        self.with(|node| node.value.clone()).unwrap_or_default()
    }

    pub fn set_value(&self, value: impl Into<String>) {
        let value = value.into();
        self.with_mut(|node| node.value = value);
    }

    pub fn checked(&self) -> bool {
        self.with(|node| node.checked).unwrap_or(false)
    }

    pub fn set_checked(&self, checked: bool) {
        self.with_mut(|node| node.checked = checked);
    }

    pub fn disabled(&self) -> bool {
        self.with(|node| node.disabled).unwrap_or(false)
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.with_mut(|node| node.disabled = disabled);
    }

    // -------------------------------------------------------------------------
    // Traversal
    // -------------------------------------------------------------------------

    pub fn parent(&self) -> Option<NodeRef> {
        self.with(|node| node.parent)
            .flatten()
            .map(|index| self.sibling(index))
    }

    /// Nearest ancestor-or-self `<form>`.
    pub fn closest_form(&self) -> Option<NodeRef> {
        let doc = self.doc.upgrade()?;
        let guard = doc.read().ok()?;
        if self.index >= guard.nodes.len() {
            return None;
        }
        guard
            .closest(self.index, Tag::Form)
            .map(|index| self.sibling(index))
    }

    /// First descendant matching the selector, in document order.
    pub fn query_selector(&self, selector: &str) -> Option<NodeRef> {
        self.query_selector_all(selector).into_iter().next()
    }

    /// Every descendant matching the selector, in document order.
    pub fn query_selector_all(&self, selector: &str) -> Vec<NodeRef> {
        let selector = Selector::parse(selector);
        let Some(doc) = self.doc.upgrade() else {
            return Vec::new();
        };
        let Ok(guard) = doc.read() else {
            return Vec::new();
        };
        if self.index >= guard.nodes.len() {
            return Vec::new();
        }
        guard
            .descendants(self.index)
            .into_iter()
            .filter(|&i| guard.matches(i, &selector))
            .map(|i| self.sibling(i))
            .collect()
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    pub fn add_event_listener(
        &self,
        kind: EventKind,
        listener: Arc<dyn EventListener>,
    ) -> Option<ListenerId> {
        let doc = self.doc.upgrade()?;
        let mut guard = doc.write().ok()?;
        let id = ListenerId(guard.next_listener);
        let node = guard.nodes.get_mut(self.index)?;
        node.listeners.push(Registration { id, kind, listener });
        guard.next_listener += 1;
        Some(id)
    }

    /// Returns true if a listener was removed.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.with_mut(|node| {
            let before = node.listeners.len();
            node.listeners.retain(|r| r.id != id);
            node.listeners.len() != before
        })
        .unwrap_or(false)
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.with(|node| node.listeners.iter().filter(|r| r.kind == kind).count())
            .unwrap_or(0)
    }

    // -------------------------------------------------------------------------
    // Forms
    // -------------------------------------------------------------------------

    /// Submit this form programmatically.
    ///
    /// Like `HTMLFormElement.submit()`, this bypasses native constraint
    /// validation. Returns `None` if the node is not an attached form.
    pub fn submit(&self) -> Option<FormSubmission> {
        let doc = self.doc.upgrade()?;
        let mut guard = doc.write().ok()?;
        if guard.nodes.get(self.index)?.tag != Tag::Form {
            return None;
        }
        Some(guard.submit(self.index))
    }

    /// Name/value pairs this form would currently submit.
    pub fn form_entries(&self) -> Vec<(String, String)> {
        let Some(doc) = self.doc.upgrade() else {
            return Vec::new();
        };
        let Ok(guard) = doc.read() else {
            return Vec::new();
        };
        match guard.nodes.get(self.index) {
            Some(node) if node.tag == Tag::Form => guard.form_entries(self.index),
            _ => Vec::new(),
        }
    }
}
