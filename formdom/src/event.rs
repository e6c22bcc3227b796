use std::sync::Arc;

use async_trait::async_trait;

use crate::document::NodeRef;

/// Kinds of events a node can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Pointer activation of a control.
    Click,
    /// The control's value changed through user input.
    Input,
    /// The control lost focus after its value changed.
    Change,
}

/// An event being dispatched to a node's listeners.
///
/// Events do not bubble; only listeners registered on the target run.
#[derive(Debug, Clone)]
pub struct Event {
    kind: EventKind,
    target: NodeRef,
    default_prevented: bool,
}

impl Event {
    pub fn new(kind: EventKind, target: NodeRef) -> Self {
        Self {
            kind,
            target,
            default_prevented: false,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn target(&self) -> &NodeRef {
        &self.target
    }

    /// Suppress the host's default action (e.g. native form submission).
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Something that reacts to events on a node.
#[async_trait]
pub trait EventListener: Send + Sync {
    async fn handle_event(&self, event: &mut Event);
}

/// Handle returned by `add_event_listener`, used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Adapter turning a synchronous closure into an [`EventListener`].
pub struct ListenerFn<F>(F);

#[async_trait]
impl<F> EventListener for ListenerFn<F>
where
    F: Fn(&mut Event) + Send + Sync,
{
    async fn handle_event(&self, event: &mut Event) {
        (self.0)(event)
    }
}

/// Wrap a closure as a shareable listener.
pub fn listener_fn<F>(f: F) -> Arc<dyn EventListener>
where
    F: Fn(&mut Event) + Send + Sync + 'static,
{
    Arc::new(ListenerFn(f))
}
