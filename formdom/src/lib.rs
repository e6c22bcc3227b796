//! A small host document model for form handling.
//!
//! Elements are described with a builder, mounted into a [`Document`], and
//! then addressed through non-owning [`NodeRef`] handles. Clicking a submit
//! control runs registered listeners and, unless one of them prevents it, the
//! host's native submission (including the built-in `required` check that
//! `novalidate` turns off).

pub mod document;
pub mod element;
pub mod event;
pub mod selector;
pub mod types;

pub use document::{Document, FormSubmission, NodeRef};
pub use element::Element;
pub use event::{listener_fn, Event, EventKind, EventListener, ListenerId};
pub use selector::Selector;
pub use types::*;
