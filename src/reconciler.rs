//! # Message reconciliation
//!
//! ## Responsibility
//! Decide, for every inbound chat record, whether it updates a message that is
//! already on screen or creates a new one, and hand the composed content to a
//! [`MessageSurface`].
//!
//! ## Guarantees
//! - At most one surface element exists per message id. Later records with the
//!   same id (typically the translation arriving after the original) replace
//!   the element's content in place.
//! - Elements are never removed during a session.
//! - The message class (sent/received) is fixed when the element is created.
//!
//! ## NOT Responsible For
//! - Error alerts (routed to the banner by the widget)
//! - Frame decoding (see [`crate::protocol`])

use std::collections::HashMap;

use crate::protocol::MessageRecord;
use crate::render::{compose, RenderedMessage, DEFAULT_SENDER_LABEL};
use crate::session::UserId;

/// Where rendered messages end up.
///
/// The reconciler only needs three capabilities: append a new element and get
/// a handle back, replace the content behind a handle, and scroll to the most
/// recent element.
pub trait MessageSurface {
    type Handle: Clone;

    fn append(&mut self, message: &RenderedMessage) -> Self::Handle;

    fn replace(&mut self, handle: &Self::Handle, message: &RenderedMessage);

    fn scroll_to_latest(&mut self);
}

/// Result of reconciling one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    Created { key: String },
    Updated { key: String },
}

impl Reconciled {
    pub fn key(&self) -> &str {
        match self {
            Reconciled::Created { key } | Reconciled::Updated { key } => key,
        }
    }
}

/// Upserts chat records into a surface, keyed by message id.
pub struct MessageReconciler<H> {
    viewer: UserId,
    sender_label: String,
    index: HashMap<String, H>,
}

impl<H: Clone> MessageReconciler<H> {
    pub fn new(viewer: UserId) -> Self {
        Self::with_sender_label(viewer, DEFAULT_SENDER_LABEL)
    }

    pub fn with_sender_label(viewer: UserId, sender_label: impl Into<String>) -> Self {
        Self {
            viewer,
            sender_label: sender_label.into(),
            index: HashMap::new(),
        }
    }

    /// Reconcile `record` into `surface`.
    pub fn apply<S>(&mut self, surface: &mut S, record: &MessageRecord) -> Reconciled
    where
        S: MessageSurface<Handle = H>,
    {
        let rendered = compose(record, &self.viewer, &self.sender_label);
        match self.index.get(&rendered.key) {
            Some(handle) => {
                surface.replace(handle, &rendered);
                tracing::debug!(key = %rendered.key, "updated message in place");
                Reconciled::Updated { key: rendered.key }
            }
            None => {
                let handle = surface.append(&rendered);
                surface.scroll_to_latest();
                tracing::debug!(key = %rendered.key, class = %rendered.class, "appended message");
                self.index.insert(rendered.key.clone(), handle);
                Reconciled::Created { key: rendered.key }
            }
        }
    }

    /// Handle of the element rendered for `key`, if any.
    pub fn lookup(&self, key: &str) -> Option<&H> {
        self.index.get(key)
    }

    /// Number of distinct messages rendered so far.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn viewer(&self) -> &UserId {
        &self.viewer
    }
}
