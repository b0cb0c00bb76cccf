//! Document Nodes
//!
//! Markup lives in a `scraper` tree; this module holds what the markup does
//! not carry. Every node may have script-side flags (bound markers and the
//! like) and event listeners, kept beside the tree and keyed by [`NodeId`].

use smallvec::SmallVec;

use super::event::{EventKind, RegisteredListener};

/// Identifier of a node in a [`Document`](super::Document).
///
/// Ids are indices into the document's tree and are scoped to it. A node
/// removed from the document is detached, never reallocated, so an id held
/// across an await either still names the same node or names a node that
/// is no longer connected.
pub use ego_tree::NodeId;

/// Script-side state of one node.
#[derive(Default)]
pub(super) struct NodeState {
    flags: SmallVec<[&'static str; 2]>,
    listeners: Vec<RegisteredListener>,
}

impl NodeState {
    pub(super) fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| *f == flag)
    }

    /// Set a flag. Returns `false` if it was already set.
    pub(super) fn set_flag(&mut self, flag: &'static str) -> bool {
        if self.has_flag(flag) {
            return false;
        }
        self.flags.push(flag);
        true
    }

    pub(super) fn listeners(&self) -> &[RegisteredListener] {
        &self.listeners
    }

    pub(super) fn add_listener(&mut self, listener: RegisteredListener) {
        self.listeners.push(listener);
    }

    pub(super) fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.iter().filter(|l| l.kind == kind).count()
    }
}

impl std::fmt::Debug for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeState")
            .field("flags", &self.flags)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, Event};
    use std::sync::Arc;

    #[test]
    fn flags_are_set_once() {
        let mut state = NodeState::default();
        assert!(state.set_flag("bound"));
        assert!(!state.set_flag("bound"));
        assert!(state.has_flag("bound"));
        assert!(!state.has_flag("other"));
    }

    #[test]
    fn listeners_are_counted_per_kind() {
        let mut state = NodeState::default();
        let noop = Arc::new(|_: &mut Event, _: &mut Document| {});
        state.add_listener(RegisteredListener {
            kind: EventKind::Click,
            capture: true,
            listener: noop.clone(),
        });
        state.add_listener(RegisteredListener {
            kind: EventKind::Submit,
            capture: false,
            listener: noop,
        });

        assert_eq!(state.listener_count(EventKind::Click), 1);
        assert_eq!(state.listener_count(EventKind::Submit), 1);
        assert_eq!(state.listeners().len(), 2);
    }
}
