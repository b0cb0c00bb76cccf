//! Document
//!
//! A `scraper` tree rooted at a document node with `<html>`, `<head>` and
//! `<body>`, plus the script-side state of its nodes. Queries match
//! `scraper` selectors against the connected tree in document order.
//!
//! Child-list changes on connected nodes are reported to observers as
//! [`MutationRecord`]s over unbounded channels. Delivery is always
//! asynchronous: an observer never runs while the writer holds the document.

use std::collections::HashMap;
use std::fmt;

use ego_tree::NodeRef;
use scraper::node::Element;
use scraper::{ElementRef, Html, Node, Selector};
use tokio::sync::mpsc;

use super::event::{self, DispatchOutcome, EventKind, Listener, RegisteredListener};
use super::html;
use super::node::{NodeId, NodeState};

/// Loading state of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Complete,
}

/// A child-list change somewhere in the connected tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

/// An in-memory document tree.
pub struct Document {
    tree: Html,
    root: NodeId,
    body: NodeId,
    ready_state: ReadyState,
    state: HashMap<NodeId, NodeState>,
    observers: Vec<mpsc::UnboundedSender<MutationRecord>>,
}

impl Document {
    /// Create an empty, still-loading document with a `<body>`.
    pub fn new() -> Self {
        let mut tree = Html::new_document();
        let root = tree.tree.root().id();
        let body = {
            let mut root = tree.tree.root_mut();
            let mut element = root.append(html::element("html"));
            element.append(html::element("head"));
            element.append(html::element("body")).id()
        };

        Self {
            tree,
            root,
            body,
            ready_state: ReadyState::Loading,
            state: HashMap::new(),
            observers: Vec::new(),
        }
    }

    /// Create a fully loaded document whose body holds `markup`.
    pub fn from_html(markup: &str) -> Self {
        let mut doc = Self::new();
        let body = doc.body;
        doc.set_inner_html(body, markup);
        doc.ready_state = ReadyState::Complete;
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    pub fn set_ready_state(&mut self, state: ReadyState) {
        self.ready_state = state;
    }

    fn get(&self, id: NodeId) -> Option<NodeRef<'_, Node>> {
        self.tree.tree.get(id)
    }

    /// The element `id` names, for reading it through `scraper`.
    pub fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.get(id).and_then(ElementRef::wrap)
    }

    /// Lowercase tag name for elements, `None` otherwise.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.value().name())
    }

    // ------------------------------------------------------------------
    // Construction and structure
    // ------------------------------------------------------------------

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.tree.tree.orphan(html::element(tag)).id()
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.tree.tree.orphan(html::text(text)).id()
    }

    fn can_have_children(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| {
            matches!(n.value(), Node::Element(_) | Node::Document | Node::Fragment)
        })
    }

    /// Whether `child` may be moved under `parent`.
    fn can_adopt(&self, parent: NodeId, child: NodeId) -> bool {
        parent != child
            && child != self.root
            && self.get(child).is_some()
            && self.can_have_children(parent)
            && !self.ancestors(parent).contains(&child)
    }

    /// Append `child` to `parent`, moving it if it is already attached.
    ///
    /// Returns `false` (and changes nothing) if either node is unknown, the
    /// parent cannot hold children, or the move would create a cycle.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.can_adopt(parent, child) {
            return false;
        }
        if let Some(mut p) = self.tree.tree.get_mut(parent) {
            p.append_id(child);
        }

        self.record(MutationRecord {
            target: parent,
            added: vec![child],
            removed: Vec::new(),
        });
        true
    }

    /// Detach `node` and its subtree from the document. Their flags and
    /// listeners are dropped.
    pub fn remove(&mut self, node: NodeId) -> bool {
        if node == self.root || self.get(node).is_none() {
            return false;
        }
        let parent = self.parent(node);
        let connected = parent.is_some_and(|p| self.is_connected(p));

        self.detach(node);

        if let (Some(parent), true) = (parent, connected) {
            self.notify(MutationRecord {
                target: parent,
                added: Vec::new(),
                removed: vec![node],
            });
        }
        true
    }

    /// Remove every child of `node`.
    pub fn clear_children(&mut self, node: NodeId) {
        self.replace_children(node, Vec::new());
    }

    /// Replace the children of `node` with `children`, as one mutation.
    pub fn replace_children(&mut self, node: NodeId, children: Vec<NodeId>) {
        if !self.can_have_children(node) {
            return;
        }

        let removed = self.children(node);
        for &old in &removed {
            self.detach(old);
        }

        let mut added = Vec::with_capacity(children.len());
        for child in children {
            if !self.can_adopt(node, child) {
                continue;
            }
            if let Some(mut n) = self.tree.tree.get_mut(node) {
                n.append_id(child);
            }
            added.push(child);
        }

        if !added.is_empty() || !removed.is_empty() {
            self.record(MutationRecord {
                target: node,
                added,
                removed,
            });
        }
    }

    /// Replace the children of `node` with parsed `markup`.
    pub fn set_inner_html(&mut self, node: NodeId, markup: &str) {
        let fragment = Html::parse_fragment(markup);
        // The fragment is <html> under a fragment root; its children are
        // the nodes we want.
        let grafted = self.tree.tree.extend_tree(fragment.tree).id();
        let children = self
            .get(grafted)
            .and_then(|root| root.children().find(|c| c.value().is_element()))
            .map(|wrapper| wrapper.children().map(|c| c.id()).collect())
            .unwrap_or_default();
        self.replace_children(node, children);
    }

    /// Replace the children of `node` with a single text node.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        let child = self.create_text(text);
        self.replace_children(node, vec![child]);
    }

    /// Serialize the children of `node` back to markup.
    pub fn inner_html(&self, node: NodeId) -> String {
        self.element(node)
            .map(|el| el.inner_html())
            .unwrap_or_default()
    }

    /// Concatenated text of `node` and its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let Some(node) = self.get(node) else {
            return String::new();
        };
        node.descendants()
            .filter_map(|n| n.value().as_text())
            .map(|text| &**text)
            .collect()
    }

    // ------------------------------------------------------------------
    // Attributes and flags
    // ------------------------------------------------------------------

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?.value().attr(name)
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        self.rebuild(node, |el| html::with_attr(el, name, Some(value)));
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) -> bool {
        if self.attr(node, name).is_none() {
            return false;
        }
        self.rebuild(node, |el| html::with_attr(el, name, None))
    }

    fn rebuild(&mut self, node: NodeId, edit: impl FnOnce(&Element) -> Element) -> bool {
        let Some(mut n) = self.tree.tree.get_mut(node) else {
            return false;
        };
        let Node::Element(el) = n.value() else {
            return false;
        };
        *el = edit(el);
        true
    }

    /// Checkbox state, stored as the presence of `checked`.
    pub fn is_checked(&self, node: NodeId) -> bool {
        self.attr(node, "checked").is_some()
    }

    pub fn set_checked(&mut self, node: NodeId, checked: bool) {
        if checked {
            self.set_attr(node, "checked", "");
        } else {
            self.remove_attr(node, "checked");
        }
    }

    pub fn has_flag(&self, node: NodeId, flag: &str) -> bool {
        self.state.get(&node).is_some_and(|s| s.has_flag(flag))
    }

    /// Set a script-side flag. Returns `false` if it was already set or the
    /// node is unknown.
    pub fn set_flag(&mut self, node: NodeId, flag: &'static str) -> bool {
        if self.get(node).is_none() {
            return false;
        }
        self.state.entry(node).or_default().set_flag(flag)
    }

    // ------------------------------------------------------------------
    // Traversal and queries
    // ------------------------------------------------------------------

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node)?.parent().map(|p| p.id())
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.get(node)
            .map(|n| n.children().map(|c| c.id()).collect())
            .unwrap_or_default()
    }

    /// Ancestors of `node`, nearest first, not including `node`.
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        self.get(node)
            .map(|n| n.ancestors().map(|a| a.id()).collect())
            .unwrap_or_default()
    }

    /// Whether `node` is attached to the document root.
    pub fn is_connected(&self, node: NodeId) -> bool {
        node == self.root || self.ancestors(node).last() == Some(&self.root)
    }

    pub fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        self.element(node).is_some_and(|el| selector.matches(&el))
    }

    /// The nearest inclusive ancestor of `node` matching `selector`.
    pub fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        std::iter::once(node)
            .chain(self.ancestors(node))
            .find(|&id| self.matches(id, selector))
    }

    /// Elements strictly below `scope` matching `selector`, in document order.
    fn select<'a>(
        &'a self,
        scope: NodeId,
        selector: &'a Selector,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.get(scope)
            .into_iter()
            .flat_map(|n| n.descendants().skip(1))
            .filter_map(ElementRef::wrap)
            .filter(move |el| selector.matches(el))
            .map(|el| el.id())
    }

    /// First connected element matching `selector`, in document order.
    pub fn query_selector(&self, selector: &Selector) -> Option<NodeId> {
        self.select(self.root, selector).next()
    }

    /// Every connected element matching `selector`, in document order.
    pub fn query_selector_all(&self, selector: &Selector) -> Vec<NodeId> {
        self.select(self.root, selector).collect()
    }

    pub fn query_selector_within(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.select(scope, selector).next()
    }

    pub fn query_selector_all_within(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.select(scope, selector).collect()
    }

    /// Parse `selector` and return the first match. Unparseable selectors
    /// match nothing.
    pub fn find(&self, selector: &str) -> Option<NodeId> {
        Selector::parse(selector)
            .ok()
            .and_then(|s| self.query_selector(&s))
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn add_event_listener(
        &mut self,
        node: NodeId,
        kind: EventKind,
        capture: bool,
        listener: Listener,
    ) {
        if self.get(node).is_none() {
            return;
        }
        self.state
            .entry(node)
            .or_default()
            .add_listener(RegisteredListener {
                kind,
                capture,
                listener,
            });
    }

    /// Number of listeners of `kind` registered directly on `node`.
    pub fn listener_count(&self, node: NodeId, kind: EventKind) -> usize {
        self.state
            .get(&node)
            .map_or(0, |s| s.listener_count(kind))
    }

    pub(super) fn listeners(&self, node: NodeId) -> &[RegisteredListener] {
        self.state
            .get(&node)
            .map(NodeState::listeners)
            .unwrap_or_default()
    }

    /// Dispatch a single event at `target`.
    pub fn dispatch(&mut self, target: NodeId, kind: EventKind) -> DispatchOutcome {
        event::dispatch(self, target, kind)
    }

    /// Simulate a user activating `target`: a click, followed by the
    /// enclosing form's submit when the control submits and the click was
    /// not cancelled. Forms themselves are activated by submitting them.
    pub fn activate(&mut self, target: NodeId) -> DispatchOutcome {
        if self.tag(target) == Some("form") {
            return self.dispatch(target, EventKind::Submit);
        }

        let click = self.dispatch(target, EventKind::Click);
        if !click.allowed() || !self.is_submit_control(target) {
            return click;
        }

        let form = self
            .ancestors(target)
            .into_iter()
            .find(|&id| self.tag(id) == Some("form"));
        match form {
            Some(form) => self.dispatch(form, EventKind::Submit),
            None => click,
        }
    }

    fn is_submit_control(&self, node: NodeId) -> bool {
        let kind = self.attr(node, "type").map(str::to_ascii_lowercase);
        match self.tag(node) {
            Some("button") => matches!(kind.as_deref(), None | Some("submit")),
            Some("input") => matches!(kind.as_deref(), Some("submit" | "image")),
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// Subscribe to child-list changes anywhere in the connected tree.
    pub fn observe(&mut self) -> mpsc::UnboundedReceiver<MutationRecord> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.push(tx);
        rx
    }

    pub fn observer_count(&self) -> usize {
        self.observers.iter().filter(|tx| !tx.is_closed()).count()
    }

    fn record(&mut self, record: MutationRecord) {
        if self.is_connected(record.target) {
            self.notify(record);
        }
    }

    fn notify(&mut self, record: MutationRecord) {
        self.observers.retain(|tx| tx.send(record.clone()).is_ok());
    }

    /// Unlink `node` from its parent and forget the state of its subtree.
    fn detach(&mut self, node: NodeId) {
        let subtree: Vec<NodeId> = self
            .get(node)
            .map(|n| n.descendants().map(|d| d.id()).collect())
            .unwrap_or_default();
        for id in subtree {
            self.state.remove(&id);
        }
        if let Some(mut n) = self.tree.tree.get_mut(node) {
            n.detach();
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("ready_state", &self.ready_state)
            .field("nodes", &self.tree.tree.nodes().count())
            .field("stateful_nodes", &self.state.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}
