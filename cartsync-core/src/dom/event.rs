//! DOM Events
//!
//! Capture/bubble dispatch over the document tree. Listeners receive the
//! document mutably so they can change it without re-locking the page.

use std::fmt;
use std::sync::Arc;

use super::document::Document;
use super::node::NodeId;

/// The kinds of DOM events the host dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    Submit,
}

/// Where a listener sits in the dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Capturing,
    AtTarget,
    Bubbling,
}

/// An event being dispatched.
#[derive(Debug)]
pub struct Event {
    kind: EventKind,
    target: NodeId,
    current_target: NodeId,
    phase: Phase,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl Event {
    fn new(kind: EventKind, target: NodeId) -> Self {
        Self {
            kind,
            target,
            current_target: target,
            phase: Phase::Capturing,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn current_target(&self) -> NodeId {
        self.current_target
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// An event listener.
pub type Listener = Arc<dyn Fn(&mut Event, &mut Document) + Send + Sync>;

#[derive(Clone)]
pub(crate) struct RegisteredListener {
    pub(crate) kind: EventKind,
    pub(crate) capture: bool,
    pub(crate) listener: Listener,
}

impl fmt::Debug for RegisteredListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredListener")
            .field("kind", &self.kind)
            .field("capture", &self.capture)
            .finish_non_exhaustive()
    }
}

/// What happened to a dispatched event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchOutcome {
    pub default_prevented: bool,
    pub propagation_stopped: bool,
}

impl DispatchOutcome {
    /// Whether the event's default action may run.
    pub fn allowed(&self) -> bool {
        !self.default_prevented
    }
}

/// Dispatch `kind` at `target`.
///
/// The path is computed once before any listener runs, so listeners that
/// restructure the tree do not change who receives this event.
pub(crate) fn dispatch(doc: &mut Document, target: NodeId, kind: EventKind) -> DispatchOutcome {
    let mut path = doc.ancestors(target);
    path.reverse();

    let mut event = Event::new(kind, target);

    // Capture: root towards target.
    for &node in &path {
        event.phase = Phase::Capturing;
        event.current_target = node;
        invoke(doc, &mut event, node, |l| l.capture);
        if event.propagation_stopped {
            return outcome(&event);
        }
    }

    event.phase = Phase::AtTarget;
    event.current_target = target;
    invoke(doc, &mut event, target, |_| true);
    if event.propagation_stopped {
        return outcome(&event);
    }

    // Bubble: target's parent towards root.
    for &node in path.iter().rev() {
        event.phase = Phase::Bubbling;
        event.current_target = node;
        invoke(doc, &mut event, node, |l| !l.capture);
        if event.propagation_stopped {
            break;
        }
    }

    outcome(&event)
}

fn invoke(
    doc: &mut Document,
    event: &mut Event,
    node: NodeId,
    filter: impl Fn(&RegisteredListener) -> bool,
) {
    let listeners: Vec<Listener> = doc
        .listeners(node)
        .iter()
        .filter(|l| l.kind == event.kind && filter(l))
        .map(|l| Arc::clone(&l.listener))
        .collect();

    for listener in listeners {
        listener(event, doc);
    }
}

fn outcome(event: &Event) -> DispatchOutcome {
    DispatchOutcome {
        default_prevented: event.default_prevented,
        propagation_stopped: event.propagation_stopped,
    }
}
