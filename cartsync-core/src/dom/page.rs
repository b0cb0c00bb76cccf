//! Page handle.
//!
//! A [`Page`] is the shared view of one document lifetime: the document
//! itself and the bus for named page-level events (`cart:updated`,
//! `shopify:section:load`, ...). Cloning a page clones the handle, not the
//! document.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};
use tokio::sync::broadcast;

use super::document::{Document, ReadyState};

const EVENT_CAPACITY: usize = 64;

/// A named page-level event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageEvent {
    /// `cart:refresh`
    CartRefresh,
    /// `cart:updated`
    CartUpdated,
    /// `shopify:section:load`
    SectionLoad,
    /// `shopify:section:unload`
    SectionUnload,
    /// `DOMContentLoaded`
    DomContentLoaded,
    /// Anything else.
    Custom(String),
}

impl PageEvent {
    /// Map an event name to its variant.
    pub fn parse(name: &str) -> Self {
        match name {
            "cart:refresh" => Self::CartRefresh,
            "cart:updated" => Self::CartUpdated,
            "shopify:section:load" => Self::SectionLoad,
            "shopify:section:unload" => Self::SectionUnload,
            "DOMContentLoaded" => Self::DomContentLoaded,
            other => Self::Custom(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::CartRefresh => "cart:refresh",
            Self::CartUpdated => "cart:updated",
            Self::SectionLoad => "shopify:section:load",
            Self::SectionUnload => "shopify:section:unload",
            Self::DomContentLoaded => "DOMContentLoaded",
            Self::Custom(name) => name,
        }
    }

    /// Whether this event means "cart state may have changed".
    pub fn is_cart_change(&self) -> bool {
        matches!(self, Self::CartRefresh | Self::CartUpdated)
    }

    /// Whether this event means a page section was re-rendered.
    pub fn is_section_reload(&self) -> bool {
        matches!(self, Self::SectionLoad | Self::SectionUnload)
    }
}

impl fmt::Display for PageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shared handle to a document and its page event bus.
#[derive(Clone)]
pub struct Page {
    document: Arc<Mutex<Document>>,
    events: broadcast::Sender<PageEvent>,
}

impl Page {
    pub fn new(document: Document) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            document: Arc::new(Mutex::new(document)),
            events,
        }
    }

    /// Lock the document. Never hold the guard across an await.
    pub fn lock(&self) -> MutexGuard<'_, Document> {
        self.document.lock()
    }

    /// Run `f` with the document locked.
    pub fn with<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        f(&mut self.document.lock())
    }

    /// Raise a page-level event. Returns how many listeners received it.
    pub fn dispatch_event(&self, event: PageEvent) -> usize {
        tracing::trace!(event = %event, "page event");
        if event == PageEvent::DomContentLoaded {
            self.lock().set_ready_state(ReadyState::Complete);
        }
        self.events.send(event).unwrap_or(0)
    }

    /// Listen for page-level events raised after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<PageEvent> {
        self.events.subscribe()
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().ready_state() == ReadyState::Complete
    }

    /// A handle that does not keep the document alive. Listeners stored in
    /// the document hold one of these instead of a [`Page`].
    pub fn downgrade(&self) -> WeakPage {
        WeakPage {
            document: Arc::downgrade(&self.document),
            events: self.events.clone(),
        }
    }
}

#[derive(Clone)]
pub struct WeakPage {
    document: Weak<Mutex<Document>>,
    events: broadcast::Sender<PageEvent>,
}

impl WeakPage {
    pub fn upgrade(&self) -> Option<Page> {
        Some(Page {
            document: self.document.upgrade()?,
            events: self.events.clone(),
        })
    }
}

impl fmt::Debug for WeakPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakPage")
            .field("alive", &(self.document.strong_count() > 0))
            .finish()
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("listeners", &self.events.receiver_count())
            .finish_non_exhaustive()
    }
}
