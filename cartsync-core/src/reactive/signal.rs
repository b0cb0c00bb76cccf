//! Mutation Signal
//!
//! A MutationSignal is the zero-payload notification "cart state may have
//! changed". It carries no value: a subscriber that reacts to it pulls
//! whatever fresh state it needs itself.
//!
//! # Sources
//!
//! Two kinds of producers call [`MutationSignal::emit`]:
//!
//! 1. Interceptor layers on the request mechanisms, after a cart-mutating
//!    request completes successfully.
//!
//! 2. Page-level events (`cart:refresh`, `cart:updated`) raised by other
//!    code on the page.
//!
//! Both go through the same `emit`; no source takes priority. The source is
//! passed along for logging, never for branching.
//!
//! # Delivery
//!
//! Subscribers run synchronously inside `emit`, in subscription order. They
//! are expected to be cheap (typically: schedule a task). The subscriber list
//! is snapshotted before delivery so a subscriber may subscribe or
//! unsubscribe without deadlocking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::subscriber::{Subscriber, SubscriberId};

/// Counter for generating unique signal IDs.
static SIGNAL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_signal_id() -> u64 {
    SIGNAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Where an emission came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalSource {
    /// A promise-style fetch completed with an ok response.
    Fetch,
    /// A callback-style request loaded with a status in `[200, 400)`.
    CallbackRequest,
    /// A `cart:refresh` / `cart:updated` page event.
    PageEvent,
    /// Raised directly by host code.
    Manual,
}

/// A page-lifetime "cart may have changed" notification channel.
#[derive(Clone)]
pub struct MutationSignal {
    id: u64,
    subscribers: Arc<RwLock<Vec<Arc<Subscriber>>>>,
    emissions: Arc<AtomicU64>,
}

impl MutationSignal {
    pub fn new() -> Self {
        Self {
            id: next_signal_id(),
            subscribers: Arc::new(RwLock::new(Vec::new())),
            emissions: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Register a callback. Returns the id to unsubscribe with.
    pub fn subscribe<F>(&self, notify: F) -> SubscriberId
    where
        F: Fn(SignalSource) + Send + Sync + 'static,
    {
        let subscriber = Subscriber::new(notify);
        let id = subscriber.id();
        self.subscribers.write().push(Arc::new(subscriber));
        id
    }

    /// Remove a subscriber. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|s| s.id() != id);
        subscribers.len() != before
    }

    /// Tell every subscriber the cart may have changed.
    pub fn emit(&self, source: SignalSource) {
        let count = self.emissions.fetch_add(1, Ordering::SeqCst) + 1;
        let subscribers: Vec<Arc<Subscriber>> = self.subscribers.read().clone();
        tracing::debug!(
            signal = self.id,
            ?source,
            emission = count,
            subscribers = subscribers.len(),
            "mutation signal"
        );
        for subscriber in subscribers {
            subscriber.notify(source);
        }
    }

    /// How many times this signal has fired.
    pub fn emit_count(&self) -> u64 {
        self.emissions.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl Default for MutationSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MutationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationSignal")
            .field("id", &self.id)
            .field("emissions", &self.emit_count())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
