//! Subscriber types for mutation signals.
//!
//! A Subscriber is anything that wants to hear "the cart may have changed":
//! usually a concern's debounce scheduler, sometimes a test double.

use std::sync::atomic::{AtomicU64, Ordering};

use super::signal::SignalSource;

/// Unique identifier for a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscriber to a mutation signal.
pub struct Subscriber {
    id: SubscriberId,
    /// Invoked once per emission. Receives the source for logging only.
    notify: Box<dyn Fn(SignalSource) + Send + Sync>,
}

impl Subscriber {
    /// Create a new subscriber with the given notification callback.
    pub fn new<F>(notify: F) -> Self
    where
        F: Fn(SignalSource) + Send + Sync + 'static,
    {
        Self::with_id(SubscriberId::new(), notify)
    }

    pub fn with_id<F>(id: SubscriberId, notify: F) -> Self
    where
        F: Fn(SignalSource) + Send + Sync + 'static,
    {
        Self {
            id,
            notify: Box::new(notify),
        }
    }

    /// Get the subscriber's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Notify the subscriber that the cart may have changed.
    pub fn notify(&self, source: SignalSource) {
        (self.notify)(source);
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber").field("id", &self.id).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn subscriber_notify_passes_source() {
        use parking_lot::Mutex;
        use std::sync::Arc;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        let subscriber = Subscriber::new(move |source| {
            seen_clone.lock().push(source);
        });

        assert!(seen.lock().is_empty());
        subscriber.notify(SignalSource::Fetch);
        subscriber.notify(SignalSource::PageEvent);
        assert_eq!(*seen.lock(), vec![SignalSource::Fetch, SignalSource::PageEvent]);
    }
}
