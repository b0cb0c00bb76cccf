//! Widget Bindings
//!
//! A widget binding is the capability a dependent widget exposes so it can
//! be re-synchronized after a mutation signal: re-derive its state from the
//! current cart and page, and apply it.
//!
//! # How Bindings Run
//!
//! 1. A binding is wrapped in a [`BoundWidget`] when its concern installs.
//!
//! 2. Signals, page events and the container watcher all end up calling
//!    [`BoundWidget::run`].
//!
//! 3. `run` executes the binding's `sync` inside a [`SyncContext`] scope so
//!    requests issued by the sync pass are recognised as such.
//!
//! # Contract for implementors
//!
//! `sync` must be safe to call any number of times, concurrently with
//! itself, and must never panic or return an error: failures are logged and
//! the widget keeps its last good state. Nothing is cancelled; when two
//! passes overlap, whichever resolves last wins.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;

use super::context::SyncContext;
use super::registry::Concern;

/// Something that can re-synchronize itself with the cart.
pub trait WidgetBinding: Send + Sync {
    /// Which concern this binding belongs to.
    fn concern(&self) -> Concern;

    /// Re-derive and apply this widget's state.
    fn sync(&self) -> BoxFuture<'_, ()>;
}

/// A binding registered with the runtime.
///
/// Cloning shares the binding, the run counter and the disposed flag.
#[derive(Clone)]
pub struct BoundWidget {
    binding: Arc<dyn WidgetBinding>,

    /// Whether the binding has been disposed.
    disposed: Arc<AtomicBool>,

    /// Completed sync passes.
    run_count: Arc<AtomicUsize>,

    /// Sync passes currently in flight.
    in_flight: Arc<AtomicUsize>,
}

impl BoundWidget {
    pub fn new(binding: Arc<dyn WidgetBinding>) -> Self {
        Self {
            binding,
            disposed: Arc::new(AtomicBool::new(false)),
            run_count: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn concern(&self) -> Concern {
        self.binding.concern()
    }

    /// Run one sync pass.
    pub async fn run(&self) {
        if self.is_disposed() {
            return;
        }

        let concern = self.concern();
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(%concern, "sync pass starting");

        SyncContext::scope(concern, self.binding.sync()).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let count = self.run_count.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::trace!(%concern, count, "sync pass finished");
    }

    /// Dispose of the binding. Later runs are no-ops; a pass already in
    /// flight completes.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Number of completed sync passes.
    pub fn run_count(&self) -> usize {
        self.run_count.load(Ordering::SeqCst)
    }

    /// Number of sync passes currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for BoundWidget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundWidget")
            .field("concern", &self.concern())
            .field("run_count", &self.run_count())
            .field("in_flight", &self.in_flight())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
