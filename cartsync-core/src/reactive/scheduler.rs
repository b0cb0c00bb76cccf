//! Debounce Scheduler
//!
//! The scheduler turns mutation signals into delayed sync passes.
//!
//! # Modes
//!
//! - [`DebounceMode::Lenient`] (default): every `schedule` call runs the
//!   target once, no sooner than `window` after the call. Bursts are not
//!   merged; a fetch completion followed by a duplicate callback-style
//!   completion for the same user action yields two passes.
//!
//! - [`DebounceMode::Coalesce`]: trailing edge. Each `schedule` supersedes
//!   any still waiting, so a burst yields one pass, `window` after the last
//!   signal.
//!
//! In both modes the window also lets the platform's own cart cache settle
//! before widgets query it.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::binding::BoundWidget;

/// How bursts of signals are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebounceMode {
    #[default]
    Lenient,
    Coalesce,
}

/// Delays and (optionally) coalesces sync passes of one bound widget.
#[derive(Clone)]
pub struct DebounceScheduler {
    target: BoundWidget,
    window: Duration,
    mode: DebounceMode,

    /// Bumped on every schedule; a waiting coalesced pass only fires if it
    /// still holds the latest generation.
    generation: Arc<AtomicU64>,

    /// Passes waiting for their window to close.
    pending: Arc<AtomicUsize>,
}

impl DebounceScheduler {
    pub fn new(target: BoundWidget, window: Duration, mode: DebounceMode) -> Self {
        Self {
            target,
            window,
            mode,
            generation: Arc::new(AtomicU64::new(0)),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn mode(&self) -> DebounceMode {
        self.mode
    }

    pub fn target(&self) -> &BoundWidget {
        &self.target
    }

    /// Schedule a sync pass. Must be called from within a tokio runtime.
    pub fn schedule(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.pending.fetch_add(1, Ordering::SeqCst);

        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(this.window).await;
            this.pending.fetch_sub(1, Ordering::SeqCst);

            if this.mode == DebounceMode::Coalesce
                && this.generation.load(Ordering::SeqCst) != generation
            {
                tracing::trace!(concern = %this.target.concern(), "superseded pass dropped");
                return;
            }
            this.target.run().await;
        });
    }

    /// Passes scheduled but not yet started.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for DebounceScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebounceScheduler")
            .field("concern", &self.target.concern())
            .field("window", &self.window)
            .field("mode", &self.mode)
            .field("pending", &self.pending())
            .finish()
    }
}
