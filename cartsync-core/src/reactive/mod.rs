//! Reactive Primitives
//!
//! This module implements the propagation path from "a cart-mutating
//! request completed" to "every dependent widget re-synchronized".
//!
//! # Concepts
//!
//! ## Mutation signals
//!
//! A [`MutationSignal`] is a zero-payload notification: the cart may have
//! changed. Interceptor layers and page events both emit it. Subscribers
//! pull whatever fresh state they need themselves.
//!
//! ## Bindings
//!
//! A [`WidgetBinding`] is a widget's `sync` capability. Wrapped in a
//! [`BoundWidget`] it gains run counting, disposal and a [`SyncContext`]
//! scope, which interceptor layers use to ignore requests made by sync
//! passes.
//!
//! ## Scheduling
//!
//! A [`DebounceScheduler`] delays each pass by a settle window. The default
//! is lenient (no sooner than N ms, no merging); strict trailing-edge
//! coalescing is available.
//!
//! ## Installation
//!
//! An [`InstallRegistry`] guarantees each [`Concern`] installs once.

mod binding;
mod context;
mod registry;
mod scheduler;
mod signal;
mod subscriber;

pub use binding::{BoundWidget, WidgetBinding};
pub use context::SyncContext;
pub use registry::{Concern, InstallRegistry};
pub use scheduler::{DebounceMode, DebounceScheduler};
pub use signal::{MutationSignal, SignalSource};
pub use subscriber::{Subscriber, SubscriberId};
