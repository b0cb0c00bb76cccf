//! Document Model
//!
//! The host page as the rest of the crate sees it: a `scraper` element tree,
//! capture/bubble event dispatch, and child-list mutation observation.
//!
//! # Overview
//!
//! Markup is held in a `scraper::Html` tree owned by [`Document`] and
//! addressed by [`NodeId`]. Queries take `scraper::Selector`s, so anything
//! a theme can write in CSS (child combinators, `:not(..)`, attribute
//! flags) works in configuration. What markup cannot carry, such as bound
//! markers and event listeners, is kept beside the tree per node.
//!
//! The document is shared through [`Page`], a cheap handle around a
//! `parking_lot` mutex plus the page event bus. Code that awaits never holds
//! the lock; event listeners get `&mut Document` passed in so dispatch does
//! not need to re-lock.

mod document;
mod event;
mod html;
mod node;
mod page;

pub use document::{Document, MutationRecord, ReadyState};
pub use event::{DispatchOutcome, Event, EventKind, Listener, Phase};
pub use html::parse_selector;
pub use node::NodeId;
pub use page::{Page, PageEvent, WeakPage};
pub use scraper::{ElementRef, Selector};
