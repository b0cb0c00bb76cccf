//! Cartsync Core
//!
//! Keeps cart-dependent storefront widgets in step with the cart without a
//! page reload. It implements:
//!
//! - Interception of cart-mutating requests on both of the page's request
//!   mechanisms (promise-style fetch and callback-style requests)
//! - A zero-payload mutation signal per widget concern
//! - Debounced re-synchronization of widget bindings
//! - Re-binding after asynchronous DOM replacement
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `dom`: the host page (element tree, selectors, events, page event bus)
//! - `http`: request mechanisms, transports and the mutation interceptor
//! - `reactive`: signals, install registry, sync context, bound widgets and
//!   the debounce scheduler
//! - `store`: typed storefront endpoints
//! - `widgets`: recommendations carousel, upsell panel and terms gate
//! - `watcher`: re-runs a widget when the document structure changes
//! - `storefront`: the composition root
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cartsync_core::{CartSyncConfig, Document, Page, Request, ReqwestTransport, Storefront};
//!
//! let page = Page::new(Document::from_html(&markup));
//! let transport = Arc::new(ReqwestTransport::new("https://shop.example".parse()?));
//! let mut storefront = Storefront::new(CartSyncConfig::default(), page, transport);
//! storefront.install_all()?;
//!
//! // Widgets now re-sync after every successful /cart/add, /cart/change or
//! // /cart/update issued through the storefront's request mechanisms.
//! storefront.fetch_client().fetch(Request::post("/cart/add.js")).await?;
//! ```

pub mod config;
pub mod dom;
pub mod error;
pub mod http;
pub mod reactive;
pub mod store;
pub mod storefront;
pub mod watcher;
pub mod widgets;

pub use config::CartSyncConfig;
pub use dom::{Document, Page, PageEvent};
pub use error::{CartSyncError, Result};
pub use http::{FetchClient, Request, ReqwestTransport, Response, Transport};
#[cfg(any(test, feature = "test-util"))]
pub use http::RecordingTransport;
pub use reactive::{Concern, DebounceMode, InstallRegistry, MutationSignal, WidgetBinding};
pub use storefront::Storefront;
