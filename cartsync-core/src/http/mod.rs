//! Request Layer
//!
//! The page issues requests through two mechanisms, and cart mutations can
//! arrive through either:
//!
//! - [`FetchClient`]: promise style. `fetch(request).await` yields the
//!   response or a transport error.
//! - [`CallbackRequest`]: callback style. `open`, register `on_load` /
//!   `on_error` listeners, `send`.
//!
//! Both sit on a pluggable [`Transport`]. Observation is explicit instead of
//! patched in: the fetch client accepts wrapping layers that form a chain,
//! the callback factory accepts hooks. [`RequestInterceptor`] installs one
//! of each for a concern.

mod callback;
mod fetch;
mod interceptor;
#[cfg(any(test, feature = "test-util"))]
mod recording;
mod reqwest_transport;

use std::fmt;

use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;

use crate::error::TransportError;

pub use callback::{CallbackHook, CallbackRequest, CallbackRequestFactory, LoadObserver};
pub use fetch::FetchClient;
pub use interceptor::{CallbackMutationHook, CartMutationMatcher, FetchMutationLayer, RequestInterceptor};
#[cfg(any(test, feature = "test-util"))]
pub use recording::RecordingTransport;
pub use reqwest_transport::ReqwestTransport;

/// Request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outbound request. `url` is usually root-relative (`/cart/add.js`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// The path part of the url, without query or fragment.
    pub fn path(&self) -> &str {
        path_of(&self.url)
    }
}

/// A completed response. Any status, including errors, is a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    /// The fetch-style success flag: status 200–299.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Something that can carry a request to the server and back.
///
/// Implementations must not retry, rewrite or swallow anything: a layer
/// further out relies on seeing exactly what the caller will see.
pub trait Transport: Send + Sync {
    fn send(&self, request: Request) -> BoxFuture<'_, Result<Response, TransportError>>;
}

/// Strip query and fragment from a (possibly absolute) url.
pub(crate) fn path_of(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}
