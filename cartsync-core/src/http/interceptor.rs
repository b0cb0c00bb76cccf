//! Cart-mutation interception.
//!
//! A [`RequestInterceptor`] belongs to one concern. Installing it adds one
//! [`FetchMutationLayer`] to the fetch chain and one [`CallbackMutationHook`]
//! to the callback factory; both emit the concern's [`MutationSignal`] when a
//! cart-mutating request completes successfully.
//!
//! Observation never alters traffic: the request is forwarded as is, errors
//! and unsuccessful statuses reach the caller unchanged, and nothing is
//! retried. Requests issued from inside a sync pass are forwarded without
//! emitting.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use super::callback::{CallbackHook, CallbackRequestFactory, LoadObserver};
use super::fetch::FetchClient;
use super::{Request, Response, Transport};
use crate::error::TransportError;
use crate::reactive::{Concern, MutationSignal, SignalSource, SyncContext};

/// Decides whether a request target is a cart mutation.
///
/// Matching is by substring so query strings, `.js` suffixes and locale
/// prefixes (`/en/cart/add.js`) all still match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartMutationMatcher {
    fragments: Vec<String>,
}

impl CartMutationMatcher {
    pub const DEFAULT_FRAGMENTS: [&'static str; 3] = ["/cart/add", "/cart/change", "/cart/update"];

    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fragments: fragments
                .into_iter()
                .map(Into::into)
                .filter(|f: &String| !f.is_empty())
                .collect(),
        }
    }

    pub fn matches(&self, target: &str) -> bool {
        self.fragments.iter().any(|f| target.contains(f.as_str()))
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }
}

impl Default for CartMutationMatcher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FRAGMENTS)
    }
}

/// Fetch-chain layer that emits on successful cart mutations.
pub struct FetchMutationLayer {
    inner: Arc<dyn Transport>,
    matcher: CartMutationMatcher,
    signal: MutationSignal,
    concern: Concern,
}

impl FetchMutationLayer {
    pub fn new(
        inner: Arc<dyn Transport>,
        matcher: CartMutationMatcher,
        signal: MutationSignal,
        concern: Concern,
    ) -> Self {
        Self {
            inner,
            matcher,
            signal,
            concern,
        }
    }
}

impl Transport for FetchMutationLayer {
    fn send(&self, request: Request) -> BoxFuture<'_, Result<Response, TransportError>> {
        // Decide before the await: the sync context belongs to the caller.
        let watched = self.matcher.matches(&request.url) && !SyncContext::is_active();
        let url = request.url.clone();

        Box::pin(async move {
            let response = self.inner.send(request).await?;
            if watched && response.ok() {
                tracing::debug!(concern = %self.concern, %url, status = response.status, "cart mutation via fetch");
                self.signal.emit(SignalSource::Fetch);
            }
            Ok(response)
        })
    }
}

/// Callback-request hook that emits on successful cart mutations.
pub struct CallbackMutationHook {
    matcher: CartMutationMatcher,
    signal: MutationSignal,
    concern: Concern,
}

impl CallbackMutationHook {
    pub fn new(matcher: CartMutationMatcher, signal: MutationSignal, concern: Concern) -> Self {
        Self {
            matcher,
            signal,
            concern,
        }
    }
}

impl CallbackHook for CallbackMutationHook {
    fn on_send(&self, request: &Request) -> Option<LoadObserver> {
        if !self.matcher.matches(&request.url) {
            return None;
        }
        if SyncContext::is_active() {
            tracing::trace!(concern = %self.concern, url = %request.url, "ignoring cart request from sync pass");
            return None;
        }

        let signal = self.signal.clone();
        let concern = self.concern;
        let url = request.url.clone();
        Some(Box::new(move |response: &Response| {
            if (200..400).contains(&response.status) {
                tracing::debug!(%concern, %url, status = response.status, "cart mutation via callback request");
                signal.emit(SignalSource::CallbackRequest);
            }
        }))
    }
}

/// One concern's pair of observers over both request mechanisms.
#[derive(Debug, Clone)]
pub struct RequestInterceptor {
    matcher: CartMutationMatcher,
    signal: MutationSignal,
    concern: Concern,
}

impl RequestInterceptor {
    pub fn new(matcher: CartMutationMatcher, signal: MutationSignal, concern: Concern) -> Self {
        Self {
            matcher,
            signal,
            concern,
        }
    }

    pub fn signal(&self) -> &MutationSignal {
        &self.signal
    }

    /// Add this concern's layer to `fetch` and its hook to `callbacks`.
    pub fn install(&self, fetch: &FetchClient, callbacks: &CallbackRequestFactory) {
        let matcher = self.matcher.clone();
        let signal = self.signal.clone();
        let concern = self.concern;
        fetch.install_layer(move |inner| {
            Arc::new(FetchMutationLayer::new(inner, matcher, signal, concern))
        });

        callbacks.install_hook(Arc::new(CallbackMutationHook::new(
            self.matcher.clone(),
            self.signal.clone(),
            self.concern,
        )));

        tracing::debug!(concern = %self.concern, "request interceptor installed");
    }
}
