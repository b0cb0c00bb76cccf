//! Callback-style request mechanism.
//!
//! Mirrors the classic request-object lifecycle: create, `open` with a
//! method and url, attach `on_load` / `on_error` listeners, `send`. `load`
//! fires for every HTTP response regardless of status; `error` fires only
//! when the transport itself fails.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::task::JoinHandle;

use super::{Method, Request, Response, Transport};
use crate::error::TransportError;

/// Told the final response of a request it chose to observe.
pub type LoadObserver = Box<dyn FnOnce(&Response) + Send>;

type ErrorListener = Box<dyn FnOnce(&TransportError) + Send>;

/// Observes callback-style requests as they are sent.
///
/// `on_send` runs synchronously on the sending task, before the request goes
/// out; whatever it returns is called on `load`. Hooks observe only: they
/// see the request by reference and cannot change it.
pub trait CallbackHook: Send + Sync {
    fn on_send(&self, request: &Request) -> Option<LoadObserver>;
}

/// Creates callback-style requests and holds the installed hooks.
///
/// Hooks are looked up when a request is sent, so a hook installed after a
/// request was created still sees it. Cloning shares the hooks.
#[derive(Clone)]
pub struct CallbackRequestFactory {
    transport: Arc<dyn Transport>,
    hooks: Arc<RwLock<Vec<Arc<dyn CallbackHook>>>>,
}

impl CallbackRequestFactory {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            hooks: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn create(&self) -> CallbackRequest {
        CallbackRequest {
            factory: self.clone(),
            request: None,
            load_listeners: Vec::new(),
            error_listeners: Vec::new(),
        }
    }

    pub fn install_hook(&self, hook: Arc<dyn CallbackHook>) {
        let mut hooks = self.hooks.write();
        hooks.push(hook);
        tracing::debug!(depth = hooks.len(), "callback hook installed");
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.read().len()
    }
}

impl fmt::Debug for CallbackRequestFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRequestFactory")
            .field("hooks", &self.hook_count())
            .finish_non_exhaustive()
    }
}

/// A single callback-style request.
pub struct CallbackRequest {
    factory: CallbackRequestFactory,
    request: Option<Request>,
    load_listeners: Vec<LoadObserver>,
    error_listeners: Vec<ErrorListener>,
}

impl CallbackRequest {
    /// Set method and target. Opening again replaces both.
    pub fn open(&mut self, method: Method, url: impl Into<String>) -> &mut Self {
        self.request = Some(Request::new(method, url));
        self
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        if let Some(request) = self.request.as_mut() {
            request.headers.push((name.into(), value.into()));
        }
        self
    }

    pub fn on_load<F>(&mut self, listener: F) -> &mut Self
    where
        F: FnOnce(&Response) + Send + 'static,
    {
        self.load_listeners.push(Box::new(listener));
        self
    }

    pub fn on_error<F>(&mut self, listener: F) -> &mut Self
    where
        F: FnOnce(&TransportError) + Send + 'static,
    {
        self.error_listeners.push(Box::new(listener));
        self
    }

    /// Send the request. Listeners run on a spawned task when it completes;
    /// the returned handle resolves after they have all run.
    ///
    /// Caller listeners run first, then hook observers, newest hook first.
    pub fn send(self, body: Option<String>) -> Result<JoinHandle<()>, TransportError> {
        let Some(mut request) = self.request else {
            return Err(TransportError::NotOpened);
        };
        request.body = body;

        let hooks: Vec<Arc<dyn CallbackHook>> = self.factory.hooks.read().clone();
        let observers: Vec<LoadObserver> = hooks
            .iter()
            .rev()
            .filter_map(|hook| hook.on_send(&request))
            .collect();

        let transport = Arc::clone(&self.factory.transport);
        let mut load_listeners = self.load_listeners;
        let error_listeners = self.error_listeners;

        Ok(tokio::spawn(async move {
            match transport.send(request).await {
                Ok(response) => {
                    load_listeners.extend(observers);
                    for listener in load_listeners {
                        listener(&response);
                    }
                }
                Err(err) => {
                    tracing::debug!(error = %err, "callback request failed");
                    for listener in error_listeners {
                        listener(&err);
                    }
                }
            }
        }))
    }
}

impl fmt::Debug for CallbackRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRequest")
            .field("request", &self.request)
            .field("load_listeners", &self.load_listeners.len())
            .field("error_listeners", &self.error_listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RecordingTransport;
    use parking_lot::Mutex;

    struct Named {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl CallbackHook for Named {
        fn on_send(&self, _request: &Request) -> Option<LoadObserver> {
            let log = Arc::clone(&self.log);
            let name = self.name;
            Some(Box::new(move |response: &Response| {
                log.lock().push(format!("{name}:{}", response.status));
            }))
        }
    }

    #[tokio::test]
    async fn listeners_then_hooks_newest_first() {
        let transport = Arc::new(RecordingTransport::new());
        transport.respond("/cart/add.js", 200, "{}");
        let factory = CallbackRequestFactory::new(transport);
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut request = factory.create();
        for name in ["old", "new"] {
            factory.install_hook(Arc::new(Named {
                name,
                log: Arc::clone(&log),
            }));
        }

        let caller_log = Arc::clone(&log);
        request
            .open(Method::Post, "/cart/add.js")
            .on_load(move |response| caller_log.lock().push(format!("caller:{}", response.status)));
        request.send(None).unwrap().await.unwrap();

        assert_eq!(*log.lock(), vec!["caller:200", "new:200", "old:200"]);
    }

    #[tokio::test]
    async fn load_fires_for_error_statuses() {
        let transport = Arc::new(RecordingTransport::new());
        transport.respond("/cart/change.js", 422, "{}");
        let factory = CallbackRequestFactory::new(transport);
        let status = Arc::new(Mutex::new(None));

        let seen = Arc::clone(&status);
        let mut request = factory.create();
        request
            .open(Method::Post, "/cart/change.js")
            .on_load(move |response| *seen.lock() = Some(response.status));
        request.send(Some("{}".into())).unwrap().await.unwrap();

        assert_eq!(*status.lock(), Some(422));
    }

    #[tokio::test]
    async fn transport_failure_fires_error_listeners() {
        let transport = Arc::new(RecordingTransport::new());
        transport.fail("/cart/update.js", "connection reset");
        let factory = CallbackRequestFactory::new(transport);
        let errors = Arc::new(Mutex::new(0));

        let count = Arc::clone(&errors);
        let mut request = factory.create();
        request
            .open(Method::Post, "/cart/update.js")
            .on_load(|_| panic!("load must not fire"))
            .on_error(move |_| *count.lock() += 1);
        request.send(None).unwrap().await.unwrap();

        assert_eq!(*errors.lock(), 1);
    }

    #[test]
    fn send_before_open_is_rejected() {
        let factory = CallbackRequestFactory::new(Arc::new(RecordingTransport::new()));
        assert!(matches!(
            factory.create().send(None),
            Err(TransportError::NotOpened)
        ));
    }
}
