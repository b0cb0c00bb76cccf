//! Promise-style request mechanism.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Request, Response, Transport};
use crate::error::TransportError;

/// Issues requests through a chain of transport layers.
///
/// `install_layer` wraps whatever is current, so each installation adds a
/// link instead of replacing the previous one. The newest layer sees a
/// request first; the first-installed layer sits directly on the base
/// transport and runs last. Cloning shares the chain.
#[derive(Clone)]
pub struct FetchClient {
    current: Arc<RwLock<Arc<dyn Transport>>>,
    layers: Arc<AtomicUsize>,
}

impl FetchClient {
    pub fn new(base: Arc<dyn Transport>) -> Self {
        Self {
            current: Arc::new(RwLock::new(base)),
            layers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wrap the current transport with a new outermost layer.
    pub fn install_layer<F>(&self, wrap: F)
    where
        F: FnOnce(Arc<dyn Transport>) -> Arc<dyn Transport>,
    {
        let mut current = self.current.write();
        let inner = Arc::clone(&current);
        *current = wrap(inner);
        let depth = self.layers.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(depth, "fetch layer installed");
    }

    /// Number of layers installed on top of the base transport.
    pub fn layer_count(&self) -> usize {
        self.layers.load(Ordering::SeqCst)
    }

    /// Send `request` through the chain as it stands right now.
    pub async fn fetch(&self, request: Request) -> Result<Response, TransportError> {
        let transport = Arc::clone(&self.current.read());
        transport.send(request).await
    }
}

impl fmt::Debug for FetchClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchClient")
            .field("layers", &self.layer_count())
            .finish_non_exhaustive()
    }
}
