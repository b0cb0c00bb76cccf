//! Storefront
//!
//! The composition root. A [`Storefront`] owns the page's two request
//! mechanisms and wires each widget concern to them:
//!
//! ```text
//! FetchClient ─┐                      ┌─ page events (cart:refresh, cart:updated)
//!              ├─ RequestInterceptor ─┤
//! Callbacks ───┘          │           │
//!                         ▼           ▼
//!                     MutationSignal (one per concern)
//!                         │
//!                         ▼
//!                  DebounceScheduler ──► BoundWidget::run ──► WidgetBinding::sync
//!                                              ▲
//!                      DynamicContainerWatcher ┘ (optional, per concern)
//! ```
//!
//! Installing a concern claims it in the [`InstallRegistry`]; a concern that
//! is already claimed installs nothing. Background tasks are owned by the
//! storefront and stop when it is dropped. The interception layers stay in
//! the request chains, since other code may have wrapped them since.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::config::CartSyncConfig;
use crate::dom::{Page, PageEvent};
use crate::error::Result;
use crate::http::{CallbackRequestFactory, FetchClient, RequestInterceptor, Transport};
use crate::reactive::{
    BoundWidget, Concern, DebounceScheduler, InstallRegistry, MutationSignal, SignalSource,
    WidgetBinding,
};
use crate::store::StoreClient;
use crate::watcher::DynamicContainerWatcher;
use crate::widgets::{PriceFormat, RecommendationCarousel, TermsGate, UpsellPanel};

/// Everything one installed concern owns.
struct Installation {
    signal: MutationSignal,
    widget: BoundWidget,
    scheduler: DebounceScheduler,
    events: JoinHandle<()>,
    watcher: Option<DynamicContainerWatcher>,
}

impl Drop for Installation {
    fn drop(&mut self) {
        self.widget.dispose();
        self.events.abort();
    }
}

/// How a concern is wired beyond its interceptor.
struct Wiring {
    settle_delay: Duration,
    watch_containers: bool,
    rerun_on_section_reload: bool,
}

pub struct Storefront {
    config: CartSyncConfig,
    page: Page,
    fetch: FetchClient,
    callbacks: CallbackRequestFactory,
    store: StoreClient,
    registry: Arc<InstallRegistry>,
    installations: IndexMap<Concern, Installation>,
}

impl Storefront {
    /// A storefront over `page`, sending requests through `transport`, with
    /// a registry of its own.
    pub fn new(config: CartSyncConfig, page: Page, transport: Arc<dyn Transport>) -> Self {
        let fetch = FetchClient::new(Arc::clone(&transport));
        let callbacks = CallbackRequestFactory::new(transport);
        let store = StoreClient::new(fetch.clone(), config.root.clone());
        Self {
            config,
            page,
            fetch,
            callbacks,
            store,
            registry: Arc::new(InstallRegistry::new()),
            installations: IndexMap::new(),
        }
    }

    /// Like [`new`](Self::new), with the configuration given as JSON.
    pub fn from_json(json: &str, page: Page, transport: Arc<dyn Transport>) -> Result<Self> {
        Ok(Self::new(CartSyncConfig::from_json(json)?, page, transport))
    }

    /// Share `registry` with other storefronts on the same page.
    pub fn with_registry(mut self, registry: Arc<InstallRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Share another storefront's request mechanisms, as two scripts on
    /// one page share `fetch`.
    pub fn with_requests(mut self, fetch: FetchClient, callbacks: CallbackRequestFactory) -> Self {
        self.store = StoreClient::new(fetch.clone(), self.config.root.clone());
        self.fetch = fetch;
        self.callbacks = callbacks;
        self
    }

    pub fn config(&self) -> &CartSyncConfig {
        &self.config
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// The promise-style request mechanism, interception layers included.
    pub fn fetch_client(&self) -> &FetchClient {
        &self.fetch
    }

    /// The callback-style request mechanism, interception hooks included.
    pub fn callback_requests(&self) -> &CallbackRequestFactory {
        &self.callbacks
    }

    pub fn store(&self) -> &StoreClient {
        &self.store
    }

    pub fn registry(&self) -> &Arc<InstallRegistry> {
        &self.registry
    }

    /// Concerns installed by this storefront (not by others sharing the
    /// registry), in installation order.
    pub fn installed(&self) -> Vec<Concern> {
        self.installations.keys().copied().collect()
    }

    pub fn signal(&self, concern: Concern) -> Option<&MutationSignal> {
        self.installations.get(&concern).map(|i| &i.signal)
    }

    pub fn widget(&self, concern: Concern) -> Option<&BoundWidget> {
        self.installations.get(&concern).map(|i| &i.widget)
    }

    pub fn scheduler(&self, concern: Concern) -> Option<&DebounceScheduler> {
        self.installations.get(&concern).map(|i| &i.scheduler)
    }

    pub fn is_watching(&self, concern: Concern) -> bool {
        self.installations
            .get(&concern)
            .is_some_and(|i| i.watcher.is_some())
    }

    /// Install the recommendations carousel. Returns `false` if the concern
    /// was already installed through this storefront's registry.
    pub fn install_recommendations(&mut self) -> Result<bool> {
        let section = &self.config.recommendations;
        let binding = RecommendationCarousel::new(
            self.page.clone(),
            self.store.clone(),
            section,
            PriceFormat::new(self.config.price.clone()),
        )?;
        let wiring = Wiring {
            settle_delay: section.settle_delay(),
            watch_containers: section.watch_containers,
            rerun_on_section_reload: false,
        };
        Ok(self.install(Arc::new(binding), wiring))
    }

    /// Install the load-once upsell panel.
    pub fn install_upsell(&mut self) -> Result<bool> {
        let section = &self.config.upsell;
        let binding = UpsellPanel::new(self.page.clone(), self.store.clone(), section)?;
        let wiring = Wiring {
            settle_delay: section.settle_delay(),
            watch_containers: section.watch_containers,
            rerun_on_section_reload: true,
        };
        Ok(self.install(Arc::new(binding), wiring))
    }

    /// Install the checkout terms gate.
    pub fn install_terms_gate(&mut self) -> Result<bool> {
        let section = &self.config.terms;
        let binding = TermsGate::new(self.page.clone(), section)?;
        let wiring = Wiring {
            settle_delay: section.settle_delay(),
            watch_containers: section.watch_containers,
            rerun_on_section_reload: false,
        };
        Ok(self.install(Arc::new(binding), wiring))
    }

    /// Install every concern. Returns the ones newly installed.
    pub fn install_all(&mut self) -> Result<Vec<Concern>> {
        let mut installed = Vec::new();
        for concern in Concern::ALL {
            let fresh = match concern {
                Concern::Recommendations => self.install_recommendations()?,
                Concern::Upsell => self.install_upsell()?,
                Concern::TermsGate => self.install_terms_gate()?,
            };
            if fresh {
                installed.push(concern);
            }
        }
        Ok(installed)
    }

    /// Must be called from within a tokio runtime.
    fn install(&mut self, binding: Arc<dyn WidgetBinding>, wiring: Wiring) -> bool {
        let concern = binding.concern();
        if !self.registry.try_claim(concern) {
            tracing::debug!(%concern, "already installed, skipping");
            return false;
        }

        let widget = BoundWidget::new(binding);
        let scheduler =
            DebounceScheduler::new(widget.clone(), wiring.settle_delay, self.config.debounce_mode);

        let signal = MutationSignal::new();
        let on_signal = scheduler.clone();
        signal.subscribe(move |source| {
            tracing::trace!(%concern, ?source, "mutation signal");
            on_signal.schedule();
        });

        RequestInterceptor::new(self.config.matcher(), signal.clone(), concern)
            .install(&self.fetch, &self.callbacks);

        // Subscribe before looking at the ready state so a DOMContentLoaded
        // raised in between is not missed.
        let events = tokio::spawn(forward_page_events(
            self.page.subscribe(),
            signal.clone(),
            widget.clone(),
            wiring.rerun_on_section_reload,
        ));

        let watcher = wiring
            .watch_containers
            .then(|| DynamicContainerWatcher::spawn(&self.page, widget.clone()));

        if self.page.is_loaded() {
            spawn_run(&widget);
        }

        tracing::debug!(
            %concern,
            settle_ms = wiring.settle_delay.as_millis() as u64,
            watch = wiring.watch_containers,
            "concern installed"
        );
        self.installations.insert(
            concern,
            Installation {
                signal,
                widget,
                scheduler,
                events,
                watcher,
            },
        );
        true
    }
}

impl fmt::Debug for Storefront {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storefront")
            .field("root", &self.config.root)
            .field("installed", &self.installed())
            .field("fetch", &self.fetch)
            .field("callbacks", &self.callbacks)
            .finish_non_exhaustive()
    }
}

fn spawn_run(widget: &BoundWidget) {
    let widget = widget.clone();
    tokio::spawn(async move { widget.run().await });
}

/// Translate page events for one concern.
async fn forward_page_events(
    mut events: broadcast::Receiver<PageEvent>,
    signal: MutationSignal,
    widget: BoundWidget,
    rerun_on_section_reload: bool,
) {
    let concern = widget.concern();
    loop {
        match events.recv().await {
            Ok(event) if event.is_cart_change() => signal.emit(SignalSource::PageEvent),
            Ok(PageEvent::DomContentLoaded) => spawn_run(&widget),
            Ok(event) if rerun_on_section_reload && event.is_section_reload() => {
                tracing::trace!(%concern, %event, "section reloaded");
                spawn_run(&widget);
            }
            Ok(_) => {}
            Err(RecvError::Lagged(missed)) => {
                // Some of the missed events may have been cart changes.
                tracing::warn!(%concern, missed, "page events dropped");
                signal.emit(SignalSource::PageEvent);
            }
            Err(RecvError::Closed) => break,
        }
    }
}
