//! Load-once upsell panel.
//!
//! The panel container carries the product id to upsell against. The first
//! pass that gets non-blank markup back writes it and marks the container
//! loaded; every later pass sees the marker and does nothing.

use futures_util::future::BoxFuture;

use crate::config::UpsellConfig;
use crate::dom::{parse_selector, NodeId, Page, Selector};
use crate::error::SelectorError;
use crate::reactive::{Concern, WidgetBinding};
use crate::store::StoreClient;

pub struct UpsellPanel {
    page: Page,
    store: StoreClient,
    container: Selector,
    container_css: String,
    seed_attribute: String,
    loaded_attribute: String,
    limit: u32,
    section_id: String,
}

impl UpsellPanel {
    pub fn new(page: Page, store: StoreClient, config: &UpsellConfig) -> Result<Self, SelectorError> {
        Ok(Self {
            page,
            store,
            container: parse_selector(&config.container)?,
            container_css: config.container.clone(),
            seed_attribute: config.seed_attribute.clone(),
            loaded_attribute: config.loaded_attribute.clone(),
            limit: config.limit,
            section_id: config.section_id.clone(),
        })
    }

    /// The container, unless it is missing or already loaded.
    fn unloaded_container(&self) -> Option<NodeId> {
        let doc = self.page.lock();
        let container = doc.query_selector(&self.container)?;
        if doc.attr(container, &self.loaded_attribute) == Some("true") {
            return None;
        }
        Some(container)
    }

    async fn load_once(&self) {
        let seed = {
            let Some(container) = self.unloaded_container() else {
                tracing::trace!(selector = %self.container_css, "upsell container missing or loaded");
                return;
            };
            let doc = self.page.lock();
            match doc.attr(container, &self.seed_attribute).map(str::trim) {
                Some(seed) if !seed.is_empty() => seed.to_string(),
                _ => {
                    tracing::trace!(attribute = %self.seed_attribute, "upsell container has no seed product");
                    return;
                }
            }
        };

        let markup = match self
            .store
            .recommendation_fragment(&seed, self.limit, &self.section_id)
            .await
        {
            Ok(markup) => markup,
            Err(err) => {
                tracing::warn!(product_id = %seed, error = %err, "upsell fetch failed");
                return;
            }
        };
        if markup.trim().is_empty() {
            tracing::debug!(product_id = %seed, "empty upsell fragment, leaving panel as is");
            return;
        }

        // Another pass may have loaded the panel while this one was fetching.
        let Some(container) = self.unloaded_container() else {
            return;
        };
        let mut doc = self.page.lock();
        doc.set_inner_html(container, &markup);
        doc.set_attr(container, &self.loaded_attribute, "true");
        tracing::debug!(product_id = %seed, "upsell panel loaded");
    }
}

impl WidgetBinding for UpsellPanel {
    fn concern(&self) -> Concern {
        Concern::Upsell
    }

    fn sync(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.load_once())
    }
}
