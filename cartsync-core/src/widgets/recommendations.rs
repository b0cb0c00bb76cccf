//! Cart recommendations carousel.
//!
//! Shows products related to the first cart line. Each pass reads the cart,
//! asks the recommendations feed about its first product and replaces the
//! carousel's slides. An empty cart, or an empty feed, clears the carousel;
//! anything that fails leaves the current slides alone.

use futures_util::future::BoxFuture;

use super::price::PriceFormat;
use crate::config::RecommendationsConfig;
use crate::dom::{parse_selector, Document, NodeId, Page, Selector};
use crate::error::SelectorError;
use crate::reactive::{Concern, WidgetBinding};
use crate::store::{RecommendedProduct, StoreClient};

pub struct RecommendationCarousel {
    page: Page,
    store: StoreClient,
    container: Selector,
    container_css: String,
    limit: u32,
    intent: String,
    price: PriceFormat,
}

impl RecommendationCarousel {
    pub fn new(
        page: Page,
        store: StoreClient,
        config: &RecommendationsConfig,
        price: PriceFormat,
    ) -> Result<Self, SelectorError> {
        Ok(Self {
            page,
            store,
            container: parse_selector(&config.container)?,
            container_css: config.container.clone(),
            limit: config.limit,
            intent: config.intent.clone(),
            price,
        })
    }

    fn locate(&self) -> Option<NodeId> {
        self.page.lock().query_selector(&self.container)
    }

    async fn refresh(&self) {
        if self.locate().is_none() {
            tracing::trace!(selector = %self.container_css, "no recommendations container");
            return;
        }

        let cart = match self.store.cart().await {
            Ok(cart) => cart,
            Err(err) => {
                tracing::warn!(error = %err, "cart fetch failed, keeping recommendations");
                return;
            }
        };

        let Some(product_id) = cart.first_product_id() else {
            self.render(&[]);
            return;
        };

        match self
            .store
            .recommendations(&product_id.to_string(), self.limit, &self.intent)
            .await
        {
            Ok(products) => self.render(&products),
            Err(err) => {
                tracing::warn!(product_id, error = %err, "recommendations fetch failed, keeping recommendations");
            }
        }
    }

    /// Replace the slides. The container is looked up again since the
    /// drawer may have been re-rendered while we were fetching.
    fn render(&self, products: &[RecommendedProduct]) {
        let mut doc = self.page.lock();
        let Some(container) = doc.query_selector(&self.container) else {
            return;
        };

        let slides: Vec<NodeId> = products
            .iter()
            .map(|product| self.slide(&mut doc, product))
            .collect();
        doc.replace_children(container, slides);
        tracing::debug!(count = products.len(), "recommendations rendered");
    }

    fn slide(&self, doc: &mut Document, product: &RecommendedProduct) -> NodeId {
        let slide = doc.create_element("div");
        doc.set_attr(slide, "class", "recommendation-slide");

        let link = doc.create_element("a");
        doc.set_attr(link, "href", &product.url);
        doc.set_attr(link, "class", "recommendation-link");
        if let Some(image) = &product.featured_image {
            let img = doc.create_element("img");
            doc.set_attr(img, "src", image);
            doc.set_attr(img, "alt", &product.title);
            doc.set_attr(img, "loading", "lazy");
            doc.append_child(link, img);
        }
        doc.append_child(slide, link);

        let title = doc.create_element("div");
        doc.set_attr(title, "class", "recommendation-title");
        doc.set_text(title, &product.title);
        doc.append_child(slide, title);

        let price = doc.create_element("div");
        doc.set_attr(price, "class", "recommendation-price");
        doc.set_text(price, &self.price.format(product.price));
        doc.append_child(slide, price);

        slide
    }
}

impl WidgetBinding for RecommendationCarousel {
    fn concern(&self) -> Concern {
        Concern::Recommendations
    }

    fn sync(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.refresh())
    }
}
