//! Storefront endpoints.
//!
//! Typed access to the three endpoints widgets read from: the cart, the
//! structured recommendations feed and the pre-rendered recommendations
//! section. Every call goes through the page's [`FetchClient`], the same
//! chain the rest of the page uses, so interceptor layers see it too (and
//! ignore it, since none of these paths mutate the cart).

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::error::StoreError;
use crate::http::{FetchClient, Request, Response};

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: u64,
    #[serde(default)]
    pub variant_id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    pub quantity: u32,
    /// Unit price in minor currency units.
    pub price: i64,
}

/// The cart as the platform reports it. Fetched per sync, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CartSnapshot {
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub total_price: i64,
    #[serde(default)]
    pub item_count: u32,
}

impl CartSnapshot {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first_product_id(&self) -> Option<u64> {
        self.items.first().map(|item| item.product_id)
    }
}

/// A product from the structured recommendations feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedProduct {
    pub id: u64,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub featured_image: Option<String>,
    /// Price in minor currency units.
    pub price: i64,
}

#[derive(Debug, Deserialize)]
struct RecommendationsPayload {
    products: Vec<RecommendedProduct>,
}

/// Client for the storefront endpoints under `root`.
#[derive(Debug, Clone)]
pub struct StoreClient {
    fetch: FetchClient,
    root: String,
}

impl StoreClient {
    /// `root` is the storefront's route root, e.g. `/` or `/en-dk/`.
    pub fn new(fetch: FetchClient, root: impl Into<String>) -> Self {
        let mut root = root.into();
        if !root.ends_with('/') {
            root.push('/');
        }
        Self { fetch, root }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn cart_url(&self) -> String {
        format!("{}cart.js", self.root)
    }

    pub fn recommendations_url(&self, product_id: &str, limit: u32, intent: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("product_id", product_id)
            .append_pair("limit", &limit.to_string())
            .append_pair("intent", intent)
            .finish();
        format!("{}recommendations/products.json?{query}", self.root)
    }

    pub fn fragment_url(&self, product_id: &str, limit: u32, section_id: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("product_id", product_id)
            .append_pair("limit", &limit.to_string())
            .append_pair("section_id", section_id)
            .finish();
        format!("{}recommendations/products?{query}", self.root)
    }

    /// Current cart contents.
    pub async fn cart(&self) -> Result<CartSnapshot, StoreError> {
        let response = self.get(self.cart_url()).await?;
        decode(&response)
    }

    /// Structured recommendations related to `product_id`.
    pub async fn recommendations(
        &self,
        product_id: &str,
        limit: u32,
        intent: &str,
    ) -> Result<Vec<RecommendedProduct>, StoreError> {
        let response = self
            .get(self.recommendations_url(product_id, limit, intent))
            .await?;
        let payload: RecommendationsPayload = decode(&response)?;
        Ok(payload.products)
    }

    /// Pre-rendered recommendations markup for `product_id`.
    pub async fn recommendation_fragment(
        &self,
        product_id: &str,
        limit: u32,
        section_id: &str,
    ) -> Result<String, StoreError> {
        let response = self
            .get(self.fragment_url(product_id, limit, section_id))
            .await?;
        Ok(response.body)
    }

    async fn get(&self, url: String) -> Result<Response, StoreError> {
        let response = self.fetch.fetch(Request::get(url)).await?;
        if !response.ok() {
            return Err(StoreError::Status {
                url: response.url,
                status: response.status,
            });
        }
        Ok(response)
    }
}

fn decode<T: serde::de::DeserializeOwned>(response: &Response) -> Result<T, StoreError> {
    response.json().map_err(|source| StoreError::Malformed {
        url: response.url.clone(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RecordingTransport;
    use std::sync::Arc;

    fn client(transport: &Arc<RecordingTransport>) -> StoreClient {
        StoreClient::new(FetchClient::new(transport.clone()), "/")
    }

    #[test]
    fn urls_are_built_under_root() {
        let store = StoreClient::new(FetchClient::new(Arc::new(RecordingTransport::new())), "/en-dk");
        assert_eq!(store.cart_url(), "/en-dk/cart.js");
        assert_eq!(
            store.recommendations_url("123", 8, "related"),
            "/en-dk/recommendations/products.json?product_id=123&limit=8&intent=related"
        );
        assert_eq!(
            store.fragment_url("a b", 4, "cart-recommendations"),
            "/en-dk/recommendations/products?product_id=a+b&limit=4&section_id=cart-recommendations"
        );
    }

    #[tokio::test]
    async fn decodes_cart() {
        let transport = Arc::new(RecordingTransport::new());
        transport.respond(
            "/cart.js",
            200,
            r#"{"items":[{"product_id":123,"quantity":2,"price":4995,"title":"Mug"}],"total_price":9990,"item_count":2,"currency":"DKK"}"#,
        );

        let cart = client(&transport).cart().await.unwrap();
        assert_eq!(cart.first_product_id(), Some(123));
        assert_eq!(cart.items[0].quantity, 2);
        assert_eq!(cart.total_price, 9990);
    }

    #[tokio::test]
    async fn error_taxonomy() {
        let transport = Arc::new(RecordingTransport::new());
        let store = client(&transport);

        transport.respond("/cart.js", 503, "busy");
        assert!(matches!(store.cart().await, Err(StoreError::Status { status: 503, .. })));

        transport.respond("/cart.js", 200, "<html>");
        assert!(matches!(store.cart().await, Err(StoreError::Malformed { .. })));

        transport.fail("/cart.js", "timeout");
        assert!(matches!(store.cart().await, Err(StoreError::Transport(_))));

        transport.respond("/recommendations/products.json", 200, r#"{"sections":[]}"#);
        assert!(matches!(
            store.recommendations("1", 8, "related").await,
            Err(StoreError::Malformed { .. })
        ));
    }
}
