//! Integration Tests for Cart Synchronization
//!
//! These tests drive a whole storefront: requests go through the installed
//! interceptors, signals reach the schedulers, and widgets rewrite the page.
//! Time is paused, so every settle window is exact.

use std::sync::Arc;
use std::time::Duration;

use cartsync_core::dom::{ReadyState, Selector};
use cartsync_core::http::Method;
use cartsync_core::reactive::{Concern, InstallRegistry};
use cartsync_core::{
    CartSyncConfig, DebounceMode, Document, Page, PageEvent, RecordingTransport, Request,
    Storefront,
};

const CART_PAGE: &str = r#"
<div id="cart-drawer">
    <div id="cart-recommendations">
        <div class="recommendations-scroll"><div class="recommendation-slide">previous</div></div>
    </div>
    <div id="cart-upsell" data-first-product-id="123"></div>
    <form action="/cart" method="post">
        <div class="terms-wrapper">
            <input type="checkbox" id="terms-checkbox">
        </div>
        <button type="submit" name="checkout">Checkout</button>
        <button type="submit" name="checkout" class="express">Express checkout</button>
    </form>
</div>"#;

const CART_WITH_123: &str = r#"{"items":[{"product_id":123,"quantity":1,"price":19900}],"total_price":19900,"item_count":1}"#;

const RELATED: &str = r#"{"products":[
    {"id":5,"title":"Lid","url":"/products/lid","featured_image":"/lid.png","price":9900},
    {"id":6,"title":"Ladle","url":"/products/ladle","price":14950}
]}"#;

const RECS_PATH: &str = "/recommendations/products.json";
const FRAGMENT_PATH: &str = "/recommendations/products";

/// Build a page that is still loading, so nothing syncs until asked to.
fn loading_page(markup: &str) -> Page {
    let mut document = Document::from_html(markup);
    document.set_ready_state(ReadyState::Loading);
    Page::new(document)
}

fn routed_transport() -> Arc<RecordingTransport> {
    let transport = Arc::new(RecordingTransport::new());
    transport.respond_to(Method::Post, "/cart/add.js", 200, CART_WITH_123);
    transport.respond_to(Method::Post, "/cart/change.js", 200, CART_WITH_123);
    transport.respond("/cart.js", 200, CART_WITH_123);
    transport.respond(RECS_PATH, 200, RELATED);
    transport.respond(FRAGMENT_PATH, 200, r#"<div class="upsell-card">Apron</div>"#);
    transport
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn slide_titles(page: &Page) -> Vec<String> {
    let doc = page.lock();
    let selector = Selector::parse(".recommendations-scroll .recommendation-title").unwrap();
    doc.query_selector_all(&selector)
        .into_iter()
        .map(|id| doc.text_content(id))
        .collect()
}

fn popup_count(page: &Page) -> usize {
    let doc = page.lock();
    doc.query_selector_all(&Selector::parse(".terms-error-popup").unwrap())
        .len()
}

/// Test that a concern installs once per registry, however often it is asked.
#[tokio::test(start_paused = true)]
async fn install_is_idempotent_per_registry() {
    let transport = routed_transport();
    let page = loading_page(CART_PAGE);
    let registry = Arc::new(InstallRegistry::new());

    let mut first = Storefront::new(CartSyncConfig::default(), page.clone(), transport.clone())
        .with_registry(Arc::clone(&registry));
    assert!(first.install_recommendations().unwrap());
    assert!(!first.install_recommendations().unwrap());

    // A second evaluation on the same page, sharing the request mechanisms.
    let mut second = Storefront::new(CartSyncConfig::default(), page, transport.clone())
        .with_registry(Arc::clone(&registry))
        .with_requests(first.fetch_client().clone(), first.callback_requests().clone());
    assert!(!second.install_recommendations().unwrap());

    assert_eq!(first.fetch_client().layer_count(), 1);
    assert_eq!(first.callback_requests().hook_count(), 1);

    // One mutation, one signal emission, one sync.
    first
        .fetch_client()
        .fetch(Request::post("/cart/add.js"))
        .await
        .unwrap();
    advance(150).await;

    let widget = first.widget(Concern::Recommendations).unwrap();
    assert_eq!(widget.run_count(), 1);
    assert_eq!(transport.requests_to(RECS_PATH).len(), 1);
}

/// Test that rapid mutations sync at least once, and never inside the window.
#[tokio::test(start_paused = true)]
async fn rapid_mutations_sync_after_the_settle_window() {
    for mode in [DebounceMode::Lenient, DebounceMode::Coalesce] {
        let transport = routed_transport();
        let page = loading_page(CART_PAGE);
        let config = CartSyncConfig {
            debounce_mode: mode,
            ..CartSyncConfig::default()
        };
        let mut storefront = Storefront::new(config, page.clone(), transport.clone());
        storefront.install_recommendations().unwrap();

        for _ in 0..5 {
            storefront
                .fetch_client()
                .fetch(Request::post("/cart/add.js"))
                .await
                .unwrap();
        }

        advance(99).await;
        let widget = storefront.widget(Concern::Recommendations).unwrap();
        assert_eq!(widget.run_count(), 0, "{mode:?}");
        assert_eq!(slide_titles(&page), Vec::<String>::new(), "{mode:?}");

        advance(2).await;
        let runs = widget.run_count();
        assert!(runs >= 1, "{mode:?}");
        if mode == DebounceMode::Coalesce {
            assert_eq!(runs, 1);
        }
        assert_eq!(slide_titles(&page), vec!["Lid", "Ladle"], "{mode:?}");
    }
}

/// Test that the callback-style mechanism drives the same sync, with the
/// first cart product as the recommendations seed.
#[tokio::test(start_paused = true)]
async fn callback_mutation_requests_recommendations_for_first_product() {
    let transport = routed_transport();
    let page = loading_page(CART_PAGE);
    let mut storefront = Storefront::new(CartSyncConfig::default(), page.clone(), transport.clone());
    storefront.install_recommendations().unwrap();

    let mut request = storefront.callback_requests().create();
    request
        .open(Method::Post, "/cart/change.js")
        .set_header("Content-Type", "application/json");
    request
        .send(Some(r#"{"line":1,"quantity":2}"#.into()))
        .unwrap()
        .await
        .unwrap();

    advance(101).await;

    let requests = transport.requests_to(RECS_PATH);
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].url,
        "/recommendations/products.json?product_id=123&limit=8&intent=related"
    );
    assert_eq!(slide_titles(&page), vec!["Lid", "Ladle"]);

    let doc = page.lock();
    let price = doc.find(".recommendation-price").unwrap();
    assert_eq!(doc.text_content(price), "99,00 kr.");
}

/// Test that a failed or malformed recommendations fetch keeps the slides.
#[tokio::test(start_paused = true)]
async fn failed_recommendations_fetch_keeps_content() {
    let transport = routed_transport();
    transport.fail(RECS_PATH, "connection reset");
    let page = loading_page(CART_PAGE);
    let mut storefront = Storefront::new(CartSyncConfig::default(), page.clone(), transport.clone());
    storefront.install_recommendations().unwrap();

    page.dispatch_event(PageEvent::CartUpdated);
    advance(150).await;

    transport.respond(RECS_PATH, 200, "<!doctype html>");
    page.dispatch_event(PageEvent::CartRefresh);
    advance(150).await;

    assert_eq!(transport.requests_to(RECS_PATH).len(), 2);
    let doc = page.lock();
    let container = doc.find(".recommendations-scroll").unwrap();
    assert_eq!(doc.text_content(container), "previous");
}

/// Test that an empty cart clears the carousel through a page event.
#[tokio::test(start_paused = true)]
async fn empty_cart_clears_recommendations() {
    let transport = routed_transport();
    transport.respond("/cart.js", 200, r#"{"items":[],"total_price":0,"item_count":0}"#);
    let page = loading_page(CART_PAGE);
    let mut storefront = Storefront::new(CartSyncConfig::default(), page.clone(), transport.clone());
    storefront.install_recommendations().unwrap();

    page.dispatch_event(PageEvent::parse("cart:updated"));
    advance(150).await;

    let doc = page.lock();
    let container = doc.find(".recommendations-scroll").unwrap();
    assert!(doc.children(container).is_empty());
    assert!(transport.requests_to(RECS_PATH).is_empty());
}

/// Test that failed mutations pass through unchanged and trigger nothing.
#[tokio::test(start_paused = true)]
async fn failed_mutations_do_not_sync() {
    let transport = routed_transport();
    transport.respond_to(Method::Post, "/cart/add.js", 422, r#"{"status":422}"#);
    transport.fail("/cart/update.js", "offline");
    let page = loading_page(CART_PAGE);
    let mut storefront = Storefront::new(CartSyncConfig::default(), page, transport.clone());
    storefront.install_all().unwrap();

    let response = storefront
        .fetch_client()
        .fetch(Request::post("/cart/add.js"))
        .await
        .unwrap();
    assert_eq!(response.status, 422);
    assert_eq!(response.body, r#"{"status":422}"#);
    assert!(storefront
        .fetch_client()
        .fetch(Request::post("/cart/update.js"))
        .await
        .is_err());

    advance(500).await;
    for concern in Concern::ALL {
        assert_eq!(storefront.signal(concern).unwrap().emit_count(), 0);
        assert_eq!(storefront.widget(concern).unwrap().run_count(), 0);
    }
    assert!(transport.requests_to("/cart.js").is_empty());
}

/// Test that both concerns' layers fire on one mutation, in either order.
#[tokio::test(start_paused = true)]
async fn chained_concerns_all_observe_a_mutation() {
    let transport = routed_transport();
    let page = loading_page(CART_PAGE);
    let mut storefront = Storefront::new(CartSyncConfig::default(), page, transport);
    storefront.install_recommendations().unwrap();
    storefront.install_terms_gate().unwrap();
    assert_eq!(storefront.fetch_client().layer_count(), 2);

    storefront
        .fetch_client()
        .fetch(Request::post("/cart/add.js"))
        .await
        .unwrap();

    assert_eq!(storefront.signal(Concern::Recommendations).unwrap().emit_count(), 1);
    assert_eq!(storefront.signal(Concern::TermsGate).unwrap().emit_count(), 1);

    // The terms gate settles first.
    advance(51).await;
    assert_eq!(storefront.widget(Concern::TermsGate).unwrap().run_count(), 1);
    assert_eq!(storefront.widget(Concern::Recommendations).unwrap().run_count(), 0);
    advance(50).await;
    assert_eq!(storefront.widget(Concern::Recommendations).unwrap().run_count(), 1);
}

/// Test that a loaded upsell panel is never fetched again.
#[tokio::test(start_paused = true)]
async fn loaded_upsell_is_never_refetched() {
    let transport = routed_transport();
    let page = Page::new(Document::from_html(CART_PAGE));
    let mut storefront = Storefront::new(CartSyncConfig::default(), page.clone(), transport.clone());
    storefront.install_upsell().unwrap();

    // Already loaded: the initial pass fetches and marks the panel.
    advance(1).await;
    assert_eq!(transport.requests_to(FRAGMENT_PATH).len(), 1);
    {
        let doc = page.lock();
        let panel = doc.find("#cart-upsell").unwrap();
        assert_eq!(doc.attr(panel, "data-upsell-loaded"), Some("true"));
        assert!(doc.find("#cart-upsell .upsell-card").is_some());
    }

    storefront
        .fetch_client()
        .fetch(Request::post("/cart/add.js"))
        .await
        .unwrap();
    page.dispatch_event(PageEvent::SectionLoad);
    page.dispatch_event(PageEvent::SectionUnload);
    page.with(|doc| {
        let body = doc.body();
        let note = doc.create_element("p");
        doc.append_child(body, note);
    });
    advance(500).await;

    assert_eq!(transport.requests_to(FRAGMENT_PATH).len(), 1);
}

/// Test that a panel without a seed product never asks for a fragment.
#[tokio::test(start_paused = true)]
async fn missing_seed_attribute_means_no_fetch() {
    let transport = routed_transport();
    let page = Page::new(Document::from_html(r#"<div id="cart-upsell"></div>"#));
    let mut storefront = Storefront::new(CartSyncConfig::default(), page.clone(), transport.clone());
    storefront.install_upsell().unwrap();

    page.dispatch_event(PageEvent::CartUpdated);
    page.dispatch_event(PageEvent::SectionLoad);
    advance(500).await;

    assert!(transport.requests().is_empty());
    assert!(storefront.widget(Concern::Upsell).unwrap().run_count() >= 2);
}

/// Test that section reloads and drawer re-renders load the upsell panel.
#[tokio::test(start_paused = true)]
async fn upsell_follows_section_reloads_and_dynamic_drawers() {
    let transport = routed_transport();
    let page = loading_page(r#"<div id="drawer-slot"></div>"#);
    let mut storefront = Storefront::new(CartSyncConfig::default(), page.clone(), transport.clone());
    storefront.install_upsell().unwrap();
    assert!(storefront.is_watching(Concern::Upsell));

    page.dispatch_event(PageEvent::DomContentLoaded);
    advance(1).await;
    assert_eq!(storefront.widget(Concern::Upsell).unwrap().run_count(), 1);
    assert!(transport.requests().is_empty());

    // The drawer is rendered late; the watcher notices and loads the panel.
    page.with(|doc| {
        let slot = doc.find("#drawer-slot").unwrap();
        doc.set_inner_html(slot, r#"<div id="cart-upsell" data-first-product-id="77"></div>"#);
    });
    advance(1).await;

    let requests = transport.requests_to(FRAGMENT_PATH);
    assert_eq!(requests.len(), 1);
    assert!(requests[0].url.contains("product_id=77"));
    assert!(requests[0].url.contains("limit=4"));
    assert!(requests[0].url.contains("section_id=cart-recommendations"));

    // A section reload that replaces the panel starts over.
    page.with(|doc| {
        let slot = doc.find("#drawer-slot").unwrap();
        doc.set_inner_html(slot, r#"<div id="cart-upsell" data-first-product-id="78"></div>"#);
    });
    page.dispatch_event(PageEvent::SectionLoad);
    advance(1).await;

    let requests = transport.requests_to(FRAGMENT_PATH);
    assert!(requests.len() >= 2);
    assert!(requests[1].url.contains("product_id=78"));
}

/// Test that checkout is blocked until the terms are accepted.
#[tokio::test(start_paused = true)]
async fn checkout_requires_accepted_terms() {
    let transport = routed_transport();
    let page = Page::new(Document::from_html(CART_PAGE));
    let mut storefront = Storefront::new(CartSyncConfig::default(), page.clone(), transport);
    storefront.install_terms_gate().unwrap();
    advance(1).await;

    let (checkbox, button) = {
        let doc = page.lock();
        (
            doc.find("#terms-checkbox").unwrap(),
            doc.find(r#"button[name="checkout"]"#).unwrap(),
        )
    };

    assert!(!page.lock().activate(button).allowed());

    page.lock().set_checked(checkbox, true);
    assert!(page.lock().activate(button).allowed());

    // Submitting the form directly goes through the same check.
    page.lock().set_checked(checkbox, false);
    let form = page.lock().find("form").unwrap();
    assert!(!page.lock().activate(form).allowed());
}

/// Test that a checkbox missing at activation time still blocks checkout.
#[tokio::test(start_paused = true)]
async fn absent_checkbox_blocks_checkout() {
    let transport = routed_transport();
    let page = Page::new(Document::from_html(CART_PAGE));
    let mut storefront = Storefront::new(CartSyncConfig::default(), page.clone(), transport);
    storefront.install_terms_gate().unwrap();
    advance(1).await;

    let mut doc = page.lock();
    let wrapper = doc.find(".terms-wrapper").unwrap();
    doc.remove(wrapper);
    let button = doc.find(r#"button[name="checkout"]"#).unwrap();
    assert!(!doc.activate(button).allowed());
}

/// Test that many triggers produce one warning, which expires.
#[tokio::test(start_paused = true)]
async fn one_warning_per_wrapper_and_it_expires() {
    let transport = routed_transport();
    let page = Page::new(Document::from_html(CART_PAGE));
    let mut storefront = Storefront::new(CartSyncConfig::default(), page.clone(), transport);
    storefront.install_terms_gate().unwrap();
    advance(1).await;

    let (buttons, form) = {
        let doc = page.lock();
        let selector = Selector::parse(r#"button[name="checkout"]"#).unwrap();
        (doc.query_selector_all(&selector), doc.find("form").unwrap())
    };
    assert_eq!(buttons.len(), 2);

    for &button in &buttons {
        page.lock().activate(button);
    }
    page.lock().activate(form);
    assert_eq!(popup_count(&page), 1);

    advance(2_400).await;
    assert_eq!(popup_count(&page), 1);
    advance(200).await;
    assert_eq!(popup_count(&page), 0);

    // After expiry the next blocked attempt warns again.
    page.lock().activate(buttons[0]);
    assert_eq!(popup_count(&page), 1);
}

/// Test that triggers rendered after a cart change get bound.
#[tokio::test(start_paused = true)]
async fn rerendered_triggers_are_bound_after_a_mutation() {
    let transport = routed_transport();
    let page = Page::new(Document::from_html(
        r#"<div id="drawer"><input type="checkbox" data-terms-checkbox></div>"#,
    ));
    let mut storefront = Storefront::new(CartSyncConfig::default(), page.clone(), transport);
    storefront.install_terms_gate().unwrap();
    advance(1).await;

    let link = page.with(|doc| {
        let drawer = doc.find("#drawer").unwrap();
        let link = doc.create_element("a");
        doc.set_attr(link, "href", "/checkout?locale=da");
        doc.append_child(drawer, link);
        link
    });
    assert!(page.lock().activate(link).allowed());

    storefront
        .fetch_client()
        .fetch(Request::post("/cart/add.js"))
        .await
        .unwrap();
    advance(51).await;

    assert!(!page.lock().activate(link).allowed());
    assert_eq!(popup_count(&page), 1);
}
