//! Widget Bindings
//!
//! The three widgets that depend on cart contents. Each implements
//! [`WidgetBinding`](crate::reactive::WidgetBinding); the storefront wraps
//! them in bound widgets and wires signals to them.
//!
//! - [`RecommendationCarousel`]: related products for the first cart line
//! - [`UpsellPanel`]: pre-rendered upsell markup, loaded once per page
//! - [`TermsGate`]: blocks checkout until the terms checkbox is checked

mod price;
mod recommendations;
pub mod terms_gate;
mod upsell;

pub use price::PriceFormat;
pub use recommendations::RecommendationCarousel;
pub use terms_gate::TermsGate;
pub use upsell::UpsellPanel;
