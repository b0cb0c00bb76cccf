//! Configuration.
//!
//! Every field has a default matching the stock storefront theme, so an
//! empty JSON object is a complete configuration. Hosts override only what
//! their theme does differently.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::http::CartMutationMatcher;
use crate::reactive::DebounceMode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartSyncConfig {
    /// Route root every storefront endpoint lives under.
    pub root: String,
    /// Request target fragments that mark a cart mutation.
    pub mutation_paths: Vec<String>,
    pub debounce_mode: DebounceMode,
    pub recommendations: RecommendationsConfig,
    pub upsell: UpsellConfig,
    pub terms: TermsConfig,
    pub price: PriceConfig,
}

impl CartSyncConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.price.decimals > PriceConfig::MAX_DECIMALS {
            return Err(ConfigError::Invalid {
                field: "price.decimals",
                reason: format!(
                    "{} exceeds the maximum of {}",
                    self.price.decimals,
                    PriceConfig::MAX_DECIMALS
                ),
            });
        }
        Ok(())
    }

    pub fn matcher(&self) -> CartMutationMatcher {
        CartMutationMatcher::new(self.mutation_paths.iter().cloned())
    }
}

impl Default for CartSyncConfig {
    fn default() -> Self {
        Self {
            root: "/".to_string(),
            mutation_paths: CartMutationMatcher::DEFAULT_FRAGMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            debounce_mode: DebounceMode::default(),
            recommendations: RecommendationsConfig::default(),
            upsell: UpsellConfig::default(),
            terms: TermsConfig::default(),
            price: PriceConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationsConfig {
    pub container: String,
    pub limit: u32,
    pub intent: String,
    pub settle_delay_ms: u64,
    pub watch_containers: bool,
}

impl RecommendationsConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for RecommendationsConfig {
    fn default() -> Self {
        Self {
            container: "#cart-recommendations .recommendations-scroll".to_string(),
            limit: 8,
            intent: "related".to_string(),
            settle_delay_ms: 100,
            watch_containers: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpsellConfig {
    pub container: String,
    /// Attribute holding the product id the fragment is requested for.
    pub seed_attribute: String,
    /// Attribute set to `"true"` once the panel has content.
    pub loaded_attribute: String,
    pub limit: u32,
    pub section_id: String,
    pub settle_delay_ms: u64,
    pub watch_containers: bool,
}

impl UpsellConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for UpsellConfig {
    fn default() -> Self {
        Self {
            container: "#cart-upsell".to_string(),
            seed_attribute: "data-first-product-id".to_string(),
            loaded_attribute: "data-upsell-loaded".to_string(),
            limit: 4,
            section_id: "cart-recommendations".to_string(),
            settle_delay_ms: 100,
            watch_containers: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TermsConfig {
    /// Tried in order; the first selector with a match wins.
    pub checkbox_selectors: Vec<String>,
    /// Every match of every selector is a trigger.
    pub trigger_selectors: Vec<String>,
    pub wrapper_selector: String,
    pub warning_text: String,
    pub warning_class: String,
    pub warning_ttl_ms: u64,
    pub settle_delay_ms: u64,
    pub watch_containers: bool,
}

impl TermsConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn warning_ttl(&self) -> Duration {
        Duration::from_millis(self.warning_ttl_ms)
    }
}

impl Default for TermsConfig {
    fn default() -> Self {
        let owned = |list: &[&str]| -> Vec<String> { list.iter().map(|s| s.to_string()).collect() };
        Self {
            checkbox_selectors: owned(&[
                "[data-terms-checkbox]",
                "#terms-checkbox",
                r#"input[type="checkbox"][name*="terms" i]"#,
                r#"input[type="checkbox"][id*="terms" i]"#,
            ]),
            trigger_selectors: owned(&[
                r#"button[name="checkout"]"#,
                r#"input[name="checkout"]"#,
                "[data-checkout]",
                r#"button[formaction*="/checkout"]"#,
                r#"a[href^="/checkout"]"#,
                r#"a[href*="/checkout?"]"#,
                r#"form[action*="/checkout"]"#,
            ]),
            wrapper_selector: ".terms-wrapper".to_string(),
            warning_text: "Accepter handelsbetingelserne først".to_string(),
            warning_class: "terms-error-popup".to_string(),
            warning_ttl_ms: 2500,
            settle_delay_ms: 50,
            watch_containers: false,
        }
    }
}

/// How minor-unit prices are rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceConfig {
    pub currency_symbol: String,
    /// Symbol after the amount (`1.234,50 kr.`) instead of before (`$1,234.50`).
    pub symbol_after: bool,
    pub thousands_separator: String,
    pub decimal_separator: String,
    /// Digits after the decimal separator.
    pub decimals: u32,
}

impl PriceConfig {
    /// Largest `decimals` whose scale still fits a `u64`.
    pub const MAX_DECIMALS: u32 = 19;
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            currency_symbol: "kr.".to_string(),
            symbol_after: true,
            thousands_separator: ".".to_string(),
            decimal_separator: ",".to_string(),
            decimals: 2,
        }
    }
}
