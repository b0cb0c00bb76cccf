//! Minor-unit price rendering.

use crate::config::PriceConfig;

/// Formats prices given in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceFormat {
    config: PriceConfig,
    decimals: u32,
    scale: u64,
}

impl PriceFormat {
    /// `decimals` above [`PriceConfig::MAX_DECIMALS`] are clamped to it.
    pub fn new(config: PriceConfig) -> Self {
        let decimals = config.decimals.min(PriceConfig::MAX_DECIMALS);
        let scale = 10u64.checked_pow(decimals).unwrap_or(u64::MAX);
        Self {
            config,
            decimals,
            scale,
        }
    }

    pub fn format(&self, minor: i64) -> String {
        let magnitude = minor.unsigned_abs();
        let units = group_thousands(magnitude / self.scale, &self.config.thousands_separator);

        let mut amount = String::new();
        if minor < 0 {
            amount.push('-');
        }
        amount.push_str(&units);
        if self.decimals > 0 {
            amount.push_str(&self.config.decimal_separator);
            amount.push_str(&format!(
                "{:0width$}",
                magnitude % self.scale,
                width = self.decimals as usize
            ));
        }

        let symbol = &self.config.currency_symbol;
        match (symbol.is_empty(), self.config.symbol_after) {
            (true, _) => amount,
            (false, true) => format!("{amount} {symbol}"),
            (false, false) => format!("{symbol}{amount}"),
        }
    }
}

impl Default for PriceFormat {
    fn default() -> Self {
        Self::new(PriceConfig::default())
    }
}

fn group_thousands(value: u64, separator: &str) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 * separator.len());
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(digit);
    }
    out
}
