//! Install Registry
//!
//! Each concern (recommendations, upsell, terms gate) installs its
//! interception layers and event subscriptions at most once. The registry is
//! the "already initialized" capability that enforces this.
//!
//! # Ownership
//!
//! The registry is an ordinary value owned by the composition root and
//! shared by `Arc`. Handing the same registry to two storefront instances
//! models an initialization script evaluated twice on one page: the second
//! instance finds every concern already claimed and installs nothing.
//! Separate registries give fully independent installations, which is what
//! tests want.

use std::fmt;

use dashmap::DashSet;
use serde::{Deserialize, Serialize};

/// One independently installable behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concern {
    Recommendations,
    Upsell,
    TermsGate,
}

impl Concern {
    pub const ALL: [Concern; 3] = [Concern::Recommendations, Concern::Upsell, Concern::TermsGate];

    pub fn name(self) -> &'static str {
        match self {
            Concern::Recommendations => "recommendations",
            Concern::Upsell => "upsell",
            Concern::TermsGate => "terms_gate",
        }
    }
}

impl fmt::Display for Concern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tracks which concerns have been installed.
#[derive(Debug, Default)]
pub struct InstallRegistry {
    claimed: DashSet<Concern>,
}

impl InstallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `concern` for installation.
    ///
    /// Returns `true` exactly once per concern; every later call returns
    /// `false` and the caller must not install anything.
    pub fn try_claim(&self, concern: Concern) -> bool {
        let claimed = self.claimed.insert(concern);
        if claimed {
            tracing::debug!(%concern, "concern claimed");
        } else {
            tracing::debug!(%concern, "concern already installed, skipping");
        }
        claimed
    }

    pub fn is_installed(&self, concern: Concern) -> bool {
        self.claimed.contains(&concern)
    }

    /// Installed concerns in a stable order.
    pub fn installed(&self) -> Vec<Concern> {
        let mut concerns: Vec<Concern> = self.claimed.iter().map(|c| *c).collect();
        concerns.sort();
        concerns
    }
}
