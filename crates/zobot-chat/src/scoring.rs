//! Lead scoring: a running, non-decreasing total of rule deltas.

use serde::{Deserialize, Serialize};

/// Per-rule score increments.
pub struct ScoreDelta;

impl ScoreDelta {
    pub const NONE: u32 = 0;
    pub const SUPPORT: u32 = 5;
    pub const FEATURES: u32 = 5;
    pub const KNOWLEDGE: u32 = 5;
    pub const SELL: u32 = 10;
    pub const BUSINESS_INQUIRY: u32 = 10;
    pub const LISTING_CONFIRMED: u32 = 15;
    pub const DEMO: u32 = 15;
    pub const TRIAL: u32 = 15;
    pub const BUY: u32 = 20;
    pub const PURCHASE_CONFIRMED: u32 = 30;
}

/// Sales-qualification score for one session.
///
/// No cap and no decay; deltas are unsigned so the total never drops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadScore(u64);

impl LeadScore {
    pub fn new() -> Self {
        Self(0)
    }

    /// Add `delta` and return the new total.
    pub fn add(&mut self, delta: u32) -> u64 {
        self.0 = self.0.saturating_add(u64::from(delta));
        self.0
    }

    pub fn total(&self) -> u64 {
        self.0
    }
}
