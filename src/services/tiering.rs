use crate::models::Tier;

/// Qualifying-count thresholds between tiers
#[derive(Debug, Clone)]
pub struct TierPolicy {
    /// Qualifying series needed for the full genre x type search
    pub established_min_qualifying: usize,
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            established_min_qualifying: 4,
        }
    }
}

impl TierPolicy {
    /// Picks the data-gathering path for a user with `qualifying` rated series
    ///
    /// Never returns `Browse`; that path is chosen by the caller's request shape.
    pub fn select_tier(&self, qualifying: usize) -> Tier {
        match qualifying {
            0 => Tier::NoHistory,
            n if n < self.established_min_qualifying => Tier::EarlyStage,
            _ => Tier::Established,
        }
    }
}

/// Tier selection with the default thresholds
pub fn select_tier(qualifying: usize) -> Tier {
    TierPolicy::default().select_tier(qualifying)
}
