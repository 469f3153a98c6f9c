use serde::{Deserialize, Serialize};

/// Named thresholds of the four-condition bullish filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterThresholds {
    /// EMA20 must be at least EMA50 times this factor
    pub ema_crossover_margin: f64,
    /// RSI must lie strictly inside (rsi_min, rsi_max)
    pub rsi_min: f64,
    pub rsi_max: f64,
    /// Close as a percentage of EMA20, inclusive band
    pub price_position_min: f64,
    pub price_position_max: f64,
    /// Volume ratio must be strictly above this floor
    pub volume_ratio_min: f64,
}

impl Default for FilterThresholds {
    fn default() -> Self {
        Self {
            ema_crossover_margin: 0.99,
            rsi_min: 50.0,
            rsi_max: 70.0,
            price_position_min: 98.0,
            price_position_max: 108.0,
            volume_ratio_min: 0.9,
        }
    }
}

/// Rule set used to accept or reject a symbol's latest snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterRule {
    /// All four threshold conditions must hold
    Conditions(FilterThresholds),
    /// Weighted points across trend, momentum, price and volume; passes at `min_score`
    Scored { min_score: u8 },
}

impl FilterRule {
    pub const DEFAULT_MIN_SCORE: u8 = 4;

    pub fn scored() -> Self {
        FilterRule::Scored {
            min_score: Self::DEFAULT_MIN_SCORE,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FilterRule::Conditions(_) => "conditions",
            FilterRule::Scored { .. } => "scored",
        }
    }
}

impl Default for FilterRule {
    fn default() -> Self {
        FilterRule::Conditions(FilterThresholds::default())
    }
}
