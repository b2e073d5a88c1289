//! Engine configuration.
//!
//! Callers build an [`EngineConfig`] in code or deserialize one from their own
//! settings; the engine itself never reads files or the environment.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Rate};

/// Default number of cached ratio results.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Money values with a magnitude below this are assumed to be quoted in
/// hundred-million units when [`UnitHint::Auto`] is in effect.
pub const AUTO_SCALE_THRESHOLD: Money = dec!(1_000_000_000);

/// One hundred million (亿).
pub const HUNDRED_MILLION: Money = dec!(100_000_000);

/// Ten thousand (万).
pub const TEN_THOUSAND: Money = dec!(10_000);

/// Unit in which flat and historical money figures are quoted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitHint {
    /// Infer per field: a field whose figures are all small is treated as
    /// quoted in hundred-million units.
    #[default]
    Auto,
    Yuan,
    TenThousand,
    HundredMillion,
}

impl UnitHint {
    /// Multiplier for every figure of one field across its periods. `Auto`
    /// scales the whole run or none of it, so a series crossing the
    /// threshold keeps a single unit.
    pub fn scale_factor<I>(&self, figures: I) -> Money
    where
        I: IntoIterator<Item = Money>,
    {
        match self {
            Self::Auto => {
                let mut small = false;
                for value in figures.into_iter().filter(|v| !v.is_zero()) {
                    if value.abs() >= AUTO_SCALE_THRESHOLD {
                        return Decimal::ONE;
                    }
                    small = true;
                }
                if small {
                    HUNDRED_MILLION
                } else {
                    Decimal::ONE
                }
            }
            Self::Yuan => Decimal::ONE,
            Self::TenThousand => TEN_THOUSAND,
            Self::HundredMillion => HUNDRED_MILLION,
        }
    }

    /// Convert a single raw money figure to base currency units.
    pub fn to_base_units(&self, value: Money) -> Money {
        value
            .checked_mul(self.scale_factor([value]))
            .unwrap_or(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of cached ratio results. Once reached, new results are
    /// computed but not stored.
    pub cache_capacity: usize,
    pub unit_hint: UnitHint,
    /// Most recent income periods considered for the period-over-period list.
    pub trend_years: usize,
    /// Direction threshold (percent) for a single subject.
    pub trend_threshold: Rate,
    /// Direction threshold (percent) when averaging across several subjects.
    pub aggregate_trend_threshold: Rate,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            unit_hint: UnitHint::Auto,
            trend_years: 4,
            trend_threshold: dec!(5),
            aggregate_trend_threshold: dec!(10),
        }
    }
}

impl EngineConfig {
    pub fn with_unit_hint(mut self, unit_hint: UnitHint) -> Self {
        self.unit_hint = unit_hint;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub(crate) fn trend_years(&self) -> usize {
        self.trend_years.max(2)
    }

    pub(crate) fn threshold_for(&self, aggregate: bool) -> Rate {
        if aggregate {
            self.aggregate_trend_threshold.abs()
        } else {
            self.trend_threshold.abs()
        }
    }
}
