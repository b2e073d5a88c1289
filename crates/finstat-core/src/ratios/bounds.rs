//! Plausible ranges for every ratio and the single clamp-or-default routine
//! that enforces them.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, warn};

use crate::error::FinStatError;
use crate::types::round2;
use crate::FinStatResult;

/// What to do with a computed value outside `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutOfRange {
    Clamp,
    Replace(Decimal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricBound {
    pub metric: &'static str,
    pub min: Decimal,
    pub max: Decimal,
    pub out_of_range: OutOfRange,
    /// Used when the denominator is non-positive or the arithmetic fails.
    pub fallback: Decimal,
}

impl MetricBound {
    const fn new(
        metric: &'static str,
        min: Decimal,
        max: Decimal,
        out_of_range: OutOfRange,
        fallback: Decimal,
    ) -> Self {
        Self {
            metric,
            min,
            max,
            out_of_range,
            fallback,
        }
    }

    pub fn contains(&self, value: Decimal) -> bool {
        value >= self.min && value <= self.max
    }

    /// Clamp or replace a value outside the plausible range.
    pub fn apply(&self, value: Decimal) -> Decimal {
        if self.contains(value) {
            return value;
        }
        let bounded = match self.out_of_range {
            OutOfRange::Clamp => value.clamp(self.min, self.max),
            OutOfRange::Replace(v) => v,
        };
        warn!(metric = self.metric, %value, %bounded, "ratio outside plausible range");
        bounded
    }
}

static UNBOUNDED: MetricBound = MetricBound::new(
    "",
    Decimal::MIN,
    Decimal::MAX,
    OutOfRange::Clamp,
    Decimal::ZERO,
);

pub const METRIC_BOUNDS: &[MetricBound] = &[
    // profitability (percent)
    MetricBound::new("gross_profit_margin", dec!(-100), dec!(100), OutOfRange::Replace(dec!(20)), Decimal::ZERO),
    MetricBound::new("net_profit_margin", dec!(-50), dec!(50), OutOfRange::Clamp, Decimal::ZERO),
    MetricBound::new("roe", dec!(-100), dec!(100), OutOfRange::Clamp, Decimal::ZERO),
    MetricBound::new("roa", dec!(-50), dec!(50), OutOfRange::Clamp, Decimal::ZERO),
    // solvency
    MetricBound::new("debt_to_asset_ratio", dec!(0), dec!(100), OutOfRange::Clamp, Decimal::ZERO),
    MetricBound::new("current_ratio", dec!(0.1), dec!(10), OutOfRange::Clamp, dec!(1)),
    MetricBound::new("quick_ratio", dec!(0.1), dec!(5), OutOfRange::Clamp, dec!(0.8)),
    // efficiency (times per period)
    MetricBound::new("asset_turnover", Decimal::MIN, Decimal::MAX, OutOfRange::Clamp, Decimal::ZERO),
    MetricBound::new("inventory_turnover", Decimal::MIN, Decimal::MAX, OutOfRange::Clamp, Decimal::ZERO),
    MetricBound::new("receivables_turnover", dec!(0.1), dec!(50), OutOfRange::Clamp, Decimal::ZERO),
    // growth (percent)
    MetricBound::new("revenue_growth", Decimal::MIN, Decimal::MAX, OutOfRange::Clamp, Decimal::ZERO),
    MetricBound::new("profit_growth", Decimal::MIN, Decimal::MAX, OutOfRange::Clamp, Decimal::ZERO),
    // cash flow; money figures in hundred-million units
    MetricBound::new("operating_cash_flow", Decimal::MIN, Decimal::MAX, OutOfRange::Clamp, Decimal::ZERO),
    MetricBound::new("cash_flow_ratio", dec!(-10), dec!(10), OutOfRange::Clamp, Decimal::ZERO),
    MetricBound::new("free_cash_flow", dec!(-10_000_000), dec!(10_000_000), OutOfRange::Replace(Decimal::ZERO), Decimal::ZERO),
    MetricBound::new("cash_reinvestment_ratio", dec!(-50), dec!(100), OutOfRange::Clamp, Decimal::ZERO),
    MetricBound::new("cash_to_investment_ratio", dec!(-5), dec!(20), OutOfRange::Clamp, Decimal::ZERO),
];

/// Bound for a metric; unknown metrics are unbounded with a zero fallback.
pub fn bound_for(metric: &str) -> &'static MetricBound {
    METRIC_BOUNDS
        .iter()
        .find(|b| b.metric == metric)
        .unwrap_or(&UNBOUNDED)
}

pub(crate) fn safe_divide(
    numerator: Decimal,
    denominator: Decimal,
    context: &str,
) -> FinStatResult<Decimal> {
    if denominator.is_zero() {
        return Err(FinStatError::DivisionByZero {
            context: context.to_string(),
        });
    }
    numerator
        .checked_div(denominator)
        .ok_or_else(|| FinStatError::Calculation(format!("{context}: division overflow")))
}

/// `numerator / denominator * scale`, rounded to 2 dp and bounded. A
/// non-positive denominator or failed arithmetic yields the metric fallback.
pub fn bounded_ratio(
    metric: &str,
    numerator: Decimal,
    denominator: Decimal,
    scale: Decimal,
) -> Decimal {
    let bound = bound_for(metric);
    if denominator <= Decimal::ZERO {
        debug!(metric, %denominator, "non-positive denominator, using fallback");
        return bound.fallback;
    }
    let scaled = safe_divide(numerator, denominator, metric).and_then(|q| {
        q.checked_mul(scale)
            .ok_or_else(|| FinStatError::Calculation(format!("{metric}: scale overflow")))
    });
    match scaled {
        Ok(v) => bound.apply(round2(v)),
        Err(e) => {
            warn!(metric, error = %e, "ratio arithmetic failed, using fallback");
            bound.fallback
        }
    }
}

/// Bound an already-computed value (no division involved).
pub fn bounded_value(metric: &str, value: Decimal) -> Decimal {
    bound_for(metric).apply(round2(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_every_metric_has_one_bound() {
        for b in METRIC_BOUNDS {
            let count = METRIC_BOUNDS.iter().filter(|o| o.metric == b.metric).count();
            assert_eq!(count, 1, "{}", b.metric);
            assert!(b.min <= b.max);
        }
    }

    #[test]
    fn test_ratio_within_range() {
        assert_eq!(
            bounded_ratio("net_profit_margin", dec!(11.04), dec!(573.88), dec!(100)),
            dec!(1.92)
        );
    }

    #[test]
    fn test_ratio_clamped() {
        assert_eq!(
            bounded_ratio("net_profit_margin", dec!(90), dec!(100), dec!(100)),
            dec!(50)
        );
        assert_eq!(
            bounded_ratio("debt_to_asset_ratio", dec!(150), dec!(100), dec!(100)),
            dec!(100)
        );
        assert_eq!(
            bounded_ratio("current_ratio", dec!(1), dec!(1000), Decimal::ONE),
            dec!(0.1)
        );
    }

    #[test]
    fn test_gross_margin_replaced_when_implausible() {
        assert_eq!(
            bounded_ratio("gross_profit_margin", dec!(-500), dec!(100), dec!(100)),
            dec!(20)
        );
    }

    #[test]
    fn test_non_positive_denominator_uses_fallback() {
        assert_eq!(bounded_ratio("current_ratio", dec!(5), Decimal::ZERO, Decimal::ONE), dec!(1));
        assert_eq!(bounded_ratio("quick_ratio", dec!(5), dec!(-3), Decimal::ONE), dec!(0.8));
        assert_eq!(bounded_ratio("roe", dec!(5), Decimal::ZERO, dec!(100)), Decimal::ZERO);
    }

    #[test]
    fn test_free_cash_flow_guard() {
        assert_eq!(bounded_value("free_cash_flow", dec!(12.345)), dec!(12.35));
        assert_eq!(bounded_value("free_cash_flow", dec!(20_000_000)), Decimal::ZERO);
    }

    #[test]
    fn test_safe_divide_zero() {
        assert!(matches!(
            safe_divide(dec!(1), Decimal::ZERO, "x"),
            Err(FinStatError::DivisionByZero { .. })
        ));
    }
}
