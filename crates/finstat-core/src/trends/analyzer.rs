//! Revenue and profit trend analysis.
//!
//! Series-shaped input (historical or multi-company) gets a compound growth
//! rate per subject over the whole sequence. Statement-shaped input (flat or
//! nested) gets a single-step growth rate between the two latest periods.
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::normalize::canonical::row_period;
use crate::normalize::{resolve_field, CanonicalField, CanonicalStatementSet, InputShape, PeriodRow};
use crate::types::{round2, Money, Rate};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

impl TrendDirection {
    /// Strictly above `threshold` is increasing, strictly below `-threshold`
    /// is decreasing.
    pub fn classify(growth: Rate, threshold: Rate) -> Self {
        if growth > threshold {
            Self::Increasing
        } else if growth < -threshold {
            Self::Decreasing
        } else {
            Self::Stable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodPoint {
    pub period: String,
    pub revenue: Money,
    pub profit: Money,
}

/// One subject's chronological points and its growth rates (percent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectTrend {
    pub subject: String,
    pub points: Vec<PeriodPoint>,
    pub revenue_growth: Option<Rate>,
    pub profit_growth: Option<Rate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub direction: TrendDirection,
    pub average_growth: Rate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrowthRates {
    pub revenue_growth: Vec<Rate>,
    pub profit_growth: Vec<Rate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub revenue: TrendSummary,
    pub profit: TrendSummary,
    pub growth_rates: GrowthRates,
    pub subjects: Vec<SubjectTrend>,
}

/// A named subject and its canonical statements.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectStatements {
    pub subject: String,
    pub statements: CanonicalStatementSet,
}

// ---------------------------------------------------------------------------
// Growth helpers
// ---------------------------------------------------------------------------

/// Percent change from `previous` to `current`, or `None` when `previous` is
/// not positive.
pub fn single_step_growth(current: Money, previous: Money) -> Option<Rate> {
    if previous <= Decimal::ZERO {
        return None;
    }
    let change = current.checked_sub(previous)?;
    let rate = change.checked_div(previous)?.checked_mul(Decimal::ONE_HUNDRED)?;
    Some(round2(rate))
}

/// Compound growth `((last / first)^(1 / periods) - 1) * 100`. Zero when
/// either endpoint is non-positive.
pub fn compound_growth_rate(last: Money, first: Money, periods: usize) -> Rate {
    if first <= Decimal::ZERO || last <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let periods = periods.max(1);
    let Some(ratio) = last.checked_div(first) else {
        return Decimal::ZERO;
    };
    let factor = if periods == 1 {
        Some(ratio)
    } else {
        ratio.checked_powd(Decimal::ONE / Decimal::from(periods))
    };
    factor
        .and_then(|f| (f - Decimal::ONE).checked_mul(Decimal::ONE_HUNDRED))
        .map(round2)
        .unwrap_or(Decimal::ZERO)
}

fn mean(values: &[Rate]) -> Option<Rate> {
    if values.is_empty() {
        return None;
    }
    let sum = values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))?;
    Some(round2(sum / Decimal::from(values.len())))
}

fn fallback_label(offset: usize) -> String {
    match offset {
        0 => "current".to_string(),
        1 => "previous".to_string(),
        n => format!("t-{n}"),
    }
}

fn point(row: &PeriodRow, offset: usize) -> PeriodPoint {
    let pick = |field: CanonicalField| {
        resolve_field(row, field.synonyms())
            .map(|m| m.value)
            .unwrap_or(Decimal::ZERO)
    };
    PeriodPoint {
        period: row_period(row).unwrap_or_else(|| fallback_label(offset)),
        revenue: pick(CanonicalField::Revenue),
        profit: pick(CanonicalField::NetProfit),
    }
}

/// Chronological points from a most-recent-first income table.
fn chronological_points(income: &[PeriodRow]) -> Vec<PeriodPoint> {
    income
        .iter()
        .enumerate()
        .rev()
        .map(|(offset, row)| point(row, offset))
        .collect()
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Analyze trends for the subjects of one payload.
pub fn analyze_trends(
    shape: InputShape,
    subjects: &[SubjectStatements],
    config: &EngineConfig,
) -> TrendResult {
    let result = match shape {
        InputShape::HistoricalSeries | InputShape::MultiCompanyMultiYear => {
            compound_trends(subjects, config)
        }
        InputShape::FlatMetrics | InputShape::NestedStatements => match subjects.first() {
            Some(subject) => single_step_trends(subject, config),
            None => TrendResult::default(),
        },
        InputShape::Unrecognized => TrendResult::default(),
    };
    info!(
        shape = shape.as_str(),
        revenue = result.revenue.direction.as_str(),
        revenue_growth = %result.revenue.average_growth,
        profit = result.profit.direction.as_str(),
        profit_growth = %result.profit.average_growth,
        "trend analysis complete"
    );
    result
}

fn compound_trends(subjects: &[SubjectStatements], config: &EngineConfig) -> TrendResult {
    let mut result = TrendResult::default();

    for subject in subjects {
        let points = chronological_points(&subject.statements.income);
        let (revenue_growth, profit_growth) = match (points.first(), points.last()) {
            (Some(first), Some(last)) if points.len() >= 2 => {
                let periods = points.len() - 1;
                (
                    Some(compound_growth_rate(last.revenue, first.revenue, periods)),
                    Some(compound_growth_rate(last.profit, first.profit, periods)),
                )
            }
            _ => (None, None),
        };
        debug!(subject = %subject.subject, points = points.len(), ?revenue_growth, "subject trend");

        result.growth_rates.revenue_growth.extend(revenue_growth);
        result.growth_rates.profit_growth.extend(profit_growth);
        result.subjects.push(SubjectTrend {
            subject: subject.subject.clone(),
            points,
            revenue_growth,
            profit_growth,
        });
    }

    let threshold = config.threshold_for(subjects.len() > 1);
    result.revenue = summarize(mean(&result.growth_rates.revenue_growth), threshold);
    result.profit = summarize(mean(&result.growth_rates.profit_growth), threshold);
    result
}

fn single_step_trends(subject: &SubjectStatements, config: &EngineConfig) -> TrendResult {
    let income = &subject.statements.income;
    let window = &income[..income.len().min(config.trend_years())];
    let recent: Vec<PeriodPoint> = window
        .iter()
        .enumerate()
        .map(|(offset, row)| point(row, offset))
        .collect();

    let mut growth_rates = GrowthRates::default();
    for pair in recent.windows(2) {
        growth_rates
            .revenue_growth
            .extend(single_step_growth(pair[0].revenue, pair[1].revenue));
        growth_rates
            .profit_growth
            .extend(single_step_growth(pair[0].profit, pair[1].profit));
    }

    let (revenue_growth, profit_growth) = match recent.as_slice() {
        [current, previous, ..] => (
            single_step_growth(current.revenue, previous.revenue),
            single_step_growth(current.profit, previous.profit),
        ),
        _ => (None, None),
    };

    let threshold = config.threshold_for(false);
    let mut points = recent;
    points.reverse();
    TrendResult {
        revenue: summarize(revenue_growth, threshold),
        profit: summarize(profit_growth, threshold),
        growth_rates,
        subjects: vec![SubjectTrend {
            subject: subject.subject.clone(),
            points,
            revenue_growth,
            profit_growth,
        }],
    }
}

fn summarize(growth: Option<Rate>, threshold: Rate) -> TrendSummary {
    match growth {
        Some(g) => TrendSummary {
            direction: TrendDirection::classify(g, threshold),
            average_growth: g,
        },
        None => TrendSummary::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnitHint;
    use crate::normalize::{canonicalize, canonicalize_subject, classify, RawFinancialInputShape};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};

    fn trends_for(input: Value) -> TrendResult {
        let config = EngineConfig::default();
        let shape = classify(&input);
        let mut warnings = Vec::new();
        let subjects = match &shape {
            RawFinancialInputShape::MultiCompanyMultiYear { subjects } => subjects
                .iter()
                .map(|s| SubjectStatements {
                    subject: s.subject.clone(),
                    statements: canonicalize_subject(s, UnitHint::Auto, &mut warnings),
                })
                .collect(),
            other => vec![SubjectStatements {
                subject: "subject".into(),
                statements: canonicalize(other, UnitHint::Auto, &mut warnings).unwrap(),
            }],
        };
        analyze_trends(shape.kind(), &subjects, &config)
    }

    #[test]
    fn test_direction_thresholds() {
        assert_eq!(TrendDirection::classify(dec!(5.01), dec!(5)), TrendDirection::Increasing);
        assert_eq!(TrendDirection::classify(dec!(5), dec!(5)), TrendDirection::Stable);
        assert_eq!(TrendDirection::classify(dec!(-5.01), dec!(5)), TrendDirection::Decreasing);
    }

    #[test]
    fn test_single_step_growth() {
        assert_eq!(single_step_growth(dec!(120), dec!(100)), Some(dec!(20)));
        assert_eq!(single_step_growth(dec!(120), Decimal::ZERO), None);
    }

    #[test]
    fn test_compound_growth() {
        assert_eq!(compound_growth_rate(dec!(121), dec!(100), 2), dec!(10));
        assert_eq!(compound_growth_rate(dec!(150), dec!(100), 1), dec!(50));
        assert_eq!(compound_growth_rate(dec!(150), dec!(-1), 3), Decimal::ZERO);
    }

    #[test]
    fn test_nested_statements_single_step() {
        let t = trends_for(json!({
            "income": [
                {"营业收入": 1_000_000_000_i64, "净利润": 150_000_000},
                {"营业收入": 800_000_000, "净利润": 120_000_000}
            ]
        }));
        assert_eq!(t.revenue.average_growth, dec!(25));
        assert_eq!(t.revenue.direction, TrendDirection::Increasing);
        assert_eq!(t.growth_rates.revenue_growth, vec![dec!(25)]);
        let points = &t.subjects[0].points;
        assert_eq!(points[0].period, "previous");
        assert_eq!(points[1].period, "current");
    }

    #[test]
    fn test_flat_previous_fields() {
        let t = trends_for(json!({
            "revenue": 96,
            "previous_revenue": 100,
            "net_profit": 10,
            "prev_net_profit": 8
        }));
        assert_eq!(t.revenue.average_growth, dec!(-4));
        assert_eq!(t.revenue.direction, TrendDirection::Stable);
        assert_eq!(t.profit.average_growth, dec!(25));
        assert_eq!(t.profit.direction, TrendDirection::Increasing);
    }

    #[test]
    fn test_flat_without_previous_is_stable() {
        let t = trends_for(json!({"revenue": 100, "net_profit": 10}));
        assert_eq!(t.revenue, TrendSummary::default());
        assert!(t.growth_rates.revenue_growth.is_empty());
    }

    #[test]
    fn test_historical_compound_growth() {
        let t = trends_for(json!({
            "historical_data": {
                "2022": {"营业收入": 100, "净利润": 10},
                "2023": {"营业收入": 110, "净利润": 9},
                "2024": {"营业收入": 121, "净利润": 8.1}
            }
        }));
        assert_eq!(t.revenue.average_growth, dec!(10));
        assert_eq!(t.revenue.direction, TrendDirection::Increasing);
        assert_eq!(t.profit.average_growth, dec!(-10));
        assert_eq!(t.profit.direction, TrendDirection::Decreasing);
        let periods: Vec<&str> = t.subjects[0].points.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(periods, vec!["2022", "2023", "2024"]);
    }

    #[test]
    fn test_multi_company_uses_aggregate_threshold() {
        let t = trends_for(json!({
            "A": {"2023": {"revenue": 100, "net_profit": 10}, "2024": {"revenue": 108, "net_profit": 10}},
            "B": {"2023": {"revenue": 100, "net_profit": 10}, "2024": {"revenue": 106, "net_profit": 10}}
        }));
        assert_eq!(t.subjects.len(), 2);
        assert_eq!(t.growth_rates.revenue_growth, vec![dec!(8), dec!(6)]);
        assert_eq!(t.revenue.average_growth, dec!(7));
        // 7% is above the single-subject threshold but not the aggregate one
        assert_eq!(t.revenue.direction, TrendDirection::Stable);
    }
}
