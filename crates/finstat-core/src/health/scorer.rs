//! Composite financial health score.
//!
//! Four sub-scores start from a base of 50 and add points from band tables,
//! capped at 100. The composite weights them 30/30/20/20 and maps to a risk
//! level: >= 80 low, >= 60 medium, otherwise high.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::trends::TrendResult;
use crate::types::{Dimension, RatioResult};

const BASE_SCORE: Decimal = dec!(50);
const MAX_SCORE: Decimal = dec!(100);

const PROFITABILITY_WEIGHT: Decimal = dec!(0.3);
const SOLVENCY_WEIGHT: Decimal = dec!(0.3);
const EFFICIENCY_WEIGHT: Decimal = dec!(0.2);
const GROWTH_WEIGHT: Decimal = dec!(0.2);

const LOW_RISK_FLOOR: Decimal = dec!(80);
const MEDIUM_RISK_FLOOR: Decimal = dec!(60);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: Decimal) -> Self {
        if score >= LOW_RISK_FLOOR {
            Self::Low
        } else if score >= MEDIUM_RISK_FLOOR {
            Self::Medium
        } else {
            Self::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScores {
    pub profitability: Decimal,
    pub solvency: Decimal,
    pub efficiency: Decimal,
    pub growth: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthAssessment {
    /// 0-100, one decimal place.
    pub overall_score: Decimal,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
    pub dimension_scores: DimensionScores,
    pub summary: String,
}

// ---------------------------------------------------------------------------
// Rule tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Better {
    Higher,
    Lower,
}

/// Points for the first band the value clears (strictly).
struct ScoreRule {
    dimension: Dimension,
    metric: &'static str,
    better: Better,
    bands: [(Decimal, Decimal); 3],
}

const PROFITABILITY_RULES: &[ScoreRule] = &[
    ScoreRule {
        dimension: Dimension::Profitability,
        metric: "net_profit_margin",
        better: Better::Higher,
        bands: [(dec!(15), dec!(20)), (dec!(5), dec!(10)), (dec!(0), dec!(5))],
    },
    ScoreRule {
        dimension: Dimension::Profitability,
        metric: "roe",
        better: Better::Higher,
        bands: [(dec!(20), dec!(20)), (dec!(10), dec!(10)), (dec!(0), dec!(5))],
    },
    ScoreRule {
        dimension: Dimension::Profitability,
        metric: "roa",
        better: Better::Higher,
        bands: [(dec!(10), dec!(10)), (dec!(5), dec!(5)), (dec!(0), dec!(2))],
    },
];

const SOLVENCY_RULES: &[ScoreRule] = &[
    ScoreRule {
        dimension: Dimension::Solvency,
        metric: "debt_to_asset_ratio",
        better: Better::Lower,
        bands: [(dec!(40), dec!(20)), (dec!(60), dec!(10)), (dec!(80), dec!(5))],
    },
    ScoreRule {
        dimension: Dimension::Solvency,
        metric: "current_ratio",
        better: Better::Higher,
        bands: [(dec!(2), dec!(15)), (dec!(1), dec!(10)), (dec!(0.5), dec!(5))],
    },
    ScoreRule {
        dimension: Dimension::Solvency,
        metric: "quick_ratio",
        better: Better::Higher,
        bands: [(dec!(1.5), dec!(10)), (dec!(1), dec!(5)), (dec!(0.5), dec!(2))],
    },
];

const EFFICIENCY_RULES: &[ScoreRule] = &[
    ScoreRule {
        dimension: Dimension::Efficiency,
        metric: "asset_turnover",
        better: Better::Higher,
        bands: [(dec!(1), dec!(20)), (dec!(0.5), dec!(10)), (dec!(0), dec!(5))],
    },
    ScoreRule {
        dimension: Dimension::Efficiency,
        metric: "inventory_turnover",
        better: Better::Higher,
        bands: [(dec!(10), dec!(20)), (dec!(5), dec!(10)), (dec!(0), dec!(5))],
    },
];

const GROWTH_RULES: &[ScoreRule] = &[
    ScoreRule {
        dimension: Dimension::Growth,
        metric: "revenue_growth",
        better: Better::Higher,
        bands: [(dec!(15), dec!(20)), (dec!(5), dec!(10)), (dec!(0), dec!(5))],
    },
    ScoreRule {
        dimension: Dimension::Growth,
        metric: "profit_growth",
        better: Better::Higher,
        bands: [(dec!(15), dec!(20)), (dec!(5), dec!(10)), (dec!(0), dec!(5))],
    },
];

enum Trigger {
    Below(Decimal),
    Above(Decimal),
}

struct AdviceRule {
    dimension: Dimension,
    metric: &'static str,
    trigger: Trigger,
    message: &'static str,
}

const ADVICE_RULES: &[AdviceRule] = &[
    AdviceRule {
        dimension: Dimension::Profitability,
        metric: "net_profit_margin",
        trigger: Trigger::Below(dec!(5)),
        message: "Optimise the cost structure to lift profit margins",
    },
    AdviceRule {
        dimension: Dimension::Profitability,
        metric: "roe",
        trigger: Trigger::Below(dec!(10)),
        message: "Improve return on equity to strengthen shareholder returns",
    },
    AdviceRule {
        dimension: Dimension::Solvency,
        metric: "debt_to_asset_ratio",
        trigger: Trigger::Above(dec!(60)),
        message: "Rebalance the debt structure to reduce financial risk",
    },
    AdviceRule {
        dimension: Dimension::Solvency,
        metric: "current_ratio",
        trigger: Trigger::Below(dec!(1)),
        message: "Strengthen working capital management to improve short-term solvency",
    },
    AdviceRule {
        dimension: Dimension::Efficiency,
        metric: "asset_turnover",
        trigger: Trigger::Below(dec!(0.5)),
        message: "Raise asset utilisation and reallocate under-used resources",
    },
    AdviceRule {
        dimension: Dimension::Growth,
        metric: "revenue_growth",
        trigger: Trigger::Below(dec!(5)),
        message: "Broaden market channels to restore revenue growth",
    },
    AdviceRule {
        dimension: Dimension::CashFlow,
        metric: "operating_cash_flow",
        trigger: Trigger::Below(dec!(0)),
        message: "Operating cash flow is negative; tighten receivable collection and working capital",
    },
];

const GENERIC_ADVICE: [&str; 2] = [
    "Financial position is sound; maintain the current prudent operating strategy",
    "Monitor industry trends and adjust strategy as conditions change",
];

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Metric value for the rule tables. Missing metrics read as zero; a zero
/// growth metric falls back to the trend average.
fn metric_value(ratios: &RatioResult, trends: &TrendResult, dimension: Dimension, metric: &str) -> Decimal {
    let value = ratios.value_or_zero(dimension, metric);
    if dimension != Dimension::Growth || !value.is_zero() {
        return value;
    }
    match metric {
        "revenue_growth" => trends.revenue.average_growth,
        "profit_growth" => trends.profit.average_growth,
        _ => value,
    }
}

fn band_points(rule: &ScoreRule, value: Decimal) -> Decimal {
    rule.bands
        .iter()
        .find(|(threshold, _)| match rule.better {
            Better::Higher => value > *threshold,
            Better::Lower => value < *threshold,
        })
        .map(|(_, points)| *points)
        .unwrap_or(Decimal::ZERO)
}

fn sub_score(rules: &[ScoreRule], ratios: &RatioResult, trends: &TrendResult) -> Decimal {
    let points: Decimal = rules
        .iter()
        .map(|rule| band_points(rule, metric_value(ratios, trends, rule.dimension, rule.metric)))
        .sum();
    (BASE_SCORE + points).min(MAX_SCORE)
}

fn recommendations(ratios: &RatioResult, trends: &TrendResult) -> Vec<String> {
    let mut advice: Vec<String> = ADVICE_RULES
        .iter()
        .filter(|rule| {
            let value = metric_value(ratios, trends, rule.dimension, rule.metric);
            match rule.trigger {
                Trigger::Below(limit) => value < limit,
                Trigger::Above(limit) => value > limit,
            }
        })
        .map(|rule| rule.message.to_string())
        .collect();
    if advice.is_empty() {
        advice = GENERIC_ADVICE.iter().map(|s| s.to_string()).collect();
    }
    advice
}

fn summary(score: Decimal, risk: RiskLevel, ratios: &RatioResult, trends: &TrendResult) -> String {
    let mut text = format!("Overall financial health score is {score} ({risk} risk).");
    if !ratios.profitability.is_empty() {
        text.push_str(&format!(
            " Net profit margin {}%, ROE {}%.",
            ratios.value_or_zero(Dimension::Profitability, "net_profit_margin"),
            ratios.value_or_zero(Dimension::Profitability, "roe"),
        ));
    }
    if !ratios.solvency.is_empty() {
        text.push_str(&format!(
            " Debt-to-asset ratio {}%, current ratio {}.",
            ratios.value_or_zero(Dimension::Solvency, "debt_to_asset_ratio"),
            ratios.value_or_zero(Dimension::Solvency, "current_ratio"),
        ));
    }
    text.push_str(&format!(
        " Revenue growth {}%, revenue trend {}.",
        metric_value(ratios, trends, Dimension::Growth, "revenue_growth"),
        trends.revenue.direction.as_str(),
    ));
    text
}

/// Score ratios and trends into a health assessment.
pub fn assess_health(ratios: &RatioResult, trends: &TrendResult) -> HealthAssessment {
    let dimension_scores = DimensionScores {
        profitability: sub_score(PROFITABILITY_RULES, ratios, trends),
        solvency: sub_score(SOLVENCY_RULES, ratios, trends),
        efficiency: sub_score(EFFICIENCY_RULES, ratios, trends),
        growth: sub_score(GROWTH_RULES, ratios, trends),
    };

    let weighted = dimension_scores.profitability * PROFITABILITY_WEIGHT
        + dimension_scores.solvency * SOLVENCY_WEIGHT
        + dimension_scores.efficiency * EFFICIENCY_WEIGHT
        + dimension_scores.growth * GROWTH_WEIGHT;
    let overall_score = weighted.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
    let risk_level = RiskLevel::from_score(overall_score);

    info!(score = %overall_score, risk = risk_level.as_str(), "health assessment complete");

    HealthAssessment {
        overall_score,
        risk_level,
        recommendations: recommendations(ratios, trends),
        summary: summary(overall_score, risk_level, ratios, trends),
        dimension_scores,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trends::{TrendDirection, TrendSummary};
    use pretty_assertions::assert_eq;

    fn ratios(entries: &[(Dimension, &str, Decimal)]) -> RatioResult {
        let mut r = RatioResult::empty();
        for (d, k, v) in entries {
            r.dimension_mut(*d).insert(k.to_string(), *v);
        }
        r
    }

    fn strong_company() -> RatioResult {
        ratios(&[
            (Dimension::Profitability, "net_profit_margin", dec!(20)),
            (Dimension::Profitability, "roe", dec!(25)),
            (Dimension::Profitability, "roa", dec!(12)),
            (Dimension::Solvency, "debt_to_asset_ratio", dec!(30)),
            (Dimension::Solvency, "current_ratio", dec!(2.5)),
            (Dimension::Solvency, "quick_ratio", dec!(2)),
            (Dimension::Efficiency, "asset_turnover", dec!(1.2)),
            (Dimension::Efficiency, "inventory_turnover", dec!(12)),
            (Dimension::Growth, "revenue_growth", dec!(20)),
            (Dimension::Growth, "profit_growth", dec!(20)),
        ])
    }

    #[test]
    fn test_strong_company_low_risk() {
        let h = assess_health(&strong_company(), &TrendResult::default());
        assert_eq!(h.dimension_scores.profitability, dec!(100));
        assert_eq!(h.dimension_scores.solvency, dec!(95));
        assert_eq!(h.dimension_scores.efficiency, dec!(90));
        assert_eq!(h.dimension_scores.growth, dec!(90));
        assert_eq!(h.overall_score, dec!(94.5));
        assert_eq!(h.risk_level, RiskLevel::Low);
        assert_eq!(h.recommendations.len(), 2);
        assert_eq!(h.recommendations[0], GENERIC_ADVICE[0]);
    }

    #[test]
    fn test_empty_ratios_high_risk() {
        let h = assess_health(&RatioResult::empty(), &TrendResult::default());
        // only the zero debt ratio earns points
        assert_eq!(h.dimension_scores.solvency, dec!(70));
        assert_eq!(h.overall_score, dec!(56));
        assert_eq!(h.risk_level, RiskLevel::High);
        assert_eq!(h.recommendations.len(), 5);
    }

    #[test]
    fn test_medium_risk_band() {
        assert_eq!(RiskLevel::from_score(dec!(80)), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(dec!(79.9)), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(dec!(60)), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(dec!(59.9)), RiskLevel::High);
    }

    #[test]
    fn test_growth_falls_back_to_trend_average() {
        let trends = TrendResult {
            revenue: TrendSummary {
                direction: TrendDirection::Increasing,
                average_growth: dec!(20),
            },
            ..Default::default()
        };
        let r = ratios(&[
            (Dimension::Growth, "revenue_growth", Decimal::ZERO),
            (Dimension::Growth, "profit_growth", Decimal::ZERO),
        ]);
        let h = assess_health(&r, &trends);
        assert_eq!(h.dimension_scores.growth, dec!(70));
        assert!(!h
            .recommendations
            .iter()
            .any(|m| m.contains("revenue growth")));
    }

    #[test]
    fn test_debt_and_cash_flow_advice() {
        let mut r = strong_company();
        r.solvency.insert("debt_to_asset_ratio".into(), dec!(75));
        r.cash_flow.insert("operating_cash_flow".into(), dec!(-3.2));
        let h = assess_health(&r, &TrendResult::default());
        assert_eq!(h.dimension_scores.solvency, dec!(80));
        assert_eq!(
            h.recommendations,
            vec![ADVICE_RULES[2].message.to_string(), ADVICE_RULES[6].message.to_string()]
        );
    }

    #[test]
    fn test_summary_mentions_score_and_ratios() {
        let h = assess_health(&strong_company(), &TrendResult::default());
        assert!(h.summary.contains("94.5"));
        assert!(h.summary.contains("low risk"));
        assert!(h.summary.contains("Debt-to-asset ratio 30%"));
    }
}
