use finstat_core::normalize::{canonicalize, classify, CanonicalStatementSet};
use finstat_core::ratios::{calculate_ratios, extract_key_metrics, RatioCache};
use finstat_core::{Dimension, RatioResult, UnitHint};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn statements(input: Value) -> CanonicalStatementSet {
    let mut warnings = Vec::new();
    canonicalize(&classify(&input), UnitHint::Auto, &mut warnings).unwrap()
}

fn ratios(input: Value) -> RatioResult {
    calculate_ratios(&statements(input))
}

// ===========================================================================
// Flat metrics
// ===========================================================================

#[test]
fn test_flat_reference_figures() {
    let r = ratios(json!({
        "revenue": 573.88,
        "net_profit": 11.04,
        "total_assets": 3472.98,
        "total_liabilities": 3081.05
    }));
    assert_eq!(r.get(Dimension::Profitability, "net_profit_margin"), Some(dec!(1.92)));
    assert_eq!(r.get(Dimension::Solvency, "debt_to_asset_ratio"), Some(dec!(88.71)));
}

#[test]
fn test_flat_net_margin_is_profit_over_revenue() {
    let r = ratios(json!({"revenue": 200, "net_profit": 30}));
    // 30 / 200 * 100
    assert_eq!(r.get(Dimension::Profitability, "net_profit_margin"), Some(dec!(15)));
}

#[test]
fn test_flat_chinese_keys() {
    let r = ratios(json!({"营业收入": "1,000", "净利润": "120"}));
    assert_eq!(r.get(Dimension::Profitability, "net_profit_margin"), Some(dec!(12)));
}

// ===========================================================================
// Clamping and fallbacks
// ===========================================================================

#[test]
fn test_debt_ratio_clamped_to_hundred() {
    let r = ratios(json!({"total_assets": 100, "total_liabilities": 150}));
    assert_eq!(r.get(Dimension::Solvency, "debt_to_asset_ratio"), Some(dec!(100)));
}

#[test]
fn test_zero_revenue_margin_falls_back_to_zero() {
    let r = ratios(json!({"income": {"revenue": 0, "net_profit": 5}}));
    assert_eq!(r.get(Dimension::Profitability, "net_profit_margin"), Some(Decimal::ZERO));
}

#[test]
fn test_missing_current_liabilities_uses_ratio_fallbacks() {
    let r = ratios(json!({"balance": {"total_assets": 1000, "current_assets": 400}}));
    assert_eq!(r.get(Dimension::Solvency, "current_ratio"), Some(dec!(1)));
    assert_eq!(r.get(Dimension::Solvency, "quick_ratio"), Some(dec!(0.8)));
}

#[test]
fn test_every_dimension_key_present_for_income_only() {
    let r = ratios(json!({"income": {"revenue": 100, "net_profit": 10}}));
    let value = serde_json::to_value(&r).unwrap();
    let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
    assert_eq!(keys.len(), 5);
    assert!(r.solvency.is_empty());
    assert!(r.efficiency.is_empty());
    // growth and cash flow always carry their metric keys
    assert_eq!(r.get(Dimension::Growth, "revenue_growth"), Some(Decimal::ZERO));
    assert_eq!(r.cash_flow.len(), 5);
}

// ===========================================================================
// Growth
// ===========================================================================

#[test]
fn test_nested_two_periods_growth() {
    let r = ratios(json!({
        "income": [
            {"营业收入": 1_000_000_000_i64, "净利润": 150_000_000},
            {"营业收入": 800_000_000, "净利润": 120_000_000}
        ]
    }));
    assert_eq!(r.get(Dimension::Growth, "revenue_growth"), Some(dec!(25)));
    assert_eq!(r.get(Dimension::Growth, "profit_growth"), Some(dec!(25)));
}

#[test]
fn test_nested_single_period_growth_is_zero() {
    let r = ratios(json!({"income": {"营业收入": 1_000_000_000_i64, "净利润": 150_000_000}}));
    assert_eq!(r.get(Dimension::Growth, "revenue_growth"), Some(Decimal::ZERO));
    assert_eq!(r.get(Dimension::Growth, "profit_growth"), Some(Decimal::ZERO));
}

// ===========================================================================
// Key metrics and cache
// ===========================================================================

#[test]
fn test_key_metrics_in_hundred_million() {
    let s = statements(json!({
        "income": {"revenue": 50_000_000_000_i64, "net_profit": 2_500_000_000_i64}
    }));
    let km = extract_key_metrics(&s);
    assert_eq!(km["revenue"], dec!(500));
    assert_eq!(km["net_profit"], dec!(25));
    assert!(!km.contains_key("total_assets"));
}

#[test]
fn test_identical_input_gives_identical_serialized_ratios() {
    let input = json!({"revenue": 300, "net_profit": 45, "total_assets": 900, "total_liabilities": 400});
    let cache = RatioCache::new(10);
    let first = cache.get_or_compute(&statements(input.clone()), calculate_ratios);
    let second = cache.get_or_compute(&statements(input), calculate_ratios);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(cache.stats().cache_hits, 1);
}
