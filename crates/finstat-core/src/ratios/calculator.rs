//! Ratio calculator across five dimensions.
//!
//! Ratios read the most recent row of each statement; growth and the
//! efficiency averages also read the prior row when one exists.
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use super::bounds::{bounded_ratio, bounded_value};
use crate::config::HUNDRED_MILLION;
use crate::normalize::{extract_value, resolve_field, CanonicalField, CanonicalStatementSet, PeriodRow};
use crate::types::{round2, MetricMap, Money, RatioResult};

const PERCENT: Decimal = dec!(100);

/// Inventory above current assets is replaced by this share of them.
const INVENTORY_CAP_SHARE: Decimal = dec!(0.5);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn value(row: &PeriodRow, field: CanonicalField) -> Money {
    extract_value(row, field.synonyms())
}

fn optional(row: &PeriodRow, field: CanonicalField) -> Option<Money> {
    resolve_field(row, field.synonyms()).map(|m| m.value)
}

/// Average of current and prior balances; the current balance alone when the
/// prior one is missing or non-positive.
fn average_balance(current: &PeriodRow, prior: Option<&PeriodRow>, field: CanonicalField) -> Money {
    let end = value(current, field);
    let begin = prior.and_then(|row| optional(row, field)).unwrap_or(Decimal::ZERO);
    if begin > Decimal::ZERO {
        end.saturating_add(begin) / dec!(2)
    } else {
        end
    }
}

fn to_hundred_million(value: Money) -> Money {
    value.checked_div(HUNDRED_MILLION).unwrap_or(Decimal::ZERO)
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute every dimension. Always returns all five dimension keys.
pub fn calculate_ratios(statements: &CanonicalStatementSet) -> RatioResult {
    let result = RatioResult {
        profitability: profitability(statements),
        solvency: solvency(statements),
        efficiency: efficiency(statements),
        growth: growth(statements),
        cash_flow: cash_flow(statements),
    };
    debug!(
        profitability = result.profitability.len(),
        solvency = result.solvency.len(),
        efficiency = result.efficiency.len(),
        cash_flow = result.cash_flow.len(),
        "ratios computed"
    );
    result
}

/// Headline figures of the latest period in hundred-million units. Only
/// fields actually supplied are reported.
pub fn extract_key_metrics(statements: &CanonicalStatementSet) -> BTreeMap<String, Money> {
    let picks: [(&str, Option<&PeriodRow>, CanonicalField); 7] = [
        ("revenue", statements.income.first(), CanonicalField::Revenue),
        ("net_profit", statements.income.first(), CanonicalField::NetProfit),
        ("parent_net_profit", statements.income.first(), CanonicalField::ParentNetProfit),
        ("total_assets", statements.balance.first(), CanonicalField::TotalAssets),
        ("total_liabilities", statements.balance.first(), CanonicalField::TotalLiabilities),
        ("equity", statements.balance.first(), CanonicalField::Equity),
        ("operating_cash_flow", statements.cash_flow.first(), CanonicalField::OperatingCashFlow),
    ];

    picks
        .into_iter()
        .filter_map(|(name, row, field)| {
            let v = optional(row?, field)?;
            Some((name.to_string(), round2(to_hundred_million(v))))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Dimensions
// ---------------------------------------------------------------------------

fn profitability(s: &CanonicalStatementSet) -> MetricMap {
    let mut m = MetricMap::new();
    let Some(income) = s.income.first() else {
        return m;
    };

    let revenue = value(income, CanonicalField::Revenue);
    let gross = match optional(income, CanonicalField::OperatingCost) {
        Some(cost) => revenue.saturating_sub(cost),
        None => optional(income, CanonicalField::GrossProfit).unwrap_or(revenue),
    };
    let net_profit = value(income, CanonicalField::NetProfit);

    m.insert(
        "gross_profit_margin".into(),
        bounded_ratio("gross_profit_margin", gross, revenue, PERCENT),
    );
    m.insert(
        "net_profit_margin".into(),
        bounded_ratio("net_profit_margin", net_profit, revenue, PERCENT),
    );

    if let Some(balance) = s.balance.first() {
        let parent_profit = optional(income, CanonicalField::ParentNetProfit).unwrap_or(net_profit);
        let assets = value(balance, CanonicalField::TotalAssets);
        // Equity falls back to assets less liabilities.
        let equity = optional(balance, CanonicalField::Equity).unwrap_or_else(|| {
            assets.saturating_sub(value(balance, CanonicalField::TotalLiabilities))
        });

        m.insert("roe".into(), bounded_ratio("roe", parent_profit, equity, PERCENT));
        m.insert("roa".into(), bounded_ratio("roa", net_profit, assets, PERCENT));
    }
    m
}

fn solvency(s: &CanonicalStatementSet) -> MetricMap {
    let mut m = MetricMap::new();
    let Some(balance) = s.balance.first() else {
        return m;
    };

    let assets = value(balance, CanonicalField::TotalAssets);
    let liabilities = value(balance, CanonicalField::TotalLiabilities);
    let current_assets = value(balance, CanonicalField::CurrentAssets);
    let current_liabilities = value(balance, CanonicalField::CurrentLiabilities);

    let mut inventory = value(balance, CanonicalField::Inventory);
    if inventory > current_assets && current_assets > Decimal::ZERO {
        debug!(%inventory, %current_assets, "inventory exceeds current assets, capping");
        inventory = current_assets * INVENTORY_CAP_SHARE;
    }
    let quick_assets = if current_assets > Decimal::ZERO && inventory > Decimal::ZERO {
        current_assets - inventory
    } else {
        current_assets
    };

    m.insert(
        "debt_to_asset_ratio".into(),
        bounded_ratio("debt_to_asset_ratio", liabilities, assets, PERCENT),
    );
    m.insert(
        "current_ratio".into(),
        bounded_ratio("current_ratio", current_assets, current_liabilities, Decimal::ONE),
    );
    m.insert(
        "quick_ratio".into(),
        bounded_ratio("quick_ratio", quick_assets, current_liabilities, Decimal::ONE),
    );
    m
}

fn efficiency(s: &CanonicalStatementSet) -> MetricMap {
    let mut m = MetricMap::new();
    let (Some(income), Some(balance)) = (s.income.first(), s.balance.first()) else {
        return m;
    };
    let prior = s.balance.get(1);

    let revenue = value(income, CanonicalField::Revenue);
    let cost = value(income, CanonicalField::OperatingCost);
    let avg_assets = average_balance(balance, prior, CanonicalField::TotalAssets);
    let avg_inventory = average_balance(balance, prior, CanonicalField::Inventory);
    let avg_receivables = average_balance(balance, prior, CanonicalField::Receivables);

    m.insert(
        "asset_turnover".into(),
        bounded_ratio("asset_turnover", revenue, avg_assets, Decimal::ONE),
    );
    m.insert(
        "inventory_turnover".into(),
        bounded_ratio("inventory_turnover", cost, avg_inventory, Decimal::ONE),
    );
    let receivables_turnover = if revenue > Decimal::ZERO {
        bounded_ratio("receivables_turnover", revenue, avg_receivables, Decimal::ONE)
    } else {
        Decimal::ZERO
    };
    m.insert("receivables_turnover".into(), receivables_turnover);
    m
}

fn growth(s: &CanonicalStatementSet) -> MetricMap {
    let mut m = MetricMap::new();
    let (revenue_growth, profit_growth) = match (s.income.first(), s.income.get(1)) {
        (Some(current), Some(previous)) => (
            period_growth("revenue_growth", current, previous, CanonicalField::Revenue),
            period_growth("profit_growth", current, previous, CanonicalField::NetProfit),
        ),
        _ => (Decimal::ZERO, Decimal::ZERO),
    };
    m.insert("revenue_growth".into(), revenue_growth);
    m.insert("profit_growth".into(), profit_growth);
    m
}

/// Percent change from `previous` to `current`; zero when the previous value
/// is non-positive.
fn period_growth(metric: &str, current: &PeriodRow, previous: &PeriodRow, field: CanonicalField) -> Decimal {
    let now = value(current, field);
    let before = value(previous, field);
    bounded_ratio(metric, now.saturating_sub(before), before, PERCENT)
}

fn cash_flow(s: &CanonicalStatementSet) -> MetricMap {
    const METRICS: [&str; 5] = [
        "operating_cash_flow",
        "cash_flow_ratio",
        "free_cash_flow",
        "cash_reinvestment_ratio",
        "cash_to_investment_ratio",
    ];

    let Some(cf) = s.cash_flow.first() else {
        debug!("no cash flow statement, cash flow ratios default to 0");
        return METRICS
            .iter()
            .map(|k| (k.to_string(), Decimal::ZERO))
            .collect();
    };
    let balance_value = |field: CanonicalField| {
        s.balance
            .first()
            .map(|row| value(row, field))
            .unwrap_or(Decimal::ZERO)
    };

    let ocf = value(cf, CanonicalField::OperatingCashFlow);
    let capex = value(cf, CanonicalField::InvestingCashFlowOut).abs();
    let dividends = value(cf, CanonicalField::DividendsPaid);
    let current_liabilities = balance_value(CanonicalField::CurrentLiabilities);
    let reinvestment_base = balance_value(CanonicalField::FixedAssets)
        .saturating_add(balance_value(CanonicalField::LongTermInvestments))
        .saturating_add(current_liabilities);

    let mut m = MetricMap::new();
    m.insert(
        "operating_cash_flow".into(),
        bounded_value("operating_cash_flow", to_hundred_million(ocf)),
    );
    m.insert(
        "cash_flow_ratio".into(),
        bounded_ratio("cash_flow_ratio", ocf, current_liabilities, Decimal::ONE),
    );
    m.insert(
        "free_cash_flow".into(),
        bounded_value("free_cash_flow", to_hundred_million(ocf.saturating_sub(capex))),
    );
    m.insert(
        "cash_reinvestment_ratio".into(),
        bounded_ratio(
            "cash_reinvestment_ratio",
            ocf.saturating_sub(dividends),
            reinvestment_base,
            PERCENT,
        ),
    );
    m.insert(
        "cash_to_investment_ratio".into(),
        bounded_ratio(
            "cash_to_investment_ratio",
            ocf,
            capex.saturating_add(dividends.abs()),
            Decimal::ONE,
        ),
    );
    m
}
