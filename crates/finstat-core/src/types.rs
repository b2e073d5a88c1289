use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, FinStatError};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Ratios and growth rates, expressed in percent unless the metric name says
/// otherwise (e.g. `current_ratio` is a plain multiple).
pub type Rate = Decimal;

/// Multiples (e.g., 1.8x current ratio)
pub type Multiple = Decimal;

/// Metric name → value for one analytical dimension.
pub type MetricMap = BTreeMap<String, Decimal>;

/// Round to 2 decimal places, half away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

// ---------------------------------------------------------------------------
// Dimensions and ratio results
// ---------------------------------------------------------------------------

/// One of the five analytical categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Profitability,
    Solvency,
    Efficiency,
    Growth,
    CashFlow,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Profitability,
        Dimension::Solvency,
        Dimension::Efficiency,
        Dimension::Growth,
        Dimension::CashFlow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profitability => "profitability",
            Self::Solvency => "solvency",
            Self::Efficiency => "efficiency",
            Self::Growth => "growth",
            Self::CashFlow => "cash_flow",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ratios grouped by dimension. Serializes to exactly five keys, whether or
/// not any metric was computed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatioResult {
    pub profitability: MetricMap,
    pub solvency: MetricMap,
    pub efficiency: MetricMap,
    pub growth: MetricMap,
    pub cash_flow: MetricMap,
}

impl RatioResult {
    /// All five dimensions present, none populated.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn dimension(&self, dimension: Dimension) -> &MetricMap {
        match dimension {
            Dimension::Profitability => &self.profitability,
            Dimension::Solvency => &self.solvency,
            Dimension::Efficiency => &self.efficiency,
            Dimension::Growth => &self.growth,
            Dimension::CashFlow => &self.cash_flow,
        }
    }

    pub fn dimension_mut(&mut self, dimension: Dimension) -> &mut MetricMap {
        match dimension {
            Dimension::Profitability => &mut self.profitability,
            Dimension::Solvency => &mut self.solvency,
            Dimension::Efficiency => &mut self.efficiency,
            Dimension::Growth => &mut self.growth,
            Dimension::CashFlow => &mut self.cash_flow,
        }
    }

    pub fn get(&self, dimension: Dimension, metric: &str) -> Option<Decimal> {
        self.dimension(dimension).get(metric).copied()
    }

    /// Missing metrics read as zero, the way downstream rule tables expect.
    pub fn value_or_zero(&self, dimension: Dimension, metric: &str) -> Decimal {
        self.get(dimension, metric).unwrap_or(Decimal::ZERO)
    }

    pub fn is_empty(&self) -> bool {
        Dimension::ALL
            .iter()
            .all(|d| self.dimension(*d).is_empty())
    }
}

// ---------------------------------------------------------------------------
// Structured error document
// ---------------------------------------------------------------------------

/// Request-level failure returned in place of a raised error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDocument {
    pub error: bool,
    pub error_code: ErrorCode,
    pub message: String,
    pub suggestions: Vec<String>,
    /// A sample of an accepted input shape.
    pub example: serde_json::Value,
}

impl ErrorDocument {
    pub fn from_error(err: &FinStatError) -> Self {
        let code = err.code();
        Self {
            error: true,
            error_code: code,
            message: err.to_string(),
            suggestions: suggestions_for(code),
            example: accepted_shape_example(),
        }
    }
}

fn suggestions_for(code: ErrorCode) -> Vec<String> {
    let specific = match code {
        ErrorCode::JsonParseError => "Check that the payload is valid JSON (quotes, commas, brackets)",
        ErrorCode::EmptyData => "Provide at least one financial metric such as revenue or total_assets",
        ErrorCode::UnsupportedFormat => {
            "Supply an object with statement containers (income/balance/cashflow) or flat metrics (revenue, net_profit, ...)"
        }
        ErrorCode::StructureError => {
            "Statement containers must hold an object or an array of objects, one per period"
        }
        ErrorCode::CalculationError => "Check numeric fields for non-numeric or extreme values",
    };
    vec![
        specific.to_string(),
        "Make sure the data contains the required financial metrics".to_string(),
        "Compare against the accepted-format example".to_string(),
    ]
}

fn accepted_shape_example() -> serde_json::Value {
    serde_json::json!({
        "income": { "revenue": 1000.0, "net_profit": 100.0 },
        "balance": { "total_assets": 5000.0, "total_liabilities": 3000.0 }
    })
}

// ---------------------------------------------------------------------------
// Computation envelope
// ---------------------------------------------------------------------------

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_ratio_result_serializes_five_keys() {
        let value = serde_json::to_value(RatioResult::empty()).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 5);
        for d in Dimension::ALL {
            assert!(obj[d.as_str()].as_object().unwrap().is_empty());
        }
    }

    #[test]
    fn test_round2_half_away_from_zero() {
        assert_eq!(round2(dec!(1.925)), dec!(1.93));
        assert_eq!(round2(dec!(-1.925)), dec!(-1.93));
        assert_eq!(round2(dec!(88.7132)), dec!(88.71));
    }

    #[test]
    fn test_error_document_codes() {
        let doc = ErrorDocument::from_error(&FinStatError::UnsupportedFormat("list".into()));
        assert!(doc.error);
        assert_eq!(doc.error_code, ErrorCode::UnsupportedFormat);
        assert!(!doc.suggestions.is_empty());
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["error_code"], "UNSUPPORTED_FORMAT");
        assert!(json["example"]["income"].is_object());
    }

    #[test]
    fn test_value_or_zero_for_missing_metric() {
        let mut r = RatioResult::empty();
        r.solvency.insert("current_ratio".into(), dec!(1.5));
        assert_eq!(r.value_or_zero(Dimension::Solvency, "current_ratio"), dec!(1.5));
        assert_eq!(r.value_or_zero(Dimension::Solvency, "quick_ratio"), Decimal::ZERO);
        assert!(!r.is_empty());
    }
}
