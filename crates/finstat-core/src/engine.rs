//! End-to-end analysis pipeline.
//!
//! [`FinancialAnalyzer`] owns the configuration and the ratio cache. A
//! request runs detect → canonicalize → ratios → trends → health and always
//! comes back as a fully shaped [`AnalysisReport`]; data problems surface as
//! an embedded [`ErrorDocument`] rather than an `Err`.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::FinStatError;
use crate::health::{assess_health, HealthAssessment};
use crate::normalize::{
    canonicalize, canonicalize_subject, classify, ensure_not_empty, CanonicalStatementSet,
    InputShape, RawFinancialInputShape,
};
use crate::ratios::{calculate_ratios, extract_key_metrics, CacheStats, RatioCache};
use crate::trends::{analyze_trends, SubjectStatements, TrendResult};
use crate::types::{with_metadata, ComputationOutput, ErrorDocument, Money, RatioResult};
use crate::FinStatResult;

const METHODOLOGY: &str =
    "Financial statement normalization with ratio, trend and composite health analysis";

/// Subject label used when the payload does not name one.
const DEFAULT_SUBJECT: &str = "company";

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDocument>,
    pub input_shape: InputShape,
    pub ratios: RatioResult,
    /// Per-subject ratios for multi-company input, keyed by subject.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub peer_ratios: BTreeMap<String, RatioResult>,
    pub trends: TrendResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthAssessment>,
    pub key_metrics: BTreeMap<String, Money>,
}

impl AnalysisReport {
    /// Report for a request that could not be analyzed. All five ratio
    /// dimensions are present and empty; trends and health are left unset.
    pub fn failed(input_shape: InputShape, err: &FinStatError) -> Self {
        Self {
            error: Some(ErrorDocument::from_error(err)),
            input_shape,
            ratios: RatioResult::empty(),
            peer_ratios: BTreeMap::new(),
            trends: TrendResult::default(),
            health: None,
            key_metrics: BTreeMap::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct FinancialAnalyzer {
    config: EngineConfig,
    cache: RatioCache,
}

impl Default for FinancialAnalyzer {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl FinancialAnalyzer {
    pub fn new(config: EngineConfig) -> Self {
        let cache = RatioCache::new(config.cache_capacity);
        Self { config, cache }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ratios for one canonical statement set, memoized by content hash.
    pub fn calculate_ratios(&self, statements: &CanonicalStatementSet) -> RatioResult {
        self.cache.get_or_compute(statements, calculate_ratios)
    }

    pub fn analyze_trends(&self, shape: InputShape, subjects: &[SubjectStatements]) -> TrendResult {
        analyze_trends(shape, subjects, &self.config)
    }

    pub fn assess_health(&self, ratios: &RatioResult, trends: &TrendResult) -> HealthAssessment {
        assess_health(ratios, trends)
    }

    /// Parse a JSON payload and analyze it.
    pub fn analyze_json(&self, payload: &str) -> ComputationOutput<AnalysisReport> {
        let start = Instant::now();
        match serde_json::from_str::<Value>(payload) {
            Ok(value) => self.analyze_value(&value),
            Err(e) => {
                let err = FinStatError::JsonParse(e.to_string());
                warn!(error = %err, "payload is not valid JSON");
                self.envelope(
                    start,
                    Vec::new(),
                    AnalysisReport::failed(InputShape::Unrecognized, &err),
                )
            }
        }
    }

    /// Analyze an already-parsed payload.
    pub fn analyze_value(&self, input: &Value) -> ComputationOutput<AnalysisReport> {
        let start = Instant::now();
        let mut warnings: Vec<String> = Vec::new();

        let report = match ensure_not_empty(input) {
            Err(err) => {
                warn!(error = %err, "empty payload");
                AnalysisReport::failed(InputShape::Unrecognized, &err)
            }
            Ok(()) => {
                let shape = classify(input);
                let kind = shape.kind();
                info!(shape = kind.as_str(), "input classified");
                match self.run(&shape, &mut warnings) {
                    Ok(report) => report,
                    Err(err) => {
                        warn!(shape = kind.as_str(), error = %err, "analysis degraded to error report");
                        self.degraded(kind, &err)
                    }
                }
            }
        };

        self.envelope(start, warnings, report)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    // -- Pipeline -----------------------------------------------------------

    fn run(
        &self,
        shape: &RawFinancialInputShape,
        warnings: &mut Vec<String>,
    ) -> FinStatResult<AnalysisReport> {
        let kind = shape.kind();
        let subjects = self.canonical_subjects(shape, warnings)?;
        let Some(primary) = subjects.first() else {
            return Err(FinStatError::EmptyInput("no subjects in payload".into()));
        };

        let ratios = self.calculate_ratios(&primary.statements);
        let key_metrics = extract_key_metrics(&primary.statements);

        let mut peer_ratios = BTreeMap::new();
        if kind == InputShape::MultiCompanyMultiYear {
            for subject in &subjects {
                peer_ratios.insert(
                    subject.subject.clone(),
                    self.calculate_ratios(&subject.statements),
                );
            }
        }

        let trends = self.analyze_trends(kind, &subjects);
        let health = self.assess_health(&ratios, &trends);

        Ok(AnalysisReport {
            error: None,
            input_shape: kind,
            ratios,
            peer_ratios,
            trends,
            health: Some(health),
            key_metrics,
        })
    }

    /// Error report for a failed run. Structural failures still carry
    /// trends and health computed over empty tables.
    fn degraded(&self, kind: InputShape, err: &FinStatError) -> AnalysisReport {
        let mut report = AnalysisReport::failed(kind, err);
        if !err.is_request_failure() {
            report.trends = self.analyze_trends(kind, &[]);
            report.health = Some(self.assess_health(&report.ratios, &report.trends));
        }
        report
    }

    fn canonical_subjects(
        &self,
        shape: &RawFinancialInputShape,
        warnings: &mut Vec<String>,
    ) -> FinStatResult<Vec<SubjectStatements>> {
        let unit = self.config.unit_hint;
        match shape {
            RawFinancialInputShape::MultiCompanyMultiYear { subjects } => {
                let subjects: Vec<SubjectStatements> = subjects
                    .iter()
                    .map(|series| SubjectStatements {
                        subject: series.subject.clone(),
                        statements: canonicalize_subject(series, unit, warnings),
                    })
                    .filter(|s| !s.statements.is_empty())
                    .collect();
                if subjects.is_empty() {
                    return Err(FinStatError::EmptyInput(
                        "no subject carries numeric financial figures".into(),
                    ));
                }
                Ok(subjects)
            }
            _ => {
                let statements = canonicalize(shape, unit, warnings)?;
                Ok(vec![SubjectStatements {
                    subject: subject_label(shape),
                    statements,
                }])
            }
        }
    }

    fn envelope(
        &self,
        start: Instant,
        warnings: Vec<String>,
        report: AnalysisReport,
    ) -> ComputationOutput<AnalysisReport> {
        let elapsed = start.elapsed().as_micros() as u64;
        with_metadata(METHODOLOGY, &self.config, warnings, elapsed, report)
    }
}

fn subject_label(shape: &RawFinancialInputShape) -> String {
    let named = match shape {
        RawFinancialInputShape::NestedStatements { subject, .. }
        | RawFinancialInputShape::FlatMetrics { subject, .. } => subject.clone(),
        RawFinancialInputShape::HistoricalSeries { series, .. } => Some(series.subject.clone()),
        _ => None,
    };
    named.unwrap_or_else(|| DEFAULT_SUBJECT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::types::Dimension;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn flat_example() -> Value {
        json!({
            "revenue": 573.88,
            "net_profit": 11.04,
            "total_assets": 3472.98,
            "total_liabilities": 3081.05
        })
    }

    #[test]
    fn test_flat_example_end_to_end() {
        let analyzer = FinancialAnalyzer::default();
        let out = analyzer.analyze_value(&flat_example());
        let report = out.result;
        assert!(!report.is_error());
        assert_eq!(report.input_shape, InputShape::FlatMetrics);
        assert_eq!(
            report.ratios.get(Dimension::Profitability, "net_profit_margin"),
            Some(dec!(1.92))
        );
        assert_eq!(
            report.ratios.get(Dimension::Solvency, "debt_to_asset_ratio"),
            Some(dec!(88.71))
        );
        assert_eq!(report.key_metrics["revenue"], dec!(573.88));
        assert!(report.health.is_some());
        assert!(report.peer_ratios.is_empty());
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let analyzer = FinancialAnalyzer::default();
        let report = analyzer.analyze_json("{not json").result;
        let doc = report.error.as_ref().unwrap();
        assert_eq!(doc.error_code, ErrorCode::JsonParseError);
        assert_eq!(report.ratios, RatioResult::empty());
        assert!(report.health.is_none());
    }

    #[test]
    fn test_empty_object_is_empty_data() {
        let analyzer = FinancialAnalyzer::default();
        let report = analyzer.analyze_json("{}").result;
        assert_eq!(report.error.unwrap().error_code, ErrorCode::EmptyData);
    }

    #[test]
    fn test_bare_list_is_unsupported() {
        let analyzer = FinancialAnalyzer::default();
        let report = analyzer.analyze_value(&json!(["a", "b"])).result;
        let doc = report.error.as_ref().unwrap();
        assert_eq!(doc.error_code, ErrorCode::UnsupportedFormat);
        assert!(!doc.suggestions.is_empty());
        assert_eq!(report.input_shape, InputShape::Unrecognized);
        assert!(report.ratios.is_empty());
        assert!(report.health.is_some());
    }

    #[test]
    fn test_repeat_request_hits_cache() {
        let analyzer = FinancialAnalyzer::default();
        let a = analyzer.analyze_value(&flat_example()).result;
        let b = analyzer.analyze_value(&flat_example()).result;
        assert_eq!(a.ratios, b.ratios);
        let stats = analyzer.cache_stats();
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 1);

        analyzer.clear_cache();
        assert_eq!(analyzer.cache_stats().entries, 0);
    }

    #[test]
    fn test_multi_company_peer_ratios() {
        let input = json!({
            "Alpha": {
                "2023": {"revenue": 100, "net_profit": 10},
                "2024": {"revenue": 108, "net_profit": 11}
            },
            "Beta": {
                "2023": {"revenue": 200, "net_profit": 30},
                "2024": {"revenue": 212, "net_profit": 32}
            }
        });
        let analyzer = FinancialAnalyzer::default();
        let report = analyzer.analyze_value(&input).result;
        assert!(!report.is_error());
        assert_eq!(report.input_shape, InputShape::MultiCompanyMultiYear);
        assert_eq!(
            report.peer_ratios.keys().cloned().collect::<Vec<_>>(),
            vec!["Alpha".to_string(), "Beta".to_string()]
        );
        assert_eq!(report.ratios, report.peer_ratios["Alpha"]);
        assert_eq!(report.trends.subjects.len(), 2);
    }

    #[test]
    fn test_envelope_metadata() {
        let analyzer = FinancialAnalyzer::default();
        let out = analyzer.analyze_value(&flat_example());
        assert_eq!(out.methodology, METHODOLOGY);
        assert_eq!(out.metadata.precision, "rust_decimal_128bit");
        assert_eq!(out.assumptions["cache_capacity"], json!(100));
    }

    #[test]
    fn test_analyzer_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FinancialAnalyzer>();
    }
}
