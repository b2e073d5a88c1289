//! Input shape detection.
//!
//! A payload is classified in a fixed priority order: historical series,
//! multi-company multi-year map, nested statements, flat metrics. Anything
//! else is unrecognized.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::fields::{resolve_flat_key, Statement, HISTORY_KEYS, SUBJECT_KEYS, YEARS_KEYS};
use crate::error::FinStatError;
use crate::FinStatResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Serializable tag of a detected shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputShape {
    NestedStatements,
    FlatMetrics,
    MultiCompanyMultiYear,
    HistoricalSeries,
    Unrecognized,
}

impl InputShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NestedStatements => "nested_statements",
            Self::FlatMetrics => "flat_metrics",
            Self::MultiCompanyMultiYear => "multi_company_multi_year",
            Self::HistoricalSeries => "historical_series",
            Self::Unrecognized => "unrecognized",
        }
    }
}

/// Statement containers exactly as supplied (object or array of objects).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementContainers {
    pub income: Option<Value>,
    pub balance: Option<Value>,
    pub cash_flow: Option<Value>,
}

impl StatementContainers {
    pub fn get(&self, statement: Statement) -> Option<&Value> {
        match statement {
            Statement::Income => self.income.as_ref(),
            Statement::Balance => self.balance.as_ref(),
            Statement::CashFlow => self.cash_flow.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.income.is_none() && self.balance.is_none() && self.cash_flow.is_none()
    }
}

/// One period of a series: its label and raw metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPeriod {
    pub period: String,
    pub metrics: Map<String, Value>,
}

/// Periods for one subject, in the order supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectSeries {
    pub subject: String,
    pub periods: Vec<SeriesPeriod>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawFinancialInputShape {
    NestedStatements {
        subject: Option<String>,
        containers: StatementContainers,
    },
    FlatMetrics {
        subject: Option<String>,
        metrics: Map<String, Value>,
    },
    /// Subjects in key order.
    MultiCompanyMultiYear { subjects: Vec<SubjectSeries> },
    HistoricalSeries {
        series: SubjectSeries,
        /// Companion statement containers for the current reporting period.
        containers: StatementContainers,
    },
    Unrecognized { reason: String },
}

impl RawFinancialInputShape {
    pub fn kind(&self) -> InputShape {
        match self {
            Self::NestedStatements { .. } => InputShape::NestedStatements,
            Self::FlatMetrics { .. } => InputShape::FlatMetrics,
            Self::MultiCompanyMultiYear { .. } => InputShape::MultiCompanyMultiYear,
            Self::HistoricalSeries { .. } => InputShape::HistoricalSeries,
            Self::Unrecognized { .. } => InputShape::Unrecognized,
        }
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Reject payloads that carry nothing to analyze.
pub fn ensure_not_empty(input: &Value) -> FinStatResult<()> {
    let empty = match input {
        Value::Null => true,
        Value::Object(m) => m.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    };
    if empty {
        return Err(FinStatError::EmptyInput(
            "payload contains no financial data".into(),
        ));
    }
    Ok(())
}

/// Classify a parsed payload. Never fails; unknown layouts come back as
/// [`RawFinancialInputShape::Unrecognized`].
pub fn classify(input: &Value) -> RawFinancialInputShape {
    let Value::Object(root) = input else {
        return RawFinancialInputShape::Unrecognized {
            reason: format!("expected a JSON object, got {}", json_type_name(input)),
        };
    };

    if let Some(series) = detect_historical(root) {
        debug!(periods = series.periods.len(), "detected historical series");
        return RawFinancialInputShape::HistoricalSeries {
            series,
            containers: statement_containers(root),
        };
    }

    if let Some(subjects) = detect_multi_company(root) {
        debug!(subjects = subjects.len(), "detected multi-company map");
        return RawFinancialInputShape::MultiCompanyMultiYear { subjects };
    }

    let containers = statement_containers(root);
    if !containers.is_empty() {
        return RawFinancialInputShape::NestedStatements {
            subject: subject_name(root),
            containers,
        };
    }

    if root.keys().any(|k| resolve_flat_key(k).is_some()) {
        return RawFinancialInputShape::FlatMetrics {
            subject: subject_name(root),
            metrics: root.clone(),
        };
    }

    RawFinancialInputShape::Unrecognized {
        reason: "no statement containers or known financial metrics found".into(),
    }
}

fn statement_containers(root: &Map<String, Value>) -> StatementContainers {
    let find = |statement: Statement| {
        statement
            .container_aliases()
            .iter()
            .filter_map(|alias| root.get(*alias))
            .find(|v| v.is_object() || v.is_array())
            .cloned()
    };
    StatementContainers {
        income: find(Statement::Income),
        balance: find(Statement::Balance),
        cash_flow: find(Statement::CashFlow),
    }
}

pub(crate) fn subject_name(root: &Map<String, Value>) -> Option<String> {
    SUBJECT_KEYS
        .iter()
        .filter_map(|k| root.get(*k))
        .find_map(|v| v.as_str().map(str::trim).filter(|s| !s.is_empty()))
        .map(str::to_string)
}

/// A history container, or top-level `years` + parallel metric arrays.
fn detect_historical(root: &Map<String, Value>) -> Option<SubjectSeries> {
    let subject = subject_name(root).unwrap_or_else(|| "subject".to_string());

    for key in HISTORY_KEYS {
        if let Some(Value::Object(container)) = root.get(*key) {
            if let Some(periods) = year_keyed_periods(container).or_else(|| parallel_arrays(container)) {
                return Some(SubjectSeries { subject, periods });
            }
        }
    }

    parallel_arrays(root).map(|periods| SubjectSeries { subject, periods })
}

/// `{"2023": {...}, "2024": {...}}`
fn year_keyed_periods(container: &Map<String, Value>) -> Option<Vec<SeriesPeriod>> {
    if container.is_empty() {
        return None;
    }
    let mut periods = Vec::with_capacity(container.len());
    for (key, value) in container {
        let Value::Object(metrics) = value else {
            return None;
        };
        if !is_year(key) {
            return None;
        }
        periods.push(SeriesPeriod {
            period: key.clone(),
            metrics: metrics.clone(),
        });
    }
    Some(periods)
}

/// `{"years": [2022, 2023], "revenue": [10, 12], ...}`
fn parallel_arrays(container: &Map<String, Value>) -> Option<Vec<SeriesPeriod>> {
    let years = YEARS_KEYS
        .iter()
        .find_map(|k| container.get(*k).and_then(Value::as_array))?;
    if years.is_empty() {
        return None;
    }
    let labels: Vec<String> = years.iter().map(period_label).collect();

    let columns: Vec<(&String, &Vec<Value>)> = container
        .iter()
        .filter(|(k, _)| !YEARS_KEYS.contains(&k.as_str()))
        .filter_map(|(k, v)| v.as_array().map(|a| (k, a)))
        .collect();
    if columns.is_empty() {
        return None;
    }

    let periods = labels
        .into_iter()
        .enumerate()
        .map(|(i, period)| {
            let metrics = columns
                .iter()
                .filter_map(|(k, col)| col.get(i).map(|v| ((*k).clone(), v.clone())))
                .collect();
            SeriesPeriod { period, metrics }
        })
        .collect();
    Some(periods)
}

/// Every value is an object keyed solely by four-digit years.
fn detect_multi_company(root: &Map<String, Value>) -> Option<Vec<SubjectSeries>> {
    let mut subjects = Vec::with_capacity(root.len());
    for (name, value) in root {
        let Value::Object(years) = value else {
            return None;
        };
        let periods = year_keyed_periods(years)?;
        subjects.push(SubjectSeries {
            subject: name.clone(),
            periods,
        });
    }
    if subjects.is_empty() {
        None
    } else {
        Some(subjects)
    }
}

pub(crate) fn is_year(key: &str) -> bool {
    let key = key.trim();
    key.len() == 4 && key.chars().all(|c| c.is_ascii_digit())
}

fn period_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
