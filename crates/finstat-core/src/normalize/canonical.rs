//! Canonicalization of any accepted input shape into per-statement period
//! tables.
//!
//! Each table is ordered most recent period first. A row maps canonical field
//! ids (and their Chinese captions) to raw numeric values; fields that were not
//! supplied are absent rather than zero.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::detect::{RawFinancialInputShape, SeriesPeriod, StatementContainers, SubjectSeries};
use super::extractor::{sanitize_value, FieldSource};
use super::fields::{resolve_flat_key, CanonicalField, Statement, PERIOD_KEYS};
use crate::config::UnitHint;
use crate::error::FinStatError;
use crate::FinStatResult;

/// Key under which canonical rows carry their period label.
pub const PERIOD_LABEL_KEY: &str = "REPORT_DATE";

/// One reporting period of one statement.
pub type PeriodRow = BTreeMap<String, Value>;

// ---------------------------------------------------------------------------
// Statement set
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalStatementSet {
    pub income: Vec<PeriodRow>,
    pub balance: Vec<PeriodRow>,
    pub cash_flow: Vec<PeriodRow>,
}

impl CanonicalStatementSet {
    pub fn table(&self, statement: Statement) -> &[PeriodRow] {
        match statement {
            Statement::Income => &self.income,
            Statement::Balance => &self.balance,
            Statement::CashFlow => &self.cash_flow,
        }
    }

    fn table_mut(&mut self, statement: Statement) -> &mut Vec<PeriodRow> {
        match statement {
            Statement::Income => &mut self.income,
            Statement::Balance => &mut self.balance,
            Statement::CashFlow => &mut self.cash_flow,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.income.is_empty() && self.balance.is_empty() && self.cash_flow.is_empty()
    }

    /// Number of periods in the longest table.
    pub fn period_count(&self) -> usize {
        self.income
            .len()
            .max(self.balance.len())
            .max(self.cash_flow.len())
    }

    /// Short content hash: first 16 hex chars of SHA-256 over the canonical
    /// JSON encoding. Equal sets always hash equal.
    pub fn content_hash(&self) -> FinStatResult<String> {
        let encoded = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&encoded);
        let digest = hex::encode(hasher.finalize());
        Ok(digest[..16].to_string())
    }

    /// Drop trailing rows without figures, so a missing prior period reads as
    /// absent rather than as zeros.
    fn prune(&mut self) {
        for statement in Statement::ALL {
            let table = self.table_mut(statement);
            while table.last().is_some_and(|row| !has_figures(row)) {
                table.pop();
            }
        }
    }
}

fn has_figures(row: &PeriodRow) -> bool {
    row.keys().any(|k| !PERIOD_KEYS.contains(&k.as_str()))
}

/// Period label carried by a row, if any.
pub fn row_period<S: FieldSource + ?Sized>(row: &S) -> Option<String> {
    PERIOD_KEYS.iter().find_map(|k| match row.field(k)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Sortable date for a period label: full dates, compact dates or bare years
/// (read as 31 December).
pub fn period_sort_key(label: &str) -> Option<NaiveDate> {
    let label = label.trim();
    let date_part = label.get(..10).unwrap_or(label);
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(date_part, fmt) {
            return Some(d);
        }
    }
    if label.len() == 8 && label.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(d) = NaiveDate::parse_from_str(label, "%Y%m%d") {
            return Some(d);
        }
    }
    let year_part = label.get(..4)?;
    if year_part.chars().all(|c| c.is_ascii_digit()) {
        let year: i32 = year_part.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 12, 31);
    }
    None
}

// ---------------------------------------------------------------------------
// Period assembly
// ---------------------------------------------------------------------------

/// Figures for one period, before unit scaling.
#[derive(Debug, Default)]
struct PeriodRows {
    label: Option<String>,
    figures: BTreeMap<CanonicalField, Decimal>,
}

impl PeriodRows {
    /// First value for a field wins.
    fn insert(&mut self, field: CanonicalField, value: Decimal) {
        self.figures.entry(field).or_insert(value);
    }

    /// Fill fields this period does not have yet.
    fn merge(&mut self, other: PeriodRows) {
        for (field, value) in other.figures {
            self.insert(field, value);
        }
    }
}

/// Scale each field by one factor chosen over all of its periods.
fn apply_unit(periods: &mut [PeriodRows], unit: UnitHint) {
    for field in CanonicalField::ALL {
        let figures = periods.iter().filter_map(|p| p.figures.get(&field).copied());
        let factor = unit.scale_factor(figures);
        if factor == Decimal::ONE {
            continue;
        }
        for value in periods.iter_mut().filter_map(|p| p.figures.get_mut(&field)) {
            *value = value.checked_mul(factor).unwrap_or(*value);
        }
    }
}

fn assemble(mut periods: Vec<PeriodRows>, unit: UnitHint) -> CanonicalStatementSet {
    apply_unit(&mut periods, unit);

    let mut set = CanonicalStatementSet::default();
    for period in periods {
        let mut rows: BTreeMap<Statement, PeriodRow> = BTreeMap::new();
        for (field, value) in period.figures {
            let json = decimal_to_json(value);
            let row = rows.entry(field.statement()).or_default();
            row.insert(field.id().to_string(), json.clone());
            row.insert(field.locale_alias().to_string(), json);
        }
        for statement in Statement::ALL {
            let mut row = rows.remove(&statement).unwrap_or_default();
            if let Some(label) = period.label.as_ref().filter(|_| !row.is_empty()) {
                row.insert(PERIOD_LABEL_KEY.to_string(), Value::String(label.clone()));
            }
            set.table_mut(statement).push(row);
        }
    }
    set.prune();
    set
}

fn decimal_to_json(value: Decimal) -> Value {
    if value.fract().is_zero() {
        if let Some(i) = value.to_i64() {
            return Value::from(i);
        }
    }
    value
        .to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Map raw metric keys to canonical fields. Keys for period offsets beyond
/// `max_offset` are ignored.
fn place_metrics<S: FieldSource + ?Sized>(
    metrics: &S,
    max_offset: usize,
    periods: &mut Vec<PeriodRows>,
    warnings: &mut Vec<String>,
) {
    for key in metrics.field_names() {
        let Some((field, offset)) = resolve_flat_key(key) else {
            continue;
        };
        if offset > max_offset {
            continue;
        }
        let Some(raw) = metrics.field(key) else {
            continue;
        };
        let Some(value) = sanitize_value(raw) else {
            warnings.push(format!("Skipped non-numeric value for '{key}'"));
            continue;
        };
        while periods.len() <= offset {
            periods.push(PeriodRows::default());
        }
        periods[offset].insert(field, value);
    }
}

// ---------------------------------------------------------------------------
// Canonicalization
// ---------------------------------------------------------------------------

/// Canonicalize a classified payload. Multi-company input yields the first
/// subject; use [`canonicalize_subject`] for the others.
pub fn canonicalize(
    shape: &RawFinancialInputShape,
    unit: UnitHint,
    warnings: &mut Vec<String>,
) -> FinStatResult<CanonicalStatementSet> {
    let set = match shape {
        RawFinancialInputShape::NestedStatements { containers, .. } => {
            from_containers(containers, unit, warnings)?
        }
        RawFinancialInputShape::FlatMetrics { metrics, .. } => from_flat(metrics, unit, warnings),
        RawFinancialInputShape::MultiCompanyMultiYear { subjects } => match subjects.first() {
            Some(first) => canonicalize_subject(first, unit, warnings),
            None => CanonicalStatementSet::default(),
        },
        RawFinancialInputShape::HistoricalSeries { series, containers } => {
            from_history(series, containers, unit, warnings)?
        }
        RawFinancialInputShape::Unrecognized { reason } => {
            return Err(FinStatError::UnsupportedFormat(reason.clone()));
        }
    };

    if set.is_empty() {
        return Err(FinStatError::EmptyInput(
            "no numeric financial figures could be extracted".into(),
        ));
    }
    debug!(
        income = set.income.len(),
        balance = set.balance.len(),
        cash_flow = set.cash_flow.len(),
        "canonicalized statements"
    );
    Ok(set)
}

/// Canonicalize one subject's year-keyed series.
pub fn canonicalize_subject(
    series: &SubjectSeries,
    unit: UnitHint,
    warnings: &mut Vec<String>,
) -> CanonicalStatementSet {
    assemble(series_periods(&series.periods, warnings), unit)
}

fn from_flat(
    metrics: &Map<String, Value>,
    unit: UnitHint,
    warnings: &mut Vec<String>,
) -> CanonicalStatementSet {
    let mut periods = Vec::new();
    place_metrics(metrics, 1, &mut periods, warnings);

    let current = row_period(metrics);
    if let Some(first) = periods.first_mut() {
        first.label = current.clone();
    }
    if let (Some(prev), Some(year)) = (periods.get_mut(1), current.as_deref()) {
        prev.label = previous_year_label(year);
    }
    assemble(periods, unit)
}

fn previous_year_label(label: &str) -> Option<String> {
    let year: i32 = label.trim().parse().ok()?;
    (1000..=9999).contains(&year).then(|| (year - 1).to_string())
}

/// Periods sorted most recent first; unparseable labels keep their order at
/// the end.
fn series_periods(periods: &[SeriesPeriod], warnings: &mut Vec<String>) -> Vec<PeriodRows> {
    let mut ordered: Vec<&SeriesPeriod> = periods.iter().collect();
    ordered.sort_by_key(|p| Reverse(period_sort_key(&p.period)));

    ordered
        .into_iter()
        .map(|p| {
            let mut slot = Vec::with_capacity(1);
            place_metrics(&p.metrics, 0, &mut slot, warnings);
            let mut rows = slot.pop().unwrap_or_default();
            rows.label = Some(p.period.clone());
            rows
        })
        .collect()
}

fn from_history(
    series: &SubjectSeries,
    containers: &StatementContainers,
    unit: UnitHint,
    warnings: &mut Vec<String>,
) -> FinStatResult<CanonicalStatementSet> {
    let mut periods = series_periods(&series.periods, warnings);

    let mut companion = PeriodRows::default();
    for statement in Statement::ALL {
        let Some(row) = containers.get(statement).and_then(first_row) else {
            continue;
        };
        if companion.label.is_none() {
            companion.label = row_period(row);
        }
        let mut slot = Vec::with_capacity(1);
        place_metrics(row, 0, &mut slot, warnings);
        if let Some(rows) = slot.pop() {
            companion.merge(rows);
        }
    }

    let matching = match companion.label.as_deref() {
        Some(label) => periods
            .iter()
            .position(|p| p.label.as_deref() == Some(label)),
        None => (!periods.is_empty()).then_some(0),
    };
    match matching {
        Some(idx) => periods[idx].merge(companion),
        None => {
            if companion.label.is_none() {
                companion.label = Some("current".to_string());
            }
            periods.insert(0, companion);
        }
    }

    let set = assemble(periods, unit);
    if set.is_empty() {
        return Err(FinStatError::Structure(format!(
            "history for '{}' holds no recognized figures in any period",
            series.subject
        )));
    }
    Ok(set)
}

fn first_row(container: &Value) -> Option<&Map<String, Value>> {
    match container {
        Value::Object(m) => Some(m),
        Value::Array(items) => items.iter().find_map(Value::as_object),
        _ => None,
    }
}

fn from_containers(
    containers: &StatementContainers,
    unit: UnitHint,
    warnings: &mut Vec<String>,
) -> FinStatResult<CanonicalStatementSet> {
    let mut set = CanonicalStatementSet::default();
    for statement in Statement::ALL {
        let Some(container) = containers.get(statement) else {
            continue;
        };
        let items: Vec<&Value> = match container {
            Value::Array(items) => items.iter().collect(),
            single => vec![single],
        };
        let mut rows: Vec<PeriodRow> = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            match item {
                Value::Object(m) => rows.push(to_row(m)),
                _ => warnings.push(format!(
                    "Skipped non-object entry {i} in {} statement",
                    statement.as_str()
                )),
            }
        }

        let keys: Vec<Option<NaiveDate>> = rows
            .iter()
            .map(|r| row_period(r).as_deref().and_then(period_sort_key))
            .collect();
        if keys.iter().all(Option::is_some) {
            rows.sort_by_key(|r| Reverse(row_period(r).as_deref().and_then(period_sort_key)));
        }

        if unit != UnitHint::Auto {
            for row in &mut rows {
                rescale_row(row, unit);
            }
        }
        *set.table_mut(statement) = rows;
    }

    if set.is_empty() {
        return Err(FinStatError::Structure(
            "statement containers hold no period rows".into(),
        ));
    }
    Ok(set)
}

fn to_row(map: &Map<String, Value>) -> PeriodRow {
    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

/// Apply an explicit unit to every value whose key names a canonical field.
fn rescale_row(row: &mut PeriodRow, unit: UnitHint) {
    for (key, value) in row.iter_mut() {
        if CanonicalField::from_synonym(key).is_none() {
            continue;
        }
        if let Some(d) = sanitize_value(value) {
            *value = decimal_to_json(unit.to_base_units(d));
        }
    }
}
