//! Fuzzy field resolution and numeric value sanitization.
//!
//! Resolution runs in three stages, stopping at the first usable value:
//! 1. **Exact** -- each candidate in priority order, expanded through a small
//!    alias table.
//! 2. **Substring** -- a row key contains the candidate or vice versa
//!    (case-insensitive).
//! 3. **Keyword overlap** -- at least half of the candidate's `_`/space
//!    separated tokens appear in the key.
//!
//! Keys that exactly name a different canonical field are never claimed by
//! the fuzzy stages.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::fields::CanonicalField;

/// Magnitude above which a figure is treated as implausible.
const MAX_PLAUSIBLE_MAGNITUDE: Decimal = dec!(1_000_000_000_000_000);

/// Missing-field warnings list at most this many available keys.
const MAX_KEYS_IN_WARNING: usize = 10;

/// Text tokens that mean "no value".
const NULL_TOKENS: &[&str] = &["", "na", "n/a", "nan", "null", "none", "-", "--"];

/// Characters stripped from numeric text before parsing.
const NOISE_CHARS: &[char] = &[',', '，', '%', '¥', '￥', '$', ' '];

/// Equivalent spellings tried right after a candidate in the exact stage.
const ALIAS_TABLE: &[(&str, &[&str])] = &[
    ("总资产", &["资产总计", "资产合计"]),
    ("资产总计", &["总资产", "资产合计"]),
    ("总负债", &["负债合计"]),
    ("负债合计", &["总负债"]),
    ("净资产", &["所有者权益合计", "股东权益合计"]),
    ("所有者权益合计", &["股东权益合计", "净资产"]),
    ("营业收入", &["营业总收入"]),
    ("净利润", &["归属于母公司所有者的净利润"]),
    ("revenue", &["total_revenue", "sales"]),
    ("net_profit", &["net_income"]),
    ("net_income", &["net_profit"]),
];

// ---------------------------------------------------------------------------
// Row access
// ---------------------------------------------------------------------------

/// A keyed record of raw values (one reporting period).
pub trait FieldSource {
    fn field(&self, key: &str) -> Option<&Value>;
    fn field_names(&self) -> Vec<&str>;
}

impl FieldSource for BTreeMap<String, Value> {
    fn field(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }

    fn field_names(&self) -> Vec<&str> {
        self.keys().map(String::as_str).collect()
    }
}

impl FieldSource for serde_json::Map<String, Value> {
    fn field(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }

    fn field_names(&self) -> Vec<&str> {
        self.keys().map(String::as_str).collect()
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Substring,
    TokenOverlap,
}

/// A resolved field: which raw key supplied the value and how it was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMatch {
    pub key: String,
    pub value: Decimal,
    pub kind: MatchKind,
    /// False when the value failed the plausibility check. The value is
    /// still returned.
    pub plausible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plausibility {
    Plausible,
    Implausible(&'static str),
}

// ---------------------------------------------------------------------------
// Sanitization
// ---------------------------------------------------------------------------

/// Convert a raw JSON value to a decimal, or `None` when it carries no number.
///
/// Accepts JSON numbers and numeric text with thousands separators, percent
/// and currency signs. Booleans, nulls, containers, non-finite numbers and
/// null tokens (`"N/A"`, `"-"`, ...) are rejected.
pub fn sanitize_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(Decimal::from(u))
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .and_then(Decimal::from_f64)
            }
        }
        Value::String(s) => parse_numeric_text(s),
        _ => None,
    }
}

fn parse_numeric_text(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !NOISE_CHARS.contains(c))
        .collect();
    if NULL_TOKENS.contains(&cleaned.to_lowercase().as_str()) {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

/// Flag values that are numerically valid but unlikely to be real figures.
pub fn check_plausibility(key: &str, value: Decimal) -> Plausibility {
    if value.abs() > MAX_PLAUSIBLE_MAGNITUDE {
        return Plausibility::Implausible("magnitude exceeds 1e15");
    }
    let lower = key.to_lowercase();
    if value.is_sign_negative() && !value.is_zero() {
        if lower.contains("revenue") || lower.contains("收入") {
            return Plausibility::Implausible("negative revenue");
        }
        if (lower.contains("asset") || lower.contains("资产")) && !lower.contains("减值") {
            return Plausibility::Implausible("negative assets");
        }
    }
    Plausibility::Plausible
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Find the first usable value among `candidates` in `row`.
pub fn resolve_field<S: FieldSource + ?Sized>(row: &S, candidates: &[&str]) -> Option<FieldMatch> {
    exact_stage(row, candidates)
        .or_else(|| substring_stage(row, candidates))
        .or_else(|| token_stage(row, candidates))
}

/// Resolve a field and fall back to zero when nothing matches.
pub fn extract_value<S: FieldSource + ?Sized>(row: &S, candidates: &[&str]) -> Decimal {
    match resolve_field(row, candidates) {
        Some(m) => m.value,
        None => {
            let names = row.field_names();
            let shown: Vec<&str> = names.iter().take(MAX_KEYS_IN_WARNING).copied().collect();
            warn!(
                candidates = ?candidates.iter().take(3).collect::<Vec<_>>(),
                available = ?shown,
                "field not found, using 0"
            );
            Decimal::ZERO
        }
    }
}

fn exact_stage<S: FieldSource + ?Sized>(row: &S, candidates: &[&str]) -> Option<FieldMatch> {
    for candidate in candidates {
        for name in std::iter::once(*candidate).chain(aliases_of(candidate).iter().copied()) {
            if let Some(raw) = row.field(name) {
                if let Some(m) = accept(name, raw, MatchKind::Exact) {
                    return Some(m);
                }
            }
        }
    }
    None
}

fn substring_stage<S: FieldSource + ?Sized>(row: &S, candidates: &[&str]) -> Option<FieldMatch> {
    let names = row.field_names();
    for candidate in candidates {
        let cand = candidate.to_lowercase();
        if cand.is_empty() {
            continue;
        }
        for key in &names {
            if claimed_by_other(key, candidates) {
                continue;
            }
            let lower = key.to_lowercase();
            let hit = lower.contains(&cand) || (lower.chars().count() >= 2 && cand.contains(&lower));
            if !hit {
                continue;
            }
            if let Some(m) = row
                .field(key)
                .and_then(|raw| accept(key, raw, MatchKind::Substring))
            {
                debug!(candidate = %candidate, key = %key, "substring match");
                return Some(m);
            }
        }
    }
    None
}

fn token_stage<S: FieldSource + ?Sized>(row: &S, candidates: &[&str]) -> Option<FieldMatch> {
    let names = row.field_names();
    for candidate in candidates {
        let cand_tokens = tokens(candidate);
        if cand_tokens.is_empty() {
            continue;
        }
        let needed = (cand_tokens.len() / 2).max(1);
        for key in &names {
            if claimed_by_other(key, candidates) {
                continue;
            }
            let key_tokens = tokens(key);
            let common = cand_tokens
                .iter()
                .filter(|t| key_tokens.contains(t))
                .count();
            if common < needed {
                continue;
            }
            if let Some(m) = row
                .field(key)
                .and_then(|raw| accept(key, raw, MatchKind::TokenOverlap))
            {
                debug!(candidate = %candidate, key = %key, common, "keyword match");
                return Some(m);
            }
        }
    }
    None
}

fn accept(key: &str, raw: &Value, kind: MatchKind) -> Option<FieldMatch> {
    let Some(value) = sanitize_value(raw) else {
        if !raw.is_null() {
            warn!(key = %key, raw = %raw, "value is not numeric, skipping");
        }
        return None;
    };
    let plausible = match check_plausibility(key, value) {
        Plausibility::Plausible => true,
        Plausibility::Implausible(reason) => {
            warn!(key = %key, value = %value, reason, "implausible value");
            false
        }
    };
    Some(FieldMatch {
        key: key.to_string(),
        value,
        kind,
        plausible,
    })
}

fn aliases_of(candidate: &str) -> &'static [&'static str] {
    ALIAS_TABLE
        .iter()
        .find(|(name, _)| *name == candidate)
        .map(|(_, aliases)| *aliases)
        .unwrap_or(&[])
}

/// True when `key` is an exact synonym of a field none of the candidates
/// belong to.
fn claimed_by_other(key: &str, candidates: &[&str]) -> bool {
    match CanonicalField::from_synonym(key) {
        Some(owner) => candidates
            .iter()
            .all(|c| CanonicalField::from_synonym(c) != Some(owner)),
        None => false,
    }
}

fn tokens(s: &str) -> Vec<String> {
    s.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}
