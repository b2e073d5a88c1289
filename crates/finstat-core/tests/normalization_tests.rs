use finstat_core::normalize::{
    canonicalize, classify, extract_value, resolve_field, sanitize_value, CanonicalField,
    InputShape, MatchKind, RawFinancialInputShape,
};
use finstat_core::{ErrorCode, FinStatError, UnitHint};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Map, Value};

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(m) => m,
        other => panic!("expected object, got {other}"),
    }
}

// ===========================================================================
// Shape detection
// ===========================================================================

#[test]
fn test_classify_each_shape() {
    let cases = [
        (json!({"income": {"revenue": 1}}), InputShape::NestedStatements),
        (json!({"利润表": [{"营业收入": 1}]}), InputShape::NestedStatements),
        (json!({"revenue": 1, "net_profit": 2}), InputShape::FlatMetrics),
        (
            json!({"Acme": {"2023": {"revenue": 1}, "2024": {"revenue": 2}}}),
            InputShape::MultiCompanyMultiYear,
        ),
        (
            json!({"historical_data": {"years": [2022, 2023], "revenue": [1, 2]}}),
            InputShape::HistoricalSeries,
        ),
        (json!({"years": ["2022", "2023"], "revenue": [1, 2]}), InputShape::HistoricalSeries),
        (json!(["revenue", "profit"]), InputShape::Unrecognized),
        (json!({"foo": 1, "bar": 2}), InputShape::Unrecognized),
    ];
    for (input, expected) in cases {
        assert_eq!(classify(&input).kind(), expected, "input: {input}");
    }
}

#[test]
fn test_historical_wins_over_nested() {
    let input = json!({
        "income": {"revenue": 5},
        "historical_data": {"2023": {"revenue": 3}, "2024": {"revenue": 4}}
    });
    assert_eq!(classify(&input).kind(), InputShape::HistoricalSeries);
}

#[test]
fn test_unrecognized_canonicalizes_to_unsupported_format() {
    let mut warnings = Vec::new();
    let err = canonicalize(&classify(&json!([1, 2])), UnitHint::Auto, &mut warnings).unwrap_err();
    assert!(matches!(err, FinStatError::UnsupportedFormat(_)));
    assert_eq!(err.code(), ErrorCode::UnsupportedFormat);
}

#[test]
fn test_scalar_container_is_not_nested() {
    // a container holding a scalar is not a statement container
    let shape = classify(&json!({"income": 42}));
    assert!(!matches!(shape, RawFinancialInputShape::NestedStatements { .. }));
}

// ===========================================================================
// Canonicalization
// ===========================================================================

#[test]
fn test_flat_writes_id_and_locale_alias() {
    let mut warnings = Vec::new();
    let set = canonicalize(
        &classify(&json!({"revenue": 10, "total_assets": 20})),
        UnitHint::Yuan,
        &mut warnings,
    )
    .unwrap();
    let income = &set.income[0];
    assert_eq!(income["REVENUE"], json!(10));
    assert_eq!(income["营业收入"], json!(10));
    assert_eq!(set.balance[0]["TOTAL_ASSETS"], json!(20));
    assert!(set.cash_flow.is_empty());
}

#[test]
fn test_flat_auto_unit_scales_small_values() {
    let mut warnings = Vec::new();
    let set = canonicalize(&classify(&json!({"revenue": 5.5})), UnitHint::Auto, &mut warnings).unwrap();
    assert_eq!(set.income[0]["REVENUE"], json!(550_000_000));

    let set = canonicalize(
        &classify(&json!({"revenue": 5_000_000_000_i64})),
        UnitHint::Auto,
        &mut warnings,
    )
    .unwrap();
    assert_eq!(set.income[0]["REVENUE"], json!(5_000_000_000_i64));
}

#[test]
fn test_flat_previous_fields_fill_row_one() {
    let mut warnings = Vec::new();
    let set = canonicalize(
        &classify(&json!({"revenue": 12, "previous_revenue": 10})),
        UnitHint::Yuan,
        &mut warnings,
    )
    .unwrap();
    assert_eq!(set.income.len(), 2);
    assert_eq!(set.income[1]["REVENUE"], json!(10));
}

#[test]
fn test_flat_non_numeric_value_warns() {
    let mut warnings = Vec::new();
    let set = canonicalize(
        &classify(&json!({"revenue": "n/a", "net_profit": 3})),
        UnitHint::Yuan,
        &mut warnings,
    )
    .unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("revenue"));
    assert_eq!(set.income[0]["NET_PROFIT"], json!(3));
}

#[test]
fn test_nested_rows_sorted_by_report_date() {
    let mut warnings = Vec::new();
    let set = canonicalize(
        &classify(&json!({
            "income": [
                {"REPORT_DATE": "2023-12-31", "revenue": 80},
                {"REPORT_DATE": "2024-12-31", "revenue": 100}
            ]
        })),
        UnitHint::Auto,
        &mut warnings,
    )
    .unwrap();
    assert_eq!(set.income[0]["revenue"], json!(100));
    assert_eq!(set.income[1]["revenue"], json!(80));
}

#[test]
fn test_content_hash_is_stable_and_short() {
    let mut warnings = Vec::new();
    let input = json!({"revenue": 10, "net_profit": 1});
    let a = canonicalize(&classify(&input), UnitHint::Auto, &mut warnings).unwrap();
    let b = canonicalize(&classify(&input), UnitHint::Auto, &mut warnings).unwrap();
    let ha = a.content_hash().unwrap();
    assert_eq!(ha.len(), 16);
    assert_eq!(ha, b.content_hash().unwrap());

    let c = canonicalize(&classify(&json!({"revenue": 11})), UnitHint::Auto, &mut warnings).unwrap();
    assert_ne!(ha, c.content_hash().unwrap());
}

// ===========================================================================
// Value extraction
// ===========================================================================

#[test]
fn test_exact_match_honours_candidate_order() {
    let row = object(json!({"营业收入": 5, "REVENUE": 7}));
    let m = resolve_field(&row, CanonicalField::Revenue.synonyms()).unwrap();
    assert_eq!(m.kind, MatchKind::Exact);
    assert_eq!(m.key, "REVENUE");
    assert_eq!(m.value, dec!(7));
}

#[test]
fn test_substring_match() {
    let row = object(json!({"净利润(元)": 42}));
    let m = resolve_field(&row, CanonicalField::NetProfit.synonyms()).unwrap();
    assert_eq!(m.kind, MatchKind::Substring);
    assert_eq!(m.value, dec!(42));
}

#[test]
fn test_missing_field_extracts_zero() {
    let row = object(json!({"unrelated": 1}));
    assert_eq!(extract_value(&row, CanonicalField::Inventory.synonyms()), Decimal::ZERO);
}

#[test]
fn test_sanitize_strings() {
    assert_eq!(sanitize_value(&json!("¥1,234.50")), Some(dec!(1234.50)));
    assert_eq!(sanitize_value(&json!("12%")), Some(dec!(12)));
    assert_eq!(sanitize_value(&json!(true)), None);
    assert_eq!(sanitize_value(&Value::Null), None);
    assert_eq!(sanitize_value(&json!("--")), None);
}
