//! Typed record shapes for the four dashboard tables.
//!
//! Rows arrive from the backend as loosely-typed JSON objects. Each record
//! type is built from a row exactly once, here, with every numeric field
//! coalesced to zero when it is absent, null or not numeric. Downstream code
//! only ever sees total values.

use chrono::{DateTime, NaiveDate};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use tracing::warn;

use crate::error::KpiError;
use crate::types::Money;
use crate::KpiResult;

/// Tenant identity as stored in the billing table.
pub type TenantId = String;

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// One row of the billing table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BillingRecord {
    /// `None` when the row carries no tenant id; all such rows share one identity.
    pub tenant_id: Option<TenantId>,
    pub total_billed: Money,
    pub total_open: Money,
    pub total_paid: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_date: Option<NaiveDate>,
}

/// One row of the delinquency table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DelinquencyRecord {
    pub tenant_id: Option<TenantId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_name: Option<String>,
    pub delinquency_amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_date: Option<NaiveDate>,
}

/// One row of the financial movements table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MovementRecord {
    pub credit_amount: Money,
    pub debit_amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_date: Option<NaiveDate>,
}

/// One row of the owner payments table. Not part of the KPI math.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PaymentRecord {
    pub tenant_id: Option<TenantId>,
    pub amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_date: Option<NaiveDate>,
}

/// Build a typed record from a JSON object row. Never fails: unknown fields
/// are ignored and missing ones take their zero value.
pub trait FromRow: Sized + Default {
    fn from_row(row: &Map<String, Value>) -> Self;
}

impl FromRow for BillingRecord {
    fn from_row(row: &Map<String, Value>) -> Self {
        BillingRecord {
            tenant_id: tenant_field(row, "tenant_id"),
            total_billed: money_field(row, "total_billed"),
            total_open: money_field(row, "total_open"),
            total_paid: money_field(row, "total_paid"),
            reference_date: date_field(row),
        }
    }
}

impl FromRow for DelinquencyRecord {
    fn from_row(row: &Map<String, Value>) -> Self {
        DelinquencyRecord {
            tenant_id: tenant_field(row, "tenant_id"),
            tenant_name: row
                .get("tenant_name")
                .and_then(Value::as_str)
                .map(str::to_string),
            delinquency_amount: money_field(row, "delinquency_amount"),
            reference_date: date_field(row),
        }
    }
}

impl FromRow for MovementRecord {
    fn from_row(row: &Map<String, Value>) -> Self {
        MovementRecord {
            credit_amount: money_field(row, "credit_amount"),
            debit_amount: money_field(row, "debit_amount"),
            reference_date: date_field(row),
        }
    }
}

impl FromRow for PaymentRecord {
    fn from_row(row: &Map<String, Value>) -> Self {
        PaymentRecord {
            tenant_id: tenant_field(row, "tenant_id"),
            amount: money_field(row, "amount"),
            reference_date: date_field(row),
        }
    }
}

macro_rules! deserialize_from_row {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl<'de> Deserialize<'de> for $ty {
                fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                    match Value::deserialize(deserializer)? {
                        Value::Object(row) => Ok(<$ty>::from_row(&row)),
                        other => Err(D::Error::custom(format!(
                            "expected an object, found {}",
                            describe(&other)
                        ))),
                    }
                }
            }
        )+
    };
}

deserialize_from_row!(BillingRecord, DelinquencyRecord, MovementRecord, PaymentRecord);

// ---------------------------------------------------------------------------
// Collection normalization
// ---------------------------------------------------------------------------

/// How strictly a raw collection is checked while it is normalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Non-object rows become all-zero records.
    #[default]
    Lenient,
    /// Non-object rows reject the whole collection.
    Strict,
}

/// Shape of a raw collection before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    Empty,
    Records(usize),
}

impl InputShape {
    pub fn of(rows: &[Value]) -> Self {
        if rows.is_empty() {
            InputShape::Empty
        } else {
            InputShape::Records(rows.len())
        }
    }
}

/// A normalized collection plus the number of rows that were not objects.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<R> {
    pub records: Vec<R>,
    pub non_object_rows: usize,
}

/// Normalize every row of a raw collection into `R`.
///
/// An empty collection is valid in both modes.
pub fn normalize_collection<R: FromRow>(
    collection: &str,
    rows: &[Value],
    mode: ValidationMode,
) -> KpiResult<Normalized<R>> {
    let mut records = Vec::with_capacity(rows.len());
    let mut non_object_rows = 0usize;

    for (index, row) in rows.iter().enumerate() {
        match row {
            Value::Object(map) => records.push(R::from_row(map)),
            other => match mode {
                ValidationMode::Strict => {
                    warn!(collection, index, "rejecting non-object row");
                    return Err(KpiError::MalformedCollection {
                        collection: collection.to_string(),
                        index,
                        reason: format!("expected an object, found {}", describe(other)),
                    });
                }
                ValidationMode::Lenient => {
                    non_object_rows += 1;
                    records.push(R::default());
                }
            },
        }
    }

    Ok(Normalized {
        records,
        non_object_rows,
    })
}

// ---------------------------------------------------------------------------
// Field coercion
// ---------------------------------------------------------------------------

/// Coerce a JSON value into money. Numbers and numeric strings are taken
/// exactly, clamped to the Decimal range; everything else is zero.
pub fn coerce_decimal(value: &Value) -> Money {
    match value {
        Value::Number(n) => parse_decimal_text(&n.to_string()),
        Value::String(s) => parse_decimal_text(s.trim()),
        _ => Decimal::ZERO,
    }
}

/// Coerce a JSON value into a tenant id. Numeric ids keep their text form.
pub fn coerce_tenant(value: &Value) -> Option<TenantId> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse `YYYY-MM-DD`, an RFC 3339 timestamp, or a timestamp whose first ten
/// characters are a date.
pub fn parse_reference_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .or_else(|| {
            text.get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        })
}

/// Numbers beyond the Decimal range clamp to `Decimal::MAX`/`Decimal::MIN`.
/// `NaN`, `inf` and other non-numeric text is zero.
fn parse_decimal_text(text: &str) -> Money {
    if let Ok(d) = Decimal::from_str(text).or_else(|_| Decimal::from_scientific(text)) {
        return d;
    }
    let Ok(f) = text.parse::<f64>() else {
        return Decimal::ZERO;
    };
    let has_digits = text.bytes().any(|b| b.is_ascii_digit());
    if f.is_nan() || !has_digits {
        return Decimal::ZERO;
    }
    if f.abs() >= 1.0 {
        if f.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        }
    } else {
        Decimal::from_f64(f).unwrap_or(Decimal::ZERO)
    }
}

fn money_field(row: &Map<String, Value>, key: &str) -> Money {
    row.get(key).map(coerce_decimal).unwrap_or(Decimal::ZERO)
}

fn tenant_field(row: &Map<String, Value>, key: &str) -> Option<TenantId> {
    row.get(key).and_then(coerce_tenant)
}

fn date_field(row: &Map<String, Value>) -> Option<NaiveDate> {
    ["reference_date", "date"]
        .iter()
        .filter_map(|key| row.get(*key).and_then(Value::as_str))
        .find_map(parse_reference_date)
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_billing_from_full_row() {
        let rec: BillingRecord = serde_json::from_value(json!({
            "tenant_id": "A",
            "total_billed": 1000,
            "total_open": 200.5,
            "total_paid": "799.50",
            "reference_date": "2025-05-01",
            "unit": "L-12"
        }))
        .unwrap();
        assert_eq!(
            rec,
            BillingRecord {
                tenant_id: Some("A".into()),
                total_billed: dec!(1000),
                total_open: dec!(200.5),
                total_paid: dec!(799.50),
                reference_date: NaiveDate::from_ymd_opt(2025, 5, 1),
            }
        );
    }

    #[test]
    fn test_missing_and_null_fields_are_zero() {
        let rec: BillingRecord =
            serde_json::from_value(json!({"tenant_id": null, "total_open": null})).unwrap();
        assert_eq!(rec, BillingRecord::default());
    }

    #[test]
    fn test_non_numeric_values_are_zero() {
        for raw in [json!("abc"), json!(true), json!([1]), json!({"v": 1}), json!("")] {
            assert_eq!(coerce_decimal(&raw), Decimal::ZERO, "value {raw}");
        }
    }

    #[test]
    fn test_numeric_strings_and_scientific() {
        assert_eq!(coerce_decimal(&json!(" 42.10 ")), dec!(42.10));
        assert_eq!(coerce_decimal(&json!("1.5e3")), dec!(1500));
        assert_eq!(coerce_decimal(&json!(-100)), dec!(-100));
        assert_eq!(coerce_decimal(&json!(0.1)), dec!(0.1));
    }

    #[test]
    fn test_out_of_range_numbers_clamp() {
        assert_eq!(coerce_decimal(&json!(1e300)), Decimal::MAX);
        assert_eq!(coerce_decimal(&json!(-1e300)), Decimal::MIN);
        assert_eq!(coerce_decimal(&json!("8e28")), Decimal::MAX);
        assert_eq!(coerce_decimal(&json!("NaN")), Decimal::ZERO);
        assert_eq!(coerce_decimal(&json!("inf")), Decimal::ZERO);
        assert_eq!(coerce_decimal(&json!("-1e400")), Decimal::MIN);
        // a larger input never yields a smaller value
        assert!(coerce_decimal(&json!(1e300)) >= coerce_decimal(&json!(1e20)));
    }

    #[test]
    fn test_numeric_tenant_id_keeps_text() {
        assert_eq!(coerce_tenant(&json!(17)), Some("17".to_string()));
        assert_eq!(coerce_tenant(&json!(false)), None);
    }

    #[test]
    fn test_date_formats() {
        let may = NaiveDate::from_ymd_opt(2025, 5, 31);
        assert_eq!(parse_reference_date("2025-05-31"), may);
        assert_eq!(parse_reference_date("2025-05-31T23:10:00-03:00"), may);
        assert_eq!(parse_reference_date("2025-05-31 10:00:00"), may);
        assert_eq!(parse_reference_date("31/05/2025"), None);
    }

    #[test]
    fn test_date_alias() {
        let rec: MovementRecord =
            serde_json::from_value(json!({"credit_amount": 1, "date": "2025-06-15"})).unwrap();
        assert_eq!(rec.reference_date, NaiveDate::from_ymd_opt(2025, 6, 15));
    }

    #[test]
    fn test_non_object_row_fails_deserialize() {
        let err = serde_json::from_value::<MovementRecord>(json!(12)).unwrap_err();
        assert!(err.to_string().contains("expected an object, found a number"));
    }

    #[test]
    fn test_lenient_normalization_zeroes_bad_rows() {
        let rows = vec![json!({"credit_amount": 10}), json!("oops"), json!(null)];
        let out: Normalized<MovementRecord> =
            normalize_collection("movements", &rows, ValidationMode::Lenient).unwrap();
        assert_eq!(out.records.len(), 3);
        assert_eq!(out.non_object_rows, 2);
        assert_eq!(out.records[1], MovementRecord::default());
    }

    #[test]
    fn test_strict_normalization_rejects_bad_rows() {
        let rows = vec![json!({"credit_amount": 10}), json!([1, 2])];
        let err = normalize_collection::<MovementRecord>("movements", &rows, ValidationMode::Strict)
            .unwrap_err();
        match err {
            KpiError::MalformedCollection {
                collection, index, ..
            } => {
                assert_eq!(collection, "movements");
                assert_eq!(index, 1);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_empty_collection_is_not_an_error() {
        let rows: Vec<Value> = vec![];
        assert_eq!(InputShape::of(&rows), InputShape::Empty);
        let out =
            normalize_collection::<BillingRecord>("billing", &rows, ValidationMode::Strict).unwrap();
        assert!(out.records.is_empty());
    }
}
