use portfolio_kpi_core::kpi::aggregator::{aggregate_portfolio, compute_kpis, PortfolioInput};
use portfolio_kpi_core::records::{
    normalize_collection, BillingRecord, DelinquencyRecord, MovementRecord, ValidationMode,
};
use portfolio_kpi_core::KpiError;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

// ===========================================================================
// KPI aggregation contract, exercised through the raw-row boundary the
// dashboard uses.
// ===========================================================================

fn reference_billing() -> Vec<Value> {
    vec![
        json!({"tenant_id": "A", "total_billed": 1000, "total_open": 200, "total_paid": 800}),
        json!({"tenant_id": "B", "total_billed": 0, "total_open": 0, "total_paid": 0}),
    ]
}

fn reference_delinquency() -> Vec<Value> {
    vec![json!({"delinquency_amount": 50})]
}

fn reference_movements() -> Vec<Value> {
    vec![
        json!({"credit_amount": 500, "debit_amount": 300}),
        json!({"credit_amount": -100, "debit_amount": 0}),
    ]
}

fn normalize<R: portfolio_kpi_core::records::FromRow>(name: &str, rows: &[Value]) -> Vec<R> {
    normalize_collection::<R>(name, rows, ValidationMode::Lenient)
        .unwrap()
        .records
}

// ---------------------------------------------------------------------------
// Concrete scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_reference_scenario_from_rows() {
    let billing: Vec<BillingRecord> = normalize("billing", &reference_billing());
    let delinquency: Vec<DelinquencyRecord> = normalize("delinquency", &reference_delinquency());
    let movements: Vec<MovementRecord> = normalize("movements", &reference_movements());

    let k = compute_kpis(&billing, &delinquency, &movements);
    assert_eq!(k.portfolio_value, dec!(1000));
    assert_eq!(k.total_receivables, dec!(200));
    assert_eq!(k.default_rate, dec!(25));
    assert_eq!(k.total_revenue, dec!(500));
    assert_eq!(k.total_expenses, dec!(300));
    assert_eq!(k.noi, dec!(200));
    assert_eq!(k.noi_yield, dec!(40));
    assert_eq!(k.occupancy_rate, dec!(50));
    assert_eq!(k.risk_adjusted_return, dec!(32));
}

#[test]
fn test_all_inputs_empty() {
    let out = aggregate_portfolio(&PortfolioInput::default()).unwrap();
    let k = &out.result.kpis;
    assert_eq!(k.portfolio_value, Decimal::ZERO);
    assert_eq!(k.default_rate, Decimal::ZERO);
    assert_eq!(k.noi_yield, Decimal::ZERO);
    assert_eq!(k.occupancy_rate, Decimal::ZERO);
    assert_eq!(k.risk_adjusted_return, Decimal::ZERO);
    assert_eq!(out.result.payments.count, 0);
    assert!(out.warnings.is_empty());
}

#[test]
fn test_negative_credit_contributes_nothing() {
    let movements: Vec<MovementRecord> = normalize("movements", &reference_movements());
    let k = compute_kpis(&[], &[], &movements);
    assert_eq!(k.total_revenue, dec!(500));
    let only_negative = compute_kpis(&[], &[], &movements[1..]);
    assert_eq!(only_negative.total_revenue, Decimal::ZERO);
}

#[test]
fn test_shared_tenant_counted_once() {
    let rows = vec![
        json!({"tenant_id": "A", "total_billed": 10}),
        json!({"tenant_id": "A", "total_billed": 20}),
        json!({"tenant_id": "B", "total_billed": 0}),
        json!({"tenant_id": "B", "total_billed": 0}),
    ];
    let billing: Vec<BillingRecord> = normalize("billing", &rows);
    let k = compute_kpis(&billing, &[], &[]);
    assert_eq!(k.total_tenants, 2);
    assert_eq!(k.billed_tenants, 1);
    assert_eq!(k.occupancy_rate, dec!(50));
}

#[test]
fn test_malformed_fields_degrade_to_zero() {
    let rows = vec![
        json!({"tenant_id": "A", "total_billed": "n/a", "total_open": null, "extra": [1, 2]}),
        json!({"tenant_id": "B", "total_billed": "250.75", "total_open": {"nested": 1}}),
    ];
    let billing: Vec<BillingRecord> = normalize("billing", &rows);
    let k = compute_kpis(&billing, &[], &[]);
    assert_eq!(k.portfolio_value, dec!(250.75));
    assert_eq!(k.total_receivables, Decimal::ZERO);
    assert_eq!(k.default_rate, Decimal::ZERO);
}

#[test]
fn test_repeated_calls_are_identical() {
    let input: PortfolioInput = serde_json::from_value(json!({
        "billing": reference_billing(),
        "delinquency": reference_delinquency(),
        "movements": reference_movements(),
    }))
    .unwrap();
    let first = aggregate_portfolio(&input).unwrap().result;
    let second = aggregate_portfolio(&input).unwrap().result;
    assert_eq!(first.kpis, second.kpis);
    assert_eq!(first.health, second.health);
}

#[test]
fn test_record_order_irrelevant_at_decimal_bound() {
    let bill = |amount: Decimal| BillingRecord {
        tenant_id: Some("A".into()),
        total_billed: amount,
        total_open: amount,
        ..Default::default()
    };
    let forward = vec![bill(Decimal::MAX), bill(Decimal::MAX), bill(Decimal::MIN)];
    let interleaved = vec![bill(Decimal::MAX), bill(Decimal::MIN), bill(Decimal::MAX)];

    let a = compute_kpis(&forward, &[], &[]);
    let b = compute_kpis(&interleaved, &[], &[]);
    assert_eq!(a, b);
    assert_eq!(a.portfolio_value, Decimal::ZERO);
}

#[test]
fn test_huge_json_numbers_clamp_instead_of_vanishing() {
    let rows = vec![
        json!({"tenant_id": "A", "total_billed": 1e300}),
        json!({"tenant_id": "B", "total_billed": 5}),
    ];
    let billing: Vec<BillingRecord> = normalize("billing", &rows);
    let k = compute_kpis(&billing, &[], &[]);
    assert_eq!(k.portfolio_value, Decimal::MAX);
    assert_eq!(k.billed_tenants, 2);
}

// ---------------------------------------------------------------------------
// Validation modes
// ---------------------------------------------------------------------------

#[test]
fn test_strict_mode_distinguishes_empty_from_malformed() {
    let empty: PortfolioInput = serde_json::from_value(json!({
        "config": {"validation": "strict"}
    }))
    .unwrap();
    assert!(aggregate_portfolio(&empty).is_ok());

    let malformed: PortfolioInput = serde_json::from_value(json!({
        "movements": [{"credit_amount": 1}, "not a row"],
        "config": {"validation": "strict"}
    }))
    .unwrap();
    match aggregate_portfolio(&malformed) {
        Err(KpiError::MalformedCollection {
            collection, index, ..
        }) => {
            assert_eq!(collection, "movements");
            assert_eq!(index, 1);
        }
        other => panic!("expected MalformedCollection, got {other:?}"),
    }
}

#[test]
fn test_inverted_date_window_is_invalid_input() {
    let input: PortfolioInput = serde_json::from_value(json!({
        "filters": {"start_date": "2025-12-31", "end_date": "2025-01-01"}
    }))
    .unwrap();
    assert!(matches!(
        aggregate_portfolio(&input),
        Err(KpiError::InvalidInput { .. })
    ));
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

#[test]
fn test_tenant_filter_restricts_billing_and_delinquency() {
    let input: PortfolioInput = serde_json::from_value(json!({
        "billing": [
            {"tenant_id": "A", "total_billed": 1000, "total_open": 400},
            {"tenant_id": "B", "total_billed": 600, "total_open": 100}
        ],
        "delinquency": [
            {"tenant_id": "A", "delinquency_amount": 100},
            {"tenant_id": "B", "delinquency_amount": 100},
            {"delinquency_amount": 100}
        ],
        "movements": [{"credit_amount": 10}],
        "filters": {"tenant_ids": ["A"]}
    }))
    .unwrap();
    let out = aggregate_portfolio(&input).unwrap();
    let k = &out.result.kpis;
    assert_eq!(k.portfolio_value, dec!(1000));
    assert_eq!(k.total_default_amount, dec!(100));
    assert_eq!(k.default_rate, dec!(25));
    assert_eq!(k.total_revenue, dec!(10));
    assert_eq!(out.result.record_counts.delinquency, 1);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

fn cents() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        8 => (-10_000_000i64..10_000_000i64).prop_map(|c| Decimal::new(c, 2)),
        1 => Just(Decimal::MAX),
        1 => Just(Decimal::MIN),
    ]
}

fn billing_strategy() -> impl Strategy<Value = Vec<BillingRecord>> {
    prop::collection::vec(
        (prop::option::of(0u8..6), cents(), cents(), cents()),
        0..20,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .map(|(tenant, billed, open, paid)| BillingRecord {
                tenant_id: tenant.map(|t| format!("T{t}")),
                total_billed: billed,
                total_open: open,
                total_paid: paid,
                reference_date: None,
            })
            .collect()
    })
}

fn delinquency_strategy() -> impl Strategy<Value = Vec<DelinquencyRecord>> {
    prop::collection::vec(cents(), 0..20).prop_map(|amounts| {
        amounts
            .into_iter()
            .map(|a| DelinquencyRecord {
                delinquency_amount: a,
                ..Default::default()
            })
            .collect()
    })
}

fn movement_strategy() -> impl Strategy<Value = Vec<MovementRecord>> {
    prop::collection::vec((cents(), cents()), 0..20).prop_map(|rows| {
        rows.into_iter()
            .map(|(credit, debit)| MovementRecord {
                credit_amount: credit,
                debit_amount: debit,
                reference_date: None,
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_record_order_never_changes_the_snapshot(
        (billing, billing_shuffled) in billing_strategy()
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle())),
        (delinquency, delinquency_shuffled) in delinquency_strategy()
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle())),
        (movements, movements_shuffled) in movement_strategy()
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle())),
    ) {
        let original = compute_kpis(&billing, &delinquency, &movements);
        let permuted = compute_kpis(&billing_shuffled, &delinquency_shuffled, &movements_shuffled);
        prop_assert_eq!(original, permuted);
    }

    #[test]
    fn prop_ratios_are_zero_when_denominators_are_zero(
        delinquency in delinquency_strategy(),
    ) {
        let k = compute_kpis(&[], &delinquency, &[]);
        prop_assert_eq!(k.default_rate, Decimal::ZERO);
        prop_assert_eq!(k.noi_yield, Decimal::ZERO);
        prop_assert_eq!(k.occupancy_rate, Decimal::ZERO);
    }

    #[test]
    fn prop_arbitrary_rows_never_fail_in_lenient_mode(
        rows in prop::collection::vec(
            prop_oneof![
                Just(Value::Null),
                any::<bool>().prop_map(Value::Bool),
                any::<i64>().prop_map(|n| json!(n)),
                "[a-z0-9.]{0,8}".prop_map(Value::String),
                (any::<i32>(), "[a-z]{0,4}").prop_map(|(n, s)| json!({
                    "tenant_id": s,
                    "total_billed": n,
                    "total_open": n.to_string(),
                    "credit_amount": n,
                    "debit_amount": -n,
                    "delinquency_amount": n
                })),
            ],
            0..30,
        )
    ) {
        let input = PortfolioInput {
            billing: rows.clone(),
            delinquency: rows.clone(),
            movements: rows.clone(),
            payments: rows,
            ..Default::default()
        };
        let out = aggregate_portfolio(&input);
        prop_assert!(out.is_ok());
        let k = out.unwrap().result.kpis;
        prop_assert!(k.occupancy_rate >= Decimal::ZERO && k.occupancy_rate <= dec!(100));
    }
}
