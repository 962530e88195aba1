use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::filters::AggregationFilters;
use crate::kpi::status::{classify_snapshot, KpiHealth};
use crate::records::{
    normalize_collection, BillingRecord, DelinquencyRecord, InputShape, MovementRecord,
    Normalized, PaymentRecord,
};
use crate::sample::SamplePayload;
use crate::types::{percent_of, saturating_sum, with_metadata, ComputationOutput, Money, Percent};
use crate::KpiResult;

/// Fixed haircut applied to NOI yield for the risk-adjusted return.
pub const RISK_ADJUSTMENT_FACTOR: Decimal = dec!(0.8);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The KPI record consumed by the dashboard cards. Field names are the
/// compatibility contract with the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSnapshot {
    /// Sum of `total_billed`
    pub portfolio_value: Money,
    /// Sum of `total_open`
    pub total_receivables: Money,
    /// Sum of `total_paid`
    pub total_paid: Money,
    /// Sum of `delinquency_amount`
    pub total_default_amount: Money,
    /// Defaults as % of open receivables
    pub default_rate: Percent,
    /// Sum of positive `credit_amount`
    pub total_revenue: Money,
    /// Sum of positive `debit_amount`
    pub total_expenses: Money,
    /// Net operating income: revenue minus expenses
    pub noi: Money,
    /// NOI as % of revenue
    pub noi_yield: Percent,
    /// Billed tenants as % of all distinct tenants
    pub occupancy_rate: Percent,
    /// NOI yield scaled by [`RISK_ADJUSTMENT_FACTOR`]
    pub risk_adjusted_return: Percent,
    /// Distinct tenant ids across billing records
    pub total_tenants: usize,
    /// Distinct tenant ids with a positive billed amount
    pub billed_tenants: usize,
}

/// Raw input for a full dashboard aggregation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioInput {
    #[serde(default)]
    pub billing: Vec<Value>,
    #[serde(default)]
    pub delinquency: Vec<Value>,
    #[serde(default)]
    pub movements: Vec<Value>,
    #[serde(default)]
    pub payments: Vec<Value>,
    #[serde(default)]
    pub filters: AggregationFilters,
    #[serde(default)]
    pub config: AnalysisConfig,
}

/// Record counts after normalization and filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCounts {
    pub billing: usize,
    pub delinquency: usize,
    pub movements: usize,
    pub payments: usize,
    /// Collections that arrived with no rows at all, as opposed to rows
    /// that were filtered out or normalized from malformed input
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub empty_collections: Vec<String>,
}

/// Owner payments are fetched alongside the other tables but never enter the
/// KPI math; they are only counted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub count: usize,
    pub total_amount: Money,
}

/// Full output of a dashboard aggregation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioKpiOutput {
    pub kpis: KpiSnapshot,
    pub health: KpiHealth,
    pub payments: PaymentSummary,
    pub record_counts: RecordCounts,
    /// Illustrative chart data; not derived business logic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<SamplePayload>,
}

#[derive(Serialize)]
struct Assumptions<'a> {
    filters: &'a AggregationFilters,
    config: &'a AnalysisConfig,
    risk_adjustment_factor: Decimal,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Reduce normalized billing, delinquency and movement records into the
/// dashboard KPI snapshot.
///
/// Pure and total: empty inputs give an all-zero snapshot, every ratio with a
/// zero denominator is zero, and record order never changes the result.
pub fn compute_kpis(
    billing: &[BillingRecord],
    delinquency: &[DelinquencyRecord],
    movements: &[MovementRecord],
) -> KpiSnapshot {
    let portfolio_value = saturating_sum(billing.iter().map(|b| b.total_billed));
    let total_receivables = saturating_sum(billing.iter().map(|b| b.total_open));
    let total_paid = saturating_sum(billing.iter().map(|b| b.total_paid));
    let total_default_amount = saturating_sum(delinquency.iter().map(|d| d.delinquency_amount));

    let total_revenue = saturating_sum(
        movements
            .iter()
            .map(|m| m.credit_amount)
            .filter(|c| *c > Decimal::ZERO),
    );
    let total_expenses = saturating_sum(
        movements
            .iter()
            .map(|m| m.debit_amount)
            .filter(|d| *d > Decimal::ZERO),
    );
    let noi = total_revenue.saturating_sub(total_expenses);

    let (total_tenants, billed_tenants) = count_tenants(billing);

    let default_rate = percent_of(total_default_amount, total_receivables);
    let noi_yield = percent_of(noi, total_revenue);
    let occupancy_rate = percent_of(
        Decimal::from(billed_tenants as u64),
        Decimal::from(total_tenants as u64),
    );
    let risk_adjusted_return = noi_yield.saturating_mul(RISK_ADJUSTMENT_FACTOR);

    KpiSnapshot {
        portfolio_value,
        total_receivables,
        total_paid,
        total_default_amount,
        default_rate,
        total_revenue,
        total_expenses,
        noi,
        noi_yield,
        occupancy_rate,
        risk_adjusted_return,
        total_tenants,
        billed_tenants,
    }
}

/// Normalize, filter and aggregate the raw dashboard tables, then classify
/// the resulting KPIs.
pub fn aggregate_portfolio(
    input: &PortfolioInput,
) -> KpiResult<ComputationOutput<PortfolioKpiOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    // -- Validation ----------------------------------------------------------
    input.filters.validate()?;
    let mode = input.config.validation;

    // -- Normalization -------------------------------------------------------
    let empty_collections: Vec<String> = [
        ("billing", &input.billing),
        ("delinquency", &input.delinquency),
        ("movements", &input.movements),
        ("payments", &input.payments),
    ]
    .into_iter()
    .filter(|(_, rows)| InputShape::of(rows) == InputShape::Empty)
    .map(|(name, _)| name.to_string())
    .collect();

    let billing: Normalized<BillingRecord> =
        normalize_collection("billing", &input.billing, mode)?;
    let delinquency: Normalized<DelinquencyRecord> =
        normalize_collection("delinquency", &input.delinquency, mode)?;
    let movements: Normalized<MovementRecord> =
        normalize_collection("movements", &input.movements, mode)?;
    let payments: Normalized<PaymentRecord> =
        normalize_collection("payments", &input.payments, mode)?;

    for (name, skipped) in [
        ("billing", billing.non_object_rows),
        ("delinquency", delinquency.non_object_rows),
        ("movements", movements.non_object_rows),
        ("payments", payments.non_object_rows),
    ] {
        if skipped > 0 {
            warnings.push(format!(
                "{name}: {skipped} non-object row(s) treated as all-zero records"
            ));
        }
    }

    // -- Filtering -----------------------------------------------------------
    let mut billing = billing.records;
    let mut delinquency = delinquency.records;
    let mut movements = movements.records;
    let mut payments = payments.records;

    let filters = &input.filters;
    for (name, dropped) in [
        ("billing", filters.retain(&mut billing)),
        ("delinquency", filters.retain(&mut delinquency)),
        ("movements", filters.retain(&mut movements)),
        ("payments", filters.retain(&mut payments)),
    ] {
        if dropped > 0 {
            warnings.push(format!("{name}: {dropped} record(s) excluded by filters"));
        }
    }

    debug!(
        billing = billing.len(),
        delinquency = delinquency.len(),
        movements = movements.len(),
        payments = payments.len(),
        "aggregating portfolio KPIs"
    );

    // -- Aggregation ---------------------------------------------------------
    let kpis = compute_kpis(&billing, &delinquency, &movements);

    let negative_credits = movements
        .iter()
        .filter(|m| m.credit_amount < Decimal::ZERO)
        .count();
    if negative_credits > 0 {
        warnings.push(format!(
            "{negative_credits} movement(s) with a negative credit_amount excluded from revenue"
        ));
    }
    if kpis.total_receivables.is_zero() && !kpis.total_default_amount.is_zero() {
        warnings.push(
            "Delinquency recorded against zero open receivables; default rate reported as 0"
                .into(),
        );
    }

    let health = classify_snapshot(&kpis, &input.config);

    let payment_summary = PaymentSummary {
        count: payments.len(),
        total_amount: saturating_sum(payments.iter().map(|p| p.amount)),
    };

    let sample = input
        .config
        .include_sample_payload
        .then(|| SamplePayload::from_snapshot(&kpis));

    let output = PortfolioKpiOutput {
        kpis,
        health,
        payments: payment_summary,
        record_counts: RecordCounts {
            billing: billing.len(),
            delinquency: delinquency.len(),
            movements: movements.len(),
            payments: payments.len(),
            empty_collections,
        },
        sample,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = Assumptions {
        filters: &input.filters,
        config: &input.config,
        risk_adjustment_factor: RISK_ADJUSTMENT_FACTOR,
    };

    Ok(with_metadata(
        "Portfolio KPI aggregation (billing, delinquency, cash movements)",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Distinct tenants, and distinct tenants with at least one positive billing.
/// Rows without a tenant id share a single identity.
fn count_tenants(billing: &[BillingRecord]) -> (usize, usize) {
    let mut billed_by_tenant: HashMap<Option<&str>, bool> = HashMap::new();
    for record in billing {
        let billed = billed_by_tenant
            .entry(record.tenant_id.as_deref())
            .or_insert(false);
        *billed |= record.total_billed > Decimal::ZERO;
    }
    let billed = billed_by_tenant.values().filter(|b| **b).count();
    (billed_by_tenant.len(), billed)
}
