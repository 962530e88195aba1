use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::filters::AggregationFilters;
use crate::records::{normalize_collection, DelinquencyRecord, ValidationMode};
use crate::types::{percent_of, saturating_sum, with_metadata, ComputationOutput, Money, Percent};
use crate::KpiResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input for the concentration analysis when called with raw rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DelinquencyInput {
    #[serde(default)]
    pub delinquency: Vec<serde_json::Value>,
    #[serde(default)]
    pub filters: AggregationFilters,
    #[serde(default)]
    pub validation: ValidationMode,
}

/// One debtor in the ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtorRank {
    pub position: usize,
    /// `None` when the rows carried no tenant id
    pub tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_name: Option<String>,
    pub amount: Money,
    /// Share of all delinquency, in %, one decimal place
    pub share: Percent,
}

/// How concentrated delinquency is across tenants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DelinquencyConcentration {
    pub debtor_count: usize,
    pub total_amount: Money,
    pub ranking: Vec<DebtorRank>,
    /// Share held by the three largest debtors
    pub top3_share: Percent,
    /// Share held by the ten largest debtors
    pub top10_share: Percent,
    /// Share held by the largest 20% of debtors (at least one)
    pub pareto_share: Percent,
    /// 0 = evenly spread, approaching 1 = concentrated in one debtor
    pub gini_index: Decimal,
    pub average_debt: Money,
    pub largest_debt: Money,
    pub smallest_debt: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Rank debtors and measure how concentrated delinquency is.
///
/// Rows are grouped by tenant before ranking. Empty input, or a zero total,
/// gives an all-zero result rather than an error.
pub fn analyze_delinquency(records: &[DelinquencyRecord]) -> DelinquencyConcentration {
    // amounts are kept per tenant and summed once, so row order cannot move
    // a saturated total; the smallest name wins for the same reason
    let mut grouped: BTreeMap<Option<&str>, (Vec<Money>, Option<&str>)> = BTreeMap::new();
    for record in records {
        let entry = grouped
            .entry(record.tenant_id.as_deref())
            .or_insert((Vec::new(), None));
        entry.0.push(record.delinquency_amount);
        if let Some(name) = record.tenant_name.as_deref() {
            entry.1 = Some(entry.1.map_or(name, |current| current.min(name)));
        }
    }
    let by_tenant: BTreeMap<Option<&str>, (Money, Option<&str>)> = grouped
        .into_iter()
        .map(|(tenant, (amounts, name))| (tenant, (saturating_sum(amounts), name)))
        .collect();

    let total_amount = saturating_sum(by_tenant.values().map(|(amount, _)| *amount));
    if by_tenant.is_empty() || total_amount.is_zero() {
        return DelinquencyConcentration {
            debtor_count: by_tenant.len(),
            ..Default::default()
        };
    }

    // BTreeMap iteration is ordered by tenant id, so the stable sort breaks
    // amount ties by tenant id.
    let mut debtors: Vec<(Option<&str>, Money, Option<&str>)> = by_tenant
        .into_iter()
        .map(|(tenant, (amount, name))| (tenant, amount, name))
        .collect();
    debtors.sort_by(|a, b| b.1.cmp(&a.1));

    let n = debtors.len();
    let share_of_top = |k: usize| -> Percent {
        let top = saturating_sum(debtors.iter().take(k).map(|d| d.1));
        percent_of(top, total_amount).round_dp(1)
    };
    let pareto_count = ((n as u64) / 5).max(1) as usize;

    let ranking = debtors
        .iter()
        .enumerate()
        .map(|(i, (tenant, amount, name))| DebtorRank {
            position: i + 1,
            tenant_id: tenant.map(str::to_string),
            tenant_name: name.map(str::to_string),
            amount: *amount,
            share: percent_of(*amount, total_amount).round_dp(1),
        })
        .collect();

    let amounts: Vec<Money> = debtors.iter().map(|d| d.1).collect();

    DelinquencyConcentration {
        debtor_count: n,
        total_amount,
        ranking,
        top3_share: share_of_top(3),
        top10_share: share_of_top(10),
        pareto_share: share_of_top(pareto_count),
        gini_index: gini(&amounts, total_amount),
        average_debt: (total_amount / Decimal::from(n as u64)).round_dp(2),
        largest_debt: amounts[0],
        smallest_debt: amounts[n - 1],
    }
}

/// Normalize raw delinquency rows and run [`analyze_delinquency`].
pub fn analyze_delinquency_rows(
    input: &DelinquencyInput,
) -> KpiResult<ComputationOutput<DelinquencyConcentration>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    input.filters.validate()?;

    let mut normalized =
        normalize_collection::<DelinquencyRecord>("delinquency", &input.delinquency, input.validation)?;
    if normalized.non_object_rows > 0 {
        warnings.push(format!(
            "{} non-object row(s) treated as zero delinquency",
            normalized.non_object_rows
        ));
    }
    let dropped = input.filters.retain(&mut normalized.records);
    if dropped > 0 {
        warnings.push(format!("{dropped} record(s) excluded by filters"));
    }

    let result = analyze_delinquency(&normalized.records);
    if result.debtor_count > 0 && result.top3_share > dec!(60) {
        warnings.push(format!(
            "Top 3 debtors hold {}% of delinquency",
            result.top3_share
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Delinquency concentration (ranking, top-N share, Gini)",
        &(&input.filters, input.validation),
        warnings,
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Gini index over amounts, rounded to three decimals. `amounts` may be in
/// any order; they are ranked ascending here.
fn gini(amounts: &[Money], total: Money) -> Decimal {
    let n = amounts.len();
    if n == 0 || total.is_zero() {
        return Decimal::ZERO;
    }
    let mut ascending = amounts.to_vec();
    ascending.sort();

    let weighted = saturating_sum(
        ascending
            .iter()
            .enumerate()
            .map(|(i, v)| Decimal::from((i + 1) as u64).saturating_mul(*v)),
    );
    let n_dec = Decimal::from(n as u64);
    let Some(lhs) = dec!(2)
        .saturating_mul(weighted)
        .checked_div(n_dec.saturating_mul(total))
    else {
        return Decimal::ZERO;
    };
    lhs.saturating_sub((n_dec + Decimal::ONE) / n_dec).round_dp(3)
}
