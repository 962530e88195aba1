use chrono::Datelike;
use rust_decimal::prelude::MathematicalOps;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::filters::AggregationFilters;
use crate::records::{normalize_collection, MovementRecord, ValidationMode};
use crate::trend::{analyze_trend, TrendAnalysis, MIN_TREND_PERIODS};
use crate::types::{saturating_sum, with_metadata, ComputationOutput, Money};
use crate::KpiResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input for the monthly cash-flow summary when called with raw rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CashflowInput {
    #[serde(default)]
    pub movements: Vec<serde_json::Value>,
    /// Only the date window applies; movements carry no tenant
    #[serde(default)]
    pub filters: AggregationFilters,
    #[serde(default)]
    pub validation: ValidationMode,
}

/// Credits, debits and net for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyFlow {
    /// "YYYY-MM"
    pub period: String,
    pub credit: Money,
    pub debit: Money,
    pub net: Money,
}

/// A month flagged by one or more warning signs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalMonth {
    pub period: String,
    pub net: Money,
    pub issues: Vec<String>,
    /// 0-100
    pub risk_score: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CashflowSummary {
    pub months: Vec<MonthlyFlow>,
    pub total_credit: Money,
    pub total_debit: Money,
    pub consolidated_net: Money,
    pub average_credit: Money,
    pub average_debit: Money,
    pub average_net: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_month: Option<MonthlyFlow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worst_month: Option<MonthlyFlow>,
    pub positive_months: usize,
    pub negative_months: usize,
    /// Sample standard deviation of monthly net, two decimals
    pub volatility: Money,
    pub critical_months: Vec<CriticalMonth>,
    /// Movements with no reference date, left out of the monthly view
    pub undated_movements: usize,
    /// Absent under three months
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendAnalysis>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Group dated movements by calendar month and summarise the series.
///
/// Only positive credits and positive debits are counted, matching the KPI
/// revenue and expense definitions.
pub fn summarize_cashflow(movements: &[MovementRecord]) -> CashflowSummary {
    let mut by_month: BTreeMap<(i32, u32), (Money, Money)> = BTreeMap::new();
    let mut undated_movements = 0usize;

    for m in movements {
        let Some(date) = m.reference_date else {
            undated_movements += 1;
            continue;
        };
        let entry = by_month
            .entry((date.year(), date.month()))
            .or_insert((Decimal::ZERO, Decimal::ZERO));
        if m.credit_amount > Decimal::ZERO {
            entry.0 = entry.0.saturating_add(m.credit_amount);
        }
        if m.debit_amount > Decimal::ZERO {
            entry.1 = entry.1.saturating_add(m.debit_amount);
        }
    }

    let months: Vec<MonthlyFlow> = by_month
        .into_iter()
        .map(|((year, month), (credit, debit))| MonthlyFlow {
            period: format!("{year:04}-{month:02}"),
            credit,
            debit,
            net: credit.saturating_sub(debit),
        })
        .collect();

    if months.is_empty() {
        return CashflowSummary {
            undated_movements,
            ..Default::default()
        };
    }

    let count = Decimal::from(months.len() as u64);
    let total_credit = saturating_sum(months.iter().map(|m| m.credit));
    let total_debit = saturating_sum(months.iter().map(|m| m.debit));
    let consolidated_net = saturating_sum(months.iter().map(|m| m.net));
    let average_credit = total_credit / count;

    // ties go to the earliest month
    let best_month = months.iter().rev().max_by_key(|m| m.net).cloned();
    let worst_month = months.iter().min_by_key(|m| m.net).cloned();

    let critical_months = find_critical_months(&months, average_credit);
    let nets: Vec<Money> = months.iter().map(|m| m.net).collect();
    let trend = analyze_trend(&months).ok();

    CashflowSummary {
        total_credit,
        total_debit,
        consolidated_net,
        average_credit,
        average_debit: total_debit / count,
        average_net: consolidated_net / count,
        best_month,
        worst_month,
        positive_months: months.iter().filter(|m| m.net > Decimal::ZERO).count(),
        negative_months: months.iter().filter(|m| m.net < Decimal::ZERO).count(),
        volatility: sample_std_dev(&nets).round_dp(2),
        critical_months,
        undated_movements,
        trend,
        months,
    }
}

/// Normalize raw movement rows and run [`summarize_cashflow`].
pub fn summarize_cashflow_rows(
    input: &CashflowInput,
) -> KpiResult<ComputationOutput<CashflowSummary>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    input.filters.validate()?;

    let mut normalized =
        normalize_collection::<MovementRecord>("movements", &input.movements, input.validation)?;
    if normalized.non_object_rows > 0 {
        warnings.push(format!(
            "{} non-object row(s) treated as zero movements",
            normalized.non_object_rows
        ));
    }
    let dropped = input.filters.retain(&mut normalized.records);
    if dropped > 0 {
        warnings.push(format!("{dropped} movement(s) outside the date window"));
    }

    let result = summarize_cashflow(&normalized.records);
    if result.undated_movements > 0 {
        warnings.push(format!(
            "{} movement(s) without a reference date left out of the monthly view",
            result.undated_movements
        ));
    }
    if result.months.len() < 2 {
        warnings.push("Fewer than two months of data; volatility reported as 0".into());
    }
    if result.months.len() < MIN_TREND_PERIODS {
        warnings.push("Fewer than three months of data; trend not assessed".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monthly cash-flow summary",
        &(&input.filters, input.validation),
        warnings,
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn find_critical_months(months: &[MonthlyFlow], average_credit: Money) -> Vec<CriticalMonth> {
    let mut critical: Vec<CriticalMonth> = months
        .iter()
        .filter_map(|m| {
            let mut issues = Vec::new();
            let mut score = 0u32;

            if m.net < Decimal::ZERO {
                issues.push("Negative operating balance".to_string());
                score += 50;
            }
            if m.debit > m.credit.saturating_mul(dec!(1.5)) {
                issues.push("Debits far exceed credits".to_string());
                score += 30;
            }
            if m.credit < average_credit.saturating_mul(dec!(0.5)) {
                issues.push("Credits well below the monthly average".to_string());
                score += 20;
            }

            (!issues.is_empty()).then(|| CriticalMonth {
                period: m.period.clone(),
                net: m.net,
                issues,
                risk_score: score.min(100),
            })
        })
        .collect();

    // months arrive in calendar order; the stable sort keeps it within a score
    critical.sort_by(|a, b| b.risk_score.cmp(&a.risk_score));
    critical
}

fn sample_std_dev(values: &[Money]) -> Money {
    if values.len() < 2 {
        return Decimal::ZERO;
    }
    let n = Decimal::from(values.len() as u64);
    let mean = saturating_sum(values.iter().copied()) / n;
    let variance = saturating_sum(values.iter().map(|v| {
        let diff = v.saturating_sub(mean);
        diff.saturating_mul(diff)
    })) / (n - Decimal::ONE);
    variance.sqrt().unwrap_or(Decimal::ZERO)
}
