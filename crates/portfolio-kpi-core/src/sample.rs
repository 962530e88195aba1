//! Illustrative chart payload.
//!
//! The dashboard charts need a performance series, a composition breakdown
//! and risk/trend blocks before real data sources exist for them. Everything
//! here is a fixed multiple of NOI yield or a hard-coded constant. None of it
//! is business logic and callers must not treat these numbers as measured.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::kpi::aggregator::KpiSnapshot;
use crate::types::{Money, Percent};

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Share of portfolio value per segment, in %.
const COMPOSITION: [(&str, Decimal); 5] = [
    ("retail", dec!(45)),
    ("food", dec!(25)),
    ("services", dec!(15)),
    ("entertainment", dec!(10)),
    ("other", dec!(5)),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformancePoint {
    pub period: String,
    pub noi_yield: Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionSlice {
    pub segment: String,
    pub share: Percent,
    pub value: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRiskMetrics {
    pub volatility: Percent,
    pub sharpe_ratio: Decimal,
    pub max_drawdown: Percent,
    pub beta: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleTrend {
    pub yoy_growth: Percent,
    /// "positive", "negative" or "flat", from the sign of NOI
    pub momentum: String,
}

/// Placeholder chart data shaped like the dashboard expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePayload {
    /// Always true; lets consumers tell sample data from measured data
    pub illustrative: bool,
    pub performance_series: Vec<PerformancePoint>,
    pub composition: Vec<CompositionSlice>,
    pub risk_metrics: SampleRiskMetrics,
    pub trend_analysis: SampleTrend,
}

impl SamplePayload {
    pub fn from_snapshot(snapshot: &KpiSnapshot) -> Self {
        let y = snapshot.noi_yield;

        let performance_series = MONTH_LABELS
            .iter()
            .enumerate()
            .map(|(i, label)| PerformancePoint {
                period: (*label).to_string(),
                noi_yield: y.saturating_mul(dec!(0.85) + dec!(0.025) * Decimal::from(i as u64)),
            })
            .collect();

        let composition = COMPOSITION
            .iter()
            .map(|(segment, share)| CompositionSlice {
                segment: (*segment).to_string(),
                share: *share,
                value: snapshot
                    .portfolio_value
                    .saturating_mul(*share / dec!(100)),
            })
            .collect();

        let momentum = if snapshot.noi > Decimal::ZERO {
            "positive"
        } else if snapshot.noi < Decimal::ZERO {
            "negative"
        } else {
            "flat"
        };

        SamplePayload {
            illustrative: true,
            performance_series,
            composition,
            risk_metrics: SampleRiskMetrics {
                volatility: y.saturating_mul(dec!(0.15)),
                sharpe_ratio: y.saturating_mul(dec!(0.05)),
                max_drawdown: y.saturating_mul(dec!(0.3)),
                beta: dec!(0.85),
            },
            trend_analysis: SampleTrend {
                yoy_growth: y.saturating_mul(dec!(0.2)),
                momentum: momentum.to_string(),
            },
        }
    }
}
