use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::kpi::aggregator::KpiSnapshot;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Traffic-light status of a single KPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiStatus {
    Critical,
    Attention,
    Good,
    Excellent,
}

impl KpiStatus {
    /// Points contributed to the health score.
    pub fn weight(self) -> Decimal {
        match self {
            KpiStatus::Critical => Decimal::ZERO,
            KpiStatus::Attention => dec!(25),
            KpiStatus::Good => dec!(70),
            KpiStatus::Excellent => dec!(100),
        }
    }
}

/// Band edges for a KPI. For higher-is-better KPIs the edges ascend
/// (critical < attention < good); for lower-is-better KPIs they descend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub critical: Decimal,
    pub attention: Decimal,
    pub good: Decimal,
    #[serde(default)]
    pub lower_is_better: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiUnit {
    Currency,
    Percent,
}

/// One KPI with its classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedKpi {
    pub name: String,
    pub value: Decimal,
    pub unit: KpiUnit,
    pub status: KpiStatus,
    pub note: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub critical: usize,
    pub attention: usize,
    pub good: usize,
    pub excellent: usize,
}

/// Classification of every headline KPI plus the overall health score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiHealth {
    pub kpis: Vec<ClassifiedKpi>,
    pub counts: StatusCounts,
    /// 0-100, one decimal place
    pub health_score: Decimal,
    pub critical_kpis: Vec<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Built-in thresholds for the headline KPIs.
pub fn default_thresholds(kpi: &str) -> Option<Thresholds> {
    let (critical, attention, good, lower_is_better) = match kpi {
        "default_rate" => (dec!(50), dec!(20), dec!(10), true),
        "occupancy_rate" => (dec!(70), dec!(85), dec!(95), false),
        "noi_yield" => (dec!(0), dec!(10), dec!(20), false),
        "noi" => (dec!(0), dec!(1_000_000), dec!(2_000_000), false),
        "portfolio_value" => (dec!(10_000_000), dec!(15_000_000), dec!(20_000_000), false),
        _ => return None,
    };
    Some(Thresholds {
        critical,
        attention,
        good,
        lower_is_better,
    })
}

/// Place a value in its band. Comparisons are inclusive at every edge.
pub fn classify(value: Decimal, thresholds: Option<Thresholds>) -> (KpiStatus, &'static str) {
    let Some(t) = thresholds else {
        return (KpiStatus::Good, "No thresholds configured");
    };

    if t.lower_is_better {
        if value >= t.critical {
            (KpiStatus::Critical, "Value far too high, act immediately")
        } else if value >= t.attention {
            (KpiStatus::Attention, "Value above target, monitor")
        } else if value >= t.good {
            (KpiStatus::Good, "Value within acceptable range")
        } else {
            (KpiStatus::Excellent, "Value well below the acceptable ceiling")
        }
    } else if value <= t.critical {
        (KpiStatus::Critical, "Value far too low, act immediately")
    } else if value <= t.attention {
        (KpiStatus::Attention, "Value below target, monitor")
    } else if value <= t.good {
        (KpiStatus::Good, "Value within expected range")
    } else {
        (KpiStatus::Excellent, "Value above expectations")
    }
}

/// Mean status weight, rounded to one decimal place. Zero for no KPIs.
pub fn health_score(statuses: &[KpiStatus]) -> Decimal {
    if statuses.is_empty() {
        return Decimal::ZERO;
    }
    let total: Decimal = statuses.iter().map(|s| s.weight()).sum();
    (total / Decimal::from(statuses.len() as u64)).round_dp(1)
}

/// Classify the headline KPIs of a snapshot against the configured thresholds.
pub fn classify_snapshot(snapshot: &KpiSnapshot, config: &AnalysisConfig) -> KpiHealth {
    let headline = [
        ("portfolio_value", snapshot.portfolio_value, KpiUnit::Currency),
        ("default_rate", snapshot.default_rate, KpiUnit::Percent),
        ("noi", snapshot.noi, KpiUnit::Currency),
        ("noi_yield", snapshot.noi_yield, KpiUnit::Percent),
        ("occupancy_rate", snapshot.occupancy_rate, KpiUnit::Percent),
    ];

    let mut counts = StatusCounts::default();
    let kpis: Vec<ClassifiedKpi> = headline
        .into_iter()
        .map(|(name, value, unit)| {
            let (status, note) = classify(value, config.thresholds_for(name));
            match status {
                KpiStatus::Critical => counts.critical += 1,
                KpiStatus::Attention => counts.attention += 1,
                KpiStatus::Good => counts.good += 1,
                KpiStatus::Excellent => counts.excellent += 1,
            }
            ClassifiedKpi {
                name: name.to_string(),
                value,
                unit,
                status,
                note: note.to_string(),
            }
        })
        .collect();

    let statuses: Vec<KpiStatus> = kpis.iter().map(|k| k.status).collect();
    let critical_kpis = kpis
        .iter()
        .filter(|k| k.status == KpiStatus::Critical)
        .map(|k| k.name.clone())
        .collect();

    KpiHealth {
        health_score: health_score(&statuses),
        kpis,
        counts,
        critical_kpis,
    }
}
