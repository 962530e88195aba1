//! Direction, seasonality and a one-step forecast over the monthly net series
//! produced by [`crate::cashflow::summarize_cashflow`].

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::cashflow::MonthlyFlow;
use crate::error::KpiError;
use crate::types::{percent_of, saturating_sum, Money, Percent};
use crate::KpiResult;

/// Fewer periods than this and no trend is reported.
pub const MIN_TREND_PERIODS: usize = 3;

/// Mean absolute period-over-period change above which a weakly fitted
/// series is called volatile (15%).
const VOLATILITY_THRESHOLD: Decimal = dec!(0.15);

/// Slope, relative to the mean absolute net, below which a series is stable (5%).
const GROWTH_THRESHOLD: Decimal = dec!(0.05);

/// Consecutive change, in %, reported as abrupt.
const ABRUPT_CHANGE_PCT: Decimal = dec!(20);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Growth,
    Decline,
    Stable,
    Volatile,
}

/// How well the straight line explains the series, from R².
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reliability {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbruptChange {
    pub from_period: String,
    pub to_period: String,
    /// Absolute change relative to the earlier month, in %, one decimal
    pub change_pct: Percent,
    pub rising: bool,
}

/// Mean net per calendar month (`"01"`..`"12"`) across the years present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seasonality {
    pub monthly_means: BTreeMap<String, Money>,
    pub best_month: String,
    pub worst_month: String,
    pub amplitude: Money,
    /// Amplitude above 20% of the mean of the monthly means
    pub has_seasonality: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    /// Mean of the last three months
    pub moving_average: Money,
    /// Fitted line extended one month
    pub linear: Money,
    pub conservative: Money,
    pub optimistic: Money,
    /// Low under six months of history, moderate otherwise
    pub reliability: Reliability,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub periods: usize,
    pub direction: TrendDirection,
    /// Least-squares slope of net per month
    pub slope: Money,
    pub intercept: Money,
    pub r_squared: Decimal,
    pub reliability: Reliability,
    pub first_net: Money,
    pub last_net: Money,
    pub total_change: Money,
    /// Change from first to last month, in %, 0 when the first month is 0
    pub change_pct: Percent,
    /// Mean absolute month-over-month change as a fraction
    pub mean_abs_change: Decimal,
    pub abrupt_changes: Vec<AbruptChange>,
    pub seasonality: Seasonality,
    pub forecast: Forecast,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Fit a line through the monthly nets and classify where the series is
/// heading. `months` must be in calendar order, as `summarize_cashflow`
/// returns them.
pub fn analyze_trend(months: &[MonthlyFlow]) -> KpiResult<TrendAnalysis> {
    if months.len() < MIN_TREND_PERIODS {
        return Err(KpiError::InsufficientData(format!(
            "trend needs at least {MIN_TREND_PERIODS} months, got {}",
            months.len()
        )));
    }

    let nets: Vec<Money> = months.iter().map(|m| m.net).collect();
    let n = nets.len();
    let fit = fit_line(&nets);

    let relative_changes: Vec<Decimal> = nets
        .windows(2)
        .filter_map(|w| w[1].saturating_sub(w[0]).checked_div(w[0].abs()))
        .collect();
    let mean_abs_change = if relative_changes.is_empty() {
        Decimal::ZERO
    } else {
        saturating_sum(relative_changes.iter().map(|c| c.abs()))
            / Decimal::from(relative_changes.len() as u64)
    };

    let reliability = if fit.r_squared > dec!(0.8) {
        Reliability::High
    } else if fit.r_squared > dec!(0.5) {
        Reliability::Moderate
    } else {
        Reliability::Low
    };

    let mean_abs_net =
        saturating_sum(nets.iter().map(|v| v.abs())) / Decimal::from(n as u64);
    let relative_slope = fit
        .slope
        .checked_div(mean_abs_net)
        .unwrap_or(Decimal::ZERO);

    let direction = if mean_abs_change > VOLATILITY_THRESHOLD && fit.r_squared < dec!(0.5) {
        TrendDirection::Volatile
    } else if relative_slope.abs() < GROWTH_THRESHOLD {
        TrendDirection::Stable
    } else if relative_slope > Decimal::ZERO {
        TrendDirection::Growth
    } else {
        TrendDirection::Decline
    };

    let first_net = nets[0];
    let last_net = nets[n - 1];
    let total_change = last_net.saturating_sub(first_net);

    Ok(TrendAnalysis {
        periods: n,
        direction,
        slope: fit.slope.round_dp(2),
        intercept: fit.intercept.round_dp(2),
        r_squared: fit.r_squared.round_dp(3),
        reliability,
        first_net,
        last_net,
        total_change,
        change_pct: percent_of(total_change, first_net.abs()).round_dp(1),
        mean_abs_change: mean_abs_change.round_dp(3),
        abrupt_changes: abrupt_changes(months),
        seasonality: seasonality(months),
        forecast: forecast(&nets, &fit),
    })
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

struct LineFit {
    slope: Decimal,
    intercept: Decimal,
    r_squared: Decimal,
}

/// Ordinary least squares over x = 1..=n.
fn fit_line(values: &[Money]) -> LineFit {
    let n = Decimal::from(values.len() as u64);
    let x_mean = (n + Decimal::ONE) / dec!(2);
    let y_mean = saturating_sum(values.iter().copied()) / n;
    let x = |i: usize| Decimal::from((i + 1) as u64);

    let covariance = saturating_sum(values.iter().enumerate().map(|(i, y)| {
        x(i).saturating_sub(x_mean)
            .saturating_mul(y.saturating_sub(y_mean))
    }));
    let x_variance = saturating_sum((0..values.len()).map(|i| {
        let dx = x(i) - x_mean;
        dx * dx
    }));

    let slope = covariance.checked_div(x_variance).unwrap_or(Decimal::ZERO);
    let intercept = y_mean.saturating_sub(slope.saturating_mul(x_mean));

    let ss_tot = saturating_sum(values.iter().map(|y| {
        let d = y.saturating_sub(y_mean);
        d.saturating_mul(d)
    }));
    let ss_res = saturating_sum(values.iter().enumerate().map(|(i, y)| {
        let predicted = slope.saturating_mul(x(i)).saturating_add(intercept);
        let d = y.saturating_sub(predicted);
        d.saturating_mul(d)
    }));
    let r_squared = ss_res
        .checked_div(ss_tot)
        .map(|ratio| Decimal::ONE.saturating_sub(ratio))
        .unwrap_or(Decimal::ZERO);

    LineFit {
        slope,
        intercept,
        r_squared,
    }
}

fn abrupt_changes(months: &[MonthlyFlow]) -> Vec<AbruptChange> {
    months
        .windows(2)
        .filter_map(|w| {
            let (prev, cur) = (&w[0], &w[1]);
            if prev.net.is_zero() {
                return None;
            }
            let change_pct = percent_of(cur.net.saturating_sub(prev.net), prev.net.abs())
                .abs()
                .round_dp(1);
            (change_pct > ABRUPT_CHANGE_PCT).then(|| AbruptChange {
                from_period: prev.period.clone(),
                to_period: cur.period.clone(),
                change_pct,
                rising: cur.net > prev.net,
            })
        })
        .collect()
}

fn seasonality(months: &[MonthlyFlow]) -> Seasonality {
    let mut by_month: BTreeMap<String, Vec<Money>> = BTreeMap::new();
    for m in months {
        let key = m.period.get(5..7).unwrap_or(&m.period).to_string();
        by_month.entry(key).or_default().push(m.net);
    }

    let monthly_means: BTreeMap<String, Money> = by_month
        .into_iter()
        .map(|(month, nets)| {
            let count = Decimal::from(nets.len() as u64);
            (month, (saturating_sum(nets) / count).round_dp(2))
        })
        .collect();

    // ties go to the earliest calendar month
    let best = monthly_means.iter().rev().max_by_key(|(_, v)| **v);
    let worst = monthly_means.iter().min_by_key(|(_, v)| **v);
    let (best_month, best_value) = best.map_or((String::new(), Decimal::ZERO), |(k, v)| (k.clone(), *v));
    let (worst_month, worst_value) = worst.map_or((String::new(), Decimal::ZERO), |(k, v)| (k.clone(), *v));

    let amplitude = best_value.saturating_sub(worst_value);
    let mean_of_means = if monthly_means.is_empty() {
        Decimal::ZERO
    } else {
        saturating_sum(monthly_means.values().copied())
            / Decimal::from(monthly_means.len() as u64)
    };

    Seasonality {
        has_seasonality: amplitude > mean_of_means.abs().saturating_mul(dec!(0.2)),
        monthly_means,
        best_month,
        worst_month,
        amplitude,
    }
}

fn forecast(nets: &[Money], fit: &LineFit) -> Forecast {
    let n = nets.len();
    let tail = &nets[n.saturating_sub(3)..];
    let moving_average =
        (saturating_sum(tail.iter().copied()) / Decimal::from(tail.len() as u64)).round_dp(2);
    let linear = fit
        .slope
        .saturating_mul(Decimal::from((n + 1) as u64))
        .saturating_add(fit.intercept)
        .round_dp(2);

    Forecast {
        moving_average,
        linear,
        conservative: moving_average.min(linear),
        optimistic: moving_average.max(linear),
        reliability: if n < 6 {
            Reliability::Low
        } else {
            Reliability::Moderate
        },
    }
}
