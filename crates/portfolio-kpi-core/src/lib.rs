pub mod config;
pub mod error;
pub mod filters;
pub mod kpi;
pub mod records;
pub mod sample;
pub mod types;

#[cfg(feature = "delinquency")]
pub mod delinquency;

#[cfg(feature = "cashflow")]
pub mod cashflow;

#[cfg(feature = "cashflow")]
pub mod trend;

pub use error::KpiError;
pub use kpi::aggregator::{aggregate_portfolio, compute_kpis, KpiSnapshot, PortfolioInput};
pub use types::*;

/// Standard result type for all portfolio KPI operations
pub type KpiResult<T> = Result<T, KpiError>;
