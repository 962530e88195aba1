use napi::Result as NapiResult;
use napi_derive::napi;

use portfolio_kpi_core::cashflow::{self, CashflowInput};
use portfolio_kpi_core::delinquency::{self, DelinquencyInput};
use portfolio_kpi_core::kpi::aggregator::{self, PortfolioInput};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// KPI aggregation
// ---------------------------------------------------------------------------

/// The bare camelCase KPI record the dashboard cards bind to.
#[napi]
pub fn compute_kpis(input_json: String) -> NapiResult<String> {
    let mut input: PortfolioInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    input.config.include_sample_payload = false;
    let output = aggregator::aggregate_portfolio(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output.result.kpis).map_err(to_napi_error)
}

#[napi]
pub fn aggregate_portfolio(input_json: String) -> NapiResult<String> {
    let input: PortfolioInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = aggregator::aggregate_portfolio(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Delinquency & cash flow
// ---------------------------------------------------------------------------

#[napi]
pub fn analyze_delinquency(input_json: String) -> NapiResult<String> {
    let input: DelinquencyInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = delinquency::analyze_delinquency_rows(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn summarize_cashflow(input_json: String) -> NapiResult<String> {
    let input: CashflowInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = cashflow::summarize_cashflow_rows(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
