use serde_json::Value;

use portfolio_kpi_core::cashflow::{self, CashflowInput};

use super::{load_portfolio_input, PortfolioArgs};

pub fn run_cashflow(args: PortfolioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let portfolio = load_portfolio_input(&args)?;
    let cf_input = CashflowInput {
        movements: portfolio.movements,
        filters: portfolio.filters,
        validation: portfolio.config.validation,
    };
    let result = cashflow::summarize_cashflow_rows(&cf_input)?;
    Ok(serde_json::to_value(result)?)
}
