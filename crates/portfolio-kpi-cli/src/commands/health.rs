use serde_json::Value;

use portfolio_kpi_core::kpi::aggregator;

use super::{load_portfolio_input, PortfolioArgs};

pub fn run_health(args: PortfolioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut portfolio = load_portfolio_input(&args)?;
    portfolio.config.include_sample_payload = false;
    let result = aggregator::aggregate_portfolio(&portfolio)?;
    Ok(serde_json::to_value(result.map(|r| r.health))?)
}
