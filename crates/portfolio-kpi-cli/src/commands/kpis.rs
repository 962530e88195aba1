use clap::Args;
use serde_json::Value;

use portfolio_kpi_core::kpi::aggregator;

use super::{load_portfolio_input, PortfolioArgs};

/// Arguments for the KPI snapshot
#[derive(Args)]
pub struct KpisArgs {
    #[command(flatten)]
    pub source: PortfolioArgs,

    /// Print only the camelCase KPI record the dashboard cards consume
    #[arg(long)]
    pub snapshot_only: bool,

    /// Leave the illustrative chart payload out of the output
    #[arg(long)]
    pub no_sample: bool,
}

pub fn run_kpis(args: KpisArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut portfolio = load_portfolio_input(&args.source)?;
    if args.no_sample || args.snapshot_only {
        portfolio.config.include_sample_payload = false;
    }
    let result = aggregator::aggregate_portfolio(&portfolio)?;
    if args.snapshot_only {
        return Ok(serde_json::to_value(result.map(|r| r.kpis))?);
    }
    Ok(serde_json::to_value(result)?)
}
