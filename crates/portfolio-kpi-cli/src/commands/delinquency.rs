use clap::Args;
use serde_json::Value;

use portfolio_kpi_core::delinquency::{self, DelinquencyInput};

use super::{load_portfolio_input, PortfolioArgs};

/// Arguments for delinquency concentration
#[derive(Args)]
pub struct DelinquencyArgs {
    #[command(flatten)]
    pub source: PortfolioArgs,

    /// Keep only the N largest debtors in the printed ranking
    #[arg(long)]
    pub top: Option<usize>,
}

pub fn run_delinquency(args: DelinquencyArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let portfolio = load_portfolio_input(&args.source)?;
    let dl_input = DelinquencyInput {
        delinquency: portfolio.delinquency,
        filters: portfolio.filters,
        validation: portfolio.config.validation,
    };
    let mut result = delinquency::analyze_delinquency_rows(&dl_input)?;
    if let Some(n) = args.top {
        result.result.ranking.truncate(n);
    }
    Ok(serde_json::to_value(result)?)
}
