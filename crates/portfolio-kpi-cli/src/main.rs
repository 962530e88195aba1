mod commands;
mod input;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::delinquency::DelinquencyArgs;
use commands::kpis::KpisArgs;
use commands::PortfolioArgs;

/// Shopping-centre portfolio KPIs from billing, delinquency and cash movements
#[derive(Parser)]
#[command(
    name = "pkpi",
    version,
    about = "Portfolio KPI aggregation for shopping-centre dashboards",
    long_about = "A CLI that reduces billing, delinquency and cash-movement records into \
                  the dashboard KPI snapshot (portfolio value, default rate, NOI, NOI yield, \
                  occupancy, risk-adjusted return) with decimal precision. Also classifies \
                  KPI health, ranks debtors and summarises monthly cash flow."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Raise log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate the portfolio KPI snapshot
    Kpis(KpisArgs),
    /// Classify KPIs against thresholds and compute the health score
    Health(PortfolioArgs),
    /// Rank debtors and measure delinquency concentration
    Delinquency(DelinquencyArgs),
    /// Monthly cash-flow summary and critical months
    Cashflow(PortfolioArgs),
    /// Illustrative chart payload derived from the KPI snapshot
    Sample(PortfolioArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Kpis(args) => commands::kpis::run_kpis(args),
        Commands::Health(args) => commands::health::run_health(args),
        Commands::Delinquency(args) => commands::delinquency::run_delinquency(args),
        Commands::Cashflow(args) => commands::cashflow::run_cashflow(args),
        Commands::Sample(args) => commands::sample::run_sample(args),
        Commands::Version => {
            println!("pkpi {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
