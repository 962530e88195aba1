pub mod cashflow;
pub mod delinquency;
pub mod health;
pub mod kpis;
pub mod sample;

use chrono::NaiveDate;
use clap::Args;
use tracing::info;

use portfolio_kpi_core::config::AnalysisConfig;
use portfolio_kpi_core::records::ValidationMode;
use portfolio_kpi_core::PortfolioInput;

use crate::input;

/// Where the record collections come from, plus filters and config overrides.
/// Shared by every analysis subcommand.
#[derive(Args)]
pub struct PortfolioArgs {
    /// Path to a JSON bundle with `billing`, `delinquency`, `movements` and
    /// `payments` arrays (optionally `filters` and `config`)
    #[arg(long)]
    pub input: Option<String>,

    /// JSON array of billing rows (overrides the bundle's `billing`)
    #[arg(long)]
    pub billing: Option<String>,

    /// JSON array of delinquency rows
    #[arg(long)]
    pub delinquency: Option<String>,

    /// JSON array of cash movement rows
    #[arg(long)]
    pub movements: Option<String>,

    /// JSON array of owner payment rows
    #[arg(long)]
    pub payments: Option<String>,

    /// Analysis config file (YAML or JSON)
    #[arg(long)]
    pub config: Option<String>,

    /// Keep records dated on or after this day (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Keep records dated on or before this day (YYYY-MM-DD)
    #[arg(long)]
    pub end_date: Option<NaiveDate>,

    /// Restrict to these tenant ids (comma-separated or repeated)
    #[arg(long = "tenant", value_delimiter = ',')]
    pub tenants: Vec<String>,

    /// Reject non-object rows instead of treating them as zero
    #[arg(long)]
    pub strict: bool,
}

impl PortfolioArgs {
    fn has_collection_files(&self) -> bool {
        self.billing.is_some()
            || self.delinquency.is_some()
            || self.movements.is_some()
            || self.payments.is_some()
    }
}

/// Assemble the aggregation input. Precedence, lowest to highest: the bundle
/// (file or stdin), per-collection files, `--config`, then flags.
pub fn load_portfolio_input(
    args: &PortfolioArgs,
) -> Result<PortfolioInput, Box<dyn std::error::Error>> {
    let mut portfolio: PortfolioInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if args.has_collection_files() {
        PortfolioInput::default()
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err(
            "--input <bundle.json>, per-collection files (--billing, --delinquency, \
             --movements, --payments) or stdin required"
                .into(),
        );
    };

    if let Some(ref path) = args.billing {
        portfolio.billing = input::file::read_rows(path)?;
    }
    if let Some(ref path) = args.delinquency {
        portfolio.delinquency = input::file::read_rows(path)?;
    }
    if let Some(ref path) = args.movements {
        portfolio.movements = input::file::read_rows(path)?;
    }
    if let Some(ref path) = args.payments {
        portfolio.payments = input::file::read_rows(path)?;
    }

    if let Some(ref path) = args.config {
        portfolio.config = input::file::read_config::<AnalysisConfig>(path)?;
    }
    if args.strict {
        portfolio.config.validation = ValidationMode::Strict;
    }

    if args.start_date.is_some() {
        portfolio.filters.start_date = args.start_date;
    }
    if args.end_date.is_some() {
        portfolio.filters.end_date = args.end_date;
    }
    if !args.tenants.is_empty() {
        portfolio.filters.tenant_ids = args.tenants.clone();
    }

    info!(
        billing = portfolio.billing.len(),
        delinquency = portfolio.delinquency.len(),
        movements = portfolio.movements.len(),
        payments = portfolio.payments.len(),
        "input assembled"
    );
    Ok(portfolio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn temp_file(name: &str, contents: &str) -> String {
        let dir: PathBuf =
            std::env::temp_dir().join(format!("pkpi-commands-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn args_with(input: Option<String>) -> PortfolioArgs {
        PortfolioArgs {
            input,
            billing: None,
            delinquency: None,
            movements: None,
            payments: None,
            config: None,
            start_date: None,
            end_date: None,
            tenants: Vec::new(),
            strict: false,
        }
    }

    const BUNDLE: &str = r#"{
        "billing": [{"tenant_id": "A", "total_amount": 100}],
        "movements": [{"credit_amount": 50, "reference_date": "2025-01-10"}],
        "filters": {"start_date": "2024-01-01"},
        "config": {"validation": "lenient", "include_sample_payload": false}
    }"#;

    #[test]
    fn test_billing_file_and_flags_override_bundle() {
        let mut args = args_with(Some(temp_file("bundle.json", BUNDLE)));
        args.billing = Some(temp_file(
            "billing.json",
            r#"[{"tenant_id": "B", "total_amount": 10}, {"tenant_id": "C", "total_amount": 20}]"#,
        ));
        args.strict = true;
        args.tenants = vec!["B".into()];

        let input = load_portfolio_input(&args).unwrap();
        assert_eq!(input.billing.len(), 2);
        assert_eq!(input.billing[0]["tenant_id"], "B");
        assert_eq!(input.movements.len(), 1);
        assert_eq!(input.config.validation, ValidationMode::Strict);
        assert!(!input.config.include_sample_payload);
        assert_eq!(input.filters.tenant_ids, vec!["B".to_string()]);
        assert_eq!(input.filters.start_date, NaiveDate::from_ymd_opt(2024, 1, 1));
    }

    #[test]
    fn test_config_file_replaces_bundle_config_and_strict_wins() {
        let mut args = args_with(Some(temp_file("bundle-config.json", BUNDLE)));
        args.config = Some(temp_file(
            "analysis.yaml",
            "validation: lenient\ninclude_sample_payload: true\n",
        ));

        let input = load_portfolio_input(&args).unwrap();
        assert_eq!(input.config.validation, ValidationMode::Lenient);
        assert!(input.config.include_sample_payload);

        args.strict = true;
        let input = load_portfolio_input(&args).unwrap();
        assert_eq!(input.config.validation, ValidationMode::Strict);
    }

    #[test]
    fn test_collection_files_without_bundle_start_empty() {
        let mut args = args_with(None);
        args.payments = Some(temp_file("payments.json", r#"[{"amount": 5}]"#));

        let input = load_portfolio_input(&args).unwrap();
        assert!(input.billing.is_empty());
        assert_eq!(input.payments.len(), 1);
        assert_eq!(input.config, AnalysisConfig::default());
    }
}
