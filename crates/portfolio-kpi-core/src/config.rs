use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::kpi::status::{default_thresholds, Thresholds};
use crate::records::ValidationMode;

/// Knobs for a portfolio analysis run. Every field has a default, so an empty
/// JSON/YAML document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// How raw rows are checked during normalization
    #[serde(default)]
    pub validation: ValidationMode,
    /// Attach the illustrative chart payload to the aggregation output
    #[serde(default = "default_true")]
    pub include_sample_payload: bool,
    /// Per-KPI threshold overrides, keyed by KPI name (e.g. "default_rate")
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub thresholds: BTreeMap<String, Thresholds>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            validation: ValidationMode::default(),
            include_sample_payload: true,
            thresholds: BTreeMap::new(),
        }
    }
}

impl AnalysisConfig {
    /// Thresholds for a KPI: the configured override, else the built-in default.
    pub fn thresholds_for(&self, kpi: &str) -> Option<Thresholds> {
        self.thresholds
            .get(kpi)
            .copied()
            .or_else(|| default_thresholds(kpi))
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_document_is_default() {
        let cfg: AnalysisConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, AnalysisConfig::default());
        assert!(cfg.include_sample_payload);
        assert_eq!(cfg.validation, ValidationMode::Lenient);
    }

    #[test]
    fn test_override_wins_over_default() {
        let cfg: AnalysisConfig = serde_json::from_str(
            r#"{
                "validation": "strict",
                "thresholds": {
                    "default_rate": {"critical": "30", "attention": "15", "good": "5", "lower_is_better": true}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.validation, ValidationMode::Strict);
        let t = cfg.thresholds_for("default_rate").unwrap();
        assert_eq!(t.critical, dec!(30));
        // untouched KPIs keep their defaults
        let occ = cfg.thresholds_for("occupancy_rate").unwrap();
        assert_eq!(occ.good, dec!(95));
        assert!(cfg.thresholds_for("unknown_kpi").is_none());
    }
}
