use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Percentages on a 0-100 scale (25 = 25%), as the dashboard displays them.
pub type Percent = Decimal;

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

impl<T: Serialize> ComputationOutput<T> {
    /// Swap the result for a projection of it, keeping warnings and metadata.
    pub fn map<U: Serialize>(self, f: impl FnOnce(T) -> U) -> ComputationOutput<U> {
        ComputationOutput {
            result: f(self.result),
            methodology: self.methodology,
            assumptions: self.assumptions,
            warnings: self.warnings,
            metadata: self.metadata,
        }
    }
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

/// `numerator / denominator * 100`, or zero when the denominator is zero.
///
/// Every ratio on the dashboard goes through here so that an empty portfolio
/// reports 0% rather than an error.
pub fn percent_of(numerator: Decimal, denominator: Decimal) -> Percent {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    numerator
        .checked_div(denominator)
        .and_then(|ratio| ratio.checked_mul(dec!(100)))
        .unwrap_or(Decimal::ZERO)
}

/// Sum that saturates at the Decimal range instead of panicking.
///
/// Positive and negative terms accumulate separately and meet once at the
/// end. Same-sign saturation is order-independent, so the result never
/// depends on the order of `values`, even at the range bound.
pub fn saturating_sum<I>(values: I) -> Money
where
    I: IntoIterator<Item = Money>,
{
    let (positive, negative) =
        values
            .into_iter()
            .fold((Decimal::ZERO, Decimal::ZERO), |(pos, neg), v| {
                if v.is_sign_negative() {
                    (pos, neg.saturating_add(v))
                } else {
                    (pos.saturating_add(v), neg)
                }
            });
    positive.saturating_add(negative)
}
