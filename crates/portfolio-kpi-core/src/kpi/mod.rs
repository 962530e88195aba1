pub mod aggregator;
pub mod status;
