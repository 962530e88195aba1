use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::KpiError;
use crate::records::{BillingRecord, DelinquencyRecord, MovementRecord, PaymentRecord, TenantId};
use crate::KpiResult;

/// Date window and entity filter applied before aggregation.
///
/// The dashboard used to read these from its UI state; here they are an
/// explicit argument so aggregation stays a pure function of its inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationFilters {
    /// Inclusive lower bound on `reference_date`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound on `reference_date`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Restrict tenant-keyed tables to these tenants (empty = all tenants)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tenant_ids: Vec<TenantId>,
}

/// Records carrying an optional reference date and, for tenant-keyed tables,
/// a tenant id.
pub trait Filterable {
    fn reference_date(&self) -> Option<NaiveDate>;

    /// `None` for tables that are not keyed by tenant.
    fn tenant(&self) -> Option<Option<&str>> {
        None
    }
}

impl Filterable for BillingRecord {
    fn reference_date(&self) -> Option<NaiveDate> {
        self.reference_date
    }
    fn tenant(&self) -> Option<Option<&str>> {
        Some(self.tenant_id.as_deref())
    }
}

impl Filterable for DelinquencyRecord {
    fn reference_date(&self) -> Option<NaiveDate> {
        self.reference_date
    }
    fn tenant(&self) -> Option<Option<&str>> {
        Some(self.tenant_id.as_deref())
    }
}

impl Filterable for PaymentRecord {
    fn reference_date(&self) -> Option<NaiveDate> {
        self.reference_date
    }
    fn tenant(&self) -> Option<Option<&str>> {
        Some(self.tenant_id.as_deref())
    }
}

impl Filterable for MovementRecord {
    fn reference_date(&self) -> Option<NaiveDate> {
        self.reference_date
    }
}

impl AggregationFilters {
    /// Reject an inverted date window.
    pub fn validate(&self) -> KpiResult<()> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(KpiError::InvalidInput {
                    field: "start_date".into(),
                    reason: format!("start_date {start} is after end_date {end}"),
                });
            }
        }
        Ok(())
    }

    pub fn is_identity(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none() && self.tenant_ids.is_empty()
    }

    /// Whether a record survives the filter. Undated records always pass the
    /// date window; untenanted records fail an active tenant filter.
    pub fn accepts<R: Filterable>(&self, record: &R) -> bool {
        if let Some(date) = record.reference_date() {
            if self.start_date.is_some_and(|start| date < start) {
                return false;
            }
            if self.end_date.is_some_and(|end| date > end) {
                return false;
            }
        }

        if self.tenant_ids.is_empty() {
            return true;
        }
        match record.tenant() {
            None => true,
            Some(Some(tenant)) => self.tenant_ids.iter().any(|t| t == tenant),
            Some(None) => false,
        }
    }

    /// Keep the accepted records; returns the number dropped.
    pub fn retain<R: Filterable>(&self, records: &mut Vec<R>) -> usize {
        let before = records.len();
        if !self.is_identity() {
            records.retain(|r| self.accepts(r));
        }
        before - records.len()
    }
}
