//! Revenue rollups over completed payments

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, instrument};

use core_kernel::{AcademicYear, Clock, DateRange, Money};

use crate::error::FeeError;
use crate::ports::{FeeStore, RevenueFilter};

/// Which completed payments to sum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevenueQuery {
    All,
    /// Payment dates within the range, both ends inclusive
    DateRange(DateRange),
    /// Payments on fees of the academic year
    AcademicYear(AcademicYear),
    /// Payments dated between September 1 and June 30 of the academic year
    /// containing today
    CurrentAcademicYear,
}

impl RevenueQuery {
    /// Builds a date-range query, rejecting `start > end`
    pub fn between(start: NaiveDate, end: NaiveDate) -> Result<Self, FeeError> {
        Ok(RevenueQuery::DateRange(DateRange::new(start, end)?))
    }
}

/// Read-only revenue aggregation
#[derive(Clone)]
pub struct RevenueAggregator {
    store: Arc<dyn FeeStore>,
    clock: Arc<dyn Clock>,
}

impl RevenueAggregator {
    pub fn new(store: Arc<dyn FeeStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Sum of completed payment amounts matching `query`
    #[instrument(skip(self))]
    pub async fn revenue(&self, query: RevenueQuery) -> Result<Money, FeeError> {
        let filter = match query {
            RevenueQuery::All => RevenueFilter::All,
            RevenueQuery::DateRange(range) => RevenueFilter::PaymentDates(range),
            RevenueQuery::AcademicYear(year) => RevenueFilter::AcademicYear(year),
            RevenueQuery::CurrentAcademicYear => {
                RevenueFilter::PaymentDates(AcademicYear::containing(self.clock.today()).date_range()?)
            }
        };

        let total = self.store.revenue(filter).await?;
        debug!(?filter, %total, "Computed revenue");
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_between_rejects_inverted_range() {
        let start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert!(matches!(
            RevenueQuery::between(start, end),
            Err(FeeError::InvalidDateRange(_))
        ));
        assert!(RevenueQuery::between(end, start).is_ok());
    }
}
