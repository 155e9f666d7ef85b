//! Billing cadence
//!
//! The cadence is the single source for how many billing periods a fee
//! covers, how many installments it is split into and when each one falls due.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{add_months, TemporalError};

/// Recurrence pattern of a fee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cadence {
    /// Once a month over the ten-month school year
    Monthly,
    /// Every three months
    Quarterly,
    /// Every six months
    Semester,
    /// Once a year
    Annually,
    /// A single charge
    OneTime,
}

impl Cadence {
    pub const ALL: [Cadence; 5] = [
        Cadence::Monthly,
        Cadence::Quarterly,
        Cadence::Semester,
        Cadence::Annually,
        Cadence::OneTime,
    ];

    /// Number of times the fee type's unit amount is charged
    pub fn billing_periods(&self) -> u32 {
        match self {
            Cadence::Monthly => 10,
            Cadence::Quarterly => 4,
            Cadence::Semester => 2,
            Cadence::Annually | Cadence::OneTime => 1,
        }
    }

    /// Number of installments the net amount is split into
    ///
    /// Monthly fees bill ten school months but are spread over twelve
    /// installments.
    pub fn installment_count(&self) -> u32 {
        match self {
            Cadence::Monthly => 12,
            Cadence::Quarterly => 4,
            Cadence::Semester => 2,
            Cadence::Annually | Cadence::OneTime => 1,
        }
    }

    /// Months between consecutive due dates, `None` for one-time fees
    pub fn stride_months(&self) -> Option<u32> {
        match self {
            Cadence::Monthly => Some(1),
            Cadence::Quarterly => Some(3),
            Cadence::Semester => Some(6),
            Cadence::Annually => Some(12),
            Cadence::OneTime => None,
        }
    }

    /// Due date of the 1-based installment `index` for a plan starting at `start`
    ///
    /// One-time fees fall due `one_time_due_days` after `start`.
    pub fn due_date(
        &self,
        start: NaiveDate,
        index: u32,
        one_time_due_days: u32,
    ) -> Result<NaiveDate, TemporalError> {
        match self.stride_months() {
            Some(stride) => add_months(start, stride * index),
            None => start
                .checked_add_days(Days::new(u64::from(one_time_due_days)))
                .ok_or(TemporalError::OutOfRange),
        }
    }

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Cadence::Monthly => "monthly",
            Cadence::Quarterly => "quarterly",
            Cadence::Semester => "semester",
            Cadence::Annually => "annually",
            Cadence::OneTime => "oneTime",
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unknown cadence name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown cadence: {0}")]
pub struct UnknownCadence(pub String);

impl FromStr for Cadence {
    type Err = UnknownCadence;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cadence::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCadence(s.to_string()))
    }
}
