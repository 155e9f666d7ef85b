//! Revenue DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::AcademicYear;
use domain_fees::RevenueQuery;

use crate::error::ApiError;

/// Named revenue scopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenueScope {
    All,
    CurrentYear,
}

/// `GET /revenue` parameters; at most one selector may be given
#[derive(Debug, Default, Deserialize)]
pub struct RevenueParams {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Label such as `2025-2026`
    pub academic_year: Option<String>,
    pub scope: Option<RevenueScope>,
}

impl RevenueParams {
    /// Resolves the parameters to a query; no parameters means all time
    pub fn to_query(&self) -> Result<RevenueQuery, ApiError> {
        match (self.start, self.end, self.academic_year.as_deref(), self.scope) {
            (Some(start), Some(end), None, None) => Ok(RevenueQuery::between(start, end)?),
            (Some(_), None, _, _) | (None, Some(_), _, _) => Err(ApiError::BadRequest(
                "start and end must be given together".to_string(),
            )),
            (None, None, Some(label), None) => label
                .parse::<AcademicYear>()
                .map(RevenueQuery::AcademicYear)
                .map_err(|e| ApiError::BadRequest(e.to_string())),
            (None, None, None, Some(RevenueScope::CurrentYear)) => Ok(RevenueQuery::CurrentAcademicYear),
            (None, None, None, Some(RevenueScope::All) | None) => Ok(RevenueQuery::All),
            _ => Err(ApiError::BadRequest(
                "use one of start/end, academic_year or scope".to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RevenueResponse {
    pub total: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    #[test]
    fn test_no_params_means_all() {
        assert_eq!(RevenueParams::default().to_query().unwrap(), RevenueQuery::All);
    }

    #[test]
    fn test_range_and_year_resolve() {
        let range = RevenueParams {
            start: Some(date(9, 1)),
            end: Some(date(9, 30)),
            ..Default::default()
        };
        assert!(matches!(range.to_query().unwrap(), RevenueQuery::DateRange(_)));

        let year = RevenueParams {
            academic_year: Some("2025-2026".to_string()),
            ..Default::default()
        };
        assert_eq!(year.to_query().unwrap(), RevenueQuery::AcademicYear(AcademicYear::new(2025)));
    }

    #[test]
    fn test_inverted_range_is_validation_error() {
        let params = RevenueParams {
            start: Some(date(10, 1)),
            end: Some(date(9, 1)),
            ..Default::default()
        };
        assert!(matches!(params.to_query(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_half_range_and_mixed_selectors_rejected() {
        let half = RevenueParams {
            start: Some(date(9, 1)),
            ..Default::default()
        };
        assert!(matches!(half.to_query(), Err(ApiError::BadRequest(_))));

        let mixed = RevenueParams {
            academic_year: Some("2025-2026".to_string()),
            scope: Some(RevenueScope::All),
            ..Default::default()
        };
        assert!(matches!(mixed.to_query(), Err(ApiError::BadRequest(_))));
    }
}
