//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data for the fee ledger.
//! These fixtures are designed to be consistent and predictable for unit tests.

use chrono::NaiveDate;
use core_kernel::{AcademicYear, FixedClock, Money, StudentId, UserId};
use domain_fees::{FeeCategory, FeeType};
use rust_decimal_macros::dec;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Quarterly tuition unit: four quarters make 1000
    pub fn tuition_unit() -> Money {
        Money::new(dec!(250.00))
    }

    /// Monthly bus unit
    pub fn transport_unit() -> Money {
        Money::new(dec!(40.00))
    }

    /// One-off registration charge
    pub fn registration() -> Money {
        Money::new(dec!(150.00))
    }

    pub fn zero() -> Money {
        Money::ZERO
    }
}

/// Fixture for calendar test data
pub struct DateFixtures;

impl DateFixtures {
    /// First day of the 2025-2026 academic year
    pub fn term_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()
    }

    /// The default "today" of ledger tests
    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 1).unwrap()
    }

    /// Far enough past every installment of a 2025 plan
    pub fn after_year_end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, 1).unwrap()
    }

    pub fn academic_year() -> AcademicYear {
        AcademicYear::new(2025)
    }

    /// A clock frozen at `today()`
    pub fn clock() -> FixedClock {
        FixedClock::new(Self::today())
    }
}

/// Fixture for fee type catalog entries
pub struct FeeTypeFixtures;

impl FeeTypeFixtures {
    pub fn tuition() -> FeeType {
        FeeType::new("Tuition", FeeCategory::Tuition, MoneyFixtures::tuition_unit())
    }

    pub fn transport() -> FeeType {
        FeeType::new("School bus", FeeCategory::Transport, MoneyFixtures::transport_unit())
    }

    pub fn registration() -> FeeType {
        FeeType::new("Registration", FeeCategory::Registration, MoneyFixtures::registration())
    }

    /// The three fee types above
    pub fn catalog() -> Vec<FeeType> {
        vec![Self::tuition(), Self::transport(), Self::registration()]
    }
}

/// Fixture for identifiers
pub struct IdFixtures;

impl IdFixtures {
    pub fn student_id() -> StudentId {
        StudentId::new()
    }

    pub fn clerk_id() -> UserId {
        UserId::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_fees::{gross_amount, Cadence};

    #[test]
    fn test_tuition_fixture_makes_a_thousand_per_year_quarterly() {
        let gross = gross_amount(MoneyFixtures::tuition_unit(), Cadence::Quarterly).unwrap();
        assert_eq!(gross.amount(), dec!(1000));
    }

    #[test]
    fn test_today_falls_in_fixture_year() {
        assert_eq!(AcademicYear::containing(DateFixtures::today()), DateFixtures::academic_year());
        assert!(DateFixtures::term_start() < DateFixtures::today());
    }

    #[test]
    fn test_catalog_ids_are_distinct() {
        let catalog = FeeTypeFixtures::catalog();
        assert_ne!(catalog[0].id, catalog[1].id);
        assert_ne!(catalog[1].id, catalog[2].id);
    }
}
