//! Tests for the academic calendar and money splitting used by schedules

use chrono::NaiveDate;
use core_kernel::{add_months, AcademicYear, Clock, DateRange, FixedClock, Money};
use rust_decimal_macros::dec;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

mod academic_year {
    use super::*;

    #[test]
    fn test_september_starts_new_year() {
        assert_eq!(AcademicYear::containing(date(2025, 8, 31)), AcademicYear::new(2024));
        assert_eq!(AcademicYear::containing(date(2025, 9, 1)), AcademicYear::new(2025));
    }

    #[test]
    fn test_summer_belongs_to_previous_year() {
        assert_eq!(AcademicYear::containing(date(2025, 7, 14)).to_string(), "2024-2025");
    }

    #[test]
    fn test_range_excludes_summer() {
        let range = AcademicYear::new(2024).date_range().unwrap();
        assert!(range.contains(date(2025, 6, 30)));
        assert!(!range.contains(date(2025, 7, 1)));
        assert!(!range.contains(date(2024, 8, 31)));
    }

    #[test]
    fn test_serde_as_label() {
        let json = serde_json::to_string(&AcademicYear::new(2025)).unwrap();
        assert_eq!(json, "\"2025-2026\"");

        let back: AcademicYear = serde_json::from_str("\"2023-2024\"").unwrap();
        assert_eq!(back.start_year(), 2023);
        assert!(serde_json::from_str::<AcademicYear>("\"2023-2023\"").is_err());
    }
}

mod date_range {
    use super::*;

    #[test]
    fn test_single_day_range() {
        let range = DateRange::new(date(2025, 5, 5), date(2025, 5, 5)).unwrap();
        assert!(range.contains(date(2025, 5, 5)));
    }

    #[test]
    fn test_inverted_range_rejected() {
        assert!(DateRange::new(date(2025, 5, 6), date(2025, 5, 5)).is_err());
    }
}

mod schedule_arithmetic {
    use super::*;

    #[test]
    fn test_quarterly_offsets() {
        let start = date(2025, 9, 30);
        let dues: Vec<_> = (1..=4).map(|i| add_months(start, 3 * i).unwrap()).collect();
        assert_eq!(
            dues,
            vec![date(2025, 12, 30), date(2026, 3, 30), date(2026, 6, 30), date(2026, 9, 30)]
        );
    }

    #[test]
    fn test_ten_monthly_parts_of_two_decimal_amount() {
        let parts = Money::new(dec!(1000.05)).split_remainder_last(10, 2).unwrap();
        assert_eq!(parts[0].amount(), dec!(100.00));
        assert_eq!(parts[9].amount(), dec!(100.05));
        assert_eq!(parts.iter().sum::<Money>(), Money::new(dec!(1000.05)));
    }

    #[test]
    fn test_fixed_clock_drives_today() {
        let clock = FixedClock::new(date(2026, 1, 10));
        assert_eq!(AcademicYear::containing(clock.today()).to_string(), "2025-2026");
    }
}
