use chrono::{Datelike, Duration, NaiveDate};

/// Monday on or before `date`.
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Spread `n` dinners over Monday..Sunday; day `i` is `floor(i * 7 / n)`.
pub fn assign_days(n: usize) -> Vec<u8> {
    (0..n).map(|i| ((i * 7) / n) as u8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn week_starts_on_monday() {
        // 2025-03-03 is a Monday
        assert_eq!(week_start_of(d(2025, 3, 3)), d(2025, 3, 3));
        assert_eq!(week_start_of(d(2025, 3, 5)), d(2025, 3, 3));
        assert_eq!(week_start_of(d(2025, 3, 9)), d(2025, 3, 3));
        // crosses a month boundary
        assert_eq!(week_start_of(d(2025, 3, 1)), d(2025, 2, 24));
    }

    #[test]
    fn days_are_spread_and_distinct() {
        assert_eq!(assign_days(1), vec![0]);
        assert_eq!(assign_days(3), vec![0, 2, 4]);
        assert_eq!(assign_days(4), vec![0, 1, 3, 5]);
        assert_eq!(assign_days(7), vec![0, 1, 2, 3, 4, 5, 6]);
        assert!(assign_days(0).is_empty());
    }
}
