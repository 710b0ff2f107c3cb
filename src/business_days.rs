//! Business-day arithmetic for statutory ARCO deadlines.
//!
//! Weekends never count. Official holidays can be registered per calendar;
//! the default calendar has none.

use std::collections::BTreeSet;

use chrono::{Datelike, Days, NaiveDate, Weekday};

#[derive(Debug, Clone, Default)]
pub struct BusinessCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl BusinessCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_holidays<I>(holidays: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }

    /// The date `days` business days after `start`. `start` itself never counts.
    pub fn add_business_days(&self, start: NaiveDate, days: u32) -> NaiveDate {
        let mut date = start;
        let mut remaining = days;
        while remaining > 0 {
            date = date + Days::new(1);
            if self.is_business_day(date) {
                remaining -= 1;
            }
        }
        date
    }

    /// Signed business days from `from` to `to`: positive when `to` is later.
    /// Counts business days in `(from, to]` (or `(to, from]` negated).
    pub fn business_days_between(&self, from: NaiveDate, to: NaiveDate) -> i64 {
        let (lo, hi, sign) = if from <= to { (from, to, 1) } else { (to, from, -1) };
        let count = lo
            .iter_days()
            .skip(1)
            .take_while(|d| *d <= hi)
            .filter(|d| self.is_business_day(*d))
            .count() as i64;
        sign * count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn skips_weekends() {
        let cal = BusinessCalendar::new();
        // Friday + 1 business day = Monday
        assert_eq!(cal.add_business_days(date(2024, 3, 1), 1), date(2024, 3, 4));
        // Monday + 5 = next Monday
        assert_eq!(cal.add_business_days(date(2024, 3, 4), 5), date(2024, 3, 11));
    }

    #[test]
    fn twenty_business_days_is_four_weeks() {
        let cal = BusinessCalendar::new();
        assert_eq!(cal.add_business_days(date(2024, 3, 4), 20), date(2024, 4, 1));
    }

    #[test]
    fn start_on_weekend_counts_from_next_monday() {
        let cal = BusinessCalendar::new();
        // Saturday + 1 = Monday
        assert_eq!(cal.add_business_days(date(2024, 3, 2), 1), date(2024, 3, 4));
    }

    #[test]
    fn holidays_are_skipped() {
        // 2024-03-18: Natalicio de Benito Juárez (observed)
        let cal = BusinessCalendar::with_holidays([date(2024, 3, 18)]);
        assert!(!cal.is_business_day(date(2024, 3, 18)));
        assert_eq!(cal.add_business_days(date(2024, 3, 15), 1), date(2024, 3, 19));
    }

    #[test]
    fn zero_days_is_identity() {
        let cal = BusinessCalendar::new();
        assert_eq!(cal.add_business_days(date(2024, 3, 2), 0), date(2024, 3, 2));
    }

    #[test]
    fn business_days_between_is_signed() {
        let cal = BusinessCalendar::new();
        assert_eq!(cal.business_days_between(date(2024, 3, 4), date(2024, 3, 11)), 5);
        assert_eq!(cal.business_days_between(date(2024, 3, 11), date(2024, 3, 4)), -5);
        assert_eq!(cal.business_days_between(date(2024, 3, 4), date(2024, 3, 4)), 0);
        // Friday → Saturday: no business day in between
        assert_eq!(cal.business_days_between(date(2024, 3, 1), date(2024, 3, 2)), 0);
    }
}
