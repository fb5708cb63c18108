use jiff::civil::{Date, Weekday};

use crate::field::WEEKDAYS;

/// A weekday pinned to its Nth appearance within a calendar month.
///
/// A positive `nth` counts from the start of the month (`1..=5`) and a
/// negative `nth` counts from the end (`-5..=-1`). The `L` ("last")
/// selector is normalized to `-1` during parsing, so `sun#L` and `sun#-1`
/// are the same value.
///
/// The derived `Ord` has no calendar meaning; it exists so that
/// collections of `NthWeekday` can be sorted and deduplicated into a
/// canonical form.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub(crate) struct NthWeekday {
    weekday: i8,
    nth: i8,
}

impl NthWeekday {
    pub(crate) fn new(weekday: i8, nth: i8) -> NthWeekday {
        debug_assert!((0..=6).contains(&weekday));
        debug_assert!((1..=5).contains(&nth) || (-5..=-1).contains(&nth));
        NthWeekday { weekday, nth }
    }

    /// The weekday being constrained, `0=Sunday` through `6=Saturday`.
    pub(crate) fn weekday(&self) -> i8 {
        self.weekday
    }

    /// Returns true if `date` falls on this weekday at this occurrence
    /// position within `date`'s month.
    pub(crate) fn matches(&self, date: Date) -> bool {
        if self.weekday != weekday_number(date.weekday()) {
            return false;
        }
        let (nth, nth_back) = positions(date);
        self.nth == nth || self.nth == nth_back
    }
}

impl std::fmt::Display for NthWeekday {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}#{}", WEEKDAYS[self.weekday as usize], self.nth)
    }
}

/// Returns the forward and backward occurrence positions of `date`'s
/// weekday within its month.
///
/// The forward position is 1-based from the start of the month and the
/// backward position is negative, 1-based from the end. For example, the
/// last Thursday of a 31-day month that starts on a Thursday is `(5, -1)`,
/// and the first is `(1, -5)`.
pub(crate) fn positions(date: Date) -> (i8, i8) {
    let nth = (date.day() - 1) / 7 + 1;
    let nth_back = -((date.days_in_month() - date.day()) / 7 + 1);
    (nth, nth_back)
}

/// Converts a jiff weekday to this crate's cron numbering, `0=Sunday`
/// through `6=Saturday`.
pub(crate) fn weekday_number(weekday: Weekday) -> i8 {
    weekday.to_sunday_zero_offset()
}
