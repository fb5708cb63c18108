/*!
The cascading occurrence search shared by `Schedule::next_time` and
`Schedule::previous_time`.

The working instant is a civil (year, month, day, hour, minute, second)
tuple in the schedule's effective time zone; zone resolution happens at the
edges, in `Schedule`. Each pass walks the components from most significant
to least, advancing the first mismatched component to its nearest
admissible value. A component with no admissible value left carries into
the next more significant component like an odometer, resetting everything
below it and restarting validation from the top: changing the month (or
year) changes the meaning of `L` and of weekday occurrence positions, so
day-of-month and day-of-week are always re-validated together after a
carry.

Carries jump straight to the next candidate month or day. There is never a
per-second (or per-day) scan across a multi-year gap, which keeps sparse
schedules like `10 12 13 12 *` cheap.
*/

use jiff::{
    ToSpan,
    civil::{Date, DateTime},
};

use crate::schedule::Fields;

/// Upper bound on odometer steps for a single search.
///
/// The Gregorian calendar's weekday/leap-year alignment repeats every 400
/// years and a search crosses at most a few dozen candidate dates per
/// year, so any satisfiable schedule terminates well under this bound.
/// Exhausting it means the predicate combination is unsatisfiable (for
/// example `0 0 30 2 *`), which construction cannot rule out; callers
/// treat that as an internal invariant failure.
const MAX_STEPS: usize = 50_000;

/// How far, in years, a search may wander from its starting point before
/// it is declared unsatisfiable.
const MAX_YEARS: i16 = 500;

impl Fields {
    /// Returns the earliest civil datetime at or after `start` matching
    /// every field predicate, or `None` if the search bound was exhausted
    /// (or the calendar ran out).
    pub(crate) fn next_after(&self, start: DateTime) -> Option<DateTime> {
        let mut dt = start;
        for _ in 0..MAX_STEPS {
            if dt.year() - start.year() > MAX_YEARS {
                return None;
            }
            match next_in(&self.months, dt.month()) {
                Some(month) if month == dt.month() => {}
                Some(month) => {
                    dt = month_start(dt.year(), month)?;
                    continue;
                }
                None => {
                    let month = self.months.first().copied().unwrap_or(1);
                    dt = month_start(dt.year().checked_add(1)?, month)?;
                    continue;
                }
            }
            match self.next_day_in_month(dt.date()) {
                Some(day) if day == dt.day() => {}
                Some(day) => {
                    let date = Date::new(dt.year(), dt.month(), day).ok()?;
                    dt = date.at(0, 0, 0, 0);
                    continue;
                }
                None => {
                    dt = start_of_following_month(dt.date())?;
                    continue;
                }
            }
            match next_in(&self.hours, dt.hour()) {
                Some(hour) if hour == dt.hour() => {}
                Some(hour) => {
                    dt = dt.date().at(hour, 0, 0, 0);
                    continue;
                }
                None => {
                    dt = dt.date().tomorrow().ok()?.at(0, 0, 0, 0);
                    continue;
                }
            }
            match next_in(&self.minutes, dt.minute()) {
                Some(minute) if minute == dt.minute() => {}
                Some(minute) => {
                    dt = dt.date().at(dt.hour(), minute, 0, 0);
                    continue;
                }
                None => {
                    let hour_start = dt.date().at(dt.hour(), 0, 0, 0);
                    dt = hour_start.checked_add(1.hour()).ok()?;
                    continue;
                }
            }
            match next_in(&self.seconds, dt.second()) {
                Some(second) if second == dt.second() => return Some(dt),
                Some(second) => {
                    return Some(
                        dt.date().at(dt.hour(), dt.minute(), second, 0),
                    );
                }
                None => {
                    let minute_start =
                        dt.date().at(dt.hour(), dt.minute(), 0, 0);
                    dt = minute_start.checked_add(1.minute()).ok()?;
                    continue;
                }
            }
        }
        None
    }

    /// Returns the latest civil datetime at or before `start` matching
    /// every field predicate. The mirror image of
    /// [`Fields::next_after`]: carries reset lower components to their
    /// maxima and move toward the past.
    pub(crate) fn previous_before(&self, start: DateTime) -> Option<DateTime> {
        let mut dt = start;
        for _ in 0..MAX_STEPS {
            if start.year() - dt.year() > MAX_YEARS {
                return None;
            }
            match prev_in(&self.months, dt.month()) {
                Some(month) if month == dt.month() => {}
                Some(month) => {
                    dt = month_end(dt.year(), month)?;
                    continue;
                }
                None => {
                    let month = self.months.last().copied().unwrap_or(12);
                    dt = month_end(dt.year().checked_sub(1)?, month)?;
                    continue;
                }
            }
            match self.prev_day_in_month(dt.date()) {
                Some(day) if day == dt.day() => {}
                Some(day) => {
                    let date = Date::new(dt.year(), dt.month(), day).ok()?;
                    dt = date.at(23, 59, 59, 0);
                    continue;
                }
                None => {
                    dt = end_of_preceding_month(dt.date())?;
                    continue;
                }
            }
            match prev_in(&self.hours, dt.hour()) {
                Some(hour) if hour == dt.hour() => {}
                Some(hour) => {
                    dt = dt.date().at(hour, 59, 59, 0);
                    continue;
                }
                None => {
                    dt = dt.date().yesterday().ok()?.at(23, 59, 59, 0);
                    continue;
                }
            }
            match prev_in(&self.minutes, dt.minute()) {
                Some(minute) if minute == dt.minute() => {}
                Some(minute) => {
                    dt = dt.date().at(dt.hour(), minute, 59, 0);
                    continue;
                }
                None => {
                    let hour_start = dt.date().at(dt.hour(), 0, 0, 0);
                    dt = hour_start.checked_sub(1.second()).ok()?;
                    continue;
                }
            }
            match prev_in(&self.seconds, dt.second()) {
                Some(second) if second == dt.second() => return Some(dt),
                Some(second) => {
                    return Some(
                        dt.date().at(dt.hour(), dt.minute(), second, 0),
                    );
                }
                None => {
                    let minute_start =
                        dt.date().at(dt.hour(), dt.minute(), 0, 0);
                    dt = minute_start.checked_sub(1.second()).ok()?;
                    continue;
                }
            }
        }
        None
    }

    /// The first day at or after `from.day()` within `from`'s month that
    /// satisfies the combined date predicates, if any.
    fn next_day_in_month(&self, from: Date) -> Option<i8> {
        (from.day()..=from.days_in_month()).find(|&day| {
            Date::new(from.year(), from.month(), day)
                .is_ok_and(|date| self.date_matches(date))
        })
    }

    /// The last day at or before `from.day()` within `from`'s month that
    /// satisfies the combined date predicates, if any.
    fn prev_day_in_month(&self, from: Date) -> Option<i8> {
        (1..=from.day()).rev().find(|&day| {
            Date::new(from.year(), from.month(), day)
                .is_ok_and(|date| self.date_matches(date))
        })
    }
}

/// Smallest admissible value at or after `value`, or `None` to carry. An
/// empty set admits everything.
fn next_in(set: &[i8], value: i8) -> Option<i8> {
    if set.is_empty() {
        return Some(value);
    }
    set.iter().copied().find(|&admissible| admissible >= value)
}

/// Largest admissible value at or before `value`, or `None` to carry.
fn prev_in(set: &[i8], value: i8) -> Option<i8> {
    if set.is_empty() {
        return Some(value);
    }
    set.iter().rev().copied().find(|&admissible| admissible <= value)
}

fn month_start(year: i16, month: i8) -> Option<DateTime> {
    Some(Date::new(year, month, 1).ok()?.at(0, 0, 0, 0))
}

fn month_end(year: i16, month: i8) -> Option<DateTime> {
    let first = Date::new(year, month, 1).ok()?;
    let last = Date::new(year, month, first.days_in_month()).ok()?;
    Some(last.at(23, 59, 59, 0))
}

fn start_of_following_month(date: Date) -> Option<DateTime> {
    if date.month() == 12 {
        month_start(date.year().checked_add(1)?, 1)
    } else {
        month_start(date.year(), date.month() + 1)
    }
}

fn end_of_preceding_month(date: Date) -> Option<DateTime> {
    if date.month() == 1 {
        month_end(date.year().checked_sub(1)?, 12)
    } else {
        month_end(date.year(), date.month() - 1)
    }
}
