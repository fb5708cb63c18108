use std::sync::Arc;

use jiff::{
    SignedDuration, ToSpan, Zoned,
    civil::{Date, DateTime},
    tz::TimeZone,
};

use crate::{
    error::Error,
    field::{self, Field},
    occurrence::{self, NthWeekday},
};

/// A parsed cron schedule.
///
/// A schedule is six field predicates (second, minute, hour, day of month,
/// month, day of week) plus an optional IANA time zone. It is immutable
/// once constructed and cheap to clone; clones share the parsed
/// representation, so one schedule can be evaluated concurrently from any
/// number of threads without synchronization.
///
/// Expressions have five fields (minute granularity, with seconds pinned
/// to `0`) or six fields (leading explicit seconds), optionally followed
/// by a time zone:
///
/// ```text
/// ┌───────────── second (0-59, six-field form only)
/// │ ┌─────────── minute (0-59)
/// │ │ ┌───────── hour (0-23, 24 ≡ midnight next day)
/// │ │ │ ┌─────── day of month (1-31, or L for the last day)
/// │ │ │ │ ┌───── month (1-12 or jan-dec)
/// │ │ │ │ │ ┌─── day of week (0-7 or sun-sat, 0 and 7 are Sunday)
/// │ │ │ │ │ │
/// * * * * * *   [time zone]
/// ```
///
/// When no time zone is declared, a schedule is evaluated in whatever zone
/// the instant it is asked about is expressed in.
///
/// ```
/// use cronline::Schedule;
///
/// let schedule: Schedule = "0 9 * * mon-fri".parse()?;
/// let now = jiff::civil::date(2025, 6, 6).at(17, 0, 0, 0).in_tz("UTC")?;
/// let next = schedule.next_time(&now);
/// assert_eq!(next.to_string(), "2025-06-09T09:00:00+00:00[UTC]");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Schedule {
    inner: Arc<Inner>,
}

#[derive(Debug, Eq, PartialEq)]
struct Inner {
    fields: Fields,
    tz: Option<TimeZone>,
    expression: String,
}

/// The six parsed field predicates.
///
/// Each component set is ascending and deduplicated; an empty set admits
/// every value in its domain. The day-of-month and day-of-week fields
/// carry their special tokens out of band: `last_day` for `L` and
/// `nth_weekdays` for occurrence-constrained entries.
#[derive(Debug, Eq, PartialEq)]
pub(crate) struct Fields {
    pub(crate) seconds: Box<[i8]>,
    pub(crate) minutes: Box<[i8]>,
    pub(crate) hours: Box<[i8]>,
    pub(crate) days: Box<[i8]>,
    pub(crate) last_day: bool,
    pub(crate) months: Box<[i8]>,
    pub(crate) weekdays: Box<[i8]>,
    pub(crate) nth_weekdays: Box<[NthWeekday]>,
}

impl Schedule {
    /// Parses a cron expression.
    ///
    /// Parsing is eager and atomic: the returned schedule is fully
    /// validated, and none of the evaluation methods can fail.
    pub fn new(expression: &str) -> Result<Schedule, Error> {
        let mut tokens: Vec<&str> = expression.split_whitespace().collect();
        let mut tz = None;
        match tokens.len() {
            7 => {
                // Six fields plus a mandatory time zone.
                let name = tokens.pop().unwrap();
                let zone = TimeZone::get(name).map_err(|_| {
                    Error::UnknownTimeZone { name: name.to_string() }
                })?;
                tz = Some(zone);
            }
            6 => {
                // Either six fields, or five fields plus a time zone. A
                // trailing token that resolves in the zone database wins.
                if let Ok(zone) = TimeZone::get(tokens[5]) {
                    tokens.pop();
                    tz = Some(zone);
                }
            }
            _ => {}
        }
        let fields = match tokens.len() {
            5 => Fields::parse(None, &tokens)?,
            6 => Fields::parse(Some(tokens[0]), &tokens[1..])?,
            got => {
                return Err(Error::FieldCount {
                    expression: expression.to_string(),
                    got,
                });
            }
        };
        log::trace!("parsed cron expression `{expression}`");
        Ok(Schedule {
            inner: Arc::new(Inner {
                fields,
                tz,
                expression: expression.to_string(),
            }),
        })
    }

    /// The expression this schedule was parsed from, verbatim.
    pub fn expression(&self) -> &str {
        &self.inner.expression
    }

    /// The schedule's declared time zone, if any.
    pub fn time_zone(&self) -> Option<&TimeZone> {
        self.inner.tz.as_ref()
    }

    /// Returns true if the given instant belongs to this schedule.
    ///
    /// The instant is interpreted in the schedule's declared time zone,
    /// or, when none was declared, in the instant's own. Sub-second
    /// precision is ignored.
    pub fn matches(&self, instant: &Zoned) -> bool {
        let tz = self.effective_time_zone(instant);
        self.inner.fields.civil_matches(instant.with_time_zone(tz).datetime())
    }

    /// Returns the earliest scheduled instant strictly after `from`.
    ///
    /// The result is at the schedule's granularity (whole seconds, or
    /// whole minutes for five-field schedules) and is expressed in the
    /// same time zone as `from`, whatever zone the schedule itself was
    /// evaluated in.
    pub fn next_time(&self, from: &Zoned) -> Zoned {
        self.search(from, true)
    }

    /// Returns the latest scheduled instant strictly before `from`. The
    /// mirror image of [`Schedule::next_time`].
    pub fn previous_time(&self, from: &Zoned) -> Zoned {
        self.search(from, false)
    }

    /// Returns the minimum possible gap between two consecutive scheduled
    /// instants.
    ///
    /// This is derived from the most restrictive field alone, without
    /// searching: `* * * * *` is one minute, a fixed minute is an hour, a
    /// fixed hour-and-minute with free days is 24 hours, and so on.
    pub fn frequency(&self) -> SignedDuration {
        SignedDuration::from_secs(self.inner.fields.min_gap())
    }

    /// Returns the fully expanded, canonical view of this schedule.
    ///
    /// This is a diagnostic surface: it makes parser behavior observable
    /// independent of expression formatting, and is how the test suite
    /// pins down normalization.
    pub fn normalized(&self) -> Normalized {
        let fields = &self.inner.fields;
        let set = |values: &[i8]| (!values.is_empty()).then(|| values.to_vec());
        Normalized {
            seconds: set(&fields.seconds),
            minutes: set(&fields.minutes),
            hours: set(&fields.hours),
            days: (!fields.day_is_wildcard()).then(|| fields.days.to_vec()),
            last_day: fields.last_day,
            months: set(&fields.months),
            weekdays: set(&fields.weekdays),
            nth_weekdays: (!fields.nth_weekdays.is_empty())
                .then(|| fields.nth_weekdays.to_vec()),
            time_zone: self
                .inner
                .tz
                .as_ref()
                .and_then(|tz| tz.iana_name())
                .map(String::from),
        }
    }

    fn effective_time_zone(&self, instant: &Zoned) -> TimeZone {
        self.inner
            .tz
            .clone()
            .unwrap_or_else(|| instant.time_zone().clone())
    }

    fn search(&self, from: &Zoned, forward: bool) -> Zoned {
        let tz = self.effective_time_zone(from);
        let civil = truncate(from.with_time_zone(tz.clone()).datetime());
        let found = if forward {
            civil
                .checked_add(1.second())
                .ok()
                .and_then(|start| self.inner.fields.next_after(start))
        } else {
            civil
                .checked_sub(1.second())
                .ok()
                .and_then(|start| self.inner.fields.previous_before(start))
        };
        let Some(found) = found else { self.defect(forward) };
        // A zone transition can make the found civil time ambiguous or
        // nonexistent; resolve it the way most cron daemons do.
        match tz.to_ambiguous_zoned(found).compatible() {
            Ok(zdt) => zdt.with_time_zone(from.time_zone().clone()),
            Err(_) => self.defect(forward),
        }
    }

    /// The search bound is unreachable for any satisfiable schedule, so
    /// exhausting it is an engine invariant failure rather than an error
    /// the caller could meaningfully handle.
    #[cold]
    fn defect(&self, forward: bool) -> ! {
        let direction = if forward { "next" } else { "previous" };
        log::error!(
            "cron schedule `{}` exhausted its {direction} occurrence \
             search bound; this is a bug in the schedule engine or an \
             unsatisfiable field combination",
            self.inner.expression,
        );
        panic!(
            "cron schedule `{}` has no reachable {direction} occurrence",
            self.inner.expression,
        );
    }
}

impl std::str::FromStr for Schedule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Schedule, Error> {
        Schedule::new(s)
    }
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.inner.expression)
    }
}

impl serde::Serialize for Schedule {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Schedule {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Schedule, D::Error> {
        use serde::de;

        struct Visitor;

        impl<'de> de::Visitor<'de> for Visitor {
            type Value = Schedule;

            fn expecting(
                &self,
                f: &mut std::fmt::Formatter,
            ) -> std::fmt::Result {
                f.write_str("a cron expression string")
            }

            fn visit_str<E: de::Error>(
                self,
                value: &str,
            ) -> Result<Schedule, E> {
                Schedule::new(value).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(Visitor)
    }
}

impl Fields {
    fn parse(second: Option<&str>, rest: &[&str]) -> Result<Fields, Error> {
        let seconds = match second {
            // Five-field schedules fire at second zero of each matching
            // minute.
            None => vec![0],
            Some(text) => field::parse(Field::Second, text)?.values,
        };
        let minutes = field::parse(Field::Minute, rest[0])?.values;
        let hours = field::parse(Field::Hour, rest[1])?.values;
        let day = field::parse(Field::DayOfMonth, rest[2])?;
        let months = field::parse(Field::Month, rest[3])?.values;
        let weekday = field::parse(Field::Weekday, rest[4])?;
        Ok(Fields {
            seconds: seconds.into_boxed_slice(),
            minutes: minutes.into_boxed_slice(),
            hours: hours.into_boxed_slice(),
            days: day.values.into_boxed_slice(),
            last_day: day.last_day,
            months: months.into_boxed_slice(),
            weekdays: weekday.values.into_boxed_slice(),
            nth_weekdays: weekday.nth_weekdays.into_boxed_slice(),
        })
    }

    pub(crate) fn civil_matches(&self, dt: DateTime) -> bool {
        admits(&self.seconds, dt.second())
            && admits(&self.minutes, dt.minute())
            && admits(&self.hours, dt.hour())
            && admits(&self.months, dt.month())
            && self.date_matches(dt.date())
    }

    /// Applies the day-of-month/day-of-week rule: when both sides are
    /// restricted, a date matches if either side accepts it; a wildcard
    /// side defers entirely to the other.
    pub(crate) fn date_matches(&self, date: Date) -> bool {
        let by_day = || {
            self.days.binary_search(&date.day()).is_ok()
                || (self.last_day && date.day() == date.days_in_month())
        };
        let by_weekday = || {
            self.weekdays
                .contains(&occurrence::weekday_number(date.weekday()))
                || self.nth_weekdays.iter().any(|nth| nth.matches(date))
        };
        match (self.day_is_wildcard(), self.weekday_is_wildcard()) {
            (true, true) => true,
            (true, false) => by_weekday(),
            (false, true) => by_day(),
            (false, false) => by_day() || by_weekday(),
        }
    }

    pub(crate) fn day_is_wildcard(&self) -> bool {
        self.days.is_empty() && !self.last_day
    }

    pub(crate) fn weekday_is_wildcard(&self) -> bool {
        self.weekdays.is_empty() && self.nth_weekdays.is_empty()
    }

    /// Minimum possible gap in seconds between two consecutive matches,
    /// derived from the finest-grained restricted field.
    fn min_gap(&self) -> i64 {
        match &*self.seconds {
            [] => return 1,
            set if set.len() > 1 => return circular_min_gap(set, 60),
            _ => {}
        }
        match &*self.minutes {
            [] => return 60,
            set if set.len() > 1 => return 60 * circular_min_gap(set, 60),
            _ => {}
        }
        match &*self.hours {
            [] => return 3_600,
            set if set.len() > 1 => return 3_600 * circular_min_gap(set, 24),
            _ => {}
        }
        86_400 * self.min_day_gap()
    }

    /// Minimum possible gap in days between two matching dates.
    fn min_day_gap(&self) -> i64 {
        match (self.day_is_wildcard(), self.weekday_is_wildcard()) {
            (true, true) => 1,
            // Under the OR-rule, the union of two date patterns can place
            // matches on adjacent days somewhere in the cycle.
            (false, false) => 1,
            (true, false) => self.weekday_gap(),
            (false, true) => self.day_of_month_gap(),
        }
    }

    fn weekday_gap(&self) -> i64 {
        let mut constrained: Vec<i8> = self.weekdays.to_vec();
        constrained.extend(self.nth_weekdays.iter().map(|nth| nth.weekday()));
        constrained.sort_unstable();
        constrained.dedup();
        if constrained.len() > 1 {
            return circular_min_gap(&constrained, 7);
        }
        // A single weekday recurs weekly, also across two occurrence
        // positions of it (last Sunday to first Sunday is seven days). A
        // single pinned occurrence recurs monthly, and February packs
        // consecutive occurrences as close as 28 days apart.
        if !self.weekdays.is_empty() || self.nth_weekdays.len() > 1 {
            7
        } else {
            28
        }
    }

    fn day_of_month_gap(&self) -> i64 {
        if self.days.is_empty() {
            // `L` alone: consecutive month ends are at least 28 days
            // apart (Jan 31 to Feb 28).
            return 28;
        }
        let mut gap = i64::MAX;
        for pair in self.days.windows(2) {
            gap = gap.min(i64::from(pair[1] - pair[0]));
        }
        let lo = i64::from(self.days[0]);
        let hi = i64::from(self.days[self.days.len() - 1]);
        if self.months.len() != 1 {
            // Wrapping into the following month: the shortest month still
            // containing the last admissible day has max(hi, 28) days.
            gap = gap.min(lo + (28 - hi).max(0));
            if self.last_day {
                gap = gap.min((28 - hi).max(1)).min(lo);
            }
        } else if self.last_day {
            gap = gap.min((28 - hi).max(1));
        }
        if gap == i64::MAX {
            // A single admissible day in a single admissible month.
            365
        } else {
            gap
        }
    }
}

pub(crate) fn admits(set: &[i8], value: i8) -> bool {
    set.is_empty() || set.binary_search(&value).is_ok()
}

/// Smallest distance between consecutive values of a sorted set that
/// repeats with the given cycle length.
fn circular_min_gap(set: &[i8], cycle: i64) -> i64 {
    let mut gap = cycle - i64::from(set[set.len() - 1] - set[0]);
    for pair in set.windows(2) {
        gap = gap.min(i64::from(pair[1] - pair[0]));
    }
    gap
}

fn truncate(dt: DateTime) -> DateTime {
    dt.date().at(dt.hour(), dt.minute(), dt.second(), 0)
}

/// The fully expanded, canonical view of a parsed schedule.
///
/// Every slot is sorted and deduplicated with ranges, steps and aliases
/// expanded away; `None` marks a wildcard. Two views are offered:
///
/// * `Display` renders a canonical cron expression. Re-parsing that
///   expression yields an identical `Normalized` value.
/// * `serde::Serialize` emits the eight-slot array
///   `[seconds, minutes, hours, days, months, weekdays, nth-weekdays,
///   time zone]`, with `L` as a trailing `"L"` element of the day slot
///   and occurrence entries as `"sun#2"`-style strings.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Normalized {
    seconds: Option<Vec<i8>>,
    minutes: Option<Vec<i8>>,
    hours: Option<Vec<i8>>,
    days: Option<Vec<i8>>,
    last_day: bool,
    months: Option<Vec<i8>>,
    weekdays: Option<Vec<i8>>,
    nth_weekdays: Option<Vec<NthWeekday>>,
    time_zone: Option<String>,
}

impl std::fmt::Display for Normalized {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        fn write_set(
            f: &mut std::fmt::Formatter,
            values: &Option<Vec<i8>>,
        ) -> std::fmt::Result {
            let Some(values) = values else { return f.write_str("*") };
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{value}")?;
            }
            Ok(())
        }

        write_set(f, &self.seconds)?;
        f.write_str(" ")?;
        write_set(f, &self.minutes)?;
        f.write_str(" ")?;
        write_set(f, &self.hours)?;
        f.write_str(" ")?;
        match &self.days {
            None => f.write_str("*")?,
            Some(days) => {
                for (i, day) in days.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{day}")?;
                }
                if self.last_day {
                    if !days.is_empty() {
                        f.write_str(",")?;
                    }
                    f.write_str("L")?;
                }
            }
        }
        f.write_str(" ")?;
        write_set(f, &self.months)?;
        f.write_str(" ")?;
        match (&self.weekdays, &self.nth_weekdays) {
            (None, None) => f.write_str("*")?,
            (weekdays, nth_weekdays) => {
                let mut first = true;
                for weekday in weekdays.iter().flatten() {
                    if !first {
                        f.write_str(",")?;
                    }
                    first = false;
                    write!(f, "{weekday}")?;
                }
                for nth in nth_weekdays.iter().flatten() {
                    if !first {
                        f.write_str(",")?;
                    }
                    first = false;
                    write!(f, "{nth}")?;
                }
            }
        }
        if let Some(tz) = &self.time_zone {
            write!(f, " {tz}")?;
        }
        Ok(())
    }
}

impl serde::Serialize for Normalized {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;

        struct Days<'a>(&'a [i8], bool);

        impl serde::Serialize for Days<'_> {
            fn serialize<S: serde::Serializer>(
                &self,
                serializer: S,
            ) -> Result<S::Ok, S::Error> {
                let len = self.0.len() + usize::from(self.1);
                let mut seq = serializer.serialize_seq(Some(len))?;
                for day in self.0 {
                    seq.serialize_element(day)?;
                }
                if self.1 {
                    seq.serialize_element("L")?;
                }
                seq.end()
            }
        }

        struct Labels<'a>(&'a [NthWeekday]);

        impl serde::Serialize for Labels<'_> {
            fn serialize<S: serde::Serializer>(
                &self,
                serializer: S,
            ) -> Result<S::Ok, S::Error> {
                serializer
                    .collect_seq(self.0.iter().map(|nth| nth.to_string()))
            }
        }

        let mut seq = serializer.serialize_seq(Some(8))?;
        seq.serialize_element(&self.seconds)?;
        seq.serialize_element(&self.minutes)?;
        seq.serialize_element(&self.hours)?;
        seq.serialize_element(
            &self.days.as_ref().map(|days| Days(days, self.last_day)),
        )?;
        seq.serialize_element(&self.months)?;
        seq.serialize_element(&self.weekdays)?;
        seq.serialize_element(
            &self.nth_weekdays.as_ref().map(|nth| Labels(nth)),
        )?;
        seq.serialize_element(&self.time_zone)?;
        seq.end()
    }
}
