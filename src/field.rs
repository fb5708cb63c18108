use crate::{error::Error, occurrence::NthWeekday};

/// Three letter month names, in cron's (and everyone else's) order.
/// Month names map to `1..=12`.
pub(crate) const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct",
    "nov", "dec",
];

/// Three letter weekday names, mapping to `0=Sunday..6=Saturday`.
pub(crate) const WEEKDAYS: [&str; 7] =
    ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// Which calendar component a cron field constrains.
///
/// This mostly exists to parameterize the parser (domains, name tables,
/// which special tokens are admissible) and to identify the offending
/// field in errors.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Field {
    Second,
    Minute,
    Hour,
    DayOfMonth,
    Month,
    Weekday,
}

impl Field {
    /// The range of numeric literals this field accepts in text.
    ///
    /// Note that this is the *textual* domain: the hour field accepts `24`
    /// as an alias for midnight of the following day and the weekday field
    /// accepts both `0` and `7` for Sunday. Aliases are normalized away by
    /// [`Field::normalize`] after range expansion.
    fn domain(self) -> (i8, i8) {
        match self {
            Field::Second | Field::Minute => (0, 59),
            Field::Hour => (0, 24),
            Field::DayOfMonth => (1, 31),
            Field::Month => (1, 12),
            Field::Weekday => (0, 7),
        }
    }

    /// The values a `*` (or `*/step`) expands over. Unlike
    /// [`Field::domain`], aliases are excluded.
    fn wildcard_domain(self) -> (i8, i8) {
        match self {
            Field::Hour => (0, 23),
            Field::Weekday => (0, 6),
            field => field.domain(),
        }
    }

    /// Folds domain aliases onto their canonical value.
    fn normalize(self, value: i8) -> i8 {
        match self {
            Field::Hour => value % 24,
            Field::Weekday => value % 7,
            _ => value,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Field::Second => "second",
            Field::Minute => "minute",
            Field::Hour => "hour",
            Field::DayOfMonth => "day-of-month",
            Field::Month => "month",
            Field::Weekday => "weekday",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The parsed, normalized form of a single cron field.
///
/// An empty `values` list (with `last_day` unset and no occurrence
/// entries) means the field was a wildcard and admits every value in its
/// domain. Otherwise `values` is ascending and deduplicated, with domain
/// aliases (hour `24`, weekday `7`) already folded away.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct Parsed {
    pub(crate) values: Vec<i8>,
    /// The day-of-month field contained an `L` item.
    pub(crate) last_day: bool,
    /// Occurrence-constrained entries from the weekday field.
    pub(crate) nth_weekdays: Vec<NthWeekday>,
}

/// Parses one whitespace-delimited cron field into its normalized form.
pub(crate) fn parse(field: Field, text: &str) -> Result<Parsed, Error> {
    let mut parsed = Parsed::default();
    let mut wildcard = false;
    for item in text.split(',') {
        if item == "*" {
            // A bare `*` admits everything, swallowing its siblings.
            wildcard = true;
            continue;
        }
        parse_item(field, item, &mut parsed)?;
    }
    if wildcard {
        return Ok(Parsed::default());
    }
    parsed.values.sort_unstable();
    parsed.values.dedup();
    parsed.nth_weekdays.sort();
    parsed.nth_weekdays.dedup();
    Ok(parsed)
}

/// Parses a single comma-delimited item and accumulates it into `out`.
fn parse_item(
    field: Field,
    item: &str,
    out: &mut Parsed,
) -> Result<(), Error> {
    if let Some((weekday, occurrence)) = item.split_once('#') {
        if field != Field::Weekday {
            return Err(Error::Unsupported {
                field,
                reason: format!(
                    "`#` occurrence selectors are only valid in the \
                     weekday field (in `{item}`)",
                ),
            });
        }
        let weekday = field.normalize(value_of(field, weekday)?);
        let nth = parse_occurrence(field, occurrence)?;
        out.nth_weekdays.push(NthWeekday::new(weekday, nth));
        return Ok(());
    }
    if item.eq_ignore_ascii_case("l") {
        if field != Field::DayOfMonth {
            return Err(Error::Unsupported {
                field,
                reason: "`L` is only valid in the day-of-month field"
                    .to_string(),
            });
        }
        if out.last_day {
            return Err(Error::Unsupported {
                field,
                reason: "at most one `L` is allowed".to_string(),
            });
        }
        out.last_day = true;
        return Ok(());
    }

    let (body, step) = split_step(field, item)?;
    if field == Field::DayOfMonth
        && body.chars().any(|c| c.eq_ignore_ascii_case(&'l'))
    {
        // `15-L`, `L/4` and friends. A lone `L` was handled above.
        return Err(Error::Unsupported {
            field,
            reason: format!(
                "`L` cannot be combined with a range or step (in `{item}`)",
            ),
        });
    }

    let expansion: Vec<i8> = match body.split_once('-') {
        None if body == "*" || (body.is_empty() && step.is_some()) => {
            // `*/step`, or the legacy lonely `/step`.
            let (lo, hi) = field.wildcard_domain();
            (lo..=hi).collect()
        }
        None => {
            if step.is_some() {
                // The grammar only admits steps on `*` and on ranges.
                return Err(Error::Syntax {
                    field,
                    token: item.to_string(),
                });
            }
            vec![value_of(field, body)?]
        }
        Some((start, end)) => {
            let start = value_of(field, start)?;
            let end = value_of(field, end)?;
            if start <= end {
                (start..=end).collect()
            } else if field == Field::Hour {
                // Documented, intentional behavior: an hour range may
                // wrap past midnight, e.g. `23-2` is {23, 0, 1, 2}.
                (start..=23).chain(0..=end).collect()
            } else {
                return Err(Error::Unsupported {
                    field,
                    reason: format!(
                        "range `{body}` runs backwards (only the hour \
                         field may wrap past midnight)",
                    ),
                });
            }
        }
    };
    let step = step.unwrap_or(1);
    out.values.extend(
        expansion
            .into_iter()
            .step_by(step)
            .map(|value| field.normalize(value)),
    );
    Ok(())
}

/// Splits a trailing `/step` off an item, validating the step if present.
fn split_step(
    field: Field,
    item: &str,
) -> Result<(&str, Option<usize>), Error> {
    let Some((body, step)) = item.split_once('/') else {
        return Ok((item, None));
    };
    let value: i64 = step.parse().map_err(|_| Error::Syntax {
        field,
        token: item.to_string(),
    })?;
    if value < 1 {
        let (lo, hi) = field.domain();
        return Err(Error::Range {
            field,
            value,
            lo: 1,
            hi: i64::from(hi - lo) + 1,
        });
    }
    Ok((body, Some(value as usize)))
}

/// Parses the occurrence part of a `weekday#occurrence` item.
fn parse_occurrence(field: Field, text: &str) -> Result<i8, Error> {
    if text.eq_ignore_ascii_case("l") {
        return Ok(-1);
    }
    let invalid = || Error::Unsupported {
        field,
        reason: format!(
            "occurrence `#{text}` must be 1..=5, -5..=-1 or `L`",
        ),
    };
    let nth: i8 = text.parse().map_err(|_| invalid())?;
    if !(1..=5).contains(&nth) && !(-5..=-1).contains(&nth) {
        return Err(invalid());
    }
    Ok(nth)
}

/// Parses a single value: a numeric literal within the field's textual
/// domain, or a month/weekday name for the fields that have them.
///
/// The returned value is domain checked but not normalized, so that range
/// endpoints like `23-24` compare in their textual form.
fn value_of(field: Field, token: &str) -> Result<i8, Error> {
    if token.chars().any(|c| c.is_ascii_alphabetic()) {
        let lower = token.to_ascii_lowercase();
        let named = match field {
            Field::Month => MONTHS
                .iter()
                .position(|&name| name == lower)
                .map(|i| i as i8 + 1),
            Field::Weekday => WEEKDAYS
                .iter()
                .position(|&name| name == lower)
                .map(|i| i as i8),
            _ => None,
        };
        return named.ok_or_else(|| Error::Syntax {
            field,
            token: token.to_string(),
        });
    }
    let value: i64 = token.parse().map_err(|_| Error::Syntax {
        field,
        token: token.to_string(),
    })?;
    let (lo, hi) = field.domain();
    if value < i64::from(lo) || value > i64::from(hi) {
        return Err(Error::Range {
            field,
            value,
            lo: i64::from(lo),
            hi: i64::from(hi),
        });
    }
    Ok(value as i8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(field: Field, text: &str) -> Vec<i8> {
        parse(field, text).unwrap().values
    }

    #[test]
    fn wildcards() {
        assert_eq!(parse(Field::Minute, "*").unwrap(), Parsed::default());
        // A bare `*` anywhere in a list swallows the rest.
        assert_eq!(parse(Field::Minute, "*,5").unwrap(), Parsed::default());
        assert_eq!(parse(Field::Hour, "7,*").unwrap(), Parsed::default());
    }

    #[test]
    fn literals_and_lists() {
        assert_eq!(values(Field::Minute, "5"), vec![5]);
        assert_eq!(values(Field::Minute, "10-12"), vec![10, 11, 12]);
        assert_eq!(values(Field::Minute, "30,10,20,10"), vec![10, 20, 30]);
        // Leading zeros are plain decimal.
        assert_eq!(values(Field::Minute, "09"), vec![9]);
        assert_eq!(values(Field::Minute, "07-08"), vec![7, 8]);
    }

    #[test]
    fn steps() {
        assert_eq!(
            values(Field::Hour, "*/2"),
            (0..=23).step_by(2).collect::<Vec<i8>>(),
        );
        assert_eq!(
            values(Field::Hour, "7-23/2"),
            (7..=23).step_by(2).collect::<Vec<i8>>(),
        );
        assert_eq!(
            values(Field::Minute, "*/10"),
            vec![0, 10, 20, 30, 40, 50],
        );
        // The legacy lonely slash is `*/step`.
        assert_eq!(
            values(Field::Minute, "/10"),
            vec![0, 10, 20, 30, 40, 50],
        );
        assert_eq!(values(Field::Hour, "*/08"), vec![0, 8, 16]);
        assert_eq!(values(Field::Hour, "*/07"), vec![0, 7, 14, 21]);
        assert_eq!(values(Field::Hour, "01-09/04"), vec![1, 5, 9]);
        assert_eq!(values(Field::DayOfMonth, "*/8"), vec![1, 9, 17, 25]);
    }

    #[test]
    fn names() {
        assert_eq!(values(Field::Month, "jan"), vec![1]);
        assert_eq!(values(Field::Month, "DEC"), vec![12]);
        assert_eq!(values(Field::Weekday, "sun,mon"), vec![0, 1]);
        assert_eq!(values(Field::Weekday, "mon-wed"), vec![1, 2, 3]);
        assert_eq!(values(Field::Weekday, "sun,2-4"), vec![0, 2, 3, 4]);
        assert_eq!(values(Field::Weekday, "sun,mon-tue"), vec![0, 1, 2]);
    }

    #[test]
    fn aliases() {
        // 7 is Sunday, same as 0.
        assert_eq!(values(Field::Weekday, "7"), vec![0]);
        assert_eq!(values(Field::Weekday, "7,1"), vec![0, 1]);
        assert_eq!(values(Field::Weekday, "7,0"), vec![0]);
        assert_eq!(values(Field::Weekday, "5-7"), vec![0, 5, 6]);
        // 24 is midnight of the following day.
        assert_eq!(values(Field::Hour, "24"), vec![0]);
        assert_eq!(values(Field::Hour, "23-24"), vec![0, 23]);
    }

    #[test]
    fn wrapping_hours() {
        assert_eq!(values(Field::Hour, "23-2"), vec![0, 1, 2, 23]);
        // A step walks the wrapped expansion order (23, 0, 1, 2).
        assert_eq!(values(Field::Hour, "23-2/2"), vec![1, 23]);
        // Only hours wrap.
        assert!(matches!(
            parse(Field::Minute, "30-10"),
            Err(Error::Unsupported { field: Field::Minute, .. }),
        ));
    }

    #[test]
    fn last_day() {
        let parsed = parse(Field::DayOfMonth, "L").unwrap();
        assert!(parsed.last_day);
        assert!(parsed.values.is_empty());
        let parsed = parse(Field::DayOfMonth, "2-5,L").unwrap();
        assert!(parsed.last_day);
        assert_eq!(parsed.values, vec![2, 3, 4, 5]);

        assert!(matches!(
            parse(Field::DayOfMonth, "15-L"),
            Err(Error::Unsupported { .. }),
        ));
        assert!(matches!(
            parse(Field::DayOfMonth, "L/4"),
            Err(Error::Unsupported { .. }),
        ));
        assert!(matches!(
            parse(Field::DayOfMonth, "L,L"),
            Err(Error::Unsupported { .. }),
        ));
        assert!(matches!(
            parse(Field::Minute, "L"),
            Err(Error::Unsupported { .. }),
        ));
    }

    #[test]
    fn occurrences() {
        let parsed = parse(Field::Weekday, "sun#2,sun#3").unwrap();
        assert!(parsed.values.is_empty());
        assert_eq!(
            parsed.nth_weekdays,
            vec![NthWeekday::new(0, 2), NthWeekday::new(0, 3)],
        );
        // `#L` is `#-1`.
        assert_eq!(
            parse(Field::Weekday, "fri#L").unwrap().nth_weekdays,
            parse(Field::Weekday, "fri#-1").unwrap().nth_weekdays,
        );
        // Plain and occurrence items can mix.
        let parsed = parse(Field::Weekday, "mon,sun#2").unwrap();
        assert_eq!(parsed.values, vec![1]);
        assert_eq!(parsed.nth_weekdays, vec![NthWeekday::new(0, 2)]);

        assert!(matches!(
            parse(Field::Weekday, "sun#0"),
            Err(Error::Unsupported { .. }),
        ));
        assert!(matches!(
            parse(Field::Weekday, "sun#6"),
            Err(Error::Unsupported { .. }),
        ));
        assert!(matches!(
            parse(Field::Weekday, "sun#1-sun#2"),
            Err(Error::Unsupported { .. }),
        ));
        assert!(matches!(
            parse(Field::Hour, "5#2"),
            Err(Error::Unsupported { field: Field::Hour, .. }),
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse(Field::Minute, "nada"),
            Err(Error::Syntax { .. }),
        ));
        assert!(matches!(
            parse(Field::Weekday, "MON_FRI"),
            Err(Error::Syntax { .. }),
        ));
        assert!(matches!(
            parse(Field::Weekday, "BLABLA"),
            Err(Error::Syntax { .. }),
        ));
        assert!(matches!(
            parse(Field::Minute, "5/2"),
            Err(Error::Syntax { .. }),
        ));
        assert!(matches!(
            parse(Field::Minute, "*/x"),
            Err(Error::Syntax { .. }),
        ));
        // Empty list items are not silently ignored.
        assert!(matches!(
            parse(Field::Minute, "5,,6"),
            Err(Error::Syntax { .. }),
        ));
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(matches!(
            parse(Field::Minute, "60"),
            Err(Error::Range { value: 60, .. }),
        ));
        assert!(matches!(
            parse(Field::Minute, "60-62"),
            Err(Error::Range { .. }),
        ));
        assert!(matches!(
            parse(Field::Hour, "25"),
            Err(Error::Range { value: 25, .. }),
        ));
        assert!(matches!(
            parse(Field::Hour, "25-26"),
            Err(Error::Range { .. }),
        ));
        assert!(matches!(
            parse(Field::Weekday, "9"),
            Err(Error::Range { value: 9, .. }),
        ));
        assert!(matches!(
            parse(Field::Weekday, "0-12"),
            Err(Error::Range { .. }),
        ));
        assert!(matches!(
            parse(Field::Minute, "*/0"),
            Err(Error::Range { value: 0, .. }),
        ));
    }

    #[test]
    fn error_messages() {
        let err = parse(Field::Minute, "nada").unwrap_err();
        insta::assert_snapshot!(
            err,
            @"minute field: unrecognized token `nada`",
        );
        let err = parse(Field::Hour, "25").unwrap_err();
        insta::assert_snapshot!(
            err,
            @"hour field: value 25 is out of range (0..=24)",
        );
        let err = parse(Field::DayOfMonth, "L,L").unwrap_err();
        insta::assert_snapshot!(
            err,
            @"day-of-month field: at most one `L` is allowed",
        );
    }
}
