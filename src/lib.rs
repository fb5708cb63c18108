//! A cron schedule engine.
//!
//! This crate parses compact cron expressions into immutable [`Schedule`]
//! values and answers the questions a recurring-job scheduler needs to ask:
//! does this instant belong to the schedule, when is the next (or previous)
//! occurrence, and how close together can two occurrences possibly be.
//!
//! Expressions have the traditional five fields, or six when a leading
//! seconds field is present, optionally followed by an IANA time zone:
//!
//! ```text
//! */10 * * * *                 every ten minutes
//! 0 9-17 * * mon-fri           hourly during business hours
//! 30 0 6 * * sat#L             06:00:30 on each month's last Saturday
//! 0 0 L * * Australia/Sydney   midnight in Sydney on the last day of the month
//! ```
//!
//! A [`Schedule`] performs no I/O and never blocks: every operation is a pure
//! function of the parsed expression and the instant it is given. Schedules
//! are cheap to clone and safe to share across threads, so a scheduler can
//! hold one per registered job and call [`Schedule::next_time`] after each
//! firing to learn when to re-arm its timer:
//!
//! ```
//! use cronline::Schedule;
//!
//! let schedule = Schedule::new("*/15 * * * *")?;
//! let now = jiff::civil::date(1970, 1, 1).at(0, 20, 0, 0).in_tz("UTC")?;
//! let next = schedule.next_time(&now);
//! assert_eq!(next.to_string(), "1970-01-01T00:30:00+00:00[UTC]");
//! assert!(schedule.matches(&next));
//! assert_eq!(schedule.frequency().as_secs(), 15 * 60);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! All validation happens eagerly in [`Schedule::new`]; see [`Error`] for the
//! failure classes. Calendar arithmetic is delegated to [`jiff`], including
//! its time zone database.

pub use crate::{
    error::Error,
    field::Field,
    schedule::{Normalized, Schedule},
};

mod error;
mod field;
mod occurrence;
mod schedule;
mod search;
