use crate::field::Field;

/// An error returned when building a [`Schedule`](crate::Schedule) from
/// text.
///
/// Construction is atomic: the first offending field aborts the parse and
/// is identified here. Once a schedule has been built, evaluating it can
/// never fail.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// The expression does not split into an acceptable number of fields.
    ///
    /// Valid expressions have 5 fields (minute granularity) or 6 fields
    /// (explicit seconds), optionally followed by a time zone.
    #[error(
        "expected 5 or 6 fields (plus an optional trailing time zone), \
         got {got} in `{expression}`"
    )]
    FieldCount { expression: String, got: usize },
    /// A token that is not part of the schedule grammar at all.
    #[error("{field} field: unrecognized token `{token}`")]
    Syntax { field: Field, token: String },
    /// A numeric literal outside its field's domain.
    #[error("{field} field: value {value} is out of range ({lo}..={hi})")]
    Range { field: Field, value: i64, lo: i64, hi: i64 },
    /// A combination the grammar can express but the engine rejects, like
    /// `L` inside a range or an occurrence selector outside the weekday
    /// field.
    #[error("{field} field: {reason}")]
    Unsupported { field: Field, reason: String },
    /// The trailing token is neither a sixth field nor a known IANA time
    /// zone identifier.
    #[error("unknown time zone `{name}`")]
    UnknownTimeZone { name: String },
}
