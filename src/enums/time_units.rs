//! # **TimeUnits Module** - *Arrow Datetime Units*
//!
//! Defines the time units used by temporal arrays.
//!
//! `TimeUnit` standardises second, millisecond, microsecond, nanosecond, and day resolution
//! across `DatetimeArray<i32>` and `DatetimeArray<i64>`, and maps each onto the single unit
//! character used in Arrow temporal format strings (`tss:`, `tDm`, `ttu`, ...).
//!
//! `IntervalUnit` specifies year-month, day-time, or month-day-nanosecond intervals.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// # TimeUnit
///
/// Unified time unit enumeration.
///
/// ## Behaviour
/// - Unit values are stored on the `DatetimeArray`, and copied into the `ArrowType`
///   reported by the array so the format string round-trips the unit exactly.
/// - `Days` only applies to `Date32`. `Date64` carries `Milliseconds`.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, Default)]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
    /// Apache Arrow's `Date32` type uses days implicitly.
    #[default]
    Days,
}

impl TimeUnit {
    /// Unit character used in time, timestamp and duration format strings.
    ///
    /// Returns `None` for `Days`, which only appears in the fixed `tdD` code.
    pub fn format_char(self) -> Option<char> {
        match self {
            TimeUnit::Seconds => Some('s'),
            TimeUnit::Milliseconds => Some('m'),
            TimeUnit::Microseconds => Some('u'),
            TimeUnit::Nanoseconds => Some('n'),
            TimeUnit::Days => None,
        }
    }

    /// Inverse of [`TimeUnit::format_char`].
    pub fn from_format_char(c: char) -> Option<Self> {
        match c {
            's' => Some(TimeUnit::Seconds),
            'm' => Some(TimeUnit::Milliseconds),
            'u' => Some(TimeUnit::Microseconds),
            'n' => Some(TimeUnit::Nanoseconds),
            _ => None,
        }
    }
}

impl Display for TimeUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TimeUnit::Seconds => f.write_str("Seconds"),
            TimeUnit::Milliseconds => f.write_str("Milliseconds"),
            TimeUnit::Microseconds => f.write_str("Microseconds"),
            TimeUnit::Nanoseconds => f.write_str("Nanoseconds"),
            TimeUnit::Days => f.write_str("Days"),
        }
    }
}

/// # IntervalUnit
///
/// Layout of one calendar interval value.
///
/// ## Layouts
/// - `YearMonth`: months as one `i32` (`tiM`).
/// - `DaysTime`: days then milliseconds, two `i32`s (`tiD`).
/// - `MonthDaysNs`: months and days as `i32`s, then nanoseconds as an `i64` (`tin`).
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum IntervalUnit {
    YearMonth,
    DaysTime,
    MonthDaysNs,
}

impl IntervalUnit {
    /// Unit character used in `ti` format strings.
    pub fn format_char(self) -> char {
        match self {
            IntervalUnit::YearMonth => 'M',
            IntervalUnit::DaysTime => 'D',
            IntervalUnit::MonthDaysNs => 'n',
        }
    }

    /// Inverse of [`IntervalUnit::format_char`].
    pub fn from_format_char(c: char) -> Option<Self> {
        match c {
            'M' => Some(IntervalUnit::YearMonth),
            'D' => Some(IntervalUnit::DaysTime),
            'n' => Some(IntervalUnit::MonthDaysNs),
            _ => None,
        }
    }

    /// Number of 32-bit words in one value.
    pub fn words(self) -> usize {
        match self {
            IntervalUnit::YearMonth => 1,
            IntervalUnit::DaysTime => 2,
            IntervalUnit::MonthDaysNs => 4,
        }
    }
}

impl Display for IntervalUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            IntervalUnit::YearMonth => f.write_str("YearMonth"),
            IntervalUnit::DaysTime => f.write_str("DaysTime"),
            IntervalUnit::MonthDaysNs => f.write_str("MonthDaysNs"),
        }
    }
}
