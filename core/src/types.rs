//! Shared primitive types used across the scoring pipeline.

use chrono::NaiveDate;

/// A tracked issuer. One issuer = one SEC CIK.
pub type IssuerId = i64;

/// Length of a trailing lookback window, in calendar days.
pub type WindowDays = u32;

/// The calendar day a scoring run is computed for.
pub type AsOfDate = NaiveDate;
