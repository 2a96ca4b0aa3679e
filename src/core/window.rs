//! Validity, time-of-day, weekday and quantity windows.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::config::TimeWindowMode;

/// Calendar validity window. Both bounds are inclusive; `None` is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ValidityWindow {
    /// A window that is always valid.
    pub const ALWAYS: Self = Self {
        from: None,
        to: None,
    };

    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    /// Whether `now` falls on a day inside the window.
    pub fn contains(&self, now: NaiveDateTime) -> bool {
        let day = now.date();
        self.from.is_none_or(|from| day >= from) && self.to.is_none_or(|to| day <= to)
    }

    /// True when both bounds are set and `from` lies after `to`.
    pub fn is_inverted(&self) -> bool {
        matches!((self.from, self.to), (Some(from), Some(to)) if from > to)
    }
}

/// Time-of-day window, e.g. a happy hour from 17:00 to 19:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDayWindow {
    pub from: NaiveTime,
    pub to: NaiveTime,
}

impl TimeOfDayWindow {
    pub fn new(from: NaiveTime, to: NaiveTime) -> Self {
        Self { from, to }
    }

    /// Whether the time of day of `now` lies in the window.
    ///
    /// In [`TimeWindowMode::Literal`] the test is `from <= t <= to`, so a
    /// window such as 22:00–02:00 never matches. [`TimeWindowMode::WrapMidnight`]
    /// treats `from > to` as a window crossing midnight.
    pub fn contains(&self, now: NaiveDateTime, mode: TimeWindowMode) -> bool {
        let t = now.time();
        match mode {
            TimeWindowMode::Literal => self.from <= t && t <= self.to,
            TimeWindowMode::WrapMidnight if self.from > self.to => t >= self.from || t <= self.to,
            TimeWindowMode::WrapMidnight => self.from <= t && t <= self.to,
        }
    }
}

/// Day of week for `now`, 0 = Sunday through 6 = Saturday.
pub fn day_of_week(now: NaiveDateTime) -> u8 {
    now.weekday().num_days_from_sunday() as u8
}

/// Closed quantity window `[min, max]`; a missing bound is unbounded.
pub fn quantity_in_window(qty: Decimal, min: Option<Decimal>, max: Option<Decimal>) -> bool {
    min.is_none_or(|min| qty >= min) && max.is_none_or(|max| qty <= max)
}
