//! Month-day dates and the "is it somebody's birthday" check.
//!
//! Birthdays carry no year, so they recur every year. A `02-29` birthday is
//! celebrated on `03-01` in years without a leap day.

use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::config::Birthday;
use crate::error::DateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthDay {
    month: u8,
    day: u8,
}

const LEAP_DAY: MonthDay = MonthDay { month: 2, day: 29 };
const MARCH_FIRST: MonthDay = MonthDay { month: 3, day: 1 };

fn days_in_month(month: u8) -> u8 {
    match month {
        2 => 29,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

impl MonthDay {
    pub fn new(month: u8, day: u8) -> Result<Self, DateError> {
        let invalid = |reason| DateError {
            input: format!("{month:02}-{day:02}"),
            reason,
        };
        if !(1..=12).contains(&month) {
            return Err(invalid("month out of range"));
        }
        if day == 0 || day > days_in_month(month) {
            return Err(invalid("day out of range"));
        }
        Ok(Self { month, day })
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }
}

impl FromStr for MonthDay {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| DateError {
            input: s.to_string(),
            reason,
        };
        let bytes = s.as_bytes();
        if bytes.len() != 5 || bytes[2] != b'-' {
            return Err(invalid("expected zero-padded MM-DD"));
        }
        let digits = |range: std::ops::Range<usize>| -> Result<u8, DateError> {
            let part = &s[range];
            if part.bytes().all(|b| b.is_ascii_digit()) {
                part.parse().map_err(|_| invalid("not a number"))
            } else {
                Err(invalid("expected zero-padded MM-DD"))
            }
        };
        let month = digits(0..2)?;
        let day = digits(3..5)?;
        MonthDay::new(month, day).map_err(|e| invalid(e.reason))
    }
}

impl fmt::Display for MonthDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

/// Today as the checker sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDay {
    pub month_day: MonthDay,
    pub leap_year: bool,
}

impl CalendarDay {
    pub fn new(month_day: MonthDay, leap_year: bool) -> Self {
        Self {
            month_day,
            leap_year,
        }
    }

    pub fn from_date(date: time::Date) -> Self {
        let month_day = MonthDay {
            month: u8::from(date.month()),
            day: date.day(),
        };
        Self::new(month_day, time::util::is_leap_year(date.year()))
    }

    pub fn matches(&self, birthday: MonthDay) -> bool {
        birthday == self.month_day
            || (!self.leap_year && birthday == LEAP_DAY && self.month_day == MARCH_FIRST)
    }
}

pub trait Calendar {
    fn today(&self) -> CalendarDay;
}

/// Local wall-clock date, falling back to UTC when the local offset cannot
/// be determined.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCalendar;

impl SystemCalendar {
    pub fn now() -> time::OffsetDateTime {
        time::OffsetDateTime::now_local().unwrap_or_else(|err| {
            warn!(error = %err, "local time unavailable, using UTC");
            time::OffsetDateTime::now_utc()
        })
    }
}

impl Calendar for SystemCalendar {
    fn today(&self) -> CalendarDay {
        CalendarDay::from_date(Self::now().date())
    }
}

/// Always the same day.
#[derive(Debug, Clone, Copy)]
pub struct FixedCalendar(pub CalendarDay);

impl Calendar for FixedCalendar {
    fn today(&self) -> CalendarDay {
        self.0
    }
}

/// First record, in configuration order, whose date is today. Records with
/// unparsable dates never match.
pub fn find_birthday<'a>(today: &CalendarDay, records: &'a [Birthday]) -> Option<&'a Birthday> {
    records
        .iter()
        .find(|b| b.month_day().is_ok_and(|day| today.matches(day)))
}

/// Whether any record for `name` falls on today.
pub fn is_birthday_of(today: &CalendarDay, records: &[Birthday], name: &str) -> bool {
    records
        .iter()
        .filter(|b| b.name == name)
        .any(|b| b.month_day().is_ok_and(|day| today.matches(day)))
}
