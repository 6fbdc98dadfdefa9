//! Slot arithmetic in the clinic timezone.
//!
//! Everything here is pure: callers fetch the busy events first and pass them in.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use dental_mcp_common::config::BusinessHours;
use dental_mcp_common::error::Error;
use serde::Serialize;

/// Date format accepted by every tool.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Time format accepted by every tool.
pub const TIME_FORMAT: &str = "%H:%M";

/// A free appointment slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    /// Local start time, `HH:MM`
    pub time: String,
    /// Start instant with UTC offset (RFC 3339)
    pub datetime: String,
}

/// A period during which no appointment can be booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Busy {
    /// Half-open instant range
    Timed {
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },
    /// Whole days, end exclusive
    AllDay { start: NaiveDate, end: NaiveDate },
}

/// Parse a `YYYY-MM-DD` argument.
///
/// The year must be exactly four digits; chrono alone also accepts signed
/// and longer years.
pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, Error> {
    let invalid = || {
        Error::validation(format!("{} must be a date in YYYY-MM-DD format, got '{}'", field, raw))
    };
    let trimmed = raw.trim();
    let four_digit_year = trimmed
        .split('-')
        .next()
        .is_some_and(|year| year.len() == 4 && year.bytes().all(|b| b.is_ascii_digit()));
    if !four_digit_year {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| invalid())
}

/// Parse an `HH:MM` argument.
pub fn parse_time(field: &str, raw: &str) -> Result<NaiveTime, Error> {
    NaiveTime::parse_from_str(raw.trim(), TIME_FORMAT).map_err(|_| {
        Error::validation(format!("{} must be a time in HH:MM format, got '{}'", field, raw))
    })
}

/// Attach the clinic timezone to a wall-clock time.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant; times that
/// do not exist (DST spring-forward gap) are rejected.
pub fn localize(tz: Tz, date: NaiveDate, time: NaiveTime) -> Result<DateTime<FixedOffset>, Error> {
    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| {
            Error::validation(format!(
                "{} {} does not exist in timezone {}",
                date,
                time.format(TIME_FORMAT),
                tz.name()
            ))
        })
}

/// Opening and closing instants of the clinic on `date`.
pub fn business_window(
    tz: Tz,
    date: NaiveDate,
    hours: &BusinessHours,
) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>), Error> {
    Ok((localize(tz, date, hours.open)?, localize(tz, date, hours.close)?))
}

/// Length of one appointment.
pub fn slot_length(hours: &BusinessHours) -> Duration {
    Duration::minutes(i64::from(hours.slot_minutes))
}

/// Free slots on `date`.
///
/// Slots start at opening time and repeat every `slot_minutes`; a slot is only
/// offered if it ends by closing time and overlaps no busy period. Closed days
/// and days covered by an all-day event yield nothing.
pub fn available_slots(
    tz: Tz,
    date: NaiveDate,
    hours: &BusinessHours,
    busy: &[Busy],
) -> Result<Vec<Slot>, Error> {
    use chrono::Datelike;

    if !hours.is_working_day(date.weekday()) {
        return Ok(Vec::new());
    }

    let blocked_all_day = busy.iter().any(|b| match b {
        Busy::AllDay { start, end } => *start <= date && date < *end,
        Busy::Timed { .. } => false,
    });
    if blocked_all_day {
        return Ok(Vec::new());
    }

    let (open, close) = business_window(tz, date, hours)?;
    let step = slot_length(hours);

    let mut slots = Vec::new();
    let mut current = open;
    while current + step <= close {
        let slot_end = current + step;
        let taken = busy.iter().any(|b| match b {
            Busy::Timed { start, end } => current < *end && slot_end > *start,
            Busy::AllDay { .. } => false,
        });
        if !taken {
            let local = current.with_timezone(&tz);
            slots.push(Slot {
                time: local.format(TIME_FORMAT).to_string(),
                datetime: current.to_rfc3339(),
            });
        }
        current = slot_end;
    }
    Ok(slots)
}
