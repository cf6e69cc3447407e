//! Cron expression parsing and next-occurrence evaluation
//!
//! Accepts standard 5-field expressions and the 6-field variant with a
//! leading seconds field:
//! ```text
//! ┌───────────── second (0-59, optional)
//! │ ┌───────────── minute (0-59)
//! │ │ ┌───────────── hour (0-23)
//! │ │ │ ┌───────────── day of month (1-31)
//! │ │ │ │ ┌───────────── month (1-12)
//! │ │ │ │ │ ┌───────────── day of week (0-6, 0 = Sunday)
//! │ │ │ │ │ │
//! * * * * * *
//! ```
//! Occurrences are evaluated against a named timezone's local clock. For
//! ambiguous local times (clocks falling back) the earlier instant wins;
//! nonexistent local times (clocks springing forward) are skipped.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use std::collections::BTreeSet;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CronParseError {
    #[error("expected 5 or 6 fields, got {0}")]
    InvalidFieldCount(usize),
    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },
    #[error("value {value} is out of range [{min}, {max}] for '{field}'")]
    OutOfRange {
        field: String,
        value: u32,
        min: u32,
        max: u32,
    },
    #[error("invalid range: {0}-{1}")]
    InvalidRange(u32, u32),
    #[error("invalid step value: {0}")]
    InvalidStep(String),
}

/// One field of a cron expression, expanded to its matching value set.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CronField {
    values: BTreeSet<u32>,
    min: u32,
    max: u32,
}

impl CronField {
    fn new(min: u32, max: u32) -> Self {
        Self {
            values: BTreeSet::new(),
            min,
            max,
        }
    }

    /// A field matching exactly one value.
    fn fixed(value: u32, min: u32, max: u32) -> Self {
        let mut field = Self::new(min, max);
        field.values.insert(value);
        field
    }

    fn parse(&mut self, expr: &str) -> Result<(), CronParseError> {
        for part in expr.split(',') {
            self.parse_part(part.trim())?;
        }
        Ok(())
    }

    fn parse_part(&mut self, part: &str) -> Result<(), CronParseError> {
        let (range_part, step) = if let Some(idx) = part.find('/') {
            let step_str = &part[idx + 1..];
            let step = step_str
                .parse::<u32>()
                .map_err(|_| CronParseError::InvalidStep(step_str.to_string()))?;
            if step == 0 {
                return Err(CronParseError::InvalidStep("0".to_string()));
            }
            (&part[..idx], Some(step))
        } else {
            (part, None)
        };

        let (start, end) = if range_part == "*" {
            (self.min, self.max)
        } else if let Some(idx) = range_part.find('-') {
            let start = range_part[..idx]
                .parse::<u32>()
                .map_err(|_| CronParseError::InvalidField {
                    field: range_part.to_string(),
                    reason: "invalid start of range".to_string(),
                })?;
            let end = range_part[idx + 1..]
                .parse::<u32>()
                .map_err(|_| CronParseError::InvalidField {
                    field: range_part.to_string(),
                    reason: "invalid end of range".to_string(),
                })?;
            if start > end {
                return Err(CronParseError::InvalidRange(start, end));
            }
            (start, end)
        } else {
            let value = range_part
                .parse::<u32>()
                .map_err(|_| CronParseError::InvalidField {
                    field: range_part.to_string(),
                    reason: "invalid value".to_string(),
                })?;
            (value, value)
        };

        if start < self.min || end > self.max {
            return Err(CronParseError::OutOfRange {
                field: range_part.to_string(),
                value: if start < self.min { start } else { end },
                min: self.min,
                max: self.max,
            });
        }

        let step = step.unwrap_or(1);
        let mut value = start;
        while value <= end {
            self.values.insert(value);
            value += step;
        }

        Ok(())
    }

    fn matches(&self, value: u32) -> bool {
        self.values.contains(&value)
    }

    /// Smallest matching value >= `value`.
    fn next(&self, value: u32) -> Option<u32> {
        self.values.range(value..).next().copied()
    }

    fn first(&self) -> Option<u32> {
        self.values.iter().next().copied()
    }
}

/// A parsed cron schedule.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expr: String,
    second: CronField,
    minute: CronField,
    hour: CronField,
    day_of_month: CronField,
    month: CronField,
    day_of_week: CronField,
}

impl CronSchedule {
    pub fn parse(expr: &str) -> Result<Self, CronParseError> {
        let parts: Vec<&str> = expr.split_whitespace().collect();
        let (second, rest) = match parts.len() {
            // 5-field expressions fire at second 0.
            5 => (CronField::fixed(0, 0, 59), &parts[..]),
            6 => {
                let mut second = CronField::new(0, 59);
                second.parse(parts[0])?;
                (second, &parts[1..])
            }
            n => return Err(CronParseError::InvalidFieldCount(n)),
        };

        let mut minute = CronField::new(0, 59);
        let mut hour = CronField::new(0, 23);
        let mut day_of_month = CronField::new(1, 31);
        let mut month = CronField::new(1, 12);
        let mut day_of_week = CronField::new(0, 6);

        minute.parse(rest[0])?;
        hour.parse(rest[1])?;
        day_of_month.parse(rest[2])?;
        month.parse(rest[3])?;
        day_of_week.parse(rest[4])?;

        Ok(Self {
            expr: expr.to_string(),
            second,
            minute,
            hour,
            day_of_month,
            month,
            day_of_week,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expr
    }

    fn matches_date(&self, date: NaiveDate) -> bool {
        self.day_of_month.matches(date.day())
            && self.month.matches(date.month())
            && self.day_of_week.matches(date.weekday().num_days_from_sunday())
    }

    /// Next firing strictly after `after`, evaluated in `tz` and returned
    /// as UTC. `None` for schedules with no reachable occurrence (e.g.
    /// `0 0 30 2 *`).
    pub fn next_after(&self, after: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        let mut cursor = after.with_timezone(&tz).naive_local() + Duration::seconds(1);

        // Day-level skipping keeps this well under the bound even for
        // schedules that only fire once every few years.
        let max_iterations = 100_000;

        for _ in 0..max_iterations {
            let date = cursor.date();

            if !self.month.matches(date.month()) {
                cursor = first_of_next_matching_month(&self.month, date)?;
                continue;
            }
            if !self.matches_date(date) {
                cursor = date.succ_opt()?.and_hms_opt(0, 0, 0)?;
                continue;
            }
            if !self.hour.matches(cursor.hour()) {
                cursor = match self.hour.next(cursor.hour()) {
                    Some(hour) => date.and_hms_opt(hour, 0, 0)?,
                    None => date.succ_opt()?.and_hms_opt(0, 0, 0)?,
                };
                continue;
            }
            if !self.minute.matches(cursor.minute()) {
                cursor = match self.minute.next(cursor.minute()) {
                    Some(minute) => date.and_hms_opt(cursor.hour(), minute, 0)?,
                    None => {
                        // Wrap to the next hour; the hour check above
                        // re-validates it on the next pass.
                        truncate_to_hour(cursor)? + Duration::hours(1)
                    }
                };
                continue;
            }

            match self.second.next(cursor.second()) {
                Some(second) => {
                    let candidate = date.and_hms_opt(cursor.hour(), cursor.minute(), second)?;
                    match tz.from_local_datetime(&candidate).earliest() {
                        Some(resolved) => return Some(resolved.with_timezone(&Utc)),
                        // Nonexistent local time (DST gap); keep looking.
                        None => cursor = truncate_to_minute(candidate)? + Duration::minutes(1),
                    }
                }
                None => cursor = truncate_to_minute(cursor)? + Duration::minutes(1),
            }
        }

        None
    }
}

fn first_of_next_matching_month(month: &CronField, date: NaiveDate) -> Option<NaiveDateTime> {
    let next = match month.next(date.month() + 1) {
        Some(m) => NaiveDate::from_ymd_opt(date.year(), m, 1)?,
        None => NaiveDate::from_ymd_opt(date.year() + 1, month.first()?, 1)?,
    };
    next.and_hms_opt(0, 0, 0)
}

fn truncate_to_minute(dt: NaiveDateTime) -> Option<NaiveDateTime> {
    dt.with_second(0)?.with_nanosecond(0)
}

fn truncate_to_hour(dt: NaiveDateTime) -> Option<NaiveDateTime> {
    truncate_to_minute(dt)?.with_minute(0)
}

impl FromStr for CronSchedule {
    type Err = CronParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CronSchedule::parse(s)
    }
}
